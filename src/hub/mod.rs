//! Process-wide component hub.

pub mod registry;

use std::sync::OnceLock;

pub use registry::{EntryKey, Registration, Registry, RegistryEntry};

static HUB: OnceLock<Registry> = OnceLock::new();

/// The global registry shared by every foundation component.
pub fn get_hub() -> &'static Registry {
    HUB.get_or_init(Registry::new)
}
