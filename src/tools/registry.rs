//! Tool-manager registry.
//!
//! Thin adapter over the hub: every tool manager is a factory stored in the
//! [`TOOL_MANAGER_DIMENSION`] dimension, with its aliases and metadata kept by
//! the hub entry.

use std::collections::BTreeMap;
use std::sync::{Arc, OnceLock};

use crate::errors::{FoundationError, Result};
use crate::hub::{get_hub, Registration, Registry};

/// Hub dimension holding tool-manager factories.
pub const TOOL_MANAGER_DIMENSION: &str = "tool_manager";

/// Plugin group name recorded on entries registered through discovery.
pub const PLUGIN_GROUP: &str = "provide.foundation.tools";

/// Free-form settings passed to a tool manager when it is created.
pub type ToolConfig = BTreeMap<String, String>;

/// Manages installation and lookup of one external tool.
pub trait ToolManager: Send + Sync {
    /// Canonical tool name (e.g. `terraform`).
    fn tool_name(&self) -> &str;

    /// Name of the executable on disk; defaults to the tool name.
    fn executable_name(&self) -> &str {
        self.tool_name()
    }

    /// Supported `os_arch` platforms.
    fn supported_platforms(&self) -> Vec<String> {
        vec![
            "linux_amd64".into(),
            "linux_arm64".into(),
            "darwin_amd64".into(),
            "darwin_arm64".into(),
        ]
    }

    fn config(&self) -> &ToolConfig;
}

/// Creates a tool manager from its config.
pub type ToolManagerFactory = Arc<dyn Fn(ToolConfig) -> Box<dyn ToolManager> + Send + Sync>;

/// Stored hub value; a newtype so downcasting cannot confuse it with another
/// component that happens to be a closure.
struct FactoryEntry(ToolManagerFactory);

/// Registration summary for a tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolInfo {
    pub name: String,
    pub aliases: Vec<String>,
    pub metadata: BTreeMap<String, String>,
}

/// A tool manager offered by a plugin.
pub struct ToolDeclaration {
    pub name: String,
    pub aliases: Vec<String>,
    pub factory: ToolManagerFactory,
}

/// A source of tool managers, registered in bulk by [`ToolRegistry::discover_plugins`].
pub trait ToolPlugin {
    fn name(&self) -> &str;

    /// Tools this plugin provides. May fail, e.g. if the plugin is misconfigured.
    fn tools(&self) -> Result<Vec<ToolDeclaration>>;
}

/// Registry of tool managers backed by a hub [`Registry`].
pub struct ToolRegistry {
    hub: &'static Registry,
}

impl ToolRegistry {
    /// Registry over the global hub.
    pub fn new() -> Self {
        Self { hub: get_hub() }
    }

    /// Registry over a caller-owned hub (leaked to `'static`), mostly for tests.
    pub fn with_hub(hub: &'static Registry) -> Self {
        Self { hub }
    }

    /// Register a tool-manager factory under `name` and its aliases.
    pub fn register_tool_manager<F>(&self, name: &str, factory: F, aliases: &[&str]) -> Result<()>
    where
        F: Fn(ToolConfig) -> Box<dyn ToolManager> + Send + Sync + 'static,
    {
        self.register_with_metadata(name, Arc::new(factory), aliases, BTreeMap::new())
    }

    fn register_with_metadata(
        &self,
        name: &str,
        factory: ToolManagerFactory,
        aliases: &[&str],
        metadata: BTreeMap<String, String>,
    ) -> Result<()> {
        let mut registration = Registration::new(TOOL_MANAGER_DIMENSION, name, FactoryEntry(factory))
            .with_aliases(aliases.iter().copied());
        registration.metadata = metadata;
        self.hub.register(registration)?;
        tracing::info!(tool = name, ?aliases, "Registered tool manager");
        Ok(())
    }

    /// Factory for `name` (or one of its aliases).
    pub fn get_tool_manager_factory(&self, name: &str) -> Option<ToolManagerFactory> {
        self.hub
            .get::<FactoryEntry>(TOOL_MANAGER_DIMENSION, name)
            .map(|entry| Arc::clone(&entry.0))
    }

    /// Instantiate the manager registered under `name`.
    pub fn create_tool_manager(&self, name: &str, config: ToolConfig) -> Result<Box<dyn ToolManager>> {
        let factory = self
            .get_tool_manager_factory(name)
            .ok_or_else(|| FoundationError::NotFound(format!("tool manager {name}")))?;
        Ok(factory(config))
    }

    /// Sorted canonical names of every registered tool.
    pub fn list_tools(&self) -> Vec<String> {
        self.hub.list_dimension(TOOL_MANAGER_DIMENSION)
    }

    pub fn is_tool_registered(&self, name: &str) -> bool {
        self.hub.get_entry(TOOL_MANAGER_DIMENSION, name).is_some()
    }

    pub fn get_tool_info(&self, name: &str) -> Option<ToolInfo> {
        self.hub
            .get_entry(TOOL_MANAGER_DIMENSION, name)
            .map(|entry| ToolInfo {
                name: entry.name,
                aliases: entry.aliases,
                metadata: entry.metadata,
            })
    }

    /// Register every tool offered by `plugins`.
    ///
    /// Entries record the plugin name and [`PLUGIN_GROUP`] in their metadata.
    /// A failing plugin or tool is logged and skipped; the rest still
    /// register. Returns the canonical names of the tools registered.
    pub fn discover_plugins(&self, plugins: &[&dyn ToolPlugin]) -> Vec<String> {
        let mut registered = Vec::new();
        for plugin in plugins {
            let tools = match plugin.tools() {
                Ok(tools) => tools,
                Err(e) => {
                    tracing::warn!(plugin = plugin.name(), error = %e, "Failed to load tool plugin");
                    continue;
                }
            };

            for tool in tools {
                let mut metadata = BTreeMap::new();
                metadata.insert("plugin".to_string(), plugin.name().to_string());
                metadata.insert("group".to_string(), PLUGIN_GROUP.to_string());
                let aliases: Vec<&str> = tool.aliases.iter().map(String::as_str).collect();

                match self.register_with_metadata(&tool.name, tool.factory, &aliases, metadata) {
                    Ok(()) => registered.push(tool.name),
                    Err(e) => tracing::warn!(
                        plugin = plugin.name(),
                        tool = %tool.name,
                        error = %e,
                        "Skipping plugin tool"
                    ),
                }
            }
        }
        registered
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

static TOOL_REGISTRY: OnceLock<ToolRegistry> = OnceLock::new();

/// The global tool registry over the global hub.
pub fn get_tool_registry() -> &'static ToolRegistry {
    TOOL_REGISTRY.get_or_init(ToolRegistry::new)
}
