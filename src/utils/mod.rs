//! Small standalone utilities.
//!
//! - [`alignment`]: power-of-two offset math for binary layouts
//! - [`versioning`]: cached version discovery

pub mod alignment;
pub mod versioning;

pub use alignment::{align_offset, calculate_padding, is_aligned};
pub use versioning::get_version;
