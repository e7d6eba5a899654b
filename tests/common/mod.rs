//! Shared fixtures for integration tests.
//!
//! Provides:
//! - Temporary project directories with config and `VERSION` files
//! - Path to the built `foundation-loggen` binary

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Test fixture that manages a temporary project directory.
///
/// The directory is automatically cleaned up when the fixture is dropped.
pub struct TestFixture {
    /// Temporary project root
    pub temp_dir: TempDir,
}

impl TestFixture {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        Self { temp_dir }
    }

    pub fn root(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Write `contents` to `relative` under the root, creating parent dirs.
    pub fn write(&self, relative: &str, contents: &str) -> PathBuf {
        let path = self.root().join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("failed to create parent dir");
        }
        fs::write(&path, contents).expect("failed to write file");
        path
    }

    /// Create (empty) nested directories under the root.
    pub fn mkdir(&self, relative: &str) -> PathBuf {
        let path = self.root().join(relative);
        fs::create_dir_all(&path).expect("failed to create dir");
        path
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// Path of the `foundation-loggen` binary built for this test run.
pub fn loggen_bin() -> &'static str {
    env!("CARGO_BIN_EXE_foundation-loggen")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixture_writes_nested_files() {
        let fixture = TestFixture::new();
        let path = fixture.write("a/b/VERSION", "1.0.0");
        assert!(path.exists());
        assert!(path.starts_with(fixture.root()));
    }
}
