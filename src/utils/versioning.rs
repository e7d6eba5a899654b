//! Process-wide version discovery.
//!
//! Resolution order for a package:
//! 1. the cache
//! 2. a `VERSION` file found by walking up from the start directory
//! 3. registered package metadata
//! 4. [`DEV_VERSION`]

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{OnceLock, PoisonError, RwLock};

/// Version reported when nothing else is found.
pub const DEV_VERSION: &str = "0.0.0-dev";

/// Name of the file searched for during the directory walk.
pub const VERSION_FILE: &str = "VERSION";

/// Package name this crate registers its own metadata under.
pub const PACKAGE_NAME: &str = "provide-foundation";

static CACHED_VERSIONS: OnceLock<RwLock<HashMap<String, String>>> = OnceLock::new();
static PACKAGE_METADATA: OnceLock<RwLock<HashMap<String, String>>> = OnceLock::new();

fn cache() -> &'static RwLock<HashMap<String, String>> {
    CACHED_VERSIONS.get_or_init(|| RwLock::new(HashMap::new()))
}

fn metadata() -> &'static RwLock<HashMap<String, String>> {
    PACKAGE_METADATA.get_or_init(|| {
        let mut known = HashMap::new();
        known.insert(PACKAGE_NAME.to_string(), env!("CARGO_PKG_VERSION").to_string());
        RwLock::new(known)
    })
}

/// Register installed-package metadata used as the fallback source.
///
/// Binaries typically call this with `env!("CARGO_PKG_NAME")` and
/// `env!("CARGO_PKG_VERSION")`.
pub fn register_package_version(package: &str, version: &str) {
    metadata()
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .insert(package.to_string(), version.to_string());
}

/// Get the version string for `package`, resolving it at most once per
/// process.
///
/// `start_dir` is where the `VERSION` walk begins; the current directory is
/// used when it is `None`.
pub fn get_version(package: &str, start_dir: Option<&Path>) -> String {
    if let Some(version) = cache()
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .get(package)
    {
        return version.clone();
    }

    let mut cached = cache().write().unwrap_or_else(PoisonError::into_inner);
    // Another thread may have resolved it while we waited for the write lock.
    if let Some(version) = cached.get(package) {
        return version.clone();
    }

    let version = resolve_version(package, start_dir);
    tracing::debug!(package, version = %version, "Resolved package version");
    cached.insert(package.to_string(), version.clone());
    version
}

/// Drop every cached version.
pub fn reset_version_cache() {
    cache()
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .clear();
}

fn resolve_version(package: &str, start_dir: Option<&Path>) -> String {
    let start = match start_dir {
        Some(dir) => Some(dir.to_path_buf()),
        None => std::env::current_dir().ok(),
    };

    if let Some(version) = start
        .as_deref()
        .and_then(find_version)
        .map(|(_, version)| version)
    {
        return version;
    }

    if let Some(version) = metadata()
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .get(package)
    {
        return version.clone();
    }

    DEV_VERSION.to_string()
}

/// Walk up from `start` looking for a `VERSION` file with a version in it.
///
/// Empty or unreadable files are skipped and the walk continues upward.
pub fn find_version_file(start: &Path) -> Option<PathBuf> {
    find_version(start).map(|(path, _)| path)
}

fn find_version(start: &Path) -> Option<(PathBuf, String)> {
    start
        .ancestors()
        .map(|dir| dir.join(VERSION_FILE))
        .filter(|candidate| candidate.is_file())
        .find_map(|candidate| {
            let version = read_version_file(&candidate)?;
            Some((candidate, version))
        })
}

fn read_version_file(path: &Path) -> Option<String> {
    match fs::read_to_string(path) {
        Ok(contents) => {
            let version = contents.trim();
            (!version.is_empty()).then(|| version.to_string())
        }
        Err(e) => {
            tracing::debug!(path = %path.display(), error = %e, "Failed to read VERSION file");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_find_version_file_walks_up() {
        let root = TempDir::new().unwrap();
        fs::write(root.path().join(VERSION_FILE), "1.2.3\n").unwrap();
        let nested = root.path().join("a").join("b");
        fs::create_dir_all(&nested).unwrap();

        let found = find_version_file(&nested).unwrap();
        assert_eq!(found, root.path().join(VERSION_FILE));
    }

    #[test]
    fn test_resolve_ignores_empty_version_file() {
        let root = TempDir::new().unwrap();
        fs::write(root.path().join(VERSION_FILE), "  \n").unwrap();

        let version = resolve_version("unit-empty-version-pkg", Some(root.path()));
        assert_eq!(version, DEV_VERSION);
    }

    #[test]
    fn test_empty_version_file_does_not_stop_walk() {
        let root = TempDir::new().unwrap();
        fs::write(root.path().join(VERSION_FILE), "2.0.0\n").unwrap();
        let nested = root.path().join("pkg");
        fs::create_dir_all(&nested).unwrap();
        fs::write(nested.join(VERSION_FILE), "\n").unwrap();

        assert_eq!(
            find_version_file(&nested).unwrap(),
            root.path().join(VERSION_FILE)
        );
        assert_eq!(resolve_version("unit-nested-empty-pkg", Some(&nested)), "2.0.0");
    }

    #[test]
    fn test_resolve_uses_registered_metadata() {
        let root = TempDir::new().unwrap();
        register_package_version("unit-registered-pkg", "4.5.6");

        let version = resolve_version("unit-registered-pkg", Some(root.path()));
        assert_eq!(version, "4.5.6");
    }

    #[test]
    fn test_own_metadata_is_registered() {
        let root = TempDir::new().unwrap();
        let version = resolve_version(PACKAGE_NAME, Some(root.path()));
        assert_eq!(version, env!("CARGO_PKG_VERSION"));
    }
}
