//! Bounded cache of parsed documents.
//!
//! Keyed by format and the full source text, so a hit is always exact.

use std::sync::{Mutex, OnceLock, PoisonError};

use cached::{Cached, SizedCache};

use crate::config::env::{env_parsed, parse_bool};
use crate::errors::{FoundationError, Result};

/// Default number of parsed documents kept.
pub const DEFAULT_CACHE_SIZE: usize = 128;

/// Documents larger than this are parsed but never cached.
pub const MAX_CACHEABLE_LEN: usize = 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Format {
    Yaml,
    Json,
    Toml,
}

/// A parsed document in its native value type.
#[derive(Debug, Clone)]
pub enum CachedValue {
    Yaml(serde_yaml::Value),
    Json(serde_json::Value),
    Toml(toml::Value),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheConfig {
    pub enabled: bool,
    pub size: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            size: DEFAULT_CACHE_SIZE,
        }
    }
}

impl CacheConfig {
    /// Read `FOUNDATION_SERIALIZATION_CACHE_ENABLED` and
    /// `FOUNDATION_SERIALIZATION_CACHE_SIZE`.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(enabled) = env_parsed("FOUNDATION_SERIALIZATION_CACHE_ENABLED", parse_bool) {
            config.enabled = enabled;
        }
        if let Some(size) = env_parsed("FOUNDATION_SERIALIZATION_CACHE_SIZE", |v| {
            match v.trim().parse::<usize>() {
                Ok(0) => Err(FoundationError::Validation("cache size must be positive".into())),
                Ok(n) => Ok(n),
                Err(e) => Err(FoundationError::Validation(e.to_string())),
            }
        }) {
            config.size = size;
        }
        config
    }
}

/// Hit/miss counters and current occupancy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub size: usize,
    pub enabled: bool,
}

pub struct ParseCache {
    config: CacheConfig,
    entries: Mutex<SizedCache<(Format, String), CachedValue>>,
}

impl ParseCache {
    pub fn new(config: CacheConfig) -> Self {
        Self {
            config,
            entries: Mutex::new(SizedCache::with_size(config.size.max(1))),
        }
    }

    /// Return the cached document for `source` or parse and store it.
    pub fn get_or_parse<F>(&self, format: Format, source: &str, parse: F) -> Result<CachedValue>
    where
        F: FnOnce(&str) -> Result<CachedValue>,
    {
        if !self.config.enabled || source.len() > MAX_CACHEABLE_LEN {
            return parse(source);
        }

        let key = (format, source.to_string());
        if let Some(hit) = self.lock().cache_get(&key) {
            return Ok(hit.clone());
        }

        // Parse outside the lock; a racing thread may store the same value.
        let value = parse(source)?;
        self.lock().cache_set(key, value.clone());
        Ok(value)
    }

    pub fn clear(&self) {
        let mut entries = self.lock();
        entries.cache_clear();
        entries.cache_reset_metrics();
    }

    pub fn stats(&self) -> CacheStats {
        let entries = self.lock();
        CacheStats {
            hits: entries.cache_hits().unwrap_or(0),
            misses: entries.cache_misses().unwrap_or(0),
            size: entries.cache_size(),
            enabled: self.config.enabled,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, SizedCache<(Format, String), CachedValue>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

static GLOBAL_CACHE: OnceLock<ParseCache> = OnceLock::new();

/// The process-wide cache, configured from the environment on first use.
pub fn global_cache() -> &'static ParseCache {
    GLOBAL_CACHE.get_or_init(|| ParseCache::new(CacheConfig::from_env()))
}
