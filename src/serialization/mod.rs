//! YAML, JSON and TOML load/dump wrappers.
//!
//! `*_loads` functions parse through the shared [`cache`] so repeated loads of
//! the same document skip the parser. `*_dumps` functions never cache.

pub mod cache;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::errors::{FoundationError, Result};
use cache::{global_cache, CachedValue, Format};

pub use cache::{CacheConfig, CacheStats};

/// Parse a YAML document.
///
/// An empty document deserializes from YAML `null`.
pub fn yaml_loads<T: DeserializeOwned>(source: &str) -> Result<T> {
    let value = global_cache().get_or_parse(Format::Yaml, source, |s| {
        serde_yaml::from_str::<serde_yaml::Value>(s)
            .map(CachedValue::Yaml)
            .map_err(|e| FoundationError::serialization("yaml", e))
    })?;
    match value {
        CachedValue::Yaml(v) => {
            serde_yaml::from_value(v).map_err(|e| FoundationError::serialization("yaml", e))
        }
        _ => Err(mismatched("yaml")),
    }
}

pub fn yaml_dumps<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    serde_yaml::to_string(value).map_err(|e| FoundationError::serialization("yaml", e))
}

pub fn json_loads<T: DeserializeOwned>(source: &str) -> Result<T> {
    let value = global_cache().get_or_parse(Format::Json, source, |s| {
        serde_json::from_str::<serde_json::Value>(s)
            .map(CachedValue::Json)
            .map_err(|e| FoundationError::serialization("json", e))
    })?;
    match value {
        CachedValue::Json(v) => {
            serde_json::from_value(v).map_err(|e| FoundationError::serialization("json", e))
        }
        _ => Err(mismatched("json")),
    }
}

/// Serialize to JSON. `indent` of `None` produces compact output.
pub fn json_dumps<T: Serialize + ?Sized>(value: &T, indent: Option<usize>) -> Result<String> {
    match indent {
        None => serde_json::to_string(value).map_err(|e| FoundationError::serialization("json", e)),
        Some(width) => {
            let indent = " ".repeat(width);
            let formatter = serde_json::ser::PrettyFormatter::with_indent(indent.as_bytes());
            let mut out = Vec::new();
            let mut serializer = serde_json::Serializer::with_formatter(&mut out, formatter);
            value
                .serialize(&mut serializer)
                .map_err(|e| FoundationError::serialization("json", e))?;
            String::from_utf8(out).map_err(|e| FoundationError::serialization("json", e))
        }
    }
}

pub fn toml_loads<T: DeserializeOwned>(source: &str) -> Result<T> {
    let value = global_cache().get_or_parse(Format::Toml, source, |s| {
        ::toml::from_str::<::toml::Value>(s)
            .map(CachedValue::Toml)
            .map_err(|e| FoundationError::serialization("toml", e))
    })?;
    match value {
        CachedValue::Toml(v) => v
            .try_into()
            .map_err(|e| FoundationError::serialization("toml", e)),
        _ => Err(mismatched("toml")),
    }
}

pub fn toml_dumps<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    ::toml::to_string(value).map_err(|e| FoundationError::serialization("toml", e))
}

/// Statistics for the shared parse cache.
pub fn cache_stats() -> CacheStats {
    global_cache().stats()
}

pub fn clear_cache() {
    global_cache().clear();
}

fn mismatched(format: &'static str) -> FoundationError {
    FoundationError::serialization(format, "cache returned a value of another format")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use std::collections::BTreeMap;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Service {
        name: String,
        replicas: u32,
        tags: Vec<String>,
    }

    fn sample() -> Service {
        Service {
            name: "api".into(),
            replicas: 3,
            tags: vec!["edge".into(), "public".into()],
        }
    }

    #[test]
    fn test_yaml_roundtrip() {
        let text = yaml_dumps(&sample()).unwrap();
        assert!(text.contains("name: api"));
        let back: Service = yaml_loads(&text).unwrap();
        assert_eq!(back, sample());
    }

    #[test]
    fn test_yaml_empty_document_is_null() {
        let value: serde_yaml::Value = yaml_loads("").unwrap();
        assert!(value.is_null());
        let maybe: Option<Service> = yaml_loads("").unwrap();
        assert!(maybe.is_none());
    }

    #[test]
    fn test_yaml_invalid_reports_format() {
        let err = yaml_loads::<Service>("name: [unclosed").unwrap_err();
        assert!(matches!(
            err,
            FoundationError::Serialization { format: "yaml", .. }
        ));
    }

    #[test]
    fn test_json_dumps_indent() {
        let mut map = BTreeMap::new();
        map.insert("b", 2);
        map.insert("a", 1);
        assert_eq!(json_dumps(&map, None).unwrap(), r#"{"a":1,"b":2}"#);
        assert_eq!(
            json_dumps(&map, Some(4)).unwrap(),
            "{\n    \"a\": 1,\n    \"b\": 2\n}"
        );
    }

    #[test]
    fn test_json_loads_type_mismatch() {
        let err = json_loads::<Service>(r#"{"name": "api"}"#).unwrap_err();
        assert!(matches!(
            err,
            FoundationError::Serialization { format: "json", .. }
        ));
    }

    #[test]
    fn test_toml_roundtrip() {
        let text = toml_dumps(&sample()).unwrap();
        let back: Service = toml_loads(&text).unwrap();
        assert_eq!(back, sample());
    }

    #[test]
    fn test_same_text_different_format_not_confused() {
        // "1" is valid in both YAML and JSON; the cache must keep them apart.
        let y: serde_yaml::Value = yaml_loads("1").unwrap();
        let j: serde_json::Value = json_loads("1").unwrap();
        assert_eq!(y.as_i64(), Some(1));
        assert_eq!(j, serde_json::json!(1));
    }
}
