//! Recursive merging of JSON-shaped configuration values.

use serde_json::Value;

/// Merge `overlay` into `base`.
///
/// Objects are merged key by key, recursively. Any other overlay value
/// (arrays, scalars, null) replaces the base value outright.
pub fn deep_merge(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(base_map), Value::Object(overlay_map)) => {
            for (key, value) in overlay_map {
                match base_map.get_mut(&key) {
                    Some(existing) => deep_merge(existing, value),
                    None => {
                        base_map.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}

/// Merge a sequence of layers, later layers winning.
pub fn merge_layers<I>(layers: I) -> Value
where
    I: IntoIterator<Item = Value>,
{
    let mut result = Value::Object(serde_json::Map::new());
    for layer in layers {
        deep_merge(&mut result, layer);
    }
    result
}
