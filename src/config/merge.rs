//! Layer merge
//!
//! Objects merge by key, arrays and scalars are replaced by the later layer.

use serde_json::Value;

/// Overlay `overlay` onto `base`.
pub fn deep_merge(base: Value, overlay: Value) -> Value {
    match (base, overlay) {
        (Value::Object(mut base_map), Value::Object(overlay_map)) => {
            for (key, overlay_value) in overlay_map {
                let merged = match base_map.remove(&key) {
                    Some(base_value) => deep_merge(base_value, overlay_value),
                    None => overlay_value,
                };
                base_map.insert(key, merged);
            }
            Value::Object(base_map)
        }
        (_, overlay) => overlay,
    }
}

/// Merge layers in order; the last layer has the highest precedence
pub fn merge_layers(layers: Vec<Value>) -> Value {
    layers.into_iter().fold(Value::Null, deep_merge)
}
