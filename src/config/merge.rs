//! Field-by-field merging of configuration tiers.
//!
//! Objects merge recursively; every other value (including arrays) is
//! replaced by the higher tier.

use serde_json::Value;

/// Merge `overlay` onto `base`, with `overlay` taking precedence.
///
/// A `null` in the overlay means "not specified" and keeps the base value.
///
/// ```
/// use serde_json::json;
/// use tasklink::config::deep_merge;
///
/// let base = json!({ "server": { "port": 31995, "host": "127.0.0.1" } });
/// let overlay = json!({ "server": { "port": 8080 } });
/// assert_eq!(
///     deep_merge(base, overlay),
///     json!({ "server": { "port": 8080, "host": "127.0.0.1" } })
/// );
/// ```
pub fn deep_merge(base: Value, overlay: Value) -> Value {
    match (base, overlay) {
        (Value::Object(mut merged), Value::Object(overlay_map)) => {
            for (key, overlay_value) in overlay_map {
                let value = match merged.remove(&key) {
                    Some(base_value) => deep_merge(base_value, overlay_value),
                    None => overlay_value,
                };
                merged.insert(key, value);
            }
            Value::Object(merged)
        }
        (base, Value::Null) => base,
        (_, overlay) => overlay,
    }
}

/// Merge tiers in order, later tiers winning.
pub fn deep_merge_all(values: impl IntoIterator<Item = Value>) -> Value {
    values.into_iter().fold(Value::Null, deep_merge)
}
