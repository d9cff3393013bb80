use serde::Serialize;
use serde_json::{Map, Value};
use wayfare_core::WayfareError;

/// Derive a deterministic query string from structured parameters.
///
/// Keys are sorted, `null` values are skipped, strings are used verbatim,
/// other scalars use their JSON text, and objects/arrays are serialized with
/// recursively sorted keys. Parts are rendered as `key:value` and joined with
/// `|`, so insertion order never affects the result.
pub fn cache_key(params: &Map<String, Value>) -> String {
    let mut keys: Vec<&String> = params.keys().collect();
    keys.sort();

    let mut parts = Vec::with_capacity(keys.len());
    for key in keys {
        let value = &params[key];
        let rendered = match value {
            Value::Null => continue,
            Value::String(s) => s.clone(),
            Value::Object(_) | Value::Array(_) => canonical_json(value),
            other => other.to_string(),
        };
        parts.push(format!("{key}:{rendered}"));
    }
    parts.join("|")
}

/// [`cache_key`] for any value that serializes to a JSON object.
pub fn cache_key_from<T: Serialize>(params: &T) -> Result<String, WayfareError> {
    match serde_json::to_value(params) {
        Ok(Value::Object(map)) => Ok(cache_key(&map)),
        Ok(other) => Err(WayfareError::Serialization(format!(
            "cache key parameters must be an object, got {}",
            kind(&other)
        ))),
        Err(e) => Err(WayfareError::Serialization(format!("cache key parameters: {e}"))),
    }
}

fn canonical_json(value: &Value) -> String {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            let fields: Vec<String> = keys
                .into_iter()
                .map(|k| format!("{}:{}", Value::String(k.clone()), canonical_json(&map[k])))
                .collect();
            format!("{{{}}}", fields.join(","))
        }
        Value::Array(items) => {
            let items: Vec<String> = items.iter().map(canonical_json).collect();
            format!("[{}]", items.join(","))
        }
        scalar => scalar.to_string(),
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
