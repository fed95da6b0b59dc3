//! Boundary adapter between [`Value`] and `serde_json::Value`.
//!
//! Conversion from a host representation into the generic value model is an
//! adapter concern at the boundary, not part of the container stack's
//! contract. `serde_json` is built with `preserve_order`, so object entry
//! order survives both directions.

use crate::value::Value;

impl Value {
    /// Converts a JSON value into the generic value model. Numbers map to
    /// `Int`, then `UInt`, then `Float`, by representability.
    pub fn from_json(json: serde_json::Value) -> Value {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(v) => Value::Bool(v),
            serde_json::Value::Number(number) => {
                if let Some(v) = number.as_i64() {
                    Value::Int(v)
                } else if let Some(v) = number.as_u64() {
                    Value::UInt(v)
                } else {
                    Value::Float(number.as_f64().unwrap_or(f64::NAN))
                }
            }
            serde_json::Value::String(v) => Value::Str(v),
            serde_json::Value::Array(items) => {
                Value::Array(items.into_iter().map(Value::from_json).collect())
            }
            serde_json::Value::Object(entries) => Value::Object(
                entries
                    .into_iter()
                    .map(|(key, value)| (key, Value::from_json(value)))
                    .collect(),
            ),
        }
    }

    /// Converts back into a JSON value. `Bytes` renders as an array of
    /// numbers and non-finite floats as `null`; JSON has no native form for
    /// either, so only the tag is lossy.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Bool(v) => serde_json::Value::Bool(*v),
            Value::Int(v) => serde_json::Value::from(*v),
            Value::UInt(v) => serde_json::Value::from(*v),
            Value::Float(v) => serde_json::Number::from_f64(*v)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::Str(v) => serde_json::Value::String(v.clone()),
            Value::Bytes(bytes) => serde_json::Value::Array(
                bytes
                    .iter()
                    .map(|byte| serde_json::Value::from(u64::from(*byte)))
                    .collect(),
            ),
            Value::Array(items) => {
                serde_json::Value::Array(items.iter().map(Value::to_json).collect())
            }
            Value::Object(entries) => {
                let mut map = serde_json::Map::with_capacity(entries.len());
                for (key, value) in entries {
                    map.insert(key.clone(), value.to_json());
                }
                serde_json::Value::Object(map)
            }
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        Value::from_json(json)
    }
}

impl From<&Value> for serde_json::Value {
    fn from(value: &Value) -> Self {
        value.to_json()
    }
}
