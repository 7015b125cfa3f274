//! Dynamic payload values carried by vertices and messages
//!
//! Vertex values and message contents are polymorphic: a number, a string
//! map, an ordered list, or an opaque JSON scalar. The engine never hands an
//! untyped payload to user code; everything flows through this tagged sum
//! type, and the aggregation / merge rules dispatch on the tag.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A dynamic payload value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// Numeric payload; sums under aggregation
    Number(f64),
    /// String-keyed mapping; merges key-wise
    Map(BTreeMap<String, Value>),
    /// Ordered list of payloads
    List(Vec<Value>),
    /// Anything else, carried as-is
    Opaque(serde_json::Value),
}

impl Value {
    /// Create a numeric value
    pub fn number(n: impl Into<f64>) -> Self {
        Value::Number(n.into())
    }

    /// Create a map value from key/value pairs
    pub fn map<K, I>(entries: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Value)>,
    {
        Value::Map(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// Create a list value
    pub fn list(items: impl IntoIterator<Item = Value>) -> Self {
        Value::List(items.into_iter().collect())
    }

    /// Create an opaque value from anything serializable
    pub fn opaque(value: impl Serialize) -> Self {
        Value::Opaque(serde_json::to_value(value).unwrap_or(serde_json::Value::Null))
    }

    /// Numeric payload, if this is a number
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Map payload, if this is a map
    pub fn as_map(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Value::Map(m) => Some(m),
            _ => None,
        }
    }

    /// List payload, if this is a list
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    /// Look up a map entry by key
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.as_map().and_then(|m| m.get(key))
    }

    pub fn is_number(&self) -> bool {
        matches!(self, Value::Number(_))
    }

    pub fn is_map(&self) -> bool {
        matches!(self, Value::Map(_))
    }

    /// Aggregate a round's message contents into a single payload.
    ///
    /// - empty input aggregates to nothing;
    /// - all numbers sum arithmetically;
    /// - all maps merge key-wise, left to right, later keys overwriting;
    /// - anything mixed becomes the ordered list of contents.
    pub fn aggregate(contents: &[Value]) -> Option<Value> {
        if contents.is_empty() {
            return None;
        }
        if contents.iter().all(Value::is_number) {
            let sum = contents.iter().filter_map(Value::as_number).sum();
            return Some(Value::Number(sum));
        }
        if contents.iter().all(Value::is_map) {
            let mut merged = BTreeMap::new();
            for value in contents {
                if let Value::Map(m) = value {
                    for (k, v) in m {
                        merged.insert(k.clone(), v.clone());
                    }
                }
            }
            return Some(Value::Map(merged));
        }
        Some(Value::List(contents.to_vec()))
    }

    /// Combine a newly computed partial value with the aggregated incoming
    /// payload. Two maps merge key-wise with the new value winning; in every
    /// other combination the new value replaces the base outright.
    pub fn merge(base: Option<&Value>, new: Value) -> Value {
        match (base, new) {
            (Some(Value::Map(base)), Value::Map(new)) => {
                let mut merged = base.clone();
                for (k, v) in new {
                    merged.insert(k, v);
                }
                Value::Map(merged)
            }
            (_, new) => new,
        }
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n as f64)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Opaque(serde_json::Value::String(s.to_string()))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Opaque(serde_json::Value::String(s))
    }
}
