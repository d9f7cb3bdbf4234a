//! Concrete values produced by rule resolution.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use ordered_float::OrderedFloat;
use std::hash::{Hash, Hasher};

/// Concrete value of a scene parameter after resolution.
///
/// The scalar variants cover the usual parameter kinds: counts (`Integer`),
/// physical quantities (`Number`), labels (`String`) and switches
/// (`Boolean`). `Array` holds small numeric tuples such as positions and
/// extents, and `Map` holds resolved structured mappings with their
/// declaration order intact.
///
/// `Integer` precedes `Number` so untagged deserialization classifies a
/// JSON integer as `Integer`; integer parameters survive a round trip
/// through a JSON scene description unchanged.
#[derive(Serialize, Deserialize, Clone, PartialEq, Eq, Debug)]
#[serde(untagged)]
pub enum Value {
    Integer(i64),
    Number(OrderedFloat<f64>),
    String(String),
    Boolean(bool),
    Array(Vec<Value>),
    Map(IndexMap<String, Value>),
}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Value::Integer(i) => i.hash(state),
            Value::Number(n) => n.hash(state),
            Value::String(s) => s.hash(state),
            Value::Boolean(b) => b.hash(state),
            Value::Array(arr) => arr.hash(state),
            Value::Map(map) => {
                // Map equality ignores entry order, so hashing must too.
                let mut entries: Vec<_> = map.iter().collect();
                entries.sort_by_key(|(k, _)| k.as_str());
                for (k, v) in entries {
                    k.hash(state);
                    v.hash(state);
                }
            }
        }
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Number(OrderedFloat(value))
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Integer(value)
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Boolean(value)
    }
}

impl From<Vec<Value>> for Value {
    fn from(value: Vec<Value>) -> Self {
        Value::Array(value)
    }
}

impl From<IndexMap<String, Value>> for Value {
    fn from(value: IndexMap<String, Value>) -> Self {
        Value::Map(value)
    }
}

impl Value {
    /// Two-component numeric tuple, the common shape for positions and
    /// extents.
    pub fn point(x: f64, y: f64) -> Self {
        Value::Array(vec![Value::from(x), Value::from(y)])
    }

    /// Numeric view: integers widen to f64.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(i) => Some(*i as f64),
            Value::Number(n) => Some(n.into_inner()),
            _ => None,
        }
    }

    /// Integer view. Numbers do not coerce, even when whole-valued.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(arr) => Some(arr.as_slice()),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&IndexMap<String, Value>> {
        match self {
            Value::Map(map) => Some(map),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_views() {
        assert_eq!(Value::from(2.5).as_f64(), Some(2.5));
        assert_eq!(Value::from(3i64).as_f64(), Some(3.0));
        assert_eq!(Value::from(3i64).as_i64(), Some(3));
        assert_eq!(Value::from(4.0).as_i64(), None);
        assert_eq!(Value::from("radius").as_f64(), None);
    }

    #[test]
    fn integer_survives_json_round_trip() {
        let count = Value::from(2i64);
        let json = serde_json::to_string(&count).unwrap();
        assert_eq!(serde_json::from_str::<Value>(&json).unwrap(), count);

        let quantity = Value::from(2.5);
        let json = serde_json::to_string(&quantity).unwrap();
        assert_eq!(serde_json::from_str::<Value>(&json).unwrap(), quantity);
    }

    #[test]
    fn json_object_keeps_declared_key_order() {
        let value: Value =
            serde_json::from_str(r#"{ "intensity": 1, "radius": 2.5, "label": "cell" }"#).unwrap();
        let map = value.as_map().unwrap();
        let keys: Vec<_> = map.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["intensity", "radius", "label"]);
        assert_eq!(map["intensity"], Value::from(1i64));
        assert_eq!(map["radius"], Value::from(2.5));
    }

    #[test]
    fn point_is_a_numeric_pair() {
        let point = Value::point(12.0, -3.5);
        let coords = point.as_array().unwrap();
        assert_eq!(coords.len(), 2);
        assert_eq!(coords[0].as_f64(), Some(12.0));
        assert_eq!(coords[1].as_f64(), Some(-3.5));
    }
}
