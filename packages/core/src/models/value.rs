//! Property Values
//!
//! The closed set of values a node or relation property can hold, plus the
//! declared semantic types a schema checks them against.
//!
//! Values cross two boundaries:
//!
//! - **Typed records**: application structs are serialized with serde into a
//!   [`Properties`] bag and deserialized back after validation. Dates travel
//!   as RFC 3339 strings across that boundary.
//! - **The wire**: query results arrive as JSON; integers may be wrapped in
//!   `{low, high}` pairs and are flattened before becoming a [`Value`]
//!   (see [`crate::utils::flatten_numeric_properties`]).

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

/// Property bag keyed by property name.
///
/// Ordered so that generated query text is deterministic.
pub type Properties = BTreeMap<String, Value>;

/// A single property value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Boolean(bool),
    Integer(i64),
    Float(f64),
    String(String),
    Date(DateTime<Utc>),
    List(Vec<Value>),
    /// Nested map; never valid for a declared property type
    Map(Properties),
}

impl Value {
    /// Runtime type name, used in type mismatch reports
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "Null",
            Value::Boolean(_) => "Boolean",
            Value::Integer(_) | Value::Float(_) => "Number",
            Value::String(_) => "String",
            Value::Date(_) => "Date",
            Value::List(_) => "List",
            Value::Map(_) => "Map",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            Value::Float(f) if f.fract() == 0.0 => Some(*f as i64),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<&DateTime<Utc>> {
        match self {
            Value::Date(d) => Some(d),
            _ => None,
        }
    }

    /// Convert into plain JSON. Dates become RFC 3339 strings.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Boolean(b) => serde_json::Value::Bool(*b),
            Value::Integer(i) => serde_json::Value::from(*i),
            Value::Float(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::Date(d) => {
                serde_json::Value::String(d.to_rfc3339_opts(SecondsFormat::Millis, true))
            }
            Value::List(items) => serde_json::Value::Array(items.iter().map(Value::to_json).collect()),
            Value::Map(map) => serde_json::Value::Object(
                map.iter().map(|(k, v)| (k.clone(), v.to_json())).collect(),
            ),
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Boolean(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Integer(i),
                None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => Value::List(items.into_iter().map(Value::from).collect()),
            serde_json::Value::Object(map) => {
                Value::Map(map.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Integer(i as i64)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(d: DateTime<Utc>) -> Self {
        Value::Date(d)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::List(items.into_iter().map(Into::into).collect())
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        serde_json::Value::deserialize(deserializer).map(Value::from)
    }
}

/// Declared semantic type of a property
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PropertyType {
    String,
    Number,
    Boolean,
    Date,
    List,
}

impl PropertyType {
    /// Whether `value` already has this type (no coercion applied)
    pub fn matches(&self, value: &Value) -> bool {
        matches!(
            (self, value),
            (PropertyType::String, Value::String(_))
                | (PropertyType::Number, Value::Integer(_))
                | (PropertyType::Number, Value::Float(_))
                | (PropertyType::Boolean, Value::Boolean(_))
                | (PropertyType::Date, Value::Date(_))
                | (PropertyType::List, Value::List(_))
        )
    }
}

impl fmt::Display for PropertyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PropertyType::String => "String",
            PropertyType::Number => "Number",
            PropertyType::Boolean => "Boolean",
            PropertyType::Date => "Date",
            PropertyType::List => "List",
        };
        f.write_str(name)
    }
}

/// Build a [`Properties`] bag from `(name, value)` pairs.
///
/// ```rust
/// # use cooper_ogm::models::{props, Value};
/// let bag = props([("name", Value::from("Ada")), ("age", Value::from(36))]);
/// assert_eq!(bag.len(), 2);
/// ```
pub fn props<K, I>(entries: I) -> Properties
where
    K: Into<String>,
    I: IntoIterator<Item = (K, Value)>,
{
    entries.into_iter().map(|(k, v)| (k.into(), v)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn test_json_numbers_split_into_integer_and_float() {
        assert_eq!(Value::from(json!(3)), Value::Integer(3));
        assert_eq!(Value::from(json!(2.5)), Value::Float(2.5));
    }

    #[test]
    fn test_date_serializes_as_rfc3339() {
        let date = Utc.with_ymd_and_hms(2018, 3, 1, 12, 0, 0).unwrap();
        assert_eq!(Value::Date(date).to_json(), json!("2018-03-01T12:00:00.000Z"));
    }

    #[test]
    fn test_type_names() {
        assert_eq!(Value::Float(1.5).type_name(), "Number");
        assert_eq!(Value::from(vec!["a"]).type_name(), "List");
        assert_eq!(Value::Null.type_name(), "Null");
    }

    #[test]
    fn test_property_type_matches() {
        assert!(PropertyType::Number.matches(&Value::Integer(1)));
        assert!(PropertyType::Number.matches(&Value::Float(1.0)));
        assert!(!PropertyType::String.matches(&Value::Integer(1)));
        assert!(!PropertyType::Date.matches(&Value::from("2018-03-01")));
    }

    #[test]
    fn test_property_bag_roundtrips_through_serde() {
        let bag = props([("name", Value::from("pool")), ("private", Value::from(true))]);
        let json = serde_json::to_value(&bag).unwrap();
        assert_eq!(json, json!({"name": "pool", "private": true}));

        let back: Properties = serde_json::from_value(json).unwrap();
        assert_eq!(back, bag);
    }
}
