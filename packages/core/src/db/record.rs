//! Wire Records
//!
//! Result rows as the session delivers them: a list of `keys` and a parallel
//! list of `_fields`. Fields holding graph entities decode into
//! [`WireNode`] / [`WireRelationship`]; every integer on the way out may be a
//! plain number or a `{low, high}` pair.

use super::error::StoreError;
use crate::models::{Properties, Value};
use crate::utils::{flatten_numeric_properties, wire_integer};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{json, Map, Value as Json};

/// One result row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub keys: Vec<String>,
    #[serde(rename = "_fields")]
    pub fields: Vec<Json>,
}

impl Record {
    pub fn new(keys: Vec<String>, fields: Vec<Json>) -> Self {
        Self { keys, fields }
    }

    /// Raw field for `key`
    pub fn get(&self, key: &str) -> Option<&Json> {
        let pos = self.keys.iter().position(|k| k == key)?;
        self.fields.get(pos)
    }

    fn field(&self, key: &str) -> Result<&Json, StoreError> {
        self.get(key)
            .ok_or_else(|| StoreError::malformed(format!("record has no field `{}`", key)))
    }

    /// Decode the node held in `key`
    pub fn node(&self, key: &str) -> Result<WireNode, StoreError> {
        WireNode::deserialize(self.field(key)?)
            .map_err(|e| StoreError::malformed(format!("field `{}` is not a node: {}", key, e)))
    }

    /// Decode the relationship held in `key`
    pub fn relationship(&self, key: &str) -> Result<WireRelationship, StoreError> {
        WireRelationship::deserialize(self.field(key)?).map_err(|e| {
            StoreError::malformed(format!("field `{}` is not a relationship: {}", key, e))
        })
    }

    /// Decode the integer held in `key`
    pub fn integer(&self, key: &str) -> Result<i64, StoreError> {
        wire_integer(self.field(key)?)
            .ok_or_else(|| StoreError::malformed(format!("field `{}` is not an integer", key)))
    }

    /// Build a single-field record holding a node. Handy for session doubles.
    pub fn with_node(key: &str, identity: i64, label: &str, properties: Json) -> Self {
        Self::new(
            vec![key.to_string()],
            vec![node_json(identity, &[label], properties)],
        )
    }
}

/// Wire representation of a node, wrapped the way the session sends it
pub fn node_json(identity: i64, labels: &[&str], properties: Json) -> Json {
    json!({
        "identity": wrap_integer(identity),
        "labels": labels,
        "properties": properties,
    })
}

/// Wire representation of a relationship
pub fn relationship_json(identity: i64, start: i64, end: i64, rel_type: &str, properties: Json) -> Json {
    json!({
        "identity": wrap_integer(identity),
        "start": wrap_integer(start),
        "end": wrap_integer(end),
        "type": rel_type,
        "properties": properties,
    })
}

/// Split a 64-bit integer into its `{low, high}` wire form
pub fn wrap_integer(n: i64) -> Json {
    json!({ "low": n as i32, "high": (n >> 32) as i32 })
}

fn de_wire_integer<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    let raw = Json::deserialize(deserializer)?;
    wire_integer(&raw).ok_or_else(|| serde::de::Error::custom(format!("not an integer: {}", raw)))
}

fn de_properties<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Map<String, Json>, D::Error> {
    let mut properties = Option::<Map<String, Json>>::deserialize(deserializer)?.unwrap_or_default();
    flatten_numeric_properties(&mut properties);
    Ok(properties)
}

fn into_bag(properties: Map<String, Json>) -> Properties {
    properties
        .into_iter()
        .map(|(k, v)| (k, Value::from(v)))
        .collect()
}

/// A node as it came off the wire, integers already flattened
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct WireNode {
    #[serde(deserialize_with = "de_wire_integer")]
    pub identity: i64,
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default, deserialize_with = "de_properties")]
    pub properties: Map<String, Json>,
}

impl WireNode {
    pub fn into_properties(self) -> Properties {
        into_bag(self.properties)
    }
}

/// A relationship as it came off the wire, integers already flattened
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct WireRelationship {
    #[serde(deserialize_with = "de_wire_integer")]
    pub identity: i64,
    #[serde(deserialize_with = "de_wire_integer")]
    pub start: i64,
    #[serde(deserialize_with = "de_wire_integer")]
    pub end: i64,
    #[serde(rename = "type")]
    pub rel_type: String,
    #[serde(default, deserialize_with = "de_properties")]
    pub properties: Map<String, Json>,
}

impl WireRelationship {
    pub fn into_properties(self) -> Properties {
        into_bag(self.properties)
    }
}
