//! Schema Definitions
//!
//! A [`Schema`] describes one node label: its property definitions, the
//! derived required/unique/indexed sets, named relations to other labels and
//! lifecycle hooks.
//!
//! ## Derived sets
//!
//! `required_props`, `unique_props` and `indexes` are computed once, at
//! construction, and never recomputed. A property flagged both `unique` and
//! `index` only lands in `unique_props`: the uniqueness constraint already
//! implies an index, so it is never declared twice.
//!
//! ## Example
//!
//! ```rust
//! use cooper_ogm::models::{PropertyDef, PropertyType, Schema, Value};
//!
//! let mut schema = Schema::new([
//!     ("name", PropertyDef::new(PropertyType::String).required().unique()),
//!     ("location", PropertyType::String.into()),
//! ]);
//! schema.relate(
//!     "owns",
//!     "Pool",
//!     [("amount", PropertyDef::new(PropertyType::Number).default_value(Value::from(0)))],
//! );
//!
//! assert_eq!(schema.required_props(), ["name".to_string()]);
//! assert!(!schema.is_indexed());
//! ```

use super::validation::{validate_properties, validate_property, ValidationError};
use super::value::{Properties, PropertyType, Value};
use crate::utils::parse_date;
use regex::Regex;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::{Arc, RwLock};

/// Definition of a single node or relation property
#[derive(Debug, Clone)]
pub struct PropertyDef {
    /// Declared semantic type
    pub kind: PropertyType,
    pub required: bool,
    /// Enforced by a store constraint, never checked locally
    pub unique: bool,
    pub index: bool,
    pub lowercase: bool,
    pub uppercase: bool,
    /// Allowed values, if restricted
    pub enum_values: Option<Vec<Value>>,
    /// Pattern the value (as a string) must contain a match for
    pub pattern: Option<Regex>,
    /// Substituted for a missing value; only honored on relation properties
    pub default: Option<Value>,
}

impl PropertyDef {
    pub fn new(kind: PropertyType) -> Self {
        Self {
            kind,
            required: false,
            unique: false,
            index: false,
            lowercase: false,
            uppercase: false,
            enum_values: None,
            pattern: None,
            default: None,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn index(mut self) -> Self {
        self.index = true;
        self
    }

    pub fn lowercase(mut self) -> Self {
        self.lowercase = true;
        self
    }

    pub fn uppercase(mut self) -> Self {
        self.uppercase = true;
        self
    }

    /// Restrict the property to a fixed set of values
    pub fn one_of<I, T>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Value>,
    {
        self.enum_values = Some(values.into_iter().map(Into::into).collect());
        self
    }

    /// Require the value to match `pattern`
    pub fn pattern(self, pattern: &str) -> Result<Self, regex::Error> {
        Ok(self.with_regex(Regex::new(pattern)?))
    }

    pub fn with_regex(mut self, regex: Regex) -> Self {
        self.pattern = Some(regex);
        self
    }

    pub fn default_value(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }
}

impl From<PropertyType> for PropertyDef {
    fn from(kind: PropertyType) -> Self {
        PropertyDef::new(kind)
    }
}

/// Lifecycle events hooks can attach to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Lifecycle {
    Save,
    FindOne,
}

impl fmt::Display for Lifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Lifecycle::Save => f.write_str("save"),
            Lifecycle::FindOne => f.write_str("findOne"),
        }
    }
}

/// What a hook gets to see and mutate
///
/// - `Save` pre-hook: the node's properties before validation.
/// - `Save` after-hook: the validated properties, right after the write was
///   issued (its completion is not awaited yet).
/// - `FindOne` pre-hook: the match properties, before the query is issued.
/// - `FindOne` after-hook: the found node's properties, or `None`.
pub struct HookContext<'a> {
    pub event: Lifecycle,
    pub label: &'a str,
    pub id: Option<i64>,
    pub properties: Option<&'a mut Properties>,
}

/// A lifecycle hook. Returning an error aborts the operation.
pub type Hook = Arc<dyn Fn(&mut HookContext<'_>) -> anyhow::Result<()> + Send + Sync>;

/// Label of the model a relation points to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationTarget(pub String);

impl From<&str> for RelationTarget {
    fn from(label: &str) -> Self {
        RelationTarget(label.to_string())
    }
}

impl From<String> for RelationTarget {
    fn from(label: String) -> Self {
        RelationTarget(label)
    }
}

/// A named, directed relation from this schema's label to a target label
#[derive(Debug, Clone)]
pub struct RelationDef {
    target: String,
    properties: BTreeMap<String, PropertyDef>,
    required: Vec<String>,
}

impl RelationDef {
    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn properties(&self) -> &BTreeMap<String, PropertyDef> {
        &self.properties
    }

    /// Fill defaults, then validate the edge payload.
    ///
    /// Declared properties go through the same checks as node properties
    /// (Date-from-string coercion included). Undeclared keys pass through.
    pub fn prepare(&self, supplied: Properties) -> Result<Properties, ValidationError> {
        let mut payload = supplied;
        for (name, def) in &self.properties {
            let absent = payload.get(name).map_or(true, Value::is_null);
            if absent {
                if let Some(default) = &def.default {
                    payload.insert(name.clone(), default.clone());
                }
            }
        }

        let validated = validate_properties(&self.properties, &self.required, &payload)?;
        payload.retain(|name, value| !self.properties.contains_key(name) && !value.is_null());
        payload.extend(validated);
        Ok(payload)
    }
}

/// Declarative description of a node label
pub struct Schema {
    properties: BTreeMap<String, PropertyDef>,
    required_props: Vec<String>,
    unique_props: Vec<String>,
    indexes: Vec<String>,
    indexed: bool,
    relations: BTreeMap<String, RelationDef>,
    pre_hooks: RwLock<HashMap<Lifecycle, Hook>>,
    after_hooks: RwLock<HashMap<Lifecycle, Hook>>,
}

impl Schema {
    /// Build a schema and derive its required/unique/indexed sets.
    pub fn new<K, D, I>(properties: I) -> Self
    where
        K: Into<String>,
        D: Into<PropertyDef>,
        I: IntoIterator<Item = (K, D)>,
    {
        let properties: BTreeMap<String, PropertyDef> = properties
            .into_iter()
            .map(|(k, d)| (k.into(), d.into()))
            .collect();

        let mut required_props = Vec::new();
        let mut unique_props = Vec::new();
        let mut indexes = Vec::new();

        for (name, def) in &properties {
            if def.unique {
                unique_props.push(name.clone());
            }
            // Unique properties are already single-property indexes
            if def.index && !def.unique {
                indexes.push(name.clone());
            }
            if def.required {
                required_props.push(name.clone());
            }
        }

        let indexed = !indexes.is_empty();

        Self {
            properties,
            required_props,
            unique_props,
            indexes,
            indexed,
            relations: BTreeMap::new(),
            pre_hooks: RwLock::new(HashMap::new()),
            after_hooks: RwLock::new(HashMap::new()),
        }
    }

    pub fn properties(&self) -> &BTreeMap<String, PropertyDef> {
        &self.properties
    }

    pub fn property(&self, name: &str) -> Option<&PropertyDef> {
        self.properties.get(name)
    }

    pub fn required_props(&self) -> &[String] {
        &self.required_props
    }

    pub fn unique_props(&self) -> &[String] {
        &self.unique_props
    }

    pub fn indexes(&self) -> &[String] {
        &self.indexes
    }

    pub fn is_indexed(&self) -> bool {
        self.indexed
    }

    /// Register a relation. Its property definitions are only checked when
    /// an edge is created.
    pub fn relate<K, D, I>(&mut self, name: impl Into<String>, target: impl Into<RelationTarget>, properties: I)
    where
        K: Into<String>,
        D: Into<PropertyDef>,
        I: IntoIterator<Item = (K, D)>,
    {
        let properties: BTreeMap<String, PropertyDef> = properties
            .into_iter()
            .map(|(k, d)| (k.into(), d.into()))
            .collect();
        let required = properties
            .iter()
            .filter(|(_, def)| def.required)
            .map(|(name, _)| name.clone())
            .collect();

        self.relations.insert(
            name.into(),
            RelationDef {
                target: target.into().0,
                properties,
                required,
            },
        );
    }

    /// Register a relation that carries no declared properties.
    pub fn link(&mut self, name: impl Into<String>, target: impl Into<RelationTarget>) {
        self.relate(name, target, std::iter::empty::<(String, PropertyDef)>());
    }

    pub fn relation(&self, name: &str) -> Option<&RelationDef> {
        self.relations.get(name)
    }

    pub fn relations(&self) -> &BTreeMap<String, RelationDef> {
        &self.relations
    }

    /// Register a hook that runs before `event`; replaces any previous one.
    pub fn pre<F>(&self, event: Lifecycle, hook: F)
    where
        F: Fn(&mut HookContext<'_>) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let mut hooks = self.pre_hooks.write().unwrap_or_else(|e| e.into_inner());
        hooks.insert(event, Arc::new(hook));
    }

    /// Register a hook that runs after `event`; replaces any previous one.
    pub fn after<F>(&self, event: Lifecycle, hook: F)
    where
        F: Fn(&mut HookContext<'_>) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let mut hooks = self.after_hooks.write().unwrap_or_else(|e| e.into_inner());
        hooks.insert(event, Arc::new(hook));
    }

    pub fn pre_hook(&self, event: Lifecycle) -> Option<Hook> {
        let hooks = self.pre_hooks.read().unwrap_or_else(|e| e.into_inner());
        hooks.get(&event).cloned()
    }

    pub fn after_hook(&self, event: Lifecycle) -> Option<Hook> {
        let hooks = self.after_hooks.read().unwrap_or_else(|e| e.into_inner());
        hooks.get(&event).cloned()
    }

    /// Validate node properties for a write. See [`validate_properties`].
    pub fn validate(&self, properties: &Properties) -> Result<Properties, ValidationError> {
        validate_properties(&self.properties, &self.required_props, properties)
    }

    /// Validate a single declared property; unknown names pass unchanged.
    pub fn validate_one(&self, name: &str, value: Value) -> Result<Value, ValidationError> {
        match self.properties.get(name) {
            Some(def) => validate_property(name, value, def),
            None => Ok(value),
        }
    }

    /// Turn stringified dates read from the wire back into dates.
    ///
    /// Best-effort: strings that do not parse are left as they are.
    pub fn hydrate(&self, properties: &mut Properties) {
        for (name, value) in properties.iter_mut() {
            let is_date = self
                .properties
                .get(name)
                .is_some_and(|def| def.kind == PropertyType::Date);
            if !is_date {
                continue;
            }
            if let Some(date) = value.as_str().and_then(parse_date) {
                *value = Value::Date(date);
            }
        }
    }
}

impl Default for Schema {
    fn default() -> Self {
        Schema::new(std::iter::empty::<(String, PropertyDef)>())
    }
}

impl fmt::Debug for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schema")
            .field("properties", &self.properties.keys().collect::<Vec<_>>())
            .field("required_props", &self.required_props)
            .field("unique_props", &self.unique_props)
            .field("indexes", &self.indexes)
            .field("relations", &self.relations.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::props;
    use chrono::{TimeZone, Utc};

    fn user_like_schema() -> Schema {
        Schema::new([
            (
                "email",
                PropertyDef::new(PropertyType::String).required().unique().index(),
            ),
            ("nickname", PropertyDef::new(PropertyType::String).index()),
            ("city", PropertyDef::new(PropertyType::String).index().required()),
            ("joined", PropertyType::Date.into()),
        ])
    }

    #[test]
    fn test_partition_of_derived_sets() {
        let schema = user_like_schema();

        assert_eq!(schema.unique_props(), ["email".to_string()]);
        assert_eq!(schema.indexes(), ["city".to_string(), "nickname".to_string()]);
        assert_eq!(schema.required_props(), ["city".to_string(), "email".to_string()]);
        assert!(schema.is_indexed());
    }

    #[test]
    fn test_unique_and_indexes_are_disjoint() {
        let schema = user_like_schema();
        for name in schema.unique_props() {
            assert!(!schema.indexes().contains(name));
        }
    }

    #[test]
    fn test_unindexed_schema() {
        let schema = Schema::new([("name", PropertyDef::new(PropertyType::String).unique())]);
        assert!(!schema.is_indexed());
        assert!(schema.indexes().is_empty());
    }

    #[test]
    fn test_last_hook_registration_wins() {
        let schema = user_like_schema();
        schema.pre(Lifecycle::Save, |_| anyhow::bail!("first"));
        schema.pre(Lifecycle::Save, |_| Ok(()));

        let hook = schema.pre_hook(Lifecycle::Save).unwrap();
        let mut ctx = HookContext {
            event: Lifecycle::Save,
            label: "User",
            id: None,
            properties: None,
        };
        assert!(hook(&mut ctx).is_ok());
        assert!(schema.after_hook(Lifecycle::Save).is_none());
        assert!(schema.pre_hook(Lifecycle::FindOne).is_none());
    }

    #[test]
    fn test_relation_defaults_applied_before_validation() {
        let mut schema = user_like_schema();
        schema.relate(
            "owns",
            "Pool",
            [("amount", PropertyDef::new(PropertyType::Number).default_value(Value::from(0)))],
        );

        let relation = schema.relation("owns").unwrap();
        assert_eq!(relation.target(), "Pool");

        let payload = relation.prepare(Properties::new()).unwrap();
        assert_eq!(payload, props([("amount", Value::from(0))]));

        let err = relation
            .prepare(props([("amount", Value::from("lots"))]))
            .unwrap_err();
        assert!(matches!(err, ValidationError::TypeMismatch { .. }));
    }

    #[test]
    fn test_relation_payload_keeps_undeclared_keys() {
        let mut schema = user_like_schema();
        schema.relate(
            "visited",
            "Pool",
            [("since", PropertyDef::new(PropertyType::Date))],
        );

        let payload = schema
            .relation("visited")
            .unwrap()
            .prepare(props([
                ("since", Value::from("2018-02-01")),
                ("note", Value::from("first")),
            ]))
            .unwrap();

        assert_eq!(
            payload.get("since"),
            Some(&Value::Date(Utc.with_ymd_and_hms(2018, 2, 1, 0, 0, 0).unwrap()))
        );
        assert_eq!(payload.get("note"), Some(&Value::from("first")));
    }

    #[test]
    fn test_hydrate_parses_declared_dates_only() {
        let schema = user_like_schema();
        let mut bag = props([
            ("joined", Value::from("2018-02-01T00:00:00Z")),
            ("city", Value::from("2018-02-01")),
        ]);
        schema.hydrate(&mut bag);

        assert!(matches!(bag.get("joined"), Some(Value::Date(_))));
        assert_eq!(bag.get("city"), Some(&Value::from("2018-02-01")));
    }
}
