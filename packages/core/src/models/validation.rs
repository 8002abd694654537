//! Save-time validation
//!
//! Every check here runs locally, before a query is issued. Uniqueness is
//! deliberately absent: it is enforced by the store's constraint and only
//! shows up as a store error after the write.

use super::schema::PropertyDef;
use super::value::{Properties, PropertyType, Value};
use crate::utils::check_type;
use std::collections::BTreeMap;
use thiserror::Error;

/// Local validation failures
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Missing required properties: {}", .missing.join(", "))]
    MissingRequiredProperties { missing: Vec<String> },

    #[error("Type mismatch: expected {property} to be a {expected} but received a {actual}")]
    TypeMismatch {
        property: String,
        expected: PropertyType,
        actual: String,
    },

    #[error("{value} not in enum definition of {property}")]
    EnumViolation { property: String, value: String },

    #[error("{property} must match {pattern}")]
    PatternViolation { property: String, pattern: String },
}

impl ValidationError {
    pub fn missing_required(missing: Vec<String>) -> Self {
        Self::MissingRequiredProperties { missing }
    }

    pub fn type_mismatch(
        property: impl Into<String>,
        expected: PropertyType,
        actual: impl Into<String>,
    ) -> Self {
        Self::TypeMismatch {
            property: property.into(),
            expected,
            actual: actual.into(),
        }
    }

    pub fn enum_violation(property: impl Into<String>, value: &Value) -> Self {
        let value = match value {
            Value::String(s) => s.clone(),
            other => crate::utils::literal(other),
        };
        Self::EnumViolation {
            property: property.into(),
            value,
        }
    }

    pub fn pattern_violation(property: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self::PatternViolation {
            property: property.into(),
            pattern: pattern.into(),
        }
    }
}

/// Names of `required` properties that `properties` does not carry.
///
/// A null value counts as not carried. Order follows `required`.
pub fn missing_properties(required: &[String], properties: &Properties) -> Vec<String> {
    required
        .iter()
        .filter(|name| properties.get(*name).map_or(true, Value::is_null))
        .cloned()
        .collect()
}

/// Validate and normalize one carried property against its definition.
pub fn validate_property(name: &str, value: Value, def: &PropertyDef) -> Result<Value, ValidationError> {
    let mut value = check_type(name, value, def.kind)?;

    if let Value::String(s) = &mut value {
        if def.uppercase {
            *s = s.to_uppercase();
        }
        if def.lowercase {
            *s = s.to_lowercase();
        }
    }

    if let Some(allowed) = &def.enum_values {
        let listed = match value.as_f64() {
            Some(n) if def.kind == PropertyType::Number => allowed.iter().any(|a| a.as_f64() == Some(n)),
            _ => allowed.contains(&value),
        };
        if !listed {
            return Err(ValidationError::enum_violation(name, &value));
        }
    }

    if let Some(pattern) = &def.pattern {
        let text = match &value {
            Value::String(s) => s.clone(),
            other => crate::utils::literal(other),
        };
        if !pattern.is_match(&text) {
            return Err(ValidationError::pattern_violation(name, pattern.as_str()));
        }
    }

    Ok(value)
}

/// Validate a property bag against a set of definitions.
///
/// Runs the required check first, then validates every declared property
/// the bag actually carries. Returns only the validated, declared
/// properties; nulls and undeclared keys are left out.
pub fn validate_properties(
    defs: &BTreeMap<String, PropertyDef>,
    required: &[String],
    properties: &Properties,
) -> Result<Properties, ValidationError> {
    let missing = missing_properties(required, properties);
    if !missing.is_empty() {
        return Err(ValidationError::missing_required(missing));
    }

    let mut validated = Properties::new();
    for (name, def) in defs {
        let Some(value) = properties.get(name).filter(|v| !v.is_null()) else {
            continue;
        };
        validated.insert(name.clone(), validate_property(name, value.clone(), def)?);
    }

    Ok(validated)
}
