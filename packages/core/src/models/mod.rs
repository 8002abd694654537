//! Data Models
//!
//! Plain data structures shared by every layer:
//!
//! - [`Value`] / [`Properties`] - property values and property bags
//! - [`PropertyType`] / [`PropertyDef`] - declared property semantics
//! - [`Schema`] - per-label description with relations and hooks
//! - [`ValidationError`] - local save-time failures
//! - [`Direction`] - which side of a directed edge a query anchors on

pub mod schema;
pub mod validation;
pub mod value;

pub use schema::{
    Hook, HookContext, Lifecycle, PropertyDef, RelationDef, RelationTarget, Schema,
};
pub use validation::{missing_properties, validate_properties, validate_property, ValidationError};
pub use value::{props, Properties, PropertyType, Value};

use std::fmt;

/// Edge direction relative to the current node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    /// `(current)-[r]->(other)`
    #[default]
    Out,
    /// `(current)<-[r]-(other)`
    In,
    /// Either way round
    Any,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Out => f.write_str("out"),
            Direction::In => f.write_str("in"),
            Direction::Any => f.write_str("any"),
        }
    }
}
