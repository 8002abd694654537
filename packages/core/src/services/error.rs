//! Service Layer Error Types
//!
//! The single error type every model and node operation returns.

use crate::db::StoreError;
use crate::models::ValidationError;
use thiserror::Error;

/// Mapping layer errors
///
/// Local failures (validation, unknown relation, empty match) are raised
/// before any query is issued; store failures arrive after the fact.
#[derive(Error, Debug)]
pub enum OgmError {
    /// Property validation failed
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// The session reported an error
    #[error("Store operation failed: {0}")]
    Store(#[from] StoreError),

    /// Relation name not declared on the schema
    #[error("Unknown relation `{relation}` on {label}")]
    UnknownRelation { label: String, relation: String },

    /// Other end of a relation is not of the declared target model
    #[error("Relation `{relation}` expects a {expected} node but received a {actual} node")]
    RelationTargetMismatch {
        relation: String,
        expected: String,
        actual: String,
    },

    /// Operation needs a node that has been saved
    #[error("{label} node has not been saved yet")]
    NotPersisted { label: String },

    /// Delete requested with an empty match
    #[error("Refusing to remove {label} nodes without a match; use drop_all")]
    EmptyMatch { label: String },

    /// A lifecycle hook reported an error
    #[error("{event} hook on {label} failed: {source}")]
    HookFailed {
        label: String,
        event: String,
        #[source]
        source: anyhow::Error,
    },

    /// Typed record could not be converted to or from properties
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// A schema declared an invalid `match` pattern
    #[error("Invalid property pattern: {0}")]
    InvalidPattern(#[from] regex::Error),
}

impl OgmError {
    /// Create an unknown relation error
    pub fn unknown_relation(label: impl Into<String>, relation: impl Into<String>) -> Self {
        Self::UnknownRelation {
            label: label.into(),
            relation: relation.into(),
        }
    }

    /// Create a relation target mismatch error
    pub fn target_mismatch(
        relation: impl Into<String>,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        Self::RelationTargetMismatch {
            relation: relation.into(),
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Create a not persisted error
    pub fn not_persisted(label: impl Into<String>) -> Self {
        Self::NotPersisted {
            label: label.into(),
        }
    }

    /// Create an empty match error
    pub fn empty_match(label: impl Into<String>) -> Self {
        Self::EmptyMatch {
            label: label.into(),
        }
    }

    /// Create a hook failed error
    pub fn hook_failed(label: impl Into<String>, event: impl ToString, source: anyhow::Error) -> Self {
        Self::HookFailed {
            label: label.into(),
            event: event.to_string(),
            source,
        }
    }

    /// Create a serialization error
    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::Serialization(msg.into())
    }
}

impl From<serde_json::Error> for OgmError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
