//! Store Error Types
//!
//! Failures reported by, or while talking to, the graph session. Local
//! validation failures live in [`crate::models::ValidationError`]; this type
//! only covers what happens once a query has been handed over.

use thiserror::Error;

/// Graph session errors
///
/// Uniqueness violations arrive here as [`StoreError::Rejected`]: they are
/// enforced by store constraints, never checked locally.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    /// The store refused or failed the query
    #[error("Query rejected ({code}): {message}")]
    Rejected { code: String, message: String },

    /// The session dropped the subscription without a terminal event
    #[error("Result stream closed before completion: {query}")]
    StreamClosed { query: String },

    /// No session could be established
    #[error("Failed to connect to {uri}: {reason}")]
    ConnectionFailed { uri: String, reason: String },

    /// A record did not have the expected shape
    #[error("Malformed record: {0}")]
    MalformedRecord(String),
}

impl StoreError {
    /// Create a rejected query error
    pub fn rejected(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Rejected {
            code: code.into(),
            message: message.into(),
        }
    }

    /// Create a stream closed error
    pub fn stream_closed(query: impl Into<String>) -> Self {
        Self::StreamClosed {
            query: query.into(),
        }
    }

    /// Create a connection failed error
    pub fn connection_failed(uri: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ConnectionFailed {
            uri: uri.into(),
            reason: reason.into(),
        }
    }

    /// Create a malformed record error
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedRecord(msg.into())
    }

    /// Whether the store rejected the query because of a constraint
    pub fn is_constraint_violation(&self) -> bool {
        matches!(self, Self::Rejected { code, .. } if code.contains("ConstraintValidationFailed"))
    }
}
