//! Database Layer
//!
//! Everything that touches the graph session:
//!
//! - [`GraphSession`] / [`Subscription`] - the query-string boundary
//! - [`Record`] - wire rows, nodes and relationships
//! - [`statements`] - query text for every operation
//! - [`bridge`] - subscription to `Result` adapters
//! - [`ScriptedSession`] - rule-driven session for tests and local runs
//!
//! # Architecture
//!
//! The store is reached only through `run(query) -> subscription`. There is
//! no parameter binding: values are rendered into the query text by
//! [`crate::utils::to_query_props`]. Identities and integers come back as
//! `{low, high}` pairs and are flattened as records are decoded.

pub mod bridge;
mod error;
pub mod record;
mod scripted;
mod session;
pub mod statements;

pub use error::StoreError;
pub use record::{Record, WireNode, WireRelationship};
pub use scripted::{Reply, ScriptedSession};
pub use session::{
    Connector, GraphSession, Observer, RecordStream, ResultSummary, SessionEvent, Subscription,
    SubscriptionSender,
};
