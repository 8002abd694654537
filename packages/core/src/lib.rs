//! Cooper Object-Graph Mapping
//!
//! This crate maps application records onto a graph store reached only
//! through a query-string session with subscription-style results.
//!
//! # Architecture
//!
//! - **Schema first**: each label is described once by a [`Schema`]
//!   (property types, required/unique/indexed sets, relations, hooks)
//! - **Query strings only**: every operation renders one statement and hands
//!   it to [`GraphSession::run`]; values are inlined as property literals
//! - **Store-enforced uniqueness**: unique properties become store
//!   constraints, provisioned once per model and never checked locally
//! - **One result type**: saves, finds and relation operations all return
//!   `Result<_, OgmError>`
//!
//! # Modules
//!
//! - [`models`] - values, schemas, validation
//! - [`db`] - session boundary, wire records, statements, result bridge
//! - [`services`] - store handle, models, nodes, provisioning
//! - [`utils`] - coercion and query literal helpers
//! - [`config`] - connection settings
//! - [`app`] - the application's `User` and `Pool` models
//!
//! # Example
//!
//! ```rust
//! use cooper_ogm::db::{Reply, ScriptedSession};
//! use cooper_ogm::models::{props, PropertyDef, PropertyType, Properties, Schema, Value};
//! use cooper_ogm::services::GraphStore;
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! # tokio_test::block_on(async {
//! let session = Arc::new(ScriptedSession::new());
//! session.on("CREATE (n:Pool", Reply::node(1, "Pool", json!({"name": "Ski trip"})));
//!
//! let store = GraphStore::new(session.clone());
//! let pools = store.model::<Properties>(
//!     "Pool",
//!     Schema::new([("name", PropertyDef::new(PropertyType::String).required())]),
//! );
//!
//! let mut pool = pools.new_node(props([("name", Value::from("Ski trip"))]));
//! pool.save().await.unwrap();
//! assert_eq!(pool.id(), Some(1));
//! # });
//! ```

pub mod app;
pub mod config;
pub mod db;
pub mod models;
pub mod services;
pub mod utils;

// Re-export commonly used types
pub use config::ConnectionConfig;
pub use db::{GraphSession, StoreError};
pub use models::*;
pub use services::*;
