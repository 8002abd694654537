//! Shared helpers for integration tests

#![allow(dead_code)]

use cooper_ogm::db::{Record, ScriptedSession};
use cooper_ogm::services::GraphStore;
use serde_json::json;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Install a test-friendly subscriber once; honours RUST_LOG.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_test_writer()
        .try_init();
}

/// A store over a fresh scripted session
pub fn scripted_store() -> (Arc<ScriptedSession>, GraphStore) {
    init_tracing();
    let session = Arc::new(ScriptedSession::new());
    let store = GraphStore::new(session.clone());
    (session, store)
}

/// Row for `RETURN ID(r)` probes
pub fn id_row(id: i64) -> Record {
    Record::new(vec!["ID(r)".to_string()], vec![json!(id)])
}
