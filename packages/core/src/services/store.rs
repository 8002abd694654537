//! Store Handle
//!
//! [`GraphStore`] owns the shared session and hands out models. There is no
//! global session: every model, and every node built from it, carries the
//! handle it was created from.

use super::error::OgmError;
use super::model::Model;
use super::node::NodeData;
use crate::config::ConnectionConfig;
use crate::db::{Connector, GraphSession, StoreError};
use crate::models::Schema;
use std::fmt;
use std::sync::Arc;

#[derive(Clone)]
pub struct GraphStore {
    session: Arc<dyn GraphSession>,
}

impl GraphStore {
    pub fn new(session: Arc<dyn GraphSession>) -> Self {
        Self { session }
    }

    /// Validate `config` and open a session through `connector`.
    pub async fn connect<C>(config: &ConnectionConfig, connector: &C) -> Result<Self, OgmError>
    where
        C: Connector + ?Sized,
    {
        config
            .validate()
            .map_err(|reason| StoreError::connection_failed(config.uri(), reason))?;

        let session = connector.connect(config).await?;
        tracing::info!("Connected to graph store at {}", config.uri());
        Ok(Self::new(session))
    }

    pub fn session(&self) -> &Arc<dyn GraphSession> {
        &self.session
    }

    /// Create the model for `label`.
    ///
    /// Constraint and index provisioning starts in the background on the
    /// current tokio runtime; see [`Model::provisioned`].
    pub fn model<P: NodeData>(&self, label: impl Into<String>, schema: impl Into<Arc<Schema>>) -> Model<P> {
        Model::create(label.into(), schema.into(), Arc::clone(&self.session))
    }

    pub async fn close(&self) -> Result<(), OgmError> {
        self.session.close().await.map_err(|e| {
            tracing::warn!("Failed to close graph session: {}", e);
            OgmError::from(e)
        })
    }
}

impl fmt::Debug for GraphStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GraphStore").finish_non_exhaustive()
    }
}
