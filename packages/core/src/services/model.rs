//! Model Factory Output
//!
//! A [`Model`] binds a label to its [`Schema`] and the shared session. It
//! creates [`Node`]s and runs label-wide reads and deletes. Models are cheap
//! handles: cloning one shares the label, schema, session and provisioning
//! state.
//!
//! # Examples
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
//! session.on("MATCH (n:Pool", Reply::node(4, "Pool", json!({"name": "Ski trip"})));
//!
//! let store = GraphStore::new(session.clone());
//! let pools = store.model::<Properties>(
//!     "Pool",
//!     Schema::new([("name", PropertyDef::new(PropertyType::String).required())]),
//! );
//!
//! let found = pools.find(&props([("name", Value::from("Ski trip"))]), None).await.unwrap();
//! assert_eq!(found[0].id(), Some(4));
//! # });
//! ```

use super::error::OgmError;
use super::node::{from_properties, to_properties, Node, NodeData, Relationship};
use super::provision::{provision, ProvisionReport};
use crate::db::{bridge, statements, GraphSession, Record};
use crate::models::{Hook, HookContext, Lifecycle, Properties, RelationTarget, Schema};
use crate::utils::{to_regex_query, Combinator};
use std::collections::BTreeMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_stream::{Stream, StreamExt};

enum Provisioning {
    Running(JoinHandle<ProvisionReport>),
    /// Created outside a runtime; starts with the model's first operation
    Deferred,
    Finished(ProvisionReport),
}

/// Spawn provisioning on the current runtime, if there is one.
fn begin(session: &Arc<dyn GraphSession>, label: &str, schema: &Arc<Schema>) -> Provisioning {
    match tokio::runtime::Handle::try_current() {
        Ok(handle) => Provisioning::Running(handle.spawn(provision(
            Arc::clone(session),
            label.to_string(),
            Arc::clone(schema),
        ))),
        Err(_) => Provisioning::Deferred,
    }
}

struct ModelInner {
    label: String,
    schema: Arc<Schema>,
    session: Arc<dyn GraphSession>,
    provisioning: Mutex<Provisioning>,
}

/// Node class for one label, generic over the typed property record `P`
pub struct Model<P = Properties> {
    inner: Arc<ModelInner>,
    _record: PhantomData<fn() -> P>,
}

impl<P> Clone for Model<P> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            _record: PhantomData,
        }
    }
}

impl<P> fmt::Debug for Model<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Model")
            .field("label", &self.inner.label)
            .field("schema", &self.inner.schema)
            .finish()
    }
}

impl<P> From<&Model<P>> for RelationTarget {
    fn from(model: &Model<P>) -> Self {
        RelationTarget(model.label().to_string())
    }
}

impl<P> Model<P> {
    /// Build the model and start provisioning on the current runtime.
    pub(crate) fn create(label: String, schema: Arc<Schema>, session: Arc<dyn GraphSession>) -> Self {
        let provisioning = begin(&session, &label, &schema);

        Self {
            inner: Arc::new(ModelInner {
                label,
                schema,
                session,
                provisioning: Mutex::new(provisioning),
            }),
            _record: PhantomData,
        }
    }

    pub fn label(&self) -> &str {
        &self.inner.label
    }

    pub fn schema(&self) -> &Schema {
        &self.inner.schema
    }

    pub fn session(&self) -> &Arc<dyn GraphSession> {
        &self.inner.session
    }

    /// Wait for constraint/index provisioning and report what it did.
    ///
    /// Provisioning runs once per model; later calls return the same report.
    /// A caller that stops waiting leaves the task running for the next one.
    pub async fn provisioned(&self) -> ProvisionReport {
        let mut state = self.inner.provisioning.lock().await;
        self.start_provisioning(&mut state);

        let report = match &mut *state {
            Provisioning::Finished(report) => return report.clone(),
            Provisioning::Running(handle) => match handle.await {
                Ok(report) => report,
                Err(e) if e.is_cancelled() => {
                    tracing::warn!("Provisioning task for {} was cancelled, running it again", self.label());
                    self.provision_inline().await
                }
                Err(e) => {
                    tracing::warn!("Provisioning task for {} did not finish: {}", self.label(), e);
                    ProvisionReport {
                        label: self.label().to_string(),
                        ..Default::default()
                    }
                }
            },
            Provisioning::Deferred => self.provision_inline().await,
        };
        *state = Provisioning::Finished(report.clone());
        report
    }

    /// Block an operation until provisioning has finished, starting it if
    /// the model was built outside a runtime.
    pub(crate) async fn ensure_provisioned(&self) {
        self.provisioned().await;
    }

    fn start_provisioning(&self, state: &mut Provisioning) {
        if matches!(state, Provisioning::Deferred) {
            *state = begin(&self.inner.session, &self.inner.label, &self.inner.schema);
        }
    }

    async fn provision_inline(&self) -> ProvisionReport {
        provision(
            Arc::clone(&self.inner.session),
            self.inner.label.clone(),
            Arc::clone(&self.inner.schema),
        )
        .await
    }

    /// Run `hook` (if any) for `event`, mapping its error.
    pub(crate) fn run_hook(
        &self,
        hook: Option<Hook>,
        event: Lifecycle,
        id: Option<i64>,
        properties: Option<&mut Properties>,
    ) -> Result<(), OgmError> {
        let Some(hook) = hook else {
            return Ok(());
        };
        let mut ctx = HookContext {
            event,
            label: self.label(),
            id,
            properties,
        };
        hook(&mut ctx).map_err(|e| OgmError::hook_failed(self.label(), event, e))
    }

    /// Delete every node of this label matching `matching`.
    ///
    /// An empty match is refused before any query is issued; use
    /// [`Model::drop_all`] to clear the label.
    pub async fn remove(&self, matching: &Properties) -> Result<(), OgmError> {
        if matching.is_empty() {
            return Err(OgmError::empty_match(self.label()));
        }
        self.ensure_provisioned().await;
        let query = statements::delete_matching(self.label(), matching);
        bridge::execute(self.session().as_ref(), &query).await?;
        Ok(())
    }

    /// Delete every node of this label, with its relationships.
    pub async fn drop_all(&self) -> Result<(), OgmError> {
        self.ensure_provisioned().await;
        let query = statements::delete_all(self.label());
        bridge::execute(self.session().as_ref(), &query).await?;
        tracing::info!("Dropped all {} nodes", self.label());
        Ok(())
    }
}

impl<P: NodeData> Model<P> {
    /// A new, unsaved node
    pub fn new_node(&self, properties: P) -> Node<P> {
        Node::from_parts(self.clone(), None, properties)
    }

    /// A node for an identity that already exists in the store
    pub fn with_id(&self, properties: P, id: i64) -> Node<P> {
        Node::from_parts(self.clone(), Some(id), properties)
    }

    /// Build a node from the record field `key`.
    pub(crate) fn decode(&self, record: &Record, key: &str) -> Result<Node<P>, OgmError> {
        let wire = record.node(key)?;
        let id = wire.identity;
        let mut properties = wire.into_properties();
        self.schema().hydrate(&mut properties);
        Ok(self.with_id(from_properties(properties)?, id))
    }

    pub(crate) fn decode_pair(&self, record: &Record) -> Result<Relationship<P>, OgmError> {
        let rel = record.relationship("r")?;
        let node = self.decode(record, "b")?;
        Ok(Relationship {
            id: rel.identity,
            relation: rel.into_properties(),
            node,
        })
    }

    async fn collect_nodes(&self, query: &str) -> Result<Vec<Node<P>>, OgmError> {
        self.ensure_provisioned().await;
        let records = bridge::collect(self.session().as_ref(), query).await?;
        records.iter().map(|record| self.decode(record, "n")).collect()
    }

    async fn visit_nodes<F>(&self, query: &str, mut visit: F) -> Result<usize, OgmError>
    where
        F: FnMut(Node<P>),
    {
        self.ensure_provisioned().await;
        let subscription = bridge::issue(self.session().as_ref(), query);
        bridge::each(subscription, |record| {
            visit(self.decode(&record, "n")?);
            Ok::<(), OgmError>(())
        })
        .await
    }

    /// Every node of this label. `None` or `Some(0)` means no limit.
    pub async fn find_all(&self, limit: Option<usize>) -> Result<Vec<Node<P>>, OgmError> {
        self.find(&Properties::new(), limit).await
    }

    /// Visit every node of this label as it arrives; returns the count.
    pub async fn find_all_each<F>(&self, limit: Option<usize>, visit: F) -> Result<usize, OgmError>
    where
        F: FnMut(Node<P>),
    {
        let query = statements::find_nodes(self.label(), &Properties::new(), "", limit);
        self.visit_nodes(&query, visit).await
    }

    /// Nodes whose properties equal every entry of `matching`.
    pub async fn find(&self, matching: &Properties, limit: Option<usize>) -> Result<Vec<Node<P>>, OgmError> {
        let query = statements::find_nodes(self.label(), matching, "", limit);
        self.collect_nodes(&query).await
    }

    /// Visit matching nodes as they arrive.
    ///
    /// When nothing matches, `visit` is called exactly once with `None`.
    pub async fn find_each<F>(&self, matching: &Properties, limit: Option<usize>, mut visit: F) -> Result<usize, OgmError>
    where
        F: FnMut(Option<Node<P>>),
    {
        let query = statements::find_nodes(self.label(), matching, "", limit);
        let seen = self.visit_nodes(&query, |node| visit(Some(node))).await?;
        if seen == 0 {
            visit(None);
        }
        Ok(seen)
    }

    /// Matching nodes as a stream. The query is issued immediately.
    ///
    /// A model built outside a runtime starts provisioning here but the
    /// stream does not wait for it.
    pub fn find_stream(
        &self,
        matching: &Properties,
        limit: Option<usize>,
    ) -> impl Stream<Item = Result<Node<P>, OgmError>> + Send + 'static {
        if let Ok(mut state) = self.inner.provisioning.try_lock() {
            self.start_provisioning(&mut state);
        }
        let query = statements::find_nodes(self.label(), matching, "", limit);
        let model = self.clone();
        bridge::issue(self.session().as_ref(), &query)
            .into_stream()
            .map(move |item| {
                let record = item?;
                model.decode(&record, "n")
            })
    }

    /// Nodes matching `matching` whose properties also regex-match `like`.
    ///
    /// Patterns use the store's regex dialect, e.g. `(?i).*bob.*`.
    pub async fn find_like(
        &self,
        like: &BTreeMap<String, String>,
        matching: &Properties,
        limit: Option<usize>,
        combinator: Combinator,
    ) -> Result<Vec<Node<P>>, OgmError> {
        let where_clause = to_regex_query("n", like, combinator);
        let query = statements::find_nodes(self.label(), matching, &where_clause, limit);
        self.collect_nodes(&query).await
    }

    /// First node matching `matching`, with the `FindOne` hooks applied.
    ///
    /// The pre-hook may rewrite the match before the query is issued. The
    /// after-hook sees the found node's properties (or `None`) and may change
    /// them or fail the lookup.
    pub async fn find_one(&self, matching: &Properties) -> Result<Option<Node<P>>, OgmError> {
        let schema = self.schema();
        let mut matching = matching.clone();
        self.run_hook(schema.pre_hook(Lifecycle::FindOne), Lifecycle::FindOne, None, Some(&mut matching))?;

        let found = self.find(&matching, Some(1)).await?.into_iter().next();

        let Some(after) = schema.after_hook(Lifecycle::FindOne) else {
            return Ok(found);
        };
        match found {
            None => {
                self.run_hook(Some(after), Lifecycle::FindOne, None, None)?;
                Ok(None)
            }
            Some(node) => {
                let id = node.id();
                let mut properties = to_properties(node.properties())?;
                self.run_hook(Some(after), Lifecycle::FindOne, id, Some(&mut properties))?;
                Ok(Some(Node::from_parts(self.clone(), id, from_properties(properties)?)))
            }
        }
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Option<Node<P>>, OgmError> {
        let query = statements::find_node_by_id(self.label(), id);
        Ok(self.collect_nodes(&query).await?.into_iter().next())
    }
}
