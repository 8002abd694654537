//! Node Instances
//!
//! A [`Node`] is a typed property record plus an optional store identity.
//! It dereferences to its record, so fields (or bag entries, for the untyped
//! [`Properties`] record) are read and written directly.
//!
//! # Identity
//!
//! A node without an id has never been saved. The first successful
//! [`Node::save`] takes the identity the store assigned; later saves replace
//! the stored property set of that identity and never change it.
//!
//! # Relations
//!
//! Relation writes ([`Node::relate`], [`Node::update_relation`],
//! [`Node::update_relation_by_id`]) require the relation to be declared on
//! the schema and run its property definitions over the payload. Reads take
//! any relation name.

use super::error::OgmError;
use super::model::Model;
use crate::db::{bridge, statements, GraphSession, StoreError};
use crate::models::{Direction, Lifecycle, Properties, RelationDef, Value};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value as Json;
use std::fmt;
use std::ops::{Deref, DerefMut};

/// Records that can back a node: anything serde can turn into a map
pub trait NodeData: Serialize + DeserializeOwned + Send + Sync + 'static {}

impl<T> NodeData for T where T: Serialize + DeserializeOwned + Send + Sync + 'static {}

pub(crate) fn to_properties<P: Serialize>(record: &P) -> Result<Properties, OgmError> {
    match serde_json::to_value(record)? {
        Json::Object(map) => Ok(map.into_iter().map(|(k, v)| (k, Value::from(v))).collect()),
        other => Err(OgmError::serialization(format!(
            "node record must serialize to a map, got {}",
            other
        ))),
    }
}

pub(crate) fn from_properties<P: DeserializeOwned>(properties: Properties) -> Result<P, OgmError> {
    Ok(serde_json::from_value(Value::Map(properties).to_json())?)
}

/// One end of a traversal: the edge's properties and the node it leads to
#[derive(Debug, Clone)]
pub struct Relationship<Q = Properties> {
    pub id: i64,
    pub relation: Properties,
    pub node: Node<Q>,
}

pub struct Node<P = Properties> {
    model: Model<P>,
    id: Option<i64>,
    properties: P,
}

impl<P> Node<P> {
    pub(crate) fn from_parts(model: Model<P>, id: Option<i64>, properties: P) -> Self {
        Self {
            model,
            id,
            properties,
        }
    }

    pub fn id(&self) -> Option<i64> {
        self.id
    }

    pub fn is_persisted(&self) -> bool {
        self.id.is_some()
    }

    pub fn label(&self) -> &str {
        self.model.label()
    }

    pub fn model(&self) -> &Model<P> {
        &self.model
    }

    pub fn properties(&self) -> &P {
        &self.properties
    }

    pub fn into_properties(self) -> P {
        self.properties
    }

    fn session(&self) -> &dyn GraphSession {
        self.model.session().as_ref()
    }

    fn persisted_id(&self) -> Result<i64, OgmError> {
        self.id.ok_or_else(|| OgmError::not_persisted(self.label()))
    }

    fn relation_def(&self, relation: &str) -> Result<&RelationDef, OgmError> {
        self.model
            .schema()
            .relation(relation)
            .ok_or_else(|| OgmError::unknown_relation(self.label(), relation))
    }
}

impl<P> Deref for Node<P> {
    type Target = P;

    fn deref(&self) -> &P {
        &self.properties
    }
}

impl<P> DerefMut for Node<P> {
    fn deref_mut(&mut self) -> &mut P {
        &mut self.properties
    }
}

impl<P: Clone> Clone for Node<P> {
    fn clone(&self) -> Self {
        Self {
            model: self.model.clone(),
            id: self.id,
            properties: self.properties.clone(),
        }
    }
}

impl<P: fmt::Debug> fmt::Debug for Node<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("label", &self.label())
            .field("id", &self.id)
            .field("properties", &self.properties)
            .finish()
    }
}

impl<P: NodeData> Node<P> {
    /// Validate and write this node.
    ///
    /// Order of events:
    /// 1. `Save` pre-hook (may change properties or abort)
    /// 2. required check, then per-property validation; nothing is sent if
    ///    either fails
    /// 3. normalized values are written back into the record
    /// 4. `CREATE` for a new node, full property replacement otherwise
    /// 5. `Save` after-hook, as soon as the write is issued
    /// 6. completion; a new node takes its identity from the result
    ///
    /// Only declared, non-null properties are written.
    pub async fn save(&mut self) -> Result<(), OgmError> {
        let model = self.model.clone();
        let schema = model.schema();
        let label = model.label();

        let mut properties = to_properties(&self.properties)?;
        model.run_hook(schema.pre_hook(Lifecycle::Save), Lifecycle::Save, self.id, Some(&mut properties))?;

        let mut validated = schema.validate(&properties)?;
        properties.extend(validated.iter().map(|(k, v)| (k.clone(), v.clone())));
        self.properties = from_properties(properties)?;

        let query = match self.id {
            None => statements::create_node(label, &validated),
            Some(id) => statements::update_node(label, id, &validated),
        };
        model.ensure_provisioned().await;
        let subscription = bridge::issue(self.session(), &query);
        let after = model.run_hook(schema.after_hook(Lifecycle::Save), Lifecycle::Save, self.id, Some(&mut validated));

        let records = bridge::drain(subscription).await?;
        if self.id.is_none() {
            let record = records
                .first()
                .ok_or_else(|| StoreError::malformed(format!("creating a {} node returned no record", label)))?;
            self.id = Some(record.node("n")?.identity);
            tracing::debug!("Created {} node {:?}", label, self.id);
        }

        if let Err(e) = &after {
            tracing::warn!("After-save hook on {} failed: {}", label, e);
        }
        after
    }

    /// Create a `relation` edge from this node to `other`.
    ///
    /// Refused before any query when the relation is undeclared, when
    /// `other` is not of the declared target label, or when either node is
    /// unsaved. Missing payload values take their declared defaults.
    pub async fn relate<Q>(&self, relation: &str, other: &Node<Q>, properties: Properties) -> Result<(), OgmError> {
        let def = self.relation_def(relation)?;
        if other.label() != def.target() {
            return Err(OgmError::target_mismatch(relation, def.target(), other.label()));
        }
        let id = self.persisted_id()?;
        let other_id = other.persisted_id()?;
        let payload = def.prepare(properties)?;

        let query = statements::create_relationship(self.label(), id, relation, other.label(), other_id, &payload);
        self.model.ensure_provisioned().await;
        bridge::execute(self.session(), &query).await?;
        Ok(())
    }

    /// Every `relation` edge in `direction`, with the node on the other end.
    pub async fn get_related<Q: NodeData>(
        &self,
        model: &Model<Q>,
        relation: &str,
        direction: Direction,
    ) -> Result<Vec<Relationship<Q>>, OgmError> {
        self.get_related_each(model, relation, direction, |_| {}).await
    }

    /// Like [`Node::get_related`], calling `visit` for each pair as it arrives.
    pub async fn get_related_each<Q, F>(
        &self,
        model: &Model<Q>,
        relation: &str,
        direction: Direction,
        mut visit: F,
    ) -> Result<Vec<Relationship<Q>>, OgmError>
    where
        Q: NodeData,
        F: FnMut(&Relationship<Q>),
    {
        let id = self.persisted_id()?;
        let query = statements::related(self.label(), id, relation, model.label(), direction);

        let mut related = Vec::new();
        self.model.ensure_provisioned().await;
        bridge::each(bridge::issue(self.session(), &query), |record| {
            let pair = model.decode_pair(&record)?;
            visit(&pair);
            related.push(pair);
            Ok::<(), OgmError>(())
        })
        .await?;
        Ok(related)
    }

    /// The `relation` edge between this node and node `other_id`, if any.
    pub async fn get_relation_with<Q: NodeData>(
        &self,
        model: &Model<Q>,
        relation: &str,
        other_id: i64,
        direction: Direction,
    ) -> Result<Option<Relationship<Q>>, OgmError> {
        let id = self.persisted_id()?;
        let query = statements::related_to(self.label(), id, relation, model.label(), other_id, direction);
        self.model.ensure_provisioned().await;
        bridge::first(self.session(), &query)
            .await?
            .map(|record| model.decode_pair(&record))
            .transpose()
    }

    /// Whether a `relation` edge, either way round, links this node to any
    /// node matching `matching`.
    pub async fn has_relation(&self, relation: &str, matching: &Properties) -> Result<bool, OgmError> {
        let id = self.persisted_id()?;
        let query = statements::relation_exists(self.label(), id, relation, matching, Direction::Any);
        self.model.ensure_provisioned().await;
        Ok(bridge::first(self.session(), &query).await?.is_some())
    }

    /// Whether a `relation` edge in `direction` links this node to `other`.
    pub async fn has_relation_with<Q>(&self, relation: &str, other: &Node<Q>, direction: Direction) -> Result<bool, OgmError> {
        let id = self.persisted_id()?;
        let other_id = other.persisted_id()?;
        let query = statements::relation_exists_with(self.label(), id, relation, other.label(), other_id, direction);
        self.model.ensure_provisioned().await;
        Ok(bridge::first(self.session(), &query).await?.is_some())
    }

    /// Replace the properties of outgoing `relation` edges to nodes matching
    /// `matching`.
    pub async fn update_relation(&self, relation: &str, matching: &Properties, properties: Properties) -> Result<(), OgmError> {
        let payload = self.relation_def(relation)?.prepare(properties)?;
        let id = self.persisted_id()?;
        let query = statements::update_relation(self.label(), id, relation, matching, &payload);
        self.model.ensure_provisioned().await;
        bridge::execute(self.session(), &query).await?;
        Ok(())
    }

    /// Replace the properties of the outgoing `relation` edge to node
    /// `other_id`.
    pub async fn update_relation_by_id(&self, relation: &str, other_id: i64, properties: Properties) -> Result<(), OgmError> {
        let payload = self.relation_def(relation)?.prepare(properties)?;
        let id = self.persisted_id()?;
        let query = statements::update_relation_by_id(self.label(), id, relation, other_id, &payload);
        self.model.ensure_provisioned().await;
        bridge::execute(self.session(), &query).await?;
        Ok(())
    }

    /// Delete `relation` edges between this node and `other`, whichever way
    /// they point.
    pub async fn remove_relation<Q>(&self, relation: &str, other: &Node<Q>) -> Result<(), OgmError> {
        let id = self.persisted_id()?;
        let other_id = other.persisted_id()?;
        let query = statements::delete_relation(self.label(), id, relation, other.label(), other_id);
        self.model.ensure_provisioned().await;
        bridge::execute(self.session(), &query).await?;
        Ok(())
    }
}
