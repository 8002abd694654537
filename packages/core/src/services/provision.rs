//! Constraint and Index Provisioning
//!
//! Runs once per model. The constraint listing is consulted first: only a
//! store with no constraints at all gets one uniqueness constraint per
//! unique property. The composite index is requested independently of that
//! check whenever the schema has indexed properties.
//!
//! Provisioning is advisory. Two processes creating the same model can both
//! see an empty listing and race; the store rejects the loser, which is
//! logged and otherwise ignored. Nothing here is ever returned as an error.

use crate::db::{bridge, statements, GraphSession, StoreError, Subscription};
use crate::models::Schema;
use std::sync::Arc;

/// What provisioning did for one label
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProvisionReport {
    pub label: String,

    /// Constraints the store already had; `None` if the listing failed
    pub existing_constraints: Option<usize>,

    /// Properties a uniqueness constraint was created for
    pub constraints_created: Vec<String>,

    /// Whether the composite index statement succeeded
    pub index_created: bool,

    /// Failed statements with their errors
    pub failures: Vec<(String, StoreError)>,
}

impl ProvisionReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

pub(crate) async fn provision(
    session: Arc<dyn GraphSession>,
    label: String,
    schema: Arc<Schema>,
) -> ProvisionReport {
    let mut report = ProvisionReport {
        label: label.clone(),
        ..Default::default()
    };

    let listing = bridge::issue(session.as_ref(), statements::LIST_CONSTRAINTS);
    let index: Option<(String, Subscription)> = schema.is_indexed().then(|| {
        let query = statements::create_index(&label, schema.indexes());
        let subscription = bridge::issue(session.as_ref(), &query);
        (query, subscription)
    });

    match bridge::drain(listing).await {
        Ok(existing) => {
            report.existing_constraints = Some(existing.len());
            if existing.is_empty() {
                create_constraints(session.as_ref(), &label, &schema, &mut report).await;
            } else {
                tracing::debug!(
                    "Skipping unique constraints for {}: store already has {} constraint(s)",
                    label,
                    existing.len()
                );
            }
        }
        Err(e) => {
            tracing::warn!("Failed to list constraints for {}: {}", label, e);
            report
                .failures
                .push((statements::LIST_CONSTRAINTS.to_string(), e));
        }
    }

    if let Some((query, subscription)) = index {
        match bridge::finish(subscription).await {
            Ok(_) => {
                tracing::info!("Created index for label {}", label);
                report.index_created = true;
            }
            Err(e) => {
                tracing::warn!("Failed to create index for label {}: {}", label, e);
                report.failures.push((query, e));
            }
        }
    }

    report
}

async fn create_constraints(
    session: &dyn GraphSession,
    label: &str,
    schema: &Schema,
    report: &mut ProvisionReport,
) {
    for property in schema.unique_props() {
        let query = statements::create_unique_constraint(label, property);
        match bridge::execute(session, &query).await {
            Ok(_) => {
                tracing::info!("Created unique constraint for {}.{}", label, property);
                report.constraints_created.push(property.clone());
            }
            Err(e) => {
                tracing::warn!(
                    "Failed to create unique constraint for {}.{}: {}",
                    label,
                    property,
                    e
                );
                report.failures.push((query, e));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{Record, Reply, ScriptedSession};
    use crate::models::{PropertyDef, PropertyType};
    use serde_json::json;

    fn schema() -> Arc<Schema> {
        Arc::new(Schema::new([
            ("email", PropertyDef::new(PropertyType::String).unique().index()),
            ("name", PropertyDef::new(PropertyType::String).unique()),
            ("city", PropertyDef::new(PropertyType::String).index()),
        ]))
    }

    #[tokio::test]
    async fn test_empty_store_gets_constraints_and_index() {
        let session = Arc::new(ScriptedSession::new());
        let report = provision(session.clone(), "User".into(), schema()).await;

        assert_eq!(report.existing_constraints, Some(0));
        assert_eq!(report.constraints_created, vec!["email", "name"]);
        assert!(report.index_created);
        assert!(report.is_clean());
        assert_eq!(session.count_matching("IS UNIQUE"), 2);
        assert_eq!(session.count_matching("CREATE INDEX ON :User(city)"), 1);
    }

    #[tokio::test]
    async fn test_existing_constraints_skip_creation_but_not_index() {
        let session = Arc::new(ScriptedSession::new());
        session.on(
            "db.constraints",
            Reply::rows(vec![Record::new(vec!["description".into()], vec![json!("CONSTRAINT ON ...")])]),
        );

        let report = provision(session.clone(), "User".into(), schema()).await;

        assert_eq!(report.existing_constraints, Some(1));
        assert!(report.constraints_created.is_empty());
        assert!(report.index_created);
        assert_eq!(session.count_matching("CREATE CONSTRAINT"), 0);
    }

    #[tokio::test]
    async fn test_failures_are_collected_not_raised() {
        let session = Arc::new(ScriptedSession::new());
        session.on(
            "ASSERT n.name",
            Reply::fail(StoreError::rejected("Neo.ClientError.Schema.EquivalentSchemaRuleAlreadyExists", "exists")),
        );

        let report = provision(session.clone(), "User".into(), schema()).await;

        assert_eq!(report.constraints_created, vec!["email"]);
        assert_eq!(report.failures.len(), 1);
        assert!(!report.is_clean());
    }
}
