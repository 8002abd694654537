//! Store End-to-End Tests
//!
//! Drives whole flows through a scripted session that behaves like a store
//! with a uniqueness constraint: connecting, provisioning, duplicate
//! rejection and the user flows built on top.

mod common;

#[cfg(test)]
mod store_e2e_tests {
    use super::common::{init_tracing, scripted_store};
    use anyhow::Result;
    use async_trait::async_trait;
    use cooper_ogm::app::{AppModels, User};
    use cooper_ogm::db::{Connector, GraphSession, Record, Reply, ScriptedSession, Subscription, SubscriptionSender};
    use cooper_ogm::models::{props, PropertyDef, PropertyType, Properties, Schema, Value};
    use cooper_ogm::{ConnectionConfig, GraphStore, Model, OgmError, StoreError};
    use regex::Regex;
    use serde_json::json;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicI64, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    const CONSTRAINT_FAILED: &str = "Neo.ClientError.Schema.ConstraintValidationFailed";

    /// Make `CREATE (n:<label> ...)` behave as if `property` carried a
    /// uniqueness constraint.
    fn enforce_unique(session: &ScriptedSession, label: &'static str, property: &str) {
        let value = Regex::new(&format!(r#"{}: ("(?:[^"\\]|\\.)*")"#, property)).unwrap();
        let seen = Mutex::new(HashSet::new());
        let next_id = AtomicI64::new(1);

        session.respond(&format!("CREATE (n:{} ", label), move |query| {
            let key = value.captures(query).map(|c| c[1].to_string());
            if let Some(key) = key {
                if !seen.lock().unwrap().insert(key.clone()) {
                    return Reply::fail(StoreError::rejected(
                        CONSTRAINT_FAILED,
                        format!("Node already exists with label {} and property {}", label, key),
                    ));
                }
            }
            Reply::node(next_id.fetch_add(1, Ordering::SeqCst), label, json!({}))
        });
    }

    fn teams(store: &GraphStore) -> Model {
        store.model(
            "Team",
            Schema::new([
                ("name", PropertyDef::new(PropertyType::String).required().unique()),
                ("city", PropertyDef::new(PropertyType::String).index()),
                ("founded", PropertyType::Number.into()),
            ]),
        )
    }

    struct Fixed(Arc<ScriptedSession>);

    #[async_trait]
    impl Connector for Fixed {
        async fn connect(&self, _config: &ConnectionConfig) -> Result<Arc<dyn GraphSession>, StoreError> {
            Ok(self.0.clone())
        }
    }

    #[tokio::test]
    async fn test_second_save_with_same_unique_value_is_rejected_by_store() -> Result<()> {
        let (session, store) = scripted_store();
        enforce_unique(&session, "Team", "name");
        let teams = teams(&store);

        let mut first = teams.new_node(props([("name", Value::from("Rovers"))]));
        first.save().await?;
        let mut second = teams.new_node(props([("name", Value::from("Rovers")), ("founded", Value::from(1900))]));
        let err = second.save().await.unwrap_err();

        assert_eq!(first.id(), Some(1));
        assert!(!second.is_persisted());
        match err {
            OgmError::Store(store_err) => assert!(store_err.is_constraint_violation()),
            other => panic!("expected a store rejection, got {:?}", other),
        }
        assert_eq!(session.count_matching("CREATE (n:Team "), 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_update_replaces_properties_of_saved_node() -> Result<()> {
        let (session, store) = scripted_store();
        enforce_unique(&session, "Team", "name");
        session.on("SET n =", Reply::node(1, "Team", json!({})));
        let teams = teams(&store);

        let mut team = teams.new_node(props([("name", Value::from("Rovers"))]));
        team.save().await?;
        team.insert("city".to_string(), Value::from("Leeds"));
        team.save().await?;

        assert_eq!(
            session.count_matching(r#"MATCH (n:Team) WHERE ID(n) = 1 SET n = {city: "Leeds", name: "Rovers"} RETURN n"#),
            1
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_provisioning_on_empty_store_creates_constraint_and_index() -> Result<()> {
        let (session, store) = scripted_store();
        let report = teams(&store).provisioned().await;

        assert!(report.is_clean());
        assert_eq!(report.existing_constraints, Some(0));
        assert_eq!(report.constraints_created, vec!["name".to_string()]);
        assert!(report.index_created);
        assert_eq!(session.count_matching("CREATE CONSTRAINT ON (n:Team) ASSERT n.name IS UNIQUE"), 1);
        assert_eq!(session.count_matching("CREATE INDEX ON :Team(city)"), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_provisioning_skips_constraints_when_store_has_some() -> Result<()> {
        let (session, store) = scripted_store();
        session.on(
            "CALL db.constraints()",
            Reply::rows(vec![Record::new(
                vec!["description".into()],
                vec![json!("CONSTRAINT ON ( user:User ) ASSERT user.email IS UNIQUE")],
            )]),
        );
        session.on("CREATE INDEX", Reply::fail(StoreError::rejected("Neo.ClientError.Schema.IndexAlreadyExists", "exists")));

        let teams = teams(&store);
        let report = teams.provisioned().await;
        let again = teams.provisioned().await;

        assert_eq!(report.existing_constraints, Some(1));
        assert!(report.constraints_created.is_empty());
        assert!(!report.index_created);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report, again);
        assert_eq!(session.count_matching("CALL db.constraints()"), 1);
        assert_eq!(session.count_matching("CREATE CONSTRAINT"), 0);
        Ok(())
    }

    /// Session that keeps the first constraint listing open until released
    /// and completes everything else empty.
    #[derive(Default)]
    struct HeldListing {
        log: Mutex<Vec<String>>,
        held: Mutex<Option<SubscriptionSender>>,
        released: Mutex<bool>,
    }

    impl HeldListing {
        fn release(&self) {
            *self.released.lock().unwrap() = true;
            if let Some(sender) = self.held.lock().unwrap().take() {
                sender.complete();
            }
        }

        fn count(&self, needle: &str) -> usize {
            self.log.lock().unwrap().iter().filter(|q| q.contains(needle)).count()
        }
    }

    #[async_trait]
    impl GraphSession for HeldListing {
        fn run(&self, query: &str) -> Subscription {
            self.log.lock().unwrap().push(query.to_string());
            let (sender, subscription) = Subscription::channel(query);
            let released = *self.released.lock().unwrap();
            let mut held = self.held.lock().unwrap();
            if query == "CALL db.constraints()" && !released && held.is_none() {
                *held = Some(sender);
            } else {
                sender.complete();
            }
            subscription
        }
    }

    #[test]
    fn test_model_built_outside_runtime_provisions_on_first_operation() -> Result<()> {
        let session = Arc::new(ScriptedSession::new());
        session.on("CREATE (n:Team ", Reply::node(1, "Team", json!({})));
        let store = GraphStore::new(session.clone());
        let teams = teams(&store);
        assert_eq!(session.count_matching("CALL db.constraints()"), 0);

        let mut team = teams.new_node(props([("name", Value::from("a"))]));
        tokio_test::block_on(team.save())?;
        let found = tokio_test::block_on(teams.find_all(None))?;

        let queries = session.queries();
        let constraint = "CREATE CONSTRAINT ON (n:Team) ASSERT n.name IS UNIQUE";
        let created = r#"CREATE (n:Team {name: "a"}) RETURN n"#;
        assert!(found.is_empty());
        assert_eq!(session.count_matching("CALL db.constraints()"), 1);
        assert_eq!(session.count_matching(constraint), 1);
        let position = |query: &str| queries.iter().position(|q| q == query);
        assert!(position(constraint) < position(created));
        assert_eq!(queries.last().map(String::as_str), Some("MATCH (n:Team) RETURN n"));
        Ok(())
    }

    #[tokio::test]
    async fn test_abandoned_wait_does_not_provision_twice() -> Result<()> {
        let session = Arc::new(HeldListing::default());
        let store = GraphStore::new(session.clone());
        let teams = teams(&store);

        let first = tokio::time::timeout(Duration::from_millis(20), teams.provisioned()).await;
        assert!(first.is_err());

        session.release();
        let report = teams.provisioned().await;

        assert_eq!(report.constraints_created, vec!["name".to_string()]);
        assert_eq!(session.count("CALL db.constraints()"), 1);
        assert_eq!(session.count("CREATE CONSTRAINT ON (n:Team) ASSERT n.name IS UNIQUE"), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_connect_and_close() -> Result<()> {
        init_tracing();
        let session = Arc::new(ScriptedSession::new());
        let config = ConnectionConfig::from_lookup(|key| (key == "NODE_ENV").then(|| "test".to_string()));

        let store = GraphStore::connect(&config, &Fixed(session.clone())).await?;
        store.close().await?;

        assert!(session.is_closed());
        Ok(())
    }

    #[tokio::test]
    async fn test_connect_refuses_invalid_config() -> Result<()> {
        let session = Arc::new(ScriptedSession::new());
        let config = ConnectionConfig {
            host: String::new(),
            ..Default::default()
        };

        let err = GraphStore::connect(&config, &Fixed(session)).await.unwrap_err();

        assert!(matches!(err, OgmError::Store(StoreError::ConnectionFailed { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_user_signup_and_lookup_normalize_email() -> Result<()> {
        let (session, store) = scripted_store();
        enforce_unique(&session, "User", "email");
        session.on(
            r#"MATCH (n:User {email: "ada@cooper.io"}) RETURN n LIMIT 1"#,
            Reply::node(1, "User", json!({ "email": "ada@cooper.io", "name": "Ada" })),
        );
        let models = AppModels::register(&store)?;

        let mut ada = models.users.new_node(User::new("Ada@Cooper.IO"));
        ada.name = Some("Ada".into());
        ada.save().await?;
        let mut twin = models.users.new_node(User::new("ADA@cooper.io"));
        let duplicate = twin.save().await;

        let found = models.find_user_by_email("ADA@COOPER.IO").await?.expect("user by email");

        assert_eq!(ada.email, "ada@cooper.io");
        assert!(matches!(duplicate, Err(OgmError::Store(ref e)) if e.is_constraint_violation()));
        assert_eq!(found.id(), Some(1));
        assert_eq!(found.display_name(), "Ada");
        Ok(())
    }

    #[tokio::test]
    async fn test_delete_account_detaches_user() -> Result<()> {
        let (session, store) = scripted_store();
        let models = AppModels::register(&store)?;
        let ada = models.users.with_id(User::new("ada@cooper.io"), 1);

        models.delete_account(&ada).await?;

        assert_eq!(
            session.count_matching(r#"MATCH (n:User {email: "ada@cooper.io"}) DETACH DELETE n"#),
            1
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_pool_participation_flow() -> Result<()> {
        let (session, store) = scripted_store();
        session.on("CREATE (n:Pool", Reply::node(7, "Pool", json!({})));
        let models = AppModels::register(&store)?;
        let ada = models.users.with_id(User::new("ada@cooper.io"), 1);

        let pool = models
            .create_pool(&ada, cooper_ogm::app::Pool::new("Ski trip", true))
            .await?;
        models.join_pool(&ada, &pool, Some(25.5)).await?;

        assert_eq!(pool.id(), Some(7));
        assert_eq!(session.count_matching("WHERE ID(a) = 1 AND ID(b) = 7 CREATE (a)-[r:owns {}]->(b)"), 1);
        assert_eq!(session.count_matching("CREATE (a)-[r:participates {paid: 25.5}]->(b)"), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_find_one_without_match_is_none() -> Result<()> {
        let (_session, store) = scripted_store();
        let teams = teams(&store);

        let found = teams.find_one(&Properties::from([("name".to_string(), Value::from("Nobody"))])).await?;

        assert!(found.is_none());
        Ok(())
    }
}
