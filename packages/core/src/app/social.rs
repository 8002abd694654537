//! Friends and Pools
//!
//! Application flows over the `User` and `Pool` models: user search, the
//! friend request handshake, account deletion and pool membership.

use super::schemas::{pool_schema, user_schema, Pool, User, POOL, USER};
use crate::models::{props, Direction, Properties, Value};
use crate::services::{GraphStore, Model, Node, OgmError, Relationship};
use crate::utils::Combinator;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

/// The application's models, created once per store
#[derive(Debug, Clone)]
pub struct AppModels {
    pub users: Model<User>,
    pub pools: Model<Pool>,
}

impl AppModels {
    pub fn register(store: &GraphStore) -> Result<Self, OgmError> {
        Ok(Self {
            users: store.model(USER, user_schema()?),
            pools: store.model(POOL, pool_schema()),
        })
    }

    /// Users whose name or email contains `term`, ignoring case.
    pub async fn search_users(&self, term: &str) -> Result<Vec<Node<User>>, OgmError> {
        let pattern = format!("(?i).*{}.*", regex::escape(term));
        let like = BTreeMap::from([
            ("email".to_string(), pattern.clone()),
            ("name".to_string(), pattern),
        ]);
        self.users
            .find_like(&like, &Properties::new(), None, Combinator::Or)
            .await
    }

    pub async fn find_user_by_email(&self, email: &str) -> Result<Option<Node<User>>, OgmError> {
        self.users
            .find_one(&props([("email", Value::from(email))]))
            .await
    }

    /// The user holding password reset `token`, if it is still valid at `now`.
    ///
    /// A token without an expiry, or one that expired at or before `now`, is
    /// treated as unknown.
    pub async fn find_by_reset_token(&self, token: &str, now: DateTime<Utc>) -> Result<Option<Node<User>>, OgmError> {
        let found = self
            .users
            .find_one(&props([("passwordResetToken", Value::from(token))]))
            .await?;
        Ok(found.filter(|user| user.password_reset_expires.is_some_and(|expires| expires > now)))
    }

    /// Ask `to` to become a friend of `from`.
    ///
    /// Returns `false` without writing when a request already exists in
    /// either direction.
    pub async fn send_friend_request(&self, from: &Node<User>, to: &Node<User>) -> Result<bool, OgmError> {
        if to.has_relation_with("friendRequest", from, Direction::Any).await? {
            return Ok(false);
        }
        from.relate("friendRequest", to, Properties::new()).await?;
        tracing::debug!("Friend request sent from {:?} to {:?}", from.id(), to.id());
        Ok(true)
    }

    /// Users who asked `user` to be friends.
    pub async fn friend_requests(&self, user: &Node<User>) -> Result<Vec<Node<User>>, OgmError> {
        let pairs = user.get_related(&self.users, "friendRequest", Direction::In).await?;
        Ok(pairs.into_iter().map(|pair| pair.node).collect())
    }

    pub async fn friends(&self, user: &Node<User>) -> Result<Vec<Node<User>>, OgmError> {
        let pairs = user.get_related(&self.users, "friendOf", Direction::Any).await?;
        Ok(pairs.into_iter().map(|pair| pair.node).collect())
    }

    /// Accept the pending request `requester` sent to `user`.
    ///
    /// Returns `false` when there is no such request.
    pub async fn accept_friend_request(&self, user: &Node<User>, requester: &Node<User>) -> Result<bool, OgmError> {
        if !user.has_relation_with("friendRequest", requester, Direction::In).await? {
            return Ok(false);
        }
        requester.relate("friendOf", user, Properties::new()).await?;
        requester.remove_relation("friendRequest", user).await?;
        Ok(true)
    }

    /// Drop the pending request `requester` sent to `user`.
    pub async fn decline_friend_request(&self, user: &Node<User>, requester: &Node<User>) -> Result<bool, OgmError> {
        if !user.has_relation_with("friendRequest", requester, Direction::In).await? {
            return Ok(false);
        }
        requester.remove_relation("friendRequest", user).await?;
        Ok(true)
    }

    /// Delete `user` and every edge touching it.
    pub async fn delete_account(&self, user: &Node<User>) -> Result<(), OgmError> {
        self.users
            .remove(&props([("email", Value::from(user.email.as_str()))]))
            .await
    }

    /// Save `pool` and record `owner` as its owner.
    pub async fn create_pool(&self, owner: &Node<User>, pool: Pool) -> Result<Node<Pool>, OgmError> {
        let mut node = self.pools.new_node(pool);
        node.save().await?;
        owner.relate("owns", &node, Properties::new()).await?;
        Ok(node)
    }

    /// Add `user` to `pool`; `paid` defaults to 0 when not given.
    pub async fn join_pool(&self, user: &Node<User>, pool: &Node<Pool>, paid: Option<f64>) -> Result<(), OgmError> {
        let mut payload = Properties::new();
        if let Some(paid) = paid {
            payload.insert("paid".to_string(), Value::from(paid));
        }
        user.relate("participates", pool, payload).await
    }

    /// Participants of `pool` with their `participates` edge.
    pub async fn participants(&self, pool: &Node<Pool>) -> Result<Vec<Relationship<User>>, OgmError> {
        pool.get_related(&self.users, "participates", Direction::In).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{Reply, ScriptedSession};
    use serde_json::json;
    use std::sync::Arc;

    fn setup() -> (Arc<ScriptedSession>, AppModels) {
        let session = Arc::new(ScriptedSession::new());
        let models = AppModels::register(&GraphStore::new(session.clone())).unwrap();
        (session, models)
    }

    #[tokio::test]
    async fn test_search_escapes_term_and_uses_or() {
        let (session, models) = setup();
        models.search_users("a.b").await.unwrap();

        assert_eq!(
            session.count_matching(r#"MATCH (n:User) WHERE n.email =~ "(?i).*a\\.b.*" OR n.name =~ "(?i).*a\\.b.*" RETURN n"#),
            1
        );
    }

    #[tokio::test]
    async fn test_reset_token_is_honoured_only_before_expiry() {
        let (session, models) = setup();
        session.on(
            r#"{passwordResetToken: "t0k3n"}"#,
            Reply::node(
                3,
                "User",
                json!({"email": "ada@x.io", "passwordResetToken": "t0k3n", "passwordResetExpires": "2018-04-02T10:30:00Z"}),
            ),
        );
        let before = DateTime::parse_from_rfc3339("2018-04-02T10:00:00Z").unwrap().with_timezone(&Utc);
        let after = DateTime::parse_from_rfc3339("2018-04-02T11:00:00Z").unwrap().with_timezone(&Utc);

        let valid = models.find_by_reset_token("t0k3n", before).await.unwrap();
        let expired = models.find_by_reset_token("t0k3n", after).await.unwrap();
        let unknown = models.find_by_reset_token("other", before).await.unwrap();

        assert_eq!(valid.map(|user| user.id()), Some(Some(3)));
        assert!(expired.is_none());
        assert!(unknown.is_none());
        assert_eq!(
            session.count_matching(r#"MATCH (n:User {passwordResetToken: "t0k3n"}) RETURN n LIMIT 1"#),
            2
        );
    }

    #[tokio::test]
    async fn test_duplicate_friend_request_is_not_written() {
        let (session, models) = setup();
        session.on("RETURN ID(r)", Reply::rows(vec![crate::db::Record::new(vec!["ID(r)".into()], vec![json!(5)])]));
        let ada = models.users.with_id(User::new("ada@x.io"), 1);
        let bob = models.users.with_id(User::new("bob@x.io"), 2);

        assert!(!models.send_friend_request(&ada, &bob).await.unwrap());
        assert_eq!(session.count_matching("CREATE (a)-[r:friendRequest"), 0);
    }

    #[tokio::test]
    async fn test_accept_creates_friendship_and_drops_request() {
        let (session, models) = setup();
        session.on("RETURN ID(r)", Reply::rows(vec![crate::db::Record::new(vec!["ID(r)".into()], vec![json!(5)])]));
        let ada = models.users.with_id(User::new("ada@x.io"), 1);
        let bob = models.users.with_id(User::new("bob@x.io"), 2);

        assert!(models.accept_friend_request(&ada, &bob).await.unwrap());
        assert_eq!(session.count_matching("WHERE ID(a) = 2 AND ID(b) = 1 CREATE (a)-[r:friendOf {}]->(b)"), 1);
        assert_eq!(session.count_matching("MATCH (a:User)-[r:friendRequest]-(b:User) WHERE ID(a) = 2 AND ID(b) = 1 DELETE r"), 1);
    }

    #[tokio::test]
    async fn test_decline_without_request_is_noop() {
        let (session, models) = setup();
        let ada = models.users.with_id(User::new("ada@x.io"), 1);
        let bob = models.users.with_id(User::new("bob@x.io"), 2);

        assert!(!models.decline_friend_request(&ada, &bob).await.unwrap());
        assert_eq!(session.count_matching("DELETE r"), 0);
    }

    #[tokio::test]
    async fn test_join_pool_defaults_paid() {
        let (session, models) = setup();
        let ada = models.users.with_id(User::new("ada@x.io"), 1);
        let pool = models.pools.with_id(Pool::new("ski", false), 7);

        models.join_pool(&ada, &pool, None).await.unwrap();
        assert_eq!(session.count_matching("CREATE (a)-[r:participates {paid: 0}]->(b)"), 1);
    }

    #[tokio::test]
    async fn test_pool_cannot_be_a_friend() {
        let (session, models) = setup();
        let ada = models.users.with_id(User::new("ada@x.io"), 1);
        let pool = models.pools.with_id(Pool::new("ski", false), 7);

        let err = ada.relate("friendOf", &pool, Properties::new()).await.unwrap_err();
        assert!(matches!(err, OgmError::RelationTargetMismatch { .. }));
        assert_eq!(session.count_matching("friendOf"), 0);
    }
}
