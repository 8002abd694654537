//! Scripted Session
//!
//! A [`GraphSession`] that answers from rules instead of a store. Every query
//! is recorded, so tests can assert both what came back and what was (or
//! was not) sent.
//!
//! Rules match by substring. The most recently registered matching rule
//! wins; `once` rules are discarded after their first use. A query matching
//! no rule completes with no records.
//!
//! ```rust
//! use cooper_ogm::db::{bridge, Record, Reply, ScriptedSession};
//! use serde_json::json;
//!
//! # tokio_test::block_on(async {
//! let session = ScriptedSession::new();
//! session.on("CREATE (n:Pool", Reply::rows(vec![Record::with_node("n", 1, "Pool", json!({}))]));
//!
//! let rows = bridge::collect(&session, "CREATE (n:Pool {}) RETURN n").await.unwrap();
//! assert_eq!(rows.len(), 1);
//! assert_eq!(session.count_matching("CREATE"), 1);
//! # });
//! ```

use super::error::StoreError;
use super::record::Record;
use super::session::{GraphSession, Subscription};
use async_trait::async_trait;
use serde_json::Value as Json;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

/// What a rule answers with
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Rows(Vec<Record>),
    Fail(StoreError),
}

impl Reply {
    pub fn rows(records: Vec<Record>) -> Self {
        Reply::Rows(records)
    }

    pub fn empty() -> Self {
        Reply::Rows(Vec::new())
    }

    pub fn fail(error: StoreError) -> Self {
        Reply::Fail(error)
    }

    /// One record with a single node bound to `n`
    pub fn node(identity: i64, label: &str, properties: Json) -> Self {
        Reply::Rows(vec![Record::with_node("n", identity, label, properties)])
    }
}

type Responder = Arc<dyn Fn(&str) -> Reply + Send + Sync>;

struct Rule {
    needle: String,
    responder: Responder,
    once: bool,
}

/// Rule-driven session double
#[derive(Default)]
pub struct ScriptedSession {
    rules: Mutex<Vec<Rule>>,
    log: Mutex<Vec<String>>,
    closed: AtomicBool,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

impl ScriptedSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer every query containing `needle` with `reply`.
    pub fn on(&self, needle: &str, reply: Reply) {
        self.push(needle, Arc::new(move |_| reply.clone()), false);
    }

    /// Answer the next query containing `needle` with `reply`.
    pub fn once(&self, needle: &str, reply: Reply) {
        self.push(needle, Arc::new(move |_| reply.clone()), true);
    }

    /// Compute the answer from the query text.
    pub fn respond<F>(&self, needle: &str, responder: F)
    where
        F: Fn(&str) -> Reply + Send + Sync + 'static,
    {
        self.push(needle, Arc::new(responder), false);
    }

    fn push(&self, needle: &str, responder: Responder, once: bool) {
        lock(&self.rules).push(Rule {
            needle: needle.to_string(),
            responder,
            once,
        });
    }

    /// Every query received so far, in order
    pub fn queries(&self) -> Vec<String> {
        lock(&self.log).clone()
    }

    pub fn count_matching(&self, needle: &str) -> usize {
        lock(&self.log).iter().filter(|q| q.contains(needle)).count()
    }

    pub fn clear_queries(&self) {
        lock(&self.log).clear();
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn reply_for(&self, query: &str) -> Reply {
        let responder = {
            let mut rules = lock(&self.rules);
            match rules.iter().rposition(|rule| query.contains(&rule.needle)) {
                Some(pos) if rules[pos].once => Some(rules.remove(pos).responder),
                Some(pos) => Some(Arc::clone(&rules[pos].responder)),
                None => None,
            }
        };
        responder.map_or_else(Reply::empty, |respond| respond(query))
    }
}

#[async_trait]
impl GraphSession for ScriptedSession {
    fn run(&self, query: &str) -> Subscription {
        lock(&self.log).push(query.to_string());

        let (mut sender, subscription) = Subscription::channel(query);
        match self.reply_for(query) {
            Reply::Rows(records) => {
                for record in records {
                    sender.next(record);
                }
                sender.complete();
            }
            Reply::Fail(error) => sender.fail(error),
        }
        subscription
    }

    async fn close(&self) -> Result<(), StoreError> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::bridge;

    #[tokio::test]
    async fn test_latest_rule_wins_and_once_is_consumed() {
        let session = ScriptedSession::new();
        session.on("MATCH", Reply::empty());
        session.once("MATCH", Reply::fail(StoreError::malformed("first only")));

        assert!(bridge::collect(&session, "MATCH (n) RETURN n").await.is_err());
        assert!(bridge::collect(&session, "MATCH (n) RETURN n").await.unwrap().is_empty());
        assert_eq!(session.count_matching("MATCH"), 2);
    }

    #[tokio::test]
    async fn test_unmatched_query_completes_empty() {
        let session = ScriptedSession::new();
        let summary = bridge::execute(&session, "CALL db.constraints()").await.unwrap();
        assert_eq!(summary.records, 0);
        assert_eq!(session.queries(), vec!["CALL db.constraints()"]);
    }

    #[tokio::test]
    async fn test_close_marks_session() {
        let session = ScriptedSession::new();
        session.close().await.unwrap();
        assert!(session.is_closed());
    }
}
