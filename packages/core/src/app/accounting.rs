//! Pool Contribution Accounting
//!
//! Sums what participants have paid into a pool, read from the `paid`
//! property of `participates` edges.
//!
//! The requester's own contribution is excluded from the total. Whether
//! the debt ceiling should count it is an open product question; the rule
//! is kept as the application has always applied it.

use super::schemas::User;
use crate::services::Relationship;

/// Sum of `paid` over `participants`, leaving out the participant whose
/// email equals `requester_email`.
///
/// Emails compare case-insensitively; a missing or non-numeric `paid`
/// counts as 0.
pub fn total_paid_excluding(participants: &[Relationship<User>], requester_email: &str) -> f64 {
    participants
        .iter()
        .filter(|pair| !pair.node.email.eq_ignore_ascii_case(requester_email))
        .filter_map(|pair| pair.relation.get("paid").and_then(|paid| paid.as_f64()))
        .sum()
}

/// Whether the requester may add `amount` without the other participants'
/// total exceeding `ceiling`.
pub fn within_debt_ceiling(
    participants: &[Relationship<User>],
    requester_email: &str,
    amount: f64,
    ceiling: f64,
) -> bool {
    total_paid_excluding(participants, requester_email) + amount <= ceiling
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::ScriptedSession;
    use crate::models::{props, Schema, Value};
    use crate::services::GraphStore;
    use std::sync::Arc;

    fn participants() -> Vec<Relationship<User>> {
        let store = GraphStore::new(Arc::new(ScriptedSession::new()));
        let users = store.model::<User>("User", Schema::default());
        [("ada@x.io", Value::from(10)), ("bob@x.io", Value::from(2.5)), ("cy@x.io", Value::Null)]
            .into_iter()
            .enumerate()
            .map(|(i, (email, paid))| Relationship {
                id: i as i64,
                relation: props([("paid", paid)]),
                node: users.with_id(User::new(email), i as i64 + 100),
            })
            .collect()
    }

    #[test]
    fn test_requester_is_excluded() {
        let pairs = participants();
        assert_eq!(total_paid_excluding(&pairs, "ADA@x.io"), 2.5);
        assert_eq!(total_paid_excluding(&pairs, "nobody@x.io"), 12.5);
    }

    #[test]
    fn test_debt_ceiling() {
        let pairs = participants();
        assert!(within_debt_ceiling(&pairs, "ada@x.io", 7.5, 10.0));
        assert!(!within_debt_ceiling(&pairs, "ada@x.io", 8.0, 10.0));
    }
}
