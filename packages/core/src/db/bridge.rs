//! Query Execution Bridge
//!
//! Adapts the subscription protocol into the three result shapes the
//! services need: everything, the first record, or just the completion.
//! Every statement goes through [`issue`], which is where query text gets
//! logged.

use super::error::StoreError;
use super::record::Record;
use super::session::{GraphSession, ResultSummary, SessionEvent, Subscription};

/// Hand `query` to the session.
pub fn issue(session: &dyn GraphSession, query: &str) -> Subscription {
    tracing::debug!("Issuing query: {}", query);
    session.run(query)
}

/// Visit each record as it arrives; returns how many were visited.
///
/// Stops at the first visitor error or store error.
pub async fn each<E, F>(mut subscription: Subscription, mut visit: F) -> Result<usize, E>
where
    E: From<StoreError>,
    F: FnMut(Record) -> Result<(), E>,
{
    let mut seen = 0;
    while let Some(event) = subscription.next_event().await {
        match event {
            SessionEvent::Next(record) => {
                seen += 1;
                visit(record)?;
            }
            SessionEvent::Completed(_) => break,
            SessionEvent::Error(error) => return Err(error.into()),
        }
    }
    Ok(seen)
}

/// Wait for completion, keeping every record.
pub async fn drain(subscription: Subscription) -> Result<Vec<Record>, StoreError> {
    let mut records = Vec::new();
    each(subscription, |record| {
        records.push(record);
        Ok::<(), StoreError>(())
    })
    .await?;
    Ok(records)
}

/// Wait for completion, discarding records.
pub async fn finish(mut subscription: Subscription) -> Result<ResultSummary, StoreError> {
    let query = subscription.query().to_string();
    while let Some(event) = subscription.next_event().await {
        match event {
            SessionEvent::Next(_) => {}
            SessionEvent::Completed(summary) => return Ok(summary),
            SessionEvent::Error(error) => return Err(error),
        }
    }
    Err(StoreError::stream_closed(query))
}

/// Run `query` and collect every record.
pub async fn collect(session: &dyn GraphSession, query: &str) -> Result<Vec<Record>, StoreError> {
    drain(issue(session, query)).await
}

/// Run `query` and return the first record, once the query has completed.
pub async fn first(session: &dyn GraphSession, query: &str) -> Result<Option<Record>, StoreError> {
    Ok(collect(session, query).await?.into_iter().next())
}

/// Run `query` for its effect.
pub async fn execute(session: &dyn GraphSession, query: &str) -> Result<ResultSummary, StoreError> {
    finish(issue(session, query)).await
}
