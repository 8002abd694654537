//! Graph Session Boundary
//!
//! The only way this crate reaches the store: hand a query string to
//! [`GraphSession::run`] and consume the returned [`Subscription`].
//!
//! A subscription delivers zero or more `Next` events followed by exactly one
//! terminal event, `Completed` or `Error`. Events of one subscription are
//! never interleaved with another's from the consumer's point of view. If the
//! producing side goes away without a terminal event, consumers see
//! [`StoreError::StreamClosed`].
//!
//! Three ways to consume a subscription:
//!
//! - [`Subscription::subscribe`] with an [`Observer`] (callback style)
//! - [`Subscription::next_event`] (pull, one event at a time)
//! - [`Subscription::into_stream`] (a `Stream` of records)

use super::error::StoreError;
use super::record::Record;
use crate::config::ConnectionConfig;
use async_trait::async_trait;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::sync::mpsc;
use tokio_stream::Stream;

/// Metadata delivered with the terminal `Completed` event
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultSummary {
    pub query: String,
    /// Records delivered before completion
    pub records: usize,
}

/// A single subscription event
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    Next(Record),
    Completed(ResultSummary),
    Error(StoreError),
}

/// Callback-style consumer of a subscription
pub trait Observer {
    fn on_next(&mut self, record: Record);

    fn on_completed(&mut self, _summary: ResultSummary) {}

    fn on_error(&mut self, error: StoreError);
}

/// A query session
///
/// Implementations adapt a concrete driver. `run` must not block: it issues
/// the query and returns a subscription that the driver feeds as results
/// arrive.
#[async_trait]
pub trait GraphSession: Send + Sync {
    fn run(&self, query: &str) -> Subscription;

    /// Release the session. Further `run` calls have unspecified results.
    async fn close(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

/// Opens sessions from connection settings (the driver adapter)
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, config: &ConnectionConfig) -> Result<Arc<dyn GraphSession>, StoreError>;
}

/// Producing half of a subscription, held by the session implementation
#[derive(Debug)]
pub struct SubscriptionSender {
    query: String,
    delivered: usize,
    tx: mpsc::UnboundedSender<SessionEvent>,
}

impl SubscriptionSender {
    /// Push a record. Ignored if the consumer is gone.
    pub fn next(&mut self, record: Record) {
        self.delivered += 1;
        let _ = self.tx.send(SessionEvent::Next(record));
    }

    pub fn complete(self) {
        let summary = ResultSummary {
            query: self.query,
            records: self.delivered,
        };
        let _ = self.tx.send(SessionEvent::Completed(summary));
    }

    pub fn fail(self, error: StoreError) {
        let _ = self.tx.send(SessionEvent::Error(error));
    }
}

/// Consuming half of a query's result stream
#[derive(Debug)]
pub struct Subscription {
    query: String,
    rx: mpsc::UnboundedReceiver<SessionEvent>,
    finished: bool,
}

impl Subscription {
    /// Create a connected sender/subscription pair for `query`
    pub fn channel(query: impl Into<String>) -> (SubscriptionSender, Subscription) {
        let query = query.into();
        let (tx, rx) = mpsc::unbounded_channel();
        let sender = SubscriptionSender {
            query: query.clone(),
            delivered: 0,
            tx,
        };
        let subscription = Subscription {
            query,
            rx,
            finished: false,
        };
        (sender, subscription)
    }

    /// A subscription that has already failed
    pub fn failed(query: impl Into<String>, error: StoreError) -> Subscription {
        let (sender, subscription) = Self::channel(query);
        sender.fail(error);
        subscription
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    /// Next event, or `None` once the terminal event has been delivered.
    pub async fn next_event(&mut self) -> Option<SessionEvent> {
        if self.finished {
            return None;
        }
        let event = self.rx.recv().await;
        self.settle(event)
    }

    fn settle(&mut self, event: Option<SessionEvent>) -> Option<SessionEvent> {
        match event {
            Some(SessionEvent::Next(record)) => Some(SessionEvent::Next(record)),
            Some(terminal) => {
                self.finished = true;
                Some(terminal)
            }
            None => {
                self.finished = true;
                Some(SessionEvent::Error(StoreError::stream_closed(&self.query)))
            }
        }
    }

    /// Drive the subscription to its end, forwarding every event.
    pub async fn subscribe<O: Observer + ?Sized>(mut self, observer: &mut O) {
        while let Some(event) = self.next_event().await {
            match event {
                SessionEvent::Next(record) => observer.on_next(record),
                SessionEvent::Completed(summary) => observer.on_completed(summary),
                SessionEvent::Error(error) => observer.on_error(error),
            }
        }
    }

    /// Records as a stream; a failure ends the stream with one `Err` item.
    pub fn into_stream(self) -> RecordStream {
        RecordStream { inner: self }
    }
}

/// Stream adapter returned by [`Subscription::into_stream`]
#[derive(Debug)]
pub struct RecordStream {
    inner: Subscription,
}

impl Stream for RecordStream {
    type Item = Result<Record, StoreError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let sub = &mut self.inner;
        if sub.finished {
            return Poll::Ready(None);
        }
        let event = match sub.rx.poll_recv(cx) {
            Poll::Ready(event) => event,
            Poll::Pending => return Poll::Pending,
        };
        Poll::Ready(match sub.settle(event) {
            Some(SessionEvent::Next(record)) => Some(Ok(record)),
            Some(SessionEvent::Error(error)) => Some(Err(error)),
            Some(SessionEvent::Completed(_)) | None => None,
        })
    }
}
