//! Scripted sessions and recording sinks for exercising delivery policies.

use crate::{EventSink, SinkClosed, StreamEvent};

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use kafka_admin_broker::{BrokerError, BrokerErrorKind, ConsumerSession, Message};
use thiserror::Error;

#[derive(Debug, Error)]
#[error("scripted {kind} failure")]
pub struct ScriptedError {
    pub kind: BrokerErrorKind,
}

impl BrokerError for ScriptedError {
    fn kind(&self) -> BrokerErrorKind {
        self.kind
    }
}

#[derive(Debug)]
pub enum Step {
    Message(Message),
    /// Sleeps out the full poll timeout, then reports nothing.
    Idle,
    Fail(BrokerErrorKind),
    /// Never returns, ignoring the poll timeout.
    Hang,
}

/// Plays back a fixed script, then idles forever.
#[derive(Debug)]
pub struct ScriptedSession {
    steps: VecDeque<Step>,
    closes: Arc<AtomicUsize>,
    pulls: Arc<AtomicUsize>,
}

impl ScriptedSession {
    pub fn new(steps: impl IntoIterator<Item = Step>) -> Self {
        Self {
            steps: steps.into_iter().collect(),
            closes: Arc::new(AtomicUsize::new(0)),
            pulls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn close_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.closes)
    }

    pub fn pull_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.pulls)
    }
}

#[async_trait]
impl ConsumerSession for ScriptedSession {
    type Error = ScriptedError;

    async fn pull(&mut self, timeout: Duration) -> Result<Option<Message>, Self::Error> {
        self.pulls.fetch_add(1, Ordering::SeqCst);

        match self.steps.pop_front() {
            Some(Step::Message(message)) => Ok(Some(message)),
            Some(Step::Fail(kind)) => Err(ScriptedError { kind }),
            Some(Step::Hang) => std::future::pending().await,
            Some(Step::Idle) | None => {
                tokio::time::sleep(timeout).await;
                Ok(None)
            }
        }
    }

    fn close(&mut self) {
        self.closes.fetch_add(1, Ordering::SeqCst);
    }
}

pub fn message(offset: i64) -> Message {
    Message {
        topic: "orders".to_string(),
        partition: 0,
        offset,
        key: None,
        value: Bytes::from(format!("order-{offset}")),
        timestamp: 1_700_000_000_000 + offset,
        headers: std::collections::HashMap::new(),
    }
}

/// Records events; refuses writes once `capacity` events were accepted.
#[derive(Debug, Default)]
pub struct RecordingSink {
    pub events: Vec<StreamEvent>,
    pub capacity: Option<usize>,
}

impl RecordingSink {
    pub fn failing_after(capacity: usize) -> Self {
        Self {
            events: Vec::new(),
            capacity: Some(capacity),
        }
    }

    pub fn heartbeats(&self) -> usize {
        self.events
            .iter()
            .filter(|event| matches!(event, StreamEvent::Heartbeat))
            .count()
    }

    pub fn messages(&self) -> Vec<i64> {
        self.events
            .iter()
            .filter_map(|event| match event {
                StreamEvent::Message(message) => Some(message.offset),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl EventSink for RecordingSink {
    async fn send(&mut self, event: StreamEvent) -> Result<(), SinkClosed> {
        if self.capacity.is_some_and(|capacity| self.events.len() >= capacity) {
            return Err(SinkClosed);
        }

        self.events.push(event);
        Ok(())
    }
}
