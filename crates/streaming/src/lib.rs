//! Streaming consumption on top of a broker gateway.
//!
//! Turns a pull-based consumer session into either a bounded batch (up to N
//! messages within a deadline) or a live stream pushed into an [`EventSink`]
//! with heartbeats while idle.
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

mod batch;
mod event;
mod live;
mod scoped;
mod sink;

#[cfg(test)]
mod test_support;

pub use batch::BoundedBatch;
pub use event::{HEARTBEAT_COMMENT, StreamEvent};
pub use live::{LiveStream, LiveStreamOutcome, StreamEnd};
pub use scoped::ScopedSession;
pub use sink::{EventSink, SinkClosed};

use std::num::NonZeroUsize;
use std::time::Duration;

use kafka_admin_broker::{BrokerGateway, Message, SessionOptions};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Timing knobs for the delivery policies.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StreamingConfig {
    /// Per-pull timeout used while collecting a batch.
    pub batch_poll_interval: Duration,

    /// Per-pull timeout of a live stream, and the heartbeat spacing while idle.
    pub heartbeat_interval: Duration,
}

impl Default for StreamingConfig {
    fn default() -> Self {
        Self {
            batch_poll_interval: Duration::from_millis(100),
            heartbeat_interval: Duration::from_millis(500),
        }
    }
}

/// Opens consumer sessions and drains them under a delivery policy.
///
/// Each call owns its own session; nothing is shared between concurrent
/// calls except the broker gateway itself.
#[derive(Clone, Debug)]
pub struct StreamingGateway<G: BrokerGateway> {
    broker: G,
    config: StreamingConfig,
    shutdown_token: CancellationToken,
}

impl<G: BrokerGateway> StreamingGateway<G> {
    /// Creates a new streaming gateway. Live streams end when
    /// `shutdown_token` is cancelled.
    pub const fn new(
        broker: G,
        config: StreamingConfig,
        shutdown_token: CancellationToken,
    ) -> Self {
        Self {
            broker,
            config,
            shutdown_token,
        }
    }

    /// The underlying broker gateway.
    pub const fn broker(&self) -> &G {
        &self.broker
    }

    /// Collects up to `max_messages` within `deadline`.
    ///
    /// # Errors
    ///
    /// Returns an error only if the session cannot be opened; once open,
    /// pull failures are retried until the deadline.
    pub async fn batch(
        &self,
        options: SessionOptions,
        max_messages: NonZeroUsize,
        deadline: Duration,
    ) -> Result<Vec<Message>, G::Error> {
        info!(
            topic = %options.topic,
            group_id = %options.group_id,
            offset = %options.offset_policy,
            max_messages = max_messages.get(),
            timeout = ?deadline,
            "starting batch consumer"
        );

        let session = self.broker.open_session(options).await.map_err(|e| {
            error!(error = %e, "failed to open batch session");
            e
        })?;

        let messages = BoundedBatch {
            max_messages,
            deadline,
            poll_interval: self.config.batch_poll_interval,
        }
        .run(ScopedSession::new(session))
        .await;

        info!(messages = messages.len(), "batch consumer finished");

        Ok(messages)
    }

    /// Streams messages into `sink` until it closes, `max_messages` have been
    /// delivered, the session fails for good, or shutdown.
    ///
    /// A session that cannot be opened is reported to the sink as a single
    /// [`StreamEvent::Error`].
    pub async fn live<K>(
        &self,
        options: SessionOptions,
        max_messages: Option<NonZeroUsize>,
        sink: &mut K,
    ) -> LiveStreamOutcome
    where
        K: EventSink + ?Sized,
    {
        info!(
            topic = %options.topic,
            group_id = %options.group_id,
            offset = %options.offset_policy,
            max_messages = max_messages.map_or(0, NonZeroUsize::get),
            "starting live stream consumer"
        );

        let topic = options.topic.clone();
        let session = match self.broker.open_session(options).await {
            Ok(session) => session,
            Err(e) => {
                error!(error = %e, "failed to open live stream session");
                let _ = sink
                    .send(StreamEvent::Error {
                        error: e.to_string(),
                    })
                    .await;

                return LiveStreamOutcome {
                    delivered: 0,
                    end: StreamEnd::Failed,
                };
            }
        };

        info!(%topic, "live stream consumer subscribed");

        let outcome = LiveStream {
            max_messages,
            heartbeat_interval: self.config.heartbeat_interval,
        }
        .run(ScopedSession::new(session), sink, &self.shutdown_token)
        .await;

        info!(delivered = outcome.delivered, end = ?outcome.end, "live stream consumer finished");

        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::RecordingSink;

    use assert_matches::assert_matches;
    use bytes::Bytes;
    use kafka_admin_broker::{BrokerError, BrokerErrorKind, CreateTopicRequest, OffsetPolicy};
    use kafka_admin_broker_memory::MemoryBroker;

    async fn broker_with_orders(count: i64) -> MemoryBroker {
        let broker = MemoryBroker::new();
        broker
            .create_topic(CreateTopicRequest {
                name: "orders".to_string(),
                partitions: 1,
                replication_factor: 1,
                configs: std::collections::HashMap::new(),
            })
            .await
            .unwrap();

        for i in 0..count {
            broker
                .produce("orders", None, Bytes::from(format!("order-{i}")))
                .unwrap();
        }

        broker
    }

    fn options(topic: &str) -> SessionOptions {
        SessionOptions {
            topic: topic.to_string(),
            group_id: "test-group".to_string(),
            offset_policy: OffsetPolicy::Earliest,
        }
    }

    fn gateway(broker: MemoryBroker) -> StreamingGateway<MemoryBroker> {
        StreamingGateway::new(broker, StreamingConfig::default(), CancellationToken::new())
    }

    #[tokio::test(start_paused = true)]
    async fn test_batch_from_buffered_topic() {
        let broker = broker_with_orders(3).await;
        let gateway = gateway(broker.clone());

        let messages = gateway
            .batch(
                options("orders"),
                NonZeroUsize::new(10).unwrap(),
                Duration::from_secs(5),
            )
            .await
            .unwrap();

        let values: Vec<&[u8]> = messages.iter().map(|m| m.value.as_ref()).collect();
        assert_eq!(values, vec![&b"order-0"[..], b"order-1", b"order-2"]);
        assert_eq!(broker.active_sessions(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_batch_open_failure_is_surfaced() {
        let gateway = gateway(MemoryBroker::new());

        let result = gateway
            .batch(
                options("missing"),
                NonZeroUsize::new(10).unwrap(),
                Duration::from_secs(5),
            )
            .await;

        assert_matches!(result, Err(e) if e.kind() == BrokerErrorKind::Subscription);
    }

    #[tokio::test(start_paused = true)]
    async fn test_live_open_failure_emits_error_event() {
        let gateway = gateway(MemoryBroker::new());
        let mut sink = RecordingSink::default();

        let outcome = gateway.live(options("missing"), None, &mut sink).await;

        assert_eq!(outcome.end, StreamEnd::Failed);
        assert_eq!(sink.events.len(), 1);
        assert_matches!(&sink.events[0], StreamEvent::Error { error } if error.contains("missing"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_live_stream_with_cap() {
        let broker = broker_with_orders(5).await;
        let gateway = gateway(broker.clone());
        let mut sink = RecordingSink::default();

        let outcome = gateway
            .live(options("orders"), NonZeroUsize::new(2), &mut sink)
            .await;

        assert_eq!(outcome.end, StreamEnd::Completed);
        assert_eq!(sink.messages(), vec![0, 1]);
        assert_matches!(
            sink.events.last(),
            Some(StreamEvent::Done { total_messages: 2 })
        );
        assert_eq!(broker.active_sessions(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_live_stream_ends_when_topic_is_deleted() {
        let broker = broker_with_orders(1).await;
        let gateway = gateway(broker.clone());
        let mut sink = RecordingSink::default();

        let deleter = broker.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(2)).await;
            deleter.delete_topic("orders").unwrap();
        });

        let outcome = gateway.live(options("orders"), None, &mut sink).await;

        assert_eq!(outcome.end, StreamEnd::Failed);
        assert_eq!(outcome.delivered, 1);
        assert_matches!(sink.events.last(), Some(StreamEvent::Error { .. }));
        assert_eq!(broker.active_sessions(), 0);
    }
}
