use crate::{Error, MemoryBroker};

use std::time::Duration;

use async_trait::async_trait;
use kafka_admin_broker::{ConsumerSession, Message};
use tokio::time::{Instant, timeout_at};
use tracing::debug;

/// A session reading every partition of one topic from a [`MemoryBroker`].
///
/// Offsets are committed to the group as messages are handed out, so a later
/// session in the same group resumes where this one stopped.
#[derive(Debug)]
pub struct MemorySession {
    broker: MemoryBroker,
    session_id: u64,
    group_id: String,
    topic: String,
    positions: Vec<i64>,
    next_partition: usize,
    closed: bool,
}

impl MemorySession {
    pub(crate) const fn new(
        broker: MemoryBroker,
        session_id: u64,
        group_id: String,
        topic: String,
        positions: Vec<i64>,
    ) -> Self {
        Self {
            broker,
            session_id,
            group_id,
            topic,
            positions,
            next_partition: 0,
            closed: false,
        }
    }
}

#[async_trait]
impl ConsumerSession for MemorySession {
    type Error = Error;

    async fn pull(&mut self, timeout: Duration) -> Result<Option<Message>, Self::Error> {
        let deadline = Instant::now() + timeout;

        loop {
            // Register interest before looking so an append in between is not missed.
            let appended = self.broker.appended.notified();
            tokio::pin!(appended);
            appended.as_mut().enable();

            if let Some(message) = self.broker.next_message(
                &self.group_id,
                &self.topic,
                &mut self.positions,
                &mut self.next_partition,
            )? {
                return Ok(Some(message));
            }

            if timeout_at(deadline, appended).await.is_err() {
                return Ok(None);
            }
        }
    }

    fn close(&mut self) {
        if self.closed {
            return;
        }

        self.closed = true;
        self.broker.leave_group(&self.group_id, self.session_id);

        debug!(
            topic = %self.topic,
            group_id = %self.group_id,
            session_id = self.session_id,
            "session closed"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::HashMap;

    use assert_matches::assert_matches;
    use bytes::Bytes;
    use kafka_admin_broker::{
        BrokerError, BrokerErrorKind, BrokerGateway, CreateTopicRequest, OffsetPolicy,
        SessionOptions,
    };

    async fn broker_with_topic(partitions: i32) -> MemoryBroker {
        let broker = MemoryBroker::new();
        broker
            .create_topic(CreateTopicRequest {
                name: "orders".to_string(),
                partitions,
                replication_factor: 1,
                configs: HashMap::new(),
            })
            .await
            .unwrap();
        broker
    }

    fn options(group_id: &str, offset_policy: OffsetPolicy) -> SessionOptions {
        SessionOptions {
            topic: "orders".to_string(),
            group_id: group_id.to_string(),
            offset_policy,
        }
    }

    #[tokio::test]
    async fn test_pull_reads_in_order() {
        let broker = broker_with_topic(1).await;
        for i in 0..3 {
            broker
                .produce("orders", None, Bytes::from(format!("m{i}")))
                .unwrap();
        }

        let mut session = broker
            .open_session(options("g", OffsetPolicy::Earliest))
            .await
            .unwrap();

        for expected in 0..3 {
            let message = session.pull(Duration::from_millis(10)).await.unwrap();
            assert_eq!(message.map(|m| m.offset), Some(expected));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_pull_times_out_when_idle() {
        let broker = broker_with_topic(1).await;
        let mut session = broker
            .open_session(options("g", OffsetPolicy::Earliest))
            .await
            .unwrap();

        let start = Instant::now();
        let message = session.pull(Duration::from_millis(500)).await.unwrap();

        assert!(message.is_none());
        assert!(start.elapsed() >= Duration::from_millis(500));
    }

    #[tokio::test(start_paused = true)]
    async fn test_pull_wakes_on_produce() {
        let broker = broker_with_topic(1).await;
        let mut session = broker
            .open_session(options("g", OffsetPolicy::Latest))
            .await
            .unwrap();

        let producer = broker.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(200)).await;
            producer
                .produce("orders", Some(Bytes::from_static(b"k")), Bytes::from_static(b"v"))
                .unwrap();
        });

        let start = Instant::now();
        let message = session.pull(Duration::from_secs(5)).await.unwrap().unwrap();

        assert_eq!(message.key, Some(Bytes::from_static(b"k")));
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_latest_skips_existing_messages() {
        let broker = broker_with_topic(1).await;
        broker
            .produce("orders", None, Bytes::from_static(b"old"))
            .unwrap();

        let mut session = broker
            .open_session(options("g", OffsetPolicy::Latest))
            .await
            .unwrap();
        broker
            .produce("orders", None, Bytes::from_static(b"new"))
            .unwrap();

        let message = session.pull(Duration::from_millis(10)).await.unwrap().unwrap();
        assert_eq!(message.value, Bytes::from_static(b"new"));
    }

    #[tokio::test]
    async fn test_group_resumes_from_committed_offset() {
        let broker = broker_with_topic(1).await;
        for i in 0..4 {
            broker
                .produce("orders", None, Bytes::from(format!("m{i}")))
                .unwrap();
        }

        let mut first = broker
            .open_session(options("g", OffsetPolicy::Earliest))
            .await
            .unwrap();
        first.pull(Duration::from_millis(10)).await.unwrap();
        first.pull(Duration::from_millis(10)).await.unwrap();
        first.close();

        let mut second = broker
            .open_session(options("g", OffsetPolicy::Earliest))
            .await
            .unwrap();
        let message = second.pull(Duration::from_millis(10)).await.unwrap();
        assert_eq!(message.map(|m| m.offset), Some(2));

        // Another group starts from scratch.
        let mut other = broker
            .open_session(options("other", OffsetPolicy::Earliest))
            .await
            .unwrap();
        let message = other.pull(Duration::from_millis(10)).await.unwrap();
        assert_eq!(message.map(|m| m.offset), Some(0));
    }

    #[tokio::test]
    async fn test_offsets_non_decreasing_per_partition() {
        let broker = broker_with_topic(3).await;
        for i in 0..30 {
            broker
                .produce("orders", None, Bytes::from(format!("m{i}")))
                .unwrap();
        }

        let mut session = broker
            .open_session(options("g", OffsetPolicy::Earliest))
            .await
            .unwrap();

        let mut last_seen: HashMap<i32, i64> = HashMap::new();
        let mut count = 0;
        while let Some(message) = session.pull(Duration::from_millis(10)).await.unwrap() {
            if let Some(&previous) = last_seen.get(&message.partition) {
                assert!(message.offset > previous);
            }
            last_seen.insert(message.partition, message.offset);
            count += 1;
        }

        assert_eq!(count, 30);
        assert_eq!(last_seen.len(), 3);
    }

    #[tokio::test]
    async fn test_close_is_idempotent_and_leaves_group() {
        let broker = broker_with_topic(1).await;
        let mut session = broker
            .open_session(options("g", OffsetPolicy::Earliest))
            .await
            .unwrap();
        assert_eq!(broker.active_sessions(), 1);

        session.close();
        session.close();

        assert_eq!(broker.active_sessions(), 0);
        let group = broker.get_consumer_group("g").await.unwrap();
        assert_eq!(group.state, "Empty");
    }

    #[tokio::test]
    async fn test_unknown_topic_is_subscription_error() {
        let broker = MemoryBroker::new();

        let result = broker
            .open_session(options("g", OffsetPolicy::Earliest))
            .await;

        assert_matches!(result, Err(e) if e.kind() == BrokerErrorKind::Subscription);
    }

    #[tokio::test]
    async fn test_deleted_topic_fails_pull() {
        let broker = broker_with_topic(1).await;
        let mut session = broker
            .open_session(options("g", OffsetPolicy::Earliest))
            .await
            .unwrap();

        broker.delete_topic("orders").unwrap();

        let result = session.pull(Duration::from_millis(10)).await;
        assert_matches!(result, Err(e) if e.kind() == BrokerErrorKind::Fatal);
    }
}
