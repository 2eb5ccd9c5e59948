use crate::ScopedSession;

use std::num::NonZeroUsize;
use std::time::Duration;

use kafka_admin_broker::{BrokerError, ConsumerSession, Message};
use tokio::time::{Instant, timeout_at};
use tracing::{debug, warn};

/// Stand-in deadline for budgets too large to add to an `Instant`.
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

/// Collects up to `max_messages` from a session before `deadline` passes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BoundedBatch {
    /// Upper bound on the number of messages returned.
    pub max_messages: NonZeroUsize,

    /// Overall time budget for the batch.
    pub deadline: Duration,

    /// Timeout of each individual pull; bounds how late the deadline is noticed.
    pub poll_interval: Duration,
}

impl BoundedBatch {
    /// Drains the session until the batch is full or the deadline passes.
    ///
    /// Empty polls and failed pulls are retried; only the deadline ends a
    /// batch early, so the result may be empty. The session is closed when
    /// this returns.
    pub async fn run<S>(&self, mut session: ScopedSession<S>) -> Vec<Message>
    where
        S: ConsumerSession,
    {
        let now = Instant::now();
        let deadline = now
            .checked_add(self.deadline)
            .unwrap_or_else(|| now + FAR_FUTURE);
        let mut messages = Vec::with_capacity(self.max_messages.get().min(1024));

        while messages.len() < self.max_messages.get() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }

            match timeout_at(deadline, session.pull(remaining.min(self.poll_interval))).await {
                Err(_) => break,
                Ok(Ok(Some(message))) => {
                    debug!(
                        partition = message.partition,
                        offset = message.offset,
                        "batch received message"
                    );
                    messages.push(message);
                }
                Ok(Ok(None)) => {}
                Ok(Err(e)) => warn!(error = %e, kind = %e.kind(), "batch poll failed, retrying"),
            }
        }

        messages
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{ScriptedSession, Step, message};

    use std::sync::atomic::Ordering;

    use kafka_admin_broker::BrokerErrorKind;
    use tracing_test::traced_test;

    fn batch(max_messages: usize, deadline: Duration) -> BoundedBatch {
        BoundedBatch {
            max_messages: NonZeroUsize::new(max_messages).unwrap(),
            deadline,
            poll_interval: Duration::from_millis(100),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_returns_available_messages_in_arrival_order() {
        let session = ScriptedSession::new([
            Step::Message(message(0)),
            Step::Message(message(1)),
            Step::Message(message(2)),
        ]);
        let closes = session.close_counter();

        let start = Instant::now();
        let messages = batch(10, Duration::from_secs(5))
            .run(ScopedSession::new(session))
            .await;

        let offsets: Vec<i64> = messages.iter().map(|m| m.offset).collect();
        assert_eq!(offsets, vec![0, 1, 2]);
        // Fewer than max available: the batch waits out its deadline.
        assert!(start.elapsed() >= Duration::from_secs(5));
        assert!(start.elapsed() < Duration::from_secs(5) + Duration::from_millis(100));
        assert_eq!(closes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stops_as_soon_as_batch_is_full() {
        let session = ScriptedSession::new((0..20).map(|offset| Step::Message(message(offset))));
        let pulls = session.pull_counter();

        let start = Instant::now();
        let messages = batch(5, Duration::from_secs(5))
            .run(ScopedSession::new(session))
            .await;

        assert_eq!(messages.len(), 5);
        assert_eq!(pulls.load(Ordering::SeqCst), 5);
        assert!(start.elapsed() < Duration::from_millis(100));
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_topic_returns_nothing_after_deadline() {
        let session = ScriptedSession::new([]);
        let closes = session.close_counter();

        let start = Instant::now();
        let messages = batch(10, Duration::from_secs(1))
            .run(ScopedSession::new(session))
            .await;

        assert!(messages.is_empty());
        assert!(start.elapsed() >= Duration::from_secs(1));
        assert!(start.elapsed() < Duration::from_secs(1) + Duration::from_millis(100));
        assert_eq!(closes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    #[traced_test]
    async fn test_failed_polls_are_retried() {
        let session = ScriptedSession::new([
            Step::Fail(BrokerErrorKind::Transient),
            Step::Message(message(0)),
            Step::Idle,
            Step::Fail(BrokerErrorKind::Fatal),
            Step::Message(message(1)),
        ]);

        let messages = batch(2, Duration::from_secs(5))
            .run(ScopedSession::new(session))
            .await;

        let offsets: Vec<i64> = messages.iter().map(|m| m.offset).collect();
        assert_eq!(offsets, vec![0, 1]);
        assert!(logs_contain("batch poll failed, retrying"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_unbounded_deadline_still_fills_batch() {
        let session = ScriptedSession::new([Step::Message(message(0)), Step::Message(message(1))]);
        let closes = session.close_counter();

        let messages = batch(2, Duration::MAX)
            .run(ScopedSession::new(session))
            .await;

        assert_eq!(messages.len(), 2);
        assert_eq!(closes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_holds_against_unresponsive_session() {
        let session = ScriptedSession::new([Step::Message(message(0)), Step::Hang]);
        let closes = session.close_counter();

        let start = Instant::now();
        let messages = batch(10, Duration::from_secs(2))
            .run(ScopedSession::new(session))
            .await;

        assert_eq!(messages.len(), 1);
        assert!(start.elapsed() <= Duration::from_secs(2) + Duration::from_millis(100));
        assert_eq!(closes.load(Ordering::SeqCst), 1);
    }
}
