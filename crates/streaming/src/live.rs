use crate::{EventSink, ScopedSession, StreamEvent};

use std::num::NonZeroUsize;
use std::time::Duration;

use kafka_admin_broker::{BrokerError, ConsumerSession};
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Forwards messages to a sink until the sink closes or a cap is reached.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LiveStream {
    /// Stop after this many messages; `None` streams until disconnect.
    pub max_messages: Option<NonZeroUsize>,

    /// Poll timeout and, while idle, the spacing between heartbeats.
    pub heartbeat_interval: Duration,
}

/// Why a live stream ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StreamEnd {
    /// The message cap was reached and `done` was written.
    Completed,

    /// A write to the sink failed; the client is gone.
    Aborted,

    /// The session could not be opened or failed for good; `error` was written.
    Failed,

    /// The process is shutting down.
    Shutdown,
}

/// Result of running a live stream.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LiveStreamOutcome {
    /// Messages successfully written to the sink.
    pub delivered: usize,

    /// How the stream ended.
    pub end: StreamEnd,
}

impl LiveStream {
    /// Runs the stream until it completes, the sink closes, the session
    /// fails fatally or `shutdown_token` is cancelled.
    ///
    /// Every write is awaited before the next pull, so a dead downstream is
    /// noticed within one heartbeat interval. Shutdown interrupts both pulls
    /// and writes. The session is closed when this returns.
    pub async fn run<S, K>(
        &self,
        mut session: ScopedSession<S>,
        sink: &mut K,
        shutdown_token: &CancellationToken,
    ) -> LiveStreamOutcome
    where
        S: ConsumerSession,
        K: EventSink + ?Sized,
    {
        let mut delivered = 0;

        let end = tokio::select! {
            biased;
            () = shutdown_token.cancelled() => StreamEnd::Shutdown,
            end = self.pump(&mut session, sink, &mut delivered) => end,
        };

        if end == StreamEnd::Shutdown {
            info!(delivered, "live stream stopped for shutdown");
        }

        LiveStreamOutcome { delivered, end }
    }

    async fn pump<S, K>(
        &self,
        session: &mut ScopedSession<S>,
        sink: &mut K,
        delivered: &mut usize,
    ) -> StreamEnd
    where
        S: ConsumerSession,
        K: EventSink + ?Sized,
    {
        loop {
            let pulled = timeout(
                self.heartbeat_interval,
                session.pull(self.heartbeat_interval),
            )
            .await;

            match pulled {
                // Idle tick, whether the session reported it or overran.
                Err(_) | Ok(Ok(None)) => {
                    if sink.send(StreamEvent::Heartbeat).await.is_err() {
                        info!(delivered = *delivered, "client disconnected");
                        return StreamEnd::Aborted;
                    }
                }
                Ok(Ok(Some(message))) => {
                    let offset = message.offset;
                    if sink.send(StreamEvent::Message(message)).await.is_err() {
                        info!(delivered = *delivered, "client disconnected during write");
                        return StreamEnd::Aborted;
                    }

                    *delivered += 1;
                    debug!(count = *delivered, offset, "live stream message sent");

                    if self
                        .max_messages
                        .is_some_and(|max_messages| *delivered >= max_messages.get())
                    {
                        // Client may already be gone; the stream is over either way.
                        let _ = sink
                            .send(StreamEvent::Done {
                                total_messages: *delivered,
                            })
                            .await;
                        info!(delivered = *delivered, "live stream max messages reached");
                        return StreamEnd::Completed;
                    }
                }
                Ok(Err(e)) if e.kind().is_fatal() => {
                    error!(error = %e, kind = %e.kind(), "live stream session failed");
                    let _ = sink
                        .send(StreamEvent::Error {
                            error: e.to_string(),
                        })
                        .await;
                    return StreamEnd::Failed;
                }
                Ok(Err(e)) => {
                    warn!(error = %e, kind = %e.kind(), "live stream poll failed, retrying");
                }
            }
        }
    }
}
