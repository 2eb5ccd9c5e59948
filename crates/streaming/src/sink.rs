use crate::StreamEvent;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;

/// The downstream side went away; nothing more can be written.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
#[error("downstream closed")]
pub struct SinkClosed;

/// Write side of a live stream's output channel.
#[async_trait]
pub trait EventSink: Send {
    /// Writes one event, waiting until the downstream accepts it.
    async fn send(&mut self, event: StreamEvent) -> Result<(), SinkClosed>;
}

#[async_trait]
impl EventSink for mpsc::Sender<StreamEvent> {
    async fn send(&mut self, event: StreamEvent) -> Result<(), SinkClosed> {
        mpsc::Sender::send(self, event).await.map_err(|_| SinkClosed)
    }
}
