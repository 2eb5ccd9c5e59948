use kafka_admin_broker::Message;
use serde_json::json;

/// Comment text sent as a liveness marker while a stream is idle.
pub const HEARTBEAT_COMMENT: &str = "heartbeat";

/// One unit of output of a live stream.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StreamEvent {
    /// A message read from the topic.
    Message(Message),

    /// Nothing arrived during the last poll interval.
    Heartbeat,

    /// The requested number of messages has been delivered.
    Done {
        /// Messages delivered over the lifetime of the stream.
        total_messages: usize,
    },

    /// The stream could not be started or the session failed for good.
    Error {
        /// Broker-reported reason.
        error: String,
    },
}

impl StreamEvent {
    /// Event name on the wire; heartbeats are untagged.
    #[must_use]
    pub const fn name(&self) -> Option<&'static str> {
        match self {
            Self::Message(_) => Some("message"),
            Self::Heartbeat => None,
            Self::Done { .. } => Some("done"),
            Self::Error { .. } => Some("error"),
        }
    }

    /// JSON payload of the event; heartbeats carry none.
    ///
    /// # Errors
    ///
    /// Returns an error if the message cannot be serialized.
    pub fn data(&self) -> Result<Option<String>, serde_json::Error> {
        let data = match self {
            Self::Message(message) => serde_json::to_string(message)?,
            Self::Heartbeat => return Ok(None),
            Self::Done { total_messages } => {
                json!({ "total_messages": total_messages }).to_string()
            }
            Self::Error { error } => json!({ "error": error }).to_string(),
        };

        Ok(Some(data))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use bytes::Bytes;

    #[test]
    fn test_message_event() {
        let event = StreamEvent::Message(Message {
            topic: "orders".to_string(),
            partition: 0,
            offset: 3,
            value: Bytes::from_static(b"hello"),
            timestamp: 10,
            ..Message::default()
        });

        assert_eq!(event.name(), Some("message"));
        assert_eq!(
            event.data().unwrap().as_deref(),
            Some(r#"{"topic":"orders","partition":0,"offset":3,"value":"hello","timestamp":10}"#)
        );
    }

    #[test]
    fn test_control_events() {
        assert_eq!(StreamEvent::Heartbeat.name(), None);
        assert_eq!(StreamEvent::Heartbeat.data().unwrap(), None);

        let done = StreamEvent::Done { total_messages: 2 };
        assert_eq!(done.name(), Some("done"));
        assert_eq!(done.data().unwrap().as_deref(), Some(r#"{"total_messages":2}"#));

        let error = StreamEvent::Error {
            error: "topic \"x\" not found".to_string(),
        };
        assert_eq!(error.name(), Some("error"));
        assert_eq!(
            error.data().unwrap().as_deref(),
            Some(r#"{"error":"topic \"x\" not found"}"#)
        );
    }
}
