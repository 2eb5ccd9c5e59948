use crate::Error;

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use kafka_admin_broker::{ConsumerSession, Message};
use rdkafka::Message as _;
use rdkafka::consumer::{Consumer, StreamConsumer};
use rdkafka::error::KafkaError;
use rdkafka::message::{BorrowedMessage, Headers};
use tracing::debug;

/// A subscribed group consumer for one topic.
pub struct KafkaSession {
    consumer: Option<StreamConsumer>,
    topic: String,
    group_id: String,
}

impl KafkaSession {
    pub(crate) const fn new(consumer: StreamConsumer, topic: String, group_id: String) -> Self {
        Self {
            consumer: Some(consumer),
            topic,
            group_id,
        }
    }
}

impl fmt::Debug for KafkaSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KafkaSession")
            .field("topic", &self.topic)
            .field("group_id", &self.group_id)
            .field("closed", &self.consumer.is_none())
            .finish()
    }
}

#[async_trait]
impl ConsumerSession for KafkaSession {
    type Error = Error;

    async fn pull(&mut self, timeout: Duration) -> Result<Option<Message>, Self::Error> {
        let Some(consumer) = self.consumer.as_ref() else {
            return Err(Error::SessionClosed);
        };

        match tokio::time::timeout(timeout, consumer.recv()).await {
            Err(_) | Ok(Err(KafkaError::PartitionEOF(_))) => Ok(None),
            Ok(Ok(message)) => Ok(Some(to_message(&message))),
            Ok(Err(e)) => Err(Error::Consume(e)),
        }
    }

    fn close(&mut self) {
        let Some(consumer) = self.consumer.take() else {
            return;
        };

        consumer.unsubscribe();

        // Dropping the consumer blocks while it leaves the group.
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn_blocking(move || drop(consumer));
            }
            Err(_) => drop(consumer),
        }

        debug!(topic = %self.topic, group_id = %self.group_id, "session closed");
    }
}

fn to_message(message: &BorrowedMessage<'_>) -> Message {
    let headers = message.headers().map(to_headers).unwrap_or_default();

    Message {
        topic: message.topic().to_string(),
        partition: message.partition(),
        offset: message.offset(),
        key: message.key().map(Bytes::copy_from_slice),
        value: message
            .payload()
            .map(Bytes::copy_from_slice)
            .unwrap_or_default(),
        timestamp: message.timestamp().to_millis().unwrap_or_default(),
        headers,
    }
}

/// Copies headers as strings; a header without a value maps to `""`.
fn to_headers<H: Headers + ?Sized>(headers: &H) -> HashMap<String, String> {
    (0..headers.count())
        .map(|i| headers.get(i))
        .map(|header| {
            let value = header
                .value
                .map(|value| String::from_utf8_lossy(value).into_owned())
                .unwrap_or_default();
            (header.key.to_string(), value)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    use rdkafka::message::{Header, OwnedHeaders};

    #[test]
    fn test_headers_without_value_are_kept_empty() {
        let headers = OwnedHeaders::new()
            .insert(Header {
                key: "trace-id",
                value: Some("abc"),
            })
            .insert(Header {
                key: "tombstone",
                value: None::<&str>,
            });

        let map = to_headers(&headers);

        assert_eq!(map.len(), 2);
        assert_eq!(map["trace-id"], "abc");
        assert_eq!(map["tombstone"], "");
    }
}
