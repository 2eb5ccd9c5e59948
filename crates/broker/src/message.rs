use std::collections::HashMap;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// A single record read from a topic partition.
///
/// Key, value and header bytes are rendered as UTF-8 text when serialized
/// (invalid sequences are replaced), which is how the HTTP API exposes them.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Topic the message was read from.
    pub topic: String,

    /// Partition within the topic.
    pub partition: i32,

    /// Position within the partition.
    pub offset: i64,

    /// Optional message key.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "optional_text"
    )]
    pub key: Option<Bytes>,

    /// Message payload.
    #[serde(with = "text")]
    pub value: Bytes,

    /// Milliseconds since the unix epoch (0 if the broker reported none).
    pub timestamp: i64,

    /// Message headers.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub headers: HashMap<String, String>,
}

mod text {
    use bytes::Bytes;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &Bytes, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&String::from_utf8_lossy(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Bytes, D::Error> {
        String::deserialize(deserializer).map(Bytes::from)
    }
}

mod optional_text {
    use bytes::Bytes;
    use serde::{Deserialize, Deserializer, Serializer};

    #[allow(clippy::ref_option)]
    pub fn serialize<S: Serializer>(
        bytes: &Option<Bytes>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match bytes {
            Some(bytes) => serializer.serialize_str(&String::from_utf8_lossy(bytes)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Bytes>, D::Error> {
        Option::<String>::deserialize(deserializer).map(|key| key.map(Bytes::from))
    }
}
