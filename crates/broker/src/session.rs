use crate::Message;
use crate::error::BrokerError;

use std::fmt::{self, Debug};
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Where a consumer group without committed offsets starts reading.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OffsetPolicy {
    /// Start from the oldest retained message.
    #[default]
    Earliest,

    /// Start after the newest message; only new messages are seen.
    Latest,
}

impl OffsetPolicy {
    /// The policy name as understood by the broker (`auto.offset.reset`).
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Earliest => "earliest",
            Self::Latest => "latest",
        }
    }
}

impl fmt::Display for OffsetPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when parsing an unrecognised offset policy.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("invalid offset policy '{0}': expected 'earliest' or 'latest'")]
pub struct InvalidOffsetPolicy(pub String);

impl FromStr for OffsetPolicy {
    type Err = InvalidOffsetPolicy;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "earliest" => Ok(Self::Earliest),
            "latest" => Ok(Self::Latest),
            _ => Err(InvalidOffsetPolicy(s.to_string())),
        }
    }
}

/// Identity of a consumer session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionOptions {
    /// The single topic the session subscribes to.
    pub topic: String,

    /// Consumer group the session joins.
    pub group_id: String,

    /// Starting position when the group has no committed offsets.
    pub offset_policy: OffsetPolicy,
}

/// A subscription handle bound to one topic and one consumer group.
///
/// A session is owned by exactly one consumer at a time. Pulling is the only
/// suspension point; `close` releases the group membership and must be safe
/// to call more than once.
#[async_trait]
pub trait ConsumerSession: Debug + Send + 'static {
    /// The error type for failed pulls.
    type Error: BrokerError;

    /// Waits at most `timeout` for the next message.
    ///
    /// `Ok(None)` means nothing arrived in time and is not an error.
    async fn pull(&mut self, timeout: Duration) -> Result<Option<Message>, Self::Error>;

    /// Leaves the consumer group and releases broker-side resources.
    fn close(&mut self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_offset_policy() {
        assert_eq!("earliest".parse(), Ok(OffsetPolicy::Earliest));
        assert_eq!("Latest".parse(), Ok(OffsetPolicy::Latest));
        assert_eq!(
            "newest".parse::<OffsetPolicy>(),
            Err(InvalidOffsetPolicy("newest".to_string()))
        );
    }

    #[test]
    fn test_default_offset_policy_is_earliest() {
        assert_eq!(OffsetPolicy::default(), OffsetPolicy::Earliest);
        assert_eq!(OffsetPolicy::default().to_string(), "earliest");
    }
}
