use kafka_admin_broker::{BrokerError, BrokerErrorKind};
use thiserror::Error;

/// Errors that can occur in this crate.
#[derive(Debug, Error)]
pub enum Error {
    /// Consumer group does not exist.
    #[error("consumer group '{0}' not found")]
    GroupNotFound(String),

    /// Topic request failed validation.
    #[error("invalid topic request: {0}")]
    InvalidRequest(String),

    /// Subscription to a topic that does not exist.
    #[error("cannot subscribe to unknown topic '{0}'")]
    Subscribe(String),

    /// Topic was deleted while a session was reading it.
    #[error("topic '{0}' was deleted")]
    TopicDeleted(String),

    /// Topic already exists.
    #[error("topic '{0}' already exists")]
    TopicExists(String),

    /// Topic does not exist.
    #[error("topic '{0}' not found")]
    TopicNotFound(String),
}

impl BrokerError for Error {
    fn kind(&self) -> BrokerErrorKind {
        match self {
            Self::GroupNotFound(_) | Self::TopicNotFound(_) => BrokerErrorKind::NotFound,
            Self::InvalidRequest(_) | Self::TopicExists(_) => BrokerErrorKind::Rejected,
            Self::Subscribe(_) => BrokerErrorKind::Subscription,
            Self::TopicDeleted(_) => BrokerErrorKind::Fatal,
        }
    }
}
