use kafka_admin_broker::{BrokerError, BrokerErrorKind};
use rdkafka::error::{KafkaError, RDKafkaErrorCode};
use thiserror::Error;

/// Errors that can occur in this crate.
#[derive(Debug, Error)]
pub enum Error {
    /// Failed to create a Kafka client from the configuration.
    #[error("failed to create kafka client: {0}")]
    Client(#[source] KafkaError),

    /// A fetch on an open session failed.
    #[error("failed to fetch message: {0}")]
    Consume(#[source] KafkaError),

    /// Consumer group does not exist.
    #[error("consumer group '{0}' not found")]
    GroupNotFound(String),

    /// Consumer group listing failed.
    #[error("failed to list consumer groups: {0}")]
    GroupList(#[source] KafkaError),

    /// A blocking client call panicked or was cancelled.
    #[error("blocking task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    /// Metadata request failed.
    #[error("failed to fetch metadata: {0}")]
    Metadata(#[source] KafkaError),

    /// Admin request failed before the cluster answered.
    #[error("admin request failed: {0}")]
    Admin(#[source] KafkaError),

    /// Cluster answered an admin request with an error code.
    #[error("{operation} '{resource}' failed: {code}")]
    Rejected {
        /// Operation that was attempted.
        operation: &'static str,
        /// Topic the operation targeted.
        resource: String,
        /// Error code returned by the cluster.
        code: RDKafkaErrorCode,
    },

    /// The session was already closed.
    #[error("session closed")]
    SessionClosed,

    /// Subscribing the session consumer failed.
    #[error("failed to subscribe: {0}")]
    Subscribe(#[source] KafkaError),

    /// Topic does not exist.
    #[error("topic '{0}' not found")]
    TopicNotFound(String),

    /// Subscription to a topic that does not exist.
    #[error("cannot subscribe to unknown topic '{0}'")]
    UnknownTopic(String),
}

impl BrokerError for Error {
    fn kind(&self) -> BrokerErrorKind {
        match self {
            Self::Client(_) => BrokerErrorKind::Connection,
            Self::Consume(e) => consume_kind(e),
            Self::GroupNotFound(_) | Self::TopicNotFound(_) => BrokerErrorKind::NotFound,
            Self::GroupList(e) | Self::Metadata(e) | Self::Admin(e) => request_kind(e),
            Self::Join(_) => BrokerErrorKind::Internal,
            Self::Rejected { code, .. } => {
                code_kind(*code).unwrap_or(BrokerErrorKind::Rejected)
            }
            Self::SessionClosed => BrokerErrorKind::Fatal,
            Self::Subscribe(_) | Self::UnknownTopic(_) => BrokerErrorKind::Subscription,
        }
    }
}

/// Kind for a failed fetch. Losing the topic or access to it ends the
/// session; anything not known to be fatal is retried.
fn consume_kind(error: &KafkaError) -> BrokerErrorKind {
    match error.rdkafka_error_code() {
        Some(
            RDKafkaErrorCode::UnknownTopicOrPartition
            | RDKafkaErrorCode::UnknownTopic
            | RDKafkaErrorCode::TopicAuthorizationFailed
            | RDKafkaErrorCode::GroupAuthorizationFailed,
        ) => BrokerErrorKind::Subscription,
        Some(RDKafkaErrorCode::Fatal) => BrokerErrorKind::Fatal,
        _ => BrokerErrorKind::Transient,
    }
}

fn request_kind(error: &KafkaError) -> BrokerErrorKind {
    error
        .rdkafka_error_code()
        .and_then(code_kind)
        .unwrap_or(BrokerErrorKind::Internal)
}

const fn code_kind(code: RDKafkaErrorCode) -> Option<BrokerErrorKind> {
    match code {
        RDKafkaErrorCode::UnknownTopicOrPartition | RDKafkaErrorCode::UnknownTopic => {
            Some(BrokerErrorKind::NotFound)
        }
        RDKafkaErrorCode::TopicAlreadyExists
        | RDKafkaErrorCode::InvalidPartitions
        | RDKafkaErrorCode::InvalidReplicationFactor
        | RDKafkaErrorCode::InvalidConfig
        | RDKafkaErrorCode::PolicyViolation
        | RDKafkaErrorCode::TopicAuthorizationFailed => Some(BrokerErrorKind::Rejected),
        RDKafkaErrorCode::AllBrokersDown
        | RDKafkaErrorCode::BrokerTransportFailure
        | RDKafkaErrorCode::Authentication
        | RDKafkaErrorCode::SaslAuthenticationFailed => Some(BrokerErrorKind::Connection),
        RDKafkaErrorCode::RequestTimedOut
        | RDKafkaErrorCode::OperationTimedOut
        | RDKafkaErrorCode::LeaderNotAvailable
        | RDKafkaErrorCode::NotLeaderForPartition
        | RDKafkaErrorCode::NetworkException => Some(BrokerErrorKind::Transient),
        RDKafkaErrorCode::Fatal => Some(BrokerErrorKind::Fatal),
        _ => None,
    }
}
