use std::error::Error;
use std::fmt;

/// Broad classification of a broker failure.
///
/// Callers branch on the kind rather than on backend-specific error types:
/// the HTTP layer picks a status code from it and the streaming gateway uses
/// it to decide whether a failed pull is worth retrying.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BrokerErrorKind {
    /// Cluster unreachable or authentication failed.
    Connection,

    /// Subscription to a topic was rejected (unknown topic, denied, ...).
    Subscription,

    /// The requested topic, group or resource does not exist.
    NotFound,

    /// The broker refused a mutation (topic exists, invalid config, ...).
    Rejected,

    /// A fetch failed but the session is still usable.
    Transient,

    /// A fetch failed and the session will not recover.
    Fatal,

    /// Anything else.
    Internal,
}

impl BrokerErrorKind {
    /// Whether a pull failing with this kind should end a long-lived stream.
    #[must_use]
    pub const fn is_fatal(self) -> bool {
        matches!(self, Self::Fatal | Self::Subscription | Self::NotFound)
    }
}

impl fmt::Display for BrokerErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Connection => "connection",
            Self::Subscription => "subscription",
            Self::NotFound => "not found",
            Self::Rejected => "rejected",
            Self::Transient => "transient",
            Self::Fatal => "fatal",
            Self::Internal => "internal",
        };

        f.write_str(name)
    }
}

/// Marker trait for broker errors
pub trait BrokerError: Error + Send + Sync + 'static {
    /// Classifies the error.
    fn kind(&self) -> BrokerErrorKind;
}
