//! Abstract interface for talking to a log-based message broker cluster.
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Error classification shared by every broker backend.
pub mod error;

/// The broker gateway: metadata queries, topic mutation and session creation.
pub mod gateway;

/// Messages as produced by the broker.
pub mod message;

/// Response records describing cluster topology, topics and consumer groups.
pub mod metadata;

/// Consumer sessions: single-topic subscriptions that yield messages on pull.
pub mod session;

pub use error::{BrokerError, BrokerErrorKind};
pub use gateway::BrokerGateway;
pub use message::Message;
pub use metadata::*;
pub use session::{ConsumerSession, InvalidOffsetPolicy, OffsetPolicy, SessionOptions};
