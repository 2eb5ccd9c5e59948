use crate::error::BrokerError;
use crate::metadata::{
    Broker, ConsumerGroup, ConsumerGroupDetail, CreateTopicRequest, Topic, TopicDetail,
};
use crate::session::{ConsumerSession, SessionOptions};

use std::collections::HashMap;

use async_trait::async_trait;

/// A connection to a broker cluster.
///
/// Implementations are cheap to clone and safe to use from many tasks at
/// once; every call is an independent request against the cluster's control
/// plane, except `open_session` which hands out a dedicated subscription.
#[async_trait]
pub trait BrokerGateway: Clone + Send + Sync + 'static {
    /// The error type for the gateway.
    type Error: BrokerError;

    /// The session type handed out by `open_session`.
    type Session: ConsumerSession;

    /// Lists the brokers in the cluster.
    async fn list_brokers(&self) -> Result<Vec<Broker>, Self::Error>;

    /// Lists user-visible topics (internal `_`-prefixed topics are hidden).
    async fn list_topics(&self) -> Result<Vec<Topic>, Self::Error>;

    /// Describes a single topic.
    async fn get_topic(&self, name: &str) -> Result<TopicDetail, Self::Error>;

    /// Creates a topic.
    async fn create_topic(&self, request: CreateTopicRequest) -> Result<(), Self::Error>;

    /// Sets the given topic configs, leaving other configs untouched.
    async fn update_topic_config(
        &self,
        name: &str,
        configs: HashMap<String, String>,
    ) -> Result<(), Self::Error>;

    /// Lists consumer groups known to the cluster.
    async fn list_consumer_groups(&self) -> Result<Vec<ConsumerGroup>, Self::Error>;

    /// Describes a single consumer group.
    async fn get_consumer_group(&self, group_id: &str) -> Result<ConsumerGroupDetail, Self::Error>;

    /// Opens a consumer session subscribed to one topic.
    async fn open_session(&self, options: SessionOptions) -> Result<Self::Session, Self::Error>;
}
