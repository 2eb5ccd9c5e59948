//! Broker gateway backed by a Kafka cluster through librdkafka.
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

mod assignment;
mod error;
mod options;
mod session;

pub use assignment::{AssignmentError, decode_assignment};
pub use error::Error;
pub use options::{DEFAULT_METADATA_TIMEOUT, KafkaOptions, SaslCredentials};
pub use session::KafkaSession;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use kafka_admin_broker::{
    Broker, BrokerGateway, ConsumerGroup, ConsumerGroupDetail, CreateTopicRequest, Member,
    Partition, SessionOptions, Topic, TopicDetail,
};
use rdkafka::admin::{
    AdminClient, AdminOptions, AlterConfig, ConfigSource, NewTopic, ResourceSpecifier,
    TopicReplication,
};
use rdkafka::client::DefaultClientContext;
use rdkafka::consumer::{BaseConsumer, Consumer, StreamConsumer};
use tracing::{info, warn};

/// Client id used for every client this crate creates.
const CLIENT_ID: &str = "kafka-admin-api";

/// Broker gateway for a Kafka cluster.
///
/// Metadata and group listings go through a shared consumer handle on the
/// blocking pool; topic mutations use the admin API. Each consumer session
/// gets its own group consumer.
#[derive(Clone)]
pub struct KafkaBroker {
    options: Arc<KafkaOptions>,
    admin: Arc<AdminClient<DefaultClientContext>>,
    metadata: Arc<BaseConsumer>,
}

impl KafkaBroker {
    /// Creates the admin and metadata clients. No connection is made until
    /// the first request.
    ///
    /// # Errors
    ///
    /// Returns an error if the client configuration is rejected.
    pub fn new(options: KafkaOptions) -> Result<Self, Error> {
        let mut config = options.client_config();
        config.set("client.id", CLIENT_ID);

        let admin = config.create().map_err(Error::Client)?;
        let metadata = config.create().map_err(Error::Client)?;

        info!(
            bootstrap_servers = %options.bootstrap_servers,
            sasl = options.sasl.is_some(),
            "kafka clients created"
        );

        Ok(Self {
            options: Arc::new(options),
            admin: Arc::new(admin),
            metadata: Arc::new(metadata),
        })
    }

    fn admin_options(&self) -> AdminOptions {
        AdminOptions::new()
            .request_timeout(Some(self.options.metadata_timeout))
            .operation_timeout(Some(self.options.metadata_timeout))
    }

    /// Runs a blocking call against the metadata client.
    async fn blocking<T, F>(&self, f: F) -> Result<T, Error>
    where
        F: FnOnce(&BaseConsumer, Duration) -> Result<T, Error> + Send + 'static,
        T: Send + 'static,
    {
        let client = Arc::clone(&self.metadata);
        let timeout = self.options.metadata_timeout;

        tokio::task::spawn_blocking(move || f(&client, timeout)).await?
    }

    /// Whether the cluster currently knows `topic`.
    async fn topic_exists(&self, topic: &str) -> Result<bool, Error> {
        let topic = topic.to_string();

        self.blocking(move |client, timeout| {
            let metadata = client
                .fetch_metadata(Some(topic.as_str()), timeout)
                .map_err(Error::Metadata)?;

            Ok(metadata
                .topics()
                .iter()
                .any(|t| t.name() == topic && t.error().is_none() && !t.partitions().is_empty()))
        })
        .await
    }

    /// Describes a topic's configuration, keeping entries accepted by `keep`.
    async fn describe_topic_configs(
        &self,
        name: &str,
        keep: fn(source: ConfigSource, is_default: bool) -> bool,
    ) -> Result<HashMap<String, String>, Error> {
        let results = self
            .admin
            .describe_configs(&[ResourceSpecifier::Topic(name)], &self.admin_options())
            .await
            .map_err(Error::Admin)?;

        let mut configs = HashMap::new();
        for result in results {
            let resource = result.map_err(|code| Error::Rejected {
                operation: "describe configs",
                resource: name.to_string(),
                code,
            })?;

            for entry in resource.entries {
                if !keep(entry.source, entry.is_default) {
                    continue;
                }
                if let Some(value) = entry.value {
                    configs.insert(entry.name, value);
                }
            }
        }

        Ok(configs)
    }
}

impl fmt::Debug for KafkaBroker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KafkaBroker")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl BrokerGateway for KafkaBroker {
    type Error = Error;
    type Session = KafkaSession;

    async fn list_brokers(&self) -> Result<Vec<Broker>, Self::Error> {
        self.blocking(|client, timeout| {
            let metadata = client
                .fetch_metadata(None, timeout)
                .map_err(Error::Metadata)?;

            Ok(metadata
                .brokers()
                .iter()
                .map(|b| Broker {
                    id: b.id(),
                    host: b.host().to_string(),
                    port: b.port(),
                })
                .collect())
        })
        .await
    }

    async fn list_topics(&self) -> Result<Vec<Topic>, Self::Error> {
        self.blocking(|client, timeout| {
            let metadata = client
                .fetch_metadata(None, timeout)
                .map_err(Error::Metadata)?;

            let mut topics: Vec<Topic> = metadata
                .topics()
                .iter()
                .filter(|t| !t.name().starts_with('_'))
                .map(|t| Topic {
                    name: t.name().to_string(),
                    partition_count: t.partitions().len(),
                    replication_factor: t.partitions().first().map_or(0, |p| p.replicas().len()),
                })
                .collect();
            topics.sort_by(|a, b| a.name.cmp(&b.name));

            Ok(topics)
        })
        .await
    }

    async fn get_topic(&self, name: &str) -> Result<TopicDetail, Self::Error> {
        let topic = name.to_string();
        let partitions = self
            .blocking(move |client, timeout| {
                let metadata = client
                    .fetch_metadata(Some(topic.as_str()), timeout)
                    .map_err(Error::Metadata)?;

                let found = metadata
                    .topics()
                    .iter()
                    .find(|t| t.name() == topic && t.error().is_none())
                    .filter(|t| !t.partitions().is_empty())
                    .ok_or_else(|| Error::TopicNotFound(topic.clone()))?;

                Ok(found
                    .partitions()
                    .iter()
                    .map(|p| Partition {
                        id: p.id(),
                        leader: p.leader(),
                        replicas: p.replicas().to_vec(),
                        isr: p.isr().to_vec(),
                    })
                    .collect::<Vec<_>>())
            })
            .await?;

        let configs = self
            .describe_topic_configs(name, |_, is_default| !is_default)
            .await?;

        Ok(TopicDetail {
            name: name.to_string(),
            partitions,
            configs,
        })
    }

    async fn create_topic(&self, request: CreateTopicRequest) -> Result<(), Self::Error> {
        let mut topic = NewTopic::new(
            &request.name,
            request.partitions,
            TopicReplication::Fixed(i32::from(request.replication_factor)),
        );
        for (key, value) in &request.configs {
            topic = topic.set(key, value);
        }

        let results = self
            .admin
            .create_topics(&[topic], &self.admin_options())
            .await
            .map_err(Error::Admin)?;

        for result in results {
            result.map_err(|(resource, code)| Error::Rejected {
                operation: "create topic",
                resource,
                code,
            })?;
        }

        info!(
            name = %request.name,
            partitions = request.partitions,
            replication_factor = request.replication_factor,
            "topic created"
        );

        Ok(())
    }

    async fn update_topic_config(
        &self,
        name: &str,
        configs: HashMap<String, String>,
    ) -> Result<(), Self::Error> {
        // AlterConfigs replaces the whole override set, so carry the existing
        // topic overrides along with the change.
        let mut merged = self
            .describe_topic_configs(name, |source, _| {
                matches!(source, ConfigSource::DynamicTopic)
            })
            .await?;
        merged.extend(configs);

        let mut alter = AlterConfig::new(ResourceSpecifier::Topic(name));
        for (key, value) in &merged {
            alter = alter.set(key, value);
        }

        let results = self
            .admin
            .alter_configs(&[alter], &self.admin_options())
            .await
            .map_err(Error::Admin)?;

        for result in results {
            result.map_err(|(_, code)| Error::Rejected {
                operation: "alter configs",
                resource: name.to_string(),
                code,
            })?;
        }

        info!(topic = name, "topic config updated");

        Ok(())
    }

    async fn list_consumer_groups(&self) -> Result<Vec<ConsumerGroup>, Self::Error> {
        self.blocking(|client, timeout| {
            let list = client
                .fetch_group_list(None, timeout)
                .map_err(Error::GroupList)?;

            let mut groups: Vec<ConsumerGroup> = list
                .groups()
                .iter()
                .map(|g| ConsumerGroup {
                    group_id: g.name().to_string(),
                    state: g.state().to_string(),
                    protocol_type: g.protocol_type().to_string(),
                })
                .collect();
            groups.sort_by(|a, b| a.group_id.cmp(&b.group_id));

            Ok(groups)
        })
        .await
    }

    async fn get_consumer_group(&self, group_id: &str) -> Result<ConsumerGroupDetail, Self::Error> {
        let group_id = group_id.to_string();

        self.blocking(move |client, timeout| {
            let list = client
                .fetch_group_list(Some(group_id.as_str()), timeout)
                .map_err(Error::GroupList)?;

            // Unknown groups come back as "Dead" with no members.
            let group = list
                .groups()
                .iter()
                .find(|g| g.name() == group_id)
                .filter(|g| g.state() != "Dead" || !g.members().is_empty())
                .ok_or_else(|| Error::GroupNotFound(group_id.clone()))?;

            let members = group
                .members()
                .iter()
                .map(|m| {
                    let assignment = decode_assignment(m.assignment().unwrap_or_default())
                        .unwrap_or_else(|e| {
                            warn!(member_id = m.id(), error = %e, "undecodable member assignment");
                            Vec::new()
                        });

                    Member {
                        member_id: m.id().to_string(),
                        client_id: m.client_id().to_string(),
                        host: m.client_host().to_string(),
                        assignment,
                    }
                })
                .collect();

            Ok(ConsumerGroupDetail {
                group_id: group.name().to_string(),
                state: group.state().to_string(),
                protocol_type: group.protocol_type().to_string(),
                members,
            })
        })
        .await
    }

    async fn open_session(&self, options: SessionOptions) -> Result<Self::Session, Self::Error> {
        if !self.topic_exists(&options.topic).await? {
            return Err(Error::UnknownTopic(options.topic));
        }

        let mut config = self.options.client_config();
        config
            .set("client.id", CLIENT_ID)
            .set("group.id", &options.group_id)
            .set("auto.offset.reset", options.offset_policy.as_str())
            .set("enable.auto.commit", "true")
            .set("enable.partition.eof", "false");

        let consumer: StreamConsumer = config.create().map_err(Error::Client)?;
        consumer
            .subscribe(&[options.topic.as_str()])
            .map_err(Error::Subscribe)?;

        info!(
            topic = %options.topic,
            group_id = %options.group_id,
            offset_policy = %options.offset_policy,
            "session opened"
        );

        Ok(KafkaSession::new(consumer, options.topic, options.group_id))
    }
}
