//! In-memory (single node) implementation of the broker gateway for local
//! development and tests.
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

mod error;
mod session;

pub use error::Error;
pub use session::MemorySession;

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use kafka_admin_broker::{
    Broker, BrokerGateway, ConsumerGroup, ConsumerGroupDetail, CreateTopicRequest, Member, Message,
    OffsetPolicy, Partition, SessionOptions, Topic, TopicDetail, TopicPartition,
};
use parking_lot::Mutex;
use tokio::sync::Notify;
use tracing::info;

/// Id of the single broker node.
const NODE_ID: i32 = 0;

/// Client id reported for sessions opened through the gateway.
const CLIENT_ID: &str = "kafka-admin-api";

#[derive(Debug)]
struct TopicLog {
    partitions: Vec<Vec<Message>>,
    configs: HashMap<String, String>,
    next_partition: usize,
}

#[derive(Debug)]
struct GroupMember {
    topic: String,
    partitions: Vec<i32>,
}

#[derive(Debug, Default)]
struct GroupState {
    committed: HashMap<(String, i32), i64>,
    members: BTreeMap<u64, GroupMember>,
}

#[derive(Debug, Default)]
struct State {
    topics: HashMap<String, TopicLog>,
    groups: HashMap<String, GroupState>,
    next_session_id: u64,
}

/// In-memory broker holding topics, committed group offsets and live
/// sessions. Clones share the same state.
#[derive(Clone, Debug, Default)]
pub struct MemoryBroker {
    state: Arc<Mutex<State>>,
    appended: Arc<Notify>,
}

impl MemoryBroker {
    /// Creates a new, empty `MemoryBroker`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a message to `topic` and returns its partition and offset.
    ///
    /// Keyed messages always land on the same partition; keyless ones are
    /// spread round-robin.
    ///
    /// # Errors
    ///
    /// Returns an error if the topic does not exist.
    pub fn produce(
        &self,
        topic: &str,
        key: Option<Bytes>,
        value: Bytes,
    ) -> Result<(i32, i64), Error> {
        self.produce_with_headers(topic, key, value, HashMap::new())
    }

    /// Like [`produce`](Self::produce), with message headers.
    ///
    /// # Errors
    ///
    /// Returns an error if the topic does not exist.
    pub fn produce_with_headers(
        &self,
        topic: &str,
        key: Option<Bytes>,
        value: Bytes,
        headers: HashMap<String, String>,
    ) -> Result<(i32, i64), Error> {
        let (partition, offset) = {
            let mut state = self.state.lock();
            let log = state
                .topics
                .get_mut(topic)
                .ok_or_else(|| Error::TopicNotFound(topic.to_string()))?;

            let partition_count = log.partitions.len();
            let index = match &key {
                Some(key) => crc32fast::hash(key) as usize % partition_count,
                None => {
                    let index = log.next_partition % partition_count;
                    log.next_partition = index + 1;
                    index
                }
            };

            let messages = &mut log.partitions[index];
            #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
            let (partition, offset) = (index as i32, messages.len() as i64);

            messages.push(Message {
                topic: topic.to_string(),
                partition,
                offset,
                key,
                value,
                timestamp: chrono::Utc::now().timestamp_millis(),
                headers,
            });

            (partition, offset)
        };

        self.appended.notify_waiters();

        Ok((partition, offset))
    }

    /// Deletes a topic. Sessions reading it fail on their next pull.
    ///
    /// # Errors
    ///
    /// Returns an error if the topic does not exist.
    pub fn delete_topic(&self, name: &str) -> Result<(), Error> {
        {
            let mut state = self.state.lock();
            state
                .topics
                .remove(name)
                .ok_or_else(|| Error::TopicNotFound(name.to_string()))?;

            for group in state.groups.values_mut() {
                group.committed.retain(|(topic, _), _| topic != name);
            }
        }

        self.appended.notify_waiters();
        info!(topic = name, "topic deleted");

        Ok(())
    }

    /// Number of sessions currently open against the broker.
    #[must_use]
    pub fn active_sessions(&self) -> usize {
        self.state
            .lock()
            .groups
            .values()
            .map(|group| group.members.len())
            .sum()
    }

    /// Returns the next unread message for a session and commits past it.
    fn next_message(
        &self,
        group_id: &str,
        topic: &str,
        positions: &mut [i64],
        next_partition: &mut usize,
    ) -> Result<Option<Message>, Error> {
        let mut state = self.state.lock();
        let State { topics, groups, .. } = &mut *state;
        let log = topics
            .get(topic)
            .ok_or_else(|| Error::TopicDeleted(topic.to_string()))?;

        let partition_count = positions.len().min(log.partitions.len());
        for step in 0..partition_count {
            let index = (*next_partition + step) % partition_count;
            let messages = &log.partitions[index];

            #[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
            let Some(message) = messages.get(positions[index] as usize).cloned() else {
                continue;
            };

            positions[index] = message.offset + 1;
            *next_partition = index + 1;

            groups
                .entry(group_id.to_string())
                .or_default()
                .committed
                .insert((topic.to_string(), message.partition), message.offset + 1);

            return Ok(Some(message));
        }

        Ok(None)
    }

    fn leave_group(&self, group_id: &str, session_id: u64) {
        if let Some(group) = self.state.lock().groups.get_mut(group_id) {
            group.members.remove(&session_id);
        }
    }
}

#[async_trait]
impl BrokerGateway for MemoryBroker {
    type Error = Error;

    type Session = MemorySession;

    async fn list_brokers(&self) -> Result<Vec<Broker>, Self::Error> {
        Ok(vec![Broker {
            id: NODE_ID,
            host: "localhost".to_string(),
            port: 9092,
        }])
    }

    async fn list_topics(&self) -> Result<Vec<Topic>, Self::Error> {
        let state = self.state.lock();
        let mut topics: Vec<Topic> = state
            .topics
            .iter()
            .filter(|(name, _)| !name.starts_with('_'))
            .map(|(name, log)| Topic {
                name: name.clone(),
                partition_count: log.partitions.len(),
                replication_factor: usize::from(!log.partitions.is_empty()),
            })
            .collect();

        topics.sort_by(|a, b| a.name.cmp(&b.name));

        Ok(topics)
    }

    async fn get_topic(&self, name: &str) -> Result<TopicDetail, Self::Error> {
        let state = self.state.lock();
        let log = state
            .topics
            .get(name)
            .ok_or_else(|| Error::TopicNotFound(name.to_string()))?;

        #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
        let partitions = (0..log.partitions.len())
            .map(|id| Partition {
                id: id as i32,
                leader: NODE_ID,
                replicas: vec![NODE_ID],
                isr: vec![NODE_ID],
            })
            .collect();

        Ok(TopicDetail {
            name: name.to_string(),
            partitions,
            configs: log.configs.clone(),
        })
    }

    async fn create_topic(&self, request: CreateTopicRequest) -> Result<(), Self::Error> {
        if request.partitions < 1 {
            return Err(Error::InvalidRequest(format!(
                "number of partitions must be at least 1, got {}",
                request.partitions
            )));
        }

        if request.replication_factor != 1 {
            return Err(Error::InvalidRequest(format!(
                "replication factor {} does not match the 1 available broker",
                request.replication_factor
            )));
        }

        {
            let mut state = self.state.lock();
            if state.topics.contains_key(&request.name) {
                return Err(Error::TopicExists(request.name));
            }

            #[allow(clippy::cast_sign_loss)]
            let partitions = vec![Vec::new(); request.partitions as usize];
            state.topics.insert(
                request.name.clone(),
                TopicLog {
                    partitions,
                    configs: request.configs,
                    next_partition: 0,
                },
            );
        }

        info!(name = %request.name, partitions = request.partitions, "topic created");

        Ok(())
    }

    async fn update_topic_config(
        &self,
        name: &str,
        configs: HashMap<String, String>,
    ) -> Result<(), Self::Error> {
        self.state
            .lock()
            .topics
            .get_mut(name)
            .ok_or_else(|| Error::TopicNotFound(name.to_string()))?
            .configs
            .extend(configs);

        info!(topic = name, "topic config updated");

        Ok(())
    }

    async fn list_consumer_groups(&self) -> Result<Vec<ConsumerGroup>, Self::Error> {
        let state = self.state.lock();
        let mut groups: Vec<ConsumerGroup> = state
            .groups
            .iter()
            .map(|(group_id, group)| ConsumerGroup {
                group_id: group_id.clone(),
                state: group_state(group).to_string(),
                protocol_type: "consumer".to_string(),
            })
            .collect();

        groups.sort_by(|a, b| a.group_id.cmp(&b.group_id));

        Ok(groups)
    }

    async fn get_consumer_group(&self, group_id: &str) -> Result<ConsumerGroupDetail, Self::Error> {
        let state = self.state.lock();
        let group = state
            .groups
            .get(group_id)
            .ok_or_else(|| Error::GroupNotFound(group_id.to_string()))?;

        let members = group
            .members
            .iter()
            .map(|(session_id, member)| Member {
                member_id: format!("{CLIENT_ID}-{session_id}"),
                client_id: CLIENT_ID.to_string(),
                host: "/127.0.0.1".to_string(),
                assignment: member
                    .partitions
                    .iter()
                    .map(|&partition| TopicPartition {
                        topic: member.topic.clone(),
                        partition,
                    })
                    .collect(),
            })
            .collect();

        Ok(ConsumerGroupDetail {
            group_id: group_id.to_string(),
            state: group_state(group).to_string(),
            protocol_type: "consumer".to_string(),
            members,
        })
    }

    async fn open_session(&self, options: SessionOptions) -> Result<Self::Session, Self::Error> {
        let (session_id, positions) = {
            let mut state = self.state.lock();
            let State {
                topics,
                groups,
                next_session_id,
            } = &mut *state;

            let log = topics
                .get(&options.topic)
                .ok_or_else(|| Error::Subscribe(options.topic.clone()))?;

            let group = groups.entry(options.group_id.clone()).or_default();

            #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
            let positions: Vec<i64> = log
                .partitions
                .iter()
                .enumerate()
                .map(|(index, messages)| {
                    let committed = group.committed.get(&(options.topic.clone(), index as i32));
                    match (committed, options.offset_policy) {
                        (Some(&offset), _) => offset,
                        (None, OffsetPolicy::Earliest) => 0,
                        (None, OffsetPolicy::Latest) => messages.len() as i64,
                    }
                })
                .collect();

            *next_session_id += 1;
            let session_id = *next_session_id;

            #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
            group.members.insert(
                session_id,
                GroupMember {
                    topic: options.topic.clone(),
                    partitions: (0..positions.len() as i32).collect(),
                },
            );

            (session_id, positions)
        };

        info!(
            topic = %options.topic,
            group_id = %options.group_id,
            session_id,
            "session opened"
        );

        Ok(MemorySession::new(
            self.clone(),
            session_id,
            options.group_id,
            options.topic,
            positions,
        ))
    }
}

fn group_state(group: &GroupState) -> &'static str {
    if group.members.is_empty() {
        "Empty"
    } else {
        "Stable"
    }
}
