use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// A broker node in the cluster.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Broker {
    /// Broker id.
    pub id: i32,

    /// Advertised host.
    pub host: String,

    /// Advertised port.
    pub port: i32,
}

/// Summary of a topic, as returned by topic listings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Topic {
    /// Topic name.
    pub name: String,

    /// Number of partitions.
    pub partition_count: usize,

    /// Replica count of the first partition (0 for a topic without partitions).
    pub replication_factor: usize,
}

/// Full description of a single topic.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicDetail {
    /// Topic name.
    pub name: String,

    /// Partition layout.
    pub partitions: Vec<Partition>,

    /// Config entries that differ from the broker defaults.
    pub configs: HashMap<String, String>,
}

/// Replica layout of one partition.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Partition {
    /// Partition id.
    pub id: i32,

    /// Broker id of the partition leader.
    pub leader: i32,

    /// Broker ids holding a replica.
    pub replicas: Vec<i32>,

    /// Broker ids of the in-sync replicas.
    pub isr: Vec<i32>,
}

/// Request to create a topic.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateTopicRequest {
    /// Topic name.
    pub name: String,

    /// Number of partitions.
    pub partitions: i32,

    /// Replication factor.
    pub replication_factor: i16,

    /// Initial topic configs.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub configs: HashMap<String, String>,
}

/// Request to change topic configs.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateTopicRequest {
    /// Config entries to set; entries not named are left untouched.
    #[serde(default)]
    pub configs: HashMap<String, String>,
}

/// Summary of a consumer group.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsumerGroup {
    /// Group id.
    pub group_id: String,

    /// Group state as reported by the coordinator (e.g. `Stable`, `Empty`).
    pub state: String,

    /// Protocol type (`consumer` for regular consumer groups).
    pub protocol_type: String,
}

/// Full description of a consumer group.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsumerGroupDetail {
    /// Group id.
    pub group_id: String,

    /// Group state.
    pub state: String,

    /// Protocol type.
    pub protocol_type: String,

    /// Current members.
    pub members: Vec<Member>,
}

/// A member of a consumer group.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    /// Member id assigned by the coordinator.
    pub member_id: String,

    /// Client id of the member.
    pub client_id: String,

    /// Host the member connected from.
    pub host: String,

    /// Partitions assigned to the member.
    pub assignment: Vec<TopicPartition>,
}

/// A topic/partition pair.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TopicPartition {
    /// Topic name.
    pub topic: String,

    /// Partition id.
    pub partition: i32,
}
