mod brokers;
mod consume;
mod groups;
mod health;
mod topics;

pub(crate) use brokers::list_brokers_handler;
pub(crate) use consume::{consume_batch_handler, stream_messages_handler};
pub(crate) use groups::{get_consumer_group_handler, list_consumer_groups_handler};
pub(crate) use health::health_handler;
pub(crate) use topics::{
    create_topic_handler, get_topic_handler, list_topics_handler, update_topic_handler,
};
