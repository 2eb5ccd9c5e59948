//! Query string handling for the consume endpoints.
//!
//! Numeric parameters are lenient: anything that is not a positive integer
//! falls back to the default instead of failing the request. Batch
//! timeouts are capped at [`MAX_BATCH_TIMEOUT_SECS`].

use crate::error::ApiError;

use std::num::NonZeroUsize;
use std::time::Duration;

use kafka_admin_broker::{OffsetPolicy, SessionOptions};
use serde::Deserialize;

/// Group used by batch reads when none is given.
pub(crate) const BATCH_GROUP_ID: &str = "kafka-admin-api-batch-consumer";

/// Group used by live streams when none is given.
pub(crate) const STREAM_GROUP_ID: &str = "kafka-admin-api-sse-consumer";

const DEFAULT_BATCH_MAX: NonZeroUsize = match NonZeroUsize::new(10) {
    Some(max) => max,
    None => panic!("default batch size must be non-zero"),
};

const DEFAULT_BATCH_TIMEOUT_SECS: u64 = 5;

/// Longest a single batch read may wait, in seconds.
pub(crate) const MAX_BATCH_TIMEOUT_SECS: u64 = 3_600;

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ConsumeQuery {
    group_id: Option<String>,
    offset: Option<String>,
    max: Option<String>,
    timeout: Option<String>,
}

impl ConsumeQuery {
    pub(crate) fn session_options(
        &self,
        topic: String,
        default_group_id: &str,
    ) -> Result<SessionOptions, ApiError> {
        let offset_policy = match non_empty(self.offset.as_deref()) {
            Some(offset) => offset
                .parse::<OffsetPolicy>()
                .map_err(|e| ApiError::bad_request(e.to_string()))?,
            None => OffsetPolicy::default(),
        };

        Ok(SessionOptions {
            topic,
            group_id: non_empty(self.group_id.as_deref())
                .unwrap_or(default_group_id)
                .to_string(),
            offset_policy,
        })
    }

    pub(crate) fn batch_max(&self) -> NonZeroUsize {
        self.max_messages().unwrap_or(DEFAULT_BATCH_MAX)
    }

    pub(crate) fn batch_timeout(&self) -> Duration {
        let secs = positive(self.timeout.as_deref()).unwrap_or(DEFAULT_BATCH_TIMEOUT_SECS);
        Duration::from_secs(secs.min(MAX_BATCH_TIMEOUT_SECS))
    }

    /// Live stream cap; `None` streams until the client leaves.
    pub(crate) fn stream_max(&self) -> Option<NonZeroUsize> {
        self.max_messages()
    }

    fn max_messages(&self) -> Option<NonZeroUsize> {
        positive(self.max.as_deref())
            .and_then(|max| usize::try_from(max).ok())
            .and_then(NonZeroUsize::new)
    }
}

/// Trims a path topic and rejects blank names.
pub(crate) fn required_topic(raw: &str) -> Result<String, ApiError> {
    let topic = raw.trim();
    if topic.is_empty() {
        return Err(ApiError::bad_request("topic name required"));
    }

    Ok(topic.to_string())
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn positive(value: Option<&str>) -> Option<u64> {
    non_empty(value)?
        .parse::<i64>()
        .ok()
        .and_then(|n| u64::try_from(n).ok())
        .filter(|&n| n > 0)
}
