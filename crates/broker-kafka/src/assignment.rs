//! Decoding of the consumer protocol member assignment.
//!
//! ```text
//! version: i16
//! topic_partitions: i32 count, then per topic:
//!   topic: i16 length + utf-8 bytes
//!   partitions: i32 count, then i32 each
//! user_data: i32 length (-1 for null) + bytes
//! ```

use bytes::Buf;
use kafka_admin_broker::TopicPartition;
use thiserror::Error;

/// Errors decoding a member assignment.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AssignmentError {
    /// An array or string length was negative.
    #[error("invalid length {0}")]
    InvalidLength(i32),

    /// Topic name was not valid utf-8.
    #[error("topic name is not valid utf-8")]
    InvalidTopicName,

    /// Input ended before a field was complete.
    #[error("assignment truncated")]
    Truncated,
}

/// Decodes the partitions assigned to a group member.
///
/// Empty input means the member has no assignment yet. User data is ignored.
///
/// # Errors
///
/// Returns an error if the bytes are not a well-formed assignment.
pub fn decode_assignment(mut buf: &[u8]) -> Result<Vec<TopicPartition>, AssignmentError> {
    if buf.is_empty() {
        return Ok(Vec::new());
    }

    let _version = read_i16(&mut buf)?;
    let topic_count = to_len(read_i32(&mut buf)?)?;

    let mut assignment = Vec::new();
    for _ in 0..topic_count {
        let name_len = to_len(i32::from(read_i16(&mut buf)?))?;
        if buf.remaining() < name_len {
            return Err(AssignmentError::Truncated);
        }
        let topic = std::str::from_utf8(&buf[..name_len])
            .map_err(|_| AssignmentError::InvalidTopicName)?
            .to_string();
        buf.advance(name_len);

        let partition_count = to_len(read_i32(&mut buf)?)?;
        for _ in 0..partition_count {
            assignment.push(TopicPartition {
                topic: topic.clone(),
                partition: read_i32(&mut buf)?,
            });
        }
    }

    assignment.sort();
    Ok(assignment)
}

fn read_i16(buf: &mut &[u8]) -> Result<i16, AssignmentError> {
    if buf.remaining() < 2 {
        return Err(AssignmentError::Truncated);
    }
    Ok(buf.get_i16())
}

fn read_i32(buf: &mut &[u8]) -> Result<i32, AssignmentError> {
    if buf.remaining() < 4 {
        return Err(AssignmentError::Truncated);
    }
    Ok(buf.get_i32())
}

fn to_len(len: i32) -> Result<usize, AssignmentError> {
    usize::try_from(len).map_err(|_| AssignmentError::InvalidLength(len))
}
