//! Message definitions for the broker
//!
//! `Message` is the internal representation of a published message. It is
//! created once by the publish path and never mutated afterwards.
//!
//! Notes on fields:
//! - `topic`: topic name used for routing, never empty
//! - `content`: opaque body forwarded verbatim to subscribers
//! - `created_at`: wall-clock time the broker accepted the message
//! - `sequence`: strictly increasing number assigned by the `MessageStore`;
//!   this is the ordering key for history and replay

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub topic: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub sequence: u64,
}

impl Message {
    pub(crate) fn new(topic: &str, content: &str, sequence: u64) -> Self {
        Self {
            topic: topic.to_string(),
            content: content.to_string(),
            created_at: Utc::now(),
            sequence,
        }
    }
}
