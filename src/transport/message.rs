//! RPC contract between publishers, subscribers and the broker.
//!
//! Payloads (`SubscribeRequest`, `NotifyRequest`, ...) are transport neutral.
//! The frame enums wrap them as JSON text frames tagged by `"type"`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::broker::message::Message;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscribeRequest {
    pub address: String,
    pub topic: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscribeReply {
    pub is_success: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishRequest {
    pub topic: String,
    pub content: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishReply {
    pub is_success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sequence: Option<u64>,
}

/// Sent by the broker to a subscriber.
///
/// Replayed history has `is_historical` set and carries the original
/// `sent_at` so the subscriber can order it against live traffic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotifyRequest {
    pub content: String,
    pub topic: String,
    #[serde(default)]
    pub is_historical: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sent_at: Option<DateTime<Utc>>,
}

impl NotifyRequest {
    pub fn live(message: &Message) -> Self {
        Self {
            content: message.content.clone(),
            topic: message.topic.clone(),
            is_historical: false,
            sent_at: None,
        }
    }

    pub fn historical(message: &Message) -> Self {
        Self {
            content: message.content.clone(),
            topic: message.topic.clone(),
            is_historical: true,
            sent_at: Some(message.created_at),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotifyReply {
    pub is_success: bool,
}

/// Frames a client sends to the broker.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientMessage {
    #[serde(rename = "subscribe")]
    Subscribe(SubscribeRequest),
    #[serde(rename = "publish")]
    Publish(PublishRequest),
}

/// Frames the broker sends back to a client.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ServerMessage {
    #[serde(rename = "subscribe_reply")]
    SubscribeReply(SubscribeReply),
    #[serde(rename = "publish_reply")]
    PublishReply(PublishReply),
    #[serde(rename = "error")]
    Error { message: String },
}

/// Frames the broker sends to a subscriber's notify endpoint.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum NotifyCall {
    #[serde(rename = "notify")]
    Notify(NotifyRequest),
}

/// Frames a subscriber's notify endpoint answers with.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum NotifyResult {
    #[serde(rename = "notify_reply")]
    NotifyReply(NotifyReply),
    #[serde(rename = "error")]
    Error { message: String },
}
