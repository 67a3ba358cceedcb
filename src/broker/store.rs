//! In-memory message store
//!
//! The store keeps two independent views of every published message:
//! - a FIFO delivery queue, drained one message at a time by the delivery
//!   engine (single consumer)
//! - a per-topic history, read by the subscription handler for replay
//!
//! The two views live behind separate locks so that live delivery and replay
//! never contend. `publish` appends to both while holding the history lock,
//! which keeps same-topic history order and global queue order identical to
//! publish order.
//!
//! History is bounded by a `HistoryPolicy`: a per-topic cap (oldest entries
//! are dropped first) and an optional time-to-live. Every publish sweeps all
//! topics, so quiet topics expire too; reads prune the topic they touch. Nothing here touches disk; all state is
//! lost when the process exits.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Duration, Utc};
use tracing::debug;

use crate::broker::message::Message;
use crate::utils::error::BrokerError;

/// Number of messages replayed when the caller does not ask for a limit.
pub const DEFAULT_RECENT_LIMIT: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryPolicy {
    /// Maximum number of messages kept per topic. `None` keeps everything.
    pub max_per_topic: Option<usize>,
    /// Messages older than this are dropped from history. `None` never expires.
    pub ttl: Option<Duration>,
}

impl HistoryPolicy {
    pub fn unbounded() -> Self {
        Self {
            max_per_topic: None,
            ttl: None,
        }
    }
}

impl Default for HistoryPolicy {
    fn default() -> Self {
        Self {
            max_per_topic: Some(1000),
            ttl: Some(Duration::hours(1)),
        }
    }
}

#[derive(Debug, Default)]
struct History {
    topics: HashMap<String, VecDeque<Message>>,
    next_sequence: u64,
}

impl HistoryPolicy {
    /// Oldest creation time still retained. `None` when nothing can expire,
    /// including a TTL too large to subtract from the current time.
    fn expiry(&self) -> Option<DateTime<Utc>> {
        let ttl = self.ttl.filter(|ttl| *ttl > Duration::zero())?;
        Utc::now().checked_sub_signed(ttl)
    }
}

fn trim(messages: &mut VecDeque<Message>, max: Option<usize>, expiry: Option<DateTime<Utc>>) {
    if let Some(max) = max {
        while messages.len() > max {
            messages.pop_front();
        }
    }

    if let Some(expiry) = expiry {
        while messages.front().is_some_and(|m| m.created_at < expiry) {
            messages.pop_front();
        }
    }
}

impl History {
    fn prune(&mut self, topic: &str, policy: &HistoryPolicy) {
        let Some(messages) = self.topics.get_mut(topic) else {
            return;
        };

        trim(messages, policy.max_per_topic, policy.expiry());
        if messages.is_empty() {
            self.topics.remove(topic);
        }
    }

    /// Applies the policy to every topic and drops the ones left empty.
    fn sweep(&mut self, policy: &HistoryPolicy) {
        let expiry = policy.expiry();
        self.topics.retain(|_, messages| {
            trim(messages, policy.max_per_topic, expiry);
            !messages.is_empty()
        });
    }
}

#[derive(Debug, Default)]
pub struct MessageStore {
    queue: Mutex<VecDeque<Message>>,
    history: Mutex<History>,
    policy: HistoryPolicy,
}

impl MessageStore {
    pub fn new(policy: HistoryPolicy) -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            history: Mutex::new(History::default()),
            policy,
        }
    }

    fn queue(&self) -> MutexGuard<'_, VecDeque<Message>> {
        self.queue.lock().unwrap_or_else(|p| p.into_inner())
    }

    fn history(&self) -> MutexGuard<'_, History> {
        self.history.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Accept a message for delivery and replay.
    ///
    /// Fails only when `topic` is empty.
    pub fn publish(&self, topic: &str, content: &str) -> Result<Message, BrokerError> {
        if topic.trim().is_empty() {
            return Err(BrokerError::EmptyTopic);
        }

        let mut history = self.history();
        let message = Message::new(topic, content, history.next_sequence);
        history.next_sequence += 1;

        history
            .topics
            .entry(message.topic.clone())
            .or_default()
            .push_back(message.clone());
        history.sweep(&self.policy);

        // Queued while the history lock is still held so no reader can observe
        // the message in one view only.
        self.queue().push_back(message.clone());

        debug!(
            topic = %message.topic,
            sequence = message.sequence,
            "Message stored"
        );
        Ok(message)
    }

    /// Pop the oldest message that has not been handed to the delivery engine.
    pub fn dequeue_next(&self) -> Option<Message> {
        self.queue().pop_front()
    }

    pub fn is_queue_empty(&self) -> bool {
        self.queue().is_empty()
    }

    pub fn queue_len(&self) -> usize {
        self.queue().len()
    }

    /// Number of topics that still hold history.
    pub fn topic_count(&self) -> usize {
        self.history().topics.len()
    }

    /// Every retained message for `topic`, oldest first.
    pub fn history_for_topic(&self, topic: &str) -> Vec<Message> {
        let mut history = self.history();
        history.prune(topic, &self.policy);
        history
            .topics
            .get(topic)
            .map(|messages| messages.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// The newest `limit` messages for `topic`, still ordered oldest first.
    pub fn recent_for_topic(&self, topic: &str, limit: usize) -> Vec<Message> {
        let mut history = self.history();
        history.prune(topic, &self.policy);
        let Some(messages) = history.topics.get(topic) else {
            return Vec::new();
        };

        let skip = messages.len().saturating_sub(limit);
        messages.iter().skip(skip).cloned().collect()
    }
}
