//! Subscriber registry
//!
//! A `Subscriber` is one remote endpoint interested in one topic. Identity is
//! the `(address, topic)` pair: the registry never holds two entries with the
//! same pair and duplicate adds are a no-op.
//!
//! Concurrency note: every operation takes the registry lock exactly once and
//! never holds it across an `.await`. Readers always get a snapshot copy.

use std::sync::{Mutex, MutexGuard};

use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Subscriber {
    pub address: String,
    pub topic: String,
}

impl Subscriber {
    pub fn new(address: &str, topic: &str) -> Self {
        Self {
            address: address.to_string(),
            topic: topic.to_string(),
        }
    }
}

#[derive(Debug, Default)]
pub struct SubscriberRegistry {
    subscribers: Mutex<Vec<Subscriber>>,
}

impl SubscriberRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    // A panic while holding the lock cannot leave the list half-updated,
    // so a poisoned lock is still safe to use.
    fn lock(&self) -> MutexGuard<'_, Vec<Subscriber>> {
        self.subscribers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Add a subscriber. Returns `false` if the `(address, topic)` pair was
    /// already registered, in which case nothing changes.
    pub fn add(&self, subscriber: Subscriber) -> bool {
        let mut subscribers = self.lock();

        if subscribers.contains(&subscriber) {
            debug!(
                address = %subscriber.address,
                topic = %subscriber.topic,
                "Subscriber already registered"
            );
            return false;
        }

        info!(
            address = %subscriber.address,
            topic = %subscriber.topic,
            "Added new subscriber"
        );
        subscribers.push(subscriber);
        true
    }

    /// Snapshot of every subscriber registered for `topic`.
    pub fn get_by_topic(&self, topic: &str) -> Vec<Subscriber> {
        self.lock()
            .iter()
            .filter(|s| s.topic == topic)
            .cloned()
            .collect()
    }

    /// Remove every entry for `address`, whatever its topic.
    ///
    /// Unknown addresses are a no-op. Returns how many entries were removed.
    pub fn remove(&self, address: &str) -> usize {
        let mut subscribers = self.lock();
        let before = subscribers.len();
        subscribers.retain(|s| s.address != address);
        before - subscribers.len()
    }

    pub fn count(&self) -> usize {
        self.lock().len()
    }

    pub fn log_subscribers(&self) {
        let subscribers = self.lock();
        debug!("Total subscribers: {}", subscribers.len());
        for s in subscribers.iter() {
            debug!("  - {} (topic: {})", s.address, s.topic);
        }
    }
}
