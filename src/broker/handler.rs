//! Subscription handler
//!
//! Inbound side of the broker. `subscribe` registers the caller and replays
//! the most recent history of its topic straight to it; `publish` is the
//! injection point for producers.
//!
//! The subscribe reply only reflects registration. Replay problems are logged
//! per message and never undo the registration or evict the subscriber.
//!
//! Topics are case-insensitive: both entry points trim and lower-case them
//! with `normalize_topic`, so "News" and "news" are one delivery group.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::broker::notifier::Notifier;
use crate::broker::store::{DEFAULT_RECENT_LIMIT, MessageStore};
use crate::broker::topic::{Subscriber, SubscriberRegistry};
use crate::transport::message::{NotifyRequest, PublishReply, SubscribeReply};
use crate::utils::error::BrokerError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplayOptions {
    /// How many of the newest messages are replayed.
    pub limit: usize,
    /// Delay between two replayed messages.
    pub pacing: Duration,
    pub notify_timeout: Duration,
}

impl Default for ReplayOptions {
    fn default() -> Self {
        Self {
            limit: DEFAULT_RECENT_LIMIT,
            pacing: Duration::from_millis(100),
            notify_timeout: Duration::from_secs(5),
        }
    }
}

/// Outcome of a history replay toward one subscriber.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplayReport {
    pub sent: usize,
    pub failed: usize,
}

pub struct SubscriptionHandler {
    registry: Arc<SubscriberRegistry>,
    store: Arc<MessageStore>,
    notifier: Arc<dyn Notifier>,
    replay: ReplayOptions,
}

/// Topics are case-insensitive; subscribers and publishers may differ in case.
pub fn normalize_topic(topic: &str) -> String {
    topic.trim().to_lowercase()
}

impl SubscriptionHandler {
    pub fn new(
        registry: Arc<SubscriberRegistry>,
        store: Arc<MessageStore>,
        notifier: Arc<dyn Notifier>,
        replay: ReplayOptions,
    ) -> Self {
        Self {
            registry,
            store,
            notifier,
            replay,
        }
    }

    /// Validate and register `(address, topic)`, then replay history to it.
    pub async fn subscribe(&self, address: &str, topic: &str) -> SubscribeReply {
        info!(address, topic, "New client is trying to subscribe");

        let subscriber = match Self::validate(address, topic) {
            Ok(subscriber) => subscriber,
            Err(e) => {
                warn!(address, topic, "Rejected subscription: {e}");
                return SubscribeReply { is_success: false };
            }
        };

        self.registry.add(subscriber.clone());
        self.replay_history(&subscriber).await;

        SubscribeReply { is_success: true }
    }

    fn validate(address: &str, topic: &str) -> Result<Subscriber, BrokerError> {
        let address = address.trim();
        if address.is_empty() {
            return Err(BrokerError::EmptyAddress);
        }
        let topic = normalize_topic(topic);
        if topic.is_empty() {
            return Err(BrokerError::EmptyTopic);
        }
        Ok(Subscriber::new(address, &topic))
    }

    /// Send the newest messages of the subscriber's topic, oldest first.
    pub async fn replay_history(&self, subscriber: &Subscriber) -> ReplayReport {
        let history = self
            .store
            .recent_for_topic(&subscriber.topic, self.replay.limit);
        let mut report = ReplayReport::default();

        if history.is_empty() {
            debug!(topic = %subscriber.topic, "No historical messages found");
            return report;
        }

        info!(
            address = %subscriber.address,
            topic = %subscriber.topic,
            "Sending {} historical messages",
            history.len()
        );

        let total = history.len();
        for (i, message) in history.iter().enumerate() {
            if i > 0 {
                tokio::time::sleep(self.replay.pacing).await;
            }

            let request = NotifyRequest::historical(message);
            let call = self.notifier.notify(&subscriber.address, &request);
            match tokio::time::timeout(self.replay.notify_timeout, call).await {
                Ok(Ok(())) => {
                    debug!(
                        address = %subscriber.address,
                        "Sent historical message {}/{}: {}",
                        i + 1,
                        total,
                        message.content
                    );
                    report.sent += 1;
                }
                Ok(Err(e)) => {
                    warn!(
                        address = %subscriber.address,
                        "Error sending historical message {}: {e}",
                        i + 1
                    );
                    report.failed += 1;
                }
                Err(_) => {
                    warn!(
                        address = %subscriber.address,
                        "Historical message {} timed out after {:?}",
                        i + 1,
                        self.replay.notify_timeout
                    );
                    report.failed += 1;
                }
            }
        }

        report
    }

    /// Accept a message from a producer.
    pub fn publish(&self, topic: &str, content: &str) -> PublishReply {
        match self.store.publish(&normalize_topic(topic), content) {
            Ok(message) => PublishReply {
                is_success: true,
                sequence: Some(message.sequence),
            },
            Err(e) => {
                warn!(topic, "Rejected publish: {e}");
                PublishReply {
                    is_success: false,
                    sequence: None,
                }
            }
        }
    }
}
