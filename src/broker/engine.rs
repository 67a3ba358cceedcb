//! Delivery engine
//!
//! This module contains the periodic task that moves messages from the
//! `MessageStore` delivery queue to subscribers:
//! - every tick dequeues at most one message
//! - the message is fanned out to a snapshot of the topic's subscribers
//! - each notify attempt runs concurrently and is bounded by a timeout, so a
//!   slow subscriber only delays its own attempt
//! - subscribers whose attempt fails permanently are evicted from the
//!   registry; transient failures are logged and the subscriber stays
//!
//! Concurrency and usage notes:
//! - One pass per tick is a rate limit. The tick interval is configurable
//!   (`broker.delivery_interval_ms`).
//! - Ticks never overlap: the loop awaits the pass before waiting for the next
//!   tick, and missed ticks are delayed instead of bursted.
//! - Shutdown is signalled with a `CancellationToken`. A pass that already
//!   started runs to completion; no new pass starts afterwards.

use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::broker::message::Message;
use crate::broker::notifier::Notifier;
use crate::broker::store::MessageStore;
use crate::broker::topic::{Subscriber, SubscriberRegistry};
use crate::transport::message::NotifyRequest;
use crate::utils::error::{DeliveryOutcome, NotifyError};

/// What happened to one message during one pass.
#[derive(Debug, Clone)]
pub struct DeliveryReport {
    pub message: Message,
    pub delivered: Vec<String>,
    pub transient: Vec<String>,
    pub evicted: Vec<String>,
}

impl DeliveryReport {
    fn new(message: Message) -> Self {
        Self {
            message,
            delivered: Vec::new(),
            transient: Vec::new(),
            evicted: Vec::new(),
        }
    }

    pub fn attempted(&self) -> usize {
        self.delivered.len() + self.transient.len() + self.evicted.len()
    }
}

pub struct DeliveryEngine {
    registry: Arc<SubscriberRegistry>,
    store: Arc<MessageStore>,
    notifier: Arc<dyn Notifier>,
    interval: Duration,
    notify_timeout: Duration,
}

impl DeliveryEngine {
    /// Used when the configured interval is zero; `tokio::time::interval`
    /// rejects a zero period.
    const MIN_INTERVAL: Duration = Duration::from_millis(1);

    pub fn new(
        registry: Arc<SubscriberRegistry>,
        store: Arc<MessageStore>,
        notifier: Arc<dyn Notifier>,
        interval: Duration,
        notify_timeout: Duration,
    ) -> Self {
        Self {
            registry,
            store,
            notifier,
            interval: interval.max(Self::MIN_INTERVAL),
            notify_timeout,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Run a single delivery pass.
    ///
    /// Returns `None` when the queue was empty and nothing was attempted.
    pub async fn tick(&self) -> Option<DeliveryReport> {
        if self.store.is_queue_empty() {
            return None;
        }
        let message = self.store.dequeue_next()?;

        let subscribers = self.registry.get_by_topic(&message.topic);
        info!(
            topic = %message.topic,
            sequence = message.sequence,
            "Processing message for {} subscriber(s)",
            subscribers.len()
        );

        let request = NotifyRequest::live(&message);
        let attempts = subscribers
            .iter()
            .map(|subscriber| self.attempt(subscriber, &request));
        let outcomes = join_all(attempts).await;

        let mut report = DeliveryReport::new(message);
        for (subscriber, outcome) in subscribers.into_iter().zip(outcomes) {
            match outcome {
                DeliveryOutcome::Delivered => {
                    debug!(address = %subscriber.address, "Notified subscriber");
                    report.delivered.push(subscriber.address);
                }
                DeliveryOutcome::Transient(e) => {
                    warn!(
                        address = %subscriber.address,
                        kind = e.as_label(),
                        "Error notifying subscriber: {e}"
                    );
                    report.transient.push(subscriber.address);
                }
                DeliveryOutcome::Permanent(e) => {
                    error!(
                        address = %subscriber.address,
                        kind = e.as_label(),
                        "Evicting subscriber: {e}"
                    );
                    self.registry.remove(&subscriber.address);
                    self.notifier.forget(&subscriber.address);
                    report.evicted.push(subscriber.address);
                }
            }
        }

        Some(report)
    }

    async fn attempt(&self, subscriber: &Subscriber, request: &NotifyRequest) -> DeliveryOutcome {
        let call = self.notifier.notify(&subscriber.address, request);
        match tokio::time::timeout(self.notify_timeout, call).await {
            Ok(result) => DeliveryOutcome::from(result),
            Err(_) => DeliveryOutcome::Transient(NotifyError::Timeout {
                address: subscriber.address.clone(),
                timeout: self.notify_timeout,
            }),
        }
    }

    /// Tick until `shutdown` is cancelled.
    pub async fn run(&self, shutdown: CancellationToken) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!("Delivery engine started, interval {:?}", self.interval);
        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {
                    self.tick().await;
                }
            }
        }
        info!("Delivery engine stopped");
    }

    pub fn spawn(self: Arc<Self>, shutdown: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move { self.run(shutdown).await })
    }
}
