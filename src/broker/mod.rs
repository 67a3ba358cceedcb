pub mod engine;
pub mod handler;
pub mod message;
pub mod notifier;
pub mod store;
pub mod topic;

use std::sync::Arc;

pub use engine::{DeliveryEngine, DeliveryReport};
pub use handler::SubscriptionHandler;
pub use notifier::Notifier;
pub use store::MessageStore;
pub use topic::{Subscriber, SubscriberRegistry};

use crate::config::BrokerSettings;

/// The shared stores plus the two services built on top of them.
///
/// Every component receives its collaborators explicitly; this type only
/// does the wiring.
pub struct Broker {
    pub registry: Arc<SubscriberRegistry>,
    pub store: Arc<MessageStore>,
    pub engine: Arc<DeliveryEngine>,
    pub handler: Arc<SubscriptionHandler>,
}

impl Broker {
    pub fn new(settings: &BrokerSettings, notifier: Arc<dyn Notifier>) -> Self {
        let registry = Arc::new(SubscriberRegistry::new());
        let store = Arc::new(MessageStore::new(settings.history_policy()));

        let engine = Arc::new(DeliveryEngine::new(
            registry.clone(),
            store.clone(),
            notifier.clone(),
            settings.delivery_interval(),
            settings.notify_timeout(),
        ));
        let handler = Arc::new(SubscriptionHandler::new(
            registry.clone(),
            store.clone(),
            notifier,
            settings.replay_options(),
        ));

        Self {
            registry,
            store,
            engine,
            handler,
        }
    }
}
