use std::time::Duration;

use serde::Deserialize;

use crate::broker::handler::ReplayOptions;
use crate::broker::store::HistoryPolicy;

/// Top-level configuration settings for the application.
///
/// Includes settings for both the server and the message broker.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct Settings {
    pub server: ServerSettings,
    pub broker: BrokerSettings,
}

/// Configuration settings for the server.
///
/// Defines the address the broker endpoint binds to and the default log level.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub log_level: String,
}

/// Configuration settings for the broker.
///
/// Controls delivery pacing, replay and how much history is retained.
/// A `history_max_per_topic` or `message_ttl_secs` of zero disables that bound.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct BrokerSettings {
    pub delivery_interval_ms: u64,
    pub notify_timeout_ms: u64,
    pub replay_limit: usize,
    pub replay_pacing_ms: u64,
    pub history_max_per_topic: usize,
    pub message_ttl_secs: u64,
}

impl BrokerSettings {
    pub fn delivery_interval(&self) -> Duration {
        Duration::from_millis(self.delivery_interval_ms)
    }

    pub fn notify_timeout(&self) -> Duration {
        Duration::from_millis(self.notify_timeout_ms)
    }

    pub fn history_policy(&self) -> HistoryPolicy {
        HistoryPolicy {
            max_per_topic: (self.history_max_per_topic > 0).then_some(self.history_max_per_topic),
            // out of range for chrono means the history never expires
            ttl: i64::try_from(self.message_ttl_secs)
                .ok()
                .filter(|secs| *secs > 0)
                .and_then(chrono::Duration::try_seconds),
        }
    }

    pub fn replay_options(&self) -> ReplayOptions {
        ReplayOptions {
            limit: self.replay_limit,
            pacing: Duration::from_millis(self.replay_pacing_ms),
            notify_timeout: self.notify_timeout(),
        }
    }
}

/// Partial configuration settings loaded from files or environment.
///
/// Allows partial specification of settings. Missing values can be filled using defaults.
#[derive(Debug, Deserialize)]
pub struct PartialSettings {
    pub server: Option<PartialServerSettings>,
    pub broker: Option<PartialBrokerSettings>,
}

#[derive(Debug, Deserialize)]
pub struct PartialServerSettings {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub log_level: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PartialBrokerSettings {
    pub delivery_interval_ms: Option<u64>,
    pub notify_timeout_ms: Option<u64>,
    pub replay_limit: Option<usize>,
    pub replay_pacing_ms: Option<u64>,
    pub history_max_per_topic: Option<usize>,
    pub message_ttl_secs: Option<u64>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerSettings {
                host: "127.0.0.1".to_string(),
                port: 5001,
                log_level: "info".to_string(),
            },
            broker: BrokerSettings {
                delivery_interval_ms: 2000,
                notify_timeout_ms: 5000,
                replay_limit: 10,
                replay_pacing_ms: 100,
                history_max_per_topic: 1000,
                message_ttl_secs: 3600,
            },
        }
    }
}
