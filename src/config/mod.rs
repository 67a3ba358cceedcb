mod settings;

use config::{Config, ConfigError, Environment, File};

use settings::PartialSettings;

pub use settings::{BrokerSettings, ServerSettings, Settings};

/// Prefix for environment overrides, e.g. `NOTIFYSUB_BROKER__REPLAY_LIMIT=5`.
pub const ENV_PREFIX: &str = "NOTIFYSUB";

/// Loads the configuration from the default file and environment variables
/// Merges the configuration with default values
/// Returns a `Settings` struct containing the server and broker configurations
pub fn load_config() -> Result<Settings, ConfigError> {
    let builder = Config::builder()
        .add_source(File::with_name("config/default").required(false))
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

    let config = builder.build()?;

    // Try to deserialize what is available
    let partial: PartialSettings = config.try_deserialize()?;

    // Merge with defaults
    let default = Settings::default();
    let server = partial.server;
    let broker = partial.broker;

    Ok(Settings {
        server: ServerSettings {
            host: server
                .as_ref()
                .and_then(|s| s.host.clone())
                .unwrap_or(default.server.host),
            port: server
                .as_ref()
                .and_then(|s| s.port)
                .unwrap_or(default.server.port),
            log_level: server
                .as_ref()
                .and_then(|s| s.log_level.clone())
                .unwrap_or(default.server.log_level),
        },
        broker: BrokerSettings {
            delivery_interval_ms: broker
                .as_ref()
                .and_then(|b| b.delivery_interval_ms)
                .unwrap_or(default.broker.delivery_interval_ms),
            notify_timeout_ms: broker
                .as_ref()
                .and_then(|b| b.notify_timeout_ms)
                .unwrap_or(default.broker.notify_timeout_ms),
            replay_limit: broker
                .as_ref()
                .and_then(|b| b.replay_limit)
                .unwrap_or(default.broker.replay_limit),
            replay_pacing_ms: broker
                .as_ref()
                .and_then(|b| b.replay_pacing_ms)
                .unwrap_or(default.broker.replay_pacing_ms),
            history_max_per_topic: broker
                .as_ref()
                .and_then(|b| b.history_max_per_topic)
                .unwrap_or(default.broker.history_max_per_topic),
            message_ttl_secs: broker
                .as_ref()
                .and_then(|b| b.message_ttl_secs)
                .unwrap_or(default.broker.message_ttl_secs),
        },
    })
}

#[cfg(test)]
mod tests;
