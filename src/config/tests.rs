use std::env;
use std::fs;
use std::time::Duration;

use serial_test::serial;
use tempfile::TempDir;

use super::load_config;
use super::settings::Settings;
use crate::broker::MessageStore;

#[test]
fn test_default_settings() {
    let settings = Settings::default();
    assert_eq!(settings.server.host, "127.0.0.1");
    assert_eq!(settings.server.port, 5001);
    assert_eq!(settings.broker.delivery_interval_ms, 2000);
    assert_eq!(settings.broker.replay_limit, 10);
    assert_eq!(settings.broker.replay_pacing_ms, 100);
    assert_eq!(settings.broker.history_max_per_topic, 1000);
    assert_eq!(settings.broker.message_ttl_secs, 3600);
}

#[test]
fn zero_bounds_disable_history_policy() {
    let mut settings = Settings::default();
    settings.broker.history_max_per_topic = 0;
    settings.broker.message_ttl_secs = 0;

    let policy = settings.broker.history_policy();
    assert_eq!(policy.max_per_topic, None);
    assert_eq!(policy.ttl, None);
}

#[test]
fn oversized_ttl_keeps_history_without_panicking() {
    for secs in [u64::MAX, 9_000_000_000_000] {
        let mut settings = Settings::default();
        settings.broker.message_ttl_secs = secs;

        let policy = settings.broker.history_policy();
        if secs == u64::MAX {
            assert_eq!(policy.ttl, None);
        }

        let store = MessageStore::new(policy);
        store.publish("x", "a").unwrap();
        store.publish("x", "b").unwrap();
        assert_eq!(store.history_for_topic("x").len(), 2, "ttl of {secs}s");
    }
}

#[test]
fn replay_options_follow_broker_settings() {
    let settings = Settings::default();
    let replay = settings.broker.replay_options();
    assert_eq!(replay.limit, 10);
    assert_eq!(replay.pacing, Duration::from_millis(100));
    assert_eq!(replay.notify_timeout, Duration::from_secs(5));
}

#[test]
#[serial]
fn load_config_without_sources_uses_defaults() {
    let tmp = TempDir::new().expect("create tempdir");
    let orig = env::current_dir().expect("current_dir");
    env::set_current_dir(tmp.path()).expect("set current dir");

    let cfg = load_config().expect("load_config failed");
    assert_eq!(cfg, Settings::default());

    env::set_current_dir(orig).expect("restore cwd");
}

#[test]
#[serial]
fn load_config_from_file_overrides_defaults() {
    // load_config picks up config/default.toml relative to the working dir.
    let tmp = TempDir::new().expect("create tempdir");
    let orig = env::current_dir().expect("current_dir");
    env::set_current_dir(tmp.path()).expect("set current dir");

    fs::create_dir_all("config").expect("create config dir");
    let toml = r#"
        [server]
        host = "0.0.0.0"
        port = 9000

        [broker]
        delivery_interval_ms = 250
        replay_limit = 3
    "#;
    fs::write("config/default.toml", toml).expect("write config file");

    let cfg = load_config().expect("load_config failed");
    assert_eq!(cfg.server.host, "0.0.0.0");
    assert_eq!(cfg.server.port, 9000);
    assert_eq!(cfg.server.log_level, "info");
    assert_eq!(cfg.broker.delivery_interval_ms, 250);
    assert_eq!(cfg.broker.replay_limit, 3);
    assert_eq!(cfg.broker.notify_timeout_ms, 5000);

    env::set_current_dir(orig).expect("restore cwd");
}

#[test]
#[serial]
fn load_config_from_env_overrides_defaults() {
    temp_env::with_vars(
        [
            ("NOTIFYSUB_SERVER__PORT", Some("7001")),
            ("NOTIFYSUB_BROKER__REPLAY_PACING_MS", Some("5")),
        ],
        || {
            let cfg = load_config().expect("load_config failed");
            assert_eq!(cfg.server.port, 7001);
            assert_eq!(cfg.broker.replay_pacing_ms, 5);
            assert_eq!(cfg.broker.replay_limit, 10);
        },
    );
}
