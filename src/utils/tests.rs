use std::time::Duration;

use super::error::{DeliveryOutcome, NotifyError};
use super::logging;

#[test]
fn logging_init_accepts_levels() {
    // Should not panic
    logging::init("info");
    logging::init("debug");
    logging::init("bogus");
}

#[test]
fn unreachable_and_internal_are_permanent() {
    let unreachable = NotifyError::Unreachable {
        address: "ws://a".to_string(),
        reason: "refused".to_string(),
    };
    let internal = NotifyError::Internal {
        address: "ws://a".to_string(),
        reason: "boom".to_string(),
    };
    assert!(unreachable.is_permanent());
    assert!(internal.is_permanent());
}

#[test]
fn timeouts_and_declines_are_transient() {
    let timeout = NotifyError::Timeout {
        address: "ws://a".to_string(),
        timeout: Duration::from_secs(1),
    };
    let declined = NotifyError::Declined {
        address: "ws://a".to_string(),
    };
    assert!(!timeout.is_permanent());
    assert!(!declined.is_permanent());
    assert_eq!(timeout.as_label(), "notify_timeout");
    assert_eq!(declined.address(), "ws://a");
}

#[test]
fn outcome_from_result_classifies() {
    assert!(matches!(
        DeliveryOutcome::from(Ok(())),
        DeliveryOutcome::Delivered
    ));
    assert!(matches!(
        DeliveryOutcome::from(Err(NotifyError::Unreachable {
            address: "ws://a".to_string(),
            reason: "refused".to_string(),
        })),
        DeliveryOutcome::Permanent(_)
    ));
    assert!(matches!(
        DeliveryOutcome::from(Err(NotifyError::Network {
            address: "ws://a".to_string(),
            reason: "reset".to_string(),
        })),
        DeliveryOutcome::Transient(_)
    ));
}
