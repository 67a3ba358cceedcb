//! The `error` module defines the error types used within `notifysub`.
//!
//! - [`BrokerError`] rejects invalid requests at the broker boundary.
//! - [`NotifyError`] is returned by a notify capability and carries the
//!   permanent/transient classification the delivery engine evicts on.
//! - [`TransportError`] covers the WebSocket plumbing on both sides.

use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BrokerError {
    #[error("topic must not be empty")]
    EmptyTopic,

    #[error("subscriber address must not be empty")]
    EmptyAddress,
}

/// Failure of a single notify call toward one subscriber.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum NotifyError {
    /// The endpoint could not be reached at all (refused, bad address).
    #[error("subscriber {address} is unreachable: {reason}")]
    Unreachable { address: String, reason: String },

    /// The endpoint answered with an internal fault.
    #[error("subscriber {address} reported an internal fault: {reason}")]
    Internal { address: String, reason: String },

    #[error("notify to {address} timed out after {timeout:?}")]
    Timeout { address: String, timeout: Duration },

    /// The endpoint answered but did not accept the notification.
    #[error("subscriber {address} declined the notification")]
    Declined { address: String },

    #[error("transient failure notifying {address}: {reason}")]
    Network { address: String, reason: String },
}

impl NotifyError {
    /// Permanent failures mean the subscriber is gone and must be evicted.
    pub fn is_permanent(&self) -> bool {
        matches!(
            self,
            NotifyError::Unreachable { .. } | NotifyError::Internal { .. }
        )
    }

    pub fn address(&self) -> &str {
        match self {
            NotifyError::Unreachable { address, .. }
            | NotifyError::Internal { address, .. }
            | NotifyError::Timeout { address, .. }
            | NotifyError::Declined { address }
            | NotifyError::Network { address, .. } => address,
        }
    }

    /// Short stable label for logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            NotifyError::Unreachable { .. } => "notify_unreachable",
            NotifyError::Internal { .. } => "notify_internal",
            NotifyError::Timeout { .. } => "notify_timeout",
            NotifyError::Declined { .. } => "notify_declined",
            NotifyError::Network { .. } => "notify_network",
        }
    }
}

/// Classified result of one notify attempt.
#[derive(Debug)]
pub enum DeliveryOutcome {
    Delivered,
    Transient(NotifyError),
    Permanent(NotifyError),
}

impl From<Result<(), NotifyError>> for DeliveryOutcome {
    fn from(result: Result<(), NotifyError>) -> Self {
        match result {
            Ok(()) => DeliveryOutcome::Delivered,
            Err(e) if e.is_permanent() => DeliveryOutcome::Permanent(e),
            Err(e) => DeliveryOutcome::Transient(e),
        }
    }
}

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("websocket error: {0}")]
    WebSocket(#[from] tungstenite::Error),

    #[error("malformed frame: {0}")]
    Codec(#[from] serde_json::Error),

    #[error("connection closed by peer")]
    Closed,

    #[error("unexpected reply: {0}")]
    UnexpectedReply(String),

    #[error("remote error: {0}")]
    Remote(String),
}
