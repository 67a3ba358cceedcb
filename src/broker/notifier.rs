//! Notify capability
//!
//! The broker never talks to a subscriber directly: it goes through a
//! [`Notifier`], which owns whatever transport handles are needed and
//! classifies each failure as permanent or transient via [`NotifyError`].

use async_trait::async_trait;

use crate::transport::message::NotifyRequest;
use crate::utils::error::NotifyError;

#[async_trait]
pub trait Notifier: Send + Sync + 'static {
    /// Deliver one notification to the subscriber listening at `address`.
    async fn notify(&self, address: &str, request: &NotifyRequest) -> Result<(), NotifyError>;

    /// Drop any cached handle for `address`. Called after eviction.
    fn forget(&self, _address: &str) {}
}
