//! The `client` module holds everything that runs on the far side of the
//! broker's RPC boundary.
//!
//! - `BrokerClient` calls `subscribe` and `publish` on a broker.
//! - `notify_server` is the endpoint a subscriber exposes so the broker can
//!   push notifications to it.

pub mod broker_client;
pub mod notify_server;

pub use broker_client::BrokerClient;
pub use notify_server::{NotifyHandler, serve_notifications, start_notify_server};
