//! # notifysub
//!
//! `notifysub` is a minimal, in-memory publish/subscribe broker. Subscribers
//! register an address and a topic; the broker pushes every message published
//! on that topic to each registered address, and replays the most recent
//! history to subscribers that join late.
//!
//! ## Core Modules
//!
//! - `broker`: subscriber registry, message store, delivery engine and
//!   subscription handler.
//! - `transport`: the RPC frames and their WebSocket server/notifier.
//! - `client`: broker client and the subscriber-side notify endpoint.
//! - `config`: loading and merging server and broker configuration.
//! - `utils`: error types and logging setup.
//!
//! All state is memory resident and lost when the process exits.

pub mod broker;
pub mod client;
pub mod config;
pub mod transport;
pub mod utils;
