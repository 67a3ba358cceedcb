//! The `transport` module carries the broker's RPC contract over WebSockets.
//!
//! It defines the frames exchanged between clients, the broker and
//! subscribers, the broker's WebSocket server, and the WebSocket notifier the
//! delivery engine uses to reach subscribers.

pub mod message;
pub mod notifier;
pub mod rpc;
pub mod websocket;

pub use notifier::WsNotifier;
pub use websocket::{serve, start_websocket_server};

#[cfg(test)]
mod tests;
