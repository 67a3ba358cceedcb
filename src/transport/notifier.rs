//! WebSocket implementation of the notify capability.
//!
//! One connection is kept per subscriber address and reused across calls.
//! Calls to the same address are serialized; calls to different addresses run
//! independently. A connection is taken out of its slot for the duration of a
//! call and only put back after a clean reply, so a failed or cancelled call
//! never leaves a half-read connection behind. A slot left without a
//! connection is dropped from the map.

use std::collections::HashMap;
use std::io::ErrorKind;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::Mutex as AsyncMutex;
use tokio_tungstenite::connect_async;
use tracing::debug;

use crate::broker::notifier::Notifier;
use crate::transport::message::{NotifyCall, NotifyRequest, NotifyResult};
use crate::transport::rpc::{self, WsStream};
use crate::utils::error::NotifyError;

type Slot = Arc<AsyncMutex<Option<WsStream>>>;

#[derive(Default)]
pub struct WsNotifier {
    connections: Mutex<HashMap<String, Slot>>,
}

impl WsNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, address: &str) -> Slot {
        let mut connections = self.connections.lock().unwrap_or_else(|p| p.into_inner());
        connections.entry(address.to_string()).or_default().clone()
    }

    /// Drops the map entry for `address` if it is still `slot`. Called when
    /// the slot has no stream to keep.
    fn release(&self, address: &str, slot: &Slot) {
        let mut connections = self.connections.lock().unwrap_or_else(|p| p.into_inner());
        if connections
            .get(address)
            .is_some_and(|current| Arc::ptr_eq(current, slot))
        {
            connections.remove(address);
        }
    }

    pub fn cached_connections(&self) -> usize {
        self.connections
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .len()
    }

    async fn connect(address: &str) -> Result<WsStream, NotifyError> {
        let url = rpc::endpoint_url(address);
        debug!(address, "Opening notify connection to {}", url);
        connect_async(url.as_str())
            .await
            .map(|(stream, _response)| stream)
            .map_err(|e| classify_connect(address, e))
    }
}

#[async_trait]
impl Notifier for WsNotifier {
    async fn notify(&self, address: &str, request: &NotifyRequest) -> Result<(), NotifyError> {
        let slot = self.slot(address);
        let mut cached = slot.lock().await;

        let mut stream = match cached.take() {
            Some(stream) => stream,
            None => match Self::connect(address).await {
                Ok(stream) => stream,
                Err(e) => {
                    self.release(address, &slot);
                    return Err(e);
                }
            },
        };

        let call = NotifyCall::Notify(request.clone());
        let result = match rpc::call::<_, NotifyResult>(&mut stream, &call).await {
            Ok(result) => result,
            Err(e) => {
                self.release(address, &slot);
                return Err(NotifyError::Network {
                    address: address.to_string(),
                    reason: e.to_string(),
                });
            }
        };

        // the connection is healthy again, whatever the answer was
        *cached = Some(stream);

        match result {
            NotifyResult::NotifyReply(reply) if reply.is_success => Ok(()),
            NotifyResult::NotifyReply(_) => Err(NotifyError::Declined {
                address: address.to_string(),
            }),
            NotifyResult::Error { message } => Err(NotifyError::Internal {
                address: address.to_string(),
                reason: message,
            }),
        }
    }

    fn forget(&self, address: &str) {
        self.connections
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .remove(address);
    }
}

fn classify_connect(address: &str, err: tungstenite::Error) -> NotifyError {
    let address = address.to_string();
    match err {
        tungstenite::Error::Io(ref io)
            if matches!(
                io.kind(),
                ErrorKind::ConnectionRefused
                    | ErrorKind::AddrNotAvailable
                    | ErrorKind::NotFound
                    | ErrorKind::InvalidInput
            ) =>
        {
            NotifyError::Unreachable {
                address,
                reason: err.to_string(),
            }
        }
        tungstenite::Error::Url(_) | tungstenite::Error::Http(_) => NotifyError::Unreachable {
            address,
            reason: err.to_string(),
        },
        other => NotifyError::Network {
            address,
            reason: other.to_string(),
        },
    }
}
