//! Subscriber-side notify endpoint.
//!
//! Accepts WebSocket connections from a broker and hands every `notify` frame
//! to a [`NotifyHandler`]. A handler error is reported back as an `error`
//! frame, which the broker treats as an internal fault of this subscriber.

use std::sync::Arc;

use chrono::{Local, Utc};
use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::accept_async;
use tracing::{debug, error, info, warn};
use tungstenite::protocol::Message as WsMessage;

use crate::transport::message::{NotifyCall, NotifyReply, NotifyRequest, NotifyResult};
use crate::utils::error::TransportError;

pub trait NotifyHandler: Send + Sync + 'static {
    fn on_notify(&self, request: &NotifyRequest) -> Result<(), String>;
}

impl<F> NotifyHandler for F
where
    F: Fn(&NotifyRequest) -> Result<(), String> + Send + Sync + 'static,
{
    fn on_notify(&self, request: &NotifyRequest) -> Result<(), String> {
        self(request)
    }
}

/// One display line for a notification.
///
/// Historical messages show the time they were originally published, live
/// ones the time they arrived.
pub fn render(request: &NotifyRequest) -> String {
    if request.is_historical {
        let at = request
            .sent_at
            .map(|t| t.with_timezone(&Local).format("%H:%M:%S").to_string())
            .unwrap_or_else(|| "--:--:--".to_string());
        format!("[history {}] [{}] {}", at, request.topic, request.content)
    } else {
        let at = Utc::now().with_timezone(&Local).format("%H:%M:%S");
        format!("[{}] [{}] {}", at, request.topic, request.content)
    }
}

pub async fn start_notify_server(
    addr: String,
    handler: Arc<dyn NotifyHandler>,
) -> Result<(), TransportError> {
    let listener = TcpListener::bind(&addr).await?;
    info!("Notify endpoint listening on ws://{}", addr);
    serve_notifications(listener, handler).await
}

pub async fn serve_notifications(
    listener: TcpListener,
    handler: Arc<dyn NotifyHandler>,
) -> Result<(), TransportError> {
    loop {
        let (stream, _) = listener.accept().await?;
        let handler = handler.clone();
        tokio::spawn(async move {
            handle_broker_connection(stream, handler).await;
        });
    }
}

async fn handle_broker_connection(stream: TcpStream, handler: Arc<dyn NotifyHandler>) {
    let ws_stream = match accept_async(stream).await {
        Ok(ws) => ws,
        Err(e) => {
            error!("WebSocket handshake error: {}", e);
            return;
        }
    };
    let (mut ws_sender, mut ws_receiver) = ws_stream.split();

    while let Some(Ok(frame)) = ws_receiver.next().await {
        if frame.is_close() {
            break;
        }
        if !frame.is_text() {
            continue;
        }
        let Ok(text) = frame.to_text() else {
            continue;
        };

        let reply = match serde_json::from_str::<NotifyCall>(text) {
            Ok(NotifyCall::Notify(request)) => match handler.on_notify(&request) {
                Ok(()) => NotifyResult::NotifyReply(NotifyReply { is_success: true }),
                Err(message) => NotifyResult::Error { message },
            },
            Err(e) => {
                warn!("Invalid notify frame: {} | {}", e, text);
                NotifyResult::NotifyReply(NotifyReply { is_success: false })
            }
        };

        let json = match serde_json::to_string(&reply) {
            Ok(json) => json,
            Err(e) => {
                error!("Failed to serialize notify reply: {}", e);
                continue;
            }
        };
        if ws_sender.send(WsMessage::text(json)).await.is_err() {
            break;
        }
    }

    debug!("Broker connection closed");
}
