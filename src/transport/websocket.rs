use std::net::SocketAddr;
use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::accept_async;
use tracing::{debug, error, info, warn};
use tungstenite::protocol::Message as WsMessage;

use crate::broker::SubscriptionHandler;
use crate::transport::message::{ClientMessage, ServerMessage};
use crate::utils::error::TransportError;

/// Bind `addr` and serve the broker endpoint until the listener fails.
pub async fn start_websocket_server(
    addr: String,
    handler: Arc<SubscriptionHandler>,
) -> Result<(), TransportError> {
    let listener = TcpListener::bind(&addr).await?;
    info!("Broker listening on ws://{}", addr);
    serve(listener, handler).await
}

/// Accept connections on an already bound listener.
pub async fn serve(
    listener: TcpListener,
    handler: Arc<SubscriptionHandler>,
) -> Result<(), TransportError> {
    loop {
        let (stream, peer) = listener.accept().await?;
        let handler = handler.clone();
        let connection_id = format!("client-{}", uuid::Uuid::new_v4());

        tokio::spawn(async move {
            handle_connection(stream, peer, handler, connection_id).await;
        });
    }
}

async fn handle_connection(
    stream: TcpStream,
    peer: SocketAddr,
    handler: Arc<SubscriptionHandler>,
    connection_id: String,
) {
    let ws_stream = match accept_async(stream).await {
        Ok(ws) => ws,
        Err(e) => {
            error!("WebSocket handshake error from {}: {}", peer, e);
            return;
        }
    };
    debug!("{} connected from {}", connection_id, peer);

    let (mut ws_sender, mut ws_receiver) = ws_stream.split();

    while let Some(frame) = ws_receiver.next().await {
        let frame = match frame {
            Ok(frame) => frame,
            Err(e) => {
                warn!("Read error on {}: {}", connection_id, e);
                break;
            }
        };

        if frame.is_close() {
            break;
        }
        if !frame.is_text() {
            continue;
        }
        let Ok(text) = frame.to_text() else {
            continue;
        };

        let reply = dispatch(&handler, text).await;
        let json = match serde_json::to_string(&reply) {
            Ok(json) => json,
            Err(e) => {
                error!("Failed to serialize reply: {}", e);
                continue;
            }
        };

        if let Err(e) = ws_sender.send(WsMessage::text(json)).await {
            warn!("Failed to reply to {}: {}", connection_id, e);
            break;
        }
    }

    debug!("{} disconnected", connection_id);
}

/// Decode one client frame and run it against the handler.
pub(crate) async fn dispatch(handler: &SubscriptionHandler, text: &str) -> ServerMessage {
    match serde_json::from_str::<ClientMessage>(text) {
        Ok(ClientMessage::Subscribe(request)) => {
            ServerMessage::SubscribeReply(handler.subscribe(&request.address, &request.topic).await)
        }
        Ok(ClientMessage::Publish(request)) => {
            ServerMessage::PublishReply(handler.publish(&request.topic, &request.content))
        }
        Err(err) => {
            warn!("Invalid client message: {} | {}", err, text);
            ServerMessage::Error {
                message: format!("invalid message: {err}"),
            }
        }
    }
}
