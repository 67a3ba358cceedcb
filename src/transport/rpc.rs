//! Request/response over a WebSocket: one JSON text frame out, one back.

use futures_util::{SinkExt, StreamExt};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::net::TcpStream;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tungstenite::protocol::Message as WsMessage;

use crate::utils::error::TransportError;

pub type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Turn a subscriber address into a WebSocket URL.
///
/// Plain `host:port` gets a `ws://` scheme and `http(s)://` is mapped to
/// `ws(s)://`, so addresses written for HTTP-based transports keep working.
pub fn endpoint_url(address: &str) -> String {
    if let Some(rest) = address.strip_prefix("http://") {
        format!("ws://{rest}")
    } else if let Some(rest) = address.strip_prefix("https://") {
        format!("wss://{rest}")
    } else if address.contains("://") {
        address.to_string()
    } else {
        format!("ws://{address}")
    }
}

/// Send `request` and wait for the next text frame, decoded as `Resp`.
pub async fn call<Req, Resp>(stream: &mut WsStream, request: &Req) -> Result<Resp, TransportError>
where
    Req: Serialize,
    Resp: DeserializeOwned,
{
    let json = serde_json::to_string(request)?;
    stream.send(WsMessage::text(json)).await?;

    while let Some(frame) = stream.next().await {
        match frame? {
            WsMessage::Text(text) => return Ok(serde_json::from_str(&text)?),
            WsMessage::Close(_) => return Err(TransportError::Closed),
            WsMessage::Binary(_) => {
                return Err(TransportError::UnexpectedReply("binary frame".to_string()));
            }
            // control frames are answered by tungstenite itself
            _ => continue,
        }
    }

    Err(TransportError::Closed)
}
