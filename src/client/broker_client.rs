use tokio_tungstenite::connect_async;

use crate::transport::message::{
    ClientMessage, PublishReply, PublishRequest, ServerMessage, SubscribeReply, SubscribeRequest,
};
use crate::transport::rpc::{self, WsStream};
use crate::utils::error::TransportError;

/// Connection to a broker endpoint, used by publishers and subscribers.
///
/// Calls are strictly request/response; the broker answers every frame.
pub struct BrokerClient {
    stream: WsStream,
}

impl BrokerClient {
    pub async fn connect(url: &str) -> Result<Self, TransportError> {
        let (stream, _response) = connect_async(rpc::endpoint_url(url).as_str()).await?;
        Ok(Self { stream })
    }

    /// Ask the broker to notify `address` about `topic`.
    ///
    /// The broker replays recent history to `address` before it answers, so
    /// the notify endpoint must already be listening.
    pub async fn subscribe(
        &mut self,
        address: &str,
        topic: &str,
    ) -> Result<SubscribeReply, TransportError> {
        let request = ClientMessage::Subscribe(SubscribeRequest {
            address: address.to_string(),
            topic: topic.to_string(),
        });
        match rpc::call(&mut self.stream, &request).await? {
            ServerMessage::SubscribeReply(reply) => Ok(reply),
            other => Err(unexpected(other)),
        }
    }

    pub async fn publish(
        &mut self,
        topic: &str,
        content: &str,
    ) -> Result<PublishReply, TransportError> {
        let request = ClientMessage::Publish(PublishRequest {
            topic: topic.to_string(),
            content: content.to_string(),
        });
        match rpc::call(&mut self.stream, &request).await? {
            ServerMessage::PublishReply(reply) => Ok(reply),
            other => Err(unexpected(other)),
        }
    }

    pub async fn close(mut self) -> Result<(), TransportError> {
        self.stream.close(None).await?;
        Ok(())
    }
}

fn unexpected(reply: ServerMessage) -> TransportError {
    match reply {
        ServerMessage::Error { message } => TransportError::Remote(message),
        other => TransportError::UnexpectedReply(format!("{other:?}")),
    }
}
