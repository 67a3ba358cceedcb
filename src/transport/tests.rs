use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use super::message::{ClientMessage, NotifyRequest, ServerMessage};
use super::notifier::WsNotifier;
use super::rpc::endpoint_url;
use super::websocket::{dispatch, serve};
use crate::broker::notifier::Notifier;
use crate::broker::{Broker, SubscriptionHandler};
use crate::client::{BrokerClient, serve_notifications};
use crate::config::Settings;
use crate::utils::error::NotifyError;

fn test_settings() -> Settings {
    let mut settings = Settings::default();
    settings.broker.replay_pacing_ms = 1;
    settings.broker.notify_timeout_ms = 2000;
    settings
}

fn test_broker() -> Broker {
    Broker::new(&test_settings().broker, Arc::new(WsNotifier::new()))
}

/// Spawn a notify endpoint that forwards every notification to a channel.
async fn spawn_subscriber() -> (String, mpsc::UnboundedReceiver<NotifyRequest>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = format!("ws://{}", listener.local_addr().unwrap());
    let (tx, rx) = mpsc::unbounded_channel();

    tokio::spawn(serve_notifications(
        listener,
        Arc::new(move |req: &NotifyRequest| {
            tx.send(req.clone()).map_err(|e| e.to_string())
        }),
    ));

    (address, rx)
}

/// Spawn a notify endpoint whose handler always fails.
async fn spawn_faulty_subscriber() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = format!("ws://{}", listener.local_addr().unwrap());
    tokio::spawn(serve_notifications(
        listener,
        Arc::new(|_: &NotifyRequest| -> Result<(), String> {
            Err("display crashed".to_string())
        }),
    ));
    address
}

/// Spawn a notify endpoint that completes the handshake and hangs up.
async fn spawn_hangup_subscriber() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = format!("ws://{}", listener.local_addr().unwrap());
    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            if let Ok(ws) = tokio_tungstenite::accept_async(stream).await {
                drop(ws);
            }
        }
    });
    address
}

async fn spawn_broker(handler: Arc<SubscriptionHandler>) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("ws://{}", listener.local_addr().unwrap());
    tokio::spawn(serve(listener, handler));
    url
}

/// An address nobody listens on.
async fn dead_address() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = format!("ws://{}", listener.local_addr().unwrap());
    drop(listener);
    address
}

fn live(topic: &str, content: &str) -> NotifyRequest {
    NotifyRequest {
        content: content.to_string(),
        topic: topic.to_string(),
        is_historical: false,
        sent_at: None,
    }
}

async fn recv(rx: &mut mpsc::UnboundedReceiver<NotifyRequest>) -> NotifyRequest {
    tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("notification did not arrive")
        .expect("channel closed")
}

#[test]
fn test_client_frames_use_type_tag() {
    let subscribe = json!({
        "type": "subscribe",
        "address": "ws://127.0.0.1:3001",
        "topic": "news"
    })
    .to_string();
    match serde_json::from_str::<ClientMessage>(&subscribe).unwrap() {
        ClientMessage::Subscribe(req) => {
            assert_eq!(req.address, "ws://127.0.0.1:3001");
            assert_eq!(req.topic, "news");
        }
        other => panic!("Expected subscribe, got {other:?}"),
    }

    let reply = serde_json::to_value(ServerMessage::SubscribeReply(
        super::message::SubscribeReply { is_success: true },
    ))
    .unwrap();
    assert_eq!(reply, json!({ "type": "subscribe_reply", "is_success": true }));
}

#[test]
fn test_notify_request_defaults_to_live() {
    let req: NotifyRequest =
        serde_json::from_value(json!({ "content": "hi", "topic": "news" })).unwrap();
    assert!(!req.is_historical);
    assert!(req.sent_at.is_none());
}

#[test]
fn test_endpoint_url_mapping() {
    assert_eq!(endpoint_url("127.0.0.1:3001"), "ws://127.0.0.1:3001");
    assert_eq!(endpoint_url("http://localhost:3001"), "ws://localhost:3001");
    assert_eq!(endpoint_url("https://example.com"), "wss://example.com");
    assert_eq!(endpoint_url("ws://localhost:3001"), "ws://localhost:3001");
}

#[tokio::test]
async fn test_dispatch_subscribe_and_publish() {
    let broker = test_broker();

    let msg = json!({ "type": "publish", "topic": "News", "content": "hello" }).to_string();
    match dispatch(&broker.handler, &msg).await {
        ServerMessage::PublishReply(reply) => {
            assert!(reply.is_success);
            assert_eq!(reply.sequence, Some(0));
        }
        other => panic!("Expected publish reply, got {other:?}"),
    }
    assert_eq!(broker.store.history_for_topic("news").len(), 1);

    // nothing to replay for this topic, so the dead address is never dialled
    let address = dead_address().await;
    let msg = json!({ "type": "subscribe", "address": address, "topic": "other" }).to_string();
    match dispatch(&broker.handler, &msg).await {
        ServerMessage::SubscribeReply(reply) => assert!(reply.is_success),
        other => panic!("Expected subscribe reply, got {other:?}"),
    }
    assert_eq!(broker.registry.count(), 1);
}

#[tokio::test]
async fn test_dispatch_invalid_frame_returns_error() {
    let broker = test_broker();
    match dispatch(&broker.handler, "{\"type\":\"bogus\"}").await {
        ServerMessage::Error { message } => assert!(message.starts_with("invalid message")),
        other => panic!("Expected error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_ws_notifier_delivers_and_reuses_connection() {
    let (address, mut rx) = spawn_subscriber().await;
    let notifier = WsNotifier::new();

    notifier.notify(&address, &live("news", "one")).await.unwrap();
    notifier.notify(&address, &live("news", "two")).await.unwrap();

    assert_eq!(recv(&mut rx).await.content, "one");
    assert_eq!(recv(&mut rx).await.content, "two");
    assert_eq!(notifier.cached_connections(), 1);

    notifier.forget(&address);
    assert_eq!(notifier.cached_connections(), 0);
}

#[tokio::test]
async fn test_ws_notifier_refused_connection_is_permanent() {
    let address = dead_address().await;
    let err = WsNotifier::new()
        .notify(&address, &live("news", "one"))
        .await
        .unwrap_err();
    assert!(matches!(err, NotifyError::Unreachable { .. }));
    assert!(err.is_permanent());
}

#[tokio::test]
async fn test_ws_notifier_drops_slot_after_failed_connect() {
    let address = dead_address().await;
    let notifier = WsNotifier::new();
    for _ in 0..3 {
        assert!(notifier.notify(&address, &live("news", "one")).await.is_err());
    }
    assert_eq!(notifier.cached_connections(), 0);
}

#[tokio::test]
async fn test_ws_notifier_hangup_mid_call_is_transient() {
    let address = spawn_hangup_subscriber().await;
    let notifier = WsNotifier::new();
    let err = notifier
        .notify(&address, &live("news", "one"))
        .await
        .unwrap_err();
    assert!(matches!(err, NotifyError::Network { .. }));
    assert!(!err.is_permanent());
    assert_eq!(notifier.cached_connections(), 0);
}

#[tokio::test]
async fn test_ws_notifier_remote_fault_is_permanent() {
    let address = spawn_faulty_subscriber().await;
    let err = WsNotifier::new()
        .notify(&address, &live("news", "one"))
        .await
        .unwrap_err();
    match err {
        NotifyError::Internal { reason, .. } => assert_eq!(reason, "display crashed"),
        other => panic!("Expected internal fault, got {other:?}"),
    }
}

#[tokio::test]
async fn test_end_to_end_replay_then_live_delivery() {
    let broker = test_broker();
    let url = spawn_broker(broker.handler.clone()).await;
    let (address, mut rx) = spawn_subscriber().await;

    let mut publisher = BrokerClient::connect(&url).await.unwrap();
    for content in ["A", "B"] {
        assert!(publisher.publish("sports", content).await.unwrap().is_success);
    }
    assert!(publisher.publish("news", "other").await.unwrap().is_success);

    // drain what was published before anybody subscribed
    while broker.engine.tick().await.is_some() {}

    let mut subscriber = BrokerClient::connect(&url).await.unwrap();
    let reply = subscriber.subscribe(&address, "sports").await.unwrap();
    assert!(reply.is_success);

    let first = recv(&mut rx).await;
    let second = recv(&mut rx).await;
    assert_eq!((first.content.as_str(), second.content.as_str()), ("A", "B"));
    assert!(first.is_historical && second.is_historical);
    assert!(first.sent_at.is_some());

    assert!(publisher.publish("sports", "C").await.unwrap().is_success);
    let report = broker.engine.tick().await.unwrap();
    assert_eq!(report.delivered, vec![address.clone()]);

    let live = recv(&mut rx).await;
    assert_eq!(live.content, "C");
    assert!(!live.is_historical);

    publisher.close().await.unwrap();
}

#[tokio::test]
async fn test_end_to_end_dead_subscriber_is_evicted() {
    let broker = test_broker();
    let (alive, mut rx) = spawn_subscriber().await;
    let dead = dead_address().await;

    broker.handler.subscribe(&alive, "news").await;
    broker.handler.subscribe(&dead, "news").await;
    assert_eq!(broker.registry.count(), 2);

    broker.handler.publish("news", "hello");
    let report = broker.engine.tick().await.unwrap();

    assert_eq!(report.delivered, vec![alive.clone()]);
    assert_eq!(report.evicted, vec![dead]);
    assert_eq!(broker.registry.count(), 1);
    assert_eq!(recv(&mut rx).await.content, "hello");
}
