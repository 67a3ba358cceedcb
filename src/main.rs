//! CLI for notifysub
//!
//! Subcommands:
//! - `server`: run the broker
//! - `subscriber`: run a console subscriber for one or more topics
//! - `publish`: publish a single message

use std::sync::Arc;

use clap::Parser;
use notifysub::broker::Broker;
use notifysub::client::notify_server::render;
use notifysub::client::{BrokerClient, start_notify_server};
use notifysub::config::load_config;
use notifysub::transport::message::NotifyRequest;
use notifysub::transport::{WsNotifier, start_websocket_server};
use notifysub::utils::logging;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

#[derive(Parser)]
#[command(name = "notifysub")]
enum Command {
    /// Start the broker
    Server,
    /// Listen for notifications and subscribe to topics on a broker
    Subscriber {
        /// Comma separated topics, e.g. "news,sports"
        #[arg(long, default_value = "news")]
        topics: String,
        /// Port of the local notify endpoint
        #[arg(long, default_value_t = 3001)]
        port: u16,
        /// Host the broker should use to reach this subscriber
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
        #[arg(long, default_value = "ws://127.0.0.1:5001")]
        broker: String,
    },
    /// Publish one message
    Publish {
        #[arg(long)]
        topic: String,
        #[arg(long)]
        content: String,
        #[arg(long, default_value = "ws://127.0.0.1:5001")]
        broker: String,
    },
}

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();

    let cmd = Command::parse();

    let result = match cmd {
        Command::Server => run_server().await,
        Command::Subscriber {
            topics,
            port,
            host,
            broker,
        } => {
            logging::init("info");
            run_subscriber(&topics, &host, port, &broker).await
        }
        Command::Publish {
            topic,
            content,
            broker,
        } => {
            logging::init("info");
            run_publish(&broker, &topic, &content).await
        }
    };

    if let Err(e) = result {
        error!("Failed: {}", e);
        std::process::exit(1);
    }
}

async fn run_server() -> Result<(), Box<dyn std::error::Error>> {
    let config = match load_config() {
        Ok(config) => config,
        Err(e) => {
            logging::init("info");
            return Err(e.into());
        }
    };
    logging::init(&config.server.log_level);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let broker = Broker::new(&config.broker, Arc::new(WsNotifier::new()));

    let shutdown = CancellationToken::new();
    let engine = broker.engine.clone().spawn(shutdown.clone());

    tokio::select! {
        res = start_websocket_server(addr, broker.handler.clone()) => {
            if let Err(e) = res {
                error!("Broker server exited: {}", e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received. Exiting gracefully.");
        }
    }

    shutdown.cancel();
    let _ = engine.await;
    broker.registry.log_subscribers();
    info!(
        "Stopped with {} subscriber(s), {} undelivered message(s) and history for {} topic(s)",
        broker.registry.count(),
        broker.store.queue_len(),
        broker.store.topic_count()
    );

    Ok(())
}

async fn run_subscriber(
    topics: &str,
    host: &str,
    port: u16,
    broker_url: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let topics: Vec<String> = topics
        .split(',')
        .map(|t| t.trim().to_lowercase())
        .filter(|t| !t.is_empty())
        .collect();
    if topics.is_empty() {
        return Err("at least one topic is required".into());
    }

    let address = format!("ws://{host}:{port}");
    let server = tokio::spawn(start_notify_server(
        format!("0.0.0.0:{port}"),
        Arc::new(|req: &NotifyRequest| -> Result<(), String> {
            println!("{}", render(req));
            Ok(())
        }),
    ));

    let mut client = BrokerClient::connect(broker_url).await?;
    for topic in &topics {
        let reply = client.subscribe(&address, topic).await?;
        if reply.is_success {
            info!("Subscribed to {}", topic);
        } else {
            warn!("Broker rejected subscription to {}", topic);
        }
    }
    info!("Listening on {} for: {}", address, topics.join(", "));

    tokio::select! {
        res = server => {
            match res {
                Ok(Err(e)) => return Err(e.into()),
                Err(e) => return Err(e.into()),
                Ok(Ok(())) => {}
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Shutting down subscriber");
        }
    }

    Ok(())
}

async fn run_publish(
    broker_url: &str,
    topic: &str,
    content: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut client = BrokerClient::connect(broker_url).await?;
    let reply = client.publish(topic, content).await?;
    if !reply.is_success {
        return Err(format!("broker rejected message for topic '{topic}'").into());
    }
    info!("Published to {} (sequence {:?})", topic, reply.sequence);
    client.close().await?;
    Ok(())
}
