use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use messaging_provider::{
    ChannelCatalog, FactoryRegistry, Headers, InMemoryMessagingFactory, MessageReceiver,
    MessagingProvider, RoutingInfo,
};
use serde_json::json;
use tracing::info;

/// Sends one message through the in-memory factory and loops it back to a
/// listener, printing what happens along the way.
#[derive(Parser, Debug)]
#[command(name = "messaging-demo")]
struct Args {
    /// Channel from MESSAGING_CHANNELS / MESSAGING_CHANNELS_PATH. Overrides
    /// the AMQP flags below.
    #[arg(long)]
    channel: Option<String>,
    #[arg(long, default_value = "messaging.alvin-portal.org")]
    hostname: String,
    #[arg(long, default_value_t = 5672)]
    port: u16,
    #[arg(long, default_value = "alvin")]
    virtual_host: String,
    #[arg(long, default_value = "index")]
    exchange: String,
    #[arg(long, default_value = "alvin.updates.#")]
    routing_key: String,
    #[arg(long, default_value = "hello world")]
    message: String,
}

struct PrintingReceiver;

impl MessageReceiver for PrintingReceiver {
    fn receive_message(&self, headers: &HashMap<String, String>, body: &str) {
        println!("IN  {headers:?}: {body}");
    }

    fn topic_closed(&self) {
        println!("topic closed");
    }
}

fn main() -> Result<()> {
    messaging_telemetry::install_from_env("messaging-demo")?;
    let args = Args::parse();

    let factory = Arc::new(InMemoryMessagingFactory::new());
    let registry = {
        let factory = factory.clone();
        FactoryRegistry::new().with("in-memory", move || factory.clone())?
    };
    let provider = MessagingProvider::new(registry);
    info!(
        messaging_id = provider.messaging_id(),
        factories = ?provider.registry().names().collect::<Vec<_>>(),
        "provider ready"
    );

    let (sender, listener) = match &args.channel {
        Some(channel) => {
            let catalog = ChannelCatalog::from_env().context("loading channel catalog")?;
            (
                provider.channel_sender(&catalog, channel)?,
                provider.channel_listener(&catalog, channel)?,
            )
        }
        None => {
            let routing = Arc::new(RoutingInfo::amqp_sender(
                args.hostname.clone(),
                args.port,
                args.virtual_host.clone(),
                args.exchange.clone(),
                args.routing_key.clone(),
            ));
            let listen_routing = Arc::new(RoutingInfo::amqp_listener_with_binding(
                args.hostname.clone(),
                args.port,
                args.virtual_host.clone(),
                args.exchange.clone(),
                args.routing_key.clone(),
            ));
            (
                provider.topic_message_sender(routing)?,
                provider.topic_message_listener(Some(listen_routing))?,
            )
        }
    };

    listener.listen(Arc::new(PrintingReceiver))?;

    let mut headers = Headers::new();
    headers.insert("messaging_id".into(), json!(provider.messaging_id()));
    sender.send_message(&headers, &args.message)?;

    let loopback = factory
        .last_listener()
        .context("in-memory factory produced no listener")?;
    for sent in factory.senders().iter().flat_map(|sender| sender.sent()) {
        println!("OUT {}: {}", serde_json::to_string(&sent.headers)?, sent.body);
        let headers = sent
            .headers
            .iter()
            .map(|(key, value)| {
                let text = value
                    .as_str()
                    .map(str::to_string)
                    .unwrap_or_else(|| value.to_string());
                (key.clone(), text)
            })
            .collect::<HashMap<_, _>>();
        loopback.deliver(&headers, &sent.body)?;
    }

    loopback.close();
    listener.stop_listening()?;
    Ok(())
}
