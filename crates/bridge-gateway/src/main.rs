use clap::Parser;
use tokio::sync::{mpsc, watch};
use tracing::{error, info};

mod bridge;

use bridge_core::BridgeConfig;
use bridge_discord::DiscordAdapter;
use bridge_irc::IrcClient;
use bridge_relay::RelayCore;

use crate::bridge::Bridge;

const DEFAULT_LOG_FILTER: &str =
    "chatbridge=info,bridge_relay=info,bridge_irc=info,bridge_discord=info,serenity=warn";

/// Queue depth for each inbound and outbound event stream.
const EVENT_QUEUE: usize = 256;

/// Relay chat between IRC channels and Discord channels.
#[derive(Parser)]
#[command(name = "chatbridge")]
#[command(version)]
struct Args {
    /// Configuration file path
    #[arg(short, long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()),
        )
        .init();

    let args = Args::parse();

    // load config: --config > CHATBRIDGE_CONFIG env > ~/.chatbridge/chatbridge.toml
    let config_path = args
        .config
        .or_else(|| std::env::var("CHATBRIDGE_CONFIG").ok());
    let config = match BridgeConfig::load(config_path.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            error!(code = e.code(), "invalid configuration: {e}");
            std::process::exit(1);
        }
    };

    let relay = RelayCore::from_config(&config)?;
    info!(
        channels = relay.mapping().entries().len(),
        nick = %relay.nickname(),
        "relay configured"
    );

    let (irc_events_tx, irc_events_rx) = mpsc::channel(EVENT_QUEUE);
    let (discord_events_tx, discord_events_rx) = mpsc::channel(EVENT_QUEUE);
    let (posts_tx, posts_rx) = mpsc::channel(EVENT_QUEUE);
    let (session_tx, session_rx) = watch::channel(None);

    let (irc_client, irc) = IrcClient::new(&config.irc, irc_events_tx);
    tokio::spawn(irc_client.run());

    let adapter = DiscordAdapter::new(&config.discord, discord_events_tx);
    tokio::spawn(async move {
        if let Err(e) = adapter.run().await {
            error!(error = %e, "Discord adapter stopped");
        }
    });

    tokio::spawn(bridge_discord::run_delivery(posts_rx, session_rx));

    Bridge::new(relay, irc, posts_tx, session_tx)
        .run(irc_events_rx, discord_events_rx)
        .await;

    info!("chatbridge stopped");
    Ok(())
}
