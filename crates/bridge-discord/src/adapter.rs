use std::sync::Arc;
use std::time::Duration;

use serenity::cache::Cache;
use serenity::http::Http;
use serenity::model::gateway::GatewayIntents;
use serenity::Client;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use bridge_core::config::DiscordConfig;
use bridge_core::event::DiscordMessage;

use crate::error::DiscordError;
use crate::handler::BridgeHandler;

/// Handles the rest of the bridge needs once the gateway is up.
///
/// `Http` is the REST client and `Cache` the shared guild state; both stay
/// valid until the next reconnect hands over fresh ones.
#[derive(Clone)]
pub struct DiscordSession {
    pub http: Arc<Http>,
    pub cache: Arc<Cache>,
    pub bot_id: u64,
    pub bot_name: String,
}

impl std::fmt::Debug for DiscordSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiscordSession")
            .field("bot_id", &self.bot_id)
            .field("bot_name", &self.bot_name)
            .finish_non_exhaustive()
    }
}

/// What the Discord side reports to the relay loop.
#[derive(Debug)]
pub enum DiscordEvent {
    Ready(DiscordSession),
    Message(DiscordMessage),
}

/// Discord gateway adapter.
///
/// Wraps a serenity `Client` and keeps reconnecting whenever the gateway
/// drops. Events are pushed into the relay loop's queue.
pub struct DiscordAdapter {
    config: DiscordConfig,
    events: mpsc::Sender<DiscordEvent>,
}

impl DiscordAdapter {
    pub fn new(config: &DiscordConfig, events: mpsc::Sender<DiscordEvent>) -> Self {
        Self {
            config: config.clone(),
            events,
        }
    }

    /// Gateway intents the bridge relies on: guild state and member lists
    /// for name lookups, plus message content for relaying.
    pub fn intents() -> GatewayIntents {
        GatewayIntents::GUILDS
            | GatewayIntents::GUILD_MEMBERS
            | GatewayIntents::GUILD_MESSAGES
            | GatewayIntents::MESSAGE_CONTENT
    }

    /// Connect and keep reconnecting until the relay loop goes away.
    pub async fn run(self) -> Result<(), DiscordError> {
        if self.config.token.trim().is_empty() {
            return Err(DiscordError::NoToken);
        }

        loop {
            let mut client = loop {
                match self.build_client().await {
                    Ok(c) => break c,
                    Err(e) => {
                        error!("Discord: connect failed ({e}), retrying in 30s");
                        tokio::time::sleep(Duration::from_secs(30)).await;
                    }
                }
            };

            info!("Discord: gateway connecting");

            if let Err(e) = client.start().await {
                warn!("Discord: gateway error ({e}), reconnecting in 5s");
            } else {
                info!("Discord: gateway stopped cleanly, reconnecting in 5s");
            }

            if self.events.is_closed() {
                info!("Discord: event receiver closed, stopping");
                return Ok(());
            }

            tokio::time::sleep(Duration::from_secs(5)).await;
        }
    }

    async fn build_client(&self) -> Result<Client, serenity::Error> {
        let handler = BridgeHandler {
            events: self.events.clone(),
        };

        Client::builder(&self.config.token, Self::intents())
            .event_handler(handler)
            .await
    }
}
