use serenity::async_trait;
use serenity::model::channel::Message;
use serenity::model::gateway::Ready;
use serenity::prelude::{Context, EventHandler};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use bridge_core::event::{DiscordAuthor, DiscordMessage};

use crate::adapter::{DiscordEvent, DiscordSession};

/// Serenity event handler that feeds the relay loop.
pub struct BridgeHandler {
    pub events: mpsc::Sender<DiscordEvent>,
}

#[async_trait]
impl EventHandler for BridgeHandler {
    async fn ready(&self, ctx: Context, ready: Ready) {
        info!(name = %ready.user.name, guilds = ready.guilds.len(), "Discord bot connected");

        let session = DiscordSession {
            http: ctx.http.clone(),
            cache: ctx.cache.clone(),
            bot_id: ready.user.id.get(),
            bot_name: ready.user.name.clone(),
        };
        if self.events.send(DiscordEvent::Ready(session)).await.is_err() {
            warn!("Discord: relay loop gone, ready event dropped");
        }
    }

    async fn message(&self, ctx: Context, msg: Message) {
        let channel_name = msg.guild_id.and_then(|gid| {
            ctx.cache
                .guild(gid)
                .and_then(|g| g.channels.get(&msg.channel_id).map(|c| c.name.clone()))
        });

        let converted = convert(&msg, channel_name);
        debug!(
            channel = msg.channel_id.get(),
            author = %converted.author.username,
            "Discord: message received"
        );

        if self.events.send(DiscordEvent::Message(converted)).await.is_err() {
            warn!("Discord: relay loop gone, message dropped");
        }
    }
}

/// Flatten a serenity message into the relay's view of it.
///
/// The display name prefers the guild nickname, then the global display
/// name, then the account name.
fn convert(msg: &Message, channel_name: Option<String>) -> DiscordMessage {
    let display_name = msg
        .member
        .as_ref()
        .and_then(|m| m.nick.clone())
        .or_else(|| msg.author.global_name.clone())
        .unwrap_or_else(|| msg.author.name.clone());

    DiscordMessage {
        author: DiscordAuthor {
            id: msg.author.id.get(),
            username: msg.author.name.clone(),
            display_name,
            bot: msg.author.bot,
            webhook: msg.webhook_id.is_some(),
        },
        channel_id: msg.channel_id.get(),
        channel_name,
        guild_id: msg.guild_id.map(|g| g.get()),
        content: msg.content.clone(),
        attachments: msg.attachments.iter().map(|a| a.url.clone()).collect(),
    }
}
