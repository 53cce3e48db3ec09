//! Outbound Discord delivery: posts produced by the relay go out here.

use std::collections::HashMap;

use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use bridge_core::event::{Delivery, DiscordPost};

use crate::adapter::DiscordSession;
use crate::directory::resolve_channel;
use crate::error::DiscordError;
use crate::webhook::WebhookSender;

/// Background task that receives relay posts and delivers them to Discord.
///
/// Posts are sent one at a time so per-channel order is kept. Failures are
/// logged and the post is dropped. Posts arriving before the first ready
/// event are dropped too.
pub async fn run_delivery(
    mut rx: mpsc::Receiver<DiscordPost>,
    session: watch::Receiver<Option<DiscordSession>>,
) {
    let mut webhooks: HashMap<String, WebhookSender> = HashMap::new();

    while let Some(post) = rx.recv().await {
        let Some(current) = session.borrow().clone() else {
            debug!(channel = %post.channel, "discord delivery: not ready, dropping post");
            continue;
        };

        if let Err(e) = deliver(&current, &mut webhooks, &post).await {
            warn!(channel = %post.channel, error = %e, "discord delivery FAILED");
        }
    }

    info!("discord delivery task exiting (channel closed)");
}

async fn deliver(
    session: &DiscordSession,
    webhooks: &mut HashMap<String, WebhookSender>,
    post: &DiscordPost,
) -> Result<(), DiscordError> {
    match &post.delivery {
        Delivery::Plain { content } => {
            let (_, channel_id) = resolve_channel(&session.cache, &post.channel)
                .ok_or_else(|| DiscordError::UnknownChannel(post.channel.clone()))?;
            crate::send::send_chunked(&session.http, channel_id, content).await?;
        }
        Delivery::Impersonated {
            credential,
            username,
            content,
        } => {
            if !webhooks.contains_key(credential) {
                let sender = WebhookSender::connect(&session.http, credential).await?;
                webhooks.insert(credential.clone(), sender);
            }
            if let Some(sender) = webhooks.get(credential) {
                sender.send(&session.http, username, content).await?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn exits_when_relay_drops_the_queue() {
        let (tx, rx) = mpsc::channel(4);
        let (_session_tx, session_rx) = watch::channel(None);

        tx.send(DiscordPost {
            channel: "#general".into(),
            delivery: Delivery::Plain {
                content: "dropped before ready".into(),
            },
        })
        .await
        .unwrap();
        drop(tx);

        tokio::time::timeout(std::time::Duration::from_secs(1), run_delivery(rx, session_rx))
            .await
            .expect("delivery task should finish once the queue closes");
    }
}
