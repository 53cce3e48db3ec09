use serenity::builder::ExecuteWebhook;
use serenity::http::Http;
use serenity::model::webhook::Webhook;
use tracing::debug;

use crate::send::{split_chunks, user_mentions_only};

/// Posts into one channel under arbitrary display names.
pub struct WebhookSender {
    webhook: Webhook,
}

impl WebhookSender {
    /// Look the webhook up once; the result is reused for every post.
    pub async fn connect(http: &Http, url: &str) -> Result<Self, serenity::Error> {
        let webhook = Webhook::from_url(http, url).await?;
        debug!(webhook_id = webhook.id.get(), "Discord: webhook resolved");
        Ok(Self { webhook })
    }

    pub async fn send(&self, http: &Http, username: &str, text: &str) -> Result<(), serenity::Error> {
        for chunk in split_chunks(text) {
            let builder = ExecuteWebhook::new()
                .content(chunk)
                .username(username)
                .allowed_mentions(user_mentions_only());
            self.webhook.execute(http, false, builder).await?;
        }
        Ok(())
    }
}
