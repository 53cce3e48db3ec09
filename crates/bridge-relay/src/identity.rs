use std::collections::{BTreeMap, HashMap};

use bridge_core::event::{Delivery, DiscordPost};

/// Discord rejects webhook usernames longer than this.
const WEBHOOK_NAME_MAX: usize = 80;

/// Picks how a message reaches a Discord channel.
///
/// Channels with a configured webhook get the message under a custom display
/// name; every other channel gets it from the bot account with the author
/// rendered in bold. The destination is never changed here.
#[derive(Debug, Clone, Default)]
pub struct IdentityRenderer {
    webhooks: HashMap<String, String>,
}

impl IdentityRenderer {
    pub fn new(webhooks: &BTreeMap<String, String>) -> Self {
        Self {
            webhooks: webhooks
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        }
    }

    pub fn has_identity(&self, destination: &str) -> bool {
        self.webhooks.contains_key(destination)
    }

    pub fn render(&self, destination: &str, author: Option<&str>, text: &str) -> DiscordPost {
        let delivery = match self.webhooks.get(destination) {
            Some(credential) => {
                let username = match author {
                    Some(author) => format!("{destination} | {author}"),
                    None => destination.to_string(),
                };
                Delivery::Impersonated {
                    credential: credential.clone(),
                    username: truncate_chars(&username, WEBHOOK_NAME_MAX),
                    content: text.to_string(),
                }
            }
            None => Delivery::Plain {
                content: match author {
                    Some(author) => format!("{destination} **{author}** {text}"),
                    None => format!("{destination} {text}"),
                },
            },
        };

        DiscordPost {
            channel: destination.to_string(),
            delivery,
        }
    }
}

fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn renderer() -> IdentityRenderer {
        let mut table = BTreeMap::new();
        table.insert(
            "#hooked".to_string(),
            "https://discord.com/api/webhooks/1/abc".to_string(),
        );
        IdentityRenderer::new(&table)
    }

    #[test]
    fn webhook_channel_uses_custom_name_without_bold() {
        let post = renderer().render("#hooked", Some("alice"), "hello");
        assert_eq!(post.channel, "#hooked");
        match post.delivery {
            Delivery::Impersonated {
                credential,
                username,
                content,
            } => {
                assert_eq!(credential, "https://discord.com/api/webhooks/1/abc");
                assert_eq!(username, "#hooked | alice");
                assert_eq!(content, "hello");
            }
            other => panic!("expected impersonated delivery, got {other:?}"),
        }
    }

    #[test]
    fn webhook_without_author_uses_bare_destination() {
        let post = renderer().render("#hooked", None, "*bob has joined*");
        assert!(matches!(
            post.delivery,
            Delivery::Impersonated { ref username, .. } if username == "#hooked"
        ));
    }

    #[test]
    fn plain_channel_renders_bold_author() {
        let post = renderer().render("#plain", Some("alice"), "hello");
        assert_eq!(
            post.delivery,
            Delivery::Plain {
                content: "#plain **alice** hello".to_string()
            }
        );

        let post = renderer().render("#plain", None, "*bob has left*");
        assert_eq!(post.delivery.content(), "#plain *bob has left*");
    }

    #[test]
    fn long_webhook_names_are_truncated() {
        let author = "n".repeat(200);
        let post = renderer().render("#hooked", Some(&author), "x");
        let Delivery::Impersonated { username, .. } = post.delivery else {
            panic!("expected impersonated delivery");
        };
        assert_eq!(username.chars().count(), WEBHOOK_NAME_MAX);
    }
}
