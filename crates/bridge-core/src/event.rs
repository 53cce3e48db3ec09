//! Event and action vocabulary shared by the transports and the relay.
//!
//! Transports translate their wire events into these closed enums; the relay
//! turns them into [`Action`]s that the opposite transport executes.

/// Everything the IRC transport reports to the relay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IrcEvent {
    /// Registration completed (001 received) under `nick`.
    Connected { nick: String },
    Message {
        channel: String,
        nick: String,
        text: String,
    },
    Notice {
        channel: String,
        nick: String,
        text: String,
    },
    /// CTCP ACTION (`/me`).
    Action {
        channel: String,
        nick: String,
        text: String,
    },
    /// Complete NAMES list for a channel, mode prefixes stripped.
    Names { channel: String, nicks: Vec<String> },
    /// Topic reply (332) or a live topic change (`nick` set).
    Topic {
        channel: String,
        topic: String,
        nick: Option<String>,
    },
    /// CTCP reply received in a NOTICE, e.g. `VERSION HexChat 2.16`.
    Ctcp {
        from: String,
        to: String,
        kind: String,
        text: String,
    },
    Join { channel: String, nick: String },
    Part {
        channel: String,
        nick: String,
        reason: Option<String>,
    },
    /// `channels` lists every channel the peer shared with the bridge.
    Quit {
        nick: String,
        reason: Option<String>,
        channels: Vec<String>,
    },
    Kick {
        channel: String,
        nick: String,
        by: String,
        reason: Option<String>,
    },
    Kill {
        nick: String,
        reason: Option<String>,
        channels: Vec<String>,
    },
    Nick {
        old: String,
        new: String,
        channels: Vec<String>,
    },
    Invite { channel: String, by: String },
    /// Transport-level failure; informational only.
    Error(String),
}

/// A chat message read from Discord.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscordMessage {
    pub author: DiscordAuthor,
    pub channel_id: u64,
    /// Channel name without the leading `#`, when known.
    pub channel_name: Option<String>,
    pub guild_id: Option<u64>,
    pub content: String,
    /// Attachment URLs in message order.
    pub attachments: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscordAuthor {
    pub id: u64,
    pub username: String,
    /// Guild nickname, else global display name, else username.
    pub display_name: String,
    /// Bot account flag.
    pub bot: bool,
    /// Message was posted through a webhook.
    pub webhook: bool,
}

impl DiscordMessage {
    /// Candidate mapping keys for this message's channel: `#name` first, then the id.
    pub fn channel_keys(&self) -> Vec<String> {
        let mut keys = Vec::with_capacity(2);
        if let Some(name) = &self.channel_name {
            keys.push(format!("#{name}"));
        }
        keys.push(self.channel_id.to_string());
        keys
    }
}

/// Output of the relay: one side effect on one transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Irc(IrcCommand),
    Discord(DiscordPost),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IrcCommand {
    /// PRIVMSG to a channel or nick.
    Say { target: String, text: String },
    /// CTCP request, e.g. `VERSION`.
    Ctcp {
        target: String,
        kind: String,
        text: Option<String>,
    },
    /// Pre-formatted protocol line.
    Raw(String),
    Join {
        channel: String,
        key: Option<String>,
    },
}

/// A message bound for a Discord channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscordPost {
    /// Discord channel key (`#name` or numeric id).
    pub channel: String,
    pub delivery: Delivery,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    /// Sent by the bot account itself.
    Plain { content: String },
    /// Sent through a webhook under a custom display name.
    Impersonated {
        credential: String,
        username: String,
        content: String,
    },
}

impl Delivery {
    pub fn content(&self) -> &str {
        match self {
            Delivery::Plain { content } | Delivery::Impersonated { content, .. } => content,
        }
    }
}
