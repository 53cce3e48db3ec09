use std::collections::{BTreeMap, HashSet};
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use bridge_core::config::BridgeConfig;
use bridge_core::event::{Action, DiscordMessage, IrcCommand, IrcEvent};
use bridge_core::mapping::ChannelMapping;
use bridge_core::Result;

use crate::commands::CommandProcessor;
use crate::directory::Directory;
use crate::identity::IdentityRenderer;
use crate::pending::{Correlation, NamesPurpose, Probe, ProbeKind};
use crate::text;

/// One translated IRC event, before destination and identity are resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Relayed {
    /// IRC channel the event belongs to.
    channel: String,
    author: Option<String>,
    body: String,
    /// Automatic notices may be redirected through the remap table.
    remappable: bool,
}

impl Relayed {
    fn notice(channel: &str, body: String) -> Self {
        Self {
            channel: channel.to_string(),
            author: None,
            body,
            remappable: true,
        }
    }
}

/// Bridge state shared by both translation directions.
///
/// Owned by the event loop and handed one event at a time; nothing in here
/// is shared or locked.
pub struct RelayCore {
    mapping: ChannelMapping,
    remap: BTreeMap<String, String>,
    renderer: IdentityRenderer,
    commands: CommandProcessor,
    correlation: Correlation,
    /// Current IRC nickname of the bridge.
    nickname: String,
    nick_colors: bool,
    auto_send: Vec<String>,
    ignore_users: HashSet<String>,
}

impl RelayCore {
    pub fn from_config(config: &BridgeConfig) -> Result<Self> {
        Ok(Self {
            mapping: ChannelMapping::from_config(&config.channel_mapping)?,
            remap: config.remap.clone(),
            renderer: IdentityRenderer::new(&config.webhooks),
            commands: CommandProcessor::new(config.command_prefixes()),
            correlation: Correlation::new(Duration::from_secs(config.pending_ttl_secs)),
            nickname: config.irc.nickname.clone(),
            nick_colors: config.irc_nick_colors,
            auto_send: config.auto_send_commands.clone(),
            ignore_users: config.ignore_users.iter().cloned().collect(),
        })
    }

    pub fn mapping(&self) -> &ChannelMapping {
        &self.mapping
    }

    pub fn correlation(&self) -> &Correlation {
        &self.correlation
    }

    pub fn nickname(&self) -> &str {
        &self.nickname
    }

    // -----------------------------------------------------------------------
    // Discord → IRC
    // -----------------------------------------------------------------------

    /// Translate a Discord message into IRC actions.
    pub fn forward(&mut self, msg: &DiscordMessage, directory: &dyn Directory) -> Vec<Action> {
        let now = Instant::now();
        self.expire(now);

        if msg.author.bot || msg.author.webhook {
            return Vec::new();
        }
        if self.ignore_users.contains(&msg.author.username) {
            debug!(user = %msg.author.username, "ignored Discord user");
            return Vec::new();
        }

        let Some(entry) = msg
            .channel_keys()
            .iter()
            .find_map(|key| self.mapping.irc_for(key))
            .cloned()
        else {
            debug!(channel_id = msg.channel_id, "Discord channel not mapped, dropping");
            return Vec::new();
        };

        let mut body = match msg.guild_id {
            Some(guild) => text::resolve_mentions(&msg.content, guild, directory),
            None => msg.content.clone(),
        };
        body = text::replace_custom_emoji(&body);
        body = text::normalize_whitespace(&body);

        if self.commands.is_command(&body) {
            return self
                .commands
                .handle(&body, &entry, &mut self.correlation, now);
        }

        let name = text::colorize(&msg.author.display_name, self.nick_colors);
        let mut actions = Vec::with_capacity(1 + msg.attachments.len());
        if !body.trim().is_empty() {
            actions.push(say(&entry.irc, format!("<{name}> {body}")));
        }
        for url in &msg.attachments {
            actions.push(say(&entry.irc, format!("<{name}> {url}")));
        }
        actions
    }

    // -----------------------------------------------------------------------
    // IRC → Discord
    // -----------------------------------------------------------------------

    /// Translate an IRC event into Discord posts and any IRC follow-ups.
    pub fn reverse(&mut self, event: IrcEvent, directory: &dyn Directory) -> Vec<Action> {
        let now = Instant::now();
        self.expire(now);

        let mut actions = Vec::new();
        let relayed = match event {
            IrcEvent::Connected { nick } => {
                info!(nick = %nick, "IRC registration complete");
                self.nickname = nick;
                return self.on_connected();
            }
            IrcEvent::Message {
                channel,
                nick,
                text,
            } => self.chat(&channel, &nick, text::strip_irc_formatting(&text)),
            IrcEvent::Notice {
                channel,
                nick,
                text,
            } => self.chat(
                &channel,
                &nick,
                format!("*{}*", text::strip_irc_formatting(&text)),
            ),
            IrcEvent::Action {
                channel,
                nick,
                text,
            } => self.chat(
                &channel,
                &nick,
                format!("_{}_", text::strip_irc_formatting(&text)),
            ),
            IrcEvent::Join { channel, nick } => self.join(&channel, &nick, now, &mut actions),
            IrcEvent::Part {
                channel,
                nick,
                reason,
            } => self
                .is_peer(&nick)
                .then(|| Relayed::notice(&channel, status(&nick, "has left", reason.as_deref())))
                .into_iter()
                .collect(),
            IrcEvent::Quit {
                nick,
                reason,
                channels,
            } => per_channel(&channels, &status(&nick, "has quit", reason.as_deref())),
            IrcEvent::Kick {
                channel,
                nick,
                by,
                reason,
            } => vec![Relayed::notice(
                &channel,
                status(&nick, &format!("has been kicked by {by}"), reason.as_deref()),
            )],
            IrcEvent::Kill {
                nick,
                reason,
                channels,
            } => per_channel(&channels, &status(&nick, "was killed", reason.as_deref())),
            IrcEvent::Nick { old, new, channels } => {
                if old.eq_ignore_ascii_case(&self.nickname) {
                    info!(old = %old, new = %new, "bridge nickname changed");
                    self.nickname = new;
                    Vec::new()
                } else {
                    per_channel(&channels, &format!("*{old} is now known as {new}*"))
                }
            }
            IrcEvent::Topic {
                channel,
                topic,
                nick,
            } => vec![self.topic(&channel, &topic, nick.is_none())],
            IrcEvent::Names { channel, nicks } => self.names(&channel, &nicks, now, &mut actions),
            IrcEvent::Ctcp {
                from, kind, text, ..
            } => self.ctcp_reply(&from, &kind, &text),
            IrcEvent::Invite { channel, by } => {
                match self.mapping.discord_for(&channel) {
                    Some(entry) => {
                        info!(channel = %channel, by = %by, "invited to mapped channel, joining");
                        actions.push(Action::Irc(IrcCommand::Join {
                            channel: entry.irc.clone(),
                            key: entry.secret.clone(),
                        }));
                    }
                    None => info!(channel = %channel, by = %by, "ignoring invite to unmapped channel"),
                }
                Vec::new()
            }
            IrcEvent::Error(message) => {
                warn!(error = %message, "IRC transport error");
                Vec::new()
            }
        };

        for item in relayed {
            if let Some(action) = self.deliver(item, directory) {
                actions.push(action);
            }
        }
        actions
    }

    fn on_connected(&self) -> Vec<Action> {
        let raw = self
            .auto_send
            .iter()
            .map(|line| Action::Irc(IrcCommand::Raw(line.clone())));
        let joins = self.mapping.entries().iter().map(|entry| {
            Action::Irc(IrcCommand::Join {
                channel: entry.irc.clone(),
                key: entry.secret.clone(),
            })
        });
        raw.chain(joins).collect()
    }

    fn chat(&self, channel: &str, nick: &str, body: String) -> Vec<Relayed> {
        vec![Relayed {
            channel: channel.to_string(),
            author: Some(nick.to_string()),
            body,
            remappable: false,
        }]
    }

    fn join(
        &mut self,
        channel: &str,
        nick: &str,
        now: Instant,
        actions: &mut Vec<Action>,
    ) -> Vec<Relayed> {
        if !self.is_peer(nick) || self.mapping.discord_for(channel).is_none() {
            return Vec::new();
        }
        self.probe(nick, channel, ProbeKind::Auto, now, actions);
        vec![Relayed::notice(channel, format!("*{nick} has joined*"))]
    }

    fn topic(&mut self, channel: &str, topic: &str, is_reply: bool) -> Relayed {
        let requested = is_reply && self.correlation.take_topic(channel);
        let topic = if topic.is_empty() {
            "(no topic set)"
        } else {
            topic
        };
        Relayed {
            remappable: !requested,
            ..Relayed::notice(channel, format!("*{channel} topic:* {topic}"))
        }
    }

    fn names(
        &mut self,
        channel: &str,
        nicks: &[String],
        now: Instant,
        actions: &mut Vec<Action>,
    ) -> Vec<Relayed> {
        if self.mapping.discord_for(channel).is_none() {
            return Vec::new();
        }
        match self.correlation.take_names(channel) {
            Some(NamesPurpose::Versions) => {
                let peers: Vec<&String> = nicks.iter().filter(|n| self.is_peer(n)).collect();
                for nick in peers {
                    self.probe(nick, channel, ProbeKind::Manual, now, actions);
                }
                Vec::new()
            }
            requested => vec![Relayed {
                remappable: requested.is_none(),
                ..Relayed::notice(channel, format!("*{channel} users:* {}", nicks.join(", ")))
            }],
        }
    }

    fn ctcp_reply(&mut self, from: &str, kind: &str, reply: &str) -> Vec<Relayed> {
        let Some(probe) = self.correlation.take_probe(from) else {
            debug!(from = %from, kind = %kind, "unsolicited CTCP reply");
            return Vec::new();
        };
        vec![Relayed {
            remappable: probe.kind == ProbeKind::Auto,
            ..Relayed::notice(&probe.origin, format!("*{from} {}*", reply.trim()))
        }]
    }

    fn probe(
        &mut self,
        nick: &str,
        channel: &str,
        kind: ProbeKind,
        now: Instant,
        actions: &mut Vec<Action>,
    ) {
        self.correlation.record_probe(
            nick,
            Probe {
                origin: channel.to_lowercase(),
                kind,
            },
            now,
        );
        actions.push(Action::Irc(IrcCommand::Ctcp {
            target: nick.to_string(),
            kind: "VERSION".to_string(),
            text: None,
        }));
    }

    /// Resolve the Discord destination, apply remap, and render.
    fn deliver(&self, item: Relayed, directory: &dyn Directory) -> Option<Action> {
        let Some(entry) = self.mapping.discord_for(&item.channel) else {
            debug!(channel = %item.channel, "IRC channel not mapped, dropping");
            return None;
        };

        let mut destination = entry.discord.as_str();
        if item.remappable {
            if let Some(target) = self.remap.get(destination) {
                destination = target;
            }
        }

        let body = match item.author {
            Some(_) => text::rewrite_mentions_back(
                &item.body,
                &directory.channel_members(destination),
                &directory.users(),
            ),
            None => item.body,
        };

        Some(Action::Discord(self.renderer.render(
            destination,
            item.author.as_deref(),
            &body,
        )))
    }

    fn is_peer(&self, nick: &str) -> bool {
        !nick.eq_ignore_ascii_case(&self.nickname)
    }

    fn expire(&mut self, now: Instant) {
        let removed = self.correlation.prune(now);
        if removed > 0 {
            debug!(removed, "expired unanswered IRC requests");
        }
    }
}

fn say(target: &str, text: String) -> Action {
    Action::Irc(IrcCommand::Say {
        target: target.to_string(),
        text,
    })
}

/// `*nick verb*` or `*nick verb: reason*`.
fn status(nick: &str, verb: &str, reason: Option<&str>) -> String {
    match reason.map(str::trim).filter(|r| !r.is_empty()) {
        Some(reason) => format!("*{nick} {verb}: {reason}*"),
        None => format!("*{nick} {verb}*"),
    }
}

fn per_channel(channels: &[String], body: &str) -> Vec<Relayed> {
    channels
        .iter()
        .map(|channel| Relayed::notice(channel, body.to_string()))
        .collect()
}
