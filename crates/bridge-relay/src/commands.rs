//! Bridge commands typed in a Discord channel.
//!
//! Recognized commands (exact match, no arguments):
//!   `help`    : print usage back to the Discord channel
//!   `users`   : NAMES query, reply announced as a user list
//!   `topic`   : TOPIC query, reply announced as the channel topic
//!   `versions`: NAMES query, every listed user gets a CTCP VERSION probe
//!
//! Anything else that starts with a command character is swallowed so
//! command syntax never leaks into IRC.

use std::time::Instant;

use tracing::{debug, info};

use bridge_core::event::{Action, Delivery, DiscordPost, IrcCommand};
use bridge_core::mapping::MappingEntry;

use crate::pending::{Correlation, NamesPurpose};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Help,
    Users,
    Topic,
    Versions,
    /// Prefixed text that is not a known command.
    Unknown(String),
}

#[derive(Debug, Clone)]
pub struct CommandProcessor {
    prefixes: Vec<char>,
}

impl CommandProcessor {
    pub fn new(prefixes: Vec<char>) -> Self {
        Self { prefixes }
    }

    /// `true` if the text starts with a configured command character.
    pub fn is_command(&self, text: &str) -> bool {
        text.chars()
            .next()
            .is_some_and(|c| self.prefixes.contains(&c))
    }

    /// Parse prefixed text. Returns `None` for ordinary chat.
    pub fn parse(&self, text: &str) -> Option<Command> {
        let mut chars = text.chars();
        let prefix = chars.next()?;
        if !self.prefixes.contains(&prefix) {
            return None;
        }
        Some(match chars.as_str().trim_end() {
            "help" => Command::Help,
            "users" => Command::Users,
            "topic" => Command::Topic,
            "versions" => Command::Versions,
            _ => Command::Unknown(text.to_string()),
        })
    }

    /// Run a command typed in the Discord channel `origin.discord`.
    ///
    /// Queries register their pending reply in `correlation` before the
    /// query is issued.
    pub fn handle(
        &self,
        text: &str,
        origin: &MappingEntry,
        correlation: &mut Correlation,
        now: Instant,
    ) -> Vec<Action> {
        let Some(command) = self.parse(text) else {
            return Vec::new();
        };
        info!(command = ?command, channel = %origin.irc, "bridge command");

        match command {
            Command::Help => vec![Action::Discord(DiscordPost {
                channel: origin.discord.clone(),
                delivery: Delivery::Plain {
                    content: self.usage(),
                },
            })],
            Command::Users => {
                correlation.request_names(&origin.irc, NamesPurpose::Users, now);
                vec![raw(format!("NAMES {}", origin.irc))]
            }
            Command::Topic => {
                correlation.request_topic(&origin.irc, now);
                vec![raw(format!("TOPIC {}", origin.irc))]
            }
            Command::Versions => {
                correlation.request_names(&origin.irc, NamesPurpose::Versions, now);
                vec![raw(format!("NAMES {}", origin.irc))]
            }
            Command::Unknown(text) => {
                debug!(text = %text, "swallowed unknown command");
                Vec::new()
            }
        }
    }

    fn usage(&self) -> String {
        let p = self.prefixes.first().copied().unwrap_or('!');
        format!(
            "**Bridge Commands**\n\
             - `{p}help` — show this help\n\
             - `{p}users` — list users in the IRC channel\n\
             - `{p}topic` — show the IRC channel topic\n\
             - `{p}versions` — ask every IRC user for their client version"
        )
    }
}

fn raw(line: String) -> Action {
    Action::Irc(IrcCommand::Raw(line))
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn origin() -> MappingEntry {
        MappingEntry {
            discord: "#general".to_string(),
            irc: "#lobby".to_string(),
            secret: None,
        }
    }

    fn processor() -> CommandProcessor {
        CommandProcessor::new(vec!['!', '.'])
    }

    #[test]
    fn parses_known_commands_exactly() {
        let p = processor();
        assert_eq!(p.parse("!help"), Some(Command::Help));
        assert_eq!(p.parse(".users"), Some(Command::Users));
        assert_eq!(p.parse("!topic "), Some(Command::Topic));
        assert_eq!(p.parse("!versions"), Some(Command::Versions));
        assert_eq!(
            p.parse("!users now"),
            Some(Command::Unknown("!users now".to_string()))
        );
        assert_eq!(p.parse("hello"), None);
        assert_eq!(p.parse(""), None);
    }

    #[test]
    fn help_answers_in_discord_only() {
        let mut c = Correlation::new(Duration::from_secs(60));
        let actions = processor().handle("!help", &origin(), &mut c, Instant::now());

        assert_eq!(actions.len(), 1);
        let Action::Discord(post) = &actions[0] else {
            panic!("expected a Discord post");
        };
        assert_eq!(post.channel, "#general");
        assert!(post.delivery.content().contains("!versions"));
        assert!(post.delivery.content().lines().count() > 1);
        assert!(c.is_empty());
    }

    #[test]
    fn queries_register_before_sending() {
        let mut c = Correlation::new(Duration::from_secs(60));
        let now = Instant::now();
        let p = processor();

        assert_eq!(
            p.handle("!users", &origin(), &mut c, now),
            vec![Action::Irc(IrcCommand::Raw("NAMES #lobby".into()))]
        );
        assert_eq!(
            p.handle("!topic", &origin(), &mut c, now),
            vec![Action::Irc(IrcCommand::Raw("TOPIC #lobby".into()))]
        );
        assert_eq!(
            p.handle("!versions", &origin(), &mut c, now),
            vec![Action::Irc(IrcCommand::Raw("NAMES #lobby".into()))]
        );

        assert!(c.take_topic("#lobby"));
        assert_eq!(c.take_names("#lobby"), Some(NamesPurpose::Users));
        assert_eq!(c.take_names("#lobby"), Some(NamesPurpose::Versions));
    }

    #[test]
    fn unknown_commands_are_swallowed() {
        let mut c = Correlation::new(Duration::from_secs(60));
        let actions = processor().handle("!ban everyone", &origin(), &mut c, Instant::now());
        assert!(actions.is_empty());
        assert!(c.is_empty());
    }
}
