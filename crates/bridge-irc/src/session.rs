//! Per-connection IRC state: own nick, channel membership, NAMES buffering.
//!
//! [`Session::handle`] is synchronous so the whole protocol mapping can be
//! tested without a socket.

use std::collections::{HashMap, HashSet};

use tracing::{debug, warn};

use bridge_core::event::IrcEvent;

use crate::message::{parse_ctcp, Message};

/// Mode prefixes that may precede a nick in a NAMES reply.
const NICK_PREFIXES: &[char] = &['~', '&', '@', '%', '+'];

/// Result of feeding one line to the session.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Outcome {
    pub events: Vec<IrcEvent>,
    /// Lines the transport must answer with (PONG, alternate NICK, CTCP replies).
    pub replies: Vec<String>,
}

#[derive(Debug)]
pub struct Session {
    nick: String,
    registered: bool,
    /// Lowercased channel → lowercased nick → nick as last seen.
    members: HashMap<String, HashMap<String, String>>,
    /// NAMES lines received but not yet terminated by 366.
    names: HashMap<String, Vec<String>>,
    version_reply: String,
}

impl Session {
    pub fn new(nick: &str) -> Self {
        Self {
            nick: nick.to_string(),
            registered: false,
            members: HashMap::new(),
            names: HashMap::new(),
            version_reply: format!("chatbridge {}", env!("CARGO_PKG_VERSION")),
        }
    }

    pub fn nick(&self) -> &str {
        &self.nick
    }

    pub fn is_registered(&self) -> bool {
        self.registered
    }

    /// Channels the bridge currently sits in.
    pub fn channels(&self) -> Vec<String> {
        let mut channels: Vec<String> = self.members.keys().cloned().collect();
        channels.sort();
        channels
    }

    pub fn handle(&mut self, msg: &Message) -> Outcome {
        let mut out = Outcome::default();
        let from = msg.nick().unwrap_or_default().to_string();

        match msg.command.as_str() {
            "PING" => {
                let token = msg.param(0).unwrap_or_default();
                out.replies.push(format!("PONG :{token}"));
            }
            "001" => {
                if let Some(nick) = msg.param(0) {
                    self.nick = nick.to_string();
                }
                self.registered = true;
                out.events.push(IrcEvent::Connected {
                    nick: self.nick.clone(),
                });
            }
            // ERR_NICKNAMEINUSE before registration: retry with a suffix.
            "433" if !self.registered => {
                self.nick.push('_');
                out.replies.push(format!("NICK {}", self.nick));
            }
            "PRIVMSG" => self.privmsg(msg, &from, &mut out),
            "NOTICE" => self.notice(msg, &from, &mut out),
            "JOIN" => {
                for channel in msg.param(0).unwrap_or_default().split(',') {
                    if channel.is_empty() {
                        continue;
                    }
                    if self.is_self(&from) {
                        self.members.insert(channel.to_lowercase(), HashMap::new());
                    }
                    self.add_member(channel, &from);
                    out.events.push(IrcEvent::Join {
                        channel: channel.to_string(),
                        nick: from.clone(),
                    });
                }
            }
            "PART" => {
                let reason = msg.param(1).map(str::to_string);
                for channel in msg.param(0).unwrap_or_default().split(',') {
                    self.remove_member(channel, &from);
                    out.events.push(IrcEvent::Part {
                        channel: channel.to_string(),
                        nick: from.clone(),
                        reason: reason.clone(),
                    });
                }
            }
            "KICK" => {
                let (Some(channel), Some(nick)) = (msg.param(0), msg.param(1)) else {
                    return out;
                };
                self.remove_member(channel, nick);
                out.events.push(IrcEvent::Kick {
                    channel: channel.to_string(),
                    nick: nick.to_string(),
                    by: from,
                    reason: msg.param(2).map(str::to_string),
                });
            }
            "QUIT" => {
                let channels = self.forget(&from);
                out.events.push(IrcEvent::Quit {
                    nick: from,
                    reason: msg.param(0).map(str::to_string),
                    channels,
                });
            }
            "KILL" => {
                let Some(nick) = msg.param(0) else {
                    return out;
                };
                let channels = self.forget(nick);
                out.events.push(IrcEvent::Kill {
                    nick: nick.to_string(),
                    reason: msg.param(1).map(str::to_string),
                    channels,
                });
            }
            "NICK" => {
                let Some(new) = msg.param(0) else {
                    return out;
                };
                let channels = self.rename(&from, new);
                if self.is_self(&from) {
                    self.nick = new.to_string();
                }
                out.events.push(IrcEvent::Nick {
                    old: from,
                    new: new.to_string(),
                    channels,
                });
            }
            "INVITE" => {
                if let Some(channel) = msg.param(1) {
                    out.events.push(IrcEvent::Invite {
                        channel: channel.to_string(),
                        by: from,
                    });
                }
            }
            "TOPIC" => {
                if let Some(channel) = msg.param(0) {
                    out.events.push(IrcEvent::Topic {
                        channel: channel.to_string(),
                        topic: msg.param(1).unwrap_or_default().to_string(),
                        nick: Some(from),
                    });
                }
            }
            // RPL_NOTOPIC / RPL_TOPIC
            "331" | "332" => {
                if let Some(channel) = msg.param(1) {
                    let topic = if msg.command == "332" {
                        msg.param(2).unwrap_or_default()
                    } else {
                        ""
                    };
                    out.events.push(IrcEvent::Topic {
                        channel: channel.to_string(),
                        topic: topic.to_string(),
                        nick: None,
                    });
                }
            }
            // RPL_NAMREPLY: <me> <type> <channel> :<nicks>
            "353" => {
                let (Some(channel), Some(list)) = (msg.param(2), msg.param(3)) else {
                    return out;
                };
                let nicks = list
                    .split_whitespace()
                    .map(|n| n.trim_start_matches(NICK_PREFIXES).to_string())
                    .filter(|n| !n.is_empty());
                self.names
                    .entry(channel.to_lowercase())
                    .or_default()
                    .extend(nicks);
            }
            // RPL_ENDOFNAMES
            "366" => {
                if let Some(channel) = msg.param(1) {
                    let nicks = self.names.remove(&channel.to_lowercase()).unwrap_or_default();
                    if let Some(members) = self.members.get_mut(&channel.to_lowercase()) {
                        members.extend(nicks.iter().map(|n| (n.to_lowercase(), n.clone())));
                    }
                    out.events.push(IrcEvent::Names {
                        channel: channel.to_string(),
                        nicks,
                    });
                }
            }
            "ERROR" => {
                let reason = msg.param(0).unwrap_or("closing link").to_string();
                warn!(reason = %reason, "IRC server sent ERROR");
                out.events.push(IrcEvent::Error(reason));
            }
            other => debug!(command = %other, "unhandled IRC command"),
        }

        out
    }

    fn privmsg(&mut self, msg: &Message, from: &str, out: &mut Outcome) {
        let (Some(target), Some(text)) = (msg.param(0), msg.param(1)) else {
            return;
        };
        match parse_ctcp(text) {
            Some((kind, rest)) if kind == "ACTION" => out.events.push(IrcEvent::Action {
                channel: target.to_string(),
                nick: from.to_string(),
                text: rest,
            }),
            Some((kind, _)) if kind == "VERSION" => {
                out.replies
                    .push(format!("NOTICE {from} :\x01VERSION {}\x01", self.version_reply));
            }
            Some((kind, _)) => debug!(from = %from, kind = %kind, "ignored CTCP request"),
            None => out.events.push(IrcEvent::Message {
                channel: target.to_string(),
                nick: from.to_string(),
                text: text.to_string(),
            }),
        }
    }

    fn notice(&mut self, msg: &Message, from: &str, out: &mut Outcome) {
        let (Some(target), Some(text)) = (msg.param(0), msg.param(1)) else {
            return;
        };
        match parse_ctcp(text) {
            Some((kind, rest)) => out.events.push(IrcEvent::Ctcp {
                from: from.to_string(),
                to: target.to_string(),
                kind,
                text: rest,
            }),
            None => out.events.push(IrcEvent::Notice {
                channel: target.to_string(),
                nick: from.to_string(),
                text: text.to_string(),
            }),
        }
    }

    fn is_self(&self, nick: &str) -> bool {
        nick.eq_ignore_ascii_case(&self.nick)
    }

    fn add_member(&mut self, channel: &str, nick: &str) {
        if let Some(members) = self.members.get_mut(&channel.to_lowercase()) {
            members.insert(nick.to_lowercase(), nick.to_string());
        }
    }

    fn remove_member(&mut self, channel: &str, nick: &str) {
        let key = channel.to_lowercase();
        if self.is_self(nick) {
            self.members.remove(&key);
        } else if let Some(members) = self.members.get_mut(&key) {
            members.remove(&nick.to_lowercase());
        }
    }

    /// Remove `nick` everywhere and return the channels it was in.
    fn forget(&mut self, nick: &str) -> Vec<String> {
        let lower = nick.to_lowercase();
        let mut channels: Vec<String> = self
            .members
            .iter_mut()
            .filter_map(|(channel, members)| members.remove(&lower).map(|_| channel.clone()))
            .collect();
        channels.sort();
        channels
    }

    fn rename(&mut self, old: &str, new: &str) -> Vec<String> {
        let channels = self.forget(old);
        for channel in &channels {
            if let Some(members) = self.members.get_mut(channel) {
                members.insert(new.to_lowercase(), new.to_string());
            }
        }
        channels
    }

    /// Nicks currently known in `channel`.
    pub fn members_of(&self, channel: &str) -> HashSet<String> {
        self.members
            .get(&channel.to_lowercase())
            .map(|m| m.values().cloned().collect())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed(session: &mut Session, line: &str) -> Outcome {
        session.handle(&Message::parse(line).expect("parsable line"))
    }

    fn joined_session() -> Session {
        let mut s = Session::new("relay");
        feed(&mut s, ":irc.example.net 001 relay :Welcome");
        feed(&mut s, ":relay!r@host JOIN #Lobby");
        feed(&mut s, ":relay!r@host JOIN #dev");
        feed(&mut s, ":irc.example.net 353 relay = #Lobby :@relay +carl dora");
        feed(&mut s, ":irc.example.net 366 relay #Lobby :End of /NAMES list.");
        feed(&mut s, ":irc.example.net 353 relay = #dev :relay carl");
        feed(&mut s, ":irc.example.net 366 relay #dev :End of /NAMES list.");
        s
    }

    #[test]
    fn ping_is_answered() {
        let mut s = Session::new("relay");
        let out = feed(&mut s, "PING :abc");
        assert_eq!(out.replies, vec!["PONG :abc"]);
        assert!(out.events.is_empty());
    }

    #[test]
    fn welcome_reports_registered_nick() {
        let mut s = Session::new("relay");
        let out = feed(&mut s, ":irc.example.net 433 * relay :Nickname is already in use");
        assert_eq!(out.replies, vec!["NICK relay_"]);

        let out = feed(&mut s, ":irc.example.net 001 relay_ :Welcome");
        assert_eq!(
            out.events,
            vec![IrcEvent::Connected {
                nick: "relay_".to_string()
            }]
        );
        assert!(s.is_registered());
    }

    #[test]
    fn names_are_aggregated_until_end() {
        let mut s = Session::new("relay");
        feed(&mut s, ":relay!r@host JOIN #lobby");
        let first = feed(&mut s, ":srv 353 relay = #lobby :@op +voice");
        assert!(first.events.is_empty());
        feed(&mut s, ":srv 353 relay = #lobby :~owner plain");
        let end = feed(&mut s, ":srv 366 relay #lobby :End");
        assert_eq!(
            end.events,
            vec![IrcEvent::Names {
                channel: "#lobby".to_string(),
                nicks: vec!["op".into(), "voice".into(), "owner".into(), "plain".into()],
            }]
        );
        assert!(s.members_of("#LOBBY").contains("owner"));
    }

    #[test]
    fn quit_lists_shared_channels() {
        let mut s = joined_session();
        let out = feed(&mut s, ":carl!c@host QUIT :Ping timeout");
        assert_eq!(
            out.events,
            vec![IrcEvent::Quit {
                nick: "carl".into(),
                reason: Some("Ping timeout".into()),
                channels: vec!["#dev".into(), "#lobby".into()],
            }]
        );

        let out = feed(&mut s, ":dora!d@host QUIT");
        assert_eq!(
            out.events,
            vec![IrcEvent::Quit {
                nick: "dora".into(),
                reason: None,
                channels: vec!["#lobby".into()],
            }]
        );
    }

    #[test]
    fn nick_change_moves_membership() {
        let mut s = joined_session();
        let out = feed(&mut s, ":carl!c@host NICK :carl_away");
        assert_eq!(
            out.events,
            vec![IrcEvent::Nick {
                old: "carl".into(),
                new: "carl_away".into(),
                channels: vec!["#dev".into(), "#lobby".into()],
            }]
        );
        assert!(s.members_of("#dev").contains("carl_away"));

        feed(&mut s, ":relay!r@host NICK relay2");
        assert_eq!(s.nick(), "relay2");
    }

    #[test]
    fn part_kick_and_self_part() {
        let mut s = joined_session();
        let out = feed(&mut s, ":op!o@host KICK #dev carl :spam");
        assert_eq!(
            out.events,
            vec![IrcEvent::Kick {
                channel: "#dev".into(),
                nick: "carl".into(),
                by: "op".into(),
                reason: Some("spam".into()),
            }]
        );
        assert!(!s.members_of("#dev").contains("carl"));

        feed(&mut s, ":relay!r@host PART #dev :bye");
        assert_eq!(s.channels(), vec!["#lobby".to_string()]);
    }

    #[test]
    fn privmsg_variants() {
        let mut s = joined_session();

        let out = feed(&mut s, ":carl!c@host PRIVMSG #lobby :hello");
        assert_eq!(
            out.events,
            vec![IrcEvent::Message {
                channel: "#lobby".into(),
                nick: "carl".into(),
                text: "hello".into(),
            }]
        );

        let out = feed(&mut s, ":carl!c@host PRIVMSG #lobby :\x01ACTION waves\x01");
        assert_eq!(
            out.events,
            vec![IrcEvent::Action {
                channel: "#lobby".into(),
                nick: "carl".into(),
                text: "waves".into(),
            }]
        );

        let out = feed(&mut s, ":carl!c@host PRIVMSG relay :\x01VERSION\x01");
        assert!(out.events.is_empty());
        assert!(out.replies[0].starts_with("NOTICE carl :\x01VERSION chatbridge"));
    }

    #[test]
    fn notice_with_ctcp_is_a_reply() {
        let mut s = joined_session();
        let out = feed(&mut s, ":carl!c@host NOTICE relay :\x01VERSION HexChat 2.16\x01");
        assert_eq!(
            out.events,
            vec![IrcEvent::Ctcp {
                from: "carl".into(),
                to: "relay".into(),
                kind: "VERSION".into(),
                text: "HexChat 2.16".into(),
            }]
        );

        let out = feed(&mut s, ":carl!c@host NOTICE #lobby :heads up");
        assert_eq!(
            out.events,
            vec![IrcEvent::Notice {
                channel: "#lobby".into(),
                nick: "carl".into(),
                text: "heads up".into(),
            }]
        );
    }

    #[test]
    fn topic_replies_and_changes() {
        let mut s = joined_session();
        let out = feed(&mut s, ":srv 332 relay #lobby :Welcome all");
        assert_eq!(
            out.events,
            vec![IrcEvent::Topic {
                channel: "#lobby".into(),
                topic: "Welcome all".into(),
                nick: None,
            }]
        );

        let out = feed(&mut s, ":srv 331 relay #dev :No topic is set");
        assert_eq!(
            out.events,
            vec![IrcEvent::Topic {
                channel: "#dev".into(),
                topic: String::new(),
                nick: None,
            }]
        );

        let out = feed(&mut s, ":op!o@host TOPIC #dev :new topic");
        assert_eq!(
            out.events,
            vec![IrcEvent::Topic {
                channel: "#dev".into(),
                topic: "new topic".into(),
                nick: Some("op".into()),
            }]
        );
    }

    #[test]
    fn invite_and_error() {
        let mut s = joined_session();
        let out = feed(&mut s, ":op!o@host INVITE relay :#secret");
        assert_eq!(
            out.events,
            vec![IrcEvent::Invite {
                channel: "#secret".into(),
                by: "op".into(),
            }]
        );

        let out = feed(&mut s, "ERROR :Closing Link: flood");
        assert_eq!(out.events, vec![IrcEvent::Error("Closing Link: flood".into())]);
    }
}
