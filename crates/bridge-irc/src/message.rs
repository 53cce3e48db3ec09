//! IRC line parsing and rendering (RFC 1459 framing, IRCv3 tags skipped).

use bridge_core::event::IrcCommand;

/// Protocol limit is 512 bytes including CRLF; leave room for the
/// `:nick!user@host ` prefix the server prepends when relaying.
const MAX_PAYLOAD_BYTES: usize = 400;

/// One parsed protocol line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub prefix: Option<String>,
    /// Command word or three-digit numeric, uppercased.
    pub command: String,
    pub params: Vec<String>,
}

impl Message {
    /// Parse a line without its trailing CRLF. Returns `None` for blank lines.
    pub fn parse(line: &str) -> Option<Self> {
        let mut rest = line.trim_end_matches(['\r', '\n']);

        if rest.starts_with('@') {
            rest = rest.split_once(' ').map_or("", |(_, r)| r);
        }
        rest = rest.trim_start();

        let prefix = match rest.strip_prefix(':') {
            Some(stripped) => {
                let (prefix, r) = stripped.split_once(' ').unwrap_or((stripped, ""));
                rest = r.trim_start();
                Some(prefix.to_string())
            }
            None => None,
        };

        let (command, mut rest) = rest.split_once(' ').unwrap_or((rest, ""));
        if command.is_empty() {
            return None;
        }

        let mut params = Vec::new();
        loop {
            rest = rest.trim_start_matches(' ');
            if rest.is_empty() {
                break;
            }
            if let Some(trailing) = rest.strip_prefix(':') {
                params.push(trailing.to_string());
                break;
            }
            match rest.split_once(' ') {
                Some((param, r)) => {
                    params.push(param.to_string());
                    rest = r;
                }
                None => {
                    params.push(rest.to_string());
                    break;
                }
            }
        }

        Some(Self {
            prefix,
            command: command.to_ascii_uppercase(),
            params,
        })
    }

    /// Nick part of a `nick!user@host` prefix, or the whole prefix for servers.
    pub fn nick(&self) -> Option<&str> {
        self.prefix
            .as_deref()
            .map(|p| p.split_once('!').map_or(p, |(nick, _)| nick))
    }

    pub fn param(&self, idx: usize) -> Option<&str> {
        self.params.get(idx).map(String::as_str)
    }
}

/// Split a CTCP payload `\x01KIND rest\x01` into `(KIND, rest)`.
pub fn parse_ctcp(text: &str) -> Option<(String, String)> {
    let inner = text.strip_prefix('\x01')?;
    let inner = inner.strip_suffix('\x01').unwrap_or(inner);
    let (kind, rest) = inner.split_once(' ').unwrap_or((inner, ""));
    if kind.is_empty() {
        return None;
    }
    Some((kind.to_ascii_uppercase(), rest.to_string()))
}

/// Render a relay command as one or more protocol lines.
///
/// Long chat text is split across several PRIVMSGs on character boundaries.
pub fn render(command: &IrcCommand) -> Vec<String> {
    match command {
        IrcCommand::Say { target, text } => split_payload(&sanitize(text), MAX_PAYLOAD_BYTES)
            .into_iter()
            .map(|chunk| format!("PRIVMSG {target} :{chunk}"))
            .collect(),
        IrcCommand::Ctcp { target, kind, text } => {
            let payload = match text {
                Some(text) => format!("{kind} {}", sanitize(text)),
                None => kind.clone(),
            };
            vec![format!("PRIVMSG {target} :\x01{payload}\x01")]
        }
        IrcCommand::Raw(line) => vec![sanitize(line)],
        IrcCommand::Join { channel, key } => vec![match key {
            Some(key) => format!("JOIN {channel} {key}"),
            None => format!("JOIN {channel}"),
        }],
    }
}

/// Lines sent right after connecting.
pub fn registration(nick: &str, user: &str, realname: &str, password: Option<&str>) -> Vec<String> {
    let mut lines = Vec::with_capacity(3);
    if let Some(password) = password {
        lines.push(format!("PASS {password}"));
    }
    lines.push(format!("NICK {nick}"));
    lines.push(format!("USER {user} 0 * :{realname}"));
    lines
}

fn sanitize(text: &str) -> String {
    text.replace(['\r', '\n'], " ")
}

fn split_payload(text: &str, max_bytes: usize) -> Vec<String> {
    if text.len() <= max_bytes {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut current = String::new();
    for ch in text.chars() {
        if current.len() + ch.len_utf8() > max_bytes {
            chunks.push(std::mem::take(&mut current));
        }
        current.push(ch);
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_prefix_command_and_trailing() {
        let msg = Message::parse(":alice!a@host PRIVMSG #lobby :hello there\r\n").unwrap();
        assert_eq!(msg.prefix.as_deref(), Some("alice!a@host"));
        assert_eq!(msg.nick(), Some("alice"));
        assert_eq!(msg.command, "PRIVMSG");
        assert_eq!(msg.params, vec!["#lobby", "hello there"]);
    }

    #[test]
    fn parses_numerics_tags_and_bare_commands() {
        let msg =
            Message::parse("@time=2024-01-01T00:00:00Z :irc.example.net 353 relay = #lobby :@op +voice plain")
                .unwrap();
        assert_eq!(msg.nick(), Some("irc.example.net"));
        assert_eq!(msg.command, "353");
        assert_eq!(msg.params, vec!["relay", "=", "#lobby", "@op +voice plain"]);

        let ping = Message::parse("PING :token").unwrap();
        assert_eq!(ping.prefix, None);
        assert_eq!(ping.params, vec!["token"]);

        assert!(Message::parse("").is_none());
    }

    #[test]
    fn ctcp_payloads() {
        assert_eq!(
            parse_ctcp("\x01VERSION HexChat 2.16\x01"),
            Some(("VERSION".to_string(), "HexChat 2.16".to_string()))
        );
        assert_eq!(
            parse_ctcp("\x01ACTION waves"),
            Some(("ACTION".to_string(), "waves".to_string()))
        );
        assert_eq!(parse_ctcp("plain text"), None);
    }

    #[test]
    fn renders_commands() {
        assert_eq!(
            render(&IrcCommand::Ctcp {
                target: "carl".into(),
                kind: "VERSION".into(),
                text: None,
            }),
            vec!["PRIVMSG carl :\x01VERSION\x01"]
        );
        assert_eq!(
            render(&IrcCommand::Join {
                channel: "#dev".into(),
                key: Some("k".into()),
            }),
            vec!["JOIN #dev k"]
        );
        assert_eq!(
            render(&IrcCommand::Raw("NAMES #dev\r\nQUIT".into())),
            vec!["NAMES #dev  QUIT"]
        );
    }

    #[test]
    fn long_privmsg_is_split_on_char_boundaries() {
        let text = "é".repeat(300); // 600 bytes
        let lines = render(&IrcCommand::Say {
            target: "#lobby".into(),
            text,
        });
        assert_eq!(lines.len(), 2);
        for line in &lines {
            let payload = line.strip_prefix("PRIVMSG #lobby :").unwrap();
            assert!(payload.len() <= MAX_PAYLOAD_BYTES);
        }
    }

    #[test]
    fn registration_with_password() {
        assert_eq!(
            registration("relay", "relay", "chatbridge", Some("pw")),
            vec!["PASS pw", "NICK relay", "USER relay 0 * :chatbridge"]
        );
    }
}
