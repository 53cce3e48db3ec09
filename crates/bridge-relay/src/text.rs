//! Message body rewriting between Discord and IRC.
//!
//! Every function here is pure: no state survives between calls.

use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::directory::{Directory, Member, User};

/// `<@id>`, `<@!id>`, `<@&id>` and `<#id>`.
static ID_MENTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<(@!?|@&|#)(\d+)>").expect("Invalid id mention regex"));

/// Custom emoji, static or animated: `<:name:id>`, `<a:name:id>`.
static CUSTOM_EMOJI: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<a?:(\w+):\d+>").expect("Invalid emoji regex"));

static LINE_BREAKS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[\r\n\u{0B}\u{0C}\u{85}\u{2028}\u{2029}]+").expect("Invalid line break regex")
});

static NAME_MENTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"@(\S+)").expect("Invalid name mention regex"));

/// mIRC bold, color, hex color, italic, strikethrough, monospace, reverse,
/// underline and reset codes.
static IRC_FORMATTING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\x03(?:\d{1,2}(?:,\d{1,2})?)?|\x04(?:[0-9a-fA-F]{6}(?:,[0-9a-fA-F]{6})?)?|[\x02\x0F\x11\x16\x1D\x1E\x1F]",
    )
    .expect("Invalid IRC formatting regex")
});

/// Nick colors in palette order, paired with their mIRC color codes.
pub const NICK_COLORS: [(&str, u8); 12] = [
    ("light_blue", 12),
    ("dark_blue", 2),
    ("light_red", 4),
    ("dark_red", 5),
    ("light_green", 9),
    ("dark_green", 3),
    ("magenta", 6),
    ("light_magenta", 13),
    ("orange", 7),
    ("yellow", 8),
    ("cyan", 10),
    ("light_cyan", 11),
];

/// Replace id-addressed Discord tokens with readable names.
///
/// User mentions become `@display-name`, role mentions `@role-name` and
/// channel mentions `#channel-name`. Tokens that cannot be resolved are left
/// exactly as written.
pub fn resolve_mentions(text: &str, guild: u64, directory: &dyn Directory) -> String {
    ID_MENTION
        .replace_all(text, |caps: &Captures| {
            let Ok(id) = caps[2].parse::<u64>() else {
                return caps[0].to_string();
            };
            let resolved = match &caps[1] {
                "@" | "@!" => directory
                    .member(guild, id)
                    .map(|m| format!("@{}", m.display_name())),
                "@&" => directory.role_name(guild, id).map(|r| format!("@{r}")),
                _ => directory.channel_name(guild, id).map(|c| format!("#{c}")),
            };
            resolved.unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

/// `<:party:1234>` → `:party:`.
pub fn replace_custom_emoji(text: &str) -> String {
    CUSTOM_EMOJI.replace_all(text, ":$1:").into_owned()
}

/// Collapse every run of line breaks into one space. IRC lines cannot carry
/// embedded newlines.
pub fn normalize_whitespace(text: &str) -> String {
    LINE_BREAKS.replace_all(text, " ").into_owned()
}

/// Palette index for a name: `(first codepoint + length) mod 12`.
pub fn color_index(name: &str) -> Option<usize> {
    let first = name.chars().next()?;
    let len = name.chars().count();
    Some((first as usize + len) % NICK_COLORS.len())
}

/// Wrap `name` in its deterministic mIRC color. Returns the name unchanged
/// when coloring is disabled or the name is empty.
pub fn colorize(name: &str, enabled: bool) -> String {
    if !enabled {
        return name.to_string();
    }
    match color_index(name) {
        Some(idx) => format!("\x03{:02}{}\x0F", NICK_COLORS[idx].1, name),
        None => name.to_string(),
    }
}

/// Turn `@name` tokens typed on IRC into Discord mentions.
///
/// Guild nicknames win. A username match is only used when that user has no
/// guild nickname or the nickname is the same word; otherwise the token stays
/// plain text, since the name is ambiguous.
pub fn rewrite_mentions_back(text: &str, channel_members: &[Member], users: &[User]) -> String {
    NAME_MENTION
        .replace_all(text, |caps: &Captures| {
            let word = &caps[1];

            if let Some(member) = channel_members
                .iter()
                .find(|m| m.nickname.as_deref() == Some(word))
            {
                return format!("<@{}>", member.id);
            }

            if let Some(user) = users.iter().find(|u| u.username == word) {
                let nickname = channel_members
                    .iter()
                    .find(|m| m.id == user.id)
                    .and_then(|m| m.nickname.as_deref());
                if nickname.is_none() || nickname == Some(word) {
                    return format!("<@{}>", user.id);
                }
            }

            caps[0].to_string()
        })
        .into_owned()
}

/// Drop mIRC formatting control codes.
pub fn strip_irc_formatting(text: &str) -> String {
    IRC_FORMATTING.replace_all(text, "").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::StaticDirectory;

    fn directory() -> StaticDirectory {
        StaticDirectory::new()
            .with_member(1, "alice", Some("Ally"))
            .with_member(2, "bob", None)
            .with_role(10, "mods")
            .with_channel(20, "general")
    }

    #[test]
    fn resolves_all_mention_variants() {
        let dir = directory();
        let out = resolve_mentions("<@1> <@!2> <@&10> <#20>", 7, &dir);
        assert_eq!(out, "@Ally @bob @mods #general");
        assert!(!out.contains('<'));
    }

    #[test]
    fn unknown_ids_stay_literal() {
        let dir = directory();
        assert_eq!(
            resolve_mentions("hi <@99> in <#98>", 7, &dir),
            "hi <@99> in <#98>"
        );
    }

    #[test]
    fn custom_emoji_become_names() {
        assert_eq!(
            replace_custom_emoji("nice <:party:123> <a:spin:456>"),
            "nice :party: :spin:"
        );
    }

    #[test]
    fn line_breaks_collapse() {
        let out = normalize_whitespace("one\r\ntwo\n\nthree\rfour\u{2028}five");
        assert_eq!(out, "one two three four five");
    }

    #[test]
    fn colorize_is_deterministic_and_from_palette() {
        for name in ["alice", "Bob", "x", "ünïcode", "someone_with_a_long_name"] {
            let first = colorize(name, true);
            assert_eq!(first, colorize(name, true));
            let idx = color_index(name).unwrap();
            assert!(idx < 12);
            assert_eq!(first, format!("\x03{:02}{}\x0F", NICK_COLORS[idx].1, name));
        }
    }

    #[test]
    fn colorize_index_formula() {
        // 'a' = 97, len 5 → 102 % 12 = 6 → magenta
        assert_eq!(color_index("alice"), Some(6));
        assert_eq!(NICK_COLORS[6].0, "magenta");
    }

    #[test]
    fn colorize_disabled_or_empty_is_identity() {
        assert_eq!(colorize("alice", false), "alice");
        assert_eq!(colorize("", true), "");
    }

    #[test]
    fn rewrite_prefers_guild_nickname() {
        let dir = directory();
        let members = dir.channel_members("#general");
        let users = dir.users();
        assert_eq!(
            rewrite_mentions_back("hey @Ally and @bob", &members, &users),
            "hey <@1> and <@2>"
        );
    }

    #[test]
    fn rewrite_keeps_ambiguous_username() {
        // alice has the nickname Ally, so @alice does not identify her.
        let dir = directory();
        let members = dir.channel_members("#general");
        let users = dir.users();
        assert_eq!(rewrite_mentions_back("@alice", &members, &users), "@alice");
        assert_eq!(rewrite_mentions_back("@nobody", &members, &users), "@nobody");
    }

    #[test]
    fn rewrite_matches_users_outside_guild() {
        let dir = directory().with_user(5, "carol");
        let members = dir.channel_members("#general");
        let users = dir.users();
        assert_eq!(rewrite_mentions_back("@carol", &members, &users), "<@5>");
    }

    #[test]
    fn strips_irc_formatting() {
        assert_eq!(
            strip_irc_formatting("\x02bold\x02 \x0304,01red\x03 \x1Dit\x0F"),
            "bold red it"
        );
    }
}
