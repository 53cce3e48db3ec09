//! Channel mapping between Discord channel keys and IRC channels.
//!
//! Built once at startup and never mutated. The IRC side is lowercased so
//! lookups from IRC events are case-insensitive.

use std::collections::{BTreeMap, HashMap};

use crate::error::{BridgeError, Result};

/// One configured Discord ↔ IRC channel pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappingEntry {
    /// Discord channel key as written in config (`#name` or numeric id).
    pub discord: String,
    /// Lowercased IRC channel name.
    pub irc: String,
    /// Channel key (`+k` secret) used when joining.
    pub secret: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ChannelMapping {
    entries: Vec<MappingEntry>,
    by_discord: HashMap<String, usize>,
    by_irc: HashMap<String, usize>,
}

impl ChannelMapping {
    /// Parse the `channel_mapping` config table.
    ///
    /// Values have the form `"#irc-channel"` or `"#irc-channel secret"`.
    pub fn from_config(table: &BTreeMap<String, String>) -> Result<Self> {
        let mut mapping = ChannelMapping::default();

        for (discord, value) in table {
            let mut parts = value.split_whitespace();
            let irc = parts
                .next()
                .ok_or_else(|| malformed(discord, "empty IRC channel"))?
                .to_lowercase();
            if !irc.starts_with('#') && !irc.starts_with('&') {
                return Err(malformed(discord, "IRC channel must start with '#' or '&'"));
            }
            let secret = parts.next().map(str::to_string);
            if parts.next().is_some() {
                return Err(malformed(discord, "expected \"#channel [secret]\""));
            }
            if discord.trim().is_empty() {
                return Err(malformed(discord, "empty Discord channel key"));
            }

            if let Some(&existing) = mapping.by_irc.get(&irc) {
                return Err(BridgeError::AmbiguousMapping {
                    irc,
                    first: mapping.entries[existing].discord.clone(),
                    second: discord.clone(),
                });
            }

            let idx = mapping.entries.len();
            mapping.by_discord.insert(discord.clone(), idx);
            mapping.by_irc.insert(irc.clone(), idx);
            mapping.entries.push(MappingEntry {
                discord: discord.clone(),
                irc,
                secret,
            });
        }

        Ok(mapping)
    }

    /// IRC channel for a Discord channel key.
    pub fn irc_for(&self, discord: &str) -> Option<&MappingEntry> {
        self.by_discord.get(discord).map(|&i| &self.entries[i])
    }

    /// Discord channel key for an IRC channel (case-insensitive).
    pub fn discord_for(&self, irc: &str) -> Option<&MappingEntry> {
        self.by_irc
            .get(&irc.to_lowercase())
            .map(|&i| &self.entries[i])
    }

    pub fn entries(&self) -> &[MappingEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn malformed(key: &str, reason: &str) -> BridgeError {
    BridgeError::MalformedMapping {
        key: key.to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn forward_and_inverse_agree() {
        let mapping = ChannelMapping::from_config(&table(&[
            ("#general", "#Lobby"),
            ("#dev", "#dev-talk hunter2"),
            ("123456789", "&local"),
        ]))
        .unwrap();

        for entry in mapping.entries() {
            let irc = &mapping.irc_for(&entry.discord).unwrap().irc;
            assert_eq!(mapping.discord_for(irc).unwrap().discord, entry.discord);
            assert_eq!(
                mapping.discord_for(&irc.to_uppercase()).unwrap().discord,
                entry.discord
            );
        }
    }

    #[test]
    fn secret_is_kept_and_channel_lowercased() {
        let mapping =
            ChannelMapping::from_config(&table(&[("#dev", "#Dev-Talk hunter2")])).unwrap();
        let entry = mapping.irc_for("#dev").unwrap();
        assert_eq!(entry.irc, "#dev-talk");
        assert_eq!(entry.secret.as_deref(), Some("hunter2"));
    }

    #[test]
    fn rejects_malformed_values() {
        assert!(ChannelMapping::from_config(&table(&[("#a", "")])).is_err());
        assert!(ChannelMapping::from_config(&table(&[("#a", "lobby")])).is_err());
        assert!(ChannelMapping::from_config(&table(&[("#a", "#lobby key extra")])).is_err());
    }

    #[test]
    fn rejects_two_discord_channels_on_one_irc_channel() {
        let err = ChannelMapping::from_config(&table(&[("#a", "#lobby"), ("#b", "#LOBBY")]))
            .unwrap_err();
        assert!(matches!(err, BridgeError::AmbiguousMapping { .. }));
    }

    #[test]
    fn unknown_channels_miss() {
        let mapping = ChannelMapping::from_config(&table(&[("#general", "#lobby")])).unwrap();
        assert!(mapping.irc_for("#random").is_none());
        assert!(mapping.discord_for("#elsewhere").is_none());
    }
}
