use std::collections::BTreeMap;

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{BridgeError, Result};

pub const DEFAULT_IRC_PORT: u16 = 6667;
pub const DEFAULT_COMMAND_CHARACTER: &str = "!";
pub const DEFAULT_PENDING_TTL_SECS: u64 = 300; // 5 minutes

/// Top-level config (chatbridge.toml + CHATBRIDGE_* env overrides).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeConfig {
    pub irc: IrcConfig,
    pub discord: DiscordConfig,
    /// Discord channel key (`#name` or numeric id) → `"#irc-channel [secret]"`.
    #[serde(default)]
    pub channel_mapping: BTreeMap<String, String>,
    /// Discord channel key → alternate Discord channel key for automatic notices.
    #[serde(default)]
    pub remap: BTreeMap<String, String>,
    /// Discord channel key → webhook URL used to post under a custom name.
    #[serde(default)]
    pub webhooks: BTreeMap<String, String>,
    #[serde(default = "default_command_characters")]
    pub command_characters: Vec<String>,
    /// Color IRC-side nicknames of Discord authors.
    #[serde(default = "bool_true")]
    pub irc_nick_colors: bool,
    /// Raw IRC lines sent once after every successful registration.
    #[serde(default)]
    pub auto_send_commands: Vec<String>,
    /// Lifetime of an unanswered probe or query before it is forgotten.
    #[serde(default = "default_pending_ttl_secs")]
    pub pending_ttl_secs: u64,
    /// Discord usernames whose messages are never relayed.
    #[serde(default)]
    pub ignore_users: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IrcConfig {
    pub server: String,
    #[serde(default = "default_irc_port")]
    pub port: u16,
    pub nickname: String,
    /// USER name; falls back to the nickname.
    pub username: Option<String>,
    #[serde(default = "default_realname")]
    pub realname: String,
    /// Server password sent with PASS before registration.
    pub password: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscordConfig {
    pub token: String,
}

fn bool_true() -> bool {
    true
}
fn default_irc_port() -> u16 {
    DEFAULT_IRC_PORT
}
fn default_realname() -> String {
    "chatbridge".to_string()
}
fn default_command_characters() -> Vec<String> {
    vec![DEFAULT_COMMAND_CHARACTER.to_string()]
}
fn default_pending_ttl_secs() -> u64 {
    DEFAULT_PENDING_TTL_SECS
}

impl BridgeConfig {
    /// Load config from a TOML file with CHATBRIDGE_* env var overrides.
    ///
    /// Checks in order:
    ///   1. Explicit path argument
    ///   2. ~/.chatbridge/chatbridge.toml
    ///
    /// Nested keys are separated by a double underscore in env vars, e.g.
    /// `CHATBRIDGE_IRC__NICKNAME=relay`.
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let path = config_path
            .map(String::from)
            .unwrap_or_else(default_config_path);

        if std::path::Path::new(&path).exists() {
            tracing::debug!(path = %path, "loading config");
        } else {
            tracing::warn!(path = %path, "config file not found, using env only");
        }

        Self::from_figment(
            Figment::new()
                .merge(Toml::file(&path))
                .merge(Env::prefixed("CHATBRIDGE_").split("__")),
        )
    }

    /// Extract and validate a config from an already assembled figment.
    pub fn from_figment(figment: Figment) -> Result<Self> {
        let config: BridgeConfig = figment
            .extract()
            .map_err(|e| BridgeError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configs the bridge cannot run with.
    ///
    /// Mapping shape and ambiguity are checked by building the mapping once.
    pub fn validate(&self) -> Result<()> {
        if self.irc.server.trim().is_empty() {
            return Err(BridgeError::MissingField("irc.server"));
        }
        if self.irc.nickname.trim().is_empty() {
            return Err(BridgeError::MissingField("irc.nickname"));
        }
        if self.discord.token.trim().is_empty() {
            return Err(BridgeError::MissingField("discord.token"));
        }
        if self.channel_mapping.is_empty() {
            return Err(BridgeError::MissingField("channel_mapping"));
        }
        if self.command_characters.iter().any(|c| c.chars().count() != 1) {
            return Err(BridgeError::Config(
                "command_characters entries must be single characters".to_string(),
            ));
        }
        crate::mapping::ChannelMapping::from_config(&self.channel_mapping)?;
        Ok(())
    }

    /// The configured command prefixes as characters.
    pub fn command_prefixes(&self) -> Vec<char> {
        self.command_characters
            .iter()
            .filter_map(|c| c.chars().next())
            .collect()
    }
}

fn default_config_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.chatbridge/chatbridge.toml", home)
}
