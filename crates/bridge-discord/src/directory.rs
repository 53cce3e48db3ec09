//! Name lookups over the serenity cache.

use std::collections::BTreeMap;
use std::sync::Arc;

use serenity::cache::Cache;
use serenity::model::channel::ChannelType;
use serenity::model::id::{ChannelId, GuildId, RoleId, UserId};

use bridge_relay::{Directory, Member, User};

/// A Discord channel key as written in the channel mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelKey<'a> {
    /// `#name`, matched against text channel names.
    Name(&'a str),
    Id(u64),
}

impl<'a> ChannelKey<'a> {
    /// `None` for keys that are neither `#name` nor a non-zero id.
    pub fn parse(key: &'a str) -> Option<Self> {
        match key.strip_prefix('#') {
            Some(name) if !name.is_empty() => Some(Self::Name(name)),
            Some(_) => None,
            None => key.parse::<u64>().ok().filter(|&id| id != 0).map(Self::Id),
        }
    }
}

/// Find the guild and channel a mapping key refers to.
///
/// Names are matched against text and announcement channels only; the first
/// cached guild holding a match wins.
pub fn resolve_channel(cache: &Cache, key: &str) -> Option<(GuildId, ChannelId)> {
    let key = ChannelKey::parse(key)?;

    for guild_id in cache.guilds() {
        let Some(guild) = cache.guild(guild_id) else {
            continue;
        };
        let found = match key {
            ChannelKey::Name(name) => guild
                .channels
                .values()
                .find(|c| c.name == name && matches!(c.kind, ChannelType::Text | ChannelType::News))
                .map(|c| c.id),
            ChannelKey::Id(id) => {
                let id = ChannelId::new(id);
                guild.channels.contains_key(&id).then_some(id)
            }
        };
        if let Some(channel_id) = found {
            return Some((guild_id, channel_id));
        }
    }
    None
}

/// [`Directory`] reading live guild state from the serenity cache.
#[derive(Clone)]
pub struct CacheDirectory {
    cache: Arc<Cache>,
}

impl CacheDirectory {
    pub fn new(cache: Arc<Cache>) -> Self {
        Self { cache }
    }

    fn guild_members(&self, guild_id: GuildId) -> Vec<Member> {
        let Some(guild) = self.cache.guild(guild_id) else {
            return Vec::new();
        };
        let mut members: Vec<Member> = guild
            .members
            .values()
            .map(|m| Member {
                id: m.user.id.get(),
                username: m.user.name.clone(),
                nickname: m.nick.clone(),
            })
            .collect();
        members.sort_by_key(|m| m.id);
        members
    }
}

impl Directory for CacheDirectory {
    fn member(&self, guild: u64, user: u64) -> Option<Member> {
        let (guild, user) = (non_zero(guild)?, non_zero(user)?);
        let guild = self.cache.guild(GuildId::new(guild))?;
        let member = guild.members.get(&UserId::new(user))?;
        Some(Member {
            id: user,
            username: member.user.name.clone(),
            nickname: member.nick.clone(),
        })
    }

    fn role_name(&self, guild: u64, role: u64) -> Option<String> {
        let (guild, role) = (non_zero(guild)?, non_zero(role)?);
        let guild = self.cache.guild(GuildId::new(guild))?;
        guild.roles.get(&RoleId::new(role)).map(|r| r.name.clone())
    }

    fn channel_name(&self, guild: u64, channel: u64) -> Option<String> {
        let (guild, channel) = (non_zero(guild)?, non_zero(channel)?);
        let guild = self.cache.guild(GuildId::new(guild))?;
        guild
            .channels
            .get(&ChannelId::new(channel))
            .map(|c| c.name.clone())
    }

    fn channel_members(&self, channel: &str) -> Vec<Member> {
        match resolve_channel(&self.cache, channel) {
            Some((guild_id, _)) => self.guild_members(guild_id),
            None => Vec::new(),
        }
    }

    fn users(&self) -> Vec<User> {
        // Keyed by id so members of several guilds appear once.
        let mut users = BTreeMap::new();
        for guild_id in self.cache.guilds() {
            for member in self.guild_members(guild_id) {
                users.entry(member.id).or_insert(User {
                    id: member.id,
                    username: member.username,
                });
            }
        }
        users.into_values().collect()
    }
}

/// Serenity ids panic on zero.
fn non_zero(id: u64) -> Option<u64> {
    (id != 0).then_some(id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_keys() {
        assert_eq!(ChannelKey::parse("#general"), Some(ChannelKey::Name("general")));
        assert_eq!(
            ChannelKey::parse("1234567890"),
            Some(ChannelKey::Id(1234567890))
        );
        assert_eq!(ChannelKey::parse("#"), None);
        assert_eq!(ChannelKey::parse("0"), None);
        assert_eq!(ChannelKey::parse("general"), None);
    }

    #[test]
    fn empty_cache_resolves_nothing() {
        let cache = Arc::new(Cache::new());
        assert_eq!(resolve_channel(&cache, "#general"), None);

        let directory = CacheDirectory::new(cache);
        assert!(directory.channel_members("#general").is_empty());
        assert!(directory.users().is_empty());
        assert_eq!(directory.member(1, 2), None);
        assert_eq!(directory.role_name(0, 2), None);
    }
}
