//! Discord name lookups used while rewriting message text.
//!
//! The live implementation reads the serenity cache; [`StaticDirectory`] is an
//! in-memory stand-in used before Discord is ready and in tests.

use std::collections::HashMap;

/// A guild member as seen by mention rewriting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    pub id: u64,
    pub username: String,
    /// Guild nickname, if set.
    pub nickname: Option<String>,
}

impl Member {
    /// Guild nickname if set, else the account username.
    pub fn display_name(&self) -> &str {
        self.nickname.as_deref().unwrap_or(&self.username)
    }
}

/// A Discord account known to the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: u64,
    pub username: String,
}

/// Read-only view of Discord guild state.
pub trait Directory {
    fn member(&self, guild: u64, user: u64) -> Option<Member>;

    fn role_name(&self, guild: u64, role: u64) -> Option<String>;

    fn channel_name(&self, guild: u64, channel: u64) -> Option<String>;

    /// Members of the guild that hosts the Discord channel key (`#name` or id).
    fn channel_members(&self, channel: &str) -> Vec<Member>;

    /// Every user the client knows about, across guilds.
    fn users(&self) -> Vec<User>;
}

/// Directory backed by plain maps. Guild ids are ignored.
#[derive(Debug, Clone, Default)]
pub struct StaticDirectory {
    members: HashMap<u64, Member>,
    roles: HashMap<u64, String>,
    channels: HashMap<u64, String>,
    users: Vec<User>,
}

impl StaticDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a member; the member's account is also registered as a known user.
    pub fn with_member(mut self, id: u64, username: &str, nickname: Option<&str>) -> Self {
        self.members.insert(
            id,
            Member {
                id,
                username: username.to_string(),
                nickname: nickname.map(str::to_string),
            },
        );
        self.with_user(id, username)
    }

    /// Add a user who is not a member of the bridged guild.
    pub fn with_user(mut self, id: u64, username: &str) -> Self {
        if !self.users.iter().any(|u| u.id == id) {
            self.users.push(User {
                id,
                username: username.to_string(),
            });
        }
        self
    }

    pub fn with_role(mut self, id: u64, name: &str) -> Self {
        self.roles.insert(id, name.to_string());
        self
    }

    pub fn with_channel(mut self, id: u64, name: &str) -> Self {
        self.channels.insert(id, name.to_string());
        self
    }
}

impl Directory for StaticDirectory {
    fn member(&self, _guild: u64, user: u64) -> Option<Member> {
        self.members.get(&user).cloned()
    }

    fn role_name(&self, _guild: u64, role: u64) -> Option<String> {
        self.roles.get(&role).cloned()
    }

    fn channel_name(&self, _guild: u64, channel: u64) -> Option<String> {
        self.channels.get(&channel).cloned()
    }

    fn channel_members(&self, _channel: &str) -> Vec<Member> {
        let mut members: Vec<Member> = self.members.values().cloned().collect();
        members.sort_by_key(|m| m.id);
        members
    }

    fn users(&self) -> Vec<User> {
        self.users.clone()
    }
}
