//! Request/reply correlation for IRC queries and CTCP probes.
//!
//! Every request is queued per IRC channel (queries) or per peer (probes) and
//! consumed first-in first-out by the matching reply. Entries older than the
//! configured TTL are dropped by [`Correlation::prune`].

use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

/// Why a version probe was sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeKind {
    /// Sent automatically when a peer joined.
    Auto,
    /// Sent because someone ran the versions command.
    Manual,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Probe {
    /// Lowercased IRC channel the reply should be reported to.
    pub origin: String,
    pub kind: ProbeKind,
}

/// What a queued NAMES request is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NamesPurpose {
    /// Announce the user list.
    Users,
    /// Probe every listed user for their client version.
    Versions,
}

#[derive(Debug, Clone)]
struct Pending<T> {
    value: T,
    issued: Instant,
}

#[derive(Debug)]
pub struct Correlation {
    ttl: Duration,
    topics: HashMap<String, VecDeque<Pending<()>>>,
    names: HashMap<String, VecDeque<Pending<NamesPurpose>>>,
    probes: HashMap<String, VecDeque<Pending<Probe>>>,
}

impl Correlation {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            topics: HashMap::new(),
            names: HashMap::new(),
            probes: HashMap::new(),
        }
    }

    pub fn request_topic(&mut self, channel: &str, now: Instant) {
        push(&mut self.topics, channel, (), now);
    }

    /// Consume the oldest topic request for `channel`. `false` means the
    /// reply was not asked for by a command.
    pub fn take_topic(&mut self, channel: &str) -> bool {
        pop(&mut self.topics, channel).is_some()
    }

    pub fn request_names(&mut self, channel: &str, purpose: NamesPurpose, now: Instant) {
        push(&mut self.names, channel, purpose, now);
    }

    pub fn take_names(&mut self, channel: &str) -> Option<NamesPurpose> {
        pop(&mut self.names, channel)
    }

    pub fn record_probe(&mut self, nick: &str, probe: Probe, now: Instant) {
        push(&mut self.probes, nick, probe, now);
    }

    pub fn take_probe(&mut self, nick: &str) -> Option<Probe> {
        pop(&mut self.probes, nick)
    }

    /// Number of unanswered probes for `nick`.
    pub fn pending_probes(&self, nick: &str) -> usize {
        self.probes
            .get(&nick.to_lowercase())
            .map_or(0, VecDeque::len)
    }

    /// Total number of outstanding entries of any kind.
    pub fn len(&self) -> usize {
        queued(&self.topics) + queued(&self.names) + queued(&self.probes)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every entry issued more than the TTL before `now`.
    /// Returns how many entries were removed.
    pub fn prune(&mut self, now: Instant) -> usize {
        let ttl = self.ttl;
        expire(&mut self.topics, now, ttl)
            + expire(&mut self.names, now, ttl)
            + expire(&mut self.probes, now, ttl)
    }
}

fn push<T>(map: &mut HashMap<String, VecDeque<Pending<T>>>, key: &str, value: T, now: Instant) {
    map.entry(key.to_lowercase())
        .or_default()
        .push_back(Pending { value, issued: now });
}

fn pop<T>(map: &mut HashMap<String, VecDeque<Pending<T>>>, key: &str) -> Option<T> {
    let key = key.to_lowercase();
    let queue = map.get_mut(&key)?;
    let entry = queue.pop_front();
    if queue.is_empty() {
        map.remove(&key);
    }
    entry.map(|p| p.value)
}

fn queued<T>(map: &HashMap<String, VecDeque<Pending<T>>>) -> usize {
    map.values().map(VecDeque::len).sum()
}

fn expire<T>(map: &mut HashMap<String, VecDeque<Pending<T>>>, now: Instant, ttl: Duration) -> usize {
    let mut removed = 0;
    map.retain(|_, queue| {
        let before = queue.len();
        queue.retain(|p| now.saturating_duration_since(p.issued) < ttl);
        removed += before - queue.len();
        !queue.is_empty()
    });
    removed
}
