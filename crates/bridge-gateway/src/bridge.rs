//! The relay loop: one task owns the relay state and reacts to both networks.

use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use bridge_core::event::{Action, DiscordPost, IrcEvent};
use bridge_discord::{CacheDirectory, DiscordEvent, DiscordSession};
use bridge_irc::IrcHandle;
use bridge_relay::{Directory, RelayCore, StaticDirectory};

pub struct Bridge {
    relay: RelayCore,
    irc: IrcHandle,
    posts: mpsc::Sender<DiscordPost>,
    session: watch::Sender<Option<DiscordSession>>,
    /// Live guild state once Discord is ready.
    directory: Option<CacheDirectory>,
    /// Used until then; resolves nothing.
    empty: StaticDirectory,
}

impl Bridge {
    pub fn new(
        relay: RelayCore,
        irc: IrcHandle,
        posts: mpsc::Sender<DiscordPost>,
        session: watch::Sender<Option<DiscordSession>>,
    ) -> Self {
        Self {
            relay,
            irc,
            posts,
            session,
            directory: None,
            empty: StaticDirectory::new(),
        }
    }

    /// Process events until both networks stop or Ctrl-C arrives.
    pub async fn run(
        mut self,
        mut irc_events: mpsc::Receiver<IrcEvent>,
        mut discord_events: mpsc::Receiver<DiscordEvent>,
    ) {
        let shutdown = tokio::signal::ctrl_c();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                Some(event) = irc_events.recv() => self.on_irc(event),
                Some(event) = discord_events.recv() => self.on_discord(event),
                _ = &mut shutdown => {
                    info!("shutdown requested");
                    break;
                }
                else => break,
            }
        }
    }

    pub fn on_irc(&mut self, event: IrcEvent) {
        let directory: &dyn Directory = match &self.directory {
            Some(live) => live,
            None => &self.empty,
        };
        let actions = self.relay.reverse(event, directory);
        self.dispatch(actions);
    }

    pub fn on_discord(&mut self, event: DiscordEvent) {
        match event {
            DiscordEvent::Ready(session) => {
                info!(bot = %session.bot_name, "Discord ready, relaying with live guild state");
                self.directory = Some(CacheDirectory::new(session.cache.clone()));
                self.session.send_replace(Some(session));
            }
            DiscordEvent::Message(msg) => {
                let directory: &dyn Directory = match &self.directory {
                    Some(live) => live,
                    None => &self.empty,
                };
                let actions = self.relay.forward(&msg, directory);
                self.dispatch(actions);
            }
        }
    }

    fn dispatch(&self, actions: Vec<Action>) {
        for action in actions {
            match action {
                Action::Irc(command) => {
                    debug!(?command, "to IRC");
                    self.irc.execute(&command);
                }
                Action::Discord(post) => {
                    debug!(channel = %post.channel, "to Discord");
                    if let Err(e) = self.posts.try_send(post) {
                        warn!(error = %e, "Discord delivery queue unavailable, dropping post");
                    }
                }
            }
        }
    }
}
