use std::time::{Duration, Instant};

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_util::codec::{Framed, LinesCodec};
use tracing::{debug, info, warn};

use bridge_core::config::IrcConfig;
use bridge_core::event::{IrcCommand, IrcEvent};

use crate::backoff::Backoff;
use crate::error::IrcError;
use crate::message::{self, Message};
use crate::session::Session;

/// Lines waiting to be written; overflow is dropped, never awaited.
const OUTBOUND_QUEUE: usize = 512;
/// Servers send at most 512 bytes per line; tags can push it to 8 KB.
const MAX_LINE_BYTES: usize = 8 * 1024;
/// Drop the connection if the server never sends 001.
const REGISTRATION_TIMEOUT_SECS: u64 = 60;
/// Lines that may go out back-to-back before pacing kicks in.
const SEND_BURST: u32 = 5;
const SEND_INTERVAL: Duration = Duration::from_millis(700);

/// Sending side of the IRC connection.
///
/// Cheap to clone. Commands are queued and written by the connection task;
/// callers never wait on the socket.
#[derive(Debug, Clone)]
pub struct IrcHandle {
    tx: mpsc::Sender<String>,
}

impl IrcHandle {
    /// Create a handle and the queue it feeds.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<String>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx }, rx)
    }

    pub fn execute(&self, command: &IrcCommand) {
        for line in message::render(command) {
            if let Err(e) = self.tx.try_send(line) {
                warn!(error = %e, "IRC outbound queue unavailable, dropping line");
            }
        }
    }
}

/// IRC connection driver.
///
/// Connects, registers, and keeps reconnecting with backoff whenever the
/// connection drops. Parsed events are pushed into `events`.
pub struct IrcClient {
    config: IrcConfig,
    events: mpsc::Sender<IrcEvent>,
    outbound: mpsc::Receiver<String>,
}

impl IrcClient {
    pub fn new(config: &IrcConfig, events: mpsc::Sender<IrcEvent>) -> (Self, IrcHandle) {
        let (handle, outbound) = IrcHandle::channel(OUTBOUND_QUEUE);
        let client = Self {
            config: config.clone(),
            events,
            outbound,
        };
        (client, handle)
    }

    /// Run until the event receiver is dropped.
    pub async fn run(mut self) {
        let mut backoff = Backoff::new();

        loop {
            info!(server = %self.config.server, port = self.config.port, "IRC: connecting");

            match self.connect_and_serve(&mut backoff).await {
                Ok(()) => {
                    info!("IRC: event receiver closed, stopping");
                    return;
                }
                Err(e) => {
                    warn!(error = %e, "IRC: connection lost");
                    if self.events.send(IrcEvent::Error(e.to_string())).await.is_err() {
                        return;
                    }
                }
            }

            let delay = backoff.next_delay();
            info!(
                attempt = backoff.attempts(),
                retry_after_secs = delay.as_secs(),
                "IRC: reconnecting with backoff"
            );
            tokio::time::sleep(delay).await;
        }
    }

    /// Serve one connection. `Ok(())` means the bridge is shutting down.
    async fn connect_and_serve(&mut self, backoff: &mut Backoff) -> Result<(), IrcError> {
        let stream = TcpStream::connect((self.config.server.as_str(), self.config.port)).await?;
        let mut framed = Framed::new(stream, LinesCodec::new_with_max_length(MAX_LINE_BYTES));
        let mut session = Session::new(&self.config.nickname);
        let mut pacer = Pacer::new(SEND_BURST, SEND_INTERVAL);

        let user = self
            .config
            .username
            .as_deref()
            .unwrap_or(&self.config.nickname);
        for line in message::registration(
            &self.config.nickname,
            user,
            &self.config.realname,
            self.config.password.as_deref(),
        ) {
            framed.send(line).await?;
        }

        let deadline =
            tokio::time::Instant::now() + Duration::from_secs(REGISTRATION_TIMEOUT_SECS);
        let registration_timer = tokio::time::sleep_until(deadline);
        tokio::pin!(registration_timer);

        loop {
            tokio::select! {
                incoming = framed.next() => {
                    let Some(line) = incoming else {
                        return Err(IrcError::Disconnected("server closed the connection".to_string()));
                    };
                    let line = line?;
                    let Some(msg) = Message::parse(&line) else {
                        continue;
                    };

                    let outcome = session.handle(&msg);
                    for reply in outcome.replies {
                        framed.send(reply).await?;
                    }
                    for event in outcome.events {
                        if let IrcEvent::Connected { nick } = &event {
                            info!(nick = %nick, "IRC: registered");
                            backoff.reset();
                        }
                        if self.events.send(event).await.is_err() {
                            return Ok(());
                        }
                    }
                }
                Some(line) = self.outbound.recv(), if session.is_registered() => {
                    let wait = pacer.delay(Instant::now());
                    if !wait.is_zero() {
                        debug!(wait_ms = wait.as_millis() as u64, "IRC: pacing outbound line");
                        tokio::time::sleep(wait).await;
                    }
                    framed.send(line).await?;
                }
                _ = &mut registration_timer, if !session.is_registered() => {
                    return Err(IrcError::RegistrationTimeout { secs: REGISTRATION_TIMEOUT_SECS });
                }
            }
        }
    }
}

/// Flood pacing: `burst` lines pass immediately, then one per `interval`.
#[derive(Debug)]
struct Pacer {
    burst: u32,
    interval: Duration,
    /// Virtual send clock; runs ahead of real time while lines are queued.
    clock: Option<Instant>,
}

impl Pacer {
    fn new(burst: u32, interval: Duration) -> Self {
        Self {
            burst,
            interval,
            clock: None,
        }
    }

    /// How long to wait before sending a line at `now`.
    fn delay(&mut self, now: Instant) -> Duration {
        let start = self.clock.map_or(now, |c| c.max(now));
        let clock = start + self.interval;
        self.clock = Some(clock);
        (clock - now).saturating_sub(self.interval * self.burst)
    }
}
