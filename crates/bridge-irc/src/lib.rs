pub mod backoff;
pub mod client;
pub mod error;
pub mod message;
pub mod session;

pub use client::{IrcClient, IrcHandle};
pub use error::IrcError;
pub use message::Message;
pub use session::Session;
