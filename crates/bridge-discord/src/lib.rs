pub mod adapter;
pub mod delivery;
pub mod directory;
pub mod error;
pub mod handler;
pub mod send;
pub mod webhook;

pub use adapter::{DiscordAdapter, DiscordEvent, DiscordSession};
pub use delivery::run_delivery;
pub use directory::CacheDirectory;
pub use error::DiscordError;
