pub mod config;
pub mod error;
pub mod event;
pub mod mapping;

pub use config::BridgeConfig;
pub use error::{BridgeError, Result};
pub use mapping::ChannelMapping;
