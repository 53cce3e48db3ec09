//! Event translation between IRC and Discord.
//!
//! [`RelayCore`] owns the channel mapping and every piece of request/reply
//! correlation state. Transports feed it one event at a time and execute the
//! [`Action`](bridge_core::event::Action)s it returns.

pub mod commands;
pub mod directory;
pub mod identity;
pub mod pending;
pub mod relay;
pub mod text;

pub use commands::{Command, CommandProcessor};
pub use directory::{Directory, Member, StaticDirectory, User};
pub use identity::IdentityRenderer;
pub use pending::{Correlation, NamesPurpose, Probe, ProbeKind};
pub use relay::RelayCore;
