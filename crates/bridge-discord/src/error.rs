/// Errors produced by the Discord side of the bridge.
#[derive(Debug, thiserror::Error)]
pub enum DiscordError {
    #[error("serenity error: {0}")]
    Serenity(#[from] serenity::Error),

    #[error("no bot token configured")]
    NoToken,

    #[error("channel {0} is not visible to the bot")]
    UnknownChannel(String),
}
