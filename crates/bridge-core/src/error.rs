use thiserror::Error;

#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Malformed channel mapping for {key}: {reason}")]
    MalformedMapping { key: String, reason: String },

    #[error("Ambiguous channel mapping: {irc} is mapped from both {first} and {second}")]
    AmbiguousMapping {
        irc: String,
        first: String,
        second: String,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl BridgeError {
    /// Short error code string used in log fields.
    pub fn code(&self) -> &'static str {
        match self {
            BridgeError::Config(_) => "CONFIG_ERROR",
            BridgeError::MissingField(_) => "MISSING_FIELD",
            BridgeError::MalformedMapping { .. } => "MALFORMED_MAPPING",
            BridgeError::AmbiguousMapping { .. } => "AMBIGUOUS_MAPPING",
            BridgeError::Io(_) => "IO_ERROR",
        }
    }
}

pub type Result<T> = std::result::Result<T, BridgeError>;
