use thiserror::Error;

/// Errors that can occur on the IRC connection.
#[derive(Debug, Error)]
pub enum IrcError {
    /// The TCP connection could not be established.
    #[error("Connection failed: {0}")]
    ConnectionFailed(#[from] std::io::Error),

    /// The line codec rejected incoming data.
    #[error("Codec error: {0}")]
    Codec(#[from] tokio_util::codec::LinesCodecError),

    /// The server closed the connection or sent ERROR.
    #[error("Disconnected: {0}")]
    Disconnected(String),

    /// Registration did not complete in time.
    #[error("Registration timed out after {secs}s")]
    RegistrationTimeout { secs: u64 },
}
