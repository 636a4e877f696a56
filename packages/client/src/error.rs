//! Error types for the Hibiki clients.

use thiserror::Error;

/// Client-specific errors
#[derive(Debug, Error)]
pub enum ClientError {
    /// The server answered the upgrade with an HTTP error (503 while draining)
    #[error("Upgrade rejected with HTTP {0}")]
    Rejected(u16),

    /// Connection error
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// The server sent something that is not an envelope
    #[error("Protocol error: {0}")]
    Protocol(String),
}

impl From<tokio_tungstenite::tungstenite::Error> for ClientError {
    fn from(error: tokio_tungstenite::tungstenite::Error) -> Self {
        match error {
            tokio_tungstenite::tungstenite::Error::Http(response) => {
                Self::Rejected(response.status().as_u16())
            }
            other => Self::ConnectionError(other.to_string()),
        }
    }
}
