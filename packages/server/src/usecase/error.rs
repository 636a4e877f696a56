//! UseCase errors.

use thiserror::Error;

use crate::domain::{BridgeError, PersistenceError};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConnectError {
    #[error("instance is draining and no longer admits connections")]
    Draining,
}

/// Why a chat message did not propagate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SendMessageError {
    /// Not stored, so not published either.
    #[error("message was not persisted: {0}")]
    Persistence(#[from] PersistenceError),

    /// Stored but not published; no instance delivers it.
    #[error("message was persisted but not published: {0}")]
    Bridge(#[from] BridgeError),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GetHistoryError {
    #[error("history unavailable: {0}")]
    Persistence(#[from] PersistenceError),
}
