//! Durable log writer trait.
//!
//! The domain defines the interface it needs; the infrastructure layer
//! provides the store (dependency inversion).

use async_trait::async_trait;

use super::{
    entity::{ChatDraft, Message},
    error::PersistenceError,
};

/// Append-only message store shared by every instance.
///
/// Implementations must tolerate concurrent writers from any number of
/// instances without extra coordination.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MessageRepository: Send + Sync {
    /// Persist a message and return it with its server-assigned timestamp.
    ///
    /// Must succeed before the message is published anywhere.
    async fn append(&self, draft: ChatDraft) -> Result<Message, PersistenceError>;

    /// The most recent `limit` messages, newest first.
    async fn recent(&self, limit: usize) -> Result<Vec<Message>, PersistenceError>;

    /// Release this instance's handle. Later calls fail with `PersistenceError::Closed`.
    async fn close(&self);
}
