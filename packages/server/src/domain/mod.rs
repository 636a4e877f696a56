//! Domain layer: the vocabulary of the broadcaster.
//!
//! Pure types and the two dependency seams (`MessageRepository`,
//! `BroadcastBridge`). Nothing in here knows about sockets, JSON or Redis.

pub mod admission;
pub mod bridge;
pub mod entity;
pub mod envelope;
pub mod error;
pub mod repository;
pub mod value_object;

pub use admission::AdmissionGate;
pub use bridge::{BroadcastBridge, EnvelopeStream};
pub use entity::{ChatDraft, Connection, ConnectionState, Message};
pub use envelope::{BroadcastEnvelope, SystemNotice};
pub use error::{BridgeError, DecodeError, PersistenceError, TransportError, ValueObjectError};
pub use repository::MessageRepository;
pub use value_object::{
    ANONYMOUS_DISPLAY_NAME, ConnectionId, DisplayName, InstanceId, MAX_BODY_LENGTH, MessageBody,
    Timestamp,
};

#[cfg(test)]
pub use bridge::MockBroadcastBridge;
#[cfg(test)]
pub use repository::MockMessageRepository;
