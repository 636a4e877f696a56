//! Error taxonomy.
//!
//! Connection-scoped errors (`DecodeError`, `TransportError`) are contained per
//! connection. Dependency-scoped errors (`PersistenceError`, `BridgeError`) are
//! contained per message. None of them stop the instance.

use std::time::Duration;

use thiserror::Error;

use super::value_object::ConnectionId;

/// Value object validation errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValueObjectError {
    #[error("instance id must not be empty")]
    EmptyInstanceId,

    #[error("message body must not be empty")]
    EmptyBody,

    #[error("message body has {length} characters (max {max})")]
    BodyTooLong { length: usize, max: usize },
}

/// A malformed inbound frame. Logged; the connection stays open.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("malformed frame: {0}")]
    Malformed(String),

    #[error("invalid chat frame: {0}")]
    Invalid(#[from] ValueObjectError),
}

/// The durable store could not accept or return messages.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PersistenceError {
    #[error("message store unavailable: {0}")]
    Unavailable(String),

    #[error("message store rejected the write: {0}")]
    Rejected(String),

    #[error("message store did not answer within {0:?}")]
    Timeout(Duration),

    #[error("message store handle already closed")]
    Closed,
}

/// The broadcast bridge could not publish or deliver.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BridgeError {
    #[error("broadcast bridge unavailable: {0}")]
    Unavailable(String),

    #[error("broadcast bridge did not answer within {0:?}")]
    Timeout(Duration),

    #[error("broadcast bridge handle already closed")]
    Closed,
}

/// Sending to one connection failed. Only that connection is affected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("outbound channel of connection {0} is closed")]
    ChannelClosed(ConnectionId),
}
