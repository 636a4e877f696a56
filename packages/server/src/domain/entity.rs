//! Entities.

use std::net::SocketAddr;

use serde::Serialize;

use super::value_object::{ConnectionId, DisplayName, InstanceId, MessageBody, Timestamp};

/// Socket lifecycle of a connection.
///
/// `Open → Closing → Closed`, or `Open → Closed` on an abrupt error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    Open,
    Closing,
    Closed,
}

/// One accepted client socket, owned by the registry of the instance that accepted it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Connection {
    pub id: ConnectionId,
    pub remote_addr: SocketAddr,
    pub instance_id: InstanceId,
    pub connected_at: Timestamp,
    state: ConnectionState,
}

impl Connection {
    pub fn new(
        id: ConnectionId,
        remote_addr: SocketAddr,
        instance_id: InstanceId,
        connected_at: Timestamp,
    ) -> Self {
        Self {
            id,
            remote_addr,
            instance_id,
            connected_at,
            state: ConnectionState::Open,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_open(&self) -> bool {
        self.state == ConnectionState::Open
    }

    /// `Open → Closing`. Returns `false` if the connection was not open.
    pub fn begin_closing(&mut self) -> bool {
        if self.state != ConnectionState::Open {
            return false;
        }
        self.state = ConnectionState::Closing;
        true
    }

    /// Terminal transition, allowed from any state.
    pub fn mark_closed(&mut self) {
        self.state = ConnectionState::Closed;
    }
}

/// A decoded chat frame that has not been persisted yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatDraft {
    pub display_name: DisplayName,
    pub body: MessageBody,
    pub instance_id: InstanceId,
}

impl ChatDraft {
    pub fn new(display_name: DisplayName, body: MessageBody, instance_id: InstanceId) -> Self {
        Self {
            display_name,
            body,
            instance_id,
        }
    }
}

/// A persisted chat message. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Message {
    pub display_name: DisplayName,
    pub body: MessageBody,
    pub instance_id: InstanceId,
    /// Assigned by the store at persistence time, never taken from the client.
    pub created_at: Timestamp,
}

impl Message {
    pub fn from_draft(draft: ChatDraft, created_at: Timestamp) -> Self {
        Self {
            display_name: draft.display_name,
            body: draft.body,
            instance_id: draft.instance_id,
            created_at,
        }
    }
}
