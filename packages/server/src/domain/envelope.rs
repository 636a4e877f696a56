//! The unit carried over the broadcast bridge and pushed to clients.

use super::{
    entity::Message,
    value_object::{InstanceId, Timestamp},
};

/// An instance-local control notice. Never persisted, never re-broadcast.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemNotice {
    pub text: String,
    pub instance_id: InstanceId,
    pub issued_at: Timestamp,
}

impl SystemNotice {
    /// Sent to a connection right after it is admitted.
    pub fn welcome(instance_id: &InstanceId, issued_at: Timestamp) -> Self {
        Self {
            text: format!("Connected to instance {instance_id}"),
            instance_id: instance_id.clone(),
            issued_at,
        }
    }

    /// Sent to every open connection when the instance starts draining.
    pub fn shutdown(instance_id: &InstanceId, issued_at: Timestamp) -> Self {
        Self {
            text: format!("Instance {instance_id} is shutting down, please reconnect"),
            instance_id: instance_id.clone(),
            issued_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BroadcastEnvelope {
    System(SystemNotice),
    /// Reaches local connections only through the bridge round trip.
    Chat(Message),
}
