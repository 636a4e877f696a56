//! WebSocket message DTOs.

use serde::{Deserialize, Serialize};

/// Frame sent by a client. Only `chat` carries meaning; other tags are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "tag")]
pub enum InboundFrame {
    #[serde(rename = "chat")]
    Chat {
        #[serde(
            rename = "displayName",
            default,
            skip_serializing_if = "Option::is_none"
        )]
        display_name: Option<String>,
        body: String,
    },
    /// Any tag this server does not know, kept for forward-compatible clients.
    #[serde(other)]
    Unknown,
}

/// Envelope pushed to clients and carried over the broadcast bridge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "tag")]
pub enum OutboundEnvelope {
    #[serde(rename = "system", rename_all = "camelCase")]
    System {
        text: String,
        instance_id: String,
        /// Unix epoch milliseconds (UTC)
        issued_at: i64,
    },
    #[serde(rename = "chat", rename_all = "camelCase")]
    Chat {
        display_name: String,
        body: String,
        instance_id: String,
        /// Unix epoch milliseconds (UTC), assigned at persistence time
        issued_at: i64,
    },
}
