//! Conversion logic between DTOs and domain entities.

use hibiki_shared::time::timestamp_to_rfc3339;

use crate::domain::{
    BroadcastEnvelope, DecodeError, DisplayName, InstanceId, Message, MessageBody,
    SystemNotice, Timestamp,
};
use crate::infrastructure::dto::{
    http::HistoryMessageDto,
    storage::StoredMessageDto,
    websocket::{InboundFrame, OutboundEnvelope},
};

/// What an inbound text frame asks the instance to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundCommand {
    Chat {
        display_name: DisplayName,
        body: MessageBody,
    },
    /// Well-formed frame with a tag this server does not act on.
    Ignored,
}

/// Decode a client text frame.
pub fn decode_inbound_frame(text: &str) -> Result<InboundCommand, DecodeError> {
    let frame: InboundFrame =
        serde_json::from_str(text).map_err(|e| DecodeError::Malformed(e.to_string()))?;

    match frame {
        InboundFrame::Chat { display_name, body } => Ok(InboundCommand::Chat {
            display_name: DisplayName::from_optional(display_name),
            body: MessageBody::new(body)?,
        }),
        InboundFrame::Unknown => Ok(InboundCommand::Ignored),
    }
}

/// Serialize an envelope once; the same text goes to every connection and over the bridge.
pub fn encode_envelope(envelope: &BroadcastEnvelope) -> String {
    let dto = OutboundEnvelope::from(envelope.clone());
    // Plain strings and integers only, serialization cannot fail.
    serde_json::to_string(&dto).unwrap_or_default()
}

/// Decode a bridge payload.
pub fn decode_envelope(text: &str) -> Result<BroadcastEnvelope, DecodeError> {
    let dto: OutboundEnvelope =
        serde_json::from_str(text).map_err(|e| DecodeError::Malformed(e.to_string()))?;
    BroadcastEnvelope::try_from(dto)
}

// ========================================
// Domain Entity → DTO
// ========================================

impl From<BroadcastEnvelope> for OutboundEnvelope {
    fn from(envelope: BroadcastEnvelope) -> Self {
        match envelope {
            BroadcastEnvelope::System(notice) => Self::System {
                text: notice.text,
                instance_id: notice.instance_id.into_string(),
                issued_at: notice.issued_at.value(),
            },
            BroadcastEnvelope::Chat(message) => Self::Chat {
                display_name: message.display_name.into_string(),
                body: message.body.into_string(),
                instance_id: message.instance_id.into_string(),
                issued_at: message.created_at.value(),
            },
        }
    }
}

impl From<Message> for StoredMessageDto {
    fn from(message: Message) -> Self {
        Self {
            display_name: message.display_name.into_string(),
            body: message.body.into_string(),
            instance_id: message.instance_id.into_string(),
            created_at: message.created_at.value(),
        }
    }
}

impl From<Message> for HistoryMessageDto {
    fn from(message: Message) -> Self {
        Self {
            display_name: message.display_name.into_string(),
            body: message.body.into_string(),
            instance_id: message.instance_id.into_string(),
            created_at: timestamp_to_rfc3339(message.created_at.value()),
        }
    }
}

// ========================================
// DTO → Domain Entity
// ========================================

impl TryFrom<OutboundEnvelope> for BroadcastEnvelope {
    type Error = DecodeError;

    fn try_from(dto: OutboundEnvelope) -> Result<Self, Self::Error> {
        match dto {
            OutboundEnvelope::System {
                text,
                instance_id,
                issued_at,
            } => Ok(Self::System(SystemNotice {
                text,
                instance_id: InstanceId::new(instance_id)?,
                issued_at: Timestamp::new(issued_at),
            })),
            OutboundEnvelope::Chat {
                display_name,
                body,
                instance_id,
                issued_at,
            } => Ok(Self::Chat(Message {
                display_name: DisplayName::from_optional(Some(display_name)),
                body: MessageBody::new(body)?,
                instance_id: InstanceId::new(instance_id)?,
                created_at: Timestamp::new(issued_at),
            })),
        }
    }
}

impl TryFrom<StoredMessageDto> for Message {
    type Error = DecodeError;

    fn try_from(dto: StoredMessageDto) -> Result<Self, Self::Error> {
        Ok(Self {
            display_name: DisplayName::from_optional(Some(dto.display_name)),
            body: MessageBody::new(dto.body)?,
            instance_id: InstanceId::new(dto.instance_id)?,
            created_at: Timestamp::new(dto.created_at),
        })
    }
}
