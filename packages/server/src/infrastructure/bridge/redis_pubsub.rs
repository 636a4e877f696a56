//! Redis pub/sub Broadcast Bridge 実装
//!
//! - 発行: `PUBLISH`（`ConnectionManager` が切断後に自動で再接続する）
//! - 購読: 購読ごとに専用の pub/sub 接続を開く。接続が切れるとストリームが終了し、
//!   再購読は `BridgeSupervisor` が担当する

use async_trait::async_trait;
use futures_util::StreamExt;
use redis::{AsyncCommands, aio::ConnectionManager};
use tokio_util::sync::CancellationToken;

use crate::{
    domain::{BridgeError, BroadcastBridge, BroadcastEnvelope, EnvelopeStream},
    infrastructure::dto::conversion::{decode_envelope, encode_envelope},
};

pub struct RedisBroadcastBridge {
    client: redis::Client,
    publisher: ConnectionManager,
    channel: String,
    closed: CancellationToken,
}

impl RedisBroadcastBridge {
    /// Connect the publishing side. Failing here aborts start-up.
    pub async fn connect(client: &redis::Client, channel: String) -> Result<Self, BridgeError> {
        let publisher = ConnectionManager::new(client.clone())
            .await
            .map_err(|e| BridgeError::Unavailable(e.to_string()))?;
        tracing::info!("Broadcast bridge connected (channel '{}')", channel);

        Ok(Self {
            client: client.clone(),
            publisher,
            channel,
            closed: CancellationToken::new(),
        })
    }

    fn ensure_open(&self) -> Result<(), BridgeError> {
        if self.closed.is_cancelled() {
            return Err(BridgeError::Closed);
        }
        Ok(())
    }
}

#[async_trait]
impl BroadcastBridge for RedisBroadcastBridge {
    async fn publish(&self, envelope: &BroadcastEnvelope) -> Result<(), BridgeError> {
        self.ensure_open()?;

        let payload = encode_envelope(envelope);
        let mut publisher = self.publisher.clone();
        let receivers: i64 = publisher
            .publish(&self.channel, payload)
            .await
            .map_err(|e| BridgeError::Unavailable(e.to_string()))?;
        tracing::debug!("Published to {} subscribed instances", receivers);
        Ok(())
    }

    async fn subscribe(&self) -> Result<EnvelopeStream, BridgeError> {
        self.ensure_open()?;

        let mut pubsub = self
            .client
            .get_async_pubsub()
            .await
            .map_err(|e| BridgeError::Unavailable(e.to_string()))?;
        pubsub
            .subscribe(&self.channel)
            .await
            .map_err(|e| BridgeError::Unavailable(e.to_string()))?;
        tracing::info!("Subscribed to channel '{}'", self.channel);

        let deliveries = pubsub.into_on_message().filter_map(|message| async move {
            let payload: String = match message.get_payload() {
                Ok(payload) => payload,
                Err(e) => {
                    tracing::warn!("Dropping non-text bridge payload: {}", e);
                    return None;
                }
            };
            match decode_envelope(&payload) {
                Ok(envelope) => Some(envelope),
                Err(e) => {
                    tracing::warn!("Dropping undecodable bridge payload: {}", e);
                    None
                }
            }
        });

        Ok(Box::pin(
            deliveries.take_until(self.closed.clone().cancelled_owned()),
        ))
    }

    async fn close(&self) {
        if !self.closed.is_cancelled() {
            self.closed.cancel();
            tracing::info!("Broadcast bridge handle released");
        }
    }
}
