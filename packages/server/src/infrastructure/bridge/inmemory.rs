//! InMemory Broadcast Bridge 実装
//!
//! `tokio::sync::broadcast` を 1 つのトピックとして使います。同じプロセス内の
//! 複数インスタンスは `topic()` の送信側を共有し、それぞれが自分のハンドルを持ちます。
//!
//! トピックの容量は `ServerConfig::topic_capacity` で決まります。容量を超えて遅れた
//! 購読者は古いエンベロープを読み飛ばし、その件数を warn ログに残します。

use async_trait::async_trait;
use futures_util::{StreamExt, stream};
use tokio::sync::broadcast::{self, error::RecvError};
use tokio_util::sync::CancellationToken;

use crate::domain::{BridgeError, BroadcastBridge, BroadcastEnvelope, EnvelopeStream};

pub struct InMemoryBroadcastBridge {
    topic: broadcast::Sender<BroadcastEnvelope>,
    /// Cancelled by `close()`; ends this handle's subscriptions.
    closed: CancellationToken,
}

impl InMemoryBroadcastBridge {
    pub fn new(topic: broadcast::Sender<BroadcastEnvelope>) -> Self {
        Self {
            topic,
            closed: CancellationToken::new(),
        }
    }

    /// A fresh topic to hand to one or more bridges.
    pub fn topic(capacity: usize) -> broadcast::Sender<BroadcastEnvelope> {
        broadcast::channel(capacity.max(1)).0
    }

    fn ensure_open(&self) -> Result<(), BridgeError> {
        if self.closed.is_cancelled() {
            return Err(BridgeError::Closed);
        }
        Ok(())
    }
}

#[async_trait]
impl BroadcastBridge for InMemoryBroadcastBridge {
    async fn publish(&self, envelope: &BroadcastEnvelope) -> Result<(), BridgeError> {
        self.ensure_open()?;

        match self.topic.send(envelope.clone()) {
            Ok(subscribers) => tracing::debug!("Published to {} subscribers", subscribers),
            Err(_) => tracing::debug!("Published with no subscribers"),
        }
        Ok(())
    }

    async fn subscribe(&self) -> Result<EnvelopeStream, BridgeError> {
        self.ensure_open()?;

        let deliveries = stream::unfold(self.topic.subscribe(), |mut receiver| async move {
            loop {
                match receiver.recv().await {
                    Ok(envelope) => return Some((envelope, receiver)),
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!("Subscription lagged, {} envelopes skipped", skipped);
                    }
                    Err(RecvError::Closed) => return None,
                }
            }
        });

        Ok(Box::pin(
            deliveries.take_until(self.closed.clone().cancelled_owned()),
        ))
    }

    async fn close(&self) {
        self.closed.cancel();
    }
}
