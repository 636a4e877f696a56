//! Supervision of the bridge subscription.
//!
//! Losing the subscription must not silently turn the cluster into isolated
//! per-instance rooms, so the supervisor resubscribes with exponential
//! backoff and exposes the state as [`BridgeHealth`].

use std::sync::Arc;

use futures_util::StreamExt;
use serde::Serialize;
use tokio::{sync::watch, task::JoinHandle};
use tokio_util::sync::CancellationToken;

use crate::{
    domain::{BridgeError, BroadcastBridge, BroadcastEnvelope, EnvelopeStream},
    infrastructure::hub::HubHandle,
};

use super::backoff::ExponentialBackoff;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BridgeHealth {
    Connecting,
    Connected,
    Disconnected,
}

impl BridgeHealth {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Disconnected => "disconnected",
        }
    }
}

pub struct BridgeSupervisor {
    bridge: Arc<dyn BroadcastBridge>,
    hub: HubHandle,
    health: watch::Sender<BridgeHealth>,
    backoff: ExponentialBackoff,
    cancel: CancellationToken,
}

impl BridgeSupervisor {
    pub fn new(
        bridge: Arc<dyn BroadcastBridge>,
        hub: HubHandle,
        backoff: ExponentialBackoff,
        cancel: CancellationToken,
    ) -> (Self, watch::Receiver<BridgeHealth>) {
        let (health, health_rx) = watch::channel(BridgeHealth::Connecting);
        (
            Self {
                bridge,
                hub,
                health,
                backoff,
                cancel,
            },
            health_rx,
        )
    }

    /// Subscribe once inline, then keep the subscription alive in the background.
    ///
    /// An error here means the bridge is unreachable at start-up.
    pub async fn bootstrap(self) -> Result<JoinHandle<()>, BridgeError> {
        let stream = self.bridge.subscribe().await?;
        self.health.send_replace(BridgeHealth::Connected);
        Ok(tokio::spawn(self.run(Some(stream))))
    }

    /// Start in the background without an initial subscription.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run(None))
    }

    async fn run(mut self, mut subscription: Option<EnvelopeStream>) {
        loop {
            let stream = match subscription.take() {
                Some(stream) => stream,
                None => {
                    let attempt = tokio::select! {
                        result = self.bridge.subscribe() => result,
                        () = self.cancel.cancelled() => break,
                    };
                    match attempt {
                        Ok(stream) => {
                            tracing::info!("Bridge subscription established");
                            stream
                        }
                        Err(e) => {
                            self.health.send_replace(BridgeHealth::Disconnected);
                            tracing::warn!("Bridge subscription failed: {}", e);
                            if !self.wait_backoff().await {
                                break;
                            }
                            continue;
                        }
                    }
                }
            };

            self.health.send_replace(BridgeHealth::Connected);
            self.backoff.reset();
            self.forward(stream).await;

            if self.cancel.is_cancelled() {
                break;
            }
            self.health.send_replace(BridgeHealth::Disconnected);
            tracing::warn!("Bridge subscription lost, delivering to local connections only");
            if !self.wait_backoff().await {
                break;
            }
        }

        self.health.send_replace(BridgeHealth::Disconnected);
        tracing::debug!("Bridge supervisor stopped");
    }

    /// Hand deliveries to the hub until the stream ends or the supervisor is cancelled.
    async fn forward(&self, mut stream: EnvelopeStream) {
        loop {
            tokio::select! {
                delivery = stream.next() => match delivery {
                    Some(envelope) => self.route(envelope),
                    None => return,
                },
                () = self.cancel.cancelled() => return,
            }
        }
    }

    fn route(&self, envelope: BroadcastEnvelope) {
        match envelope {
            BroadcastEnvelope::Chat(_) => self.hub.deliver(envelope),
            BroadcastEnvelope::System(notice) => tracing::debug!(
                "Ignoring system notice from instance '{}' on the bridge",
                notice.instance_id
            ),
        }
    }

    /// Sleep the next backoff delay. Returns `false` if cancelled meanwhile.
    async fn wait_backoff(&mut self) -> bool {
        let delay = self.backoff.next_delay();
        tracing::info!("Resubscribing to the bridge in {:?}", delay);
        tokio::select! {
            () = tokio::time::sleep(delay) => true,
            () = self.cancel.cancelled() => false,
        }
    }
}
