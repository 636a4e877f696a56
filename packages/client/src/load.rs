//! Load harness: many connections, one message, exactly one delivery each.
//!
//! Connections are spread round-robin over the given instance URLs. Every
//! connection must see its welcome notice before the marker message is sent
//! through the first connection.

use std::{collections::BTreeMap, time::Duration};

use futures_util::{SinkExt, StreamExt};
use hibiki_server::infrastructure::dto::websocket::OutboundEnvelope;
use tokio::{net::TcpStream, task::JoinSet};
use tokio_tungstenite::{
    MaybeTlsStream, WebSocketStream, connect_async, tungstenite::protocol::Message,
};
use uuid::Uuid;

use crate::{chat::chat_frame, error::ClientError};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

#[derive(Debug, Clone)]
pub struct LoadConfig {
    pub urls: Vec<String>,
    pub connections: usize,
    /// Bound on each upgrade plus its welcome notice
    pub connect_timeout: Duration,
    /// How long each connection listens for the marker message
    pub delivery_timeout: Duration,
}

/// Outcome of one run.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LoadReport {
    pub connections: usize,
    /// Connections that received the marker exactly once
    pub delivered: usize,
    /// Connections that never received it
    pub missing: usize,
    /// Extra copies beyond the first, summed over all connections
    pub duplicates: usize,
    /// Open connections per instance, from the welcome notices
    pub per_instance: BTreeMap<String, usize>,
}

impl LoadReport {
    /// Build the report from how many copies each connection received.
    pub fn from_counts(counts: &[usize], per_instance: BTreeMap<String, usize>) -> Self {
        let mut report = Self {
            connections: counts.len(),
            per_instance,
            ..Self::default()
        };
        for &count in counts {
            match count {
                0 => report.missing += 1,
                1 => report.delivered += 1,
                n => {
                    report.delivered += 1;
                    report.duplicates += n - 1;
                }
            }
        }
        report
    }

    /// Every connection got exactly one copy.
    pub fn is_exact(&self) -> bool {
        self.missing == 0 && self.duplicates == 0 && self.delivered == self.connections
    }
}

/// Open the connections, send one marker and count deliveries.
pub async fn run_load(config: LoadConfig) -> Result<LoadReport, ClientError> {
    if config.urls.is_empty() {
        return Err(ClientError::ConnectionError("no instance URL given".to_string()));
    }

    let mut streams = Vec::with_capacity(config.connections);
    let mut per_instance = BTreeMap::new();
    for index in 0..config.connections {
        let url = &config.urls[index % config.urls.len()];
        let (stream, instance_id) = open(url, config.connect_timeout).await?;
        *per_instance.entry(instance_id).or_insert(0) += 1;
        streams.push(stream);
        if (index + 1) % 500 == 0 {
            tracing::info!("{} connections open", index + 1);
        }
    }
    tracing::info!("All {} connections welcomed: {:?}", streams.len(), per_instance);

    let marker = format!("marker-{}", Uuid::new_v4());
    let mut listeners = JoinSet::new();
    for (index, mut stream) in streams.into_iter().enumerate() {
        let marker = marker.clone();
        let wait = config.delivery_timeout;
        listeners.spawn(async move {
            if index == 0 {
                let frame = chat_frame(Some("load"), &marker);
                if let Err(e) = stream.send(Message::Text(frame.into())).await {
                    tracing::warn!("Failed to send marker: {}", e);
                }
            }
            let count = count_copies(&mut stream, &marker, wait).await;
            let _ = stream.close(None).await;
            count
        });
    }

    let mut counts = Vec::with_capacity(config.connections);
    while let Some(result) = listeners.join_next().await {
        counts.push(result.unwrap_or(0));
    }

    Ok(LoadReport::from_counts(&counts, per_instance))
}

/// Connect and wait for the welcome notice; returns the serving instance id.
async fn open(url: &str, wait: Duration) -> Result<(WsStream, String), ClientError> {
    let attempt = async {
        let (mut stream, _) = connect_async(url).await?;
        while let Some(message) = stream.next().await {
            if let Message::Text(text) = message? {
                return match serde_json::from_str::<OutboundEnvelope>(text.as_str()) {
                    Ok(OutboundEnvelope::System { instance_id, .. }) => Ok((stream, instance_id)),
                    _ => Err(ClientError::Protocol(format!(
                        "expected welcome notice, got {}",
                        text.as_str()
                    ))),
                };
            }
        }
        Err(ClientError::ConnectionError(
            "closed before welcome".to_string(),
        ))
    };

    tokio::time::timeout(wait, attempt)
        .await
        .map_err(|_| ClientError::ConnectionError(format!("no welcome from {} in time", url)))?
}

/// Count chat envelopes carrying `marker` until `wait` elapses or the socket closes.
async fn count_copies(stream: &mut WsStream, marker: &str, wait: Duration) -> usize {
    let deadline = tokio::time::Instant::now() + wait;
    let mut count = 0;
    while let Ok(Some(Ok(message))) = tokio::time::timeout_at(deadline, stream.next()).await {
        if let Message::Text(text) = message
            && let Ok(OutboundEnvelope::Chat { body, .. }) =
                serde_json::from_str::<OutboundEnvelope>(text.as_str())
            && body == marker
        {
            count += 1;
        }
    }
    count
}
