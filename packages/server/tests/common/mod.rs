//! Helpers for in-process multi-instance tests.
//!
//! Every instance of a [`TestCluster`] gets its own hub, bridge handle and
//! HTTP listener, while all of them share one in-memory store and topic.

#![allow(dead_code)]

use std::{net::SocketAddr, sync::Arc, time::Duration};

use futures_util::{SinkExt, StreamExt};
use hibiki_server::{
    bootstrap::{Backends, build_server},
    config::{DEFAULT_RETENTION, DEFAULT_TOPIC_CAPACITY, ServerConfig},
    domain::{BroadcastEnvelope, InstanceId, MessageRepository},
    infrastructure::{
        bridge::InMemoryBroadcastBridge,
        dto::websocket::OutboundEnvelope,
        repository::{InMemoryMessageRepository, inmemory::SharedMessageLog},
    },
    ui::ServerError,
    usecase::DrainOutcome,
};
use hibiki_shared::time::{Clock, SystemClock};
use tokio::{
    net::{TcpListener, TcpStream},
    sync::{broadcast, oneshot},
    task::JoinHandle,
};
use tokio_tungstenite::{
    MaybeTlsStream, WebSocketStream, connect_async,
    tungstenite::{Message, protocol::CloseFrame},
};

pub type WsClient = WebSocketStream<MaybeTlsStream<TcpStream>>;

pub const RECV_TIMEOUT: Duration = Duration::from_secs(3);

pub struct TestCluster {
    pub log: SharedMessageLog,
    pub topic: broadcast::Sender<BroadcastEnvelope>,
    pub clock: Arc<dyn Clock>,
}

impl TestCluster {
    pub fn new() -> Self {
        Self {
            log: InMemoryMessageRepository::shared_log(),
            topic: InMemoryBroadcastBridge::topic(DEFAULT_TOPIC_CAPACITY),
            clock: Arc::new(SystemClock),
        }
    }

    pub fn config(&self, instance_id: &str) -> ServerConfig {
        let mut config = ServerConfig::new(InstanceId::new(instance_id.to_string()).unwrap());
        config.grace_period = Duration::from_secs(2);
        config.dependency_timeout = Duration::from_millis(500);
        config
    }

    pub fn backends(&self) -> Backends {
        Backends::in_memory(
            self.log.clone(),
            self.topic.clone(),
            DEFAULT_RETENTION,
            self.clock.clone(),
        )
    }

    /// Start an instance on the shared backends.
    pub async fn start(&self, instance_id: &str) -> TestInstance {
        TestInstance::start(self.config(instance_id), self.backends(), self.clock.clone()).await
    }

    /// Start an instance with its own store handle on the shared topic.
    pub async fn start_with_repository(
        &self,
        instance_id: &str,
        repository: Arc<dyn MessageRepository>,
    ) -> TestInstance {
        let backends = Backends {
            repository,
            bridge: Arc::new(InMemoryBroadcastBridge::new(self.topic.clone())),
        };
        TestInstance::start(self.config(instance_id), backends, self.clock.clone()).await
    }
}

pub struct TestInstance {
    pub addr: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
    task: JoinHandle<Result<DrainOutcome, ServerError>>,
}

impl TestInstance {
    pub async fn start(config: ServerConfig, backends: Backends, clock: Arc<dyn Clock>) -> Self {
        let server = build_server(&config, backends, clock)
            .await
            .expect("instance should start");
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (shutdown, signal) = oneshot::channel::<()>();
        let task = tokio::spawn(server.serve(listener, async move {
            let _ = signal.await;
        }));

        Self {
            addr,
            shutdown: Some(shutdown),
            task,
        }
    }

    pub fn ws_url(&self) -> String {
        format!("ws://{}/ws", self.addr)
    }

    pub fn http_url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Deliver the shutdown signal without waiting for the drain.
    pub fn signal_shutdown(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
    }

    /// Signal shutdown and wait for the server to return.
    pub async fn shutdown(mut self) -> Result<DrainOutcome, ServerError> {
        self.signal_shutdown();
        self.task.await.expect("server task should not panic")
    }
}

/// Connect and consume the welcome notice.
pub async fn connect(instance: &TestInstance) -> (WsClient, OutboundEnvelope) {
    let (mut ws, _) = connect_async(instance.ws_url())
        .await
        .expect("upgrade should succeed");
    let welcome = next_envelope(&mut ws).await;
    assert!(matches!(welcome, OutboundEnvelope::System { .. }));
    (ws, welcome)
}

pub async fn send_chat(ws: &mut WsClient, display_name: Option<&str>, body: &str) {
    let mut frame = serde_json::json!({ "tag": "chat", "body": body });
    if let Some(name) = display_name {
        frame["displayName"] = serde_json::Value::String(name.to_string());
    }
    send_text(ws, &frame.to_string()).await;
}

pub async fn send_text(ws: &mut WsClient, text: &str) {
    ws.send(Message::Text(text.to_string().into()))
        .await
        .expect("send should succeed");
}

/// Next text frame decoded as an envelope. Panics on timeout or close.
pub async fn next_envelope(ws: &mut WsClient) -> OutboundEnvelope {
    try_next_envelope(ws, RECV_TIMEOUT)
        .await
        .expect("expected an envelope")
}

/// Next text frame within `wait`, or `None` if nothing arrives.
pub async fn try_next_envelope(ws: &mut WsClient, wait: Duration) -> Option<OutboundEnvelope> {
    let deadline = tokio::time::Instant::now() + wait;
    loop {
        let frame = tokio::time::timeout_at(deadline, ws.next()).await.ok()??;
        match frame.ok()? {
            Message::Text(text) => {
                return Some(serde_json::from_str(text.as_str()).expect("valid envelope"));
            }
            Message::Close(_) => return None,
            _ => continue,
        }
    }
}

/// Frames until the server closes the connection.
pub async fn collect_until_close(ws: &mut WsClient) -> (Vec<OutboundEnvelope>, Option<CloseFrame>) {
    let mut envelopes = Vec::new();
    loop {
        let frame = tokio::time::timeout(RECV_TIMEOUT, ws.next())
            .await
            .expect("server should close the connection");
        match frame {
            Some(Ok(Message::Text(text))) => {
                envelopes.push(serde_json::from_str(text.as_str()).expect("valid envelope"));
            }
            Some(Ok(Message::Close(frame))) => return (envelopes, frame),
            Some(Ok(_)) => continue,
            Some(Err(_)) | None => return (envelopes, None),
        }
    }
}

pub fn chat_body(envelope: &OutboundEnvelope) -> Option<&str> {
    match envelope {
        OutboundEnvelope::Chat { body, .. } => Some(body.as_str()),
        OutboundEnvelope::System { .. } => None,
    }
}
