//! Connection registry of one instance.
//!
//! ## 責務
//!
//! - ローカルで開いている接続の集合を保持する（インスタンス間で共有しない）
//! - 接続ごとの送信チャンネルへのファンアウト
//! - 送信に失敗した接続の除去（他の接続への配信は継続する）
//!
//! ## 設計ノート
//!
//! レジストリは `&mut self` のみで変更される普通の構造体で、ロックを持たない。
//! 1 つのタスク（[`ConnectionHub`](super::hub::ConnectionHub)）だけが所有し、
//! 他のコンポーネントはコマンドを送って操作する。

use std::collections::HashMap;

use tokio::sync::mpsc;

use crate::domain::{
    BroadcastEnvelope, Connection, ConnectionId, InstanceId, SystemNotice, TransportError,
};

use super::dto::conversion::encode_envelope;

/// WebSocket close code for "going away".
pub const GOING_AWAY_CLOSE_CODE: u16 = 1001;

/// Why the server closes a connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseReason {
    pub code: u16,
    pub reason: String,
}

impl CloseReason {
    /// Close sent while draining, distinguishable from error closes.
    pub fn going_away() -> Self {
        Self {
            code: GOING_AWAY_CLOSE_CODE,
            reason: "server shutting down".to_string(),
        }
    }
}

/// A frame queued for one connection's pusher loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushFrame {
    Text(String),
    Close(CloseReason),
}

/// Outbound channel of one connection.
pub type PusherChannel = mpsc::UnboundedSender<PushFrame>;

/// Outcome of one local fan-out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FanoutReport {
    pub delivered: usize,
    pub removed: usize,
}

struct RegisteredConnection {
    connection: Connection,
    channel: PusherChannel,
}

impl RegisteredConnection {
    fn push(&self, frame: PushFrame) -> Result<(), TransportError> {
        self.channel
            .send(frame)
            .map_err(|_| TransportError::ChannelClosed(self.connection.id))
    }
}

pub struct ConnectionRegistry {
    instance_id: InstanceId,
    connections: HashMap<ConnectionId, RegisteredConnection>,
    accepted_total: u64,
    /// Encoded shutdown notice, set once the first drain has run.
    shutdown_notice: Option<String>,
}

impl ConnectionRegistry {
    pub fn new(instance_id: InstanceId) -> Self {
        Self {
            instance_id,
            connections: HashMap::new(),
            accepted_total: 0,
            shutdown_notice: None,
        }
    }

    pub fn instance_id(&self) -> &InstanceId {
        &self.instance_id
    }

    /// Add a connection and greet it with a `system` envelope naming this instance.
    ///
    /// If the greeting cannot be queued the connection is already gone and is
    /// not kept. After a drain the connection is not registered: it gets the
    /// shutdown notice and a going-away close instead of the greeting.
    pub fn admit(
        &mut self,
        connection: Connection,
        channel: PusherChannel,
    ) -> Result<(), TransportError> {
        if let Some(notice) = &self.shutdown_notice {
            let entry = RegisteredConnection {
                connection,
                channel,
            };
            entry.push(PushFrame::Text(notice.clone()))?;
            entry.push(PushFrame::Close(CloseReason::going_away()))?;
            tracing::debug!(
                "Connection '{}' arrived after drain, closed",
                entry.connection.id
            );
            return Ok(());
        }
        self.accepted_total += 1;

        let id = connection.id;
        let welcome = BroadcastEnvelope::System(SystemNotice::welcome(
            &self.instance_id,
            connection.connected_at,
        ));
        let entry = RegisteredConnection {
            connection,
            channel,
        };
        entry.push(PushFrame::Text(encode_envelope(&welcome)))?;

        if let Some(mut previous) = self.connections.insert(id, entry) {
            previous.connection.mark_closed();
            tracing::warn!("Connection '{}' was admitted twice, replaced", id);
        }
        tracing::debug!("Connection '{}' admitted ({} open)", id, self.size());
        Ok(())
    }

    /// Idempotent. Returns `true` only if the connection was present.
    pub fn remove(&mut self, id: &ConnectionId) -> bool {
        match self.connections.remove(id) {
            Some(mut entry) => {
                let previous = entry.connection.state();
                entry.connection.mark_closed();
                tracing::debug!(
                    "Connection '{}' removed while {:?} ({} open)",
                    id,
                    previous,
                    self.size()
                );
                true
            }
            None => false,
        }
    }

    /// Send the same serialized envelope to every open connection.
    ///
    /// Connections that fail, or that are no longer open, are removed; the
    /// rest still receive the envelope.
    pub fn broadcast_local(&mut self, envelope: &BroadcastEnvelope) -> FanoutReport {
        let payload = encode_envelope(envelope);
        let mut report = FanoutReport::default();
        let mut stale = Vec::new();

        for (id, entry) in &self.connections {
            if !entry.connection.is_open() {
                stale.push(*id);
                continue;
            }
            match entry.push(PushFrame::Text(payload.clone())) {
                Ok(()) => report.delivered += 1,
                Err(e) => {
                    tracing::warn!("Fan-out skipped a connection: {}", e);
                    stale.push(*id);
                }
            }
        }

        for id in stale {
            if self.remove(&id) {
                report.removed += 1;
            }
        }
        report
    }

    /// Notify every open connection of the shutdown and ask it to close.
    ///
    /// Notified connections move to `Closing` and stay registered until their
    /// socket task removes them. Returns how many were notified.
    pub fn drain(&mut self, notice: &BroadcastEnvelope) -> usize {
        let payload = encode_envelope(notice);
        self.shutdown_notice.get_or_insert_with(|| payload.clone());
        let mut notified = 0;
        let mut failed = Vec::new();

        for (id, entry) in self.connections.iter_mut() {
            if !entry.connection.is_open() {
                continue;
            }
            let sent = entry
                .push(PushFrame::Text(payload.clone()))
                .and_then(|()| entry.push(PushFrame::Close(CloseReason::going_away())));
            match sent {
                Ok(()) => {
                    entry.connection.begin_closing();
                    notified += 1;
                }
                Err(e) => {
                    tracing::debug!("Drain could not notify a connection: {}", e);
                    failed.push(*id);
                }
            }
        }

        for id in failed {
            self.remove(&id);
        }
        notified
    }

    /// Current open-connection count.
    pub fn size(&self) -> usize {
        self.connections
            .values()
            .filter(|entry| entry.connection.is_open())
            .count()
    }

    /// Connections still registered, `Closing` ones included.
    pub fn tracked(&self) -> usize {
        self.connections.len()
    }

    /// Connections accepted since start. Never decreases.
    pub fn accepted_total(&self) -> u64 {
        self.accepted_total
    }
}
