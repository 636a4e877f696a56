//! Connection hub: the single task that owns the [`ConnectionRegistry`].
//!
//! Admissions, removals, bridge deliveries and the drain all arrive as
//! commands on one unbounded channel and are applied in order, so the
//! registry needs no lock. Enqueuing a command never waits, which keeps the
//! bridge delivery loop independent of local fan-out.

use tokio::{
    sync::{mpsc, oneshot, watch},
    task::JoinHandle,
};

use crate::domain::{BroadcastEnvelope, Connection, ConnectionId, InstanceId};

use super::registry::{ConnectionRegistry, PusherChannel};

/// Snapshot published after every registry mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HubStats {
    pub open_connections: usize,
    pub tracked_connections: usize,
    pub accepted_total: u64,
}

enum HubCommand {
    Admit {
        connection: Connection,
        channel: PusherChannel,
    },
    Remove(ConnectionId),
    Deliver(BroadcastEnvelope),
    Drain {
        notice: BroadcastEnvelope,
        reply: oneshot::Sender<usize>,
    },
}

pub struct ConnectionHub {
    registry: ConnectionRegistry,
    commands: mpsc::UnboundedReceiver<HubCommand>,
    stats: watch::Sender<HubStats>,
}

impl ConnectionHub {
    /// Start the hub task. It stops once every [`HubHandle`] is dropped.
    pub fn spawn(instance_id: InstanceId) -> (HubHandle, JoinHandle<()>) {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (stats_tx, stats_rx) = watch::channel(HubStats::default());

        let hub = Self {
            registry: ConnectionRegistry::new(instance_id),
            commands: command_rx,
            stats: stats_tx,
        };
        let task = tokio::spawn(hub.run());

        (
            HubHandle {
                commands: command_tx,
                stats: stats_rx,
            },
            task,
        )
    }

    async fn run(mut self) {
        while let Some(command) = self.commands.recv().await {
            self.handle(command);
            self.publish_stats();
        }
        tracing::debug!(
            "Connection hub of instance '{}' stopped",
            self.registry.instance_id()
        );
    }

    fn handle(&mut self, command: HubCommand) {
        match command {
            HubCommand::Admit {
                connection,
                channel,
            } => {
                let id = connection.id;
                if let Err(e) = self.registry.admit(connection, channel) {
                    tracing::warn!("Connection '{}' could not be greeted: {}", id, e);
                }
            }
            HubCommand::Remove(id) => {
                self.registry.remove(&id);
            }
            HubCommand::Deliver(envelope) => {
                let report = self.registry.broadcast_local(&envelope);
                tracing::debug!(
                    "Fan-out delivered to {} connections, removed {}",
                    report.delivered,
                    report.removed
                );
            }
            HubCommand::Drain { notice, reply } => {
                let notified = self.registry.drain(&notice);
                let _ = reply.send(notified);
            }
        }
    }

    fn publish_stats(&self) {
        let stats = HubStats {
            open_connections: self.registry.size(),
            tracked_connections: self.registry.tracked(),
            accepted_total: self.registry.accepted_total(),
        };
        self.stats.send_if_modified(|current| {
            if *current == stats {
                return false;
            }
            *current = stats;
            true
        });
    }
}

/// Cloneable handle to the hub task.
#[derive(Clone)]
pub struct HubHandle {
    commands: mpsc::UnboundedSender<HubCommand>,
    stats: watch::Receiver<HubStats>,
}

impl HubHandle {
    pub fn admit(&self, connection: Connection, channel: PusherChannel) {
        self.send(HubCommand::Admit {
            connection,
            channel,
        });
    }

    pub fn remove(&self, id: ConnectionId) {
        self.send(HubCommand::Remove(id));
    }

    /// Hand a bridge delivery to the local fan-out.
    pub fn deliver(&self, envelope: BroadcastEnvelope) {
        self.send(HubCommand::Deliver(envelope));
    }

    /// Notify and close every open connection. Returns how many were notified.
    pub async fn drain(&self, notice: BroadcastEnvelope) -> usize {
        let (reply, response) = oneshot::channel();
        self.send(HubCommand::Drain { notice, reply });
        response.await.unwrap_or(0)
    }

    pub fn stats(&self) -> HubStats {
        *self.stats.borrow()
    }

    /// Current open-connection count.
    pub fn size(&self) -> usize {
        self.stats().open_connections
    }

    /// Wait until no connection is registered any more, `Closing` ones included.
    pub async fn wait_until_empty(&self) {
        let mut stats = self.stats.clone();
        let _ = stats
            .wait_for(|current| current.tracked_connections == 0)
            .await;
    }

    fn send(&self, command: HubCommand) {
        if self.commands.send(command).is_err() {
            tracing::warn!("Connection hub is gone, command dropped");
        }
    }
}
