//! Dependency wiring of one instance.
//!
//! Order:
//! 1. Backends (store and bridge)
//! 2. Connection hub
//! 3. Bridge supervisor (first subscription inline)
//! 4. UseCases
//! 5. AppState and Server

use std::sync::Arc;

use hibiki_shared::time::Clock;
use thiserror::Error;
use tokio::sync::broadcast;
use tokio_util::{sync::CancellationToken, task::TaskTracker};

use crate::{
    config::{Backend, ServerConfig},
    domain::{
        AdmissionGate, BridgeError, BroadcastBridge, BroadcastEnvelope, MessageRepository,
        PersistenceError,
    },
    infrastructure::{
        bridge::{
            BridgeSupervisor, ExponentialBackoff, InMemoryBroadcastBridge, RedisBroadcastBridge,
        },
        hub::ConnectionHub,
        repository::{
            InMemoryMessageRepository, RedisMessageRepository, inmemory::SharedMessageLog,
        },
    },
    ui::{Server, state::AppState},
    usecase::{
        ConnectConnectionUseCase, DisconnectConnectionUseCase, DrainController,
        GetHistoryUseCase, GetMetricsUseCase, SendMessageUseCase,
    },
};

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("invalid Redis URL '{url}': {reason}")]
    RedisUrl { url: String, reason: String },
    #[error("message store unavailable at start-up: {0}")]
    Store(#[from] PersistenceError),
    #[error("broadcast bridge unavailable at start-up: {0}")]
    Bridge(#[from] BridgeError),
}

/// Store and bridge handles of one instance.
pub struct Backends {
    pub repository: Arc<dyn MessageRepository>,
    pub bridge: Arc<dyn BroadcastBridge>,
}

impl Backends {
    /// Handles onto process-local storage and topic. Instances built from
    /// clones of the same `log` and `topic` form one cluster.
    pub fn in_memory(
        log: SharedMessageLog,
        topic: broadcast::Sender<BroadcastEnvelope>,
        retention: usize,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            repository: Arc::new(InMemoryMessageRepository::new(log, retention, clock)),
            bridge: Arc::new(InMemoryBroadcastBridge::new(topic)),
        }
    }

    pub async fn redis(config: &ServerConfig, clock: Arc<dyn Clock>) -> Result<Self, BootstrapError> {
        let client =
            redis::Client::open(config.redis_url.as_str()).map_err(|e| BootstrapError::RedisUrl {
                url: config.redis_url.clone(),
                reason: e.to_string(),
            })?;
        let repository = RedisMessageRepository::connect(
            &client,
            config.message_key.clone(),
            config.retention,
            clock,
        )
        .await?;
        let bridge = RedisBroadcastBridge::connect(&client, config.channel.clone()).await?;

        Ok(Self {
            repository: Arc::new(repository),
            bridge: Arc::new(bridge),
        })
    }

    /// Backends selected by `config.backend`. `memory` gives this instance its own cluster.
    pub async fn connect(config: &ServerConfig, clock: Arc<dyn Clock>) -> Result<Self, BootstrapError> {
        match config.backend {
            Backend::Memory => Ok(Self::in_memory(
                InMemoryMessageRepository::shared_log(),
                InMemoryBroadcastBridge::topic(config.topic_capacity),
                config.retention,
                clock,
            )),
            Backend::Redis => Self::redis(config, clock).await,
        }
    }
}

/// Wire one instance. Fails if the bridge cannot be subscribed at start-up.
pub async fn build_server(
    config: &ServerConfig,
    backends: Backends,
    clock: Arc<dyn Clock>,
) -> Result<Server, BootstrapError> {
    let instance_id = config.instance_id.clone();
    let Backends { repository, bridge } = backends;

    // 2. Connection hub
    let (hub, hub_task) = ConnectionHub::spawn(instance_id.clone());

    // 3. Bridge supervisor
    let supervisor_cancel = CancellationToken::new();
    let (supervisor, bridge_health) = BridgeSupervisor::new(
        bridge.clone(),
        hub.clone(),
        ExponentialBackoff::default(),
        supervisor_cancel.clone(),
    );
    let supervisor_task = match supervisor.bootstrap().await {
        Ok(task) => task,
        Err(e) => {
            hub_task.abort();
            return Err(e.into());
        }
    };
    tracing::info!("Instance {} subscribed to the broadcast bridge", instance_id);

    // 4. UseCases
    let admission = AdmissionGate::new();
    let connections = TaskTracker::new();
    let connect_usecase = Arc::new(ConnectConnectionUseCase::new(
        hub.clone(),
        admission.clone(),
        instance_id.clone(),
        clock.clone(),
    ));
    let disconnect_usecase = Arc::new(DisconnectConnectionUseCase::new(hub.clone()));
    let send_message_usecase = Arc::new(SendMessageUseCase::new(
        repository.clone(),
        bridge.clone(),
        instance_id.clone(),
        config.dependency_timeout,
    ));
    let get_history_usecase = Arc::new(GetHistoryUseCase::new(
        repository.clone(),
        config.dependency_timeout,
    ));
    let get_metrics_usecase = Arc::new(GetMetricsUseCase::new(hub.clone(), instance_id.clone()));
    let drain = Arc::new(DrainController::new(
        admission,
        hub,
        supervisor_cancel,
        repository,
        bridge,
        connections.clone(),
        instance_id.clone(),
        clock,
        config.grace_period,
    ));

    // 5. AppState and Server
    let state = Arc::new(AppState {
        instance_id,
        connect_usecase,
        disconnect_usecase,
        send_message_usecase,
        get_history_usecase,
        get_metrics_usecase,
        bridge_health,
        connections,
    });

    Ok(Server::new(state, drain, hub_task, supervisor_task))
}
