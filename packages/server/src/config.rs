//! Server configuration.
//!
//! The binary parses flags and environment with clap and hands a plain
//! `ServerConfig` to the bootstrap.

use std::time::Duration;

use uuid::Uuid;

use crate::domain::InstanceId;

/// Store and bridge implementation to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum Backend {
    /// Process-local store and topic
    #[default]
    Memory,
    /// Redis list for the store, Redis pub/sub for the bridge
    Redis,
}

pub const DEFAULT_REDIS_URL: &str = "redis://127.0.0.1:6379";
pub const DEFAULT_MESSAGE_KEY: &str = "hibiki:messages";
pub const DEFAULT_CHANNEL: &str = "hibiki:broadcast";
pub const DEFAULT_RETENTION: usize = 10_000;
/// Envelopes buffered per subscriber of the in-memory topic before it lags.
pub const DEFAULT_TOPIC_CAPACITY: usize = 1024;
pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_millis(10_000);
pub const DEFAULT_DEPENDENCY_TIMEOUT: Duration = Duration::from_millis(2_000);

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub instance_id: InstanceId,
    pub backend: Backend,
    pub redis_url: String,
    /// Redis list holding the message log
    pub message_key: String,
    /// Redis pub/sub channel of the bridge
    pub channel: String,
    pub retention: usize,
    /// Capacity of the in-memory bridge topic
    pub topic_capacity: usize,
    pub grace_period: Duration,
    pub dependency_timeout: Duration,
}

impl ServerConfig {
    /// In-memory configuration with default timeouts.
    pub fn new(instance_id: InstanceId) -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            instance_id,
            backend: Backend::Memory,
            redis_url: DEFAULT_REDIS_URL.to_string(),
            message_key: DEFAULT_MESSAGE_KEY.to_string(),
            channel: DEFAULT_CHANNEL.to_string(),
            retention: DEFAULT_RETENTION,
            topic_capacity: DEFAULT_TOPIC_CAPACITY,
            grace_period: DEFAULT_GRACE_PERIOD,
            dependency_timeout: DEFAULT_DEPENDENCY_TIMEOUT,
        }
    }
}

/// Pick the instance id: explicit value, then the host name, then a generated one.
///
/// Blank candidates are skipped.
pub fn resolve_instance_id(explicit: Option<String>, hostname: Option<String>) -> InstanceId {
    explicit
        .into_iter()
        .chain(hostname)
        .find_map(|candidate| InstanceId::new(candidate).ok())
        .unwrap_or_else(generated_instance_id)
}

fn generated_instance_id() -> InstanceId {
    let id = Uuid::new_v4().simple().to_string();
    InstanceId::new(format!("instance-{}", &id[..8]))
        .unwrap_or_else(|_| unreachable!("generated id is never blank"))
}
