//! `BroadcastBridge` implementations and the subscription supervisor.
//!
//! - `inmemory`: process-local topic (`tokio::sync::broadcast`)
//! - `redis_pubsub`: Redis pub/sub channel shared by every instance
//! - `supervisor`: keeps one subscription alive with exponential backoff

pub mod backoff;
pub mod inmemory;
pub mod redis_pubsub;
pub mod supervisor;

pub use backoff::ExponentialBackoff;
pub use inmemory::InMemoryBroadcastBridge;
pub use redis_pubsub::RedisBroadcastBridge;
pub use supervisor::{BridgeHealth, BridgeSupervisor};
