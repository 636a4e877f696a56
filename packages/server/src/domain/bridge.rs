//! Broadcast bridge trait.
//!
//! One shared ordered topic. Every instance publishes its accepted messages
//! and subscribes to all messages, its own included.

use std::pin::Pin;

use async_trait::async_trait;
use futures_util::Stream;

use super::{envelope::BroadcastEnvelope, error::BridgeError};

/// Deliveries of one subscription. The stream ends when the subscription is lost.
pub type EnvelopeStream = Pin<Box<dyn Stream<Item = BroadcastEnvelope> + Send>>;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BroadcastBridge: Send + Sync {
    /// Publish to every current subscriber. Not retried here.
    async fn publish(&self, envelope: &BroadcastEnvelope) -> Result<(), BridgeError>;

    /// Open a new subscription to the topic.
    ///
    /// Messages from one publisher arrive in publish order.
    async fn subscribe(&self) -> Result<EnvelopeStream, BridgeError>;

    /// Release this instance's handle and end its subscriptions.
    async fn close(&self);
}
