//! Publish/subscribe seam between room workers and the transport.
//!
//! Every worker owns one [`BusClient`], obtained from a shared
//! [`BusConnector`]. Incoming messages are handed out through a
//! [`Subscription`], an ordered per-filter receive queue that closes once the
//! client disconnects or gives up reconnecting.

mod backoff;
mod memory;
mod mqtt;

pub use backoff::BackoffPolicy;
pub use memory::{MemoryBus, MemoryClient};
pub use mqtt::{MqttClient, MqttConnector};
pub use rumqttc::QoS;

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::errors::BusError;

/// Capacity of every subscription queue.
pub const SUBSCRIPTION_CAPACITY: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub topic: String,
    pub payload: Vec<u8>,
}

#[derive(Debug)]
pub struct Subscription {
    filter: String,
    receiver: mpsc::Receiver<Delivery>,
}

impl Subscription {
    pub fn new(filter: impl Into<String>, receiver: mpsc::Receiver<Delivery>) -> Self {
        Self {
            filter: filter.into(),
            receiver,
        }
    }

    /// Creates a subscription together with the sender feeding it.
    pub fn channel(filter: impl Into<String>) -> (mpsc::Sender<Delivery>, Self) {
        let (sender, receiver) = mpsc::channel(SUBSCRIPTION_CAPACITY);

        (sender, Self::new(filter, receiver))
    }

    pub fn filter(&self) -> &str {
        &self.filter
    }

    /// Next delivery in publish order, `None` once the subscription is torn down.
    pub async fn recv(&mut self) -> Option<Delivery> {
        self.receiver.recv().await
    }
}

#[async_trait]
pub trait BusClient: Send + Sync {
    fn client_id(&self) -> &str;

    async fn publish(&self, topic: &str, payload: Vec<u8>, qos: QoS) -> Result<(), BusError>;

    async fn subscribe(&self, filter: &str, qos: QoS) -> Result<Subscription, BusError>;

    /// Leaves the bus cleanly, without firing the last will, and closes every
    /// subscription of this client.
    async fn disconnect(&self) -> Result<(), BusError>;
}

#[async_trait]
pub trait BusConnector: Send + Sync {
    async fn connect(&self, client_id: &str) -> Result<Arc<dyn BusClient>, BusError>;
}
