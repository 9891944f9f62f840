use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use lumiroom_api::topic;
use tokio::sync::{Mutex, RwLock, mpsc};

use super::{BusClient, BusConnector, Delivery, QoS, Subscription};
use crate::errors::BusError;

struct Subscriber {
    client_id: String,
    filter: String,
    sender: mpsc::Sender<Delivery>,
}

/// In-process broker, every client of one `MemoryBus` sees the others'
/// publishes. Deliveries to one subscriber keep publish order.
#[derive(Clone, Default)]
pub struct MemoryBus {
    subscribers: Arc<RwLock<BTreeMap<u64, Subscriber>>>,
    next_id: Arc<AtomicU64>,
}

impl MemoryBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn client(&self, client_id: &str) -> MemoryClient {
        MemoryClient {
            client_id: client_id.to_string(),
            bus: self.clone(),
            subscriptions: Mutex::new(Vec::new()),
            closed: AtomicBool::new(false),
        }
    }

    /// Number of live subscriptions across all clients.
    pub async fn subscription_count(&self) -> usize {
        self.subscribers.read().await.len()
    }

    async fn register(&self, client_id: &str, filter: &str) -> (u64, Subscription) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (sender, subscription) = Subscription::channel(filter);

        self.subscribers.write().await.insert(
            id,
            Subscriber {
                client_id: client_id.to_string(),
                filter: filter.to_string(),
                sender,
            },
        );

        (id, subscription)
    }

    async fn unregister(&self, ids: &[u64]) {
        let mut subscribers = self.subscribers.write().await;

        for id in ids {
            subscribers.remove(id);
        }
    }

    /// Waits for room in every matching queue, so a slow subscriber slows
    /// the publisher down instead of losing messages.
    async fn deliver(&self, topic_name: &str, payload: Vec<u8>) {
        let targets: Vec<(String, mpsc::Sender<Delivery>)> = self
            .subscribers
            .read()
            .await
            .values()
            .filter(|subscriber| topic::matches(&subscriber.filter, topic_name))
            .map(|subscriber| (subscriber.client_id.clone(), subscriber.sender.clone()))
            .collect();

        for (client_id, sender) in targets {
            let delivery = Delivery {
                topic: topic_name.to_string(),
                payload: payload.clone(),
            };

            if sender.send(delivery).await.is_err() {
                tracing::debug!("{} left before a delivery on {}", client_id, topic_name);
            }
        }
    }
}

#[async_trait]
impl BusConnector for MemoryBus {
    async fn connect(&self, client_id: &str) -> Result<Arc<dyn BusClient>, BusError> {
        Ok(Arc::new(self.client(client_id)))
    }
}

pub struct MemoryClient {
    client_id: String,
    bus: MemoryBus,
    subscriptions: Mutex<Vec<u64>>,
    closed: AtomicBool,
}

impl MemoryClient {
    fn ensure_open(&self) -> Result<(), BusError> {
        if self.closed.load(Ordering::Acquire) {
            Err(BusError::Closed(self.client_id.clone()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl BusClient for MemoryClient {
    fn client_id(&self) -> &str {
        &self.client_id
    }

    async fn publish(&self, topic: &str, payload: Vec<u8>, _qos: QoS) -> Result<(), BusError> {
        self.ensure_open()?;
        self.bus.deliver(topic, payload).await;

        Ok(())
    }

    async fn subscribe(&self, filter: &str, _qos: QoS) -> Result<Subscription, BusError> {
        self.ensure_open()?;

        let (id, subscription) = self.bus.register(&self.client_id, filter).await;
        self.subscriptions.lock().await.push(id);

        Ok(subscription)
    }

    async fn disconnect(&self) -> Result<(), BusError> {
        self.closed.store(true, Ordering::Release);

        let ids: Vec<u64> = self.subscriptions.lock().await.drain(..).collect();
        self.bus.unregister(&ids).await;

        Ok(())
    }
}
