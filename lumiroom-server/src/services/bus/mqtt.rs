use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use lumiroom_api::models::ClientStatus;
use lumiroom_api::topic;
use rumqttc::{AsyncClient, Event, EventLoop, LastWill, MqttOptions, Outgoing, Packet};
use tokio::sync::{Mutex, RwLock, mpsc};
use tokio::task::JoinHandle;
use tokio::time;
use tokio_util::sync::CancellationToken;

use super::{BackoffPolicy, BusClient, BusConnector, Delivery, QoS, Subscription};
use crate::configs::Gateway;
use crate::errors::BusError;

/// Grace period for the event loop to flush a disconnect.
const DISCONNECT_TIMEOUT: Duration = Duration::from_secs(1);

struct Route {
    filter: String,
    qos: QoS,
    sender: mpsc::Sender<Delivery>,
}

type Routes = Arc<RwLock<Vec<Route>>>;

/// Opens one MQTT connection per worker against the configured broker.
pub struct MqttConnector {
    gateway: Gateway,
    backoff: BackoffPolicy,
}

impl MqttConnector {
    pub fn new(gateway: &Gateway) -> Self {
        Self {
            gateway: gateway.clone(),
            backoff: BackoffPolicy::from(&gateway.reconnect),
        }
    }
}

#[async_trait]
impl BusConnector for MqttConnector {
    async fn connect(&self, client_id: &str) -> Result<Arc<dyn BusClient>, BusError> {
        let client = MqttClient::connect(&self.gateway, client_id, self.backoff).await?;

        Ok(Arc::new(client))
    }
}

pub struct MqttClient {
    client_id: String,
    client: AsyncClient,
    routes: Routes,
    closed: Arc<AtomicBool>,
    cancel: CancellationToken,
    event_task: Mutex<Option<JoinHandle<()>>>,
}

impl MqttClient {
    /// Connects and waits for the broker's acknowledgement, retrying with
    /// `backoff` until it is exhausted.
    pub async fn connect(gateway: &Gateway, client_id: &str, backoff: BackoffPolicy) -> Result<Self, BusError> {
        let (client, mut event_loop) = AsyncClient::new(Self::options(gateway, client_id)?, 10);

        Self::await_connack(&mut event_loop, client_id, &backoff).await?;

        tracing::debug!("{} connected to {}:{}", client_id, gateway.host, gateway.port);

        let routes: Routes = Arc::new(RwLock::new(Vec::new()));
        let closed = Arc::new(AtomicBool::new(false));
        let cancel = CancellationToken::new();

        let event_task = tokio::spawn(Self::drive(
            event_loop,
            client.clone(),
            client_id.to_string(),
            Arc::clone(&routes),
            Arc::clone(&closed),
            backoff,
            cancel.clone(),
        ));

        Ok(Self {
            client_id: client_id.to_string(),
            client,
            routes,
            closed,
            cancel,
            event_task: Mutex::new(Some(event_task)),
        })
    }

    /// Connection options carrying the retained `disconnected` last will.
    pub fn options(gateway: &Gateway, client_id: &str) -> Result<MqttOptions, BusError> {
        let mut options = MqttOptions::new(client_id, &gateway.host, gateway.port);
        options.set_keep_alive(Duration::from_secs(gateway.keep_alive));

        if let Some(auth) = &gateway.auth {
            options.set_credentials(&auth.username, &auth.password);
        }

        let will = serde_json::to_vec(&ClientStatus::disconnected())?;
        options.set_last_will(LastWill::new(
            topic::status_topic(client_id),
            will,
            QoS::AtLeastOnce,
            true,
        ));

        Ok(options)
    }

    async fn await_connack(
        event_loop: &mut EventLoop,
        client_id: &str,
        backoff: &BackoffPolicy,
    ) -> Result<(), BusError> {
        let mut attempt = 0;

        loop {
            match event_loop.poll().await {
                Ok(Event::Incoming(Packet::ConnAck(_))) => return Ok(()),
                Ok(_) => {}
                Err(e) => {
                    let Some(delay) = backoff.next(attempt) else {
                        tracing::error!("{} could not reach the broker: {}", client_id, e);
                        return Err(BusError::RetriesExhausted { attempts: attempt });
                    };

                    attempt += 1;
                    tracing::warn!("{} failed to connect: {}, retry in {:?}", client_id, e, delay);
                    time::sleep(delay).await;
                }
            }
        }
    }

    async fn drive(
        mut event_loop: EventLoop,
        client: AsyncClient,
        client_id: String,
        routes: Routes,
        closed: Arc<AtomicBool>,
        backoff: BackoffPolicy,
        cancel: CancellationToken,
    ) {
        let mut attempt = 0;

        loop {
            let event = tokio::select! {
                _ = cancel.cancelled() => break,
                event = event_loop.poll() => event,
            };

            match event {
                Ok(Event::Incoming(Packet::Publish(publish))) => {
                    // A full subscription holds the event loop back until it drains.
                    tokio::select! {
                        _ = cancel.cancelled() => break,
                        _ = Self::route(&routes, &client_id, publish.topic, publish.payload.to_vec()) => {}
                    }
                }
                Ok(Event::Incoming(Packet::ConnAck(_))) => {
                    attempt = 0;

                    // Clean sessions drop subscriptions on reconnect.
                    for route in routes.read().await.iter() {
                        if let Err(e) = client.try_subscribe(route.filter.clone(), route.qos) {
                            tracing::warn!("{} failed to restore {}: {}", client_id, route.filter, e);
                        }
                    }

                    tracing::info!("{} reconnected", client_id);
                }
                Ok(Event::Outgoing(Outgoing::Disconnect)) => break,
                Ok(_) => {}
                Err(e) => match backoff.next(attempt) {
                    Some(delay) => {
                        attempt += 1;
                        tracing::warn!("{} lost connection: {}, retry in {:?}", client_id, e, delay);

                        tokio::select! {
                            _ = cancel.cancelled() => break,
                            _ = time::sleep(delay) => {}
                        }
                    }
                    None => {
                        tracing::error!("{} giving up after {} attempts: {}", client_id, attempt, e);
                        break;
                    }
                },
            }
        }

        closed.store(true, Ordering::Release);
        routes.write().await.clear();

        tracing::debug!("{} event loop stopped", client_id);
    }

    async fn route(routes: &Routes, client_id: &str, topic_name: String, payload: Vec<u8>) {
        let senders: Vec<mpsc::Sender<Delivery>> = routes
            .read()
            .await
            .iter()
            .filter(|route| topic::matches(&route.filter, &topic_name))
            .map(|route| route.sender.clone())
            .collect();

        for sender in senders {
            let delivery = Delivery {
                topic: topic_name.clone(),
                payload: payload.clone(),
            };

            if sender.send(delivery).await.is_err() {
                tracing::debug!("{} dropped a subscription before a delivery on {}", client_id, topic_name);
            }
        }
    }

    fn ensure_open(&self) -> Result<(), BusError> {
        if self.closed.load(Ordering::Acquire) {
            Err(BusError::Closed(self.client_id.clone()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl BusClient for MqttClient {
    fn client_id(&self) -> &str {
        &self.client_id
    }

    async fn publish(&self, topic: &str, payload: Vec<u8>, qos: QoS) -> Result<(), BusError> {
        self.ensure_open()?;
        self.client.publish(topic, qos, false, payload).await?;

        Ok(())
    }

    async fn subscribe(&self, filter: &str, qos: QoS) -> Result<Subscription, BusError> {
        self.ensure_open()?;

        let (sender, subscription) = Subscription::channel(filter);
        self.routes.write().await.push(Route {
            filter: filter.to_string(),
            qos,
            sender,
        });

        if let Err(e) = self.client.subscribe(filter, qos).await {
            self.routes.write().await.retain(|route| route.filter != filter);
            return Err(e.into());
        }

        tracing::debug!("{} subscribed to {}", self.client_id, filter);

        Ok(subscription)
    }

    async fn disconnect(&self) -> Result<(), BusError> {
        let Some(event_task) = self.event_task.lock().await.take() else {
            return Ok(());
        };

        if !self.closed.load(Ordering::Acquire) {
            if let Err(e) = self.client.disconnect().await {
                tracing::debug!("{} disconnect request failed: {}", self.client_id, e);
            }
        }

        if time::timeout(DISCONNECT_TIMEOUT, event_task).await.is_err() {
            tracing::warn!("{} did not disconnect in time", self.client_id);
            self.cancel.cancel();
        }

        self.closed.store(true, Ordering::Release);
        self.routes.write().await.clear();

        Ok(())
    }
}

impl Drop for MqttClient {
    fn drop(&mut self) {
        // Dropping without `disconnect` cuts the connection, the broker then
        // publishes the last will.
        self.cancel.cancel();
    }
}
