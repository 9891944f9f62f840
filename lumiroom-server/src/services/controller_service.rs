use std::sync::Arc;

use lumiroom_api::models::{ControllerData, Intensity};
use lumiroom_api::topic;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;

use crate::errors::BusError;
use crate::models::RoomKey;
use crate::services::TopologyService;
use crate::services::bus::{BusClient, Delivery, QoS, Subscription};

/// Sensor payload as far as the controller cares about it.
#[derive(Debug, Deserialize)]
struct BrightnessPayload {
    #[serde(default)]
    brightness: f64,
}

/// Derives the intensity for a raw sensor payload.
///
/// A missing brightness counts as `0`, out of range values are clamped into
/// `0..=100` and fractions are truncated.
pub fn decide(payload: &[u8]) -> Result<Intensity, serde_json::Error> {
    let reading: BrightnessPayload = serde_json::from_slice(payload)?;
    let brightness = reading.brightness.clamp(0.0, 100.0) as u8;

    Ok(Intensity::from_brightness(brightness))
}

/// Room controller turning every delivered reading into a bulb intensity.
pub struct ControllerWorker {
    key: RoomKey,
    client: Arc<dyn BusClient>,
    topology: Arc<TopologyService>,
}

impl ControllerWorker {
    pub fn new(key: RoomKey, client: Arc<dyn BusClient>, topology: &Arc<TopologyService>) -> Self {
        Self {
            key,
            client,
            topology: Arc::clone(topology),
        }
    }

    /// Processes deliveries in order until `cancel` fires or the subscription
    /// is torn down.
    pub async fn run(self, mut subscription: Subscription, cancel: CancellationToken) {
        let topic = topic::controller_topic(&self.key.floor, &self.key.room);

        tracing::info!(room = %self.key, client_id = self.client.client_id(), "controller listening on {}", subscription.filter());

        loop {
            let delivery = tokio::select! {
                _ = cancel.cancelled() => break,
                delivery = subscription.recv() => delivery,
            };

            let Some(delivery) = delivery else {
                tracing::info!(room = %self.key, "subscription closed");
                break;
            };

            let result = tokio::select! {
                _ = cancel.cancelled() => break,
                result = self.handle(&topic, &delivery) => result,
            };

            match result {
                Ok(intensity) => {
                    tracing::debug!(room = %self.key, "intensity set to {}", intensity);
                }
                Err(e) if e.is_transient() => {
                    tracing::warn!(room = %self.key, "failed to handle {}: {}", delivery.topic, e);
                }
                Err(e) => {
                    tracing::error!(room = %self.key, "controller giving up: {}", e);
                    break;
                }
            }
        }

        if let Err(e) = self.client.disconnect().await {
            tracing::warn!(room = %self.key, "controller disconnect failed: {}", e);
        }

        tracing::info!(room = %self.key, "controller stopped");
    }

    /// Records the decision, which also drives the room's bulbs, then
    /// publishes it.
    pub async fn handle(&self, topic: &str, delivery: &Delivery) -> Result<Intensity, BusError> {
        let intensity = decide(&delivery.payload)?;
        let decision = ControllerData::from(intensity);

        if let Err(e) = self
            .topology
            .set_controller_decision(&self.key.floor, &self.key.room, decision)
            .await
        {
            tracing::warn!(room = %self.key, "failed to record decision: {}", e);
        }

        self.client
            .publish(topic, serde_json::to_vec(&decision)?, QoS::AtLeastOnce)
            .await?;

        Ok(intensity)
    }
}
