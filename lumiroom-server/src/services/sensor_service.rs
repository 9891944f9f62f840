use std::sync::Arc;
use std::time::Duration;

use lumiroom_api::models::{Mode, SensorData};
use lumiroom_api::topic;
use ::time::{OffsetDateTime, Time};
use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::errors::BusError;
use crate::models::RoomKey;
use crate::services::bus::{BusClient, QoS};
use crate::services::{ModeService, TopologyService};
use crate::simulate;

/// Simulated light sensor of one room, publishing a reading every interval.
pub struct SensorWorker {
    key: RoomKey,
    client: Arc<dyn BusClient>,
    topology: Arc<TopologyService>,
    modes: Arc<ModeService>,
    interval: Duration,
}

impl SensorWorker {
    pub fn new(
        key: RoomKey,
        client: Arc<dyn BusClient>,
        topology: &Arc<TopologyService>,
        modes: &Arc<ModeService>,
        interval: Duration,
    ) -> Self {
        Self {
            key,
            client,
            topology: Arc::clone(topology),
            modes: Arc::clone(modes),
            interval,
        }
    }

    /// Runs until `cancel` fires, the room is deactivated or the bus client
    /// is closed for good.
    pub async fn run(self, cancel: CancellationToken) {
        let topic = topic::sensor_topic(&self.key.floor, &self.key.room);
        let mut interval = time::interval(self.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::info!(room = %self.key, client_id = self.client.client_id(), "sensor started");

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = interval.tick() => {}
            }

            if !self.topology.is_active(&self.key.floor, &self.key.room).await {
                tracing::info!(room = %self.key, "room deactivated");
                break;
            }

            // A stalled publish must not outlive the room.
            let result = tokio::select! {
                _ = cancel.cancelled() => break,
                result = self.cycle(&topic) => result,
            };

            match result {
                Ok(reading) => {
                    tracing::debug!(room = %self.key, "published brightness {} ({})", reading.brightness, reading.mode);
                }
                Err(e) if e.is_transient() => {
                    tracing::warn!(room = %self.key, "skipping reading: {}", e);
                }
                Err(e) => {
                    tracing::error!(room = %self.key, "sensor giving up: {}", e);
                    break;
                }
            }
        }

        if let Err(e) = self.client.disconnect().await {
            tracing::warn!(room = %self.key, "sensor disconnect failed: {}", e);
        }

        tracing::info!(room = %self.key, "sensor stopped");
    }

    /// Computes a reading for the room's mode at this instant.
    pub async fn read(&self) -> SensorData {
        let mode = self.modes.resolve(&self.key.floor, &self.key.room).await;

        let brightness = match mode {
            Mode::Test => simulate::random_brightness(&mut rand::rng()),
            Mode::Normal => simulate::diurnal_brightness(local_time()),
        };

        SensorData { brightness, mode }
    }

    async fn cycle(&self, topic: &str) -> Result<SensorData, BusError> {
        let reading = self.read().await;
        let payload = serde_json::to_vec(&reading)?;

        self.client.publish(topic, payload, QoS::AtLeastOnce).await?;

        if let Err(e) = self.topology.set_sensor_reading(&self.key.floor, &self.key.room, reading).await {
            tracing::warn!(room = %self.key, "failed to record reading: {}", e);
        }

        Ok(reading)
    }
}

/// Wall clock time, falling back to UTC where the local offset cannot be
/// determined safely.
fn local_time() -> Time {
    OffsetDateTime::now_local()
        .unwrap_or_else(|_| OffsetDateTime::now_utc())
        .time()
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::services::bus::{MemoryBus, Subscription};

    struct Fixture {
        bus: MemoryBus,
        topology: Arc<TopologyService>,
        modes: Arc<ModeService>,
    }

    impl Fixture {
        async fn new() -> Self {
            let topology = Arc::new(TopologyService::new());
            topology.create_floor("1").await.unwrap();
            topology.create_room("1", "101").await.unwrap();

            let modes = Arc::new(ModeService::new(Mode::Normal));
            modes.set_room_mode("1", "101", Mode::Test).await;

            Self {
                bus: MemoryBus::new(),
                topology,
                modes,
            }
        }

        fn worker(&self, client: Arc<dyn BusClient>, interval: Duration) -> SensorWorker {
            SensorWorker::new(RoomKey::new("1", "101"), client, &self.topology, &self.modes, interval)
        }

        async fn observe(&self) -> Subscription {
            self.bus
                .client("observer")
                .subscribe(&topic::sensor_topic("1", "101"), QoS::AtLeastOnce)
                .await
                .unwrap()
        }
    }

    async fn next_reading(subscription: &mut Subscription) -> SensorData {
        let delivery = time::timeout(Duration::from_secs(5), subscription.recv())
            .await
            .unwrap()
            .unwrap();

        serde_json::from_slice(&delivery.payload).unwrap()
    }

    /// Client whose publishes always fail with the given error kind.
    struct FailingClient {
        closed: bool,
    }

    #[async_trait]
    impl BusClient for FailingClient {
        fn client_id(&self) -> &str {
            "failing"
        }

        async fn publish(&self, _topic: &str, _payload: Vec<u8>, _qos: QoS) -> Result<(), BusError> {
            if self.closed {
                Err(BusError::Closed("failing".to_string()))
            } else {
                Err(BusError::Payload(serde_json::from_str::<u8>("x").unwrap_err()))
            }
        }

        async fn subscribe(&self, filter: &str, _qos: QoS) -> Result<Subscription, BusError> {
            Ok(Subscription::channel(filter).1)
        }

        async fn disconnect(&self) -> Result<(), BusError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_publishes_and_records_readings() {
        let fixture = Fixture::new().await;
        let mut readings = fixture.observe().await;
        let cancel = CancellationToken::new();

        let worker = fixture.worker(Arc::new(fixture.bus.client("sensor")), Duration::from_millis(10));
        let handle = tokio::spawn(worker.run(cancel.clone()));

        let first = next_reading(&mut readings).await;
        assert_eq!(first.mode, Mode::Test);
        assert!(first.brightness <= 100);

        // The second publish happens after the first reading was recorded.
        next_reading(&mut readings).await;
        let room = fixture.topology.room("1", "101").await.unwrap();
        assert!(room.sensor_data.is_some());

        cancel.cancel();
        time::timeout(Duration::from_secs(5), handle).await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_mode_is_resolved_every_cycle() {
        let fixture = Fixture::new().await;
        let mut readings = fixture.observe().await;
        let cancel = CancellationToken::new();

        let worker = fixture.worker(Arc::new(fixture.bus.client("sensor")), Duration::from_millis(10));
        let handle = tokio::spawn(worker.run(cancel.clone()));

        assert_eq!(next_reading(&mut readings).await.mode, Mode::Test);

        fixture.modes.set_global_mode(Mode::Normal).await;

        let mut reading = next_reading(&mut readings).await;
        while reading.mode == Mode::Test {
            reading = next_reading(&mut readings).await;
        }
        assert_eq!(reading.mode, Mode::Normal);

        cancel.cancel();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_stops_when_room_deactivated() {
        let fixture = Fixture::new().await;
        fixture.topology.deactivate("1", "101").await.unwrap();

        let worker = fixture.worker(Arc::new(fixture.bus.client("sensor")), Duration::from_millis(10));

        time::timeout(Duration::from_secs(5), worker.run(CancellationToken::new()))
            .await
            .unwrap();

        let room = fixture.topology.room("1", "101").await.unwrap();
        assert!(room.sensor_data.is_none());
    }

    #[tokio::test]
    async fn test_transient_failure_keeps_running() {
        let fixture = Fixture::new().await;
        let cancel = CancellationToken::new();

        let worker = fixture.worker(Arc::new(FailingClient { closed: false }), Duration::from_millis(10));
        let handle = tokio::spawn(worker.run(cancel.clone()));

        time::sleep(Duration::from_millis(50)).await;
        assert!(!handle.is_finished());

        let room = fixture.topology.room("1", "101").await.unwrap();
        assert!(room.sensor_data.is_none());

        cancel.cancel();
        handle.await.unwrap();
    }

    /// Client whose publishes never complete, like a broker that stopped
    /// draining its request queue.
    struct StalledClient;

    #[async_trait]
    impl BusClient for StalledClient {
        fn client_id(&self) -> &str {
            "stalled"
        }

        async fn publish(&self, _topic: &str, _payload: Vec<u8>, _qos: QoS) -> Result<(), BusError> {
            std::future::pending().await
        }

        async fn subscribe(&self, filter: &str, _qos: QoS) -> Result<Subscription, BusError> {
            Ok(Subscription::channel(filter).1)
        }

        async fn disconnect(&self) -> Result<(), BusError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_cancel_interrupts_stalled_publish() {
        let fixture = Fixture::new().await;
        let cancel = CancellationToken::new();

        let worker = fixture.worker(Arc::new(StalledClient), Duration::from_millis(10));
        let handle = tokio::spawn(worker.run(cancel.clone()));

        time::sleep(Duration::from_millis(50)).await;
        assert!(!handle.is_finished());

        cancel.cancel();
        time::timeout(Duration::from_secs(1), handle).await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_closed_client_stops_worker() {
        let fixture = Fixture::new().await;

        let worker = fixture.worker(Arc::new(FailingClient { closed: true }), Duration::from_millis(10));

        time::timeout(Duration::from_secs(5), worker.run(CancellationToken::new()))
            .await
            .unwrap();

        assert!(fixture.topology.is_active("1", "101").await);
    }

    #[tokio::test]
    async fn test_read_in_normal_mode() {
        let fixture = Fixture::new().await;
        fixture.modes.set_room_mode("1", "101", Mode::Normal).await;

        let worker = fixture.worker(Arc::new(fixture.bus.client("sensor")), Duration::from_secs(2));
        let reading = worker.read().await;

        assert_eq!(reading.mode, Mode::Normal);
        assert!(reading.brightness <= 100);
    }
}
