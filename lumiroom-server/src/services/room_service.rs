use std::collections::HashMap;
use std::sync::Arc;

use lumiroom_api::topic;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::configs::Simulation;
use crate::errors::{Resource, RoomError, TopologyError};
use crate::models::RoomKey;
use crate::services::bus::{BusClient, BusConnector, QoS};
use crate::services::{ControllerWorker, ModeService, SensorWorker, TopologyService};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomStatus {
    Created,
    Existing,
}

/// Handles of one room's worker pair.
struct RoomWorkers {
    cancel: CancellationToken,
    sensor: JoinHandle<()>,
    controller: JoinHandle<()>,
}

impl RoomWorkers {
    async fn stop(self, key: &RoomKey) {
        self.cancel.cancel();

        for (role, handle) in [("sensor", self.sensor), ("controller", self.controller)] {
            if let Err(e) = handle.await {
                tracing::error!(room = %key, "{} task failed: {}", role, e);
            }
        }
    }
}

/// Materializes rooms and owns their background workers.
///
/// Creation is serialized per room, so a room gets exactly one sensor and one
/// controller no matter how many callers race for it, while rooms that are
/// slow to connect never hold up the others.
pub struct RoomService {
    topology: Arc<TopologyService>,
    modes: Arc<ModeService>,
    connector: Arc<dyn BusConnector>,
    simulation: Simulation,
    gates: Mutex<HashMap<RoomKey, Arc<Mutex<()>>>>,
    workers: Mutex<HashMap<RoomKey, RoomWorkers>>,
    shutdown: CancellationToken,
}

impl RoomService {
    pub fn new(
        topology: &Arc<TopologyService>,
        modes: &Arc<ModeService>,
        connector: Arc<dyn BusConnector>,
        simulation: &Simulation,
    ) -> Self {
        Self {
            topology: Arc::clone(topology),
            modes: Arc::clone(modes),
            connector,
            simulation: simulation.clone(),
            gates: Mutex::new(HashMap::new()),
            workers: Mutex::new(HashMap::new()),
            shutdown: CancellationToken::new(),
        }
    }

    /// Creates the floor and room if needed and starts the room's workers.
    /// Calling it for a running room is a no-op.
    pub async fn ensure_room(&self, floor: &str, room: &str) -> Result<RoomStatus, RoomError> {
        TopologyService::check_name(floor)?;
        TopologyService::check_name(room)?;

        let gate = self.gate(floor, room).await;
        let _creating = gate.lock().await;

        match self.topology.create_floor(floor).await {
            Ok(()) | Err(TopologyError::AlreadyExists(_)) => {}
            Err(e) => return Err(e.into()),
        }

        if self.topology.contains_room(floor, room).await {
            return Ok(RoomStatus::Existing);
        }

        self.start(floor, room).await?;

        Ok(RoomStatus::Created)
    }

    /// Like [`RoomService::ensure_room`] but the floor must exist and the room
    /// must not.
    pub async fn create_room(&self, floor: &str, room: &str) -> Result<(), RoomError> {
        TopologyService::check_name(room)?;

        let gate = self.gate(floor, room).await;
        let _creating = gate.lock().await;

        if !self.topology.contains_floor(floor).await {
            return Err(TopologyError::NotFound(Resource::floor(floor)).into());
        }

        if self.topology.contains_room(floor, room).await {
            return Err(TopologyError::AlreadyExists(Resource::room(floor, room)).into());
        }

        self.start(floor, room).await
    }

    /// Deactivates the room and waits for both of its workers to finish.
    pub async fn stop_room(&self, floor: &str, room: &str) -> Result<(), RoomError> {
        let key = RoomKey::new(floor, room);

        self.topology.deactivate(floor, room).await?;

        let room_workers = self.workers.lock().await.remove(&key);
        if let Some(room_workers) = room_workers {
            room_workers.stop(&key).await;
            tracing::info!(room = %key, "room stopped");
        }

        Ok(())
    }

    /// Stops every worker, the store keeps each room's last state.
    pub async fn shutdown(&self) {
        self.shutdown.cancel();

        let workers: Vec<(RoomKey, RoomWorkers)> = self.workers.lock().await.drain().collect();
        let count = workers.len();

        for (key, room_workers) in workers {
            room_workers.stop(&key).await;
        }

        tracing::info!("stopped workers of {} rooms", count);
    }

    /// Rooms that currently own a worker pair, in key order.
    pub async fn running_rooms(&self) -> Vec<RoomKey> {
        let mut keys: Vec<RoomKey> = self.workers.lock().await.keys().cloned().collect();
        keys.sort();

        keys
    }

    /// Per-room creation lock. The registry lock is only held for the lookup.
    async fn gate(&self, floor: &str, room: &str) -> Arc<Mutex<()>> {
        let mut gates = self.gates.lock().await;

        Arc::clone(gates.entry(RoomKey::new(floor, room)).or_default())
    }

    /// Runs under the room's gate.
    async fn start(&self, floor: &str, room: &str) -> Result<(), RoomError> {
        let key = RoomKey::new(floor, room);
        let suffix = client_suffix();

        // Connect before touching the store so a bus failure leaves nothing behind.
        let sensor_client = self
            .connector
            .connect(&format!("light-sensor-{floor}-{room}-{suffix}"))
            .await?;

        let controller_client = match self
            .connector
            .connect(&format!("controller-{floor}-{room}-{suffix}"))
            .await
        {
            Ok(client) => client,
            Err(e) => {
                release(&[&sensor_client]).await;
                return Err(e.into());
            }
        };

        // Subscribe before the sensor runs so its first reading is not lost.
        let subscription = match controller_client
            .subscribe(&topic::sensor_topic(floor, room), QoS::AtLeastOnce)
            .await
        {
            Ok(subscription) => subscription,
            Err(e) => {
                release(&[&sensor_client, &controller_client]).await;
                return Err(e.into());
            }
        };

        // The override exists before the room becomes visible, so a mode
        // pinned right after creation is never overwritten by the default.
        self.modes.set_room_mode(floor, room, self.simulation.room_mode).await;

        if let Err(e) = self.topology.create_room(floor, room).await {
            self.modes.remove_room(floor, room).await;
            release(&[&sensor_client, &controller_client]).await;
            return Err(e.into());
        }

        let cancel = self.shutdown.child_token();

        let sensor = SensorWorker::new(
            key.clone(),
            sensor_client,
            &self.topology,
            &self.modes,
            self.simulation.sensor_interval(),
        );
        let controller = ControllerWorker::new(key.clone(), controller_client, &self.topology);

        let room_workers = RoomWorkers {
            sensor: tokio::spawn(sensor.run(cancel.clone())),
            controller: tokio::spawn(controller.run(subscription, cancel.clone())),
            cancel,
        };

        let mut workers = self.workers.lock().await;
        if self.shutdown.is_cancelled() {
            // Shutdown already drained the registry, nobody else will join these.
            drop(workers);
            room_workers.stop(&key).await;
        } else {
            workers.insert(key.clone(), room_workers);
        }

        tracing::info!(room = %key, "room created with mode {}", self.simulation.room_mode);

        Ok(())
    }
}

async fn release(clients: &[&Arc<dyn BusClient>]) {
    for client in clients {
        if let Err(e) = client.disconnect().await {
            tracing::warn!("failed to release {}: {}", client.client_id(), e);
        }
    }
}

fn client_suffix() -> String {
    Uuid::new_v4().simple().to_string()[..8].to_string()
}
