use std::collections::HashMap;
use std::sync::Arc;

use lumiroom_api::models::{BuildingSnapshot, ControllerData, FloorSnapshot, Intensity, RoomSnapshot, SensorData};
use lumiroom_api::topic;
use tokio::sync::RwLock;

use crate::errors::{Resource, TopologyError};
use crate::models::{Floor, Room};

/// In-memory floors → rooms → bulbs model shared by workers and handles.
///
/// The floor map lock is only held to look a room up or to insert one; every
/// room mutation happens under that room's own lock, so a snapshot never sees
/// a decision whose bulbs have not been updated yet.
#[derive(Debug, Default)]
pub struct TopologyService {
    floors: RwLock<HashMap<String, Floor>>,
}

impl TopologyService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Floor and room names end up as topic levels.
    pub fn check_name(name: &str) -> Result<(), TopologyError> {
        if topic::is_valid_level(name) {
            Ok(())
        } else {
            Err(TopologyError::InvalidName(name.to_string()))
        }
    }

    pub async fn create_floor(&self, floor: &str) -> Result<(), TopologyError> {
        Self::check_name(floor)?;

        let mut floors = self.floors.write().await;

        if floors.contains_key(floor) {
            return Err(TopologyError::AlreadyExists(Resource::floor(floor)));
        }

        floors.insert(floor.to_string(), Floor::new());

        tracing::debug!("created floor {}", floor);

        Ok(())
    }

    pub async fn contains_floor(&self, floor: &str) -> bool {
        self.floors.read().await.contains_key(floor)
    }

    pub async fn create_room(&self, floor: &str, room: &str) -> Result<(), TopologyError> {
        Self::check_name(room)?;

        let mut floors = self.floors.write().await;

        let rooms = &mut floors
            .get_mut(floor)
            .ok_or_else(|| TopologyError::NotFound(Resource::floor(floor)))?
            .rooms;

        if rooms.contains_key(room) {
            return Err(TopologyError::AlreadyExists(Resource::room(floor, room)));
        }

        rooms.insert(room.to_string(), Arc::new(RwLock::new(Room::new())));

        tracing::debug!("created room {} on floor {}", room, floor);

        Ok(())
    }

    pub async fn contains_room(&self, floor: &str, room: &str) -> bool {
        self.floors
            .read()
            .await
            .get(floor)
            .is_some_and(|entry| entry.rooms.contains_key(room))
    }

    /// Adds a bulb that starts at the room's current decision, `Off` if none
    /// was made yet.
    pub async fn add_bulb(&self, floor: &str, room: &str, bulb: &str) -> Result<Intensity, TopologyError> {
        let entry = self.room_entry(floor, room).await?;
        let mut entry = entry.write().await;

        if entry.bulbs.contains_key(bulb) {
            return Err(TopologyError::AlreadyExists(Resource::bulb(floor, room, bulb)));
        }

        let intensity = entry.current_intensity();
        entry.bulbs.insert(bulb.to_string(), intensity);

        Ok(intensity)
    }

    pub async fn set_sensor_reading(&self, floor: &str, room: &str, reading: SensorData) -> Result<(), TopologyError> {
        let entry = self.room_entry(floor, room).await?;
        entry.write().await.sensor_data = Some(reading);

        Ok(())
    }

    pub async fn set_controller_decision(
        &self,
        floor: &str,
        room: &str,
        decision: ControllerData,
    ) -> Result<(), TopologyError> {
        let entry = self.room_entry(floor, room).await?;
        entry.write().await.apply_decision(decision);

        Ok(())
    }

    /// Unknown rooms count as inactive.
    pub async fn is_active(&self, floor: &str, room: &str) -> bool {
        match self.room_entry(floor, room).await {
            Ok(entry) => entry.read().await.active,
            Err(_) => false,
        }
    }

    pub async fn deactivate(&self, floor: &str, room: &str) -> Result<(), TopologyError> {
        let entry = self.room_entry(floor, room).await?;
        entry.write().await.active = false;

        Ok(())
    }

    pub async fn room(&self, floor: &str, room: &str) -> Result<RoomSnapshot, TopologyError> {
        let entry = self.room_entry(floor, room).await?;
        let snapshot = entry.read().await.snapshot();

        Ok(snapshot)
    }

    pub async fn snapshot(&self) -> BuildingSnapshot {
        let floors = self.floors.read().await;
        let mut building = BuildingSnapshot::new();

        for (floor_name, floor) in floors.iter() {
            let mut rooms = FloorSnapshot::new();

            for (room_name, room) in floor.rooms.iter() {
                rooms.insert(room_name.clone(), room.read().await.snapshot());
            }

            building.insert(floor_name.clone(), rooms);
        }

        building
    }

    async fn room_entry(&self, floor: &str, room: &str) -> Result<Arc<RwLock<Room>>, TopologyError> {
        let floors = self.floors.read().await;

        floors
            .get(floor)
            .ok_or_else(|| TopologyError::NotFound(Resource::floor(floor)))?
            .rooms
            .get(room)
            .cloned()
            .ok_or_else(|| TopologyError::NotFound(Resource::room(floor, room)))
    }
}

#[cfg(test)]
mod tests {
    use lumiroom_api::models::Mode;

    use super::*;

    #[tokio::test]
    async fn test_create_floor_twice() {
        let topology = TopologyService::new();

        topology.create_floor("1").await.unwrap();

        assert_eq!(
            topology.create_floor("1").await,
            Err(TopologyError::AlreadyExists(Resource::floor("1")))
        );
    }

    #[tokio::test]
    async fn test_reject_topic_wildcards_in_names() {
        let topology = TopologyService::new();

        assert_eq!(
            topology.create_floor("1/2").await,
            Err(TopologyError::InvalidName("1/2".to_string()))
        );
        assert_eq!(topology.create_floor("").await, Err(TopologyError::InvalidName(String::new())));

        topology.create_floor("1").await.unwrap();
        for name in ["+", "#", "10/1"] {
            assert_eq!(
                topology.create_room("1", name).await,
                Err(TopologyError::InvalidName(name.to_string()))
            );
        }

        assert!(topology.snapshot().await["1"].is_empty());
    }

    #[tokio::test]
    async fn test_create_room_on_missing_floor() {
        let topology = TopologyService::new();

        assert_eq!(
            topology.create_room("9", "901").await,
            Err(TopologyError::NotFound(Resource::floor("9")))
        );
    }

    #[tokio::test]
    async fn test_create_room_twice() {
        let topology = TopologyService::new();
        topology.create_floor("1").await.unwrap();
        topology.create_room("1", "101").await.unwrap();

        assert_eq!(
            topology.create_room("1", "101").await,
            Err(TopologyError::AlreadyExists(Resource::room("1", "101")))
        );

        let room = topology.room("1", "101").await.unwrap();
        assert!(room.sensor_data.is_none());
        assert!(room.controller_data.is_none());
        assert!(room.bulbs.is_empty());
        assert!(room.active);
    }

    #[tokio::test]
    async fn test_add_bulb_errors() {
        let topology = TopologyService::new();
        topology.create_floor("1").await.unwrap();

        assert_eq!(
            topology.add_bulb("1", "101", "B1").await,
            Err(TopologyError::NotFound(Resource::room("1", "101")))
        );
        assert_eq!(
            topology.add_bulb("2", "201", "B1").await,
            Err(TopologyError::NotFound(Resource::floor("2")))
        );

        topology.create_room("1", "101").await.unwrap();
        assert_eq!(topology.add_bulb("1", "101", "B1").await, Ok(Intensity::Off));
        assert_eq!(
            topology.add_bulb("1", "101", "B1").await,
            Err(TopologyError::AlreadyExists(Resource::bulb("1", "101", "B1")))
        );
    }

    #[tokio::test]
    async fn test_decision_drives_all_bulbs() {
        let topology = TopologyService::new();
        topology.create_floor("1").await.unwrap();
        topology.create_room("1", "101").await.unwrap();
        topology.add_bulb("1", "101", "B1").await.unwrap();
        topology.add_bulb("1", "101", "B2").await.unwrap();

        topology
            .set_controller_decision("1", "101", ControllerData::from(Intensity::High))
            .await
            .unwrap();

        let room = topology.room("1", "101").await.unwrap();
        assert_eq!(room.controller_data, Some(ControllerData::from(Intensity::High)));
        assert!(room.bulbs.values().all(|intensity| *intensity == Intensity::High));

        // A late bulb inherits the standing decision.
        assert_eq!(topology.add_bulb("1", "101", "B3").await, Ok(Intensity::High));
    }

    #[tokio::test]
    async fn test_sensor_reading_and_snapshot() {
        let topology = TopologyService::new();
        topology.create_floor("1").await.unwrap();
        topology.create_floor("2").await.unwrap();
        topology.create_room("1", "101").await.unwrap();

        let reading = SensorData {
            brightness: 42,
            mode: Mode::Test,
        };
        topology.set_sensor_reading("1", "101", reading).await.unwrap();

        let snapshot = topology.snapshot().await;
        assert_eq!(snapshot.len(), 2);
        assert!(snapshot["2"].is_empty());
        assert_eq!(snapshot["1"]["101"].sensor_data, Some(reading));
    }

    #[tokio::test]
    async fn test_deactivate() {
        let topology = TopologyService::new();
        topology.create_floor("1").await.unwrap();
        topology.create_room("1", "101").await.unwrap();

        assert!(topology.is_active("1", "101").await);
        topology.deactivate("1", "101").await.unwrap();
        assert!(!topology.is_active("1", "101").await);
        assert!(!topology.is_active("1", "999").await);
    }

    #[tokio::test]
    async fn test_concurrent_decisions_never_tear() {
        let topology = Arc::new(TopologyService::new());
        topology.create_floor("1").await.unwrap();
        topology.create_room("1", "101").await.unwrap();
        for bulb in ["B1", "B2", "B3", "B4"] {
            topology.add_bulb("1", "101", bulb).await.unwrap();
        }

        let writer = {
            let topology = Arc::clone(&topology);
            tokio::spawn(async move {
                for step in 0..200u32 {
                    let intensity = Intensity::from_brightness((step % 101) as u8);
                    topology
                        .set_controller_decision("1", "101", ControllerData::from(intensity))
                        .await
                        .unwrap();
                    tokio::task::yield_now().await;
                }
            })
        };

        for _ in 0..200 {
            let snapshot = topology.snapshot().await;
            let room = &snapshot["1"]["101"];
            if let Some(decision) = room.controller_data {
                assert!(room.bulbs.values().all(|intensity| *intensity == decision.intensity));
            }
            tokio::task::yield_now().await;
        }

        writer.await.unwrap();
    }
}
