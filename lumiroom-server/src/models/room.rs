use std::collections::BTreeMap;

use lumiroom_api::models::{ControllerData, Intensity, RoomSnapshot, SensorData};

#[derive(Debug, Clone)]
pub struct Room {
    pub sensor_data: Option<SensorData>,
    pub controller_data: Option<ControllerData>,
    pub bulbs: BTreeMap<String, Intensity>,
    /// Cleared to stop the room's sensor at its next cycle.
    pub active: bool,
}

impl Room {
    pub fn new() -> Self {
        Self {
            sensor_data: None,
            controller_data: None,
            bulbs: BTreeMap::new(),
            active: true,
        }
    }

    /// Intensity a newly added bulb starts with.
    pub fn current_intensity(&self) -> Intensity {
        self.controller_data
            .map(|data| data.intensity)
            .unwrap_or_default()
    }

    /// Records a decision and drives every bulb to it.
    pub fn apply_decision(&mut self, decision: ControllerData) {
        self.controller_data = Some(decision);

        for intensity in self.bulbs.values_mut() {
            *intensity = decision.intensity;
        }
    }

    pub fn snapshot(&self) -> RoomSnapshot {
        RoomSnapshot {
            sensor_data: self.sensor_data,
            controller_data: self.controller_data,
            bulbs: self.bulbs.clone(),
            active: self.active,
        }
    }
}

impl Default for Room {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_room_is_empty_and_active() {
        let room = Room::new();

        assert!(room.sensor_data.is_none());
        assert!(room.controller_data.is_none());
        assert!(room.bulbs.is_empty());
        assert!(room.active);
        assert_eq!(room.current_intensity(), Intensity::Off);
    }

    #[test]
    fn test_apply_decision_overwrites_bulbs() {
        let mut room = Room::new();
        room.bulbs.insert("B1".to_string(), Intensity::Off);
        room.bulbs.insert("B2".to_string(), Intensity::Low);

        room.apply_decision(ControllerData::from(Intensity::Medium));

        assert_eq!(room.current_intensity(), Intensity::Medium);
        assert!(room.bulbs.values().all(|intensity| *intensity == Intensity::Medium));
    }
}
