use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{ControllerData, Intensity, Mode, SensorData};

/// Floor name → rooms on that floor.
pub type BuildingSnapshot = BTreeMap<String, FloorSnapshot>;

/// Room name → room state.
pub type FloorSnapshot = BTreeMap<String, RoomSnapshot>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomSnapshot {
    /// Last published sensor reading
    pub sensor_data: Option<SensorData>,
    /// Last controller decision
    pub controller_data: Option<ControllerData>,
    /// Bulb id → current intensity
    pub bulbs: BTreeMap<String, Intensity>,
    /// Whether the room's sensor is still running
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModeSnapshot {
    pub global: Mode,
    /// `floor:room` → explicit override, `None` inherits `global`
    pub rooms: BTreeMap<String, Option<Mode>>,
}
