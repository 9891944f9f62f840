use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifies a room across the building, rendered as `floor:room`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RoomKey {
    pub floor: String,
    pub room: String,
}

impl RoomKey {
    pub fn new(floor: impl Into<String>, room: impl Into<String>) -> Self {
        Self {
            floor: floor.into(),
            room: room.into(),
        }
    }
}

impl fmt::Display for RoomKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}:{}", self.floor, self.room)
    }
}
