use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateFloorRequest {
    pub floor_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateRoomRequest {
    pub floor: String,
    pub room: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateBulbRequest {
    pub floor: String,
    pub room: String,
    pub bulb_id: String,
}

/// Sets a room override when both `floor` and `room` are given, otherwise
/// the global mode.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToggleModeRequest {
    #[serde(default)]
    pub floor: Option<String>,
    #[serde(default)]
    pub room: Option<String>,
    pub mode: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
