mod building;
mod mode;

pub use building::*;
pub use mode::*;

use std::fmt;

use serde::{Deserialize, Serialize};

/// Discretized controller output driving every bulb of a room.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Intensity {
    #[default]
    Off,
    Low,
    Medium,
    High,
}

impl Intensity {
    /// Maps a brightness reading onto the four intensity buckets.
    ///
    /// `0` is `Off`, `1..30` is `Low`, `30..=70` is `Medium` and anything
    /// brighter is `High`.
    pub fn from_brightness(brightness: u8) -> Self {
        match brightness {
            0 => Intensity::Off,
            1..=29 => Intensity::Low,
            30..=70 => Intensity::Medium,
            _ => Intensity::High,
        }
    }
}

impl From<u8> for Intensity {
    fn from(brightness: u8) -> Self {
        Intensity::from_brightness(brightness)
    }
}

impl fmt::Display for Intensity {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Intensity::Off => write!(f, "off"),
            Intensity::Low => write!(f, "low"),
            Intensity::Medium => write!(f, "medium"),
            Intensity::High => write!(f, "high"),
        }
    }
}

/// Payload published on `building/{floor}/{room}/light_sensor`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SensorData {
    /// Brightness level in percent (0-100)
    pub brightness: u8,
    /// Mode the reading was produced in
    pub mode: Mode,
}

/// Payload published on `building/{floor}/{room}/room_controller`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControllerData {
    pub intensity: Intensity,
}

impl From<Intensity> for ControllerData {
    fn from(intensity: Intensity) -> Self {
        Self { intensity }
    }
}

/// Retained last-will payload published on `building/status/{client_id}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientStatus {
    pub status: String,
}

impl ClientStatus {
    pub fn disconnected() -> Self {
        Self {
            status: "disconnected".to_string(),
        }
    }
}
