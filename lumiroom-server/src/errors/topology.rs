use std::fmt;

use axum::http::StatusCode;

/// A node of the building topology, used to name the subject of an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resource {
    Floor(String),
    Room { floor: String, room: String },
    Bulb { floor: String, room: String, bulb: String },
}

impl Resource {
    pub fn floor(floor: &str) -> Self {
        Resource::Floor(floor.to_string())
    }

    pub fn room(floor: &str, room: &str) -> Self {
        Resource::Room {
            floor: floor.to_string(),
            room: room.to_string(),
        }
    }

    pub fn bulb(floor: &str, room: &str, bulb: &str) -> Self {
        Resource::Bulb {
            floor: floor.to_string(),
            room: room.to_string(),
            bulb: bulb.to_string(),
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Resource::Floor(floor) => write!(f, "Floor {floor}"),
            Resource::Room { floor, room } => write!(f, "Room {room} on floor {floor}"),
            Resource::Bulb { floor, room, bulb } => {
                write!(f, "Bulb {bulb} in room {room} on floor {floor}")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TopologyError {
    #[error("{0} already exists")]
    AlreadyExists(Resource),

    #[error("{0} does not exist")]
    NotFound(Resource),

    #[error("Invalid name `{0}`, names must be non-empty and free of `/`, `+` and `#`")]
    InvalidName(String),
}

impl TopologyError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            TopologyError::AlreadyExists(_) => StatusCode::CONFLICT,
            TopologyError::NotFound(_) => StatusCode::NOT_FOUND,
            TopologyError::InvalidName(_) => StatusCode::BAD_REQUEST,
        }
    }
}
