use super::{BusError, ModeError, RoomError, TopologyError};

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Topology error: {0}")]
    TopologyError(#[from] TopologyError),

    #[error("Mode error: {0}")]
    ModeError(#[from] ModeError),

    #[error("Bus error: {0}")]
    BusError(#[from] BusError),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

impl From<RoomError> for ApiError {
    fn from(error: RoomError) -> Self {
        match error {
            RoomError::Topology(e) => ApiError::TopologyError(e),
            RoomError::Bus(e) => ApiError::BusError(e),
        }
    }
}
