use super::{BusError, TopologyError};

/// Failure to bring a room and its workers up.
#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    #[error(transparent)]
    Topology(#[from] TopologyError),

    #[error(transparent)]
    Bus(#[from] BusError),
}
