use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::response::IntoResponse;
use lumiroom_api::restful::{CreateBulbRequest, CreateFloorRequest, CreateRoomRequest, MessageResponse};

use crate::errors::ApiError;
use crate::services::{RoomService, TopologyService};

#[derive(Clone)]
pub struct BuildingState {
    pub topology: Arc<TopologyService>,
    pub rooms: Arc<RoomService>,
}

pub async fn get_data(State(state): State<BuildingState>) -> impl IntoResponse {
    Json(state.topology.snapshot().await)
}

pub async fn add_floor(
    State(state): State<BuildingState>,
    Json(body): Json<CreateFloorRequest>,
) -> Result<impl IntoResponse, ApiError> {
    state.topology.create_floor(&body.floor_name).await?;

    Ok(Json(MessageResponse::new(format!("Floor {} added", body.floor_name))))
}

pub async fn add_room(
    State(state): State<BuildingState>,
    Json(body): Json<CreateRoomRequest>,
) -> Result<impl IntoResponse, ApiError> {
    state.rooms.create_room(&body.floor, &body.room).await?;

    Ok(Json(MessageResponse::new(format!(
        "Room {} added to floor {}",
        body.room, body.floor
    ))))
}

pub async fn add_bulb(
    State(state): State<BuildingState>,
    Json(body): Json<CreateBulbRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let intensity = state
        .topology
        .add_bulb(&body.floor, &body.room, &body.bulb_id)
        .await?;

    tracing::debug!("bulb {} starts at {}", body.bulb_id, intensity);

    Ok(Json(MessageResponse::new(format!("Bulb {} added", body.bulb_id))))
}
