use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::response::IntoResponse;
use lumiroom_api::restful::{MessageResponse, ToggleModeRequest};

use crate::errors::{ApiError, Resource, TopologyError};
use crate::services::{ModeService, TopologyService};

#[derive(Clone)]
pub struct ModeState {
    pub topology: Arc<TopologyService>,
    pub modes: Arc<ModeService>,
}

pub async fn get_modes(State(state): State<ModeState>) -> impl IntoResponse {
    Json(state.modes.snapshot().await)
}

pub async fn toggle_mode(
    State(state): State<ModeState>,
    Json(body): Json<ToggleModeRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let mode = ModeService::parse(&body.mode)?;

    match (&body.floor, &body.room) {
        (Some(floor), Some(room)) => {
            if !state.topology.contains_room(floor, room).await {
                return Err(TopologyError::NotFound(Resource::room(floor, room)).into());
            }

            state.modes.set_room_mode(floor, room, mode).await;
        }
        _ => state.modes.set_global_mode(mode).await,
    }

    Ok(Json(MessageResponse::new(format!("Mode set to {mode}"))))
}
