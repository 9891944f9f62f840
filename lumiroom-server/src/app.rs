use std::path::Path;
use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::handles::*;
use crate::services::{ModeService, RoomService, TopologyService};

pub fn create_app(
    topology: &Arc<TopologyService>,
    modes: &Arc<ModeService>,
    rooms: &Arc<RoomService>,
    static_dir: impl AsRef<Path>,
) -> Router {
    let building = Router::new()
        .route("/data", get(get_data))
        .route("/add_floor", post(add_floor))
        .route("/add_room", post(add_room))
        .route("/add_bulb", post(add_bulb))
        .with_state(BuildingState {
            topology: topology.clone(),
            rooms: rooms.clone(),
        });

    let mode = Router::new()
        .route("/mode", get(get_modes))
        .route("/toggle_mode", post(toggle_mode))
        .with_state(ModeState {
            topology: topology.clone(),
            modes: modes.clone(),
        });

    Router::new()
        .merge(building)
        .merge(mode)
        // Anything unrouted is the operator dashboard.
        .fallback_service(ServeDir::new(static_dir))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
