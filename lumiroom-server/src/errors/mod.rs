pub mod api;
pub mod bus;
pub mod mode;
pub mod room;
pub mod topology;

pub use api::ApiError;
pub use bus::BusError;
pub use mode::ModeError;
pub use room::RoomError;
pub use topology::{Resource, TopologyError};

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use uuid::Uuid;

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_message, error_id) = match self {
            ApiError::TopologyError(e) => (e.status_code(), e.to_string(), None),
            ApiError::ModeError(e) => (e.status_code(), e.to_string(), None),
            ApiError::BusError(e) => {
                let error_id = Uuid::new_v4();
                tracing::error!(error_id = ?error_id, "Bus error: {}", e);
                (e.status_code(), e.to_string(), Some(error_id.to_string()))
            }
            ApiError::InternalError(e) => {
                let error_id = Uuid::new_v4();
                tracing::error!(error_id = ?error_id, "Internal error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                    Some(error_id.to_string()),
                )
            }
        };

        let mut error_obj = json!({
            "code": status.as_u16(),
            "message": error_message
        });

        if let Some(error_id) = error_id {
            error_obj["error_id"] = json!(error_id);
        }

        let body = Json(json!({
            "error": error_obj
        }));

        (status, body).into_response()
    }
}
