use axum::http::StatusCode;
use lumiroom_api::models::ParseModeError;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ModeError {
    #[error("Invalid mode: {0}")]
    InvalidMode(String),
}

impl ModeError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ModeError::InvalidMode(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl From<ParseModeError> for ModeError {
    fn from(error: ParseModeError) -> Self {
        ModeError::InvalidMode(error.0)
    }
}
