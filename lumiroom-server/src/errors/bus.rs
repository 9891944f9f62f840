use axum::http::StatusCode;

#[derive(Debug, thiserror::Error)]
pub enum BusError {
    #[error("Client error: {0}")]
    Client(#[from] rumqttc::ClientError),

    #[error("Connection error: {0}")]
    Connection(#[from] rumqttc::ConnectionError),

    #[error("Payload error: {0}")]
    Payload(#[from] serde_json::Error),

    #[error("Client {0} is closed")]
    Closed(String),

    #[error("Gave up reconnecting after {attempts} attempts")]
    RetriesExhausted { attempts: u32 },
}

impl BusError {
    /// Whether the owning worker can keep going after this error.
    pub fn is_transient(&self) -> bool {
        !matches!(self, BusError::Closed(_) | BusError::RetriesExhausted { .. })
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            BusError::Payload(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}
