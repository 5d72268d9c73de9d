use axum::http::StatusCode;

#[derive(Debug, thiserror::Error)]
pub enum IncidentError {
    #[error("Incident not found")]
    IncidentNotFound,

    #[error("Invalid request parameters")]
    InvalidRequest,
}

impl IncidentError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            IncidentError::IncidentNotFound => StatusCode::NOT_FOUND,
            IncidentError::InvalidRequest => StatusCode::BAD_REQUEST,
        }
    }
}
