use super::{DeviceError, HeartbeatError, IncidentError};

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Device error: {0}")]
    DeviceError(#[from] DeviceError),

    #[error("Heartbeat error: {0}")]
    HeartbeatError(#[from] HeartbeatError),

    #[error("Incident error: {0}")]
    IncidentError(#[from] IncidentError),

    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}
