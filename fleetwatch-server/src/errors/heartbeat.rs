use axum::http::StatusCode;

/// Rejections for malformed heartbeat payloads. These are raised at the
/// intake boundary; the heartbeat processor never sees invalid input.
#[derive(Debug, thiserror::Error)]
pub enum HeartbeatError {
    #[error("device_id is required")]
    MissingDeviceId,

    #[error("venue_id is required")]
    MissingVenueId,

    #[error("label is required")]
    MissingLabel,

    #[error("signal_strength_percent must be between 0 and 100")]
    SignalOutOfRange,

    #[error("telemetry timestamps must be positive unix seconds")]
    NonPositiveTimestamp,
}

impl HeartbeatError {
    pub fn status_code(&self) -> StatusCode {
        StatusCode::BAD_REQUEST
    }
}
