use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;

use crate::errors::{ApiError, HeartbeatError};
use crate::services::{HeartbeatRequest, HeartbeatService};

#[derive(Clone)]
pub struct HeartbeatState {
    pub heartbeat_service: Arc<HeartbeatService>,
}

pub async fn post_heartbeat(
    State(state): State<HeartbeatState>,
    Json(body): Json<HeartbeatRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate(&body)?;

    let result = state.heartbeat_service.handle_heartbeat(&body).await?;

    Ok(Json(result))
}

/// Shape checks on the payload; the heartbeat service never sees invalid
/// input.
fn validate(body: &HeartbeatRequest) -> Result<(), HeartbeatError> {
    if body.device_id.trim().is_empty() {
        return Err(HeartbeatError::MissingDeviceId);
    }
    if body.venue_id.trim().is_empty() {
        return Err(HeartbeatError::MissingVenueId);
    }
    if body.label.trim().is_empty() {
        return Err(HeartbeatError::MissingLabel);
    }
    if let Some(signal) = body.signal_strength_percent {
        if !(0.0..=100.0).contains(&signal) {
            return Err(HeartbeatError::SignalOutOfRange);
        }
    }
    for timestamp in [body.last_render_at, body.last_detection_at].into_iter().flatten() {
        if timestamp <= 0 {
            return Err(HeartbeatError::NonPositiveTimestamp);
        }
    }

    Ok(())
}
