use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;

use crate::errors::{ApiError, DeviceError};
use crate::models::DeviceStatus;
use crate::services::DeviceService;

use super::clamp_page;

#[derive(Clone)]
pub struct DeviceState {
    pub device_service: Arc<DeviceService>,
}

#[derive(Debug, Deserialize)]
pub struct DeviceQuery {
    pub venue_id: Option<String>,
    pub status: Option<DeviceStatus>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

pub async fn get_devices(
    State(state): State<DeviceState>,
    Query(query): Query<DeviceQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let (limit, offset) = clamp_page(query.limit, query.offset);

    let page = state
        .device_service
        .list(query.venue_id.as_deref(), query.status, limit, offset)
        .await?;

    Ok(Json(page))
}

pub async fn get_device(
    State(state): State<DeviceState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let detail = state
        .device_service
        .get_detail(&id)
        .await?
        .ok_or(DeviceError::DeviceNotFound)?;

    Ok(Json(detail))
}
