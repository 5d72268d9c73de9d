use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;

use crate::errors::{ApiError, IncidentError};
use crate::models::IncidentStatus;
use crate::services::IncidentService;

use super::clamp_page;

#[derive(Clone)]
pub struct IncidentState {
    pub incident_service: Arc<IncidentService>,
}

#[derive(Debug, Deserialize)]
pub struct IncidentQuery {
    pub venue_id: Option<String>,
    pub device_id: Option<String>,
    pub status: Option<IncidentStatus>,
    /// When true, ignore `status` and return every incident.
    #[serde(default)]
    pub include_resolved: bool,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

pub async fn get_incidents(
    State(state): State<IncidentState>,
    Query(query): Query<IncidentQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let (limit, offset) = clamp_page(query.limit, query.offset);

    // open incidents are what callers almost always want
    let status = if query.include_resolved {
        None
    } else {
        Some(query.status.unwrap_or(IncidentStatus::Open))
    };

    let page = state
        .incident_service
        .list(
            query.venue_id.as_deref(),
            query.device_id.as_deref(),
            status,
            limit,
            offset,
        )
        .await?;

    Ok(Json(page))
}

pub async fn get_incident(
    State(state): State<IncidentState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let item = state
        .incident_service
        .get(&id)
        .await?
        .ok_or(IncidentError::IncidentNotFound)?;

    Ok(Json(item))
}
