use std::sync::Arc;

use serde::Serialize;

use crate::models::{Device, DeviceListItem, DeviceStatus, Incident, Paginated};
use crate::repositories::{DeviceRepository, IncidentRepository};

/// Device plus everything currently wrong with it.
#[derive(Debug, Serialize)]
pub struct DeviceDetail {
    #[serde(flatten)]
    pub device: Device,
    pub open_incidents: Vec<Incident>,
}

/// Read-side queries over the fleet. All mutation goes through the
/// heartbeat service.
pub struct DeviceService {
    device_repository: Arc<DeviceRepository>,
    incident_repository: Arc<IncidentRepository>,
}

impl DeviceService {
    pub fn new(
        device_repository: Arc<DeviceRepository>,
        incident_repository: Arc<IncidentRepository>,
    ) -> Self {
        Self {
            device_repository,
            incident_repository,
        }
    }

    pub async fn list(
        &self,
        venue_id: Option<&str>,
        status: Option<DeviceStatus>,
        limit: i64,
        offset: i64,
    ) -> Result<Paginated<DeviceListItem>, sqlx::Error> {
        self.device_repository
            .list_with_filters(venue_id, status, limit, offset)
            .await
    }

    pub async fn get_detail(&self, id: &str) -> Result<Option<DeviceDetail>, sqlx::Error> {
        let Some(device) = self.device_repository.find_by_id(id).await? else {
            return Ok(None);
        };

        let open_incidents = self.incident_repository.find_open_by_device(id).await?;

        Ok(Some(DeviceDetail {
            device,
            open_incidents,
        }))
    }
}
