use std::sync::Arc;

use serde::Serialize;

use crate::models::{DeliverySummary, Incident, IncidentStatus, Paginated};
use crate::repositories::{IncidentRepository, OutboxRepository};

/// Incident plus its delivery rollup, so one list call answers "did anyone
/// actually get told about this".
#[derive(Debug, Serialize)]
pub struct IncidentListItem {
    #[serde(flatten)]
    pub incident: Incident,
    pub notifications: DeliverySummary,
}

/// Read-side queries over incidents. Creation and resolution belong to the
/// heartbeat service alone.
pub struct IncidentService {
    incident_repository: Arc<IncidentRepository>,
    outbox_repository: Option<Arc<OutboxRepository>>,
}

impl IncidentService {
    pub fn new(incident_repository: Arc<IncidentRepository>) -> Self {
        Self {
            incident_repository,
            outbox_repository: None,
        }
    }

    /// Enables delivery rollups on reads. Without it, every incident
    /// reports an empty summary.
    pub fn with_outbox(mut self, outbox_repository: Arc<OutboxRepository>) -> Self {
        self.outbox_repository = Some(outbox_repository);
        self
    }

    pub async fn list(
        &self,
        venue_id: Option<&str>,
        device_id: Option<&str>,
        status: Option<IncidentStatus>,
        limit: i64,
        offset: i64,
    ) -> Result<Paginated<IncidentListItem>, sqlx::Error> {
        let page = self
            .incident_repository
            .list_with_filters(venue_id, device_id, status, limit, offset)
            .await?;

        let mut items = Vec::with_capacity(page.items.len());
        for incident in page.items {
            let notifications = self.summarize(&incident.id).await?;
            items.push(IncidentListItem {
                incident,
                notifications,
            });
        }

        Ok(Paginated {
            items,
            total: page.total,
            limit: page.limit,
            offset: page.offset,
        })
    }

    pub async fn get(&self, id: &str) -> Result<Option<IncidentListItem>, sqlx::Error> {
        let Some(incident) = self.incident_repository.find_by_id(id).await? else {
            return Ok(None);
        };

        let notifications = self.summarize(&incident.id).await?;

        Ok(Some(IncidentListItem {
            incident,
            notifications,
        }))
    }

    async fn summarize(&self, incident_id: &str) -> Result<DeliverySummary, sqlx::Error> {
        match &self.outbox_repository {
            Some(outbox) => outbox.summarize_by_incident(incident_id).await,
            None => Ok(DeliverySummary::default()),
        }
    }
}
