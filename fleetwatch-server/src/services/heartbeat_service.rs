use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use uuid::Uuid;

use crate::configs::Storage;
use crate::models::{Device, DeviceStatus, Incident, IncidentStatus, IncidentType, Telemetry};
use crate::repositories::{DeviceRepository, IncidentRepository};
use crate::rules::{RuleEngine, RuleMatch, StepFactory};

use super::notification_service::NotificationService;
use super::Clock;

/// Telemetry payload one device sends per heartbeat. Validated at the
/// intake boundary before it reaches this service.
#[derive(Debug, Clone, Deserialize)]
pub struct HeartbeatRequest {
    pub device_id: String,
    pub venue_id: String,
    pub label: String,
    pub last_render_at: Option<i64>,
    pub last_detection_at: Option<i64>,
    pub signal_strength_percent: Option<f64>,
    pub rssi_dbm: Option<f64>,
    pub firmware_version: Option<String>,
}

/// What one heartbeat (or one sweep of a stored device) changed.
#[derive(Debug, Serialize)]
pub struct HeartbeatResult {
    pub device: Device,
    pub new_incidents: Vec<Incident>,
    pub resolved_incidents: Vec<Incident>,
}

/// Owns the full lifecycle of one heartbeat: replace the device snapshot,
/// run the rules, derive the status, then reconcile rule output against the
/// device's open incidents so at most one OPEN incident exists per type.
pub struct HeartbeatService {
    storage: Arc<Storage>,
    device_repository: Arc<DeviceRepository>,
    incident_repository: Arc<IncidentRepository>,
    rule_engine: Arc<RuleEngine>,
    step_factory: Arc<StepFactory>,
    notification_service: Option<Arc<NotificationService>>,
    clock: Clock,
}

impl HeartbeatService {
    pub fn new(
        storage: Arc<Storage>,
        device_repository: Arc<DeviceRepository>,
        incident_repository: Arc<IncidentRepository>,
        rule_engine: Arc<RuleEngine>,
        step_factory: Arc<StepFactory>,
        clock: Clock,
    ) -> Self {
        Self {
            storage,
            device_repository,
            incident_repository,
            rule_engine,
            step_factory,
            notification_service: None,
            clock,
        }
    }

    /// Wires in the notification pipeline. Without it, incidents are still
    /// created and resolved but nobody gets told.
    pub fn with_notifications(mut self, notification_service: Arc<NotificationService>) -> Self {
        self.notification_service = Some(notification_service);
        self
    }

    pub async fn handle_heartbeat(
        &self,
        request: &HeartbeatRequest,
    ) -> Result<HeartbeatResult, sqlx::Error> {
        let now = (self.clock)();

        let existing = self.device_repository.find_by_id(&request.device_id).await?;
        let mut device = self.build_device(request, now, existing.as_ref());

        // evaluate before persisting so status reflects the fresh snapshot
        let matches = self.rule_engine.evaluate(&device, now);
        device.status = derive_status(&matches);

        let open_incidents = self
            .incident_repository
            .find_open_by_device(&request.device_id)
            .await?;

        let mut tx = self.storage.get_pool().begin().await?;
        self.device_repository.upsert(&device, &mut tx).await?;
        let (new_incidents, resolved_incidents) = self
            .reconcile(&device, &matches, open_incidents, now, &mut tx)
            .await?;
        tx.commit().await?;

        self.notify_new_incidents(&new_incidents).await;

        Ok(HeartbeatResult {
            device,
            new_incidents,
            resolved_incidents,
        })
    }

    /// Re-evaluates every stored device against the current clock. This is
    /// where OFFLINE incidents come from: a silent device never triggers
    /// `handle_heartbeat`, so its stored snapshot has to be swept.
    pub async fn sweep_fleet(&self) -> Result<(usize, usize), sqlx::Error> {
        let devices = self.device_repository.find_all().await?;

        let mut total_new = 0;
        let mut total_resolved = 0;

        for device in devices {
            let result = self.sweep_device(device).await?;
            total_new += result.new_incidents.len();
            total_resolved += result.resolved_incidents.len();
        }

        if total_new > 0 || total_resolved > 0 {
            tracing::info!(
                new = total_new,
                resolved = total_resolved,
                "fleet sweep reconciled incidents"
            );
        }

        Ok((total_new, total_resolved))
    }

    /// One device's share of the sweep: same reconciliation as a heartbeat,
    /// but over the stored telemetry; `last_heartbeat_at` is not refreshed.
    pub async fn sweep_device(&self, mut device: Device) -> Result<HeartbeatResult, sqlx::Error> {
        let now = (self.clock)();

        let matches = self.rule_engine.evaluate(&device, now);
        device.status = derive_status(&matches);
        device.updated_at = now;

        let open_incidents = self
            .incident_repository
            .find_open_by_device(&device.id)
            .await?;

        let mut tx = self.storage.get_pool().begin().await?;
        self.device_repository
            .update_status(&device.id, device.status, now, &mut tx)
            .await?;
        let (new_incidents, resolved_incidents) = self
            .reconcile(&device, &matches, open_incidents, now, &mut tx)
            .await?;
        tx.commit().await?;

        self.notify_new_incidents(&new_incidents).await;

        Ok(HeartbeatResult {
            device,
            new_incidents,
            resolved_incidents,
        })
    }

    /// Resolves open incidents whose rule no longer fires, keeps matching
    /// ones open with a fresh `updated_at`, and creates incidents for
    /// matches that have no open incident yet.
    async fn reconcile(
        &self,
        device: &Device,
        matches: &[RuleMatch],
        open_incidents: Vec<Incident>,
        now: i64,
        tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    ) -> Result<(Vec<Incident>, Vec<Incident>), sqlx::Error> {
        let matched_types: HashSet<IncidentType> =
            matches.iter().map(|m| m.incident_type).collect();

        let mut still_open_types = HashSet::new();
        let mut resolved_incidents = Vec::new();

        for mut incident in open_incidents {
            if matched_types.contains(&incident.incident_type) {
                self.incident_repository.touch(&incident.id, now, tx).await?;
                still_open_types.insert(incident.incident_type);
            } else {
                self.incident_repository.resolve(&incident.id, now, tx).await?;
                incident.status = IncidentStatus::Resolved;
                incident.resolved_at = Some(now);
                incident.updated_at = now;
                resolved_incidents.push(incident);
            }
        }

        let mut new_incidents = Vec::new();

        for matched in matches {
            if still_open_types.contains(&matched.incident_type) {
                continue;
            }

            let steps = self.step_factory.build_steps(matched, device);
            let incident = Incident {
                id: Uuid::new_v4().to_string(),
                device_id: device.id.clone(),
                venue_id: device.venue_id.clone(),
                incident_type: matched.incident_type,
                severity: matched.severity,
                status: IncidentStatus::Open,
                summary: matched.summary.clone(),
                context: Json(matched.context.clone()),
                troubleshooting_steps: Json(steps),
                detected_at: now,
                resolved_at: None,
                updated_at: now,
            };

            // a concurrent sweep or heartbeat may have opened this type
            // first; the insert is ignored then and nobody is re-notified
            if self.incident_repository.create(&incident, tx).await? > 0 {
                new_incidents.push(incident);
            }
        }

        Ok((new_incidents, resolved_incidents))
    }

    /// Fan-out happens after the incident transaction commits. A failure
    /// here loses at most a notification, never an incident.
    async fn notify_new_incidents(&self, incidents: &[Incident]) {
        let Some(notification_service) = &self.notification_service else {
            return;
        };

        for incident in incidents {
            if let Err(error) = notification_service.on_incident_created(incident).await {
                tracing::error!(
                    incident_id = %incident.id,
                    %error,
                    "failed to enqueue notifications"
                );
            }
        }
    }

    /// Builds the fresh device snapshot. Telemetry is a full replace with
    /// one exception: firmware version is sticky, since most heartbeats
    /// omit it and the installed firmware does not vanish between reports.
    fn build_device(
        &self,
        request: &HeartbeatRequest,
        now: i64,
        existing: Option<&Device>,
    ) -> Device {
        let firmware_version = request.firmware_version.clone().or_else(|| {
            existing.and_then(|device| device.telemetry.firmware_version.clone())
        });

        Device {
            id: request.device_id.clone(),
            venue_id: request.venue_id.clone(),
            label: request.label.clone(),
            // replaced after rule evaluation
            status: DeviceStatus::Unknown,
            telemetry: Telemetry {
                last_heartbeat_at: now,
                last_render_at: request.last_render_at,
                last_detection_at: request.last_detection_at,
                signal_strength_percent: request.signal_strength_percent,
                rssi_dbm: request.rssi_dbm,
                firmware_version,
            },
            created_at: existing.map_or(now, |device| device.created_at),
            updated_at: now,
        }
    }
}

/// OFFLINE beats DEGRADED; no matches at all means the device is healthy.
fn derive_status(matches: &[RuleMatch]) -> DeviceStatus {
    if matches
        .iter()
        .any(|m| m.incident_type == IncidentType::Offline)
    {
        DeviceStatus::Offline
    } else if !matches.is_empty() {
        DeviceStatus::Degraded
    } else {
        DeviceStatus::Online
    }
}
