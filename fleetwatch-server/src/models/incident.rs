use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::types::Json;

use super::Table;
use super::enums::{IncidentStatus, IncidentType, Severity};

/// One step in the guided fix flow shown to support staff. `order` is
/// 1-based and strictly sequential within an incident.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TroubleshootingStep {
    pub order: u32,
    pub title: String,
    pub description: String,
    pub requires_confirmation: bool,
}

/// A problem detected on a device. Created only by the heartbeat processor;
/// resolved only when its condition stops matching. At most one OPEN
/// incident per (device, type) pair can exist at any time.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Incident {
    pub id: String,
    pub device_id: String,
    pub venue_id: String,
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub incident_type: IncidentType,
    pub severity: Severity,
    pub status: IncidentStatus,
    pub summary: String,
    /// Telemetry values that triggered the incident, frozen at creation.
    pub context: Json<Value>,
    pub troubleshooting_steps: Json<Vec<TroubleshootingStep>>,
    pub detected_at: i64,
    pub resolved_at: Option<i64>,
    pub updated_at: i64,
}

#[derive(Clone)]
pub struct IncidentTable;

impl Table for IncidentTable {
    fn name(&self) -> &'static str {
        "incidents"
    }

    fn create(&self) -> String {
        String::from(
            r#"
            CREATE TABLE IF NOT EXISTS incidents (
                id                    TEXT PRIMARY KEY,
                device_id             TEXT NOT NULL,
                venue_id              TEXT NOT NULL,
                type                  TEXT NOT NULL,
                severity              TEXT NOT NULL,
                status                TEXT NOT NULL DEFAULT 'OPEN',
                summary               TEXT NOT NULL,
                context               TEXT NOT NULL DEFAULT '{}',
                troubleshooting_steps TEXT NOT NULL DEFAULT '[]',
                detected_at           INTEGER NOT NULL,
                resolved_at           INTEGER,
                updated_at            INTEGER NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_incidents_device_id ON incidents (device_id);
            CREATE INDEX IF NOT EXISTS idx_incidents_status ON incidents (status);
            CREATE UNIQUE INDEX IF NOT EXISTS idx_incidents_open_device_type
                ON incidents (device_id, type) WHERE status = 'OPEN';
            "#,
        )
    }

    fn dispose(&self) -> String {
        String::from("DROP TABLE IF EXISTS incidents;")
    }

    fn dependencies(&self) -> Vec<&'static str> {
        vec!["devices"]
    }
}
