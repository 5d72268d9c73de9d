use serde::{Deserialize, Serialize};

use super::Table;
use super::enums::DeviceStatus;

/// Latest snapshot of what a device reported back. All timestamps are unix
/// seconds, matching the unit devices report in. Optional fields are absent
/// when the device has never reported them.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Telemetry {
    pub last_heartbeat_at: i64,
    pub last_render_at: Option<i64>,
    pub last_detection_at: Option<i64>,
    pub signal_strength_percent: Option<f64>,
    pub rssi_dbm: Option<f64>,
    pub firmware_version: Option<String>,
}

/// One media box deployed at a venue. Owned by the device store; mutated
/// only by the heartbeat processor, which replaces the whole telemetry
/// snapshot on every heartbeat.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Device {
    pub id: String,
    pub venue_id: String,
    pub label: String,
    pub status: DeviceStatus,
    #[sqlx(flatten)]
    pub telemetry: Telemetry,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Fleet list row: the device plus how many incidents are currently open
/// against it.
#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct DeviceListItem {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub device: Device,
    pub open_incident_count: i64,
}

#[derive(Clone)]
pub struct DeviceTable;

impl Table for DeviceTable {
    fn name(&self) -> &'static str {
        "devices"
    }

    fn create(&self) -> String {
        String::from(
            r#"
            CREATE TABLE IF NOT EXISTS devices (
                id                       TEXT PRIMARY KEY,
                venue_id                 TEXT NOT NULL,
                label                    TEXT NOT NULL,
                status                   TEXT NOT NULL DEFAULT 'UNKNOWN',
                last_heartbeat_at        INTEGER NOT NULL,
                last_render_at           INTEGER,
                last_detection_at        INTEGER,
                signal_strength_percent  REAL,
                rssi_dbm                 REAL,
                firmware_version         TEXT,
                created_at               INTEGER NOT NULL,
                updated_at               INTEGER NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_devices_venue_id ON devices (venue_id);
            "#,
        )
    }

    fn dispose(&self) -> String {
        String::from("DROP TABLE IF EXISTS devices;")
    }

    fn dependencies(&self) -> Vec<&'static str> {
        vec![]
    }
}
