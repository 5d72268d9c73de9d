use std::sync::Arc;

use sqlx::{Error, Sqlite, Transaction};

use crate::configs::Storage;
use crate::models::{Device, DeviceListItem, DeviceStatus, Paginated};

pub struct DeviceRepository {
    storage: Arc<Storage>,
}

impl DeviceRepository {
    pub fn new(storage: Arc<Storage>) -> Self {
        Self { storage }
    }
}

impl DeviceRepository {
    // Find device by ID
    pub async fn find_by_id(&self, id: &str) -> Result<Option<Device>, Error> {
        let device: Option<Device> = sqlx::query_as("SELECT * FROM devices WHERE id = $1")
            .bind(id)
            .fetch_optional(self.storage.get_pool())
            .await?;

        Ok(device)
    }

    // Get every stored device, sweep order
    pub async fn find_all(&self) -> Result<Vec<Device>, Error> {
        let devices: Vec<Device> = sqlx::query_as("SELECT * FROM devices ORDER BY id")
            .fetch_all(self.storage.get_pool())
            .await?;

        Ok(devices)
    }

    // Insert or fully replace a device snapshot, keeping created_at
    pub async fn upsert(
        &self,
        item: &Device,
        transaction: &mut Transaction<'_, Sqlite>,
    ) -> Result<(), Error> {
        sqlx::query(
            r#"
            INSERT INTO devices (
                id, venue_id, label, status,
                last_heartbeat_at, last_render_at, last_detection_at,
                signal_strength_percent, rssi_dbm, firmware_version,
                created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            ON CONFLICT(id) DO UPDATE SET
                venue_id = excluded.venue_id,
                label = excluded.label,
                status = excluded.status,
                last_heartbeat_at = excluded.last_heartbeat_at,
                last_render_at = excluded.last_render_at,
                last_detection_at = excluded.last_detection_at,
                signal_strength_percent = excluded.signal_strength_percent,
                rssi_dbm = excluded.rssi_dbm,
                firmware_version = excluded.firmware_version,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&item.id)
        .bind(&item.venue_id)
        .bind(&item.label)
        .bind(item.status)
        .bind(item.telemetry.last_heartbeat_at)
        .bind(item.telemetry.last_render_at)
        .bind(item.telemetry.last_detection_at)
        .bind(item.telemetry.signal_strength_percent)
        .bind(item.telemetry.rssi_dbm)
        .bind(&item.telemetry.firmware_version)
        .bind(item.created_at)
        .bind(item.updated_at)
        .execute(&mut **transaction)
        .await?;

        Ok(())
    }

    // Update the derived status after an evaluation
    pub async fn update_status(
        &self,
        id: &str,
        status: DeviceStatus,
        updated_at: i64,
        transaction: &mut Transaction<'_, Sqlite>,
    ) -> Result<(), Error> {
        sqlx::query("UPDATE devices SET status = $1, updated_at = $2 WHERE id = $3")
            .bind(status)
            .bind(updated_at)
            .bind(id)
            .execute(&mut **transaction)
            .await?;

        Ok(())
    }

    // Filtered fleet page with per-device open incident counts
    pub async fn list_with_filters(
        &self,
        venue_id: Option<&str>,
        status: Option<DeviceStatus>,
        limit: i64,
        offset: i64,
    ) -> Result<Paginated<DeviceListItem>, Error> {
        let mut conditions: Vec<&str> = Vec::new();
        if venue_id.is_some() {
            conditions.push("d.venue_id = ?");
        }
        if status.is_some() {
            conditions.push("d.status = ?");
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", conditions.join(" AND "))
        };

        let count_sql = format!("SELECT COUNT(*) FROM devices d{where_clause}");
        let mut count_query = sqlx::query_scalar::<_, i64>(&count_sql);
        if let Some(venue_id) = venue_id {
            count_query = count_query.bind(venue_id);
        }
        if let Some(status) = status {
            count_query = count_query.bind(status);
        }
        let total = count_query.fetch_one(self.storage.get_pool()).await?;

        let list_sql = format!(
            r#"
            SELECT d.*,
                (SELECT COUNT(*) FROM incidents i
                 WHERE i.device_id = d.id AND i.status = 'OPEN') AS open_incident_count
            FROM devices d{where_clause}
            ORDER BY d.label, d.id
            LIMIT ? OFFSET ?
            "#
        );
        let mut list_query = sqlx::query_as::<_, DeviceListItem>(&list_sql);
        if let Some(venue_id) = venue_id {
            list_query = list_query.bind(venue_id);
        }
        if let Some(status) = status {
            list_query = list_query.bind(status);
        }
        let items = list_query
            .bind(limit)
            .bind(offset)
            .fetch_all(self.storage.get_pool())
            .await?;

        Ok(Paginated {
            items,
            total,
            limit,
            offset,
        })
    }
}
