use std::sync::Arc;

use sqlx::{Error, Sqlite, Transaction};

use crate::configs::Storage;
use crate::models::{Incident, IncidentStatus, Paginated};

pub struct IncidentRepository {
    storage: Arc<Storage>,
}

impl IncidentRepository {
    pub fn new(storage: Arc<Storage>) -> Self {
        Self { storage }
    }
}

impl IncidentRepository {
    /// Inserts a new incident. The unique index on OPEN (device, type)
    /// rows makes the insert a no-op when another writer already opened
    /// one for the same pair. Returns how many rows were inserted.
    pub async fn create(
        &self,
        item: &Incident,
        transaction: &mut Transaction<'_, Sqlite>,
    ) -> Result<u64, Error> {
        let result = sqlx::query(
            r#"
            INSERT OR IGNORE INTO incidents (
                id, device_id, venue_id, type, severity, status,
                summary, context, troubleshooting_steps,
                detected_at, resolved_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(&item.id)
        .bind(&item.device_id)
        .bind(&item.venue_id)
        .bind(item.incident_type)
        .bind(item.severity)
        .bind(item.status)
        .bind(&item.summary)
        .bind(&item.context)
        .bind(&item.troubleshooting_steps)
        .bind(item.detected_at)
        .bind(item.resolved_at)
        .bind(item.updated_at)
        .execute(&mut **transaction)
        .await?;

        Ok(result.rows_affected())
    }

    // Find incident by ID
    pub async fn find_by_id(&self, id: &str) -> Result<Option<Incident>, Error> {
        let incident: Option<Incident> = sqlx::query_as("SELECT * FROM incidents WHERE id = $1")
            .bind(id)
            .fetch_optional(self.storage.get_pool())
            .await?;

        Ok(incident)
    }

    // All OPEN incidents on a device, one per type at most
    pub async fn find_open_by_device(&self, device_id: &str) -> Result<Vec<Incident>, Error> {
        let incidents: Vec<Incident> =
            sqlx::query_as("SELECT * FROM incidents WHERE device_id = $1 AND status = 'OPEN'")
                .bind(device_id)
                .fetch_all(self.storage.get_pool())
                .await?;

        Ok(incidents)
    }

    // Close out an incident whose condition stopped matching
    pub async fn resolve(
        &self,
        id: &str,
        resolved_at: i64,
        transaction: &mut Transaction<'_, Sqlite>,
    ) -> Result<(), Error> {
        sqlx::query(
            r#"
            UPDATE incidents
            SET status = 'RESOLVED', resolved_at = $1, updated_at = $1
            WHERE id = $2
            "#,
        )
        .bind(resolved_at)
        .bind(id)
        .execute(&mut **transaction)
        .await?;

        Ok(())
    }

    // Refresh updated_at on an incident that is still matching
    pub async fn touch(
        &self,
        id: &str,
        updated_at: i64,
        transaction: &mut Transaction<'_, Sqlite>,
    ) -> Result<(), Error> {
        sqlx::query("UPDATE incidents SET updated_at = $1 WHERE id = $2")
            .bind(updated_at)
            .bind(id)
            .execute(&mut **transaction)
            .await?;

        Ok(())
    }

    // Filtered incident page, newest first
    pub async fn list_with_filters(
        &self,
        venue_id: Option<&str>,
        device_id: Option<&str>,
        status: Option<IncidentStatus>,
        limit: i64,
        offset: i64,
    ) -> Result<Paginated<Incident>, Error> {
        let mut conditions: Vec<&str> = Vec::new();
        if venue_id.is_some() {
            conditions.push("venue_id = ?");
        }
        if device_id.is_some() {
            conditions.push("device_id = ?");
        }
        if status.is_some() {
            conditions.push("status = ?");
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", conditions.join(" AND "))
        };

        let count_sql = format!("SELECT COUNT(*) FROM incidents{where_clause}");
        let mut count_query = sqlx::query_scalar::<_, i64>(&count_sql);
        if let Some(venue_id) = venue_id {
            count_query = count_query.bind(venue_id);
        }
        if let Some(device_id) = device_id {
            count_query = count_query.bind(device_id);
        }
        if let Some(status) = status {
            count_query = count_query.bind(status);
        }
        let total = count_query.fetch_one(self.storage.get_pool()).await?;

        let list_sql = format!(
            "SELECT * FROM incidents{where_clause} ORDER BY detected_at DESC, id LIMIT ? OFFSET ?"
        );
        let mut list_query = sqlx::query_as::<_, Incident>(&list_sql);
        if let Some(venue_id) = venue_id {
            list_query = list_query.bind(venue_id);
        }
        if let Some(device_id) = device_id {
            list_query = list_query.bind(device_id);
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
