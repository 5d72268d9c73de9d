use std::sync::Arc;

use sqlx::{Error, Sqlite, Transaction};
use uuid::Uuid;

use crate::configs::Storage;
use crate::models::{DeliveryStatus, DeliverySummary, NewOutboxEntry, OutboxEntry};

/// An entry that fails this many times is marked FAILED for good.
pub const MAX_DELIVERY_ATTEMPTS: i64 = 3;

pub struct OutboxRepository {
    storage: Arc<Storage>,
}

impl OutboxRepository {
    pub fn new(storage: Arc<Storage>) -> Self {
        Self { storage }
    }
}

impl OutboxRepository {
    /// Inserts the composed entries, silently skipping any (incident,
    /// channel, recipient) triple that already has a row. Returns how many
    /// rows were actually inserted.
    pub async fn enqueue(
        &self,
        entries: &[NewOutboxEntry],
        now: i64,
        transaction: &mut Transaction<'_, Sqlite>,
    ) -> Result<u64, Error> {
        let mut inserted = 0;

        for entry in entries {
            let result = sqlx::query(
                r#"
                INSERT OR IGNORE INTO notification_outbox (
                    id, incident_id, venue_id, channel, to_address,
                    subject, body, status, attempt_count,
                    scheduled_at, created_at, updated_at
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, 'PENDING', 0, $8, $9, $9)
                "#,
            )
            .bind(Uuid::new_v4().to_string())
            .bind(&entry.incident_id)
            .bind(&entry.venue_id)
            .bind(entry.channel)
            .bind(&entry.to_address)
            .bind(&entry.subject)
            .bind(&entry.body)
            .bind(entry.scheduled_at)
            .bind(now)
            .execute(&mut **transaction)
            .await?;

            inserted += result.rows_affected();
        }

        Ok(inserted)
    }

    // Pending entries whose scheduled time has arrived, oldest first.
    // Entries at the attempt cap are never picked up, whatever their status.
    pub async fn list_due(&self, now: i64, limit: i64) -> Result<Vec<OutboxEntry>, Error> {
        let entries: Vec<OutboxEntry> = sqlx::query_as(
            r#"
            SELECT * FROM notification_outbox
            WHERE status = 'PENDING' AND scheduled_at <= $1 AND attempt_count < $2
            ORDER BY scheduled_at, created_at
            LIMIT $3
            "#,
        )
        .bind(now)
        .bind(MAX_DELIVERY_ATTEMPTS)
        .bind(limit)
        .fetch_all(self.storage.get_pool())
        .await?;

        Ok(entries)
    }

    pub async fn mark_sent(
        &self,
        id: &str,
        now: i64,
        transaction: &mut Transaction<'_, Sqlite>,
    ) -> Result<(), Error> {
        sqlx::query(
            r#"
            UPDATE notification_outbox
            SET status = 'SENT', attempt_count = attempt_count + 1,
                last_error = NULL, sent_at = $1, updated_at = $1
            WHERE id = $2
            "#,
        )
        .bind(now)
        .bind(id)
        .execute(&mut **transaction)
        .await?;

        Ok(())
    }

    /// Records a failed attempt and pushes the entry back into the queue
    /// at `next_attempt_at`.
    pub async fn schedule_retry(
        &self,
        id: &str,
        error: &str,
        next_attempt_at: i64,
        now: i64,
        transaction: &mut Transaction<'_, Sqlite>,
    ) -> Result<(), Error> {
        sqlx::query(
            r#"
            UPDATE notification_outbox
            SET attempt_count = attempt_count + 1, last_error = $1,
                scheduled_at = $2, updated_at = $3
            WHERE id = $4
            "#,
        )
        .bind(error)
        .bind(next_attempt_at)
        .bind(now)
        .bind(id)
        .execute(&mut **transaction)
        .await?;

        Ok(())
    }

    /// Records a final failed attempt; the worker never picks this entry
    /// up again.
    pub async fn mark_failed(
        &self,
        id: &str,
        error: &str,
        now: i64,
        transaction: &mut Transaction<'_, Sqlite>,
    ) -> Result<(), Error> {
        sqlx::query(
            r#"
            UPDATE notification_outbox
            SET status = 'FAILED', attempt_count = attempt_count + 1,
                last_error = $1, updated_at = $2
            WHERE id = $3
            "#,
        )
        .bind(error)
        .bind(now)
        .bind(id)
        .execute(&mut **transaction)
        .await?;

        Ok(())
    }

    // Every entry for one incident, for detail views and tests
    pub async fn list_by_incident(&self, incident_id: &str) -> Result<Vec<OutboxEntry>, Error> {
        let entries: Vec<OutboxEntry> = sqlx::query_as(
            "SELECT * FROM notification_outbox WHERE incident_id = $1 ORDER BY created_at, id",
        )
        .bind(incident_id)
        .fetch_all(self.storage.get_pool())
        .await?;

        Ok(entries)
    }

    // Delivery rollup used to enrich incident reads
    pub async fn summarize_by_incident(&self, incident_id: &str) -> Result<DeliverySummary, Error> {
        let counts: Vec<(DeliveryStatus, i64)> = sqlx::query_as(
            r#"
            SELECT status, COUNT(*) FROM notification_outbox
            WHERE incident_id = $1
            GROUP BY status
            "#,
        )
        .bind(incident_id)
        .fetch_all(self.storage.get_pool())
        .await?;

        let mut summary = DeliverySummary::default();
        for (status, count) in counts {
            summary.total += count;
            match status {
                DeliveryStatus::Pending => summary.pending += count,
                DeliveryStatus::Sent => summary.sent += count,
                DeliveryStatus::Failed => summary.failed += count,
            }
        }

        Ok(summary)
    }
}
