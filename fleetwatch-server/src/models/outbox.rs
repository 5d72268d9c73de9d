use serde::{Deserialize, Serialize};

use super::Table;
use super::enums::{Channel, DeliveryStatus};

/// One send obligation for one (incident, channel, recipient) triple. The
/// unique constraint on that triple is the idempotency key: composing the
/// same notification twice yields exactly one row.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct OutboxEntry {
    pub id: String,
    pub incident_id: String,
    pub venue_id: String,
    pub channel: Channel,
    /// Email address or phone number depending on channel.
    pub to_address: String,
    pub subject: Option<String>,
    pub body: String,
    pub status: DeliveryStatus,
    pub attempt_count: i64,
    pub last_error: Option<String>,
    /// Earliest unix time the worker may attempt this entry.
    pub scheduled_at: i64,
    pub sent_at: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Data needed to create an outbox entry before id and timestamps are set.
#[derive(Debug, Clone)]
pub struct NewOutboxEntry {
    pub incident_id: String,
    pub venue_id: String,
    pub channel: Channel,
    pub to_address: String,
    pub subject: Option<String>,
    pub body: String,
    pub scheduled_at: i64,
}

/// Compact per-incident delivery rollup used to enrich incident reads.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliverySummary {
    pub total: i64,
    pub sent: i64,
    pub pending: i64,
    pub failed: i64,
}

#[derive(Clone)]
pub struct OutboxTable;

impl Table for OutboxTable {
    fn name(&self) -> &'static str {
        "notification_outbox"
    }

    fn create(&self) -> String {
        String::from(
            r#"
            CREATE TABLE IF NOT EXISTS notification_outbox (
                id            TEXT PRIMARY KEY,
                incident_id   TEXT NOT NULL,
                venue_id      TEXT NOT NULL,
                channel       TEXT NOT NULL,
                to_address    TEXT NOT NULL,
                subject       TEXT,
                body          TEXT NOT NULL,
                status        TEXT NOT NULL DEFAULT 'PENDING',
                attempt_count INTEGER NOT NULL DEFAULT 0,
                last_error    TEXT,
                scheduled_at  INTEGER NOT NULL,
                sent_at       INTEGER,
                created_at    INTEGER NOT NULL,
                updated_at    INTEGER NOT NULL,
                UNIQUE(incident_id, channel, to_address)
            );
            CREATE INDEX IF NOT EXISTS idx_outbox_status_scheduled ON notification_outbox (status, scheduled_at);
            CREATE INDEX IF NOT EXISTS idx_outbox_incident_id ON notification_outbox (incident_id);
            "#,
        )
    }

    fn dispose(&self) -> String {
        String::from("DROP TABLE IF EXISTS notification_outbox;")
    }

    fn dependencies(&self) -> Vec<&'static str> {
        vec!["incidents"]
    }
}
