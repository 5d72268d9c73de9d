use serde::{Deserialize, Serialize};

use super::Table;
use super::enums::Channel;

/// A person at a venue who should hear about incidents there. Read-only
/// from the notification pipeline's point of view.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VenueContact {
    pub id: String,
    pub venue_id: String,
    pub name: String,
    /// Required for the contact to actually receive EMAIL messages.
    pub email: Option<String>,
    /// Required for the contact to actually receive SMS messages.
    pub phone: Option<String>,
    pub channels: Vec<Channel>,
    pub is_active: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Clone)]
pub struct VenueContactTable;

impl Table for VenueContactTable {
    fn name(&self) -> &'static str {
        "venue_contacts"
    }

    fn create(&self) -> String {
        // channels stores a comma-separated list: 'EMAIL', 'SMS', or 'EMAIL,SMS'.
        String::from(
            r#"
            CREATE TABLE IF NOT EXISTS venue_contacts (
                id         TEXT PRIMARY KEY,
                venue_id   TEXT NOT NULL,
                name       TEXT NOT NULL,
                email      TEXT,
                phone      TEXT,
                channels   TEXT NOT NULL DEFAULT 'EMAIL',
                is_active  INTEGER NOT NULL DEFAULT 1,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_venue_contacts_venue_id ON venue_contacts (venue_id);
            "#,
        )
    }

    fn dispose(&self) -> String {
        String::from("DROP TABLE IF EXISTS venue_contacts;")
    }

    fn dependencies(&self) -> Vec<&'static str> {
        vec![]
    }
}
