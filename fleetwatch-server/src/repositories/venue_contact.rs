use std::sync::Arc;

use sqlx::{Error, Sqlite, Transaction};

use crate::configs::Storage;
use crate::models::{Channel, VenueContact};

/// Row shape as stored; `channels` is a comma-separated list that gets
/// parsed into the typed form on the way out.
#[derive(sqlx::FromRow)]
struct ContactRow {
    id: String,
    venue_id: String,
    name: String,
    email: Option<String>,
    phone: Option<String>,
    channels: String,
    is_active: bool,
    created_at: i64,
    updated_at: i64,
}

impl From<ContactRow> for VenueContact {
    fn from(row: ContactRow) -> Self {
        let channels = row.channels.split(',').filter_map(Channel::parse).collect();

        VenueContact {
            id: row.id,
            venue_id: row.venue_id,
            name: row.name,
            email: row.email,
            phone: row.phone,
            channels,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

pub struct VenueContactRepository {
    storage: Arc<Storage>,
}

impl VenueContactRepository {
    pub fn new(storage: Arc<Storage>) -> Self {
        Self { storage }
    }
}

impl VenueContactRepository {
    // Insert or replace a contact, keeping created_at
    pub async fn upsert(
        &self,
        item: &VenueContact,
        transaction: &mut Transaction<'_, Sqlite>,
    ) -> Result<(), Error> {
        let channels = item
            .channels
            .iter()
            .map(Channel::as_str)
            .collect::<Vec<_>>()
            .join(",");

        sqlx::query(
            r#"
            INSERT INTO venue_contacts (
                id, venue_id, name, email, phone, channels,
                is_active, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT(id) DO UPDATE SET
                venue_id = excluded.venue_id,
                name = excluded.name,
                email = excluded.email,
                phone = excluded.phone,
                channels = excluded.channels,
                is_active = excluded.is_active,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&item.id)
        .bind(&item.venue_id)
        .bind(&item.name)
        .bind(&item.email)
        .bind(&item.phone)
        .bind(channels)
        .bind(item.is_active)
        .bind(item.created_at)
        .bind(item.updated_at)
        .execute(&mut **transaction)
        .await?;

        Ok(())
    }

    // The recipients the notification composer fans out to
    pub async fn list_active_by_venue(&self, venue_id: &str) -> Result<Vec<VenueContact>, Error> {
        let rows: Vec<ContactRow> = sqlx::query_as(
            "SELECT * FROM venue_contacts WHERE venue_id = $1 AND is_active = 1 ORDER BY name",
        )
        .bind(venue_id)
        .fetch_all(self.storage.get_pool())
        .await?;

        Ok(rows.into_iter().map(VenueContact::from).collect())
    }
}
