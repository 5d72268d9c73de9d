use std::sync::Arc;

use crate::configs::Storage;
use crate::models::Incident;
use crate::repositories::{OutboxRepository, VenueContactRepository};

use super::composer::NotificationComposer;
use super::rate_limiter::RateLimiter;
use super::Clock;

/// Handles the notification side of incident creation: applies the rate
/// limit and writes composed messages to the outbox. Actual sending is the
/// delivery worker's job, never this service's.
pub struct NotificationService {
    storage: Arc<Storage>,
    contact_repository: Arc<VenueContactRepository>,
    outbox_repository: Arc<OutboxRepository>,
    composer: NotificationComposer,
    rate_limiter: Arc<RateLimiter>,
    clock: Clock,
}

impl NotificationService {
    pub fn new(
        storage: Arc<Storage>,
        contact_repository: Arc<VenueContactRepository>,
        outbox_repository: Arc<OutboxRepository>,
        rate_limiter: Arc<RateLimiter>,
        clock: Clock,
    ) -> Self {
        Self {
            storage,
            contact_repository,
            outbox_repository,
            composer: NotificationComposer,
            rate_limiter,
            clock,
        }
    }

    /// Fans one freshly created incident out to the venue's contacts.
    /// Returns how many outbox rows were enqueued; zero when rate-limited,
    /// when the venue has no active contacts, or when no contact has an
    /// address for any subscribed channel.
    pub async fn on_incident_created(&self, incident: &Incident) -> Result<u64, sqlx::Error> {
        let now = (self.clock)();

        if self
            .rate_limiter
            .is_limited(&incident.venue_id, incident.incident_type, now)
        {
            tracing::info!(
                venue_id = %incident.venue_id,
                incident_type = %incident.incident_type,
                "notification rate-limited"
            );
            return Ok(0);
        }

        let contacts = self
            .contact_repository
            .list_active_by_venue(&incident.venue_id)
            .await?;

        if contacts.is_empty() {
            return Ok(0);
        }

        let entries = self.composer.compose(incident, &contacts);

        if entries.is_empty() {
            return Ok(0);
        }

        let mut tx = self.storage.get_pool().begin().await?;
        let enqueued = self.outbox_repository.enqueue(&entries, now, &mut tx).await?;
        tx.commit().await?;

        self.rate_limiter
            .record(&incident.venue_id, incident.incident_type, now);

        tracing::info!(
            incident_id = %incident.id,
            venue_id = %incident.venue_id,
            enqueued,
            "notifications enqueued"
        );

        Ok(enqueued)
    }
}
