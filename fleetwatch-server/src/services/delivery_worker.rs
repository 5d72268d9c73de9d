use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::configs::Storage;
use crate::models::{Channel, OutboxEntry};
use crate::repositories::{OutboxRepository, MAX_DELIVERY_ATTEMPTS};

use super::senders::NotificationSender;
use super::Clock;

/// How many due entries one poll picks up.
pub const BATCH_SIZE: i64 = 20;

/// Delay before attempt N, in seconds. Attempt 0 is immediate.
pub const RETRY_BACKOFF_SECONDS: [i64; 3] = [0, 30, 120];

/// Drains the notification outbox: polls for due entries, hands each to the
/// sender for its channel, and records sent, retry, or permanent failure.
/// A single task runs the loop, so two polls never race over the same rows.
pub struct DeliveryWorker {
    storage: Arc<Storage>,
    outbox_repository: Arc<OutboxRepository>,
    senders: HashMap<Channel, Arc<dyn NotificationSender>>,
    clock: Clock,
}

/// Lets the owner stop the polling loop on shutdown.
pub struct WorkerHandle {
    stop: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl WorkerHandle {
    pub(crate) fn new(stop: watch::Sender<bool>, task: JoinHandle<()>) -> Self {
        Self { stop, task }
    }

    pub async fn shutdown(self) {
        let _ = self.stop.send(true);
        let _ = self.task.await;
    }
}

impl DeliveryWorker {
    pub fn new(
        storage: Arc<Storage>,
        outbox_repository: Arc<OutboxRepository>,
        senders: Vec<Arc<dyn NotificationSender>>,
        clock: Clock,
    ) -> Self {
        let senders = senders
            .into_iter()
            .map(|sender| (sender.channel(), sender))
            .collect();

        Self {
            storage,
            outbox_repository,
            senders,
            clock,
        }
    }

    /// Starts the background polling loop.
    pub fn spawn(self: Arc<Self>, poll_interval: Duration) -> WorkerHandle {
        let (stop, mut stopped) = watch::channel(false);

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(poll_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            tracing::info!(poll_interval_ms = poll_interval.as_millis() as u64, "delivery worker started");

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        if let Err(error) = self.run_once().await {
                            tracing::error!(%error, "delivery worker poll failed");
                        }
                    }
                    _ = stopped.changed() => {
                        tracing::info!("delivery worker stopped");
                        break;
                    }
                }
            }
        });

        WorkerHandle::new(stop, task)
    }

    /// Processes one batch of due entries. Public so tests can drive the
    /// worker without the polling loop.
    pub async fn run_once(&self) -> Result<usize, sqlx::Error> {
        let now = (self.clock)();
        let due = self.outbox_repository.list_due(now, BATCH_SIZE).await?;
        let processed = due.len();

        for entry in due {
            self.process_entry(entry).await?;
        }

        Ok(processed)
    }

    async fn process_entry(&self, entry: OutboxEntry) -> Result<(), sqlx::Error> {
        let now = (self.clock)();

        let Some(sender) = self.senders.get(&entry.channel) else {
            // nothing will ever deliver this channel, so fail it for good
            let mut tx = self.storage.get_pool().begin().await?;
            self.outbox_repository
                .mark_failed(
                    &entry.id,
                    &format!("no sender registered for channel {}", entry.channel),
                    now,
                    &mut tx,
                )
                .await?;
            tx.commit().await?;
            return Ok(());
        };

        match sender.send(&entry).await {
            Ok(()) => {
                let mut tx = self.storage.get_pool().begin().await?;
                self.outbox_repository.mark_sent(&entry.id, now, &mut tx).await?;
                tx.commit().await?;

                tracing::info!(
                    entry_id = %entry.id,
                    channel = %entry.channel,
                    "notification delivered"
                );
            }
            Err(error) => {
                let next_attempt = entry.attempt_count + 1;
                let mut tx = self.storage.get_pool().begin().await?;

                if next_attempt >= MAX_DELIVERY_ATTEMPTS {
                    self.outbox_repository
                        .mark_failed(&entry.id, &error.to_string(), now, &mut tx)
                        .await?;

                    tracing::warn!(
                        entry_id = %entry.id,
                        %error,
                        "notification failed permanently"
                    );
                } else {
                    let backoff_index =
                        (next_attempt as usize).min(RETRY_BACKOFF_SECONDS.len() - 1);
                    let next_attempt_at = now + RETRY_BACKOFF_SECONDS[backoff_index];

                    self.outbox_repository
                        .schedule_retry(&entry.id, &error.to_string(), next_attempt_at, now, &mut tx)
                        .await?;

                    tracing::warn!(
                        entry_id = %entry.id,
                        attempt = next_attempt,
                        backoff_seconds = RETRY_BACKOFF_SECONDS[backoff_index],
                        %error,
                        "notification retry scheduled"
                    );
                }

                tx.commit().await?;
            }
        }

        Ok(())
    }
}
