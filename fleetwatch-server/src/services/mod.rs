mod composer;
mod delivery_worker;
mod device_service;
mod heartbeat_service;
mod incident_service;
mod notification_service;
mod rate_limiter;
mod senders;

pub use composer::NotificationComposer;
pub use delivery_worker::{DeliveryWorker, WorkerHandle, BATCH_SIZE, RETRY_BACKOFF_SECONDS};
pub use device_service::{DeviceDetail, DeviceService};
pub use heartbeat_service::{HeartbeatRequest, HeartbeatResult, HeartbeatService};
pub use incident_service::{IncidentListItem, IncidentService};
pub use notification_service::NotificationService;
pub use rate_limiter::{RateLimiter, RATE_LIMIT_WINDOW_SECONDS};
pub use senders::{NotificationSender, StubEmailSender, StubSmsSender};

use std::sync::Arc;

/// Injectable time source returning unix seconds. Production uses the
/// system clock; tests swap in a settable one.
pub type Clock = Arc<dyn Fn() -> i64 + Send + Sync>;

pub fn system_clock() -> Clock {
    Arc::new(|| chrono::Utc::now().timestamp())
}
