use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;

use fleetwatch_server::configs::{Database, SchemaManager, Storage};
use fleetwatch_server::handles::{
    get_device, get_devices, get_incident, get_incidents, post_heartbeat, DeviceState,
    HeartbeatState, IncidentState,
};
use fleetwatch_server::models::{Channel, VenueContact};
use fleetwatch_server::repositories::{
    DeviceRepository, IncidentRepository, OutboxRepository, VenueContactRepository,
};
use fleetwatch_server::rules::{RuleEngine, StepFactory};
use fleetwatch_server::services::{
    Clock, DeliveryWorker, DeviceService, HeartbeatService, IncidentService, NotificationSender,
    NotificationService, RateLimiter, StubEmailSender, StubSmsSender,
};

/// Fully wired application over an in-memory database with a settable
/// clock, so tests can move time forward without sleeping.
pub struct MockApp {
    pub router: Router,
    pub storage: Arc<Storage>,
    pub time: Arc<AtomicI64>,
    pub heartbeat_service: Arc<HeartbeatService>,
    pub device_repository: Arc<DeviceRepository>,
    pub incident_repository: Arc<IncidentRepository>,
    pub contact_repository: Arc<VenueContactRepository>,
    pub outbox_repository: Arc<OutboxRepository>,
    pub worker: Arc<DeliveryWorker>,
}

pub const START_TIME: i64 = 1_700_000_000;

impl MockApp {
    pub async fn new() -> Self {
        let storage = Arc::new(
            Storage::new(
                Database {
                    migration_path: None,
                    clean_start: true,
                    url: String::from("sqlite::memory:"),
                },
                SchemaManager::default(),
            )
            .await
            .unwrap(),
        );

        let time = Arc::new(AtomicI64::new(START_TIME));
        let clock: Clock = {
            let time = time.clone();
            Arc::new(move || time.load(Ordering::SeqCst))
        };

        let device_repository = Arc::new(DeviceRepository::new(storage.clone()));
        let incident_repository = Arc::new(IncidentRepository::new(storage.clone()));
        let contact_repository = Arc::new(VenueContactRepository::new(storage.clone()));
        let outbox_repository = Arc::new(OutboxRepository::new(storage.clone()));

        let notification_service = Arc::new(NotificationService::new(
            storage.clone(),
            contact_repository.clone(),
            outbox_repository.clone(),
            Arc::new(RateLimiter::new()),
            clock.clone(),
        ));

        let heartbeat_service = Arc::new(
            HeartbeatService::new(
                storage.clone(),
                device_repository.clone(),
                incident_repository.clone(),
                Arc::new(RuleEngine::default()),
                Arc::new(StepFactory::default()),
                clock.clone(),
            )
            .with_notifications(notification_service),
        );

        let device_service = Arc::new(DeviceService::new(
            device_repository.clone(),
            incident_repository.clone(),
        ));
        let incident_service = Arc::new(
            IncidentService::new(incident_repository.clone())
                .with_outbox(outbox_repository.clone()),
        );

        let senders: Vec<Arc<dyn NotificationSender>> =
            vec![Arc::new(StubEmailSender), Arc::new(StubSmsSender)];
        let worker = Arc::new(DeliveryWorker::new(
            storage.clone(),
            outbox_repository.clone(),
            senders,
            clock,
        ));

        let api = Router::new()
            .merge(
                Router::new()
                    .route("/heartbeat", post(post_heartbeat))
                    .with_state(HeartbeatState {
                        heartbeat_service: heartbeat_service.clone(),
                    }),
            )
            .merge(
                Router::new()
                    .route("/devices", get(get_devices))
                    .route("/devices/:device_id", get(get_device))
                    .with_state(DeviceState { device_service }),
            )
            .merge(
                Router::new()
                    .route("/incidents", get(get_incidents))
                    .route("/incidents/:incident_id", get(get_incident))
                    .with_state(IncidentState { incident_service }),
            );

        let router = Router::new()
            .route("/health", get(|| async { "ok" }))
            .nest("/api", api);

        Self {
            router,
            storage,
            time,
            heartbeat_service,
            device_repository,
            incident_repository,
            contact_repository,
            outbox_repository,
            worker,
        }
    }

    pub fn now(&self) -> i64 {
        self.time.load(Ordering::SeqCst)
    }

    pub fn advance(&self, seconds: i64) {
        self.time.fetch_add(seconds, Ordering::SeqCst);
    }

    pub async fn create_test_contact(&self, id: &str, venue_id: &str, channels: Vec<Channel>) {
        let contact = VenueContact {
            id: id.to_string(),
            venue_id: venue_id.to_string(),
            name: format!("Contact {id}"),
            email: Some(format!("{id}@example.com")),
            phone: Some("+15550001111".to_string()),
            channels,
            is_active: true,
            created_at: self.now(),
            updated_at: self.now(),
        };

        let mut tx = self.storage.get_pool().begin().await.unwrap();
        self.contact_repository.upsert(&contact, &mut tx).await.unwrap();
        tx.commit().await.unwrap();
    }
}
