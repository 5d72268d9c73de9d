use std::sync::Arc;
use std::time::Duration;

use axum::routing::{get, post};
use axum::{Json, Router};
use tokio::sync::watch;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::configs::{SchemaManager, Settings, Storage};
use crate::handles::*;
use crate::repositories::{
    DeviceRepository, IncidentRepository, OutboxRepository, VenueContactRepository,
};
use crate::rules::{RuleEngine, StepFactory};
use crate::services::{
    system_clock, DeliveryWorker, DeviceService, HeartbeatService, IncidentService,
    NotificationSender, NotificationService, RateLimiter, StubEmailSender, StubSmsSender,
    WorkerHandle,
};

/// Stop handles for the background loops; `run()` drains them after the
/// server stops accepting connections.
pub struct BackgroundTasks {
    delivery_worker: WorkerHandle,
    sweep: WorkerHandle,
}

impl BackgroundTasks {
    pub async fn shutdown(self) {
        self.delivery_worker.shutdown().await;
        self.sweep.shutdown().await;
    }
}

pub async fn create_app(settings: &Arc<Settings>) -> (Router, BackgroundTasks) {
    let storage = Arc::new(
        Storage::new(settings.database.clone(), SchemaManager::default())
            .await
            .unwrap(),
    );

    let clock = system_clock();

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
        IncidentService::new(incident_repository.clone()).with_outbox(outbox_repository.clone()),
    );

    let senders: Vec<Arc<dyn NotificationSender>> =
        vec![Arc::new(StubEmailSender), Arc::new(StubSmsSender)];
    let worker = Arc::new(DeliveryWorker::new(
        storage.clone(),
        outbox_repository,
        senders,
        clock,
    ));
    let worker_handle = worker.spawn(Duration::from_millis(settings.worker.poll_interval_ms));

    // silent devices never heartbeat, so a periodic sweep re-evaluates the
    // stored snapshots and opens OFFLINE incidents for them
    let sweep_service = heartbeat_service.clone();
    let sweep_interval = Duration::from_millis(settings.worker.sweep_interval_ms);
    let (sweep_stop, mut sweep_stopped) = watch::channel(false);
    let sweep_task = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(sweep_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(error) = sweep_service.sweep_fleet().await {
                        tracing::error!(%error, "fleet sweep failed");
                    }
                }
                _ = sweep_stopped.changed() => {
                    tracing::info!("fleet sweep stopped");
                    break;
                }
            }
        }
    });

    let tasks = BackgroundTasks {
        delivery_worker: worker_handle,
        sweep: WorkerHandle::new(sweep_stop, sweep_task),
    };

    let heartbeats = Router::new()
        .route("/heartbeat", post(post_heartbeat))
        .with_state(HeartbeatState { heartbeat_service });

    let devices = Router::new()
        .route("/devices", get(get_devices))
        .route("/devices/:device_id", get(get_device))
        .with_state(DeviceState { device_service });

    let incidents = Router::new()
        .route("/incidents", get(get_incidents))
        .route("/incidents/:incident_id", get(get_incident))
        .with_state(IncidentState { incident_service });

    let api = Router::new().merge(heartbeats).merge(devices).merge(incidents);

    let router = Router::new()
        .route("/health", get(health))
        .nest("/api", api)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    (router, tasks)
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}
