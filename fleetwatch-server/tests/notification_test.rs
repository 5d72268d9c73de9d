use fleetwatch_server::models::{Channel, DeliveryStatus, DeliverySummary, VenueContact};
use fleetwatch_server::services::{HeartbeatRequest, RATE_LIMIT_WINDOW_SECONDS};

use crate::common::mock_app::MockApp;

mod common;

fn request_with_stale_render(app: &MockApp, device_id: &str) -> HeartbeatRequest {
    let now = app.now();
    HeartbeatRequest {
        device_id: device_id.to_string(),
        venue_id: "venue-1".to_string(),
        label: "Bar TV 3".to_string(),
        last_render_at: Some(now - 400),
        last_detection_at: Some(now - 30),
        signal_strength_percent: Some(80.0),
        rssi_dbm: Some(-50.0),
        firmware_version: None,
    }
}

fn healthy_request(app: &MockApp, device_id: &str) -> HeartbeatRequest {
    let now = app.now();
    HeartbeatRequest {
        last_render_at: Some(now - 30),
        ..request_with_stale_render(app, device_id)
    }
}

#[tokio::test]
async fn test_new_incident_enqueues_one_entry_per_contact_channel() {
    let app = MockApp::new().await;
    app.create_test_contact("c-1", "venue-1", vec![Channel::Email, Channel::Sms])
        .await;
    app.create_test_contact("c-2", "venue-1", vec![Channel::Email]).await;

    let result = app
        .heartbeat_service
        .handle_heartbeat(&request_with_stale_render(&app, "dev-1"))
        .await
        .unwrap();
    let incident_id = result.new_incidents[0].id.clone();

    let entries = app.outbox_repository.list_by_incident(&incident_id).await.unwrap();
    assert_eq!(entries.len(), 3);
    assert!(entries.iter().all(|e| e.status == DeliveryStatus::Pending));

    let email_entry = entries.iter().find(|e| e.to_address == "c-1@example.com").unwrap();
    assert!(email_entry.subject.as_deref().unwrap().contains("NO RENDER"));
    assert!(email_entry.body.contains("dev-1"));
}

#[tokio::test]
async fn test_contact_without_address_for_channel_is_skipped() {
    let app = MockApp::new().await;

    let contact = VenueContact {
        id: "c-1".to_string(),
        venue_id: "venue-1".to_string(),
        name: "Phoneless".to_string(),
        email: Some("c-1@example.com".to_string()),
        phone: None,
        channels: vec![Channel::Email, Channel::Sms],
        is_active: true,
        created_at: app.now(),
        updated_at: app.now(),
    };
    let mut tx = app.storage.get_pool().begin().await.unwrap();
    app.contact_repository.upsert(&contact, &mut tx).await.unwrap();
    tx.commit().await.unwrap();

    let result = app
        .heartbeat_service
        .handle_heartbeat(&request_with_stale_render(&app, "dev-1"))
        .await
        .unwrap();

    let entries = app
        .outbox_repository
        .list_by_incident(&result.new_incidents[0].id)
        .await
        .unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].channel, Channel::Email);
}

#[tokio::test]
async fn test_venue_without_contacts_enqueues_nothing() {
    let app = MockApp::new().await;

    let result = app
        .heartbeat_service
        .handle_heartbeat(&request_with_stale_render(&app, "dev-1"))
        .await
        .unwrap();

    assert_eq!(result.new_incidents.len(), 1);
    let entries = app
        .outbox_repository
        .list_by_incident(&result.new_incidents[0].id)
        .await
        .unwrap();
    assert!(entries.is_empty());
}

#[tokio::test]
async fn test_rate_limit_suppresses_repeat_bursts_until_window_passes() {
    let app = MockApp::new().await;
    app.create_test_contact("c-1", "venue-1", vec![Channel::Email]).await;

    // first incident notifies
    let first = app
        .heartbeat_service
        .handle_heartbeat(&request_with_stale_render(&app, "dev-1"))
        .await
        .unwrap();
    let first_id = first.new_incidents[0].id.clone();
    assert_eq!(app.outbox_repository.list_by_incident(&first_id).await.unwrap().len(), 1);

    // resolve, then reopen the same problem inside the window
    app.advance(100);
    app.heartbeat_service
        .handle_heartbeat(&healthy_request(&app, "dev-1"))
        .await
        .unwrap();
    app.advance(100);
    let second = app
        .heartbeat_service
        .handle_heartbeat(&request_with_stale_render(&app, "dev-1"))
        .await
        .unwrap();
    let second_id = second.new_incidents[0].id.clone();
    assert!(app
        .outbox_repository
        .list_by_incident(&second_id)
        .await
        .unwrap()
        .is_empty());

    // once a full window has passed since the first burst, notify again
    app.advance(RATE_LIMIT_WINDOW_SECONDS);
    app.heartbeat_service
        .handle_heartbeat(&healthy_request(&app, "dev-1"))
        .await
        .unwrap();
    app.advance(100);
    let third = app
        .heartbeat_service
        .handle_heartbeat(&request_with_stale_render(&app, "dev-1"))
        .await
        .unwrap();
    let third_id = third.new_incidents[0].id.clone();
    assert_eq!(app.outbox_repository.list_by_incident(&third_id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_worker_drains_heartbeat_notifications() {
    let app = MockApp::new().await;
    app.create_test_contact("c-1", "venue-1", vec![Channel::Email, Channel::Sms])
        .await;

    let result = app
        .heartbeat_service
        .handle_heartbeat(&request_with_stale_render(&app, "dev-1"))
        .await
        .unwrap();
    let incident_id = result.new_incidents[0].id.clone();

    assert_eq!(app.worker.run_once().await.unwrap(), 2);

    let summary = app.outbox_repository.summarize_by_incident(&incident_id).await.unwrap();
    assert_eq!(
        summary,
        DeliverySummary {
            total: 2,
            sent: 2,
            pending: 0,
            failed: 0,
        }
    );

    // nothing left to pick up
    assert_eq!(app.worker.run_once().await.unwrap(), 0);
}
