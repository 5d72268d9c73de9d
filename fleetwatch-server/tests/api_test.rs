use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use serde_json::{json, Value};
use tower::ServiceExt;

use crate::common::mock_app::MockApp;
use fleetwatch_server::models::Channel;

mod common;

async fn response_json(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn heartbeat_request(body: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/heartbeat")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn heartbeat_body(app: &MockApp, device_id: &str) -> Value {
    json!({
        "device_id": device_id,
        "venue_id": "venue-1",
        "label": "Bar TV 3",
        "last_render_at": app.now() - 30,
        "last_detection_at": app.now() - 30,
        "signal_strength_percent": 80.0,
        "rssi_dbm": -50.0,
        "firmware_version": "2.4.1",
    })
}

#[tokio::test]
async fn test_health_endpoint() {
    let app = MockApp::new().await;

    let response = app
        .router
        .clone()
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_heartbeat_round_trip() {
    let app = MockApp::new().await;

    let response = app
        .router
        .clone()
        .oneshot(heartbeat_request(&heartbeat_body(&app, "dev-1")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = response_json(response).await;
    assert_eq!(body["device"]["status"], "ONLINE");
    assert_eq!(body["new_incidents"], json!([]));
    assert_eq!(body["resolved_incidents"], json!([]));
}

#[tokio::test]
async fn test_heartbeat_validation_failures_are_bad_requests() {
    let app = MockApp::new().await;

    let mut blank_device = heartbeat_body(&app, "dev-1");
    blank_device["device_id"] = json!("  ");

    let mut bad_signal = heartbeat_body(&app, "dev-1");
    bad_signal["signal_strength_percent"] = json!(150.0);

    let mut bad_timestamp = heartbeat_body(&app, "dev-1");
    bad_timestamp["last_render_at"] = json!(-5);

    for body in [blank_device, bad_signal, bad_timestamp] {
        let response = app
            .router
            .clone()
            .oneshot(heartbeat_request(&body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = response_json(response).await;
        assert_eq!(body["error"]["code"], 400);
    }
}

#[tokio::test]
async fn test_device_list_and_detail() {
    let app = MockApp::new().await;

    let mut degraded = heartbeat_body(&app, "dev-1");
    degraded["last_render_at"] = json!(app.now() - 400);
    app.router
        .clone()
        .oneshot(heartbeat_request(&degraded))
        .await
        .unwrap();
    app.router
        .clone()
        .oneshot(heartbeat_request(&heartbeat_body(&app, "dev-2")))
        .await
        .unwrap();

    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/devices?status=DEGRADED")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = response_json(response).await;
    assert_eq!(body["total"], 1);
    assert_eq!(body["items"][0]["id"], "dev-1");
    assert_eq!(body["items"][0]["open_incident_count"], 1);

    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/devices/dev-1")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = response_json(response).await;
    assert_eq!(body["status"], "DEGRADED");
    assert_eq!(body["open_incidents"][0]["type"], "NO_RENDER");
}

#[tokio::test]
async fn test_unknown_device_is_not_found() {
    let app = MockApp::new().await;

    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/devices/dev-missing")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_incident_list_enriched_with_delivery_summary() {
    let app = MockApp::new().await;
    app.create_test_contact("c-1", "venue-1", vec![Channel::Email]).await;

    let mut degraded = heartbeat_body(&app, "dev-1");
    degraded["last_render_at"] = json!(app.now() - 400);
    app.router
        .clone()
        .oneshot(heartbeat_request(&degraded))
        .await
        .unwrap();

    app.worker.run_once().await.unwrap();

    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/incidents?venue_id=venue-1")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = response_json(response).await;
    assert_eq!(body["total"], 1);
    let item = &body["items"][0];
    assert_eq!(item["type"], "NO_RENDER");
    assert_eq!(item["status"], "OPEN");
    assert_eq!(item["notifications"]["total"], 1);
    assert_eq!(item["notifications"]["sent"], 1);

    let incident_id = item["id"].as_str().unwrap();
    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .uri(format!("/api/incidents/{incident_id}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = response_json(response).await;
    assert_eq!(body["id"], incident_id);
    assert!(body["troubleshooting_steps"].as_array().unwrap().len() >= 3);
}

#[tokio::test]
async fn test_incident_list_hides_resolved_by_default() {
    let app = MockApp::new().await;

    let mut degraded = heartbeat_body(&app, "dev-1");
    degraded["last_render_at"] = json!(app.now() - 400);
    app.router
        .clone()
        .oneshot(heartbeat_request(&degraded))
        .await
        .unwrap();

    // recovery resolves the incident
    app.advance(60);
    app.router
        .clone()
        .oneshot(heartbeat_request(&heartbeat_body(&app, "dev-1")))
        .await
        .unwrap();

    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/incidents")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let body = response_json(response).await;
    assert_eq!(body["total"], 0);

    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/incidents?include_resolved=true")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let body = response_json(response).await;
    assert_eq!(body["total"], 1);
    assert_eq!(body["items"][0]["status"], "RESOLVED");
}

#[tokio::test]
async fn test_unknown_incident_is_not_found() {
    let app = MockApp::new().await;

    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/incidents/inc-missing")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
