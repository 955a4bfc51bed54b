#![cfg(feature = "http_api")]

use axum::{
    body::{self, Body},
    http::{Request, StatusCode},
    response::Response,
};
use day_planner::{ClockConfig, Task, TaskService, http_api};
use serde_json::{Value, json};
use tower::util::ServiceExt;

fn new_router() -> axum::Router {
    let service = TaskService::in_memory(ClockConfig::default());
    http_api::router(http_api::AppState::new(service))
}

fn json_request(method: &str, uri: &str, payload: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(&payload).unwrap()))
        .unwrap()
}

fn empty_request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

async fn read_json(response: Response) -> Value {
    let bytes = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn standup() -> Value {
    json!({
        "title": "Standup",
        "startTime": "09:00",
        "endTime": "10:00",
        "date": "2025-03-10",
    })
}

async fn create(app: &axum::Router, payload: Value) -> Task {
    let response = app
        .clone()
        .oneshot(json_request("POST", "/tasks", payload))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    serde_json::from_value(read_json(response).await).unwrap()
}

#[tokio::test]
async fn task_lifecycle_via_http_api() {
    let app = new_router();
    let task = create(&app, standup()).await;
    assert_eq!(task.title, "Standup");

    let response = app
        .clone()
        .oneshot(empty_request("GET", &format!("/tasks/{}", task.id)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let fetched: Task = serde_json::from_value(read_json(response).await).unwrap();
    assert_eq!(fetched, task);

    let response = app
        .clone()
        .oneshot(empty_request("GET", "/tasks?date=2025-03-10"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let listed: Vec<Task> = serde_json::from_value(read_json(response).await).unwrap();
    assert_eq!(listed, vec![task.clone()]);

    let response = app
        .clone()
        .oneshot(empty_request("DELETE", &format!("/tasks/{}", task.id)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app
        .oneshot(empty_request("DELETE", &format!("/tasks/{}", task.id)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn overlapping_create_returns_conflict_until_forced() {
    let app = new_router();
    let existing = create(&app, standup()).await;
    let clash = json!({
        "title": "Review",
        "startTime": "09:30",
        "endTime": "10:30",
        "date": "2025-03-10",
    });

    let response = app
        .clone()
        .oneshot(json_request("POST", "/tasks", clash.clone()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body = read_json(response).await;
    assert_eq!(body["error"], "conflict");
    let overlaps = body["overlaps"].as_array().unwrap();
    assert_eq!(overlaps.len(), 1);
    assert_eq!(overlaps[0]["id"], existing.id.to_string());

    let response = app
        .clone()
        .oneshot(json_request("POST", "/tasks?force=true", clash))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = app
        .oneshot(empty_request("GET", "/layout?date=2025-03-10"))
        .await
        .unwrap();
    let layout = read_json(response).await;
    let placements = layout.as_array().unwrap();
    assert_eq!(placements.len(), 2);
    assert!(placements.iter().all(|p| p["hasOverlap"] == true));
    assert_eq!(placements[0]["top"], 540);
    assert_eq!(placements[0]["height"], 60);
}

#[tokio::test]
async fn invalid_payload_lists_field_errors() {
    let app = new_router();
    let response = app
        .oneshot(json_request(
            "POST",
            "/tasks",
            json!({ "title": "", "startTime": "10:00", "endTime": "09:00", "date": "2025-03-10" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = read_json(response).await;
    assert_eq!(body["error"], "validation_failed");
    assert!(body["fields"]["title"].is_string());
    assert!(body["fields"]["endTime"].is_string());
}

#[tokio::test]
async fn patch_updates_fields_and_refuses_date_changes() {
    let app = new_router();
    let task = create(&app, standup()).await;
    let uri = format!("/tasks/{}", task.id);

    let response = app
        .clone()
        .oneshot(json_request("PATCH", &uri, json!({ "title": "Daily sync" })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let updated: Task = serde_json::from_value(read_json(response).await).unwrap();
    assert_eq!(updated.title, "Daily sync");
    assert_eq!(updated.start_time, task.start_time);
    assert_eq!(updated.date, task.date);

    let response = app
        .clone()
        .oneshot(json_request("PATCH", &uri, json!({ "date": "2025-03-11" })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(read_json(response).await["error"], "invalid_request");

    let response = app
        .oneshot(json_request("PATCH", &uri, json!({})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn relocate_snaps_start_time() {
    let app = new_router();
    let task = create(
        &app,
        json!({ "title": "Walk", "startTime": "14:00", "endTime": "14:30", "date": "2025-03-10" }),
    )
    .await;

    let response = app
        .oneshot(json_request(
            "POST",
            &format!("/tasks/{}/relocate", task.id),
            json!({ "startTime": "09:07" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let moved: Task = serde_json::from_value(read_json(response).await).unwrap();
    assert_eq!(moved.start_time.to_string(), "09:00");
    assert_eq!(moved.end_time.to_string(), "09:30");
}

#[tokio::test]
async fn date_parameter_is_required() {
    let app = new_router();
    let response = app
        .clone()
        .oneshot(empty_request("GET", "/tasks"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(read_json(response).await["error"], "invalid_request");

    let response = app
        .oneshot(empty_request("GET", "/tasks?date=10-03-2025"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unknown_ids_are_not_found() {
    let app = new_router();
    let response = app
        .clone()
        .oneshot(empty_request("GET", "/tasks/not-a-uuid"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .oneshot(json_request(
            "PATCH",
            "/tasks/3f2b8a9c-1d4e-4f5a-9b6c-7d8e9f0a1b2c",
            json!({ "title": "Ghost" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn health_and_current_endpoints_respond() {
    let app = new_router();
    let response = app
        .clone()
        .oneshot(empty_request("GET", "/health"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(empty_request("GET", "/current"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    assert!(body["date"].is_string());
    assert!(body["task"].is_null());
}

#[tokio::test]
async fn malformed_requests_are_invalid_request_json() {
    let app = new_router();

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/tasks",
            json!({ "title": 5, "startTime": "09:00", "endTime": "10:00", "date": "2025-03-10" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = read_json(response).await;
    assert_eq!(body["error"], "invalid_request");
    assert!(body["message"].is_string());

    let response = app
        .clone()
        .oneshot(json_request("POST", "/tasks?force=yes", standup()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(read_json(response).await["error"], "invalid_request");

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/tasks")
                .header("content-type", "application/json")
                .body(Body::from("{ not json"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(read_json(response).await["error"], "invalid_request");

    // nothing was created by any of the rejected requests
    let response = app
        .oneshot(empty_request("GET", "/tasks?date=2025-03-10"))
        .await
        .unwrap();
    assert_eq!(read_json(response).await, json!([]));
}
