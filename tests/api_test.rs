use std::sync::Arc;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode};
use axum::response::Response;
use eduadmin::api;
use eduadmin::config::AppConfig;
use eduadmin::db;
use eduadmin::state::AppState;
use eduadmin::store::Stores;
use serde_json::{Value, json};
use tower::ServiceExt;

async fn setup_app() -> Router {
    let pool = db::connect_in_memory()
        .await
        .expect("Failed to create database");
    let state = AppState {
        stores: Stores::sqlite(pool.clone()),
        config: Arc::new(AppConfig::default()),
        db: Some(pool),
    };
    api::router(state)
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> Response {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string())),
        None => builder.body(Body::empty()),
    }
    .expect("Failed to build request");

    app.clone().oneshot(request).await.expect("Request failed")
}

async fn body_json(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Failed to read body");
    serde_json::from_slice(&bytes).expect("Body is not JSON")
}

async fn create_math(app: &Router) {
    let response = send(
        app,
        "POST",
        "/subjects",
        Some(json!({
            "id": "S1",
            "name": "Math",
            "branch": "scientific",
            "sort_order": 1
        })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
}

#[tokio::test]
async fn test_health() {
    let app = setup_app().await;
    let response = send(&app, "GET", "/health", None).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_crud_assigns_ids_and_reports_missing() {
    let app = setup_app().await;

    let response = send(&app, "POST", "/tags", Some(json!({ "name": "algebra" }))).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let tag = body_json(response).await;
    let id = tag["id"].as_str().expect("id").to_string();
    assert!(!id.is_empty());

    let response = send(&app, "GET", "/tags", None).await;
    let tags = body_json(response).await;
    assert_eq!(tags.as_array().map(Vec::len), Some(1));

    let response = send(&app, "DELETE", &format!("/tags/{}", id), None).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = send(&app, "DELETE", &format!("/tags/{}", id), None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_import_then_export() {
    let app = setup_app().await;
    create_math(&app).await;

    let request = Request::builder()
        .method("POST")
        .uri("/import/exams?format=csv")
        .body(Body::from("title,subjectname\nAlgebra Final,Math\n,Math\n"))
        .expect("Failed to build request");
    let response = app.clone().oneshot(request).await.expect("Request failed");
    assert_eq!(response.status(), StatusCode::OK);
    let report = body_json(response).await;
    assert_eq!(report["inserted"], 1);

    let response = send(&app, "GET", "/export/exams", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()["content-disposition"],
        "attachment; filename=\"exams_export.json\""
    );
    let exams = body_json(response).await;
    assert_eq!(exams[0]["subject_name"], "Math");

    let response = send(&app, "GET", "/export/news?format=xlsx", None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = send(&app, "GET", "/export/widgets", None).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_import_rejects_malformed_file() {
    let app = setup_app().await;

    let request = Request::builder()
        .method("POST")
        .uri("/import/news?format=json")
        .body(Body::from("[{\"title\": "))
        .expect("Failed to build request");
    let response = app.clone().oneshot(request).await.expect("Request failed");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let error = body_json(response).await;
    let message = error["message"].as_str().expect("message");
    assert!(message.starts_with("Could not parse file"));
}

#[tokio::test]
async fn test_access_code_lifecycle() {
    let app = setup_app().await;
    create_math(&app).await;

    let response = send(
        &app,
        "POST",
        "/access-codes",
        Some(json!({
            "name": "Spring",
            "code_type": "choose_single_subject_monthly",
            "quantity": 3,
            "subject_id": "S1"
        })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let issued = body_json(response).await;
    let codes = issued.as_array().expect("array").clone();
    assert_eq!(codes.len(), 3);
    assert_eq!(codes[0]["name"], "Spring #1");
    assert_eq!(codes[0]["status"], "active");
    assert_eq!(codes[0]["subject_name"], "Math");

    let ids: Vec<String> = codes
        .iter()
        .map(|c| c["id"].as_str().expect("id").to_string())
        .collect();

    let response = send(&app, "POST", &format!("/access-codes/{}/toggle", ids[0]), None).await;
    assert_eq!(body_json(response).await["status"], "inactive");

    let response = send(
        &app,
        "POST",
        "/access-codes/redeem",
        Some(json!({ "encoded_value": codes[1]["encoded_value"], "user_id": "U1" })),
    )
    .await;
    assert_eq!(body_json(response).await["status"], "used");

    let response = send(
        &app,
        "POST",
        "/access-codes/bulk/active",
        Some(json!({ "ids": ids, "active": false })),
    )
    .await;
    let report = body_json(response).await;
    assert_eq!(report["updated"], 1);
    assert_eq!(report["unchanged"], 1);
    assert_eq!(report["skipped_used"], 1);

    let response = send(
        &app,
        "POST",
        "/access-codes/bulk/delete",
        Some(json!({ "ids": [ids[0], ids[0], ids[2]] })),
    )
    .await;
    assert_eq!(body_json(response).await["deleted"], 2);

    let response = send(&app, "GET", "/access-codes", None).await;
    let remaining = body_json(response).await;
    assert_eq!(remaining.as_array().map(Vec::len), Some(1));
}

#[tokio::test]
async fn test_issue_without_required_subject_is_rejected() {
    let app = setup_app().await;

    let response = send(
        &app,
        "POST",
        "/access-codes",
        Some(json!({ "name": "Bad", "code_type": "subject_specific", "quantity": 1 })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = send(&app, "GET", "/access-codes", None).await;
    assert_eq!(body_json(response).await, json!([]));
}

#[tokio::test]
async fn test_tag_counts_and_filter() {
    let app = setup_app().await;
    create_math(&app).await;

    for (id, name) in [("t1", "algebra"), ("t2", "geometry")] {
        let response = send(&app, "POST", "/tags", Some(json!({ "id": id, "name": name }))).await;
        assert_eq!(response.status(), StatusCode::CREATED);
    }
    for (id, tags) in [("q1", json!(["t1", "t2"])), ("q2", json!(["t1"]))] {
        let response = send(
            &app,
            "POST",
            "/questions",
            Some(json!({
                "id": id,
                "subject_id": "S1",
                "question_type": "short_answer",
                "question_text": "Explain",
                "difficulty": "easy",
                "tag_ids": tags
            })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    let response = send(&app, "GET", "/tags/counts", None).await;
    let counts = body_json(response).await;
    assert_eq!(counts[0]["tag_id"], "t1");
    assert_eq!(counts[0]["count"], 2);
    assert_eq!(counts[1]["count"], 1);

    let response = send(&app, "GET", "/questions/by-tags?tags=t1,t2", None).await;
    let filtered = body_json(response).await;
    assert_eq!(filtered.as_array().map(Vec::len), Some(1));
    assert_eq!(filtered[0]["id"], "q1");

    let response = send(&app, "GET", "/questions/by-tags", None).await;
    assert_eq!(body_json(response).await.as_array().map(Vec::len), Some(2));
}

#[tokio::test]
async fn test_invalid_bodies_are_rejected() {
    let app = setup_app().await;
    create_math(&app).await;

    let response = send(
        &app,
        "POST",
        "/questions",
        Some(json!({
            "subject_id": "S1",
            "question_type": "mcq",
            "question_text": "2 + 2 = ?",
            "difficulty": "easy",
            "options": ["4"],
            "correct_option_index": 7
        })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = send(
        &app,
        "POST",
        "/subjects",
        Some(json!({ "name": "  ", "branch": "literary", "sort_order": 2 })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(body_json(response).await["message"].as_str().is_some());

    let response = send(
        &app,
        "PUT",
        "/subjects/S1",
        Some(json!({ "name": "", "branch": "scientific", "sort_order": 1 })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = send(
        &app,
        "POST",
        "/exams",
        Some(json!({ "title": "Final", "subject_id": "S404" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = send(&app, "GET", "/subjects", None).await;
    assert_eq!(body_json(response).await[0]["name"], "Math");
    let response = send(&app, "GET", "/questions", None).await;
    assert_eq!(body_json(response).await.as_array().map(Vec::len), Some(0));
}

#[tokio::test]
async fn test_exam_subject_name_comes_from_subject_store() {
    let app = setup_app().await;
    create_math(&app).await;

    let response = send(
        &app,
        "POST",
        "/exams",
        Some(json!({ "title": "Final", "subject_id": "S1", "subject_name": "History" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let exam = body_json(response).await;
    assert_eq!(exam["subject_name"], "Math");

    let response = send(&app, "GET", "/exams", None).await;
    assert_eq!(body_json(response).await[0]["subject_name"], "Math");
}

#[tokio::test]
async fn test_access_code_selection_state() {
    let app = setup_app().await;

    let response = send(
        &app,
        "POST",
        "/access-codes",
        Some(json!({ "name": "Batch", "code_type": "general_yearly", "quantity": 2 })),
    )
    .await;
    let ids: Vec<String> = body_json(response)
        .await
        .as_array()
        .expect("array")
        .iter()
        .map(|c| c["id"].as_str().expect("id").to_string())
        .collect();

    let response = send(
        &app,
        "POST",
        "/access-codes/selection",
        Some(json!({ "selected": ["gone"], "toggle": ids[0] })),
    )
    .await;
    let body = body_json(response).await;
    assert_eq!(body["state"], "indeterminate");
    assert_eq!(body["selected"], json!([ids[0]]));

    let response = send(
        &app,
        "POST",
        "/access-codes/selection",
        Some(json!({ "selected": [ids[0]], "select_all": true })),
    )
    .await;
    let body = body_json(response).await;
    assert_eq!(body["state"], "checked");
    assert_eq!(body["selected"][0], ids[0].as_str());
    assert_eq!(body["selected"].as_array().map(Vec::len), Some(2));

    let response = send(
        &app,
        "POST",
        "/access-codes/selection",
        Some(json!({ "selected": ids, "select_all": false })),
    )
    .await;
    assert_eq!(body_json(response).await["state"], "unchecked");
}
