use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Method, Request, StatusCode};
use krs_backend::api::router;
use krs_backend::state::AppState;
use serde_json::{Value, json};
use sqlx::sqlite::SqlitePoolOptions;
use tower::ServiceExt;

async fn app() -> Router {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to create database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations");

    router(AppState::new(pool))
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let request = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => request
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => request.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn create_course(app: &Router, code: &str, credits: i64, day: &str, start: &str, end: &str) {
    let (status, _) = send(
        app,
        Method::POST,
        "/courses",
        Some(json!({
            "code": code,
            "name": format!("Course {code}"),
            "credits": credits,
            "semester_number": 1,
            "day": day,
            "start_time": start,
            "end_time": end,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn test_health() {
    let app = app().await;
    let (status, _) = send(&app, Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_registration_lifecycle_over_http() {
    let app = app().await;
    create_course(&app, "A", 3, "monday", "08:00:00", "10:00:00").await;
    // Indonesian day names are accepted too.
    create_course(&app, "B", 4, "Senin", "10:00:00", "12:00:00").await;

    for code in ["A", "B"] {
        let (status, body) = send(
            &app,
            Method::POST,
            "/krs/S1/courses",
            Some(json!({ "course_code": code, "semester": "2025/1" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert!(body["registration_id"].is_string());
    }

    let (status, body) = send(&app, Method::GET, "/krs/S1/validate?semester=2025/1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ok"], true);

    let (status, body) = send(
        &app,
        Method::POST,
        "/krs/S1/submit",
        Some(json!({ "semester": "2025/1" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "SUBMITTED");

    let (status, body) = send(
        &app,
        Method::POST,
        "/krs/S1/approve",
        Some(json!({ "semester": "2025/1", "advisor_id": 42 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "APPROVED");
    assert_eq!(body["advisor_id"], 42);

    let (status, body) = send(&app, Method::GET, "/krs/S1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["total_credits"], 7);
    assert_eq!(body[0]["courses"].as_array().unwrap().len(), 2);

    let (status, body) = send(
        &app,
        Method::POST,
        "/billing/S1/overdue",
        Some(json!({ "semester": "2025/1" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "BLOCKED");

    let (status, body) = send(
        &app,
        Method::POST,
        "/billing/S1/paid",
        Some(json!({ "semester": "2025/1" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "DRAFT");
}

#[tokio::test]
async fn test_error_mapping() {
    let app = app().await;
    create_course(&app, "A", 3, "monday", "08:00:00", "10:00:00").await;
    create_course(&app, "C", 3, "monday", "09:00:00", "11:00:00").await;

    let add = |code: &'static str| json!({ "course_code": code, "semester": "2025/1" });

    let (status, _) = send(&app, Method::POST, "/krs/S1/courses", Some(add("A"))).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = send(&app, Method::POST, "/krs/S1/courses", Some(add("A"))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["message"].as_str().unwrap().contains("already"));

    let (status, body) = send(&app, Method::POST, "/krs/S1/courses", Some(add("C"))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["details"]["conflicting_course"], "A");
    assert_eq!(body["details"]["minutes"], 60);

    let (status, _) = send(&app, Method::POST, "/krs/S1/courses", Some(add("ZZZ"))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = send(
        &app,
        Method::POST,
        "/krs/S1/approve",
        Some(json!({ "semester": "2025/1", "advisor_id": 42 })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["details"]["action"], "approve");
    assert_eq!(body["details"]["current"], "DRAFT");

    let (status, _) = send(
        &app,
        Method::DELETE,
        "/krs/S1/courses/A?semester=2025/1",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = send(
        &app,
        Method::POST,
        "/krs/S1/submit",
        Some(json!({ "semester": "2025/1" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["details"]["rule"], "credit_load");
}

#[tokio::test]
async fn test_sessions_over_http() {
    let app = app().await;
    let (status, _) = send(
        &app,
        Method::POST,
        "/rooms",
        Some(json!({ "id": "A101", "name": "Hall", "capacity": 40 })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let session = |course: &str, instructor: i64, start: &str, end: &str| {
        json!({
            "course_code": course,
            "instructor_id": instructor,
            "room_id": "A101",
            "semester": "2025/1",
            "day": "tuesday",
            "start_time": start,
            "end_time": end,
            "capacity": 30,
        })
    };

    let (status, created) = send(
        &app,
        Method::POST,
        "/sessions",
        Some(session("IF101", 1, "08:00:00", "10:00:00")),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = created["id"].as_str().unwrap().to_string();

    let (status, body) = send(
        &app,
        Method::POST,
        "/sessions",
        Some(session("IF102", 2, "09:00:00", "11:00:00")),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["details"]["conflicts"][0]["kind"], "room_conflict");
    assert_eq!(body["details"]["suggestions"].as_array().unwrap().len(), 3);

    let (status, body) = send(&app, Method::GET, "/sessions/conflicts", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.as_array().unwrap().is_empty());

    let (status, body) = send(
        &app,
        Method::POST,
        "/sessions/alternatives",
        Some(json!({
            "course_code": "IF102",
            "instructor_id": 2,
            "room_id": "A101",
            "day": "tuesday",
            "start_time": "09:00:00",
            "end_time": "11:00:00",
            "expected_headcount": 30,
            "semester": "2025/1",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 3);

    let (status, body) = send(
        &app,
        Method::PATCH,
        &format!("/sessions/{id}"),
        Some(json!({ "day": "rabu" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["day"], "wednesday");

    let (status, _) = send(&app, Method::DELETE, &format!("/sessions/{id}"), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = send(&app, Method::GET, "/sessions", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.as_array().unwrap().is_empty());
}
