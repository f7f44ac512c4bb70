use axum::Json;
use axum::extract::{Path, Query};
use axum::routing::{delete, patch, post};
use axum::{Router, extract::State, http::StatusCode, routing::get};
use serde::Deserialize;

use crate::error::AppError;
use crate::krs::ValidationOutcome;
use crate::models::*;
use crate::schedule::{Conflict, SlotRequest, SlotSuggestion};
use crate::services::{CourseReschedule, SchedulingService, SessionPlacement, catalog, registration, scheduling};
use crate::state::AppState;

#[derive(Deserialize)]
struct SemesterQuery {
    semester: String,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/courses", get(list_courses).post(create_course))
        .route("/courses/{code}/prerequisites", post(add_prerequisite))
        .route("/courses/{code}/schedule", patch(reschedule_course))
        .route("/krs/{nim}", get(list_registrations))
        .route("/krs/{nim}/courses", post(add_course))
        .route("/krs/{nim}/courses/{code}", delete(remove_course))
        .route("/krs/{nim}/validate", get(validate))
        .route("/krs/{nim}/submit", post(submit))
        .route("/krs/{nim}/approve", post(approve))
        .route("/krs/{nim}/reject", post(reject))
        .route("/krs/{nim}/resubmit", post(resubmit))
        .route("/billing/{nim}/overdue", post(mark_overdue))
        .route("/billing/{nim}/paid", post(unblock))
        .route("/rooms", get(list_rooms).post(create_room))
        .route("/sessions", get(list_sessions).post(create_session))
        .route("/sessions/conflicts", get(session_conflicts))
        .route("/sessions/alternatives", post(suggest_alternatives))
        .route("/sessions/{id}", patch(update_session).delete(delete_session))
        .with_state(state)
}

async fn health(State(state): State<AppState>) -> Result<StatusCode, AppError> {
    sqlx::query("select 1").execute(&state.db).await?;
    Ok(StatusCode::OK)
}

// Catalog

async fn list_courses(State(state): State<AppState>) -> Result<Json<Vec<Course>>, AppError> {
    let mut conn = state.db.acquire().await?;
    let courses = catalog::list_courses(&mut conn).await?;
    Ok(Json(courses))
}

async fn create_course(
    State(state): State<AppState>,
    Json(req): Json<NewCourseRequest>,
) -> Result<(StatusCode, Json<Course>), AppError> {
    let mut tx = state.db.begin().await?;
    let course = catalog::create_course(&mut tx, &req).await?;
    tx.commit().await?;
    Ok((StatusCode::CREATED, Json(course)))
}

async fn add_prerequisite(
    State(state): State<AppState>,
    Path(code): Path<String>,
    Json(req): Json<PrerequisiteRequest>,
) -> Result<Json<Course>, AppError> {
    let mut tx = state.db.begin().await?;
    let course = catalog::add_prerequisite(&mut tx, &code, &req.prerequisite_code).await?;
    tx.commit().await?;
    Ok(Json(course))
}

async fn reschedule_course(
    State(state): State<AppState>,
    Path(code): Path<String>,
    Json(req): Json<CourseScheduleUpdate>,
) -> Result<Json<CourseReschedule>, AppError> {
    let service = SchedulingService::new(state.schedule.clone());
    let mut conn = state.db.acquire().await?;
    let outcome = service.reschedule_course(&mut conn, &code, &req).await?;
    Ok(Json(outcome))
}

// Registration

async fn list_registrations(
    State(state): State<AppState>,
    Path(nim): Path<String>,
) -> Result<Json<Vec<RegistrationDetail>>, AppError> {
    let mut conn = state.db.acquire().await?;
    let registrations = registration::get_registrations(&mut conn, &nim).await?;
    Ok(Json(registrations))
}

async fn add_course(
    State(state): State<AppState>,
    Path(nim): Path<String>,
    Json(req): Json<CourseRequest>,
) -> Result<(StatusCode, Json<CourseReference>), AppError> {
    let mut tx = state.db.begin().await?;
    let reference = registration::add_course(&mut tx, &nim, &req.course_code, &req.semester).await?;
    tx.commit().await?;
    Ok((StatusCode::CREATED, Json(reference)))
}

async fn remove_course(
    State(state): State<AppState>,
    Path((nim, code)): Path<(String, String)>,
    Query(query): Query<SemesterQuery>,
) -> Result<StatusCode, AppError> {
    let mut tx = state.db.begin().await?;
    registration::remove_course(&mut tx, &nim, &code, &query.semester).await?;
    tx.commit().await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn validate(
    State(state): State<AppState>,
    Path(nim): Path<String>,
    Query(query): Query<SemesterQuery>,
) -> Result<Json<ValidationOutcome>, AppError> {
    let mut conn = state.db.acquire().await?;
    let outcome = registration::validate_for(&mut conn, &nim, &query.semester).await?;
    Ok(Json(outcome))
}

async fn submit(
    State(state): State<AppState>,
    Path(nim): Path<String>,
    Json(req): Json<SemesterRequest>,
) -> Result<Json<RegistrationSet>, AppError> {
    let mut tx = state.db.begin().await?;
    let updated = registration::submit(&mut tx, &nim, &req.semester).await?;
    tx.commit().await?;
    Ok(Json(updated))
}

async fn approve(
    State(state): State<AppState>,
    Path(nim): Path<String>,
    Json(req): Json<ApproveRequest>,
) -> Result<Json<RegistrationSet>, AppError> {
    let mut tx = state.db.begin().await?;
    let updated = registration::approve(&mut tx, &nim, &req.semester, req.advisor_id).await?;
    tx.commit().await?;
    Ok(Json(updated))
}

async fn reject(
    State(state): State<AppState>,
    Path(nim): Path<String>,
    Json(req): Json<SemesterRequest>,
) -> Result<Json<RegistrationSet>, AppError> {
    let mut tx = state.db.begin().await?;
    let updated = registration::reject(&mut tx, &nim, &req.semester).await?;
    tx.commit().await?;
    Ok(Json(updated))
}

async fn resubmit(
    State(state): State<AppState>,
    Path(nim): Path<String>,
    Json(req): Json<SemesterRequest>,
) -> Result<Json<RegistrationSet>, AppError> {
    let mut tx = state.db.begin().await?;
    let updated = registration::resubmit(&mut tx, &nim, &req.semester).await?;
    tx.commit().await?;
    Ok(Json(updated))
}

// Billing signals

async fn mark_overdue(
    State(state): State<AppState>,
    Path(nim): Path<String>,
    Json(req): Json<SemesterRequest>,
) -> Result<Json<RegistrationSet>, AppError> {
    let mut tx = state.db.begin().await?;
    let updated = registration::mark_overdue(&mut tx, &nim, &req.semester).await?;
    tx.commit().await?;
    Ok(Json(updated))
}

async fn unblock(
    State(state): State<AppState>,
    Path(nim): Path<String>,
    Json(req): Json<SemesterRequest>,
) -> Result<Json<RegistrationSet>, AppError> {
    let mut tx = state.db.begin().await?;
    let updated = registration::unblock(&mut tx, &nim, &req.semester).await?;
    tx.commit().await?;
    Ok(Json(updated))
}

// Scheduling

async fn list_rooms(State(state): State<AppState>) -> Result<Json<Vec<Room>>, AppError> {
    let mut conn = state.db.acquire().await?;
    Ok(Json(scheduling::list_rooms(&mut conn).await?))
}

async fn create_room(
    State(state): State<AppState>,
    Json(req): Json<NewRoomRequest>,
) -> Result<(StatusCode, Json<Room>), AppError> {
    let mut conn = state.db.acquire().await?;
    let room = scheduling::create_room(&mut conn, &req).await?;
    Ok((StatusCode::CREATED, Json(room)))
}

async fn list_sessions(State(state): State<AppState>) -> Result<Json<Vec<Session>>, AppError> {
    let mut conn = state.db.acquire().await?;
    Ok(Json(scheduling::list_sessions(&mut conn).await?))
}

async fn create_session(
    State(state): State<AppState>,
    Json(req): Json<NewSessionRequest>,
) -> Result<(StatusCode, Json<SessionPlacement>), AppError> {
    let service = SchedulingService::new(state.schedule.clone());
    let mut conn = state.db.acquire().await?;
    let placement = service.create_session(&mut conn, &req).await?;
    Ok((StatusCode::CREATED, Json(placement)))
}

async fn update_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<UpdateSessionRequest>,
) -> Result<Json<SessionPlacement>, AppError> {
    let service = SchedulingService::new(state.schedule.clone());
    let mut conn = state.db.acquire().await?;
    let placement = service.update_session(&mut conn, &id, &req).await?;
    Ok(Json(placement))
}

async fn delete_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let service = SchedulingService::new(state.schedule.clone());
    let mut conn = state.db.acquire().await?;
    service.delete_session(&mut conn, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn session_conflicts(State(state): State<AppState>) -> Result<Json<Vec<Conflict>>, AppError> {
    let mut conn = state.db.acquire().await?;
    Ok(Json(scheduling::schedule_conflicts(&mut conn).await?))
}

async fn suggest_alternatives(
    State(state): State<AppState>,
    Json(req): Json<SlotRequest>,
) -> Result<Json<Vec<SlotSuggestion>>, AppError> {
    let mut conn = state.db.acquire().await?;
    Ok(Json(scheduling::suggest_slots(&mut conn, &req).await?))
}
