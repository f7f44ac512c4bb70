use axum::{Json, http::StatusCode, response::{IntoResponse, Response}};
use chrono::NaiveTime;
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use crate::krs::{InvalidTransition, Violation};
use crate::models::Day;
use crate::schedule::{Conflict, SlotSuggestion};

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    InvalidTransition(#[from] InvalidTransition),

    #[error("Validation failed: {0}")]
    Validation(#[from] Violation),

    #[error("course {course_code} is already in the registration")]
    AlreadyEnrolled { course_code: String },

    #[error(
        "course {course_code} conflicts with {conflicting_course} on {day} from {overlap_start} to {overlap_end} ({minutes} minutes)"
    )]
    ScheduleConflict {
        course_code: String,
        conflicting_course: String,
        day: Day,
        overlap_start: NaiveTime,
        overlap_end: NaiveTime,
        minutes: i64,
    },

    #[error("session conflicts with {} existing session(s)", .conflicts.len())]
    SessionConflict {
        conflicts: Vec<Conflict>,
        suggestions: Vec<SlotSuggestion>,
    },
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let message = self.to_string();
        let (status, message, details) = match self {
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, message, None),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg, None),
            AppError::InvalidTransition(err) => (
                StatusCode::CONFLICT,
                message,
                serde_json::to_value(err).ok(),
            ),
            AppError::Validation(violation) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                violation.message.clone(),
                serde_json::to_value(&violation).ok(),
            ),
            AppError::AlreadyEnrolled { .. } => (StatusCode::CONFLICT, message, None),
            AppError::ScheduleConflict {
                conflicting_course,
                day,
                overlap_start,
                overlap_end,
                minutes,
                ..
            } => (
                StatusCode::CONFLICT,
                message,
                Some(serde_json::json!({
                    "conflicting_course": conflicting_course,
                    "day": day,
                    "overlap_start": overlap_start,
                    "overlap_end": overlap_end,
                    "minutes": minutes,
                })),
            ),
            AppError::SessionConflict {
                conflicts,
                suggestions,
            } => (
                StatusCode::CONFLICT,
                message,
                Some(serde_json::json!({
                    "conflicts": conflicts,
                    "suggestions": suggestions,
                })),
            ),
            AppError::Database(e) => {
                error!("database error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Database error occurred".to_string(),
                    None,
                )
            }
            AppError::Migration(e) => {
                error!("migration error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                    None,
                )
            }
            AppError::Config(msg) => {
                error!("configuration error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                    None,
                )
            }
        };

        let body = Json(ErrorResponse {
            error: status.to_string(),
            message,
            details,
        });

        (status, body).into_response()
    }
}
