use std::fmt;

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::models::Course;

/// Lifecycle state of a student's per-semester registration (KRS).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "UPPERCASE")]
#[sqlx(rename_all = "UPPERCASE")]
pub enum RegistrationStatus {
    Draft,
    Submitted,
    Approved,
    Revision,
    /// Set only by the billing side channel.
    Blocked,
}

impl RegistrationStatus {
    pub const ALL: [RegistrationStatus; 5] = [
        RegistrationStatus::Draft,
        RegistrationStatus::Submitted,
        RegistrationStatus::Approved,
        RegistrationStatus::Revision,
        RegistrationStatus::Blocked,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RegistrationStatus::Draft => "DRAFT",
            RegistrationStatus::Submitted => "SUBMITTED",
            RegistrationStatus::Approved => "APPROVED",
            RegistrationStatus::Revision => "REVISION",
            RegistrationStatus::Blocked => "BLOCKED",
        }
    }
}

impl fmt::Display for RegistrationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One registration per (student, semester).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct RegistrationSet {
    pub id: String,
    pub student_id: String,
    pub semester: String,
    pub status: RegistrationStatus,
    pub advisor_id: Option<i64>,
    pub created_at: String,
    pub updated_at: String,
}

/// Membership of a course in a registration.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CourseReference {
    pub id: String,
    pub registration_id: String,
    pub course_id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RegistrationDetail {
    #[serde(flatten)]
    pub registration: RegistrationSet,
    pub total_credits: i64,
    pub courses: Vec<Course>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourseRequest {
    pub course_code: String,
    pub semester: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SemesterRequest {
    pub semester: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApproveRequest {
    pub semester: String,
    pub advisor_id: i64,
}
