use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::models::Day;
use crate::schedule::Meeting;

/// A catalog course with its single nominal weekly meeting.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Course {
    pub id: String,
    pub code: String,
    pub name: String,
    pub credits: i64,
    pub semester_number: i64,
    pub day: Day,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub created_at: String,
    pub updated_at: String,
    /// Ids of the courses this one requires. Filled in by the repository.
    #[sqlx(skip)]
    #[serde(default)]
    pub prerequisites: Vec<String>,
}

impl Meeting for Course {
    fn day(&self) -> Day {
        self.day
    }

    fn start(&self) -> NaiveTime {
        self.start_time
    }

    fn end(&self) -> NaiveTime {
        self.end_time
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewCourseRequest {
    pub code: String,
    pub name: String,
    pub credits: i64,
    pub semester_number: i64,
    pub day: Day,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    /// Codes of prerequisite courses, which must already exist.
    #[serde(default)]
    pub prerequisites: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrerequisiteRequest {
    pub prerequisite_code: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourseScheduleUpdate {
    pub day: Day,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
}
