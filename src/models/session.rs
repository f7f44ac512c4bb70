use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::models::Day;
use crate::schedule::Meeting;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Room {
    pub id: String,
    pub name: String,
    pub capacity: i64,
    pub kind: String,
}

/// A scheduled weekly class meeting owned by the scheduling side.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Session {
    pub id: String,
    pub course_code: String,
    pub instructor_id: i64,
    pub room_id: String,
    pub semester: String,
    pub day: Day,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub capacity: i64,
    pub section: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl Meeting for Session {
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
pub struct NewRoomRequest {
    pub id: String,
    pub name: String,
    pub capacity: i64,
    #[serde(default = "default_room_kind")]
    pub kind: String,
}

fn default_room_kind() -> String {
    "classroom".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewSessionRequest {
    pub course_code: String,
    pub instructor_id: i64,
    pub room_id: String,
    pub semester: String,
    pub day: Day,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub capacity: i64,
    pub section: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateSessionRequest {
    pub instructor_id: Option<i64>,
    pub room_id: Option<String>,
    pub day: Option<Day>,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
    pub capacity: Option<i64>,
    pub section: Option<String>,
}
