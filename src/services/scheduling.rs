use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use sqlx::{Connection, SqliteConnection};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::db::repository;
use crate::error::AppError;
use crate::models::{
    Course, CourseScheduleUpdate, NewRoomRequest, NewSessionRequest, Room, Session,
    UpdateSessionRequest,
};
use crate::schedule::{
    Conflict, SlotRequest, SlotSuggestion, conflicts_against, detect_conflicts,
    suggest_alternatives,
};
use crate::services::notifier::{ScheduleEvent, ScheduleSubject};
use crate::services::registration;

/// A stored session plus the non-blocking overlaps it has with others.
#[derive(Debug, Clone, Serialize)]
pub struct SessionPlacement {
    #[serde(flatten)]
    pub session: Session,
    pub time_overlaps: Vec<Conflict>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CourseReschedule {
    pub course: Course,
    pub invalidated_registrations: u64,
}

pub async fn list_rooms(conn: &mut SqliteConnection) -> Result<Vec<Room>, AppError> {
    Ok(repository::fetch_rooms(conn).await?)
}

pub async fn create_room(
    conn: &mut SqliteConnection,
    req: &NewRoomRequest,
) -> Result<Room, AppError> {
    if req.id.trim().is_empty() {
        return Err(AppError::BadRequest("room id must not be empty".to_string()));
    }
    if req.capacity < 0 {
        return Err(AppError::BadRequest(format!(
            "room {} cannot have a negative capacity",
            req.id
        )));
    }

    match repository::insert_room(conn, req).await {
        Ok(room) => {
            info!(room = %room.id, capacity = room.capacity, "room created");
            Ok(room)
        }
        Err(err) if repository::is_unique_violation(&err) => Err(AppError::BadRequest(format!(
            "room {} already exists",
            req.id
        ))),
        Err(err) => Err(err.into()),
    }
}

pub async fn list_sessions(conn: &mut SqliteConnection) -> Result<Vec<Session>, AppError> {
    Ok(repository::fetch_sessions(conn).await?)
}

/// Sessions of one semester. Sessions of different semesters never clash.
async fn semester_sessions(
    conn: &mut SqliteConnection,
    semester: &str,
) -> Result<Vec<Session>, sqlx::Error> {
    let mut sessions = repository::fetch_sessions(conn).await?;
    sessions.retain(|s| s.semester == semester);
    Ok(sessions)
}

/// Every conflict in the stored schedule, semester by semester.
pub async fn schedule_conflicts(conn: &mut SqliteConnection) -> Result<Vec<Conflict>, AppError> {
    let mut sessions = repository::fetch_sessions(conn).await?;
    sessions.sort_by(|a, b| a.semester.cmp(&b.semester));

    let conflicts = sessions
        .chunk_by(|a, b| a.semester == b.semester)
        .flat_map(detect_conflicts)
        .collect();
    Ok(conflicts)
}

/// Alternative slots for a class against the stored rooms and sessions.
pub async fn suggest_slots(
    conn: &mut SqliteConnection,
    request: &SlotRequest,
) -> Result<Vec<SlotSuggestion>, AppError> {
    if request.start_time >= request.end_time {
        return Err(AppError::BadRequest("start_time must be before end_time".to_string()));
    }
    let rooms = repository::fetch_rooms(conn).await?;
    let sessions = semester_sessions(conn, &request.semester).await?;
    Ok(suggest_alternatives(request, &rooms, &sessions))
}

fn slot_request(session: &Session, moving: bool) -> SlotRequest {
    SlotRequest {
        course_code: session.course_code.clone(),
        instructor_id: session.instructor_id,
        room_id: session.room_id.clone(),
        day: session.day,
        start_time: session.start_time,
        end_time: session.end_time,
        expected_headcount: session.capacity,
        semester: session.semester.clone(),
        session_id: moving.then(|| session.id.clone()),
    }
}

/// Split conflicts into blocking ones and plain time overlaps.
fn check_placement(
    candidate: &Session,
    existing: &[Session],
    rooms: &[Room],
    moving: bool,
) -> Result<Vec<Conflict>, AppError> {
    let (blocking, time_overlaps): (Vec<Conflict>, Vec<Conflict>) =
        conflicts_against(candidate, existing)
            .into_iter()
            .partition(|c| c.kind.is_blocking());

    if blocking.is_empty() {
        return Ok(time_overlaps);
    }

    let suggestions = suggest_alternatives(&slot_request(candidate, moving), rooms, existing);
    warn!(
        course = %candidate.course_code,
        day = %candidate.day,
        start = %candidate.start_time,
        conflicts = blocking.len(),
        suggestions = suggestions.len(),
        "session placement rejected"
    );
    Err(AppError::SessionConflict {
        conflicts: blocking,
        suggestions,
    })
}

fn validate_times(session: &Session) -> Result<(), AppError> {
    if session.start_time >= session.end_time {
        return Err(AppError::BadRequest("start_time must be before end_time".to_string()));
    }
    if session.capacity < 0 {
        return Err(AppError::BadRequest("capacity cannot be negative".to_string()));
    }
    Ok(())
}

/// Creates, moves and cancels sessions and tells observers about it.
#[derive(Clone)]
pub struct SchedulingService {
    subject: Arc<ScheduleSubject>,
}

impl SchedulingService {
    pub fn new(subject: Arc<ScheduleSubject>) -> Self {
        Self { subject }
    }

    pub async fn create_session(
        &self,
        conn: &mut SqliteConnection,
        req: &NewSessionRequest,
    ) -> Result<SessionPlacement, AppError> {
        let now = Utc::now().to_rfc3339();
        let session = Session {
            id: Uuid::new_v4().to_string(),
            course_code: req.course_code.clone(),
            instructor_id: req.instructor_id,
            room_id: req.room_id.clone(),
            semester: req.semester.clone(),
            day: req.day,
            start_time: req.start_time,
            end_time: req.end_time,
            capacity: req.capacity,
            section: req.section.clone(),
            created_at: now.clone(),
            updated_at: now,
        };
        validate_times(&session)?;

        let mut tx = conn.begin().await?;
        if repository::find_room(&mut tx, &session.room_id).await?.is_none() {
            return Err(AppError::NotFound(format!("room {} does not exist", session.room_id)));
        }

        let rooms = repository::fetch_rooms(&mut tx).await?;
        let existing = semester_sessions(&mut tx, &session.semester).await?;
        let time_overlaps = check_placement(&session, &existing, &rooms, false)?;

        repository::insert_session(&mut tx, &session).await?;
        tx.commit().await?;

        info!(
            id = %session.id,
            course = %session.course_code,
            day = %session.day,
            start = %session.start_time,
            room = %session.room_id,
            overlaps = time_overlaps.len(),
            "session created"
        );
        self.subject
            .notify(&ScheduleEvent::SessionCreated {
                session_id: session.id.clone(),
                course_code: session.course_code.clone(),
                day: session.day,
                start_time: session.start_time,
                end_time: session.end_time,
                room_id: session.room_id.clone(),
            })
            .await;

        Ok(SessionPlacement {
            session,
            time_overlaps,
        })
    }

    /// Change a session. A new day, time, room or instructor sends every
    /// registration holding the course back to REVISION.
    pub async fn update_session(
        &self,
        conn: &mut SqliteConnection,
        id: &str,
        req: &UpdateSessionRequest,
    ) -> Result<SessionPlacement, AppError> {
        let mut tx = conn.begin().await?;
        let current = repository::find_session(&mut tx, id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("session {id} does not exist")))?;

        let mut session = current.clone();
        if let Some(instructor_id) = req.instructor_id {
            session.instructor_id = instructor_id;
        }
        if let Some(room_id) = &req.room_id {
            session.room_id = room_id.clone();
        }
        if let Some(day) = req.day {
            session.day = day;
        }
        if let Some(start_time) = req.start_time {
            session.start_time = start_time;
        }
        if let Some(end_time) = req.end_time {
            session.end_time = end_time;
        }
        if let Some(capacity) = req.capacity {
            session.capacity = capacity;
        }
        if req.section.is_some() {
            session.section = req.section.clone();
        }
        validate_times(&session)?;

        if session.room_id != current.room_id
            && repository::find_room(&mut tx, &session.room_id).await?.is_none()
        {
            return Err(AppError::NotFound(format!("room {} does not exist", session.room_id)));
        }

        let moved = session.day != current.day
            || session.start_time != current.start_time
            || session.end_time != current.end_time
            || session.room_id != current.room_id
            || session.instructor_id != current.instructor_id;

        let rooms = repository::fetch_rooms(&mut tx).await?;
        let existing = semester_sessions(&mut tx, &session.semester).await?;
        let time_overlaps = check_placement(&session, &existing, &rooms, true)?;

        session.updated_at = Utc::now().to_rfc3339();
        repository::update_session(&mut tx, &session).await?;

        // Sessions may carry a code that is not in the course catalog.
        let invalidated = if moved {
            match registration::invalidate_course(&mut tx, &session.course_code).await {
                Ok(changed) => changed,
                Err(AppError::NotFound(_)) => 0,
                Err(err) => return Err(err),
            }
        } else {
            0
        };
        tx.commit().await?;

        info!(id, course = %session.course_code, moved, invalidated, "session updated");
        if moved {
            self.subject
                .notify(&ScheduleEvent::SessionUpdated {
                    session_id: session.id.clone(),
                    course_code: session.course_code.clone(),
                    day: session.day,
                    start_time: session.start_time,
                    end_time: session.end_time,
                    room_id: session.room_id.clone(),
                    invalidated_registrations: invalidated,
                })
                .await;
        }

        Ok(SessionPlacement {
            session,
            time_overlaps,
        })
    }

    pub async fn delete_session(&self, conn: &mut SqliteConnection, id: &str) -> Result<(), AppError> {
        let mut tx = conn.begin().await?;
        let session = repository::find_session(&mut tx, id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("session {id} does not exist")))?;
        repository::delete_session(&mut tx, id).await?;
        tx.commit().await?;

        info!(id, course = %session.course_code, "session deleted");
        self.subject
            .notify(&ScheduleEvent::SessionDeleted {
                session_id: session.id,
                course_code: session.course_code,
            })
            .await;
        Ok(())
    }

    /// Move a course's nominal meeting time and invalidate registrations holding it.
    ///
    /// Asking for the slot the course already has changes nothing.
    pub async fn reschedule_course(
        &self,
        conn: &mut SqliteConnection,
        course_code: &str,
        update: &CourseScheduleUpdate,
    ) -> Result<CourseReschedule, AppError> {
        if update.start_time >= update.end_time {
            return Err(AppError::BadRequest("start_time must be before end_time".to_string()));
        }

        let mut tx = conn.begin().await?;
        let mut course = repository::find_course_by_code(&mut tx, course_code)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("course {course_code} does not exist")))?;

        if course.day == update.day
            && course.start_time == update.start_time
            && course.end_time == update.end_time
        {
            debug!(course = course_code, "schedule unchanged");
            return Ok(CourseReschedule {
                course,
                invalidated_registrations: 0,
            });
        }

        repository::update_course_schedule(
            &mut tx,
            &course.id,
            update.day,
            update.start_time,
            update.end_time,
        )
        .await?;
        let invalidated = registration::invalidate_course(&mut tx, course_code).await?;
        tx.commit().await?;

        course.day = update.day;
        course.start_time = update.start_time;
        course.end_time = update.end_time;

        info!(course = course_code, day = %course.day, start = %course.start_time, invalidated, "course rescheduled");
        self.subject
            .notify(&ScheduleEvent::CourseRescheduled {
                course_code: course.code.clone(),
                day: course.day,
                start_time: course.start_time,
                end_time: course.end_time,
                invalidated_registrations: invalidated,
            })
            .await;

        Ok(CourseReschedule {
            course,
            invalidated_registrations: invalidated,
        })
    }
}
