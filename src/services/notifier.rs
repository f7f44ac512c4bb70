use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveTime;
use serde::Serialize;
use tracing::info;

use crate::models::Day;

/// Something that changed in the teaching schedule.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ScheduleEvent {
    SessionCreated {
        session_id: String,
        course_code: String,
        day: Day,
        start_time: NaiveTime,
        end_time: NaiveTime,
        room_id: String,
    },
    SessionUpdated {
        session_id: String,
        course_code: String,
        day: Day,
        start_time: NaiveTime,
        end_time: NaiveTime,
        room_id: String,
        invalidated_registrations: u64,
    },
    SessionDeleted {
        session_id: String,
        course_code: String,
    },
    CourseRescheduled {
        course_code: String,
        day: Day,
        start_time: NaiveTime,
        end_time: NaiveTime,
        invalidated_registrations: u64,
    },
}

impl ScheduleEvent {
    pub fn course_code(&self) -> &str {
        match self {
            ScheduleEvent::SessionCreated { course_code, .. }
            | ScheduleEvent::SessionUpdated { course_code, .. }
            | ScheduleEvent::SessionDeleted { course_code, .. }
            | ScheduleEvent::CourseRescheduled { course_code, .. } => course_code,
        }
    }
}

impl fmt::Display for ScheduleEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScheduleEvent::SessionCreated {
                course_code,
                day,
                start_time,
                end_time,
                room_id,
                ..
            } => write!(
                f,
                "{course_code} scheduled on {day} {start_time}-{end_time} in {room_id}"
            ),
            ScheduleEvent::SessionUpdated {
                course_code,
                day,
                start_time,
                end_time,
                room_id,
                ..
            } => write!(
                f,
                "{course_code} moved to {day} {start_time}-{end_time} in {room_id}"
            ),
            ScheduleEvent::SessionDeleted {
                course_code,
                session_id,
            } => write!(f, "{course_code} session {session_id} cancelled"),
            ScheduleEvent::CourseRescheduled {
                course_code,
                day,
                start_time,
                end_time,
                ..
            } => write!(
                f,
                "{course_code} now meets on {day} {start_time}-{end_time}"
            ),
        }
    }
}

#[async_trait]
pub trait ScheduleObserver: Send + Sync {
    async fn on_event(&self, event: &ScheduleEvent);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Audience {
    Student,
    Lecturer,
    Admin,
}

/// Writes each event to the log, addressed to one audience.
#[derive(Debug, Clone, Copy)]
pub struct AudienceObserver {
    audience: Audience,
}

impl AudienceObserver {
    pub fn new(audience: Audience) -> Self {
        Self { audience }
    }
}

#[async_trait]
impl ScheduleObserver for AudienceObserver {
    async fn on_event(&self, event: &ScheduleEvent) {
        match self.audience {
            Audience::Student => {
                info!(audience = "student", course = event.course_code(), "schedule change: {}", event)
            }
            Audience::Lecturer => {
                info!(audience = "lecturer", course = event.course_code(), "teaching schedule change: {}", event)
            }
            Audience::Admin => info!(audience = "admin", ?event, "schedule event"),
        }
    }
}

/// Observers notified after a schedule mutation has been stored.
#[derive(Default, Clone)]
pub struct ScheduleSubject {
    observers: Vec<Arc<dyn ScheduleObserver>>,
}

impl ScheduleSubject {
    pub fn new() -> Self {
        Self::default()
    }

    /// A subject with the student, lecturer and admin log observers attached.
    pub fn with_default_observers() -> Self {
        let mut subject = Self::new();
        for audience in [Audience::Student, Audience::Lecturer, Audience::Admin] {
            subject.attach(Arc::new(AudienceObserver::new(audience)));
        }
        subject
    }

    pub fn attach(&mut self, observer: Arc<dyn ScheduleObserver>) {
        self.observers.push(observer);
    }

    pub fn len(&self) -> usize {
        self.observers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }

    pub async fn notify(&self, event: &ScheduleEvent) {
        for observer in &self.observers {
            observer.on_event(event).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl ScheduleObserver for Recorder {
        async fn on_event(&self, event: &ScheduleEvent) {
            self.seen.lock().unwrap().push(event.to_string());
        }
    }

    #[tokio::test]
    async fn notifies_every_observer_in_order() {
        let first = Arc::new(Recorder::default());
        let second = Arc::new(Recorder::default());
        let mut subject = ScheduleSubject::with_default_observers();
        subject.attach(first.clone());
        subject.attach(second.clone());
        assert_eq!(subject.len(), 5);

        let event = ScheduleEvent::SessionDeleted {
            session_id: "s-1".to_string(),
            course_code: "IF101".to_string(),
        };
        subject.notify(&event).await;

        assert_eq!(
            *first.seen.lock().unwrap(),
            vec!["IF101 session s-1 cancelled".to_string()]
        );
        assert_eq!(second.seen.lock().unwrap().len(), 1);
    }

    #[test]
    fn events_serialize_with_tag() {
        let event = ScheduleEvent::CourseRescheduled {
            course_code: "IF101".to_string(),
            day: Day::Friday,
            start_time: NaiveTime::from_hms_opt(13, 0, 0).unwrap(),
            end_time: NaiveTime::from_hms_opt(15, 0, 0).unwrap(),
            invalidated_registrations: 2,
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["event"], "course_rescheduled");
        assert_eq!(value["day"], "friday");
        assert_eq!(value["invalidated_registrations"], 2);
    }
}
