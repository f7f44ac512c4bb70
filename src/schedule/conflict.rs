use chrono::NaiveTime;
use serde::Serialize;

use crate::models::{Day, Session};
use crate::schedule::interval::{overlap_window, overlapping_pairs};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictKind {
    /// Same day, same room, overlapping time.
    RoomConflict,
    /// Same day, same instructor, overlapping time.
    InstructorConflict,
    /// Same day and overlapping time, but neither room nor instructor shared.
    TimeOverlap,
}

impl ConflictKind {
    /// Room and instructor clashes make a placement impossible; a bare time
    /// overlap is only informational.
    pub fn is_blocking(&self) -> bool {
        !matches!(self, ConflictKind::TimeOverlap)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Conflict {
    pub kind: ConflictKind,
    pub first: String,
    pub second: String,
    pub day: Day,
    pub overlap_start: NaiveTime,
    pub overlap_end: NaiveTime,
}

/// Where and when a class would meet, without its identity.
#[derive(Debug, Clone, Copy)]
pub struct Placement<'a> {
    pub day: Day,
    pub start: NaiveTime,
    pub end: NaiveTime,
    pub room_id: &'a str,
    pub instructor_id: i64,
}

impl Session {
    pub fn placement(&self) -> Placement<'_> {
        Placement {
            day: self.day,
            start: self.start_time,
            end: self.end_time,
            room_id: &self.room_id,
            instructor_id: self.instructor_id,
        }
    }
}

/// Classify a pair of placements. Empty when they do not overlap.
///
/// A pair sharing both room and instructor yields both kinds.
pub fn classify(a: &Placement<'_>, b: &Placement<'_>) -> Vec<ConflictKind> {
    if a.day != b.day || overlap_window(a.start, a.end, b.start, b.end).is_none() {
        return Vec::new();
    }

    let same_room = a.room_id == b.room_id;
    let same_instructor = a.instructor_id == b.instructor_id;

    let mut kinds = Vec::with_capacity(2);
    if same_room {
        kinds.push(ConflictKind::RoomConflict);
    }
    if same_instructor {
        kinds.push(ConflictKind::InstructorConflict);
    }
    if !same_room && !same_instructor {
        kinds.push(ConflictKind::TimeOverlap);
    }
    kinds
}

fn records(a: &Session, b: &Session) -> Vec<Conflict> {
    if a.day != b.day {
        return Vec::new();
    }
    let Some((overlap_start, overlap_end)) =
        overlap_window(a.start_time, a.end_time, b.start_time, b.end_time)
    else {
        return Vec::new();
    };

    classify(&a.placement(), &b.placement())
        .into_iter()
        .map(|kind| Conflict {
            kind,
            first: a.id.clone(),
            second: b.id.clone(),
            day: a.day,
            overlap_start,
            overlap_end,
        })
        .collect()
}

/// Every pairwise conflict across a set of sessions.
pub fn detect_conflicts(sessions: &[Session]) -> Vec<Conflict> {
    overlapping_pairs(sessions)
        .into_iter()
        .flat_map(|(a, b)| records(a, b))
        .collect()
}

/// Conflicts between one candidate session and every existing session.
///
/// The candidate is always reported as `first`. An existing session with
/// the candidate's id is skipped so updates do not clash with themselves.
pub fn conflicts_against(candidate: &Session, existing: &[Session]) -> Vec<Conflict> {
    existing
        .iter()
        .filter(|other| other.id != candidate.id)
        .flat_map(|other| records(candidate, other))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(id: &str, day: Day, start: u32, end: u32, room: &str, instructor: i64) -> Session {
        Session {
            id: id.to_string(),
            course_code: format!("C-{id}"),
            instructor_id: instructor,
            room_id: room.to_string(),
            semester: "2025/1".to_string(),
            day,
            start_time: NaiveTime::from_hms_opt(start, 0, 0).unwrap(),
            end_time: NaiveTime::from_hms_opt(end, 0, 0).unwrap(),
            capacity: 30,
            section: None,
            created_at: String::new(),
            updated_at: String::new(),
        }
    }

    #[test]
    fn room_conflict() {
        let sessions = vec![
            session("a", Day::Monday, 8, 10, "A101", 1),
            session("b", Day::Monday, 9, 11, "A101", 2),
        ];
        let conflicts = detect_conflicts(&sessions);
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].kind, ConflictKind::RoomConflict);
        assert_eq!(conflicts[0].overlap_start, NaiveTime::from_hms_opt(9, 0, 0).unwrap());
        assert_eq!(conflicts[0].overlap_end, NaiveTime::from_hms_opt(10, 0, 0).unwrap());
    }

    #[test]
    fn instructor_conflict() {
        let sessions = vec![
            session("a", Day::Tuesday, 8, 10, "A101", 7),
            session("b", Day::Tuesday, 8, 10, "B202", 7),
        ];
        let conflicts = detect_conflicts(&sessions);
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].kind, ConflictKind::InstructorConflict);
    }

    #[test]
    fn same_room_and_instructor_yields_two_records() {
        let sessions = vec![
            session("a", Day::Monday, 8, 10, "A101", 7),
            session("b", Day::Monday, 9, 10, "A101", 7),
        ];
        let kinds: Vec<_> = detect_conflicts(&sessions).iter().map(|c| c.kind).collect();
        assert_eq!(
            kinds,
            vec![ConflictKind::RoomConflict, ConflictKind::InstructorConflict]
        );
    }

    #[test]
    fn plain_time_overlap_is_not_blocking() {
        let sessions = vec![
            session("a", Day::Monday, 8, 10, "A101", 1),
            session("b", Day::Monday, 9, 11, "B202", 2),
        ];
        let conflicts = detect_conflicts(&sessions);
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].kind, ConflictKind::TimeOverlap);
        assert!(!conflicts[0].kind.is_blocking());
    }

    #[test]
    fn different_days_and_touching_slots_are_clean() {
        let sessions = vec![
            session("a", Day::Monday, 8, 10, "A101", 1),
            session("b", Day::Tuesday, 8, 10, "A101", 1),
            session("c", Day::Monday, 10, 12, "A101", 1),
        ];
        assert!(detect_conflicts(&sessions).is_empty());
    }

    #[test]
    fn candidate_skips_itself() {
        let existing = vec![
            session("a", Day::Monday, 8, 10, "A101", 1),
            session("b", Day::Monday, 8, 10, "B202", 2),
        ];
        let moved = session("a", Day::Monday, 9, 11, "A101", 1);
        let conflicts = conflicts_against(&moved, &existing);
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].first, "a");
        assert_eq!(conflicts[0].second, "b");
        assert_eq!(conflicts[0].kind, ConflictKind::TimeOverlap);
    }
}
