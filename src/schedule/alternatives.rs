use std::fmt;

use chrono::{NaiveTime, Timelike};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::models::{Day, Room, Session};
use crate::schedule::conflict::{Placement, classify};

/// Standard two-hour teaching blocks, as `(start_hour, end_hour)`.
pub const TIME_BLOCKS: [(u32, u32); 4] = [(8, 10), (10, 12), (13, 15), (15, 17)];

pub const MAX_SUGGESTIONS: usize = 3;

/// A class that needs (or may need) a different slot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlotRequest {
    pub course_code: String,
    pub instructor_id: i64,
    pub room_id: String,
    pub day: Day,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub expected_headcount: i64,
    pub semester: String,
    /// The session being moved, if it already exists.
    #[serde(default)]
    pub session_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SlotSuggestion {
    pub day: Day,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub room_id: String,
    pub reason: String,
}

/// Time-of-day preference, best first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DayPart {
    Morning,
    Afternoon,
    Evening,
}

impl DayPart {
    pub fn of(time: NaiveTime) -> Self {
        match time.hour() {
            8..=11 => DayPart::Morning,
            12..=15 => DayPart::Afternoon,
            _ => DayPart::Evening,
        }
    }
}

impl fmt::Display for DayPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DayPart::Morning => "morning",
            DayPart::Afternoon => "afternoon",
            DayPart::Evening => "evening",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy)]
struct Candidate<'a> {
    day: Day,
    start: NaiveTime,
    end: NaiveTime,
    room: &'a str,
}

impl Candidate<'_> {
    fn rank(&self) -> (DayPart, NaiveTime) {
        (DayPart::of(self.start), self.start)
    }

    fn same_slot(&self, suggestion: &SlotSuggestion) -> bool {
        self.day == suggestion.day
            && self.start == suggestion.start_time
            && self.end == suggestion.end_time
            && self.room == suggestion.room_id
    }
}

fn grid() -> impl Iterator<Item = (Day, NaiveTime, NaiveTime)> {
    Day::TEACHING_DAYS.into_iter().flat_map(|day| {
        TIME_BLOCKS.into_iter().filter_map(move |(start, end)| {
            Some((
                day,
                NaiveTime::from_hms_opt(start, 0, 0)?,
                NaiveTime::from_hms_opt(end, 0, 0)?,
            ))
        })
    })
}

/// Whether the candidate clashes with any existing session on room or instructor.
fn is_free(candidate: &Candidate<'_>, instructor_id: i64, existing: &[&Session]) -> bool {
    let placement = Placement {
        day: candidate.day,
        start: candidate.start,
        end: candidate.end,
        room_id: candidate.room,
        instructor_id,
    };
    existing.iter().all(|session| {
        let clash = classify(&placement, &session.placement())
            .iter()
            .any(|kind| kind.is_blocking());
        if clash {
            debug!(
                day = %candidate.day,
                start = %candidate.start,
                room = candidate.room,
                blocking = %session.id,
                "slot rejected"
            );
        }
        !clash
    })
}

/// Up to three conflict-free alternative slots for `request`.
///
/// Candidates are every teaching day, standard block and known room. A
/// candidate survives if the room holds the expected headcount and neither
/// the room nor the instructor is busy in any existing session at that time.
/// Survivors are ranked morning first, then by start time. When that leaves
/// fewer than three, the requested room is searched again on its own, as
/// long as it is a known room that holds the expected headcount. An empty
/// result means nothing fits.
pub fn suggest_alternatives(
    request: &SlotRequest,
    rooms: &[Room],
    sessions: &[Session],
) -> Vec<SlotSuggestion> {
    let existing: Vec<&Session> = sessions
        .iter()
        .filter(|s| request.session_id.as_deref() != Some(s.id.as_str()))
        .collect();

    let is_requested = |c: &Candidate<'_>| {
        c.day == request.day
            && c.start == request.start_time
            && c.end == request.end_time
            && c.room == request.room_id
    };

    let mut survivors: Vec<(Candidate<'_>, i64)> = Vec::new();
    for (day, start, end) in grid() {
        for room in rooms {
            let candidate = Candidate {
                day,
                start,
                end,
                room: &room.id,
            };
            if is_requested(&candidate) {
                continue;
            }
            if room.capacity < request.expected_headcount {
                debug!(room = %room.id, capacity = room.capacity, "room too small");
                continue;
            }
            if is_free(&candidate, request.instructor_id, &existing) {
                survivors.push((candidate, room.capacity));
            }
        }
    }
    survivors.sort_by_key(|(candidate, _)| candidate.rank());

    let mut suggestions: Vec<SlotSuggestion> = survivors
        .into_iter()
        .take(MAX_SUGGESTIONS)
        .map(|(candidate, capacity)| SlotSuggestion {
            day: candidate.day,
            start_time: candidate.start,
            end_time: candidate.end,
            room_id: candidate.room.to_string(),
            reason: format!(
                "no instructor conflict, room {} free, capacity {} >= {}, {} slot",
                candidate.room,
                capacity,
                request.expected_headcount,
                DayPart::of(candidate.start)
            ),
        })
        .collect();

    let requested_room_fits = rooms
        .iter()
        .find(|room| room.id == request.room_id)
        .is_some_and(|room| room.capacity >= request.expected_headcount);

    if suggestions.len() < MAX_SUGGESTIONS && requested_room_fits {
        let mut same_room: Vec<Candidate<'_>> = grid()
            .map(|(day, start, end)| Candidate {
                day,
                start,
                end,
                room: &request.room_id,
            })
            .filter(|c| !is_requested(c))
            .filter(|c| !suggestions.iter().any(|s| c.same_slot(s)))
            .filter(|c| is_free(c, request.instructor_id, &existing))
            .collect();
        same_room.sort_by_key(|c| c.rank());

        let remaining = MAX_SUGGESTIONS - suggestions.len();
        suggestions.extend(same_room.into_iter().take(remaining).map(|c| SlotSuggestion {
            day: c.day,
            start_time: c.start,
            end_time: c.end,
            room_id: c.room.to_string(),
            reason: format!(
                "same room as requested, no instructor conflict, room {} free, {} slot",
                c.room,
                DayPart::of(c.start)
            ),
        }));
    }

    suggestions
}
