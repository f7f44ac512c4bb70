//! Submission checks for a registration.
//!
//! The chain runs in a fixed order and stops at the first failure:
//!
//! 1. credit load (non-empty, at most [`MAX_CREDITS`])
//! 2. no prerequisite enrolled alongside the course that needs it
//! 3. no course enrolled twice
//! 4. no two courses meeting at the same time on the same day
//!
//! Rules are plain functions over a [`RegistrationSnapshot`] loaded once by
//! the caller. The prerequisite rule only looks inside the snapshot; it does
//! not know which courses the student already passed.

use std::collections::{HashMap, HashSet};

use serde::Serialize;
use thiserror::Error;

use crate::models::Course;
use crate::schedule::overlapping_pairs;

pub const MAX_CREDITS: i64 = 24;

/// Enrolled courses of one registration, with prerequisites attached.
///
/// `courses` holds one entry per membership row, so a duplicated row shows
/// up twice.
#[derive(Debug, Clone)]
pub struct RegistrationSnapshot {
    pub registration_id: String,
    pub courses: Vec<Course>,
}

impl RegistrationSnapshot {
    pub fn total_credits(&self) -> i64 {
        self.courses.iter().map(|c| c.credits).sum()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Rule {
    CreditLoad,
    Prerequisite,
    Duplicate,
    ScheduleConflict,
}

#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("{message}")]
pub struct Violation {
    pub rule: Rule,
    pub message: String,
}

impl Violation {
    fn new(rule: Rule, message: impl Into<String>) -> Self {
        Self {
            rule,
            message: message.into(),
        }
    }
}

type RuleFn = fn(&RegistrationSnapshot) -> Result<String, Violation>;

const CHAIN: [RuleFn; 4] = [
    check_credit_load,
    check_prerequisites,
    check_duplicates,
    check_schedule,
];

/// Run every rule in order. On success returns the last rule's message.
pub fn run_chain(snapshot: &RegistrationSnapshot) -> Result<String, Violation> {
    let mut message = String::new();
    for rule in CHAIN {
        message = rule(snapshot)?;
    }
    Ok(message)
}

/// `(ok, message)` view of a chain run, as reported to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationOutcome {
    pub ok: bool,
    pub rule: Option<Rule>,
    pub message: String,
}

impl From<Result<String, Violation>> for ValidationOutcome {
    fn from(result: Result<String, Violation>) -> Self {
        match result {
            Ok(message) => Self {
                ok: true,
                rule: None,
                message,
            },
            Err(violation) => Self {
                ok: false,
                rule: Some(violation.rule),
                message: violation.message,
            },
        }
    }
}

fn check_credit_load(snapshot: &RegistrationSnapshot) -> Result<String, Violation> {
    if snapshot.courses.is_empty() {
        return Err(Violation::new(
            Rule::CreditLoad,
            "registration has no courses",
        ));
    }

    let total = snapshot.total_credits();
    if total > MAX_CREDITS {
        return Err(Violation::new(
            Rule::CreditLoad,
            format!("total credit load {total} exceeds the maximum of {MAX_CREDITS}"),
        ));
    }
    Ok(format!("total credit load {total} is within the limit"))
}

fn check_prerequisites(snapshot: &RegistrationSnapshot) -> Result<String, Violation> {
    let enrolled: HashMap<&str, &Course> = snapshot
        .courses
        .iter()
        .map(|c| (c.id.as_str(), c))
        .collect();

    for course in &snapshot.courses {
        for prerequisite_id in &course.prerequisites {
            if let Some(prerequisite) = enrolled.get(prerequisite_id.as_str()) {
                return Err(Violation::new(
                    Rule::Prerequisite,
                    format!(
                        "course {} ({}) has prerequisite {} ({}) enrolled in the same registration",
                        course.code, course.name, prerequisite.code, prerequisite.name
                    ),
                ));
            }
        }
    }
    Ok("no prerequisite is taken together with its course".to_string())
}

fn check_duplicates(snapshot: &RegistrationSnapshot) -> Result<String, Violation> {
    let mut seen = HashSet::new();
    for course in &snapshot.courses {
        if !seen.insert(course.id.as_str()) {
            return Err(Violation::new(
                Rule::Duplicate,
                format!(
                    "course {} ({}) is enrolled more than once",
                    course.code, course.name
                ),
            ));
        }
    }
    Ok("no duplicate courses".to_string())
}

fn check_schedule(snapshot: &RegistrationSnapshot) -> Result<String, Violation> {
    if let Some((a, b)) = overlapping_pairs(&snapshot.courses).first() {
        return Err(Violation::new(
            Rule::ScheduleConflict,
            format!(
                "schedule conflict between {} ({}) and {} ({}) on {}",
                a.code, a.name, b.code, b.name, a.day
            ),
        ));
    }
    Ok(format!(
        "total credit load {}, no schedule conflicts",
        snapshot.total_credits()
    ))
}

#[cfg(test)]
mod tests {
    use chrono::NaiveTime;

    use super::*;
    use crate::models::Day;

    fn course(code: &str, credits: i64, day: Day, start: u32, end: u32) -> Course {
        Course {
            id: format!("id-{code}"),
            code: code.to_string(),
            name: format!("Course {code}"),
            credits,
            semester_number: 1,
            day,
            start_time: NaiveTime::from_hms_opt(start, 0, 0).unwrap(),
            end_time: NaiveTime::from_hms_opt(end, 0, 0).unwrap(),
            created_at: String::new(),
            updated_at: String::new(),
            prerequisites: Vec::new(),
        }
    }

    fn snapshot(courses: Vec<Course>) -> RegistrationSnapshot {
        RegistrationSnapshot {
            registration_id: "krs-1".to_string(),
            courses,
        }
    }

    #[test]
    fn valid_registration_reports_total() {
        let s = snapshot(vec![
            course("A", 3, Day::Monday, 8, 10),
            course("B", 4, Day::Monday, 10, 12),
        ]);
        let message = run_chain(&s).unwrap();
        assert_eq!(message, "total credit load 7, no schedule conflicts");
    }

    #[test]
    fn empty_registration_fails() {
        let err = run_chain(&snapshot(Vec::new())).unwrap_err();
        assert_eq!(err.rule, Rule::CreditLoad);
    }

    #[test]
    fn credit_overload_names_total_and_cap() {
        let mut courses: Vec<Course> = Day::TEACHING_DAYS
            .iter()
            .enumerate()
            .map(|(i, day)| course(&format!("K{i}"), 4, *day, 8, 10))
            .collect();
        courses.push(course("K6", 4, Day::Monday, 10, 12));
        let err = run_chain(&snapshot(courses)).unwrap_err();
        assert_eq!(err.rule, Rule::CreditLoad);
        assert!(err.message.contains("28"));
        assert!(err.message.contains("24"));
    }

    #[test]
    fn exactly_at_cap_passes() {
        let courses = Day::TEACHING_DAYS
            .iter()
            .enumerate()
            .map(|(i, day)| course(&format!("K{i}"), 4, *day, 8, 10))
            .collect();
        assert!(run_chain(&snapshot(courses)).is_ok());
    }

    #[test]
    fn co_enrolled_prerequisite_fails() {
        let p = course("P", 3, Day::Monday, 8, 10);
        let mut q = course("Q", 3, Day::Tuesday, 8, 10);
        q.prerequisites.push(p.id.clone());

        let err = run_chain(&snapshot(vec![p, q])).unwrap_err();
        assert_eq!(err.rule, Rule::Prerequisite);
        assert!(err.message.contains("P"));
        assert!(err.message.contains("Q"));
    }

    #[test]
    fn prerequisite_outside_registration_is_ignored() {
        let mut q = course("Q", 3, Day::Tuesday, 8, 10);
        q.prerequisites.push("id-elsewhere".to_string());
        assert!(run_chain(&snapshot(vec![q])).is_ok());
    }

    #[test]
    fn duplicate_membership_fails_before_schedule() {
        let a = course("A", 3, Day::Monday, 8, 10);
        let err = run_chain(&snapshot(vec![a.clone(), a])).unwrap_err();
        assert_eq!(err.rule, Rule::Duplicate);
    }

    #[test]
    fn overlapping_courses_fail() {
        let s = snapshot(vec![
            course("A", 3, Day::Monday, 8, 10),
            course("C", 3, Day::Monday, 9, 11),
        ]);
        let err = run_chain(&s).unwrap_err();
        assert_eq!(err.rule, Rule::ScheduleConflict);
        assert!(err.message.contains("A"));
        assert!(err.message.contains("C"));
        assert!(err.message.contains("monday"));
    }

    #[test]
    fn credit_check_runs_first() {
        // Overloaded and conflicting: the credit rule reports.
        let courses = (0..7)
            .map(|i| course(&format!("K{i}"), 4, Day::Monday, 8, 10))
            .collect();
        let err = run_chain(&snapshot(courses)).unwrap_err();
        assert_eq!(err.rule, Rule::CreditLoad);
    }

    #[test]
    fn outcome_view() {
        let outcome = ValidationOutcome::from(run_chain(&snapshot(Vec::new())));
        assert!(!outcome.ok);
        assert_eq!(outcome.rule, Some(Rule::CreditLoad));
    }
}
