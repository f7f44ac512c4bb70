//! Storage-backed registration (KRS) operations.
//!
//! Every operation takes the caller's connection, which may already be inside
//! a transaction, and does its own work inside a nested transaction. An error
//! drops that transaction, so a failed call leaves nothing behind.

use chrono::Utc;
use sqlx::{Connection, SqliteConnection};
use tracing::{debug, info, warn};

use crate::db::repository;
use crate::error::AppError;
use crate::krs::{RegistrationAction, RegistrationSnapshot, ValidationOutcome, run_chain, transition};
use crate::models::{Course, CourseReference, RegistrationDetail, RegistrationSet, RegistrationStatus};
use crate::schedule::overlap_window;

fn registration_not_found(student_id: &str, semester: &str) -> AppError {
    AppError::NotFound(format!(
        "no registration for student {student_id} in semester {semester}"
    ))
}

fn course_not_found(course_code: &str) -> AppError {
    AppError::NotFound(format!("course {course_code} does not exist"))
}

async fn load_registration(
    conn: &mut SqliteConnection,
    student_id: &str,
    semester: &str,
) -> Result<RegistrationSet, AppError> {
    repository::find_registration(conn, student_id, semester)
        .await?
        .ok_or_else(|| registration_not_found(student_id, semester))
}

async fn load_course(conn: &mut SqliteConnection, course_code: &str) -> Result<Course, AppError> {
    repository::find_course_by_code(conn, course_code)
        .await?
        .ok_or_else(|| course_not_found(course_code))
}

async fn load_snapshot(
    conn: &mut SqliteConnection,
    registration_id: &str,
) -> Result<RegistrationSnapshot, AppError> {
    let courses = repository::fetch_registration_courses(conn, registration_id).await?;
    Ok(RegistrationSnapshot {
        registration_id: registration_id.to_string(),
        courses,
    })
}

/// The registration for `(student_id, semester)`, created in DRAFT if absent.
pub async fn get_or_create_registration(
    conn: &mut SqliteConnection,
    student_id: &str,
    semester: &str,
) -> Result<RegistrationSet, AppError> {
    if let Some(existing) = repository::find_registration(conn, student_id, semester).await? {
        return Ok(existing);
    }
    create_or_fetch_registration(conn, student_id, semester).await
}

/// Insert a DRAFT registration; if another writer got there first, return theirs.
async fn create_or_fetch_registration(
    conn: &mut SqliteConnection,
    student_id: &str,
    semester: &str,
) -> Result<RegistrationSet, AppError> {
    let mut savepoint = conn.begin().await?;
    match repository::insert_registration(&mut savepoint, student_id, semester).await {
        Ok(created) => {
            savepoint.commit().await?;
            info!(student = student_id, semester, id = %created.id, "registration created");
            Ok(created)
        }
        Err(err) if repository::is_unique_violation(&err) => {
            savepoint.rollback().await?;
            debug!(student = student_id, semester, "registration created concurrently, reloading");
            load_registration(conn, student_id, semester).await
        }
        Err(err) => Err(err.into()),
    }
}

/// Add a course to a student's registration, creating the registration if needed.
///
/// Rejects a course that is already enrolled, and a course whose nominal
/// meeting time overlaps an enrolled course on the same day.
pub async fn add_course(
    conn: &mut SqliteConnection,
    student_id: &str,
    course_code: &str,
    semester: &str,
) -> Result<CourseReference, AppError> {
    let mut tx = conn.begin().await?;

    let course = load_course(&mut tx, course_code).await?;
    let registration = get_or_create_registration(&mut tx, student_id, semester).await?;

    if repository::has_course_reference(&mut tx, &registration.id, &course.id).await? {
        warn!(student = student_id, semester, course = course_code, "course already enrolled");
        return Err(AppError::AlreadyEnrolled {
            course_code: course.code,
        });
    }

    let enrolled = repository::fetch_registration_courses(&mut tx, &registration.id).await?;
    for other in enrolled.iter().filter(|c| c.day == course.day) {
        if let Some((overlap_start, overlap_end)) =
            overlap_window(course.start_time, course.end_time, other.start_time, other.end_time)
        {
            let minutes = overlap_end.signed_duration_since(overlap_start).num_minutes();
            warn!(
                student = student_id,
                semester,
                course = course_code,
                conflicting = %other.code,
                minutes,
                "schedule conflict on add"
            );
            return Err(AppError::ScheduleConflict {
                course_code: course.code.clone(),
                conflicting_course: other.code.clone(),
                day: course.day,
                overlap_start,
                overlap_end,
                minutes,
            });
        }
    }

    let reference = match repository::insert_course_reference(&mut tx, &registration.id, &course.id).await {
        Ok(reference) => reference,
        Err(err) if repository::is_unique_violation(&err) => {
            return Err(AppError::AlreadyEnrolled {
                course_code: course.code,
            });
        }
        Err(err) => return Err(err.into()),
    };

    tx.commit().await?;
    info!(student = student_id, semester, course = course_code, "course added");
    Ok(reference)
}

/// Remove a course from a student's registration. No status guard applies.
pub async fn remove_course(
    conn: &mut SqliteConnection,
    student_id: &str,
    course_code: &str,
    semester: &str,
) -> Result<(), AppError> {
    let mut tx = conn.begin().await?;

    let registration = load_registration(&mut tx, student_id, semester).await?;
    let course = load_course(&mut tx, course_code).await?;

    if !repository::delete_course_reference(&mut tx, &registration.id, &course.id).await? {
        return Err(AppError::NotFound(format!(
            "course {course_code} is not in the registration of student {student_id} for {semester}"
        )));
    }

    tx.commit().await?;
    info!(student = student_id, semester, course = course_code, status = %registration.status, "course removed");
    Ok(())
}

/// Run the validation chain against a registration by id.
pub async fn validate(
    conn: &mut SqliteConnection,
    registration_id: &str,
) -> Result<ValidationOutcome, AppError> {
    if repository::find_registration_by_id(conn, registration_id).await?.is_none() {
        return Err(AppError::NotFound(format!(
            "registration {registration_id} does not exist"
        )));
    }
    let snapshot = load_snapshot(conn, registration_id).await?;
    Ok(run_chain(&snapshot).into())
}

pub async fn validate_for(
    conn: &mut SqliteConnection,
    student_id: &str,
    semester: &str,
) -> Result<ValidationOutcome, AppError> {
    let registration = load_registration(conn, student_id, semester).await?;
    validate(conn, &registration.id).await
}

/// Apply one state-machine action and store the result.
///
/// `check` runs the validation chain before the change is written.
async fn apply(
    conn: &mut SqliteConnection,
    student_id: &str,
    semester: &str,
    action: RegistrationAction,
    check: bool,
    advisor_id: Option<i64>,
) -> Result<RegistrationSet, AppError> {
    let mut tx = conn.begin().await?;

    let mut registration = load_registration(&mut tx, student_id, semester).await?;
    let previous = registration.status;
    let next = transition(previous, action).inspect_err(|err| {
        warn!(student = student_id, semester, "{}", err);
    })?;

    if check {
        let snapshot = load_snapshot(&mut tx, &registration.id).await?;
        if let Err(violation) = run_chain(&snapshot) {
            warn!(
                student = student_id,
                semester,
                rule = ?violation.rule,
                "validation failed: {}",
                violation.message
            );
            return Err(violation.into());
        }
    }

    registration.status = next;
    match action {
        RegistrationAction::Approve => registration.advisor_id = advisor_id,
        RegistrationAction::Unblock => registration.advisor_id = None,
        _ => {}
    }
    registration.updated_at = Utc::now().to_rfc3339();
    repository::update_registration(&mut tx, &registration).await?;

    tx.commit().await?;
    info!(
        student = student_id,
        semester,
        %action,
        from = %previous,
        to = %next,
        "registration transition"
    );
    Ok(registration)
}

/// DRAFT -> SUBMITTED, after the validation chain passes.
pub async fn submit(
    conn: &mut SqliteConnection,
    student_id: &str,
    semester: &str,
) -> Result<RegistrationSet, AppError> {
    apply(conn, student_id, semester, RegistrationAction::Submit, true, None).await
}

/// SUBMITTED -> APPROVED, recording the advisor.
pub async fn approve(
    conn: &mut SqliteConnection,
    student_id: &str,
    semester: &str,
    advisor_id: i64,
) -> Result<RegistrationSet, AppError> {
    apply(
        conn,
        student_id,
        semester,
        RegistrationAction::Approve,
        false,
        Some(advisor_id),
    )
    .await
}

pub async fn reject(
    conn: &mut SqliteConnection,
    student_id: &str,
    semester: &str,
) -> Result<RegistrationSet, AppError> {
    apply(conn, student_id, semester, RegistrationAction::Reject, false, None).await
}

/// REVISION -> SUBMITTED, after the validation chain passes again.
pub async fn resubmit(
    conn: &mut SqliteConnection,
    student_id: &str,
    semester: &str,
) -> Result<RegistrationSet, AppError> {
    apply(conn, student_id, semester, RegistrationAction::Resubmit, true, None).await
}

/// Billing signal: an invoice went overdue. Blocking a blocked set changes nothing.
pub async fn mark_overdue(
    conn: &mut SqliteConnection,
    student_id: &str,
    semester: &str,
) -> Result<RegistrationSet, AppError> {
    let registration = load_registration(conn, student_id, semester).await?;
    if registration.status == RegistrationStatus::Blocked {
        debug!(student = student_id, semester, "registration already blocked");
        return Ok(registration);
    }
    apply(conn, student_id, semester, RegistrationAction::MarkOverdue, false, None).await
}

/// Billing signal: payment received. BLOCKED -> DRAFT, advisor cleared.
pub async fn unblock(
    conn: &mut SqliteConnection,
    student_id: &str,
    semester: &str,
) -> Result<RegistrationSet, AppError> {
    apply(conn, student_id, semester, RegistrationAction::Unblock, false, None).await
}

/// Send every registration holding `course_code` back to REVISION, whatever
/// its current status. Returns how many registrations changed.
pub async fn invalidate_course(
    conn: &mut SqliteConnection,
    course_code: &str,
) -> Result<u64, AppError> {
    let mut tx = conn.begin().await?;
    let course = load_course(&mut tx, course_code).await?;
    let changed = repository::mark_revision_for_course(&mut tx, &course.id).await?;
    tx.commit().await?;

    if changed > 0 {
        info!(course = course_code, changed, "registrations sent back to revision");
    }
    Ok(changed)
}

/// Every registration of a student with its enrolled courses.
pub async fn get_registrations(
    conn: &mut SqliteConnection,
    student_id: &str,
) -> Result<Vec<RegistrationDetail>, AppError> {
    let registrations = repository::fetch_registrations_for_student(conn, student_id).await?;

    let mut details = Vec::with_capacity(registrations.len());
    for registration in registrations {
        let courses = repository::fetch_registration_courses(conn, &registration.id).await?;
        details.push(RegistrationDetail {
            total_credits: courses.iter().map(|c| c.credits).sum(),
            registration,
            courses,
        });
    }
    Ok(details)
}
