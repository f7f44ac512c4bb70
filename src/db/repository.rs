use std::collections::HashMap;

use chrono::{NaiveTime, Utc};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection};
use uuid::Uuid;

use crate::models::{
    Course, CourseReference, Day, NewCourseRequest, NewRoomRequest, RegistrationSet,
    RegistrationStatus, Room, Session,
};

/// Whether a storage error is a unique-constraint violation.
pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

// ---------------------------------------------------------------------------
// Courses
// ---------------------------------------------------------------------------

async fn attach_prerequisites(
    conn: &mut SqliteConnection,
    courses: &mut [Course],
) -> Result<(), sqlx::Error> {
    if courses.is_empty() {
        return Ok(());
    }

    let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(
        "SELECT course_id, prerequisite_id FROM prerequisites WHERE course_id IN (",
    );
    let mut ids = builder.separated(", ");
    for course in courses.iter() {
        ids.push_bind(course.id.clone());
    }
    ids.push_unseparated(") ORDER BY prerequisite_id");

    let rows: Vec<(String, String)> = builder.build_query_as().fetch_all(&mut *conn).await?;

    let mut by_course: HashMap<String, Vec<String>> = HashMap::new();
    for (course_id, prerequisite_id) in rows {
        by_course.entry(course_id).or_default().push(prerequisite_id);
    }
    for course in courses.iter_mut() {
        course.prerequisites = by_course.get(&course.id).cloned().unwrap_or_default();
    }
    Ok(())
}

pub async fn fetch_courses(conn: &mut SqliteConnection) -> Result<Vec<Course>, sqlx::Error> {
    let mut courses = sqlx::query_as::<_, Course>(
        r#"
        SELECT id, code, name, credits, semester_number, day, start_time, end_time,
               created_at, updated_at
        FROM courses
        ORDER BY code
        "#,
    )
    .fetch_all(&mut *conn)
    .await?;

    attach_prerequisites(conn, &mut courses).await?;
    Ok(courses)
}

pub async fn find_course_by_code(
    conn: &mut SqliteConnection,
    code: &str,
) -> Result<Option<Course>, sqlx::Error> {
    let course = sqlx::query_as::<_, Course>(
        r#"
        SELECT id, code, name, credits, semester_number, day, start_time, end_time,
               created_at, updated_at
        FROM courses
        WHERE code = ?1
        "#,
    )
    .bind(code)
    .fetch_optional(&mut *conn)
    .await?;

    match course {
        Some(course) => {
            let mut courses = [course];
            attach_prerequisites(conn, &mut courses).await?;
            let [course] = courses;
            Ok(Some(course))
        }
        None => Ok(None),
    }
}

pub async fn insert_course(
    conn: &mut SqliteConnection,
    req: &NewCourseRequest,
) -> Result<Course, sqlx::Error> {
    let id = Uuid::new_v4().to_string();
    let now = Utc::now().to_rfc3339();

    sqlx::query(
        r#"
        INSERT INTO courses
            (id, code, name, credits, semester_number, day, start_time, end_time,
             created_at, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)
        "#,
    )
    .bind(&id)
    .bind(&req.code)
    .bind(&req.name)
    .bind(req.credits)
    .bind(req.semester_number)
    .bind(req.day)
    .bind(req.start_time)
    .bind(req.end_time)
    .bind(&now)
    .execute(&mut *conn)
    .await?;

    Ok(Course {
        id,
        code: req.code.clone(),
        name: req.name.clone(),
        credits: req.credits,
        semester_number: req.semester_number,
        day: req.day,
        start_time: req.start_time,
        end_time: req.end_time,
        created_at: now.clone(),
        updated_at: now,
        prerequisites: Vec::new(),
    })
}

pub async fn insert_prerequisite(
    conn: &mut SqliteConnection,
    course_id: &str,
    prerequisite_id: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query("INSERT INTO prerequisites (course_id, prerequisite_id) VALUES (?1, ?2)")
        .bind(course_id)
        .bind(prerequisite_id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

pub async fn update_course_schedule(
    conn: &mut SqliteConnection,
    course_id: &str,
    day: Day,
    start_time: NaiveTime,
    end_time: NaiveTime,
) -> Result<bool, sqlx::Error> {
    let now = Utc::now().to_rfc3339();
    let result = sqlx::query(
        r#"
        UPDATE courses
        SET day = ?1, start_time = ?2, end_time = ?3, updated_at = ?4
        WHERE id = ?5
        "#,
    )
    .bind(day)
    .bind(start_time)
    .bind(end_time)
    .bind(now)
    .bind(course_id)
    .execute(&mut *conn)
    .await?
    .rows_affected();

    Ok(result > 0)
}

// ---------------------------------------------------------------------------
// Registrations
// ---------------------------------------------------------------------------

pub async fn find_registration(
    conn: &mut SqliteConnection,
    student_id: &str,
    semester: &str,
) -> Result<Option<RegistrationSet>, sqlx::Error> {
    sqlx::query_as::<_, RegistrationSet>(
        r#"
        SELECT id, student_id, semester, status, advisor_id, created_at, updated_at
        FROM registration_sets
        WHERE student_id = ?1 AND semester = ?2
        "#,
    )
    .bind(student_id)
    .bind(semester)
    .fetch_optional(&mut *conn)
    .await
}

pub async fn find_registration_by_id(
    conn: &mut SqliteConnection,
    id: &str,
) -> Result<Option<RegistrationSet>, sqlx::Error> {
    sqlx::query_as::<_, RegistrationSet>(
        r#"
        SELECT id, student_id, semester, status, advisor_id, created_at, updated_at
        FROM registration_sets
        WHERE id = ?1
        "#,
    )
    .bind(id)
    .fetch_optional(&mut *conn)
    .await
}

pub async fn fetch_registrations_for_student(
    conn: &mut SqliteConnection,
    student_id: &str,
) -> Result<Vec<RegistrationSet>, sqlx::Error> {
    sqlx::query_as::<_, RegistrationSet>(
        r#"
        SELECT id, student_id, semester, status, advisor_id, created_at, updated_at
        FROM registration_sets
        WHERE student_id = ?1
        ORDER BY semester
        "#,
    )
    .bind(student_id)
    .fetch_all(&mut *conn)
    .await
}

/// Insert a DRAFT registration. Fails with a unique violation if one
/// already exists for the pair.
pub async fn insert_registration(
    conn: &mut SqliteConnection,
    student_id: &str,
    semester: &str,
) -> Result<RegistrationSet, sqlx::Error> {
    let id = Uuid::new_v4().to_string();
    let now = Utc::now().to_rfc3339();
    let status = RegistrationStatus::Draft;

    sqlx::query(
        r#"
        INSERT INTO registration_sets
            (id, student_id, semester, status, advisor_id, created_at, updated_at)
        VALUES (?1, ?2, ?3, ?4, NULL, ?5, ?5)
        "#,
    )
    .bind(&id)
    .bind(student_id)
    .bind(semester)
    .bind(status)
    .bind(&now)
    .execute(&mut *conn)
    .await?;

    Ok(RegistrationSet {
        id,
        student_id: student_id.to_string(),
        semester: semester.to_string(),
        status,
        advisor_id: None,
        created_at: now.clone(),
        updated_at: now,
    })
}

/// Persist status, advisor and update stamp of a registration.
pub async fn update_registration(
    conn: &mut SqliteConnection,
    registration: &RegistrationSet,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE registration_sets
        SET status = ?1, advisor_id = ?2, updated_at = ?3
        WHERE id = ?4
        "#,
    )
    .bind(registration.status)
    .bind(registration.advisor_id)
    .bind(&registration.updated_at)
    .bind(&registration.id)
    .execute(&mut *conn)
    .await?
    .rows_affected();

    Ok(result > 0)
}

/// Send every registration holding `course_id` back to REVISION.
pub async fn mark_revision_for_course(
    conn: &mut SqliteConnection,
    course_id: &str,
) -> Result<u64, sqlx::Error> {
    let now = Utc::now().to_rfc3339();
    let result = sqlx::query(
        r#"
        UPDATE registration_sets
        SET status = ?1, updated_at = ?2
        WHERE id IN (SELECT registration_id FROM registration_courses WHERE course_id = ?3)
        "#,
    )
    .bind(RegistrationStatus::Revision)
    .bind(now)
    .bind(course_id)
    .execute(&mut *conn)
    .await?
    .rows_affected();

    Ok(result)
}

// ---------------------------------------------------------------------------
// Course references
// ---------------------------------------------------------------------------

pub async fn has_course_reference(
    conn: &mut SqliteConnection,
    registration_id: &str,
    course_id: &str,
) -> Result<bool, sqlx::Error> {
    let found: Option<(String,)> = sqlx::query_as(
        "SELECT id FROM registration_courses WHERE registration_id = ?1 AND course_id = ?2",
    )
    .bind(registration_id)
    .bind(course_id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(found.is_some())
}

pub async fn insert_course_reference(
    conn: &mut SqliteConnection,
    registration_id: &str,
    course_id: &str,
) -> Result<CourseReference, sqlx::Error> {
    let id = Uuid::new_v4().to_string();

    sqlx::query(
        "INSERT INTO registration_courses (id, registration_id, course_id) VALUES (?1, ?2, ?3)",
    )
    .bind(&id)
    .bind(registration_id)
    .bind(course_id)
    .execute(&mut *conn)
    .await?;

    Ok(CourseReference {
        id,
        registration_id: registration_id.to_string(),
        course_id: course_id.to_string(),
    })
}

pub async fn delete_course_reference(
    conn: &mut SqliteConnection,
    registration_id: &str,
    course_id: &str,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "DELETE FROM registration_courses WHERE registration_id = ?1 AND course_id = ?2",
    )
    .bind(registration_id)
    .bind(course_id)
    .execute(&mut *conn)
    .await?
    .rows_affected();

    Ok(result > 0)
}

pub async fn count_course_references(
    conn: &mut SqliteConnection,
    registration_id: &str,
) -> Result<i64, sqlx::Error> {
    let (count,): (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM registration_courses WHERE registration_id = ?1")
            .bind(registration_id)
            .fetch_one(&mut *conn)
            .await?;
    Ok(count)
}

/// Courses of a registration, one entry per membership row.
pub async fn fetch_registration_courses(
    conn: &mut SqliteConnection,
    registration_id: &str,
) -> Result<Vec<Course>, sqlx::Error> {
    let mut courses = sqlx::query_as::<_, Course>(
        r#"
        SELECT c.id, c.code, c.name, c.credits, c.semester_number, c.day,
               c.start_time, c.end_time, c.created_at, c.updated_at
        FROM registration_courses rc
        JOIN courses c ON c.id = rc.course_id
        WHERE rc.registration_id = ?1
        ORDER BY c.code
        "#,
    )
    .bind(registration_id)
    .fetch_all(&mut *conn)
    .await?;

    attach_prerequisites(conn, &mut courses).await?;
    Ok(courses)
}

// ---------------------------------------------------------------------------
// Rooms and sessions
// ---------------------------------------------------------------------------

pub async fn fetch_rooms(conn: &mut SqliteConnection) -> Result<Vec<Room>, sqlx::Error> {
    sqlx::query_as::<_, Room>("SELECT id, name, capacity, kind FROM rooms ORDER BY id")
        .fetch_all(&mut *conn)
        .await
}

pub async fn find_room(
    conn: &mut SqliteConnection,
    id: &str,
) -> Result<Option<Room>, sqlx::Error> {
    sqlx::query_as::<_, Room>("SELECT id, name, capacity, kind FROM rooms WHERE id = ?1")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await
}

pub async fn insert_room(
    conn: &mut SqliteConnection,
    req: &NewRoomRequest,
) -> Result<Room, sqlx::Error> {
    sqlx::query("INSERT INTO rooms (id, name, capacity, kind) VALUES (?1, ?2, ?3, ?4)")
        .bind(&req.id)
        .bind(&req.name)
        .bind(req.capacity)
        .bind(&req.kind)
        .execute(&mut *conn)
        .await?;

    Ok(Room {
        id: req.id.clone(),
        name: req.name.clone(),
        capacity: req.capacity,
        kind: req.kind.clone(),
    })
}

pub async fn fetch_sessions(conn: &mut SqliteConnection) -> Result<Vec<Session>, sqlx::Error> {
    sqlx::query_as::<_, Session>(
        r#"
        SELECT id, course_code, instructor_id, room_id, semester, day, start_time, end_time,
               capacity, section, created_at, updated_at
        FROM sessions
        ORDER BY day, start_time
        "#,
    )
    .fetch_all(&mut *conn)
    .await
}

pub async fn find_session(
    conn: &mut SqliteConnection,
    id: &str,
) -> Result<Option<Session>, sqlx::Error> {
    sqlx::query_as::<_, Session>(
        r#"
        SELECT id, course_code, instructor_id, room_id, semester, day, start_time, end_time,
               capacity, section, created_at, updated_at
        FROM sessions
        WHERE id = ?1
        "#,
    )
    .bind(id)
    .fetch_optional(&mut *conn)
    .await
}

pub async fn insert_session(
    conn: &mut SqliteConnection,
    session: &Session,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO sessions
            (id, course_code, instructor_id, room_id, semester, day, start_time, end_time,
             capacity, section, created_at, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
        "#,
    )
    .bind(&session.id)
    .bind(&session.course_code)
    .bind(session.instructor_id)
    .bind(&session.room_id)
    .bind(&session.semester)
    .bind(session.day)
    .bind(session.start_time)
    .bind(session.end_time)
    .bind(session.capacity)
    .bind(&session.section)
    .bind(&session.created_at)
    .bind(&session.updated_at)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

pub async fn update_session(
    conn: &mut SqliteConnection,
    session: &Session,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE sessions
        SET instructor_id = ?1, room_id = ?2, day = ?3, start_time = ?4, end_time = ?5,
            capacity = ?6, section = ?7, updated_at = ?8
        WHERE id = ?9
        "#,
    )
    .bind(session.instructor_id)
    .bind(&session.room_id)
    .bind(session.day)
    .bind(session.start_time)
    .bind(session.end_time)
    .bind(session.capacity)
    .bind(&session.section)
    .bind(&session.updated_at)
    .bind(&session.id)
    .execute(&mut *conn)
    .await?
    .rows_affected();

    Ok(result > 0)
}

pub async fn delete_session(conn: &mut SqliteConnection, id: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM sessions WHERE id = ?1")
        .bind(id)
        .execute(&mut *conn)
        .await?
        .rows_affected();

    Ok(result > 0)
}
