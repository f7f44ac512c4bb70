use sqlx::{Connection, SqliteConnection};
use tracing::info;

use crate::db::repository;
use crate::error::AppError;
use crate::models::{Course, NewCourseRequest};

pub async fn list_courses(conn: &mut SqliteConnection) -> Result<Vec<Course>, AppError> {
    Ok(repository::fetch_courses(conn).await?)
}

pub async fn get_course(conn: &mut SqliteConnection, code: &str) -> Result<Course, AppError> {
    repository::find_course_by_code(conn, code)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("course {code} does not exist")))
}

/// Add a course to the catalog. Prerequisites are given by code and must exist.
pub async fn create_course(
    conn: &mut SqliteConnection,
    req: &NewCourseRequest,
) -> Result<Course, AppError> {
    if req.code.trim().is_empty() {
        return Err(AppError::BadRequest("course code must not be empty".to_string()));
    }
    if req.credits <= 0 {
        return Err(AppError::BadRequest(format!(
            "course {} must carry a positive credit load",
            req.code
        )));
    }
    if req.start_time >= req.end_time {
        return Err(AppError::BadRequest(format!(
            "course {} must start before it ends",
            req.code
        )));
    }
    if req.prerequisites.iter().any(|code| *code == req.code) {
        return Err(AppError::BadRequest(format!(
            "course {} cannot be its own prerequisite",
            req.code
        )));
    }

    let mut tx = conn.begin().await?;

    let mut prerequisite_ids = Vec::with_capacity(req.prerequisites.len());
    for code in &req.prerequisites {
        let prerequisite = get_course(&mut tx, code).await?;
        prerequisite_ids.push(prerequisite.id);
    }

    let mut course = match repository::insert_course(&mut tx, req).await {
        Ok(course) => course,
        Err(err) if repository::is_unique_violation(&err) => {
            return Err(AppError::BadRequest(format!(
                "course {} already exists",
                req.code
            )));
        }
        Err(err) => return Err(err.into()),
    };

    prerequisite_ids.sort();
    prerequisite_ids.dedup();
    for prerequisite_id in &prerequisite_ids {
        repository::insert_prerequisite(&mut tx, &course.id, prerequisite_id).await?;
    }
    course.prerequisites = prerequisite_ids;

    tx.commit().await?;
    info!(code = %course.code, credits = course.credits, "course created");
    Ok(course)
}

/// Record that `prerequisite_code` must precede `course_code`.
pub async fn add_prerequisite(
    conn: &mut SqliteConnection,
    course_code: &str,
    prerequisite_code: &str,
) -> Result<Course, AppError> {
    if course_code == prerequisite_code {
        return Err(AppError::BadRequest(format!(
            "course {course_code} cannot be its own prerequisite"
        )));
    }

    let mut tx = conn.begin().await?;
    let course = get_course(&mut tx, course_code).await?;
    let prerequisite = get_course(&mut tx, prerequisite_code).await?;

    match repository::insert_prerequisite(&mut tx, &course.id, &prerequisite.id).await {
        Ok(()) => {}
        Err(err) if repository::is_unique_violation(&err) => {
            return Err(AppError::BadRequest(format!(
                "{prerequisite_code} is already a prerequisite of {course_code}"
            )));
        }
        Err(err) => return Err(err.into()),
    }

    let course = get_course(&mut tx, course_code).await?;
    tx.commit().await?;
    info!(course = course_code, prerequisite = prerequisite_code, "prerequisite added");
    Ok(course)
}

#[cfg(test)]
mod tests {
    use chrono::NaiveTime;
    use sqlx::SqlitePool;
    use sqlx::sqlite::SqlitePoolOptions;

    use super::*;
    use crate::models::Day;

    async fn setup_test_db() -> SqlitePool {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .expect("Failed to create test db");

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .expect("Failed to run migrations");

        pool
    }

    fn request(code: &str, prerequisites: &[&str]) -> NewCourseRequest {
        NewCourseRequest {
            code: code.to_string(),
            name: format!("Course {code}"),
            credits: 3,
            semester_number: 2,
            day: Day::Thursday,
            start_time: NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
            end_time: NaiveTime::from_hms_opt(12, 0, 0).unwrap(),
            prerequisites: prerequisites.iter().map(|c| c.to_string()).collect(),
        }
    }

    #[tokio::test]
    async fn test_create_course_resolves_prerequisite_codes() {
        let pool = setup_test_db().await;
        let mut conn = pool.acquire().await.unwrap();

        let basic = create_course(&mut conn, &request("IF101", &[])).await.unwrap();
        let advanced = create_course(&mut conn, &request("IF201", &["IF101"]))
            .await
            .unwrap();
        assert_eq!(advanced.prerequisites, vec![basic.id]);

        let missing = create_course(&mut conn, &request("IF301", &["IF999"])).await;
        assert!(matches!(missing, Err(AppError::NotFound(_))));
        assert!(get_course(&mut conn, "IF301").await.is_err());
    }

    #[tokio::test]
    async fn test_rejects_bad_courses() {
        let pool = setup_test_db().await;
        let mut conn = pool.acquire().await.unwrap();

        let mut zero = request("IF101", &[]);
        zero.credits = 0;
        assert!(matches!(create_course(&mut conn, &zero).await, Err(AppError::BadRequest(_))));

        let mut backwards = request("IF101", &[]);
        backwards.end_time = NaiveTime::from_hms_opt(9, 0, 0).unwrap();
        assert!(matches!(create_course(&mut conn, &backwards).await, Err(AppError::BadRequest(_))));

        let own = request("IF101", &["IF101"]);
        assert!(matches!(create_course(&mut conn, &own).await, Err(AppError::BadRequest(_))));

        create_course(&mut conn, &request("IF101", &[])).await.unwrap();
        let again = create_course(&mut conn, &request("IF101", &[])).await;
        assert!(matches!(again, Err(AppError::BadRequest(_))));
    }

    #[tokio::test]
    async fn test_add_prerequisite() {
        let pool = setup_test_db().await;
        let mut conn = pool.acquire().await.unwrap();

        let p = create_course(&mut conn, &request("P", &[])).await.unwrap();
        create_course(&mut conn, &request("Q", &[])).await.unwrap();

        let q = add_prerequisite(&mut conn, "Q", "P").await.unwrap();
        assert_eq!(q.prerequisites, vec![p.id]);

        assert!(matches!(
            add_prerequisite(&mut conn, "Q", "P").await,
            Err(AppError::BadRequest(_))
        ));
        assert!(matches!(
            add_prerequisite(&mut conn, "Q", "Q").await,
            Err(AppError::BadRequest(_))
        ));
    }
}
