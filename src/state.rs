use std::sync::Arc;

use sqlx::SqlitePool;

use crate::services::ScheduleSubject;

#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub schedule: Arc<ScheduleSubject>,
}

impl AppState {
    pub fn new(db: SqlitePool) -> Self {
        Self {
            db,
            schedule: Arc::new(ScheduleSubject::with_default_observers()),
        }
    }
}
