use lesson_core::model::{LessonId, ProgressEntry};
use sqlx::Row;

use crate::repository::StorageError;

fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

pub(crate) fn map_progress_row(row: &sqlx::sqlite::SqliteRow) -> Result<ProgressEntry, StorageError> {
    let lesson_id: String = row.try_get("lesson_id").map_err(ser)?;
    let percent_watched: i64 = row.try_get("percent_watched").map_err(ser)?;
    let seconds_watched: f64 = row.try_get("seconds_watched").map_err(ser)?;
    let completed: bool = row.try_get("completed").map_err(ser)?;
    let last_access: chrono::DateTime<chrono::Utc> = row.try_get("last_access").map_err(ser)?;

    ProgressEntry::from_persisted(
        LessonId::new(lesson_id),
        percent_watched,
        seconds_watched,
        completed,
        last_access,
    )
    .map_err(ser)
}
