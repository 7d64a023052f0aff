use async_trait::async_trait;
use lesson_core::model::{LessonId, ProgressEntry};
use sqlx::{QueryBuilder, Sqlite};

use crate::repository::{ProgressRepository, StorageError};

use super::SqliteRepository;
use super::mapping::map_progress_row;

fn conn(err: sqlx::Error) -> StorageError {
    StorageError::Connection(err.to_string())
}

#[async_trait]
impl ProgressRepository for SqliteRepository {
    async fn get_progress(
        &self,
        lesson_id: &LessonId,
    ) -> Result<Option<ProgressEntry>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT lesson_id, percent_watched, seconds_watched, completed, last_access
            FROM lesson_progress
            WHERE namespace = ?1 AND lesson_id = ?2
            ",
        )
        .bind(&self.namespace)
        .bind(lesson_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?;

        row.as_ref().map(map_progress_row).transpose()
    }

    async fn get_progress_many(
        &self,
        lesson_ids: &[LessonId],
    ) -> Result<Vec<ProgressEntry>, StorageError> {
        if lesson_ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut builder: QueryBuilder<'_, Sqlite> = QueryBuilder::new(
            "SELECT lesson_id, percent_watched, seconds_watched, completed, last_access \
             FROM lesson_progress WHERE namespace = ",
        );
        builder.push_bind(self.namespace.clone());
        builder.push(" AND lesson_id IN (");
        let mut ids = builder.separated(", ");
        for id in lesson_ids {
            ids.push_bind(id.as_str().to_owned());
        }
        ids.push_unseparated(")");

        let rows = builder
            .build()
            .fetch_all(&self.pool)
            .await
            .map_err(conn)?;
        rows.iter().map(map_progress_row).collect()
    }

    async fn save_progress(&self, entry: &ProgressEntry) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO lesson_progress (
                namespace,
                lesson_id,
                percent_watched,
                seconds_watched,
                completed,
                last_access
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT(namespace, lesson_id) DO UPDATE SET
                percent_watched = excluded.percent_watched,
                seconds_watched = excluded.seconds_watched,
                completed = MAX(lesson_progress.completed, excluded.completed),
                last_access = excluded.last_access
            ",
        )
        .bind(&self.namespace)
        .bind(entry.lesson_id().as_str())
        .bind(i64::from(entry.percent_watched()))
        .bind(entry.seconds_watched())
        .bind(entry.completed())
        .bind(entry.last_access())
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        Ok(())
    }

    async fn recent_progress(&self, limit: u32) -> Result<Vec<ProgressEntry>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT lesson_id, percent_watched, seconds_watched, completed, last_access
            FROM lesson_progress
            WHERE namespace = ?1
            ORDER BY last_access DESC, lesson_id ASC
            LIMIT ?2
            ",
        )
        .bind(&self.namespace)
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        rows.iter().map(map_progress_row).collect()
    }
}
