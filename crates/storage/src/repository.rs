use async_trait::async_trait;
use lesson_core::model::{LessonId, ProgressEntry};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Repository contract for per-lesson watch progress.
///
/// One entry per lesson id. Adapters never un-complete a lesson: saving an
/// entry with `completed == false` over a completed one keeps the flag set,
/// so out-of-order writes cannot undo completion.
#[async_trait]
pub trait ProgressRepository: Send + Sync {
    /// Fetch the entry for a lesson, if any.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be read.
    async fn get_progress(&self, lesson_id: &LessonId)
    -> Result<Option<ProgressEntry>, StorageError>;

    /// Fetch entries for several lessons. Missing lessons are skipped.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be read.
    async fn get_progress_many(
        &self,
        lesson_ids: &[LessonId],
    ) -> Result<Vec<ProgressEntry>, StorageError>;

    /// Insert or replace the entry for `entry.lesson_id()`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the entry cannot be stored.
    async fn save_progress(&self, entry: &ProgressEntry) -> Result<(), StorageError>;

    /// Most recently accessed entries, newest first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be read.
    async fn recent_progress(&self, limit: u32) -> Result<Vec<ProgressEntry>, StorageError>;
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    progress: Arc<Mutex<HashMap<LessonId, ProgressEntry>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self {
            progress: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Number of stored entries.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Connection` if the lock is poisoned.
    pub fn len(&self) -> Result<usize, StorageError> {
        let guard = self
            .progress
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.len())
    }
}

#[async_trait]
impl ProgressRepository for InMemoryRepository {
    async fn get_progress(
        &self,
        lesson_id: &LessonId,
    ) -> Result<Option<ProgressEntry>, StorageError> {
        let guard = self
            .progress
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.get(lesson_id).cloned())
    }

    async fn get_progress_many(
        &self,
        lesson_ids: &[LessonId],
    ) -> Result<Vec<ProgressEntry>, StorageError> {
        let guard = self
            .progress
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(lesson_ids
            .iter()
            .filter_map(|id| guard.get(id).cloned())
            .collect())
    }

    async fn save_progress(&self, entry: &ProgressEntry) -> Result<(), StorageError> {
        let mut guard = self
            .progress
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let already_completed = guard
            .get(entry.lesson_id())
            .is_some_and(ProgressEntry::completed);
        let stored = if already_completed && !entry.completed() {
            ProgressEntry::from_persisted(
                entry.lesson_id().clone(),
                i64::from(entry.percent_watched()),
                entry.seconds_watched(),
                true,
                entry.last_access(),
            )
            .map_err(|e| StorageError::Serialization(e.to_string()))?
        } else {
            entry.clone()
        };
        guard.insert(entry.lesson_id().clone(), stored);
        Ok(())
    }

    async fn recent_progress(&self, limit: u32) -> Result<Vec<ProgressEntry>, StorageError> {
        let guard = self
            .progress
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let mut entries: Vec<ProgressEntry> = guard.values().cloned().collect();
        entries.sort_by(|a, b| {
            b.last_access()
                .cmp(&a.last_access())
                .then_with(|| a.lesson_id().cmp(b.lesson_id()))
        });
        entries.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
        Ok(entries)
    }
}

/// Progress repository behind a trait object for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub progress: Arc<dyn ProgressRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let progress: Arc<dyn ProgressRepository> = Arc::new(InMemoryRepository::new());
        Self { progress }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use lesson_core::time::fixed_now;

    fn entry(id: &str, seconds: f64, completed_before: Option<&ProgressEntry>) -> ProgressEntry {
        ProgressEntry::next(completed_before, LessonId::new(id), seconds, 100.0, fixed_now())
            .unwrap()
    }

    #[tokio::test]
    async fn round_trips_entry() {
        let repo = InMemoryRepository::new();
        let saved = entry("a", 42.0, None);
        repo.save_progress(&saved).await.unwrap();

        let fetched = repo.get_progress(&LessonId::new("a")).await.unwrap();
        assert_eq!(fetched, Some(saved));
        assert!(repo
            .get_progress(&LessonId::new("missing"))
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn save_keeps_completion_sticky() {
        let repo = InMemoryRepository::new();
        repo.save_progress(&entry("a", 95.0, None)).await.unwrap();
        // An out-of-order write computed without knowledge of completion.
        repo.save_progress(&entry("a", 20.0, None)).await.unwrap();

        let fetched = repo
            .get_progress(&LessonId::new("a"))
            .await
            .unwrap()
            .unwrap();
        assert!(fetched.completed());
        assert_eq!(fetched.percent_watched(), 20);
    }

    #[tokio::test]
    async fn get_many_skips_missing() {
        let repo = InMemoryRepository::new();
        repo.save_progress(&entry("a", 10.0, None)).await.unwrap();
        repo.save_progress(&entry("b", 20.0, None)).await.unwrap();

        let ids = [LessonId::new("a"), LessonId::new("x"), LessonId::new("b")];
        let found = repo.get_progress_many(&ids).await.unwrap();
        assert_eq!(found.len(), 2);
        assert_eq!(repo.len().unwrap(), 2);
    }

    #[tokio::test]
    async fn recent_orders_by_last_access() {
        let repo = InMemoryRepository::new();
        for (i, id) in ["a", "b", "c"].iter().enumerate() {
            let at = fixed_now() + Duration::minutes(i64::try_from(i).unwrap());
            let e = ProgressEntry::next(None, LessonId::new(*id), 10.0, 100.0, at).unwrap();
            repo.save_progress(&e).await.unwrap();
        }

        let recent = repo.recent_progress(2).await.unwrap();
        let ids: Vec<&str> = recent.iter().map(|e| e.lesson_id().as_str()).collect();
        assert_eq!(ids, vec!["c", "b"]);
    }
}
