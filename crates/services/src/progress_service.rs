use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use lesson_core::model::{Area, LessonId, Module, ProgressEntry, rollup_percent};
use storage::repository::ProgressRepository;

use crate::Clock;
use crate::error::ProgressServiceError;

/// Reads and writes per-lesson progress and computes completion rollups.
///
/// Rollups are always derived from the leaf entries at call time; nothing is
/// cached, so a completed lesson shows up in every ancestor immediately.
#[derive(Clone)]
pub struct ProgressService {
    clock: Clock,
    progress: Arc<dyn ProgressRepository>,
}

impl ProgressService {
    #[must_use]
    pub fn new(clock: Clock, progress: Arc<dyn ProgressRepository>) -> Self {
        Self { clock, progress }
    }

    /// Record a watch report for a lesson and return the stored entry.
    ///
    /// Completion is sticky: once a lesson reaches 90 % it stays completed no
    /// matter what later reports say.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::Progress` for non-finite input.
    /// Returns `ProgressServiceError::Storage` if persistence fails.
    pub async fn update(
        &self,
        lesson_id: &LessonId,
        seconds_watched: f64,
        total_duration_seconds: f64,
    ) -> Result<ProgressEntry, ProgressServiceError> {
        let existing = self.progress.get_progress(lesson_id).await?;
        let entry = ProgressEntry::next(
            existing.as_ref(),
            lesson_id.clone(),
            seconds_watched,
            total_duration_seconds,
            self.clock.now(),
        )?;
        self.progress.save_progress(&entry).await?;

        if entry.completed() && !existing.as_ref().is_some_and(ProgressEntry::completed) {
            tracing::info!(lesson_id = %lesson_id, "lesson completed");
        }
        tracing::debug!(
            lesson_id = %lesson_id,
            seconds = entry.seconds_watched(),
            percent = entry.percent_watched(),
            "progress saved"
        );
        Ok(entry)
    }

    /// Fetch the stored entry for a lesson.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::Storage` if repository access fails.
    pub async fn get(
        &self,
        lesson_id: &LessonId,
    ) -> Result<Option<ProgressEntry>, ProgressServiceError> {
        Ok(self.progress.get_progress(lesson_id).await?)
    }

    /// Fetch stored entries for several lessons; lessons without progress are
    /// left out.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::Storage` if repository access fails.
    pub async fn get_many(
        &self,
        lesson_ids: &[LessonId],
    ) -> Result<Vec<ProgressEntry>, ProgressServiceError> {
        Ok(self.progress.get_progress_many(lesson_ids).await?)
    }

    /// Position to resume a lesson from, `0.0` when it was never watched.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::Storage` if repository access fails.
    pub async fn resume_position(&self, lesson_id: &LessonId) -> Result<f64, ProgressServiceError> {
        let entry = self.progress.get_progress(lesson_id).await?;
        Ok(entry.map_or(0.0, |e| e.seconds_watched()))
    }

    /// Percentage of `lesson_ids` that are completed, rounded to the nearest
    /// integer. An empty set rolls up to `0`.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::Storage` if repository access fails.
    pub async fn rollup(&self, lesson_ids: &[LessonId]) -> Result<u8, ProgressServiceError> {
        let unique: HashSet<&LessonId> = lesson_ids.iter().collect();
        if unique.is_empty() {
            return Ok(0);
        }
        let ids: Vec<LessonId> = unique.into_iter().cloned().collect();
        let entries = entries_by_id(self.progress.get_progress_many(&ids).await?);
        Ok(completion_rollup(&ids, &entries))
    }

    /// Completion percentage over a module's lessons.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::Storage` if repository access fails.
    pub async fn module_rollup(&self, module: &Module) -> Result<u8, ProgressServiceError> {
        let ids: Vec<LessonId> = module.lessons().iter().map(|l| l.id().clone()).collect();
        self.rollup(&ids).await
    }

    /// Completion percentage over every lesson of an area.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::Storage` if repository access fails.
    pub async fn area_rollup(&self, area: &Area) -> Result<u8, ProgressServiceError> {
        let ids: Vec<LessonId> = area.lessons().map(|l| l.id().clone()).collect();
        self.rollup(&ids).await
    }

    /// Most recently watched lessons, newest first.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::Storage` if repository access fails.
    pub async fn recent(&self, limit: u32) -> Result<Vec<ProgressEntry>, ProgressServiceError> {
        Ok(self.progress.recent_progress(limit).await?)
    }
}

/// Index entries by lesson id.
#[must_use]
pub fn entries_by_id(entries: Vec<ProgressEntry>) -> HashMap<LessonId, ProgressEntry> {
    entries
        .into_iter()
        .map(|e| (e.lesson_id().clone(), e))
        .collect()
}

/// Completion percentage over the distinct ids in `lesson_ids`. A repeated id
/// counts once; an id without an entry counts as not completed.
#[must_use]
pub fn completion_rollup<'a, I>(lesson_ids: I, entries: &HashMap<LessonId, ProgressEntry>) -> u8
where
    I: IntoIterator<Item = &'a LessonId>,
{
    let unique: HashSet<&LessonId> = lesson_ids.into_iter().collect();
    let completed = unique
        .iter()
        .filter(|id| entries.get(**id).is_some_and(ProgressEntry::completed))
        .count();
    rollup_percent(completed, unique.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    use lesson_core::model::LessonRecord;
    use lesson_core::time::fixed_now;
    use storage::repository::InMemoryRepository;

    fn service() -> ProgressService {
        ProgressService::new(Clock::fixed(fixed_now()), Arc::new(InMemoryRepository::new()))
    }

    fn id(raw: &str) -> LessonId {
        LessonId::new(raw)
    }

    #[tokio::test]
    async fn update_then_get() {
        let svc = service();
        let entry = svc.update(&id("a"), 42.0, 600.0).await.unwrap();
        assert_eq!(entry.percent_watched(), 7);
        assert!(!entry.completed());
        assert_eq!(entry.last_access(), fixed_now());

        let stored = svc.get(&id("a")).await.unwrap().unwrap();
        assert_eq!(stored, entry);
        assert!(svc.get(&id("b")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn completion_is_monotonic() {
        let svc = service();
        assert!(svc.update(&id("a"), 95.0, 100.0).await.unwrap().completed());
        let later = svc.update(&id("a"), 10.0, 100.0).await.unwrap();
        assert!(later.completed());
        assert_eq!(later.percent_watched(), 10);
    }

    #[tokio::test]
    async fn zero_duration_reports_zero_percent() {
        let svc = service();
        let entry = svc.update(&id("a"), 30.0, 0.0).await.unwrap();
        assert_eq!(entry.percent_watched(), 0);
        assert!(!entry.completed());
    }

    #[tokio::test]
    async fn non_finite_report_is_rejected() {
        let svc = service();
        let err = svc.update(&id("a"), f64::NAN, 100.0).await.unwrap_err();
        assert!(matches!(err, ProgressServiceError::Progress(_)));
        assert!(svc.get(&id("a")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn resume_position_defaults_to_zero() {
        let svc = service();
        assert!(svc.resume_position(&id("a")).await.unwrap().abs() < f64::EPSILON);
        svc.update(&id("a"), 42.0, 600.0).await.unwrap();
        assert!((svc.resume_position(&id("a")).await.unwrap() - 42.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn rollups_count_completed_leaves() {
        let svc = service();
        let record = |lesson: &str, module: &str, order: &str| LessonRecord {
            id: id(lesson),
            area: "Civil".into(),
            module: module.into(),
            order_key: order.into(),
            ..LessonRecord::default()
        };
        let tree = lesson_core::build(&[
            record("a", "M1", "1"),
            record("b", "M1", "2"),
            record("c", "M1", "3"),
            record("d", "M2", "4"),
        ]);

        svc.update(&id("a"), 100.0, 100.0).await.unwrap();
        svc.update(&id("b"), 50.0, 100.0).await.unwrap();
        svc.update(&id("d"), 90.0, 100.0).await.unwrap();

        let area = &tree.areas[0];
        assert_eq!(svc.module_rollup(&area.modules()[0]).await.unwrap(), 33);
        assert_eq!(svc.module_rollup(&area.modules()[1]).await.unwrap(), 100);
        assert_eq!(svc.area_rollup(area).await.unwrap(), 50);
        assert_eq!(svc.rollup(&[]).await.unwrap(), 0);
        assert_eq!(svc.rollup(&[id("a"), id("a"), id("c")]).await.unwrap(), 50);
    }

    #[tokio::test]
    async fn recent_lists_newest_first() {
        let repo = Arc::new(InMemoryRepository::new());
        let mut clock = Clock::fixed(fixed_now());
        for lesson in ["a", "b", "c"] {
            let svc = ProgressService::new(clock, repo.clone());
            svc.update(&id(lesson), 10.0, 100.0).await.unwrap();
            clock.advance(chrono::Duration::minutes(1));
        }

        let svc = ProgressService::new(clock, repo);
        let recent = svc.recent(2).await.unwrap();
        let ids: Vec<&str> = recent.iter().map(|e| e.lesson_id().as_str()).collect();
        assert_eq!(ids, vec!["c", "b"]);
    }
}
