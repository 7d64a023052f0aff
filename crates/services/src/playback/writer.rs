use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use lesson_core::model::LessonId;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::progress_service::ProgressService;

#[derive(Debug, Clone)]
struct Sample {
    lesson_id: LessonId,
    seconds: f64,
    duration: f64,
}

#[derive(Default)]
struct WriterState {
    last_write: Option<Instant>,
    /// Latest sample offered inside the current window.
    pending: Option<Sample>,
    trailing: Option<JoinHandle<()>>,
}

fn lock(state: &Mutex<WriterState>) -> MutexGuard<'_, WriterState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Persists playback positions at most once per interval.
///
/// The first sample of a window is written immediately. Later samples in the
/// same window replace each other and the last one is written when the window
/// closes. `cancel` drops whatever is still held.
pub struct ThrottledProgressWriter {
    progress: Arc<ProgressService>,
    interval: Duration,
    state: Arc<Mutex<WriterState>>,
}

impl ThrottledProgressWriter {
    #[must_use]
    pub fn new(progress: Arc<ProgressService>, interval: Duration) -> Self {
        Self {
            progress,
            interval,
            state: Arc::new(Mutex::new(WriterState::default())),
        }
    }

    #[must_use]
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// True while a sample is waiting for its window to close.
    #[must_use]
    pub fn has_pending(&self) -> bool {
        lock(&self.state).pending.is_some()
    }

    /// Offer a position. Failures are logged, never returned.
    pub async fn offer(&self, lesson_id: &LessonId, seconds: f64, duration: f64) {
        let sample = Sample {
            lesson_id: lesson_id.clone(),
            seconds,
            duration,
        };
        let now = Instant::now();

        let immediate = {
            let mut state = lock(&self.state);
            match state.last_write {
                Some(last) if now.duration_since(last) < self.interval => {
                    state.pending = Some(sample);
                    if state.trailing.is_none() {
                        state.trailing = Some(self.spawn_trailing(last + self.interval));
                    }
                    None
                }
                _ => {
                    state.last_write = Some(now);
                    state.pending = None;
                    if let Some(handle) = state.trailing.take() {
                        handle.abort();
                    }
                    Some(sample)
                }
            }
        };

        if let Some(sample) = immediate {
            write(&self.progress, sample).await;
        }
    }

    /// Write the held sample now, if any.
    pub async fn flush(&self) {
        let sample = {
            let mut state = lock(&self.state);
            if let Some(handle) = state.trailing.take() {
                handle.abort();
            }
            let sample = state.pending.take();
            if sample.is_some() {
                state.last_write = Some(Instant::now());
            }
            sample
        };

        if let Some(sample) = sample {
            write(&self.progress, sample).await;
        }
    }

    /// Drop the held sample and abort the trailing write. The next offer
    /// starts a fresh window.
    pub fn cancel(&self) {
        let mut state = lock(&self.state);
        if let Some(handle) = state.trailing.take() {
            handle.abort();
        }
        state.pending = None;
        state.last_write = None;
    }

    fn spawn_trailing(&self, deadline: Instant) -> JoinHandle<()> {
        let state = Arc::clone(&self.state);
        let progress = Arc::clone(&self.progress);
        tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;
            let sample = {
                let mut state = lock(&state);
                state.trailing = None;
                let sample = state.pending.take();
                if sample.is_some() {
                    state.last_write = Some(Instant::now());
                }
                sample
            };
            if let Some(sample) = sample {
                write(&progress, sample).await;
            }
        })
    }
}

impl Drop for ThrottledProgressWriter {
    fn drop(&mut self) {
        self.cancel();
    }
}

async fn write(progress: &ProgressService, sample: Sample) {
    if let Err(err) = progress
        .update(&sample.lesson_id, sample.seconds, sample.duration)
        .await
    {
        tracing::warn!(
            lesson_id = %sample.lesson_id,
            seconds = sample.seconds,
            error = %err,
            "failed to persist playback progress"
        );
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use lesson_core::model::ProgressEntry;
    use lesson_core::time::fixed_clock;
    use storage::repository::{InMemoryRepository, ProgressRepository, StorageError};

    use super::*;

    /// Counts saves on top of the in-memory store.
    #[derive(Default)]
    struct CountingRepo {
        inner: InMemoryRepository,
        saves: AtomicUsize,
    }

    #[async_trait]
    impl ProgressRepository for CountingRepo {
        async fn get_progress(
            &self,
            lesson_id: &LessonId,
        ) -> Result<Option<ProgressEntry>, StorageError> {
            self.inner.get_progress(lesson_id).await
        }

        async fn get_progress_many(
            &self,
            lesson_ids: &[LessonId],
        ) -> Result<Vec<ProgressEntry>, StorageError> {
            self.inner.get_progress_many(lesson_ids).await
        }

        async fn save_progress(&self, entry: &ProgressEntry) -> Result<(), StorageError> {
            self.saves.fetch_add(1, Ordering::SeqCst);
            self.inner.save_progress(entry).await
        }

        async fn recent_progress(&self, limit: u32) -> Result<Vec<ProgressEntry>, StorageError> {
            self.inner.recent_progress(limit).await
        }
    }

    fn fixture() -> (ThrottledProgressWriter, Arc<CountingRepo>, Arc<ProgressService>) {
        let repo = Arc::new(CountingRepo::default());
        let progress = Arc::new(ProgressService::new(fixed_clock(), repo.clone()));
        let writer = ThrottledProgressWriter::new(Arc::clone(&progress), Duration::from_secs(2));
        (writer, repo, progress)
    }

    async fn stored_seconds(progress: &ProgressService) -> Option<f64> {
        progress
            .get(&LessonId::new("l-1"))
            .await
            .unwrap()
            .map(|e| e.seconds_watched())
    }

    #[tokio::test(start_paused = true)]
    async fn leading_edge_then_trailing_write() {
        let (writer, repo, progress) = fixture();
        let id = LessonId::new("l-1");

        writer.offer(&id, 6.0, 600.0).await;
        assert_eq!(stored_seconds(&progress).await, Some(6.0));

        tokio::time::sleep(Duration::from_millis(500)).await;
        writer.offer(&id, 7.0, 600.0).await;
        writer.offer(&id, 8.0, 600.0).await;
        assert_eq!(stored_seconds(&progress).await, Some(6.0));
        assert!(writer.has_pending());

        tokio::time::sleep(Duration::from_millis(1_600)).await;
        assert_eq!(stored_seconds(&progress).await, Some(8.0));
        assert!(!writer.has_pending());
        assert_eq!(repo.saves.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn at_most_one_write_per_window() {
        let (writer, repo, _) = fixture();
        let id = LessonId::new("l-1");

        // Samples every 250ms for 4s of playback.
        for step in 0..16_u32 {
            writer.offer(&id, 6.0 + f64::from(step) * 0.25, 600.0).await;
            tokio::time::sleep(Duration::from_millis(250)).await;
        }
        tokio::time::sleep(Duration::from_secs(3)).await;

        let saves = repo.saves.load(Ordering::SeqCst);
        assert!((2..=3).contains(&saves), "saves = {saves}");
    }

    #[tokio::test(start_paused = true)]
    async fn flush_writes_held_sample() {
        let (writer, repo, progress) = fixture();
        let id = LessonId::new("l-1");

        writer.offer(&id, 6.0, 600.0).await;
        writer.offer(&id, 9.0, 600.0).await;
        writer.flush().await;
        assert_eq!(stored_seconds(&progress).await, Some(9.0));

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(repo.saves.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_drops_held_sample() {
        let (writer, repo, progress) = fixture();
        let id = LessonId::new("l-1");

        writer.offer(&id, 6.0, 600.0).await;
        writer.offer(&id, 9.0, 600.0).await;
        writer.cancel();

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(stored_seconds(&progress).await, Some(6.0));
        assert_eq!(repo.saves.load(Ordering::SeqCst), 1);

        // A fresh window writes immediately again.
        writer.offer(&id, 10.0, 600.0).await;
        assert_eq!(stored_seconds(&progress).await, Some(10.0));
    }
}
