use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use lesson_core::model::{LessonId, PlaybackSettings};
use lesson_core::playback::{
    AutoplayOutcome, LessonSource, MediaEvent, PlaybackEffect, PlaybackInput, PlaybackMachine,
    PlaybackState, PlaybackStatus,
};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::PlaybackError;
use crate::playback::listener::PlaybackListener;
use crate::playback::media::MediaElement;
use crate::playback::writer::ThrottledProgressWriter;
use crate::progress_service::ProgressService;

/// Drives one media element through a lesson playback session.
///
/// Every media event and control call goes through the state machine; the
/// controller only executes the resulting effects. Retry timers are tokio
/// tasks that report back over an internal channel and are aborted whenever
/// the session changes, so nothing from a previous lesson can fire into the
/// next one.
pub struct PlaybackController<M, L>
where
    M: MediaElement,
    L: PlaybackListener,
{
    machine: PlaybackMachine,
    media: M,
    listener: L,
    progress: Arc<ProgressService>,
    writer: ThrottledProgressWriter,
    retry_timers: Vec<JoinHandle<()>>,
    timer_tx: mpsc::UnboundedSender<u64>,
    timer_rx: mpsc::UnboundedReceiver<u64>,
}

impl<M, L> PlaybackController<M, L>
where
    M: MediaElement,
    L: PlaybackListener,
{
    #[must_use]
    pub fn new(
        settings: PlaybackSettings,
        progress: Arc<ProgressService>,
        media: M,
        listener: L,
    ) -> Self {
        let writer = ThrottledProgressWriter::new(Arc::clone(&progress), settings.persist_interval());
        let (timer_tx, timer_rx) = mpsc::unbounded_channel();
        Self {
            machine: PlaybackMachine::new(settings),
            media,
            listener,
            progress,
            writer,
            retry_timers: Vec::new(),
            timer_tx,
            timer_rx,
        }
    }

    #[must_use]
    pub fn state(&self) -> PlaybackState {
        self.machine.state()
    }

    #[must_use]
    pub fn status(&self) -> PlaybackStatus {
        self.machine.status()
    }

    #[must_use]
    pub fn lesson_id(&self) -> Option<&LessonId> {
        self.machine.lesson_id()
    }

    #[must_use]
    pub fn media(&self) -> &M {
        &self.media
    }

    pub fn media_mut(&mut self) -> &mut M {
        &mut self.media
    }

    #[must_use]
    pub fn listener(&self) -> &L {
        &self.listener
    }

    /// True while an automatic reload is scheduled.
    #[must_use]
    pub fn has_pending_retry(&self) -> bool {
        self.retry_timers.iter().any(|h| !h.is_finished())
    }

    /// Start a session for `source`. Loading the media that is already
    /// active is a no-op.
    pub async fn load(&mut self, source: LessonSource) {
        tracing::info!(
            lesson_id = %source.lesson_id,
            video_ref = %source.video_ref,
            "loading lesson"
        );
        self.apply(PlaybackInput::Load(source)).await;
    }

    /// Feed one event reported by the media element.
    pub async fn dispatch(&mut self, event: MediaEvent) {
        let stored_position = match &event {
            MediaEvent::LoadedMetadata { .. } if self.machine.awaiting_metadata() => {
                self.stored_position().await
            }
            MediaEvent::Error { message } => {
                tracing::warn!(
                    lesson_id = ?self.machine.lesson_id(),
                    %message,
                    "media error"
                );
                None
            }
            _ => None,
        };
        self.apply(PlaybackInput::from_media(event, stored_position))
            .await;
    }

    /// User asked to play.
    ///
    /// # Errors
    ///
    /// Returns `PlaybackError::NoSession` if nothing is loaded.
    pub async fn play(&mut self) -> Result<(), PlaybackError> {
        self.require_session()?;
        self.apply(PlaybackInput::PlayRequested).await;
        Ok(())
    }

    /// User asked to pause.
    ///
    /// # Errors
    ///
    /// Returns `PlaybackError::NoSession` if nothing is loaded.
    pub async fn pause(&mut self) -> Result<(), PlaybackError> {
        self.require_session()?;
        self.apply(PlaybackInput::PauseRequested).await;
        Ok(())
    }

    /// User asked to try again after a failure. Resets the retry counter.
    ///
    /// # Errors
    ///
    /// Returns `PlaybackError::NoSession` if nothing is loaded, or
    /// `PlaybackError::NotRetryable` outside the error state.
    pub async fn retry(&mut self) -> Result<(), PlaybackError> {
        self.require_session()?;
        if !matches!(self.machine.state(), PlaybackState::Error { .. }) {
            return Err(PlaybackError::NotRetryable);
        }
        tracing::info!(lesson_id = ?self.machine.lesson_id(), "manual retry");
        self.apply(PlaybackInput::ManualRetry).await;
        Ok(())
    }

    /// End the session, cancelling every pending timer.
    pub async fn teardown(&mut self) {
        if let Some(lesson_id) = self.machine.lesson_id() {
            tracing::info!(%lesson_id, "playback session closed");
        }
        self.apply(PlaybackInput::Teardown).await;
    }

    /// Wait for the next retry timer and apply it. Returns `false` right away
    /// when no timer is pending.
    pub async fn process_next_timer(&mut self) -> bool {
        self.retry_timers.retain(|h| !h.is_finished());
        let epoch = match self.timer_rx.try_recv() {
            Ok(epoch) => epoch,
            Err(_) if self.retry_timers.is_empty() => return false,
            Err(_) => match self.timer_rx.recv().await {
                Some(epoch) => epoch,
                None => return false,
            },
        };
        self.apply(PlaybackInput::RetryTimerFired { epoch }).await;
        true
    }

    /// Process media events and retry timers until `events` closes.
    pub async fn run(&mut self, mut events: mpsc::UnboundedReceiver<MediaEvent>) {
        loop {
            tokio::select! {
                event = events.recv() => match event {
                    Some(event) => self.dispatch(event).await,
                    None => break,
                },
                Some(epoch) = self.timer_rx.recv() => {
                    self.apply(PlaybackInput::RetryTimerFired { epoch }).await;
                }
            }
        }
        tracing::debug!("media event stream closed");
    }

    // ─── Effects ───────────────────────────────────────────────────────────────

    fn require_session(&self) -> Result<(), PlaybackError> {
        if self.machine.source().is_some() {
            Ok(())
        } else {
            Err(PlaybackError::NoSession)
        }
    }

    async fn stored_position(&self) -> Option<f64> {
        let lesson_id = self.machine.lesson_id()?.clone();
        match self.progress.get(&lesson_id).await {
            Ok(entry) => entry.map(|e| e.seconds_watched()),
            Err(err) => {
                tracing::warn!(%lesson_id, error = %err, "could not read resume position");
                None
            }
        }
    }

    async fn apply(&mut self, input: PlaybackInput) {
        let mut queue = VecDeque::from([input]);
        while let Some(input) = queue.pop_front() {
            for effect in self.machine.dispatch(input) {
                if let Some(next) = self.execute(effect).await {
                    queue.push_back(next);
                }
            }
        }
    }

    async fn execute(&mut self, effect: PlaybackEffect) -> Option<PlaybackInput> {
        match effect {
            PlaybackEffect::CancelTimers => self.cancel_timers(),
            PlaybackEffect::LoadSource(video_ref) => {
                tracing::debug!(%video_ref, "loading media");
                self.media.load(&video_ref);
            }
            PlaybackEffect::Seek(seconds) => {
                tracing::debug!(seconds, "seeking to resume position");
                self.media.seek(seconds);
            }
            PlaybackEffect::AttemptAutoplay => {
                let outcome = match self.media.play().await {
                    Ok(()) => AutoplayOutcome::Started,
                    Err(rejected) => {
                        tracing::debug!(reason = %rejected.reason, "autoplay blocked");
                        AutoplayOutcome::Blocked
                    }
                };
                return Some(PlaybackInput::AutoplayResolved(outcome));
            }
            PlaybackEffect::RequestPlay => {
                if let Err(rejected) = self.media.play().await {
                    tracing::debug!(reason = %rejected.reason, "play request rejected");
                }
            }
            PlaybackEffect::RequestPause => self.media.pause(),
            PlaybackEffect::ScheduleRetry {
                epoch,
                attempt,
                delay,
            } => {
                tracing::warn!(
                    lesson_id = ?self.machine.lesson_id(),
                    attempt,
                    max = self.machine.settings().max_retries(),
                    delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    "scheduling media reload"
                );
                self.schedule_retry(epoch, delay);
            }
            PlaybackEffect::ReportProgress {
                current_time,
                duration,
            } => self.listener.on_progress(current_time, duration),
            PlaybackEffect::Persist { seconds, duration } => {
                if let Some(lesson_id) = self.machine.lesson_id().cloned() {
                    self.writer.offer(&lesson_id, seconds, duration).await;
                }
            }
            PlaybackEffect::FlushProgress => self.writer.flush().await,
            PlaybackEffect::NearEnd => {
                tracing::debug!(lesson_id = ?self.machine.lesson_id(), "near end");
                self.listener.on_near_end();
            }
            PlaybackEffect::Ended => {
                tracing::info!(lesson_id = ?self.machine.lesson_id(), "lesson ended");
                self.listener.on_ended();
            }
            PlaybackEffect::StatusChanged(status) => {
                if status.state.is_terminal_error() {
                    tracing::error!(
                        lesson_id = ?self.machine.lesson_id(),
                        message = status.message.as_deref().unwrap_or_default(),
                        "playback failed after automatic retries"
                    );
                } else {
                    tracing::debug!(state = ?status.state, "playback status changed");
                }
                self.listener.on_status(&status);
            }
        }
        None
    }

    fn schedule_retry(&mut self, epoch: u64, delay: Duration) {
        self.retry_timers.retain(|h| !h.is_finished());
        let tx = self.timer_tx.clone();
        self.retry_timers.push(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(epoch);
        }));
    }

    fn cancel_timers(&mut self) {
        for handle in self.retry_timers.drain(..) {
            handle.abort();
        }
        self.writer.cancel();
    }
}

impl<M, L> Drop for PlaybackController<M, L>
where
    M: MediaElement,
    L: PlaybackListener,
{
    fn drop(&mut self) {
        for handle in self.retry_timers.drain(..) {
            handle.abort();
        }
    }
}
