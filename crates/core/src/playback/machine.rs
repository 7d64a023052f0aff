use crate::model::{LessonId, PlaybackSettings};
use crate::playback::effect::PlaybackEffect;
use crate::playback::input::{AutoplayOutcome, LessonSource, PlaybackInput};
use crate::playback::state::{MediaErrorKind, PlaybackState, PlaybackStatus, RetryStatus};

//
// ─── SESSION ───────────────────────────────────────────────────────────────────
//

/// Per-session flags. Dropped and rebuilt whenever the source changes, so
/// nothing leaks from one lesson into the next.
#[derive(Debug, Clone)]
struct Session {
    source: LessonSource,
    autoplay_attempted: bool,
    autoplay_pending: bool,
    attempt: u32,
    near_end_fired: bool,
    errored: bool,
    /// Number of `LoadSource` effects issued in this session.
    loads: u32,
    last_position: f64,
    high_water: f64,
}

impl Session {
    fn new(source: LessonSource) -> Self {
        Self {
            source,
            autoplay_attempted: false,
            autoplay_pending: false,
            attempt: 0,
            near_end_fired: false,
            errored: false,
            loads: 0,
            last_position: 0.0,
            high_water: 0.0,
        }
    }

    /// A reload after playback had started resumes from the last observed
    /// position instead of the persisted one.
    fn resumes_in_session(&self) -> bool {
        self.loads > 1 && self.last_position > 0.0
    }
}

//
// ─── MACHINE ───────────────────────────────────────────────────────────────────
//

/// Playback state machine for a single active media session.
#[derive(Debug, Clone)]
pub struct PlaybackMachine {
    settings: PlaybackSettings,
    state: PlaybackState,
    session: Option<Session>,
    /// Bumped whenever pending timers are cancelled; timer firings carrying an
    /// older epoch are stale.
    epoch: u64,
    buffering: bool,
    last_status: PlaybackStatus,
}

impl PlaybackMachine {
    #[must_use]
    pub fn new(settings: PlaybackSettings) -> Self {
        Self {
            settings,
            state: PlaybackState::Idle,
            session: None,
            epoch: 0,
            buffering: false,
            last_status: PlaybackStatus::idle(),
        }
    }

    #[must_use]
    pub fn settings(&self) -> &PlaybackSettings {
        &self.settings
    }

    #[must_use]
    pub fn state(&self) -> PlaybackState {
        self.state
    }

    #[must_use]
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    #[must_use]
    pub fn source(&self) -> Option<&LessonSource> {
        self.session.as_ref().map(|s| &s.source)
    }

    #[must_use]
    pub fn lesson_id(&self) -> Option<&LessonId> {
        self.source().map(|s| &s.lesson_id)
    }

    /// Current retry attempt counter (0 when no error happened).
    #[must_use]
    pub fn attempt(&self) -> u32 {
        self.session.as_ref().map_or(0, |s| s.attempt)
    }

    /// True when the next metadata event will fall back to the persisted
    /// position for its resume seek.
    #[must_use]
    pub fn awaiting_metadata(&self) -> bool {
        self.state == PlaybackState::Loading
            && self.session.as_ref().is_some_and(|s| {
                s.source.initial_time.is_none() && !s.resumes_in_session()
            })
    }

    /// Highest position observed in this session.
    #[must_use]
    pub fn high_water(&self) -> f64 {
        self.session.as_ref().map_or(0.0, |s| s.high_water)
    }

    #[must_use]
    pub fn near_end_fired(&self) -> bool {
        self.session.as_ref().is_some_and(|s| s.near_end_fired)
    }

    #[must_use]
    pub fn had_error(&self) -> bool {
        self.session.as_ref().is_some_and(|s| s.errored)
    }

    /// Snapshot of what the UI should show.
    #[must_use]
    pub fn status(&self) -> PlaybackStatus {
        let max = self.settings.max_retries();
        let autoplay_pending = self.session.as_ref().is_some_and(|s| s.autoplay_pending);
        let (retry, message, can_retry) = match self.state {
            PlaybackState::Error {
                attempt,
                terminal: false,
                ..
            } => (
                Some(RetryStatus { attempt, max }),
                Some(format!("Retrying… (attempt {attempt} of {max})")),
                false,
            ),
            PlaybackState::Error {
                kind,
                terminal: true,
                ..
            } => (None, Some(fatal_message(kind)), true),
            _ => (None, None, false),
        };

        PlaybackStatus {
            state: self.state,
            loading: self.state == PlaybackState::Loading
                || (self.buffering && self.state.is_active()),
            controls_visible: match self.state {
                PlaybackState::Ready => !autoplay_pending,
                PlaybackState::Paused | PlaybackState::Ended => true,
                _ => false,
            },
            retry,
            message,
            can_retry,
        }
    }

    /// Apply one input and return the effects to execute, in order.
    ///
    /// Inputs that do not apply to the current state are ignored, which makes
    /// duplicate media events harmless.
    pub fn dispatch(&mut self, input: PlaybackInput) -> Vec<PlaybackEffect> {
        let mut effects = Vec::new();
        match input {
            PlaybackInput::Load(source) => self.on_load(source, &mut effects),
            PlaybackInput::MetadataLoaded {
                duration,
                stored_position,
            } => self.on_metadata(duration, stored_position, &mut effects),
            PlaybackInput::CanPlay => self.buffering = false,
            PlaybackInput::Waiting => {
                if self.state.is_active() {
                    self.buffering = true;
                }
            }
            PlaybackInput::TimeUpdate {
                current_time,
                duration,
            } => self.on_time_update(current_time, duration, &mut effects),
            PlaybackInput::MediaError { .. } => self.on_error(&mut effects),
            PlaybackInput::Ended => self.on_ended(&mut effects),
            PlaybackInput::Played => self.on_played(),
            PlaybackInput::Paused => {
                if self.state == PlaybackState::Playing {
                    self.state = PlaybackState::Paused;
                    effects.push(PlaybackEffect::FlushProgress);
                }
            }
            PlaybackInput::PlayRequested => {
                if matches!(
                    self.state,
                    PlaybackState::Ready | PlaybackState::Paused | PlaybackState::Ended
                ) {
                    effects.push(PlaybackEffect::RequestPlay);
                }
            }
            PlaybackInput::PauseRequested => {
                if self.state == PlaybackState::Playing {
                    effects.push(PlaybackEffect::RequestPause);
                }
            }
            PlaybackInput::AutoplayResolved(outcome) => self.on_autoplay(outcome),
            PlaybackInput::RetryTimerFired { epoch } => self.on_retry_timer(epoch, &mut effects),
            PlaybackInput::ManualRetry => self.on_manual_retry(&mut effects),
            PlaybackInput::Teardown => self.on_teardown(&mut effects),
        }

        let status = self.status();
        if status != self.last_status {
            self.last_status = status.clone();
            effects.push(PlaybackEffect::StatusChanged(status));
        }
        effects
    }

    // ─── Transitions ───────────────────────────────────────────────────────────

    fn cancel_timers(&mut self, effects: &mut Vec<PlaybackEffect>) {
        self.epoch = self.epoch.wrapping_add(1);
        effects.push(PlaybackEffect::CancelTimers);
    }

    fn reload(&mut self, effects: &mut Vec<PlaybackEffect>) {
        self.state = PlaybackState::Loading;
        self.buffering = false;
        if let Some(session) = self.session.as_mut() {
            session.loads += 1;
            effects.push(PlaybackEffect::LoadSource(session.source.video_ref.clone()));
        }
    }

    fn on_load(&mut self, source: LessonSource, effects: &mut Vec<PlaybackEffect>) {
        let unchanged = self.state != PlaybackState::Idle
            && self
                .session
                .as_ref()
                .is_some_and(|s| s.source.same_media(&source));
        if unchanged {
            return;
        }

        self.cancel_timers(effects);
        self.session = Some(Session::new(source));
        self.reload(effects);
    }

    fn on_teardown(&mut self, effects: &mut Vec<PlaybackEffect>) {
        if self.session.is_none() && self.state == PlaybackState::Idle {
            return;
        }
        self.cancel_timers(effects);
        self.session = None;
        self.buffering = false;
        self.state = PlaybackState::Idle;
    }

    fn on_metadata(
        &mut self,
        duration: f64,
        stored_position: Option<f64>,
        effects: &mut Vec<PlaybackEffect>,
    ) {
        if self.state != PlaybackState::Loading {
            return;
        }
        let default_autoplay = self.settings.autoplay();
        let Some(session) = self.session.as_mut() else {
            return;
        };

        self.state = PlaybackState::Ready;

        // After an automatic or manual reload, pick up where the failed load left off.
        let target = if session.resumes_in_session() {
            Some(session.last_position)
        } else {
            session.source.initial_time.or(stored_position)
        };
        if let Some(target) = target.filter(|t| t.is_finite() && *t > 0.0) {
            let target = if duration.is_finite() && duration > 0.0 {
                target.min(duration)
            } else {
                target
            };
            effects.push(PlaybackEffect::Seek(target));
        }

        let wants_autoplay = session.source.autoplay.unwrap_or(default_autoplay);
        if wants_autoplay && !session.autoplay_attempted {
            session.autoplay_attempted = true;
            session.autoplay_pending = true;
            effects.push(PlaybackEffect::AttemptAutoplay);
        }
    }

    fn on_autoplay(&mut self, outcome: AutoplayOutcome) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        if !session.autoplay_pending {
            return;
        }
        session.autoplay_pending = false;
        if outcome == AutoplayOutcome::Started && self.state == PlaybackState::Ready {
            self.state = PlaybackState::Playing;
        }
    }

    fn on_played(&mut self) {
        match self.state {
            PlaybackState::Ready | PlaybackState::Paused => {
                self.state = PlaybackState::Playing;
            }
            PlaybackState::Ended => {
                if let Some(session) = self.session.as_mut() {
                    session.near_end_fired = false;
                }
                self.state = PlaybackState::Playing;
            }
            _ => {}
        }
        if let Some(session) = self.session.as_mut() {
            session.autoplay_pending = false;
        }
    }

    fn on_time_update(&mut self, current_time: f64, duration: f64, effects: &mut Vec<PlaybackEffect>) {
        if !self.state.is_active() || !current_time.is_finite() {
            return;
        }
        let min_persist = self.settings.min_persist_position_secs();
        let near_end_window = self.settings.near_end_window_secs();
        let Some(session) = self.session.as_mut() else {
            return;
        };

        if self.state == PlaybackState::Playing {
            self.buffering = false;
        }
        let current_time = current_time.max(0.0);
        session.last_position = current_time;
        session.high_water = session.high_water.max(current_time);

        effects.push(PlaybackEffect::ReportProgress {
            current_time,
            duration,
        });

        if current_time > min_persist {
            effects.push(PlaybackEffect::Persist {
                seconds: session.high_water,
                duration,
            });
        }

        if !session.near_end_fired
            && duration.is_finite()
            && duration > 0.0
            && duration - current_time <= near_end_window
        {
            session.near_end_fired = true;
            effects.push(PlaybackEffect::NearEnd);
        }
    }

    fn on_error(&mut self, effects: &mut Vec<PlaybackEffect>) {
        let kind = match self.state {
            PlaybackState::Loading => MediaErrorKind::MetadataLoad,
            PlaybackState::Ready | PlaybackState::Playing | PlaybackState::Paused => {
                MediaErrorKind::Playback
            }
            _ => return,
        };
        let max = self.settings.max_retries();
        let Some(session) = self.session.as_mut() else {
            return;
        };

        session.errored = true;
        session.autoplay_pending = false;
        self.buffering = false;

        if session.attempt < max {
            session.attempt += 1;
            let attempt = session.attempt;
            self.state = PlaybackState::Error {
                attempt,
                kind,
                terminal: false,
            };
            effects.push(PlaybackEffect::ScheduleRetry {
                epoch: self.epoch,
                attempt,
                delay: self.settings.retry_delay(attempt),
            });
        } else {
            self.state = PlaybackState::Error {
                attempt: session.attempt,
                kind,
                terminal: true,
            };
        }
    }

    fn on_retry_timer(&mut self, epoch: u64, effects: &mut Vec<PlaybackEffect>) {
        if epoch != self.epoch {
            return;
        }
        if matches!(self.state, PlaybackState::Error { terminal: false, .. }) {
            self.reload(effects);
        }
    }

    fn on_manual_retry(&mut self, effects: &mut Vec<PlaybackEffect>) {
        if !matches!(self.state, PlaybackState::Error { .. }) {
            return;
        }
        self.cancel_timers(effects);
        if let Some(session) = self.session.as_mut() {
            session.attempt = 0;
            session.errored = false;
        }
        self.reload(effects);
    }

    fn on_ended(&mut self, effects: &mut Vec<PlaybackEffect>) {
        if !matches!(self.state, PlaybackState::Playing | PlaybackState::Paused) {
            return;
        }
        self.state = PlaybackState::Ended;
        self.buffering = false;
        effects.push(PlaybackEffect::FlushProgress);
        effects.push(PlaybackEffect::Ended);
    }
}

fn fatal_message(kind: MediaErrorKind) -> String {
    match kind {
        MediaErrorKind::MetadataLoad => "This lesson's video could not be loaded.".to_string(),
        MediaErrorKind::Playback => "Playback was interrupted and could not recover.".to_string(),
    }
}
