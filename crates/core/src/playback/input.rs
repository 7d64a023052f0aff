use crate::model::LessonId;

/// What to play: the lesson, its video locator and an optional resume point.
#[derive(Debug, Clone, PartialEq)]
pub struct LessonSource {
    pub lesson_id: LessonId,
    pub video_ref: String,
    /// Explicit resume time; takes precedence over the persisted position.
    pub initial_time: Option<f64>,
    /// Overrides the configured autoplay preference for this session.
    pub autoplay: Option<bool>,
}

impl LessonSource {
    #[must_use]
    pub fn new(lesson_id: LessonId, video_ref: impl Into<String>) -> Self {
        Self {
            lesson_id,
            video_ref: video_ref.into(),
            initial_time: None,
            autoplay: None,
        }
    }

    #[must_use]
    pub fn with_initial_time(mut self, seconds: f64) -> Self {
        self.initial_time = Some(seconds);
        self
    }

    #[must_use]
    pub fn with_autoplay(mut self, autoplay: bool) -> Self {
        self.autoplay = Some(autoplay);
        self
    }

    pub(crate) fn same_media(&self, other: &LessonSource) -> bool {
        self.lesson_id == other.lesson_id && self.video_ref == other.video_ref
    }
}

/// Events emitted by the media element itself.
#[derive(Debug, Clone, PartialEq)]
pub enum MediaEvent {
    LoadedMetadata { duration: f64 },
    CanPlay,
    Waiting,
    TimeUpdate { current_time: f64, duration: f64 },
    Error { message: String },
    Ended,
    Play,
    Pause,
}

/// Result of the one-time autoplay attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AutoplayOutcome {
    Started,
    /// The platform refused to start playback without a user gesture.
    Blocked,
}

/// Everything the machine reacts to.
#[derive(Debug, Clone, PartialEq)]
pub enum PlaybackInput {
    /// A new source was supplied (construction or URL change).
    Load(LessonSource),
    /// Media metadata is available. `stored_position` is the persisted
    /// `secondsWatched` for the lesson, looked up by the driver.
    MetadataLoaded {
        duration: f64,
        stored_position: Option<f64>,
    },
    CanPlay,
    Waiting,
    TimeUpdate { current_time: f64, duration: f64 },
    MediaError { message: String },
    Ended,
    /// The element reports it started playing.
    Played,
    /// The element reports it paused.
    Paused,
    PlayRequested,
    PauseRequested,
    AutoplayResolved(AutoplayOutcome),
    RetryTimerFired { epoch: u64 },
    ManualRetry,
    Teardown,
}

impl PlaybackInput {
    /// Translate an element event. Metadata needs the persisted position,
    /// which only the driver can look up.
    #[must_use]
    pub fn from_media(event: MediaEvent, stored_position: Option<f64>) -> Self {
        match event {
            MediaEvent::LoadedMetadata { duration } => Self::MetadataLoaded {
                duration,
                stored_position,
            },
            MediaEvent::CanPlay => Self::CanPlay,
            MediaEvent::Waiting => Self::Waiting,
            MediaEvent::TimeUpdate {
                current_time,
                duration,
            } => Self::TimeUpdate {
                current_time,
                duration,
            },
            MediaEvent::Error { message } => Self::MediaError { message },
            MediaEvent::Ended => Self::Ended,
            MediaEvent::Play => Self::Played,
            MediaEvent::Pause => Self::Paused,
        }
    }
}
