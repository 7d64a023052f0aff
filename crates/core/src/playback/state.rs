use serde::Serialize;

/// Which phase a media failure happened in. Both kinds share one retry counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaErrorKind {
    /// The media never reached `Ready`.
    MetadataLoad,
    /// The media failed during an active session.
    Playback,
}

/// Lifecycle of one media session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum PlaybackState {
    Idle,
    Loading,
    Ready,
    Playing,
    Paused,
    Ended,
    Error {
        attempt: u32,
        kind: MediaErrorKind,
        /// Automatic retries are exhausted; only a manual retry leaves this state.
        terminal: bool,
    },
}

impl PlaybackState {
    #[must_use]
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Ready | Self::Playing | Self::Paused)
    }

    #[must_use]
    pub fn is_terminal_error(&self) -> bool {
        matches!(self, Self::Error { terminal: true, .. })
    }
}

/// Retry counter shown while automatic reloads are in progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RetryStatus {
    pub attempt: u32,
    pub max: u32,
}

/// What the player UI should show for the current session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackStatus {
    pub state: PlaybackState,
    /// Loading indicator: initial load or buffering.
    pub loading: bool,
    /// Manual play controls should be offered.
    pub controls_visible: bool,
    pub retry: Option<RetryStatus>,
    pub message: Option<String>,
    /// A "try again" action should be offered.
    pub can_retry: bool,
}

impl PlaybackStatus {
    #[must_use]
    pub fn idle() -> Self {
        Self {
            state: PlaybackState::Idle,
            loading: false,
            controls_visible: false,
            retry: None,
            message: None,
            can_retry: false,
        }
    }
}
