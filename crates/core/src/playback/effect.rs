use std::time::Duration;

use crate::playback::state::PlaybackStatus;

/// Side effects requested by the machine, executed in order by the driver.
#[derive(Debug, Clone, PartialEq)]
pub enum PlaybackEffect {
    /// Abort every pending timer (retry backoff, throttled persistence).
    CancelTimers,
    /// Point the element at this locator and start fetching.
    LoadSource(String),
    Seek(f64),
    /// Try to start playback without a user gesture; report the outcome back
    /// as `PlaybackInput::AutoplayResolved`.
    AttemptAutoplay,
    RequestPlay,
    RequestPause,
    /// Fire `PlaybackInput::RetryTimerFired { epoch }` after `delay`.
    ScheduleRetry {
        epoch: u64,
        attempt: u32,
        delay: Duration,
    },
    ReportProgress { current_time: f64, duration: f64 },
    /// Offer a position to the throttled progress writer.
    Persist { seconds: f64, duration: f64 },
    /// Write any position still held by the throttled writer.
    FlushProgress,
    NearEnd,
    Ended,
    StatusChanged(PlaybackStatus),
}
