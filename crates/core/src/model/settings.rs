use std::time::Duration;

use thiserror::Error;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SettingsError {
    #[error("retry backoff step must be > 0")]
    InvalidRetryStep,

    #[error("persist interval must be > 0")]
    InvalidPersistInterval,

    #[error("minimum persist position must be a non-negative number")]
    InvalidMinPersistPosition,

    #[error("near-end window must be a non-negative number")]
    InvalidNearEndWindow,
}

//
// ─── SETTINGS ──────────────────────────────────────────────────────────────────
//

/// Tuning knobs for a playback session.
///
/// Defaults:
/// - 3 automatic reloads, `attempt × 2s` apart
/// - progress persisted at most every 2s, and only past the 5s mark
/// - near-end signal 10s before the end
/// - autoplay attempted once per session
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackSettings {
    max_retries: u32,
    retry_step: Duration,
    persist_interval: Duration,
    min_persist_position_secs: f64,
    near_end_window_secs: f64,
    autoplay: bool,
}

impl Default for PlaybackSettings {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_step: Duration::from_millis(2_000),
            persist_interval: Duration::from_millis(2_000),
            min_persist_position_secs: 5.0,
            near_end_window_secs: 10.0,
            autoplay: true,
        }
    }
}

impl PlaybackSettings {
    /// Creates custom playback settings.
    ///
    /// `max_retries` may be zero, which makes every media error terminal.
    ///
    /// # Errors
    ///
    /// Returns `SettingsError` if a duration is zero or a window is negative.
    pub fn new(
        max_retries: u32,
        retry_step: Duration,
        persist_interval: Duration,
        min_persist_position_secs: f64,
        near_end_window_secs: f64,
        autoplay: bool,
    ) -> Result<Self, SettingsError> {
        if retry_step.is_zero() {
            return Err(SettingsError::InvalidRetryStep);
        }
        if persist_interval.is_zero() {
            return Err(SettingsError::InvalidPersistInterval);
        }
        if !min_persist_position_secs.is_finite() || min_persist_position_secs < 0.0 {
            return Err(SettingsError::InvalidMinPersistPosition);
        }
        if !near_end_window_secs.is_finite() || near_end_window_secs < 0.0 {
            return Err(SettingsError::InvalidNearEndWindow);
        }

        Ok(Self {
            max_retries,
            retry_step,
            persist_interval,
            min_persist_position_secs,
            near_end_window_secs,
            autoplay,
        })
    }

    #[must_use]
    pub fn with_autoplay(mut self, autoplay: bool) -> Self {
        self.autoplay = autoplay;
        self
    }

    #[must_use]
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    #[must_use]
    pub fn retry_step(&self) -> Duration {
        self.retry_step
    }

    /// Delay before automatic reload number `attempt` (1-based).
    #[must_use]
    pub fn retry_delay(&self, attempt: u32) -> Duration {
        self.retry_step.saturating_mul(attempt)
    }

    #[must_use]
    pub fn persist_interval(&self) -> Duration {
        self.persist_interval
    }

    /// Positions at or below this are never persisted.
    #[must_use]
    pub fn min_persist_position_secs(&self) -> f64 {
        self.min_persist_position_secs
    }

    #[must_use]
    pub fn near_end_window_secs(&self) -> f64 {
        self.near_end_window_secs
    }

    #[must_use]
    pub fn autoplay(&self) -> bool {
        self.autoplay
    }
}
