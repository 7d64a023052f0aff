use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::LessonId;

/// Percent at or above which a lesson counts as completed.
pub const COMPLETION_THRESHOLD_PERCENT: u8 = 90;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq)]
#[non_exhaustive]
pub enum ProgressError {
    #[error("watched position must be a finite number, got {0}")]
    InvalidPosition(f64),

    #[error("lesson duration must be a finite number, got {0}")]
    InvalidDuration(f64),

    #[error("percent watched must be between 0 and 100, got {0}")]
    InvalidPercent(i64),
}

//
// ─── MATH ──────────────────────────────────────────────────────────────────────
//

/// `clamp(round(seconds / total × 100), 0, 100)`, or `0` when the total is not positive.
#[must_use]
pub fn percent_watched(seconds_watched: f64, total_duration_seconds: f64) -> u8 {
    if !seconds_watched.is_finite()
        || !total_duration_seconds.is_finite()
        || total_duration_seconds <= 0.0
    {
        return 0;
    }
    let pct = (seconds_watched / total_duration_seconds * 100.0).round();
    // Clamped to 0..=100 right before the cast.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let pct = pct.clamp(0.0, 100.0) as u8;
    pct
}

/// `round(completed / total × 100)`, `0` for an empty set.
#[must_use]
pub fn rollup_percent(completed: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    let completed = completed.min(total);
    // Integer round-half-up of completed * 100 / total; result is at most 100.
    let pct = (completed * 200 + total) / (total * 2);
    u8::try_from(pct).unwrap_or(100)
}

//
// ─── ENTRY ─────────────────────────────────────────────────────────────────────
//

/// Persisted watch state for a single lesson.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressEntry {
    lesson_id: LessonId,
    percent_watched: u8,
    seconds_watched: f64,
    completed: bool,
    last_access: DateTime<Utc>,
}

impl ProgressEntry {
    /// Compute the entry that results from a new watch report.
    ///
    /// Completion is sticky: once `existing` is completed, a lower percentage
    /// never clears it.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError` if the position or duration is not finite.
    pub fn next(
        existing: Option<&ProgressEntry>,
        lesson_id: LessonId,
        seconds_watched: f64,
        total_duration_seconds: f64,
        now: DateTime<Utc>,
    ) -> Result<Self, ProgressError> {
        if !seconds_watched.is_finite() {
            return Err(ProgressError::InvalidPosition(seconds_watched));
        }
        if !total_duration_seconds.is_finite() {
            return Err(ProgressError::InvalidDuration(total_duration_seconds));
        }

        let seconds_watched = seconds_watched.max(0.0);
        let percent = percent_watched(seconds_watched, total_duration_seconds);
        let completed =
            percent >= COMPLETION_THRESHOLD_PERCENT || existing.is_some_and(|e| e.completed);

        Ok(Self {
            lesson_id,
            percent_watched: percent,
            seconds_watched,
            completed,
            last_access: now,
        })
    }

    /// Rehydrate an entry from persisted storage.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError` if the stored values are out of range.
    pub fn from_persisted(
        lesson_id: LessonId,
        percent_watched: i64,
        seconds_watched: f64,
        completed: bool,
        last_access: DateTime<Utc>,
    ) -> Result<Self, ProgressError> {
        let percent = u8::try_from(percent_watched)
            .ok()
            .filter(|p| *p <= 100)
            .ok_or(ProgressError::InvalidPercent(percent_watched))?;
        if !seconds_watched.is_finite() || seconds_watched < 0.0 {
            return Err(ProgressError::InvalidPosition(seconds_watched));
        }

        Ok(Self {
            lesson_id,
            percent_watched: percent,
            seconds_watched,
            completed,
            last_access,
        })
    }

    #[must_use]
    pub fn lesson_id(&self) -> &LessonId {
        &self.lesson_id
    }

    #[must_use]
    pub fn percent_watched(&self) -> u8 {
        self.percent_watched
    }

    #[must_use]
    pub fn seconds_watched(&self) -> f64 {
        self.seconds_watched
    }

    #[must_use]
    pub fn completed(&self) -> bool {
        self.completed
    }

    #[must_use]
    pub fn last_access(&self) -> DateTime<Utc> {
        self.last_access
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    fn id() -> LessonId {
        LessonId::new("l-1")
    }

    #[test]
    fn percent_rounds_and_clamps() {
        assert_eq!(percent_watched(42.0, 600.0), 7);
        assert_eq!(percent_watched(3.0, 600.0), 1);
        assert_eq!(percent_watched(700.0, 600.0), 100);
        assert_eq!(percent_watched(-5.0, 600.0), 0);
        assert_eq!(percent_watched(10.0, 0.0), 0);
        assert_eq!(percent_watched(f64::NAN, 10.0), 0);
    }

    #[test]
    fn rollup_rounds_half_up() {
        assert_eq!(rollup_percent(0, 0), 0);
        assert_eq!(rollup_percent(0, 4), 0);
        assert_eq!(rollup_percent(1, 3), 33);
        assert_eq!(rollup_percent(2, 3), 67);
        assert_eq!(rollup_percent(1, 8), 13);
        assert_eq!(rollup_percent(4, 4), 100);
    }

    #[test]
    fn completion_is_reached_at_ninety_percent() {
        let entry = ProgressEntry::next(None, id(), 89.0, 100.0, fixed_now()).unwrap();
        assert!(!entry.completed());

        let entry = ProgressEntry::next(Some(&entry), id(), 90.0, 100.0, fixed_now()).unwrap();
        assert!(entry.completed());
        assert_eq!(entry.percent_watched(), 90);
    }

    #[test]
    fn completion_never_resets() {
        let done = ProgressEntry::next(None, id(), 95.0, 100.0, fixed_now()).unwrap();
        let later = ProgressEntry::next(Some(&done), id(), 10.0, 100.0, fixed_now()).unwrap();
        assert!(later.completed());
        assert_eq!(later.percent_watched(), 10);
    }

    #[test]
    fn negative_positions_are_floored() {
        let entry = ProgressEntry::next(None, id(), -3.0, 100.0, fixed_now()).unwrap();
        assert!(entry.seconds_watched().abs() < f64::EPSILON);
        assert_eq!(entry.percent_watched(), 0);
    }

    #[test]
    fn rejects_non_finite_input() {
        let err = ProgressEntry::next(None, id(), f64::INFINITY, 100.0, fixed_now()).unwrap_err();
        assert!(matches!(err, ProgressError::InvalidPosition(_)));
        let err = ProgressEntry::next(None, id(), 1.0, f64::NAN, fixed_now()).unwrap_err();
        assert!(matches!(err, ProgressError::InvalidDuration(_)));
    }

    #[test]
    fn from_persisted_validates_percent() {
        let err = ProgressEntry::from_persisted(id(), 101, 1.0, false, fixed_now()).unwrap_err();
        assert_eq!(err, ProgressError::InvalidPercent(101));
        assert!(ProgressEntry::from_persisted(id(), 50, 30.0, false, fixed_now()).is_ok());
    }
}
