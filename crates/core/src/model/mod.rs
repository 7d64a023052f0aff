mod catalog;
mod ids;
pub mod progress;
mod record;
mod settings;

pub use catalog::{Area, Lesson, Module};
pub use ids::{LessonId, ParseIdError};
pub use progress::{ProgressEntry, ProgressError, percent_watched, rollup_percent};
pub use record::LessonRecord;
pub use settings::{PlaybackSettings, SettingsError};
