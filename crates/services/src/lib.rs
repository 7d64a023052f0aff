#![forbid(unsafe_code)]

pub mod app_services;
pub mod catalog_service;
pub mod config;
pub mod error;
pub mod playback;
pub mod progress_service;

pub use lesson_core::Clock;

pub use app_services::AppServices;
pub use catalog_service::{
    AreaOverview, CatalogOverview, CatalogService, ContinueWatching, LessonOverview,
    ModuleOverview, parse_records,
};
pub use config::ServicesConfig;
pub use error::{AppServicesError, CatalogError, ConfigError, PlaybackError, ProgressServiceError};
pub use playback::{
    ChannelListener, MediaElement, NoopListener, PlayRejected, PlaybackController,
    PlaybackListener, PlaybackNotification, ThrottledProgressWriter,
};
pub use progress_service::ProgressService;
