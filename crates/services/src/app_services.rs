use std::sync::Arc;

use storage::repository::Storage;

use crate::Clock;
use crate::catalog_service::CatalogService;
use crate::config::ServicesConfig;
use crate::error::AppServicesError;
use crate::playback::{MediaElement, PlaybackController, PlaybackListener};
use crate::progress_service::ProgressService;

/// Assembles app-facing services over one progress store.
#[derive(Clone)]
pub struct AppServices {
    config: ServicesConfig,
    progress: Arc<ProgressService>,
    catalog: Arc<CatalogService>,
}

impl AppServices {
    /// Build services backed by `SQLite` storage.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage initialization fails.
    pub async fn new_sqlite(config: ServicesConfig, clock: Clock) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite_with_namespace(&config.db_url, &config.namespace).await?;
        tracing::info!(db_url = %config.db_url, namespace = %config.namespace, "progress store ready");
        Ok(Self::from_storage(config, clock, &storage))
    }

    /// Read `ServicesConfig` from the environment and build `SQLite`-backed
    /// services.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if configuration or storage initialization fails.
    pub async fn from_env(clock: Clock) -> Result<Self, AppServicesError> {
        let config = ServicesConfig::from_env()?;
        Self::new_sqlite(config, clock).await
    }

    /// Build services over a non-durable in-memory store.
    #[must_use]
    pub fn in_memory(config: ServicesConfig, clock: Clock) -> Self {
        Self::from_storage(config, clock, &Storage::in_memory())
    }

    #[must_use]
    pub fn from_storage(config: ServicesConfig, clock: Clock, storage: &Storage) -> Self {
        let progress = Arc::new(ProgressService::new(clock, Arc::clone(&storage.progress)));
        let catalog = Arc::new(CatalogService::new(Arc::clone(&progress)));
        Self {
            config,
            progress,
            catalog,
        }
    }

    #[must_use]
    pub fn config(&self) -> &ServicesConfig {
        &self.config
    }

    #[must_use]
    pub fn progress(&self) -> Arc<ProgressService> {
        Arc::clone(&self.progress)
    }

    #[must_use]
    pub fn catalog(&self) -> Arc<CatalogService> {
        Arc::clone(&self.catalog)
    }

    /// A controller for one player, using the configured playback settings.
    #[must_use]
    pub fn playback_controller<M, L>(&self, media: M, listener: L) -> PlaybackController<M, L>
    where
        M: MediaElement,
        L: PlaybackListener,
    {
        PlaybackController::new(
            self.config.playback.clone(),
            Arc::clone(&self.progress),
            media,
            listener,
        )
    }
}
