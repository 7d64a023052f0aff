use std::sync::Arc;
use std::time::Duration;

use sqlx::{SqlitePool, sqlite::SqlitePoolOptions};
use thiserror::Error;

use crate::repository::{ProgressRepository, Storage};

mod mapping;
mod migrate;
mod progress_repo;

/// Namespace used when none is configured.
pub const DEFAULT_NAMESPACE: &str = "lesson-progress";

/// `SQLite`-backed progress store.
///
/// Every row is keyed by `(namespace, lesson_id)`, so several independent
/// stores can share one database file without colliding.
#[derive(Clone)]
pub struct SqliteRepository {
    pool: SqlitePool,
    namespace: String,
}

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SqliteInitError {
    #[error("progress namespace cannot be empty")]
    EmptyNamespace,
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

impl SqliteRepository {
    /// Connect to `SQLite` using the given URL and the default namespace.
    ///
    /// # Errors
    ///
    /// Returns `SqliteInitError` if the connection cannot be established or if
    /// the connection pragmas fail during setup.
    pub async fn connect(database_url: &str) -> Result<Self, SqliteInitError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(5))
            .after_connect(|conn, _meta| {
                Box::pin(async move {
                    sqlx::query("PRAGMA journal_mode = WAL;")
                        .execute(&mut *conn)
                        .await?;
                    sqlx::query("PRAGMA busy_timeout = 5000;")
                        .execute(&mut *conn)
                        .await?;
                    Ok(())
                })
            })
            .connect(database_url)
            .await?;
        tracing::debug!(database_url, "connected to sqlite");
        Ok(Self {
            pool,
            namespace: DEFAULT_NAMESPACE.to_string(),
        })
    }

    /// Scope all reads and writes to `namespace`.
    ///
    /// # Errors
    ///
    /// Returns `SqliteInitError::EmptyNamespace` for a blank namespace.
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Result<Self, SqliteInitError> {
        let namespace = namespace.into();
        if namespace.trim().is_empty() {
            return Err(SqliteInitError::EmptyNamespace);
        }
        self.namespace = namespace;
        Ok(self)
    }

    #[must_use]
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Create tables if they do not exist.
    ///
    /// # Errors
    ///
    /// Returns `SqliteInitError` if migration queries fail.
    pub async fn migrate(&self) -> Result<(), SqliteInitError> {
        migrate::run_migrations(&self.pool).await
    }
}

impl Storage {
    /// Build a `Storage` backed by `SQLite` using the default namespace.
    ///
    /// # Errors
    ///
    /// Returns `SqliteInitError` if connection or migrations cannot be
    /// completed.
    pub async fn sqlite(database_url: &str) -> Result<Self, SqliteInitError> {
        Self::sqlite_with_namespace(database_url, DEFAULT_NAMESPACE).await
    }

    /// Build a `Storage` backed by `SQLite`, scoped to `namespace`.
    ///
    /// # Errors
    ///
    /// Returns `SqliteInitError` if the namespace is blank or if connection
    /// or migrations cannot be completed.
    pub async fn sqlite_with_namespace(
        database_url: &str,
        namespace: &str,
    ) -> Result<Self, SqliteInitError> {
        let repo = SqliteRepository::connect(database_url)
            .await?
            .with_namespace(namespace)?;
        repo.migrate().await?;
        let progress: Arc<dyn ProgressRepository> = Arc::new(repo);
        Ok(Self { progress })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repository_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SqliteRepository>();
    }
}
