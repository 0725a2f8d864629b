use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use thiserror::Error;

use crate::repository::{ExamRepository, ExamWriter, Storage};

mod exam_repo;
mod mapping;
mod migrate;

/// Pool sizing and lock waiting for a `SQLite` question bank.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SqliteSettings {
    pub max_connections: u32,
    pub acquire_timeout: Duration,
    /// How long a statement waits on a locked database before failing.
    pub busy_timeout: Duration,
}

impl Default for SqliteSettings {
    fn default() -> Self {
        Self {
            max_connections: 5,
            acquire_timeout: Duration::from_secs(5),
            busy_timeout: Duration::from_secs(5),
        }
    }
}

impl SqliteSettings {
    fn connect_options(&self, database_url: &str) -> Result<SqliteConnectOptions, sqlx::Error> {
        Ok(SqliteConnectOptions::from_str(database_url)?
            .foreign_keys(true)
            .busy_timeout(self.busy_timeout))
    }

    fn pool_options(&self) -> SqlitePoolOptions {
        SqlitePoolOptions::new()
            .max_connections(self.max_connections.max(1))
            .acquire_timeout(self.acquire_timeout)
    }
}

#[derive(Clone)]
pub struct SqliteRepository {
    pool: SqlitePool,
}

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SqliteInitError {
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

impl SqliteRepository {
    /// Opens the question bank at `database_url` with default settings.
    ///
    /// # Errors
    ///
    /// Returns `SqliteInitError` if the URL is malformed or the database
    /// cannot be opened.
    pub async fn connect(database_url: &str) -> Result<Self, SqliteInitError> {
        Self::connect_with(database_url, SqliteSettings::default()).await
    }

    /// # Errors
    ///
    /// Returns `SqliteInitError` if the URL is malformed or the database
    /// cannot be opened.
    pub async fn connect_with(
        database_url: &str,
        settings: SqliteSettings,
    ) -> Result<Self, SqliteInitError> {
        let options = settings.connect_options(database_url)?;
        let pool = settings.pool_options().connect_with(options).await?;
        Ok(Self { pool })
    }

    #[must_use]
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Applies pending schema versions.
    ///
    /// # Errors
    ///
    /// Returns `SqliteInitError` if a migration fails.
    pub async fn migrate(&self) -> Result<(), SqliteInitError> {
        migrate::run_migrations(&self.pool).await
    }
}

impl Storage {
    /// `SQLite`-backed storage with default settings, migrated to the latest
    /// schema.
    ///
    /// # Errors
    ///
    /// Returns `SqliteInitError` if connecting or migrating fails.
    pub async fn sqlite(database_url: &str) -> Result<Self, SqliteInitError> {
        Self::sqlite_with(database_url, SqliteSettings::default()).await
    }

    /// # Errors
    ///
    /// Returns `SqliteInitError` if connecting or migrating fails.
    pub async fn sqlite_with(
        database_url: &str,
        settings: SqliteSettings,
    ) -> Result<Self, SqliteInitError> {
        let repo = SqliteRepository::connect_with(database_url, settings).await?;
        repo.migrate().await?;
        let exams: Arc<dyn ExamRepository> = Arc::new(repo.clone());
        let writer: Arc<dyn ExamWriter> = Arc::new(repo);
        Ok(Self { exams, writer })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_never_shrinks_to_zero_connections() {
        let settings = SqliteSettings {
            max_connections: 0,
            ..SqliteSettings::default()
        };
        assert_eq!(settings.pool_options().get_max_connections(), 1);
    }

    #[test]
    fn unknown_open_mode_is_rejected_before_connecting() {
        let settings = SqliteSettings::default();
        assert!(settings.connect_options("sqlite:bank.db?mode=bogus").is_err());
        assert!(settings.connect_options("sqlite:bank.db?mode=rwc").is_ok());
    }
}
