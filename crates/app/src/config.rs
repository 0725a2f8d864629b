//! Settings read from the environment at startup.
//!
//! A `.env` file in the working directory is honoured for local runs.
//! Command-line flags override everything loaded here.

use std::time::Duration;

use storage::sqlite::SqliteSettings;
use toeic_core::model::ExamId;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

#[derive(Clone, Debug)]
pub struct Config {
    /// `None` runs against the built-in sample bank in memory.
    pub db_url: Option<String>,
    pub exam_id: ExamId,
    pub log_filter: String,
    pub sqlite: SqliteSettings,
}

impl Config {
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set to an unusable value.
    pub fn from_env() -> Result<Self, ConfigError> {
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let db_url = get("TOEIC_DB_URL").filter(|v| !v.trim().is_empty());

        let exam_id = match get("TOEIC_EXAM_ID") {
            Some(raw) => raw.parse::<ExamId>().map_err(|e| {
                ConfigError::InvalidValue("TOEIC_EXAM_ID".to_string(), e.to_string())
            })?,
            None => storage::sample::PRACTICE_TEST_ONE,
        };

        let log_filter = get("RUST_LOG").unwrap_or_else(|| "info".to_string());

        let mut sqlite = SqliteSettings::default();
        if let Some(n) = parse_positive(&get, "TOEIC_DB_MAX_CONNECTIONS")? {
            sqlite.max_connections = u32::try_from(n).map_err(|_| {
                ConfigError::InvalidValue("TOEIC_DB_MAX_CONNECTIONS".to_string(), n.to_string())
            })?;
        }
        if let Some(ms) = parse_positive(&get, "TOEIC_DB_BUSY_TIMEOUT_MS")? {
            sqlite.busy_timeout = Duration::from_millis(ms);
        }

        Ok(Self {
            db_url,
            exam_id,
            log_filter,
            sqlite,
        })
    }
}

fn parse_positive(
    get: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Result<Option<u64>, ConfigError> {
    let Some(raw) = get(key) else {
        return Ok(None);
    };
    match raw.trim().parse::<u64>() {
        Ok(n) if n > 0 => Ok(Some(n)),
        _ => Err(ConfigError::InvalidValue(key.to_string(), raw)),
    }
}
