//! Environment-driven configuration.

use std::env;
use std::time::Duration;

use lesson_core::model::PlaybackSettings;
use storage::sqlite::DEFAULT_NAMESPACE;

use crate::error::ConfigError;

pub const ENV_DB_URL: &str = "LESSON_DB_URL";
pub const ENV_NAMESPACE: &str = "LESSON_PROGRESS_NAMESPACE";
pub const ENV_AUTOPLAY: &str = "LESSON_AUTOPLAY";
pub const ENV_MAX_RETRIES: &str = "LESSON_MAX_RETRIES";
pub const ENV_RETRY_STEP_MS: &str = "LESSON_RETRY_STEP_MS";

pub const DEFAULT_DB_URL: &str = "sqlite:lessons.sqlite3";

/// Everything needed to assemble `AppServices`.
#[derive(Debug, Clone, PartialEq)]
pub struct ServicesConfig {
    pub db_url: String,
    pub namespace: String,
    pub playback: PlaybackSettings,
}

impl Default for ServicesConfig {
    fn default() -> Self {
        Self {
            db_url: DEFAULT_DB_URL.to_string(),
            namespace: DEFAULT_NAMESPACE.to_string(),
            playback: PlaybackSettings::default(),
        }
    }
}

impl ServicesConfig {
    /// Read configuration from process environment variables, falling back to
    /// defaults for anything unset.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set to an unparseable value.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as `from_env`, reading variables through `lookup`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set to an unparseable value.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let set = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let db_url = set(ENV_DB_URL).unwrap_or(defaults.db_url);
        let namespace = set(ENV_NAMESPACE).unwrap_or(defaults.namespace);

        let base = defaults.playback;
        let autoplay = match set(ENV_AUTOPLAY) {
            Some(raw) => parse_bool(ENV_AUTOPLAY, &raw)?,
            None => base.autoplay(),
        };
        let max_retries = match set(ENV_MAX_RETRIES) {
            Some(raw) => raw
                .trim()
                .parse::<u32>()
                .map_err(|_| ConfigError::InvalidValue {
                    key: ENV_MAX_RETRIES,
                    raw,
                })?,
            None => base.max_retries(),
        };
        let retry_step = match set(ENV_RETRY_STEP_MS) {
            Some(raw) => raw
                .trim()
                .parse::<u64>()
                .map(Duration::from_millis)
                .map_err(|_| ConfigError::InvalidValue {
                    key: ENV_RETRY_STEP_MS,
                    raw,
                })?,
            None => base.retry_step(),
        };

        let playback = PlaybackSettings::new(
            max_retries,
            retry_step,
            base.persist_interval(),
            base.min_persist_position_secs(),
            base.near_end_window_secs(),
            autoplay,
        )?;

        Ok(Self {
            db_url,
            namespace,
            playback,
        })
    }
}

fn parse_bool(key: &'static str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key,
            raw: raw.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config(vars: &[(&str, &str)]) -> Result<ServicesConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        ServicesConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_when_unset() {
        let cfg = config(&[]).unwrap();
        assert_eq!(cfg, ServicesConfig::default());
        assert_eq!(cfg.namespace, "lesson-progress");
        assert_eq!(cfg.playback.max_retries(), 3);
    }

    #[test]
    fn reads_overrides() {
        let cfg = config(&[
            (ENV_DB_URL, "sqlite::memory:"),
            (ENV_NAMESPACE, "course-b"),
            (ENV_AUTOPLAY, "off"),
            (ENV_MAX_RETRIES, "5"),
            (ENV_RETRY_STEP_MS, "500"),
        ])
        .unwrap();
        assert_eq!(cfg.db_url, "sqlite::memory:");
        assert_eq!(cfg.namespace, "course-b");
        assert!(!cfg.playback.autoplay());
        assert_eq!(cfg.playback.max_retries(), 5);
        assert_eq!(cfg.playback.retry_delay(2), Duration::from_millis(1_000));
    }

    #[test]
    fn blank_values_fall_back() {
        let cfg = config(&[(ENV_NAMESPACE, "  "), (ENV_AUTOPLAY, "")]).unwrap();
        assert_eq!(cfg.namespace, "lesson-progress");
        assert!(cfg.playback.autoplay());
    }

    #[test]
    fn rejects_garbage() {
        let err = config(&[(ENV_MAX_RETRIES, "lots")]).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue {
                key: ENV_MAX_RETRIES,
                ..
            }
        ));

        let err = config(&[(ENV_RETRY_STEP_MS, "0")]).unwrap_err();
        assert!(matches!(err, ConfigError::Settings(_)));
    }
}
