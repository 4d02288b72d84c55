//! Application-level configuration loading: booking policy knobs read from a JSON file.

use std::{env, fs, io::ErrorKind, path::PathBuf};

use serde::Deserialize;
use time::Duration;
use tracing::{info, warn};

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "MATCHDAY_BACK_CONFIG_PATH";

const DEFAULT_JOIN_CANCEL_CUTOFF_MINUTES: i64 = 120;
const DEFAULT_SEARCH_RADIUS_M: f64 = 5_000.0;
const DEFAULT_MAX_WRITE_RETRIES: u32 = 5;

#[derive(Debug, Clone, PartialEq)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    /// Minimum time between cancelling a join request and the game start.
    pub join_cancel_cutoff: Duration,
    /// Radius applied to geographic game searches that omit one.
    pub default_search_radius_m: f64,
    /// Attempts made when a game write loses an optimistic concurrency race.
    pub max_write_retries: u32,
}

impl AppConfig {
    /// Load the application configuration from disk, falling back to built-in defaults.
    pub fn load() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
                Ok(raw) => {
                    let app_config: Self = raw.into();
                    info!(
                        path = %path.display(),
                        cutoff_minutes = app_config.join_cancel_cutoff.whole_minutes(),
                        max_write_retries = app_config.max_write_retries,
                        "loaded booking policy from config"
                    );
                    app_config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            join_cancel_cutoff: Duration::minutes(DEFAULT_JOIN_CANCEL_CUTOFF_MINUTES),
            default_search_radius_m: DEFAULT_SEARCH_RADIUS_M,
            max_write_retries: DEFAULT_MAX_WRITE_RETRIES,
        }
    }
}

#[derive(Debug, Deserialize)]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    join_cancel_cutoff_minutes: Option<i64>,
    default_search_radius_m: Option<f64>,
    max_write_retries: Option<u32>,
}

impl From<RawConfig> for AppConfig {
    fn from(value: RawConfig) -> Self {
        let defaults = Self::default();
        Self {
            join_cancel_cutoff: value
                .join_cancel_cutoff_minutes
                .filter(|minutes| *minutes >= 0)
                .map(Duration::minutes)
                .unwrap_or(defaults.join_cancel_cutoff),
            default_search_radius_m: value
                .default_search_radius_m
                .filter(|radius| radius.is_finite() && *radius > 0.0)
                .unwrap_or(defaults.default_search_radius_m),
            max_write_retries: value
                .max_write_retries
                .map(|retries| retries.max(1))
                .unwrap_or(defaults.max_write_retries),
        }
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_keeps_defaults_for_missing_keys() {
        let raw: RawConfig = serde_json::from_str(r#"{"join_cancel_cutoff_minutes": 90}"#).unwrap();
        let config = AppConfig::from(raw);
        assert_eq!(config.join_cancel_cutoff, Duration::minutes(90));
        assert_eq!(config.default_search_radius_m, DEFAULT_SEARCH_RADIUS_M);
        assert_eq!(config.max_write_retries, DEFAULT_MAX_WRITE_RETRIES);
    }

    #[test]
    fn nonsensical_values_are_ignored() {
        let raw: RawConfig = serde_json::from_str(
            r#"{"join_cancel_cutoff_minutes": -5, "default_search_radius_m": 0.0, "max_write_retries": 0}"#,
        )
        .unwrap();
        let config = AppConfig::from(raw);
        assert_eq!(config.join_cancel_cutoff, Duration::hours(2));
        assert_eq!(config.default_search_radius_m, DEFAULT_SEARCH_RADIUS_M);
        assert_eq!(config.max_write_retries, 1);
    }
}
