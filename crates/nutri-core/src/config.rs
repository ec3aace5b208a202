//! Core configuration.
//!
//! Layered with the `config` crate: defaults, then an optional JSON document
//! handed over by the host app, then `NUTRI_*` environment variables
//! (`NUTRI_DATABASE_PATH`, `NUTRI_BUSY_TIMEOUT_MS`, `NUTRI_LOG_FILTER`).

use std::path::PathBuf;
use std::time::Duration;

use ::config::{Config, ConfigError, Environment, File, FileFormat, Map};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::db::{Database, DbResult};

/// Prefix of the environment overrides.
pub const ENV_PREFIX: &str = "NUTRI";

/// Default log filter when none is configured.
pub fn default_log_filter() -> &'static str {
    "nutri_core=info"
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CoreConfig {
    /// Database file. `None` keeps everything in memory.
    pub database_path: Option<PathBuf>,
    /// How long a write waits for another connection's lock
    pub busy_timeout_ms: u64,
    /// `tracing` filter directive
    pub log_filter: String,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            database_path: None,
            busy_timeout_ms: 5_000,
            log_filter: default_log_filter().to_string(),
        }
    }
}

impl CoreConfig {
    /// Parse a JSON config. Missing keys take their defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(File::from_str(json, FileFormat::Json))
            .build()?
            .try_deserialize()
    }

    /// Defaults overridden by `NUTRI_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::layered(None, None)
    }

    /// JSON config with `NUTRI_*` environment variables on top.
    pub fn load(json: &str) -> Result<Self, ConfigError> {
        Self::layered(Some(json), None)
    }

    /// `env` replaces the process environment when given.
    fn layered(json: Option<&str>, env: Option<Map<String, String>>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();
        if let Some(json) = json {
            builder = builder.add_source(File::from_str(json, FileFormat::Json));
        }

        let settings = builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .source(env),
            )
            .build()?;
        settings.try_deserialize()
    }

    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }

    /// Open the configured database and apply the busy timeout.
    pub fn open_database(&self) -> DbResult<Database> {
        let db = match &self.database_path {
            Some(path) => Database::open(path)?,
            None => Database::open_in_memory()?,
        };
        db.set_busy_timeout(self.busy_timeout())?;
        debug!(path = ?self.database_path, busy_timeout_ms = self.busy_timeout_ms, "opened database");
        Ok(db)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(pairs: &[(&str, &str)]) -> Option<Map<String, String>> {
        Some(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    #[test]
    fn test_json_defaults() {
        let config = CoreConfig::from_json("{}").unwrap();
        assert_eq!(config, CoreConfig::default());

        let config = CoreConfig::from_json(r#"{"busy_timeout_ms": 250}"#).unwrap();
        assert_eq!(config.busy_timeout(), Duration::from_millis(250));
        assert_eq!(config.log_filter, "nutri_core=info");
    }

    #[test]
    fn test_invalid_json() {
        assert!(CoreConfig::from_json("not json").is_err());
        assert!(CoreConfig::from_json(r#"{"busy_timeout_ms": "soon"}"#).is_err());
    }

    #[test]
    fn test_env_overrides_json() {
        let config = CoreConfig::layered(
            Some(r#"{"database_path": "/data/json.db", "busy_timeout_ms": 250}"#),
            env(&[
                ("NUTRI_DATABASE_PATH", "/tmp/clinic.db"),
                ("NUTRI_LOG_FILTER", "debug"),
                ("OTHER_BUSY_TIMEOUT_MS", "1"),
            ]),
        )
        .unwrap();

        assert_eq!(config.database_path, Some(PathBuf::from("/tmp/clinic.db")));
        assert_eq!(config.busy_timeout_ms, 250);
        assert_eq!(config.log_filter, "debug");
    }

    #[test]
    fn test_env_timeout_is_parsed() {
        let config = CoreConfig::layered(None, env(&[("NUTRI_BUSY_TIMEOUT_MS", "750")])).unwrap();
        assert_eq!(config.busy_timeout_ms, 750);
        assert_eq!(config.database_path, None);
    }

    #[test]
    fn test_malformed_env_timeout_is_an_error() {
        let result = CoreConfig::layered(None, env(&[("NUTRI_BUSY_TIMEOUT_MS", "oops")]));
        assert!(result.is_err());
    }

    #[test]
    fn test_open_file_database() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clinic.db");
        let config = CoreConfig {
            database_path: Some(path.clone()),
            ..CoreConfig::default()
        };

        let db = config.open_database().unwrap();
        let patient = crate::models::Patient::new(
            "Ana".into(),
            chrono::NaiveDate::from_ymd_opt(1990, 1, 1).unwrap(),
            crate::models::Sex::Female,
        );
        db.insert_patient(&patient).unwrap();
        drop(db);

        let reopened = config.open_database().unwrap();
        assert!(reopened.get_patient(&patient.patient_id).unwrap().is_some());
        assert!(path.exists());
    }
}
