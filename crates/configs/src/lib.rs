//! # configs
//!
//! Layered application configuration:
//! built-in defaults, then an optional `kindling.toml`, then `KINDLING__*`
//! environment variables (a `.env` file is loaded first if present).
//!
//! Nested keys use a double underscore, e.g. `KINDLING__STORAGE__BACKEND=sqlite`.

use std::time::Duration;

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, Environment, File, FileFormat};
use secrecy::SecretString;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Deserialize)]
pub struct AppConfig {
    pub discovery: DiscoveryConfig,
    pub card: CardConfig,
    pub storage: StorageConfig,
    pub log: LogConfig,
    pub demo: DemoConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DiscoveryConfig {
    /// Buffered discovery events per subscriber before the slowest one lags.
    pub event_capacity: usize,
}

/// Gesture and button animation values for the cards.
#[derive(Debug, Clone, Deserialize)]
pub struct CardConfig {
    pub swipe_threshold: f64,
    pub rotation_divisor: f64,
    pub button_translation: f64,
    pub button_rotation_degrees: f64,
    pub button_duration_ms: u64,
}

impl CardConfig {
    pub fn button_duration(&self) -> Duration {
        Duration::from_millis(self.button_duration_ms)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Memory,
    Sqlite,
}

#[derive(Debug, Deserialize)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    /// Required for `sqlite`, e.g. `sqlite://kindling.db`.
    pub database_url: Option<SecretString>,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    /// `EnvFilter` directive; `RUST_LOG` wins when set.
    pub filter: String,
    pub json: bool,
}

/// Parameters of the scripted session run by the binary.
#[derive(Debug, Clone, Deserialize)]
pub struct DemoConfig {
    pub candidates: usize,
}

impl AppConfig {
    /// Defaults, then `path` (or `kindling.toml` if present), then environment.
    pub fn load(path: Option<&str>) -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let file = match path {
            Some(p) => File::with_name(p).required(true),
            None => File::with_name("kindling").required(false),
        };
        let config = defaults()?
            .add_source(file)
            .add_source(
                Environment::with_prefix("KINDLING")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        Self::finish(config)
    }

    /// Defaults overlaid with an inline TOML document. No file or environment.
    pub fn from_toml(toml: &str) -> Result<Self, ConfigError> {
        let config = defaults()?
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()?;
        Self::finish(config)
    }

    fn finish(config: Config) -> Result<Self, ConfigError> {
        let app: AppConfig = config.try_deserialize()?;
        app.validate()?;
        debug!(backend = ?app.storage.backend, "configuration loaded");
        Ok(app)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.card.swipe_threshold <= 0.0 {
            return Err(ConfigError::Invalid("card.swipe_threshold must be positive".into()));
        }
        if self.card.rotation_divisor == 0.0 {
            return Err(ConfigError::Invalid("card.rotation_divisor must not be zero".into()));
        }
        if self.discovery.event_capacity == 0 {
            return Err(ConfigError::Invalid("discovery.event_capacity must be positive".into()));
        }
        if self.storage.backend == StorageBackend::Sqlite && self.storage.database_url.is_none() {
            return Err(ConfigError::Invalid(
                "storage.database_url is required for the sqlite backend".into(),
            ));
        }
        Ok(())
    }
}

fn defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    Ok(Config::builder()
        .set_default("discovery.event_capacity", 64)?
        .set_default("card.swipe_threshold", 100.0)?
        .set_default("card.rotation_divisor", 20.0)?
        .set_default("card.button_translation", 700.0)?
        .set_default("card.button_rotation_degrees", 15.0)?
        .set_default("card.button_duration_ms", 500)?
        .set_default("storage.backend", "memory")?
        .set_default("storage.max_connections", 5)?
        .set_default("log.filter", "info")?
        .set_default("log.json", false)?
        .set_default("demo.candidates", 12)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn test_defaults() {
        let cfg = AppConfig::from_toml("").unwrap();
        assert_eq!(cfg.card.swipe_threshold, 100.0);
        assert_eq!(cfg.card.button_duration(), Duration::from_millis(500));
        assert_eq!(cfg.storage.backend, StorageBackend::Memory);
        assert!(cfg.storage.database_url.is_none());
        assert_eq!(cfg.discovery.event_capacity, 64);
        assert!(!cfg.log.json);
    }

    #[test]
    fn test_overrides() {
        let cfg = AppConfig::from_toml(
            r#"
            [card]
            swipe_threshold = 80.0

            [storage]
            backend = "sqlite"
            database_url = "sqlite://kindling.db"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.card.swipe_threshold, 80.0);
        assert_eq!(cfg.card.rotation_divisor, 20.0);
        assert_eq!(cfg.storage.backend, StorageBackend::Sqlite);
        assert_eq!(
            cfg.storage.database_url.as_ref().map(|s| s.expose_secret().to_string()),
            Some("sqlite://kindling.db".to_string())
        );
    }

    #[test]
    fn test_sqlite_requires_url() {
        let err = AppConfig::from_toml("[storage]\nbackend = \"sqlite\"").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_rejects_non_positive_threshold() {
        let err = AppConfig::from_toml("[card]\nswipe_threshold = 0.0").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_secret_is_redacted_in_debug() {
        let cfg = AppConfig::from_toml(
            "[storage]\nbackend = \"sqlite\"\ndatabase_url = \"sqlite://secret-path.db\"",
        )
        .unwrap();
        assert!(!format!("{:?}", cfg.storage).contains("secret-path"));
    }
}
