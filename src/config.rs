use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Production response window for a deadline broadcast
pub const DEFAULT_TIMEOUT_SECS: f64 = 300.0;

/// Main configuration structure
#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub broadcaster: BroadcasterConfig,
    /// Ledger database. When absent the in-memory ledger is used.
    #[serde(default)]
    pub database: Option<DatabaseConfig>,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BroadcasterConfig {
    /// Seconds to wait for agent responses once every request has been sent.
    /// Fractional values are allowed.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: f64,
}

fn default_timeout_secs() -> f64 {
    DEFAULT_TIMEOUT_SECS
}

impl Default for BroadcasterConfig {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl BroadcasterConfig {
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout_secs: timeout.as_secs_f64(),
        }
    }

    /// Response window as a `Duration`.
    ///
    /// Falls back to the production window when the configured value is
    /// unusable; `validate` reports those values.
    pub fn timeout(&self) -> Duration {
        if self.timeout_secs.is_finite() && self.timeout_secs > 0.0 {
            Duration::from_secs_f64(self.timeout_secs)
        } else {
            Duration::from_secs_f64(DEFAULT_TIMEOUT_SECS)
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,
    /// Maximum connections in pool
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 {
    5
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Filter directive used when RUST_LOG is unset
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Enable JSON formatted logs
    #[serde(default)]
    pub json: bool,
    /// Directory for the daily rolling log file. Console only when unset.
    #[serde(default)]
    pub dir: Option<String>,
}

fn default_log_level() -> String {
    "info,fleet_broadcast=debug,sqlx=warn".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
            dir: None,
        }
    }
}

impl AppConfig {
    /// Load configuration from files and environment
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from("config")
    }

    /// Load configuration from a specific directory
    pub fn load_from<P: AsRef<Path>>(config_dir: P) -> Result<Self, ConfigError> {
        let config_dir = config_dir.as_ref();

        let builder = Config::builder()
            .set_default("broadcaster.timeout_secs", DEFAULT_TIMEOUT_SECS)?
            .set_default("logging.level", default_log_level())?
            .set_default("logging.json", false)?
            // Load default config file
            .add_source(File::from(config_dir.join("default.toml")).required(false))
            // Load environment-specific config (e.g., config/production.toml)
            .add_source(
                File::from(config_dir.join(
                    std::env::var("FLEET_ENV").unwrap_or_else(|_| "development".to_string()),
                ))
                .required(false),
            )
            // Override with environment variables (FLEET_BROADCASTER__TIMEOUT_SECS, etc.)
            .add_source(
                Environment::with_prefix("FLEET")
                    .separator("__")
                    .try_parsing(true),
            );

        builder.build()?.try_deserialize()
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        let timeout = self.broadcaster.timeout_secs;
        if !timeout.is_finite() || timeout <= 0.0 {
            errors.push(format!("broadcaster.timeout_secs must be positive, got {timeout}"));
        }

        if let Some(db) = &self.database {
            if db.url.trim().is_empty() {
                errors.push("database.url must not be empty".to_string());
            }
            if db.max_connections == 0 {
                errors.push("database.max_connections must be at least 1".to_string());
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
