//! Application configuration loading and validation.
//!
//! Provides the main [`Config`] struct that aggregates all application settings.
//! Configuration is loaded from a TOML file with environment variable overrides
//! for sensitive values like `COINKEEPER_API_KEY`.
//!
//! # Example
//!
//! ```no_run
//! use coinkeeper::infrastructure::config::settings::Config;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load("coinkeeper.toml")?;
//!     config.init_logging();
//!     Ok(())
//! }
//! ```

use std::path::Path;

use serde::Deserialize;

use super::generation::GenerationConfig;
use super::logging::LoggingConfig;
use super::refresh::{PricesConfig, RefreshConfig};
use super::upstream::UpstreamConfig;
use crate::domain::{PairKey, UserId};
use crate::error::{ConfigError, Result};

/// Environment variable holding the upstream bearer token.
pub const API_KEY_ENV: &str = "COINKEEPER_API_KEY";

/// Environment variable overriding the configured user.
pub const USER_ID_ENV: &str = "COINKEEPER_USER_ID";

/// Main application configuration.
///
/// Load from a TOML file using [`Config::load`] or parse directly with
/// [`Config::parse_toml`].
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Owner of the wallets managed by this process.
    #[serde(default = "default_user_id")]
    pub user_id: String,

    /// Path to SQLite database file.
    ///
    /// Defaults to "coinkeeper.db" in the current directory.
    #[serde(default = "default_database_path")]
    pub database: String,

    /// Logging and tracing configuration.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Upstream service endpoints.
    #[serde(default)]
    pub upstream: UpstreamConfig,

    /// Wallet generation policy.
    #[serde(default)]
    pub generation: GenerationConfig,

    /// Refresh cadence and backoff.
    #[serde(default)]
    pub refresh: RefreshConfig,

    /// Quote currencies.
    #[serde(default)]
    pub prices: PricesConfig,
}

fn default_user_id() -> String {
    "local".to_string()
}

fn default_database_path() -> String {
    "coinkeeper.db".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            user_id: default_user_id(),
            database: default_database_path(),
            logging: LoggingConfig::default(),
            upstream: UpstreamConfig::default(),
            generation: GenerationConfig::default(),
            refresh: RefreshConfig::default(),
            prices: PricesConfig::default(),
        }
    }
}

impl Config {
    /// Parse configuration from TOML content.
    ///
    /// Loads the API key from `COINKEEPER_API_KEY` and lets
    /// `COINKEEPER_USER_ID` override the configured user.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML content is malformed or validation fails.
    pub fn parse_toml(content: &str) -> Result<Self> {
        let mut config: Self = toml::from_str(content).map_err(ConfigError::Parse)?;
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The file cannot be read
    /// - The TOML content is malformed
    /// - Validation fails
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::ReadFile)?;
        Self::parse_toml(&content)
    }

    /// Load from `path` when it exists, otherwise fall back to defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if an existing file is invalid.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        if path.as_ref().exists() {
            return Self::load(path);
        }
        let mut config = Self::default();
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    fn apply_env(&mut self) {
        // Secrets never come from the file.
        self.upstream.api_key = std::env::var(API_KEY_ENV).ok().filter(|k| !k.is_empty());
        if let Ok(user) = std::env::var(USER_ID_ENV) {
            if !user.trim().is_empty() {
                self.user_id = user.trim().to_string();
            }
        }
    }

    /// Initialize tracing from the `[logging]` section.
    pub fn init_logging(&self) {
        self.logging.init();
    }

    #[must_use]
    pub fn user(&self) -> UserId {
        UserId::new(self.user_id.clone())
    }

    /// Price pairs requested on every price refresh.
    #[must_use]
    pub fn price_pairs(&self) -> Vec<PairKey> {
        self.prices.pairs(&self.generation.supported_networks)
    }

    /// Validate configuration values.
    fn validate(&self) -> Result<()> {
        if self.user_id.trim().is_empty() {
            return Err(ConfigError::MissingField { field: "user_id" }.into());
        }
        for (field, value) in [
            ("creation_url", &self.upstream.creation_url),
            ("balance_url", &self.upstream.balance_url),
            ("price_url", &self.upstream.price_url),
        ] {
            if value.is_empty() {
                return Err(ConfigError::MissingField { field }.into());
            }
            url::Url::parse(value).map_err(|e| ConfigError::InvalidValue {
                field,
                reason: e.to_string(),
            })?;
        }
        if self.upstream.timeout_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "timeout_ms",
                reason: "must be greater than 0".to_string(),
            }
            .into());
        }
        if self.generation.supported_networks.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "supported_networks",
                reason: "must list at least one network".to_string(),
            }
            .into());
        }
        if self.refresh.interval_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "interval_ms",
                reason: "must be greater than 0".to_string(),
            }
            .into());
        }
        if self.refresh.backoff_multiplier < 1.0 {
            return Err(ConfigError::InvalidValue {
                field: "backoff_multiplier",
                reason: "must be >= 1.0".to_string(),
            }
            .into());
        }
        if self.refresh.max_backoff_ms < self.refresh.interval_ms {
            return Err(ConfigError::InvalidValue {
                field: "max_backoff_ms",
                reason: "must be >= interval_ms".to_string(),
            }
            .into());
        }
        if self.prices.quote_currencies.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "quote_currencies",
                reason: "must list at least one currency".to_string(),
            }
            .into());
        }
        if !self
            .prices
            .quote_currencies
            .iter()
            .any(|q| q.eq_ignore_ascii_case(&self.prices.display_currency))
        {
            return Err(ConfigError::InvalidValue {
                field: "display_currency",
                reason: "must be one of quote_currencies".to_string(),
            }
            .into());
        }
        Ok(())
    }
}
