//! Application configuration: provider credentials, engine limits, history.
//!
//! Loaded from TOML; every field has a default so an empty file is valid.
//! API keys may also come from `FMP_API_KEY` / `FINNHUB_API_KEY`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use earnlab_core::data::{fmp, finnhub};
use earnlab_core::domain::{is_four_decimal, DEFAULT_SIGNIFICANCE_THRESHOLD};
use earnlab_core::market_cap::DEFAULT_PROFILE_CONCURRENCY;

pub const FMP_KEY_VAR: &str = "FMP_API_KEY";
pub const FINNHUB_KEY_VAR: &str = "FINNHUB_API_KEY";

pub const DEFAULT_MIN_MARKET_CAP: f64 = 1_000_000_000.0;
pub const DEFAULT_EVENT_CONCURRENCY: usize = 16;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub providers: ProvidersConfig,
    pub engine: EngineConfig,
    pub history: HistoryConfig,
}

impl AppConfig {
    /// Load from a TOML file, then apply environment overrides.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_toml(&content)?;
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML string. No environment overrides are applied.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Defaults plus environment overrides, for running without a file.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env();
        config
    }

    pub fn apply_env(&mut self) {
        self.apply_overrides(|name| std::env::var(name).ok());
    }

    /// Override API keys from a variable lookup. Empty values are ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = lookup(FMP_KEY_VAR).filter(|k| !k.trim().is_empty()) {
            self.providers.fmp_api_key = key;
        }
        if let Some(key) = lookup(FINNHUB_KEY_VAR).filter(|k| !k.trim().is_empty()) {
            self.providers.finnhub_api_key = key;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.providers.validate()?;
        self.engine.validate()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvidersConfig {
    pub fmp_base_url: String,
    pub fmp_api_key: String,
    pub finnhub_base_url: String,
    /// Empty disables the hour-code tiers.
    pub finnhub_api_key: String,
    pub timeout_secs: u64,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            fmp_base_url: fmp::DEFAULT_BASE_URL.to_string(),
            fmp_api_key: String::new(),
            finnhub_base_url: finnhub::DEFAULT_BASE_URL.to_string(),
            finnhub_api_key: String::new(),
            timeout_secs: 30,
        }
    }
}

impl ProvidersConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn hour_codes_enabled(&self) -> bool {
        !self.finnhub_api_key.trim().is_empty()
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "providers.timeout_secs must be positive".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub min_market_cap: f64,
    pub price_change_threshold: f64,
    pub profile_concurrency: usize,
    pub event_concurrency: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            min_market_cap: DEFAULT_MIN_MARKET_CAP,
            price_change_threshold: DEFAULT_SIGNIFICANCE_THRESHOLD,
            profile_concurrency: DEFAULT_PROFILE_CONCURRENCY,
            event_concurrency: DEFAULT_EVENT_CONCURRENCY,
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.profile_concurrency == 0 {
            return Err(ConfigError::Invalid(
                "engine.profile_concurrency must be positive".into(),
            ));
        }
        if self.event_concurrency == 0 {
            return Err(ConfigError::Invalid(
                "engine.event_concurrency must be positive".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.price_change_threshold) {
            return Err(ConfigError::Invalid(format!(
                "engine.price_change_threshold must be in [0, 1], got {}",
                self.price_change_threshold
            )));
        }
        // Records carry 4-decimal changes; a finer threshold could keep a
        // record whose stored change is below it.
        if !is_four_decimal(self.price_change_threshold) {
            return Err(ConfigError::Invalid(format!(
                "engine.price_change_threshold must have at most 4 decimals, got {}",
                self.price_change_threshold
            )));
        }
        if !self.min_market_cap.is_finite() || self.min_market_cap < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "engine.min_market_cap must be a non-negative number, got {}",
                self.min_market_cap
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    pub enabled: bool,
    pub dir: PathBuf,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            dir: PathBuf::from("history"),
        }
    }
}
