//! Configuration management for rentcache
//!
//! Loads configuration with priority:
//! 1. Specified config file
//! 2. rentcache.toml in the current directory or a parent
//! 3. Defaults (when embedding, via `RentCacheConfig::default()`)

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Name of the file searched for by [`RentCacheConfig::load`].
pub const CONFIG_FILE_NAME: &str = "rentcache.toml";

/// rentcache configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RentCacheConfig {
    #[serde(default)]
    pub limits: LimitsConfig,

    #[serde(default)]
    pub preferences: PreferencesConfig,

    #[serde(default)]
    pub persistence: PersistenceConfig,

    #[serde(default)]
    pub observability: ObservabilityConfig,
}

/// Retention caps for the bounded logs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitsConfig {
    /// Messages kept per session
    #[serde(default = "default_max_messages")]
    pub max_messages: usize,

    /// Search queries kept per session
    #[serde(default = "default_max_search_history")]
    pub max_search_history: usize,

    /// Agent thoughts kept process-wide
    #[serde(default = "default_max_thoughts")]
    pub max_thoughts: usize,
}

/// Defaults for newly created preference profiles and the widening rule
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreferencesConfig {
    /// Amount added beyond a liked product's price when widening the range
    #[serde(default = "default_price_margin")]
    pub price_margin: f64,

    #[serde(default = "default_min_price")]
    pub default_min_price: f64,

    #[serde(default = "default_max_price")]
    pub default_max_price: f64,

    #[serde(default = "default_language")]
    pub default_language: String,
}

/// Snapshot persistence configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistenceConfig {
    #[serde(default = "default_flush_interval_secs")]
    pub flush_interval_secs: u64,

    /// Snapshot file (can reference env var with ${VAR_NAME})
    pub snapshot_path: Option<String>,

    #[serde(default = "default_stale_after_days")]
    pub stale_after_days: i64,
}

/// Observability configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// `EnvFilter` directive, e.g. "rentcache_memory=debug". Falls back to RUST_LOG.
    pub log_filter: Option<String>,

    #[serde(default)]
    pub json_logs: bool,

    pub service_name: Option<String>,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_messages: default_max_messages(),
            max_search_history: default_max_search_history(),
            max_thoughts: default_max_thoughts(),
        }
    }
}

impl Default for PreferencesConfig {
    fn default() -> Self {
        Self {
            price_margin: default_price_margin(),
            default_min_price: default_min_price(),
            default_max_price: default_max_price(),
            default_language: default_language(),
        }
    }
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            flush_interval_secs: default_flush_interval_secs(),
            snapshot_path: None,
            stale_after_days: default_stale_after_days(),
        }
    }
}

impl RentCacheConfig {
    /// Load configuration from rentcache.toml, searching the current
    /// directory and its parents
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration from a specific file
    pub fn load_from(path: Option<&Path>) -> Result<Self> {
        let config_path = if let Some(p) = path {
            p.to_path_buf()
        } else {
            Self::find_config_file()?
        };

        tracing::debug!("Loading configuration from: {:?}", config_path);

        let contents = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {:?}", config_path))?;

        Self::from_toml_str(&contents)
            .with_context(|| format!("Failed to parse config file: {:?}", config_path))
    }

    /// Parse, resolve env references and validate a TOML document
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let mut config: RentCacheConfig = toml::from_str(contents)?;
        config.resolve_env_vars();
        config.validate()?;
        Ok(config)
    }

    /// Test-friendly defaults: short flush interval, no snapshot file
    pub fn test_defaults() -> Self {
        Self {
            persistence: PersistenceConfig {
                flush_interval_secs: 1,
                ..PersistenceConfig::default()
            },
            ..Self::default()
        }
    }

    /// Find rentcache.toml by searching current directory and parents
    fn find_config_file() -> Result<PathBuf> {
        let mut current = env::current_dir()?;

        loop {
            let config_path = current.join(CONFIG_FILE_NAME);
            if config_path.exists() {
                return Ok(config_path);
            }

            if !current.pop() {
                break;
            }
        }

        Err(anyhow!("{} not found in the current directory or its parents", CONFIG_FILE_NAME))
    }

    /// Resolve ${VAR_NAME} references to environment variables
    fn resolve_env_vars(&mut self) {
        if let Some(ref path) = self.persistence.snapshot_path {
            self.persistence.snapshot_path = Self::resolve_env_var(path);
        }

        if let Some(ref name) = self.observability.service_name {
            if let Some(resolved) = Self::resolve_env_var(name) {
                self.observability.service_name = Some(resolved);
            }
        }
    }

    /// Resolve a single ${VAR_NAME} reference
    fn resolve_env_var(value: &str) -> Option<String> {
        if value.starts_with("${") && value.ends_with('}') {
            let var_name = &value[2..value.len() - 1];
            env::var(var_name).ok()
        } else {
            Some(value.to_string())
        }
    }

    /// Reject settings the cache cannot run with
    pub fn validate(&self) -> Result<()> {
        let limits = &self.limits;
        if limits.max_messages == 0 || limits.max_search_history == 0 || limits.max_thoughts == 0 {
            return Err(anyhow!("limits must all be greater than zero"));
        }
        if self.persistence.flush_interval_secs == 0 {
            return Err(anyhow!("persistence.flush_interval_secs must be greater than zero"));
        }
        if self.persistence.stale_after_days < 0 {
            return Err(anyhow!("persistence.stale_after_days must not be negative"));
        }
        let prefs = &self.preferences;
        if prefs.price_margin < 0.0 {
            return Err(anyhow!("preferences.price_margin must not be negative"));
        }
        if prefs.default_min_price > prefs.default_max_price {
            return Err(anyhow!(
                "preferences.default_min_price ({}) exceeds default_max_price ({})",
                prefs.default_min_price,
                prefs.default_max_price
            ));
        }
        Ok(())
    }

    pub fn flush_interval(&self) -> Duration {
        Duration::from_secs(self.persistence.flush_interval_secs)
    }
}

fn default_max_messages() -> usize {
    50
}

fn default_max_search_history() -> usize {
    20
}

fn default_max_thoughts() -> usize {
    100
}

fn default_price_margin() -> f64 {
    500.0
}

fn default_min_price() -> f64 {
    0.0
}

fn default_max_price() -> f64 {
    10_000.0
}

fn default_language() -> String {
    "en".to_string()
}

fn default_flush_interval_secs() -> u64 {
    30
}

fn default_stale_after_days() -> i64 {
    30
}
