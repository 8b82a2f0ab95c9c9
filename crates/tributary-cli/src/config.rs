//! Configuration loading from TOML files

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use tributary_core::ConflictRetry;
use tributary_domains::Domain;
use tributary_pipeline::{Target, Targets};
use tributary_warehouse::{DuckDbConnector, Loader, UpsertMode};

/// Global configuration for tributary
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub store: StoreConfig,
    pub warehouse: WarehouseConfig,
    pub producer: ProducerConfig,
    pub consumer: ConsumerConfig,
    pub finance: TargetConfig,
    pub healthcare: TargetConfig,
    pub ml: TargetConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Directory holding one subdirectory per bucket
    #[serde(deserialize_with = "deserialize_env_path")]
    pub root: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("./data/store"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WarehouseConfig {
    /// DuckDB database file
    #[serde(deserialize_with = "deserialize_env_path")]
    pub path: PathBuf,
    /// DuckDB memory limit (e.g. "2GB")
    #[serde(deserialize_with = "deserialize_env_var")]
    pub memory_limit: Option<String>,
    pub upsert_mode: UpsertMode,
    pub create_tables: bool,
}

impl Default for WarehouseConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./data/warehouse.duckdb"),
            memory_limit: None,
            upsert_mode: UpsertMode::default(),
            create_tables: true,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct ProducerConfig {
    pub interval_secs: u64,
    /// Producer cycles allowed to overlap
    pub max_inflight: usize,
    /// Retries after losing a conditional write
    pub conflict_retries: u32,
    pub conflict_backoff_ms: u64,
    pub compression_level: i32,
}

impl Default for ProducerConfig {
    fn default() -> Self {
        Self {
            interval_secs: 4,
            max_inflight: 4,
            conflict_retries: 3,
            conflict_backoff_ms: 50,
            compression_level: tributary_core::codec::DEFAULT_ZSTD_LEVEL,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct ConsumerConfig {
    pub interval_secs: u64,
}

impl Default for ConsumerConfig {
    fn default() -> Self {
        Self { interval_secs: 30 }
    }
}

/// Per-domain bucket/object override
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TargetConfig {
    pub bucket: Option<String>,
    pub object: Option<String>,
}

/// Deserialize a string that may contain environment variable reference like ${VAR}
fn deserialize_env_var<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let opt: Option<String> = Option::deserialize(deserializer)?;
    Ok(opt.and_then(|s| expand_env_var(&s)))
}

/// Like [`deserialize_env_var`], but the variable must be set.
fn deserialize_env_path<'de, D>(deserializer: D) -> Result<PathBuf, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    expand_env_var(&s)
        .map(PathBuf::from)
        .ok_or_else(|| serde::de::Error::custom(format!("environment variable in {s} is not set")))
}

/// Expand ${VAR} to environment variable value
fn expand_env_var(s: &str) -> Option<String> {
    if let Some(var_name) = s.strip_prefix("${").and_then(|s| s.strip_suffix('}')) {
        std::env::var(var_name).ok()
    } else {
        Some(s.to_string())
    }
}

impl Config {
    /// Load configuration from default locations
    ///
    /// Search order:
    /// 1. ./tributary.toml (current directory)
    /// 2. ~/.config/tributary/config.toml
    ///
    /// If no config file found, returns default config.
    pub fn load() -> Result<Self> {
        let local_config = PathBuf::from("tributary.toml");
        if local_config.exists() {
            return Self::from_file(&local_config);
        }

        if let Some(config_dir) = directories::ProjectDirs::from("", "", "tributary") {
            let user_config = config_dir.config_dir().join("config.toml");
            if user_config.exists() {
                return Self::from_file(&user_config);
            }
        }

        log::debug!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Load configuration from a specific file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        log::info!("Loaded config from {}", path.display());
        Ok(config)
    }

    fn target_config(&self, domain: Domain) -> &TargetConfig {
        match domain {
            Domain::Finance => &self.finance,
            Domain::Healthcare => &self.healthcare,
            Domain::Ml => &self.ml,
        }
    }

    /// Default targets with per-domain overrides applied.
    pub fn targets(&self) -> Targets {
        let mut targets = Targets::default();
        for domain in Domain::ALL {
            let over = self.target_config(domain);
            let base = Target::default_for(domain);
            targets.set(
                domain,
                Target::new(
                    over.bucket.clone().unwrap_or(base.bucket),
                    over.object.clone().unwrap_or(base.object),
                ),
            );
        }
        targets
    }

    pub fn conflict_retry(&self) -> ConflictRetry {
        ConflictRetry {
            max_retries: self.producer.conflict_retries,
            base_delay: Duration::from_millis(self.producer.conflict_backoff_ms),
        }
    }

    pub fn connector(&self) -> DuckDbConnector {
        let connector = DuckDbConnector::new(&self.warehouse.path);
        match &self.warehouse.memory_limit {
            Some(limit) => connector.with_memory_limit(limit.clone()),
            None => connector,
        }
    }

    pub fn loader(&self) -> Loader {
        Loader::new(Arc::new(self.connector()))
            .with_mode(self.warehouse.upsert_mode)
            .with_create_tables(self.warehouse.create_tables)
    }
}
