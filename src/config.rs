//! Configuration for the mldeck tools.
//!
//! Stored in a TOML file at `<workspace>/config/config.toml`, where the workspace is
//!   `$MLDECK_HOME` when set, otherwise
//!   `%APPDATA%/mldeck` on Windows,
//!   `$XDG_DATA_HOME/mldeck` on Linux,
//!   `~/Library/Application Support/mldeck` on macOS.
//!
//! A missing file means defaults. CLI flags override config values per run.

use crate::discovery::MediaType;
use anyhow::{Context, Result};
use directories::BaseDirs;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::PathBuf;

/// Environment variable overriding the workspace root.
pub const HOME_ENV: &str = "MLDECK_HOME";

/// File name of the config inside `<workspace>/config`.
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Root configuration persisted per installation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct AppConfig {
    /// Remote endpoints and politeness settings.
    #[serde(default)]
    pub network: NetworkSettings,
    /// Defaults used when a fetch-spec row and the CLI leave a knob blank.
    #[serde(default)]
    pub sampling: SamplingDefaults,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkSettings {
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Pause before every catalog request.
    #[serde(default = "default_request_delay_ms")]
    pub request_delay_ms: u64,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_download_timeout_secs")]
    pub download_timeout_secs: u64,
    #[serde(default = "default_catalog_json_url")]
    pub catalog_json_url: String,
    #[serde(default = "default_catalog_html_url")]
    pub catalog_html_url: String,
    /// Asset download URL; `{ml_id}` is replaced by the asset identifier.
    #[serde(default = "default_cdn_url_template")]
    pub cdn_url_template: String,
}

impl Default for NetworkSettings {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            request_delay_ms: default_request_delay_ms(),
            timeout_secs: default_timeout_secs(),
            download_timeout_secs: default_download_timeout_secs(),
            catalog_json_url: default_catalog_json_url(),
            catalog_html_url: default_catalog_html_url(),
            cdn_url_template: default_cdn_url_template(),
        }
    }
}

impl NetworkSettings {
    pub fn asset_url(&self, ml_id: &str) -> String {
        self.cdn_url_template.replace("{ml_id}", ml_id.trim())
    }
}

fn default_user_agent() -> String {
    format!(
        "Mozilla/5.0 (compatible; mldeck/{}; +https://example.org)",
        env!("CARGO_PKG_VERSION")
    )
}

const fn default_request_delay_ms() -> u64 {
    700
}

const fn default_timeout_secs() -> u64 {
    30
}

const fn default_download_timeout_secs() -> u64 {
    60
}

fn default_catalog_json_url() -> String {
    "https://search.macaulaylibrary.org/catalog.json".into()
}

fn default_catalog_html_url() -> String {
    "https://search.macaulaylibrary.org/catalog".into()
}

fn default_cdn_url_template() -> String {
    "https://cdn.download.ams.birds.cornell.edu/api/v1/asset/{ml_id}".into()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SamplingDefaults {
    #[serde(default = "default_min_rating")]
    pub min_rating: f64,
    #[serde(default = "default_max_per_observer")]
    pub max_per_observer: usize,
    #[serde(default = "default_low_quality_frac")]
    pub low_quality_frac: f64,
    /// Seed for the run's random source.
    #[serde(default = "default_seed")]
    pub seed: u64,
    /// Catalog pages requested per species.
    #[serde(default = "default_pages")]
    pub pages: u32,
    /// Media kind used when `--media` is not given.
    #[serde(default)]
    pub media_type: MediaType,
}

impl Default for SamplingDefaults {
    fn default() -> Self {
        Self {
            min_rating: default_min_rating(),
            max_per_observer: default_max_per_observer(),
            low_quality_frac: default_low_quality_frac(),
            seed: default_seed(),
            pages: default_pages(),
            media_type: MediaType::default(),
        }
    }
}

const fn default_min_rating() -> f64 {
    3.5
}

const fn default_max_per_observer() -> usize {
    2
}

const fn default_low_quality_frac() -> f64 {
    0.3
}

const fn default_seed() -> u64 {
    42
}

const fn default_pages() -> u32 {
    5
}

/// Returns the root directory where mldeck keeps its config, logs and caches.
///
/// Order of precedence:
/// 1. `MLDECK_HOME` environment variable.
/// 2. OS-specific data directory via `directories::BaseDirs`.
pub fn workspace_root() -> Result<PathBuf> {
    if let Ok(path) = env::var(HOME_ENV) {
        return Ok(PathBuf::from(path));
    }
    let base_dirs = BaseDirs::new().context("Unable to determine OS data directory")?;
    Ok(base_dirs.data_dir().join("mldeck"))
}

pub fn config_dir() -> Result<PathBuf> {
    Ok(workspace_root()?.join("config"))
}

pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Directory holding the JSONL run logs.
pub fn logs_dir() -> Result<PathBuf> {
    Ok(workspace_root()?.join("logs"))
}

/// Loads the configuration from disk or returns defaults.
pub fn load_or_default() -> Result<AppConfig> {
    let path = config_file_path()?;
    if path.exists() {
        let data = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file {:?}", path))?;
        let cfg: AppConfig = toml::from_str(&data)
            .with_context(|| format!("Failed to parse config file {:?}", path))?;
        Ok(cfg)
    } else {
        Ok(AppConfig::default())
    }
}

/// Persists the configuration to disk.
pub fn save(config: &AppConfig) -> Result<PathBuf> {
    let dir = config_dir()?;
    fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create config directory {:?}", dir))?;
    let path = config_file_path()?;
    let data = toml::to_string_pretty(config)?;
    fs::write(&path, data).with_context(|| format!("Failed to write config file {:?}", path))?;
    Ok(path)
}
