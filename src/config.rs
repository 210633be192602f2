// src/config.rs

//! Tracker configuration.
//!
//! Layered with the `config` crate: built-in defaults, then an optional TOML
//! file, then `OZON_TRACKER__SECTION__KEY` environment variables.

use std::path::{Path, PathBuf};
use std::time::Duration;

use config::{Config, Environment, File};
use serde::Deserialize;

use crate::error::Result;
use crate::export::ExportFormat;

pub const DEFAULT_CONFIG_FILE: &str = "ozon_tracker.toml";
const ENV_PREFIX: &str = "OZON_TRACKER";

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                          (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
const ACCEPT: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8";
const ACCEPT_LANGUAGE: &str = "ru-RU,ru;q=0.8,en-US;q=0.5,en;q=0.3";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    pub scrape: ScrapeConfig,
    pub output: OutputConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScrapeConfig {
    pub base_url: String,
    pub search_path: String,
    pub user_agent: String,
    pub accept: String,
    pub accept_language: String,
    pub timeout_secs: u64,
    pub page_delay_ms: u64,
    pub default_pages: u32,
    pub default_category: String,
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            base_url: "https://www.ozon.ru".to_string(),
            search_path: "/search/".to_string(),
            user_agent: USER_AGENT.to_string(),
            accept: ACCEPT.to_string(),
            accept_language: ACCEPT_LANGUAGE.to_string(),
            timeout_secs: 10,
            page_delay_ms: 1000,
            default_pages: 3,
            default_category: "ноутбуки".to_string(),
        }
    }
}

impl ScrapeConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn page_delay(&self) -> Duration {
        Duration::from_millis(self.page_delay_ms)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub dir: PathBuf,
    pub charts_dir: PathBuf,
    pub formats: Vec<ExportFormat>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("."),
            charts_dir: PathBuf::from("charts"),
            formats: vec![
                ExportFormat::Xlsx,
                ExportFormat::Csv,
                ExportFormat::Tsv,
                ExportFormat::Json,
            ],
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub dir: PathBuf,
    pub file: String,
    pub file_enabled: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            dir: PathBuf::from("."),
            file: "ozon_tracker.log".to_string(),
            file_enabled: true,
        }
    }
}

impl TrackerConfig {
    /// Loads the layered configuration. An explicit `path` must exist; without
    /// one, `ozon_tracker.toml` in the working directory is used if present.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file = match path {
            Some(p) => File::from(p).required(true),
            None => File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };

        let cfg = Config::builder()
            .add_source(file)
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        Ok(cfg.try_deserialize()?)
    }
}
