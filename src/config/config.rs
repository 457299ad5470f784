// SPDX-License-Identifier: GPL-3.0-only
use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use crate::logging::LogFormat;

const ENV_PREFIX: &str = "FLATR_";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// URL of the catalog document
    #[serde(alias = "catalogEndpoint")]
    pub catalog_endpoint: String,

    /// Period of the background sync in minutes
    #[serde(alias = "syncIntervalMinutes")]
    pub sync_interval_minutes: u64,

    /// Ceiling for one catalog fetch in seconds
    #[serde(alias = "fetchTimeoutSeconds", alias = "fetch_timeout_seconds")]
    pub fetch_timeout_secs: u64,

    /// Where applications are installed, one directory each
    #[serde(alias = "installDir")]
    pub install_dir: PathBuf,

    /// Inventory, catalog cache and download scratch space
    #[serde(alias = "stateDir")]
    pub state_dir: PathBuf,

    /// Local API bind address (e.g., "127.0.0.1:8741")
    #[serde(alias = "localApiBind")]
    pub local_api_bind: SocketAddr,

    /// Logging level (trace, debug, info, warn, error)
    #[serde(alias = "logLevel")]
    pub log_level: String,

    /// "pretty" or "json"
    #[serde(alias = "logFormat")]
    pub log_format: LogFormat,

    /// Allow downloads from loopback and private network hosts
    #[serde(alias = "allowLocalSources")]
    pub allow_local_sources: bool,
}

impl Config {
    /// Load configuration from the TOML file named by `FLATR_CONFIG`
    /// (default `flatr.toml`), then apply `FLATR_*` environment overrides.
    pub fn load() -> anyhow::Result<Self> {
        let config_path = std::env::var("FLATR_CONFIG").unwrap_or_else(|_| "flatr.toml".to_string());

        let mut config = Self::from_file(Path::new(&config_path))?;
        config.apply_overrides(|key| std::env::var(format!("{}{}", ENV_PREFIX, key)).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Read a TOML file; a missing file yields the defaults.
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        toml::from_str(&contents).with_context(|| format!("Invalid config file: {}", path.display()))
    }

    /// Apply overrides; `lookup` receives the key without the `FLATR_` prefix.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<()> {
        if let Some(val) = lookup("CATALOG_ENDPOINT") {
            self.catalog_endpoint = val;
        }
        if let Some(val) = lookup("SYNC_INTERVAL_MINUTES") {
            self.sync_interval_minutes = val.parse().context("FLATR_SYNC_INTERVAL_MINUTES")?;
        }
        if let Some(val) = lookup("FETCH_TIMEOUT_SECS") {
            self.fetch_timeout_secs = val.parse().context("FLATR_FETCH_TIMEOUT_SECS")?;
        }
        if let Some(val) = lookup("INSTALL_DIR") {
            self.install_dir = PathBuf::from(val);
        }
        if let Some(val) = lookup("STATE_DIR") {
            self.state_dir = PathBuf::from(val);
        }
        if let Some(val) = lookup("LOCAL_API_BIND") {
            self.local_api_bind = SocketAddr::from_str(&val).context("FLATR_LOCAL_API_BIND")?;
        }
        if let Some(val) = lookup("LOG_LEVEL") {
            self.log_level = val;
        }
        if let Some(val) = lookup("LOG_FORMAT") {
            self.log_format = match val.to_ascii_lowercase().as_str() {
                "pretty" => LogFormat::Pretty,
                "json" => LogFormat::Json,
                other => bail!("FLATR_LOG_FORMAT must be pretty or json, got {}", other),
            };
        }
        if let Some(val) = lookup("ALLOW_LOCAL_SOURCES") {
            self.allow_local_sources = val.parse().context("FLATR_ALLOW_LOCAL_SOURCES")?;
        }
        Ok(())
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.sync_interval_minutes == 0 {
            bail!("sync_interval_minutes must be at least 1");
        }
        if self.fetch_timeout_secs == 0 {
            bail!("fetch_timeout_secs must be at least 1");
        }
        let endpoint = url::Url::parse(&self.catalog_endpoint)
            .with_context(|| format!("Invalid catalog_endpoint: {}", self.catalog_endpoint))?;
        if !matches!(endpoint.scheme(), "http" | "https") {
            bail!("catalog_endpoint must use http or https: {}", self.catalog_endpoint);
        }
        Ok(())
    }

    pub fn sync_interval(&self) -> Duration {
        Duration::from_secs(self.sync_interval_minutes * 60)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    pub fn inventory_path(&self) -> PathBuf {
        self.state_dir.join("inventory.json")
    }

    pub fn catalog_cache_path(&self) -> PathBuf {
        self.state_dir.join("catalog_cache.json")
    }

    pub fn download_dir(&self) -> PathBuf {
        self.state_dir.join("downloads")
    }
}

fn home_dir() -> PathBuf {
    std::env::var_os("HOME").map(PathBuf::from).unwrap_or_else(|| PathBuf::from("."))
}

impl Default for Config {
    fn default() -> Self {
        let home = home_dir();
        Self {
            catalog_endpoint: String::from(
                "https://raw.githubusercontent.com/JesusQuijada34/catalog/refs/heads/main/catalog.json",
            ),
            sync_interval_minutes: 20,
            fetch_timeout_secs: 20,
            install_dir: home.join("Documents").join("Flatr Apps"),
            state_dir: home.join(".flatr_store"),
            local_api_bind: SocketAddr::from(([127, 0, 0, 1], 8741)),
            log_level: String::from("info"),
            log_format: LogFormat::Pretty,
            allow_local_sources: false,
        }
    }
}
