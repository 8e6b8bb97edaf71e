use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{
    fs, io,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::{
    model::Coordinate,
    retry::{
        DEFAULT_BACKOFF_FACTOR, DEFAULT_INITIAL_DELAY, DEFAULT_MAX_ATTEMPTS, DEFAULT_TIMEOUT,
        FetcherSettings, RetryPolicy,
    },
};

pub const DEFAULT_BASE_URL: &str = "https://api.weather.gov";

/// Product token sent ahead of the version in the User-Agent.
const PRODUCT: &str = "nowcast";

/// Where to report conditions for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocationConfig {
    pub latitude: f64,
    pub longitude: f64,
    pub name: String,
}

impl Default for LocationConfig {
    fn default() -> Self {
        Self {
            latitude: 42.3834,
            longitude: -83.3527,
            name: "Livonia, Michigan".to_string(),
        }
    }
}

/// Which forecast document the points lookup should lead to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ForecastKind {
    /// Twelve-hour periods (`properties.forecast`).
    #[default]
    Standard,
    /// Hourly periods (`properties.forecastHourly`).
    Hourly,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub base_url: String,
    /// Per-attempt timeout.
    pub timeout_secs: u64,
    pub https_only: bool,
    pub forecast: ForecastKind,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT.as_secs(),
            https_only: true,
            forecast: ForecastKind::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub initial_delay_ms: u64,
    pub backoff_factor: u32,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            initial_delay_ms: DEFAULT_INITIAL_DELAY.as_millis() as u64,
            backoff_factor: DEFAULT_BACKOFF_FACTOR,
        }
    }
}

/// Top-level configuration stored on disk.
///
/// Example TOML:
/// ```toml
/// contact = "me@example.com"
///
/// [location]
/// latitude = 42.3834
/// longitude = -83.3527
/// name = "Livonia, Michigan"
///
/// [retry]
/// max_attempts = 3
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Contact put in the User-Agent; api.weather.gov asks every client for one.
    pub contact: String,
    pub location: LocationConfig,
    pub service: ServiceConfig,
    pub retry: RetryConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            contact: "nowcast@localhost".to_string(),
            location: LocationConfig::default(),
            service: ServiceConfig::default(),
            retry: RetryConfig::default(),
        }
    }
}

impl Config {
    /// `nowcast/<version> (<contact>)`
    pub fn user_agent(&self) -> String {
        format!("{PRODUCT}/{} ({})", env!("CARGO_PKG_VERSION"), self.contact)
    }

    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.location.latitude, self.location.longitude)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.retry.max_attempts,
            initial_delay: Duration::from_millis(self.retry.initial_delay_ms),
            backoff_factor: self.retry.backoff_factor,
        }
    }

    pub fn fetcher_settings(&self) -> FetcherSettings {
        FetcherSettings {
            user_agent: self.user_agent(),
            timeout: Duration::from_secs(self.service.timeout_secs),
            https_only: self.service.https_only,
            retry: self.retry_policy(),
        }
    }

    /// Base URL without a trailing slash.
    pub fn base_url(&self) -> &str {
        self.service.base_url.trim_end_matches('/')
    }

    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let cfg: Config = toml::from_str(contents).context("Failed to parse configuration")?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&self) -> Result<()> {
        let Coordinate { latitude, longitude } = self.coordinate();
        if !latitude.is_finite() || !longitude.is_finite() {
            return Err(anyhow!(
                "Location coordinates must be finite numbers (got {latitude}, {longitude})"
            ));
        }
        if self.contact.trim().is_empty() {
            return Err(anyhow!(
                "A contact is required for the User-Agent header.\n\
                 Hint: run `nowcast configure` first."
            ));
        }
        Ok(())
    }

    /// Read the config at its platform location; a missing file means defaults.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_file_path()?)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_file_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        match fs::read_to_string(path) {
            Ok(text) => Self::from_toml_str(&text)
                .with_context(|| format!("Invalid config at {}", path.display())),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e).with_context(|| format!("Cannot read {}", path.display())),
        }
    }

    /// Validates before writing so that a saved file always loads back.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        self.validate()?;
        let text = toml::to_string_pretty(self).context("Failed to encode configuration")?;

        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).with_context(|| format!("Cannot create {}", dir.display()))?;
        }
        fs::write(path, text).with_context(|| format!("Cannot write {}", path.display()))
    }

    pub fn config_file_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("dev", "nowcast", "nowcast")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }
}
