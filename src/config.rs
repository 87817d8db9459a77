use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8080";
pub const DEFAULT_API_PREFIX: &str = "/api/v1";
pub const DEFAULT_TIMEOUT_MS: u64 = 15_000;
pub const DEFAULT_FINANCE_TIMEOUT_MS: u64 = 30_000;
pub const DEFAULT_RETRY_ATTEMPTS: u32 = 3;
pub const DEFAULT_RETRY_DELAY_MS: u64 = 1_000;
pub const DEFAULT_BACKOFF_FACTOR: f64 = 2.0;
/// Upper bound for any single backoff delay.
pub const MAX_RETRY_DELAY_MS: u64 = 30_000;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
  pub api: ApiConfig,
  pub retry: RetryConfig,
  pub cache: CacheConfig,
  pub log: LogConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
  /// Backend origin, e.g. "https://dashboard.example.org"
  pub base_url: String,
  /// Version prefix appended to every endpoint path
  pub prefix: String,
  pub timeout_ms: u64,
  /// Finance endpoints aggregate a lot of data and get a longer timeout
  pub finance_timeout_ms: u64,
}

impl Default for ApiConfig {
  fn default() -> Self {
    Self {
      base_url: DEFAULT_BASE_URL.to_string(),
      prefix: DEFAULT_API_PREFIX.to_string(),
      timeout_ms: DEFAULT_TIMEOUT_MS,
      finance_timeout_ms: DEFAULT_FINANCE_TIMEOUT_MS,
    }
  }
}

impl ApiConfig {
  pub fn timeout(&self) -> Duration {
    Duration::from_millis(self.timeout_ms)
  }

  pub fn finance_timeout(&self) -> Duration {
    Duration::from_millis(self.finance_timeout_ms)
  }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
  /// Additional attempts after the first one
  pub attempts: u32,
  pub delay_ms: u64,
  pub backoff_factor: f64,
  pub max_delay_ms: u64,
}

impl Default for RetryConfig {
  fn default() -> Self {
    Self {
      attempts: DEFAULT_RETRY_ATTEMPTS,
      delay_ms: DEFAULT_RETRY_DELAY_MS,
      backoff_factor: DEFAULT_BACKOFF_FACTOR,
      max_delay_ms: MAX_RETRY_DELAY_MS,
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
  pub enabled: bool,
  /// Seconds before a cached list is refetched
  pub stale_secs: u64,
  /// Defaults to $XDG_DATA_HOME/orgdash/cache.db
  pub path: Option<PathBuf>,
}

impl Default for CacheConfig {
  fn default() -> Self {
    Self {
      enabled: true,
      stale_secs: 300,
      path: None,
    }
  }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LogConfig {
  /// Write logs to a daily rolling file in this directory instead of stderr
  pub dir: Option<PathBuf>,
  /// Filter directive used when ORGDASH_LOG / RUST_LOG are unset
  pub level: Option<String>,
}

impl Config {
  /// Load configuration from file, then apply environment overrides.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./orgdash.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/orgdash/config.yaml
  ///
  /// Without any file the built-in defaults are used.
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(eyre!("Config file not found: {}", p.display()));
      }
    } else {
      Self::find_config_file()
    };

    let mut config = match path {
      Some(p) => Self::load_from_path(&p)?,
      None => Self::default(),
    };

    config.apply_env_overrides(|key| std::env::var(key).ok())?;
    Ok(config)
  }

  fn find_config_file() -> Option<PathBuf> {
    let local = PathBuf::from("orgdash.yaml");
    if local.exists() {
      return Some(local);
    }

    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("orgdash").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  pub fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    Self::from_yaml(&contents)
      .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))
  }

  pub fn from_yaml(contents: &str) -> Result<Self> {
    // An empty document deserializes to unit, not to an empty mapping
    if contents.trim().is_empty() {
      return Ok(Self::default());
    }
    Ok(serde_yaml::from_str(contents)?)
  }

  /// Override file values from environment variables.
  ///
  /// `lookup` is `std::env::var` in production and a map in tests.
  pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<()>
  where
    F: Fn(&str) -> Option<String>,
  {
    if let Some(url) = lookup("ORGDASH_API_URL").filter(|v| !v.is_empty()) {
      self.api.base_url = url;
    }
    if let Some(v) = lookup("ORGDASH_TIMEOUT_MS") {
      self.api.timeout_ms = parse_env("ORGDASH_TIMEOUT_MS", &v)?;
    }
    if let Some(v) = lookup("ORGDASH_FINANCE_TIMEOUT_MS") {
      self.api.finance_timeout_ms = parse_env("ORGDASH_FINANCE_TIMEOUT_MS", &v)?;
    }
    if let Some(v) = lookup("ORGDASH_RETRY_ATTEMPTS") {
      self.retry.attempts = parse_env("ORGDASH_RETRY_ATTEMPTS", &v)?;
    }
    if let Some(v) = lookup("ORGDASH_RETRY_DELAY_MS") {
      self.retry.delay_ms = parse_env("ORGDASH_RETRY_DELAY_MS", &v)?;
    }
    if let Some(v) = lookup("ORGDASH_BACKOFF_FACTOR") {
      self.retry.backoff_factor = parse_env("ORGDASH_BACKOFF_FACTOR", &v)?;
    }
    Ok(())
  }

  /// Base URL plus version prefix, without trailing slash.
  pub fn api_root(&self) -> String {
    format!(
      "{}/{}",
      self.api.base_url.trim_end_matches('/'),
      self.api.prefix.trim_matches('/')
    )
    .trim_end_matches('/')
    .to_string()
  }
}

fn parse_env<T: std::str::FromStr>(key: &str, value: &str) -> Result<T>
where
  T::Err: std::fmt::Display,
{
  value
    .trim()
    .parse()
    .map_err(|e| eyre!("Invalid value for {}: {:?} ({})", key, value, e))
}
