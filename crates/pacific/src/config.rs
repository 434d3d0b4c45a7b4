//! Server configuration
//!
//! Values are layered: field defaults, then an optional YAML file, then
//! command-line flags. Every flag can also come from a `PACIFIC_*`
//! environment variable.

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Looked up inside the data directory when no file is given explicitly
pub const CONFIG_FILE_NAME: &str = "config.yaml";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
  Memory,
  File,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
  #[serde(default = "default_bind")]
  pub bind: SocketAddr,
  /// Root for the file-backed lesson and profile stores
  #[serde(default = "default_data_dir")]
  pub data_dir: PathBuf,
  #[serde(default = "default_store")]
  pub store: StoreKind,
  /// Base URL of the Converse-style generation API
  #[serde(default = "default_endpoint")]
  pub endpoint: String,
  #[serde(default = "default_primary_model")]
  pub primary_model: String,
  /// Lightweight model used for the simplified retry
  #[serde(default = "default_fallback_model")]
  pub fallback_model: String,
  /// Name of the environment variable holding the API key
  #[serde(default = "default_api_key_env")]
  pub api_key_env: String,
  #[serde(default = "default_timeout_secs")]
  pub timeout_secs: u64,
  /// Off by default so generation failures reach the client with their own code
  #[serde(default)]
  pub fallback_enabled: bool,
  #[serde(default = "default_true")]
  pub validate_content: bool,
  /// 0 disables the background sweeper
  #[serde(default = "default_sweep_interval_secs")]
  pub sweep_interval_secs: u64,
}

fn default_bind() -> SocketAddr {
  SocketAddr::from(([127, 0, 0, 1], 3000))
}
fn default_data_dir() -> PathBuf {
  dirs::home_dir().unwrap_or_else(|| PathBuf::from("/tmp")).join(".pacific")
}
fn default_store() -> StoreKind {
  StoreKind::File
}
fn default_endpoint() -> String {
  "https://bedrock-runtime.us-east-1.amazonaws.com".to_string()
}
fn default_primary_model() -> String {
  "amazon.nova-pro-v1:0".to_string()
}
fn default_fallback_model() -> String {
  "amazon.nova-lite-v1:0".to_string()
}
fn default_api_key_env() -> String {
  "PACIFIC_API_KEY".to_string()
}
fn default_timeout_secs() -> u64 {
  60
}
fn default_true() -> bool {
  true
}
fn default_sweep_interval_secs() -> u64 {
  3600
}

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      bind: default_bind(),
      data_dir: default_data_dir(),
      store: default_store(),
      endpoint: default_endpoint(),
      primary_model: default_primary_model(),
      fallback_model: default_fallback_model(),
      api_key_env: default_api_key_env(),
      timeout_secs: default_timeout_secs(),
      fallback_enabled: false,
      validate_content: true,
      sweep_interval_secs: default_sweep_interval_secs(),
    }
  }
}

impl ServerConfig {
  pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)
      .with_context(|| format!("failed to read config file {}", path.display()))?;
    let config: ServerConfig = serde_yaml::from_str(&content)
      .with_context(|| format!("invalid config file {}", path.display()))?;
    Ok(config)
  }

  /// Load the given file, or `~/.pacific/config.yaml` if present, or defaults
  pub fn load(explicit: Option<&Path>) -> Result<Self> {
    if let Some(path) = explicit {
      return Self::load_from_file(path);
    }

    let fallback = default_data_dir().join(CONFIG_FILE_NAME);
    if fallback.exists() {
      return Self::load_from_file(fallback);
    }

    Ok(Self::default())
  }

  pub fn lessons_dir(&self) -> PathBuf {
    self.data_dir.join("lessons")
  }

  pub fn profiles_dir(&self) -> PathBuf {
    self.data_dir.join("profiles")
  }

  pub fn timeout(&self) -> Duration {
    Duration::from_secs(self.timeout_secs)
  }

  pub fn sweep_interval(&self) -> Option<Duration> {
    (self.sweep_interval_secs > 0).then(|| Duration::from_secs(self.sweep_interval_secs))
  }

  /// API key read from the configured environment variable, if set
  pub fn api_key(&self) -> Option<String> {
    std::env::var(&self.api_key_env).ok().filter(|key| !key.is_empty())
  }
}

/// Command-line overrides for [`ServerConfig`]
#[derive(Args, Debug, Clone, Default)]
pub struct ServerArgs {
  /// YAML configuration file
  #[arg(long, env = "PACIFIC_CONFIG")]
  pub config: Option<PathBuf>,

  /// Server bind address
  #[arg(long, env = "PACIFIC_BIND")]
  pub bind: Option<SocketAddr>,

  /// Directory for persisted lessons and profiles
  #[arg(long, env = "PACIFIC_DATA_DIR")]
  pub data_dir: Option<PathBuf>,

  /// Lesson and profile storage backend
  #[arg(long, value_enum, env = "PACIFIC_STORE")]
  pub store: Option<StoreKind>,

  /// Generation API base URL
  #[arg(long, env = "PACIFIC_ENDPOINT")]
  pub endpoint: Option<String>,

  #[arg(long, env = "PACIFIC_PRIMARY_MODEL")]
  pub primary_model: Option<String>,

  #[arg(long, env = "PACIFIC_FALLBACK_MODEL")]
  pub fallback_model: Option<String>,

  /// Environment variable to read the API key from
  #[arg(long, env = "PACIFIC_API_KEY_ENV")]
  pub api_key_env: Option<String>,

  /// Generation timeout in seconds
  #[arg(long, env = "PACIFIC_TIMEOUT_SECS")]
  pub timeout_secs: Option<u64>,

  #[arg(long, env = "PACIFIC_FALLBACK_ENABLED")]
  pub fallback_enabled: Option<bool>,

  #[arg(long, env = "PACIFIC_VALIDATE_CONTENT")]
  pub validate_content: Option<bool>,

  /// Seconds between expiry sweeps, 0 to disable
  #[arg(long, env = "PACIFIC_SWEEP_INTERVAL_SECS")]
  pub sweep_interval_secs: Option<u64>,
}

impl ServerArgs {
  pub fn apply(&self, config: &mut ServerConfig) {
    if let Some(bind) = self.bind {
      config.bind = bind;
    }
    if let Some(dir) = &self.data_dir {
      config.data_dir = dir.clone();
    }
    if let Some(store) = self.store {
      config.store = store;
    }
    if let Some(endpoint) = &self.endpoint {
      config.endpoint = endpoint.clone();
    }
    if let Some(model) = &self.primary_model {
      config.primary_model = model.clone();
    }
    if let Some(model) = &self.fallback_model {
      config.fallback_model = model.clone();
    }
    if let Some(var) = &self.api_key_env {
      config.api_key_env = var.clone();
    }
    if let Some(secs) = self.timeout_secs {
      config.timeout_secs = secs;
    }
    if let Some(enabled) = self.fallback_enabled {
      config.fallback_enabled = enabled;
    }
    if let Some(enabled) = self.validate_content {
      config.validate_content = enabled;
    }
    if let Some(secs) = self.sweep_interval_secs {
      config.sweep_interval_secs = secs;
    }
  }

  pub fn resolve(&self) -> Result<ServerConfig> {
    let mut config = ServerConfig::load(self.config.as_deref())?;
    self.apply(&mut config);
    Ok(config)
  }
}
