//! Configuration loading from TOML files

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;
use sparkify_core::{Credentials, ParseMode};
use sparkify_etl::TimeZoneMode;

/// Global configuration for sparkify
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub input: InputConfig,
    pub output: OutputConfig,
    pub credentials: Option<CredentialsConfig>,
    pub transform: TransformConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    pub root: String,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            root: "./data/input".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub root: String,
    pub compression_level: i32,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            root: "./data/output".to_string(),
            compression_level: 3,
        }
    }
}

/// Object-store key pair. Values may reference the environment as `${VAR}`.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct CredentialsConfig {
    #[serde(deserialize_with = "deserialize_env_var")]
    pub access_key_id: Option<String>,
    #[serde(deserialize_with = "deserialize_env_var")]
    pub secret_access_key: Option<String>,
}

impl CredentialsConfig {
    /// Both keys, or `None` when either is missing after expansion.
    pub fn resolve(&self) -> Option<Credentials> {
        Some(Credentials {
            access_key_id: self.access_key_id.clone()?,
            secret_access_key: self.secret_access_key.clone()?,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TransformConfig {
    pub timezone: TimeZoneMode,
    pub parse_mode: ParseMode,
    pub workers: usize,
}

impl Default for TransformConfig {
    fn default() -> Self {
        let cpus = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(4);
        Self {
            timezone: TimeZoneMode::Utc,
            parse_mode: ParseMode::FailFast,
            workers: cpus.min(8),
        }
    }
}

/// Deserialize a string that may contain environment variable reference like ${VAR}
fn deserialize_env_var<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let opt: Option<String> = Option::deserialize(deserializer)?;
    Ok(opt.and_then(|s| expand_env_var(&s)))
}

/// Expand ${VAR} to environment variable value
fn expand_env_var(s: &str) -> Option<String> {
    match s.strip_prefix("${").and_then(|s| s.strip_suffix('}')) {
        Some(var_name) => std::env::var(var_name).ok().filter(|v| !v.is_empty()),
        None => Some(s.to_string()),
    }
}

impl Config {
    /// Load configuration from default locations
    ///
    /// Search order:
    /// 1. ./sparkify.toml (current directory)
    /// 2. ~/.config/sparkify/config.toml
    ///
    /// If no config file found, returns default config.
    pub fn load() -> Result<Self> {
        let local_config = PathBuf::from("sparkify.toml");
        if local_config.exists() {
            return Self::from_file(&local_config);
        }

        if let Some(config_dir) = directories::ProjectDirs::from("", "", "sparkify") {
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

    pub fn credentials(&self) -> Option<Credentials> {
        self.credentials.as_ref().and_then(CredentialsConfig::resolve)
    }
}
