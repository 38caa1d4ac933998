//! CLI configuration.
//!
//! Sources, highest precedence first:
//! 1. Environment variables (`QLOWER_BACKEND`, `QLOWER_DEVICE`, `QLOWER_SHOTS`,
//!    `QLOWER_LOG_FORMAT`)
//! 2. Configuration file: `--config`, else `$QLOWER_CONFIG`, else
//!    `~/.qlower/config.yaml` when present
//! 3. Default values

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Console,
    /// One JSON object per event.
    Json,
}

impl FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "console" => Ok(LogFormat::Console),
            "json" => Ok(LogFormat::Json),
            other => anyhow::bail!("Unknown log format '{other}'. Available: console, json"),
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogFormat::Console => write!(f, "console"),
            LogFormat::Json => write!(f, "json"),
        }
    }
}

/// Settings applied when a command line leaves them out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Backend to compile for
    #[serde(default = "default_backend")]
    pub backend: String,

    /// Device of the configured backend
    #[serde(default)]
    pub device: Option<String>,

    /// Shots per `sample`
    #[serde(default = "default_shots")]
    pub shots: usize,

    /// Log output format
    #[serde(default)]
    pub log_format: LogFormat,
}

fn default_backend() -> String {
    "digital".to_string()
}

fn default_shots() -> usize {
    1000
}

impl Default for Config {
    fn default() -> Self {
        Config {
            backend: default_backend(),
            device: None,
            shots: default_shots(),
            log_format: LogFormat::default(),
        }
    }
}

impl Config {
    /// Resolve the configuration from file and environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let explicit = path
            .map(Path::to_path_buf)
            .or_else(|| std::env::var_os("QLOWER_CONFIG").map(PathBuf::from));

        let mut config = match explicit {
            Some(path) => Self::from_file(&path)?,
            None => match default_path() {
                Some(path) if path.exists() => Self::from_file(&path)?,
                _ => Config::default(),
            },
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Load configuration from a YAML file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Config = serde_yaml_ng::from_str(&contents)
            .with_context(|| format!("Invalid config file: {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Override fields from environment variables, looked up through `var`.
    pub fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(backend) = var("QLOWER_BACKEND") {
            self.backend = backend;
        }
        if let Some(device) = var("QLOWER_DEVICE") {
            self.device = (!device.is_empty()).then_some(device);
        }
        if let Some(shots) = var("QLOWER_SHOTS") {
            self.shots = shots
                .parse()
                .with_context(|| format!("QLOWER_SHOTS must be a positive integer, got '{shots}'"))?;
        }
        if let Some(format) = var("QLOWER_LOG_FORMAT") {
            self.log_format = format.parse()?;
        }
        self.validate()
    }

    fn validate(&self) -> Result<()> {
        if self.backend.is_empty() {
            anyhow::bail!("Configured backend must not be empty");
        }
        if self.shots == 0 {
            anyhow::bail!("Configured shot count must be positive");
        }
        Ok(())
    }
}

/// `~/.qlower/config.yaml`, if a home directory is known.
fn default_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".qlower").join("config.yaml"))
}
