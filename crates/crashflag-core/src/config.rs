//! Configuration management
//!
//! Handles loading and saving the crashflag configuration file.

use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::signal::FatalSignal;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Read(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Config directory not found")]
    NoConfigDir,
}

/// Main configuration struct
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct CrashConfig {
    /// Directory for the crash marker (None = platform cache dir)
    pub marker_dir: Option<PathBuf>,
    /// Handler settings
    pub handler: HandlerConfig,
    /// Flag monitor settings
    pub monitor: MonitorConfig,
    /// Watchdog settings
    pub watchdog: WatchdogConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HandlerConfig {
    /// Signals to record
    pub signals: Vec<FatalSignal>,
}

impl Default for HandlerConfig {
    fn default() -> Self {
        Self {
            signals: vec![FatalSignal::Segv],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// How often the flag is polled
    pub poll_interval_ms: u64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 50,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchdogConfig {
    /// Restarts allowed after signal deaths before giving up
    pub max_restarts: u32,
    /// Pause before relaunching a crashed process
    pub restart_delay_ms: u64,
}

impl Default for WatchdogConfig {
    fn default() -> Self {
        Self {
            max_restarts: 5,
            restart_delay_ms: 100,
        }
    }
}

impl CrashConfig {
    /// Marker file location honoring `marker_dir`
    #[cfg(unix)]
    pub fn marker_path(&self) -> PathBuf {
        match self.marker_dir {
            Some(ref dir) => dir.join(crate::marker::MARKER_FILE_NAME),
            None => crate::marker::crash_marker_path(),
        }
    }
}

/// Get the config directory
pub fn config_dir() -> Option<PathBuf> {
    ProjectDirs::from("com", "crashflag", "crashflag").map(|p| p.config_dir().to_path_buf())
}

/// Get the config file path
pub fn config_path() -> Option<PathBuf> {
    config_dir().map(|p| p.join("config.toml"))
}

/// Load configuration from the platform config dir
pub fn load_config() -> Result<CrashConfig, ConfigError> {
    let path = config_path().ok_or(ConfigError::NoConfigDir)?;
    load_config_from(&path)
}

/// Load configuration from a file, defaulting when it does not exist
pub fn load_config_from(path: &Path) -> Result<CrashConfig, ConfigError> {
    if !path.exists() {
        log::debug!("No config at {}, using defaults", path.display());
        return Ok(CrashConfig::default());
    }

    let content = std::fs::read_to_string(path)?;
    let config: CrashConfig = toml::from_str(&content)?;
    Ok(config)
}

/// Save configuration to a file
pub fn save_config_to(path: &Path, config: &CrashConfig) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, &content)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o600);
        std::fs::set_permissions(path, perms)?;
    }

    Ok(())
}
