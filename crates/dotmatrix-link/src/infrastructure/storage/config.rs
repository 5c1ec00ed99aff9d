//! TOML-based settings persistence for the display link.
//!
//! Reads and writes [`LinkSettings`] to the platform-appropriate config file:
//! - Windows:  `%APPDATA%\DotMatrix\link.toml`
//! - Linux:    `~/.config/dotmatrix/link.toml`
//! - macOS:    `~/Library/Application Support/DotMatrix/link.toml`
//!
//! Example file:
//!
//! ```toml
//! [device]
//! host = "192.168.4.1"
//! port = 9000
//!
//! [link]
//! connect_timeout_ms = 3000
//! response_timeout_ms = 5000
//! keep_alive_interval_ms = 20000
//! status_clear_ms = 5000
//!
//! [discovery]
//! port = 5578
//! bind_address = "0.0.0.0"
//! timeout_ms = 45000
//!
//! [logging]
//! level = "info"
//! ```
//!
//! # Serde default values
//!
//! Every field has a `#[serde(default = "...")]` helper, so a missing file,
//! a missing section, or a file written by an older version all load cleanly.

use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use dotmatrix_core::ConnectionEndpoint;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::infrastructure::network::connection_manager::LinkTimings;

/// Error type for settings file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The platform config directory could not be determined.
    #[error("could not determine platform config directory")]
    NoPlatformConfigDir,

    /// A file system I/O error occurred.
    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// The settings could not be serialized to TOML.
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// `device.host` is not an IP address.
    #[error("invalid device host '{0}'")]
    InvalidHost(String),
}

// ── Settings schema ───────────────────────────────────────────────────────────

/// Top-level settings stored on disk.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct LinkSettings {
    #[serde(default)]
    pub device: DeviceConfig,
    #[serde(default)]
    pub link: LinkConfig,
    #[serde(default)]
    pub discovery: DiscoveryConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Statically known display endpoint.  Both fields are absent until the user
/// configures them or saves a discovery result.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DeviceConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
}

impl DeviceConfig {
    /// Returns the configured endpoint, or `None` if host or port is missing.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidHost`] if `host` is not an IP address.
    pub fn endpoint(&self) -> Result<Option<ConnectionEndpoint>, ConfigError> {
        let (Some(host), Some(port)) = (&self.host, self.port) else {
            return Ok(None);
        };
        let address: IpAddr = host
            .parse()
            .map_err(|_| ConfigError::InvalidHost(host.clone()))?;
        Ok(Some(ConnectionEndpoint::new(address, port)))
    }

    /// Stores `endpoint` as the static device address.
    pub fn set_endpoint(&mut self, endpoint: ConnectionEndpoint) {
        self.host = Some(endpoint.socket_addr().ip().to_string());
        self.port = Some(endpoint.port);
    }
}

/// Connection timeouts, all in milliseconds.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LinkConfig {
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    #[serde(default = "default_response_timeout_ms")]
    pub response_timeout_ms: u64,
    #[serde(default = "default_keep_alive_interval_ms")]
    pub keep_alive_interval_ms: u64,
    #[serde(default = "default_status_clear_ms")]
    pub status_clear_ms: u64,
}

impl LinkConfig {
    /// Converts the millisecond settings into connection manager timings.
    pub fn timings(&self) -> LinkTimings {
        LinkTimings {
            connect_timeout: Duration::from_millis(self.connect_timeout_ms),
            response_timeout: Duration::from_millis(self.response_timeout_ms),
            keep_alive_interval: Duration::from_millis(self.keep_alive_interval_ms),
            status_clear: Duration::from_millis(self.status_clear_ms),
        }
    }
}

/// UDP discovery listener settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DiscoveryConfig {
    #[serde(default = "default_discovery_port")]
    pub port: u16,
    /// IP address to bind to.  `"0.0.0.0"` listens on all interfaces.
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    #[serde(default = "default_discovery_timeout_ms")]
    pub timeout_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfig {
    /// `tracing` level: `"error"`, `"warn"`, `"info"`, `"debug"`, `"trace"`.
    #[serde(default = "default_log_level")]
    pub level: String,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_connect_timeout_ms() -> u64 {
    3000
}
fn default_response_timeout_ms() -> u64 {
    5000
}
fn default_keep_alive_interval_ms() -> u64 {
    20_000
}
fn default_status_clear_ms() -> u64 {
    5000
}
fn default_discovery_port() -> u16 {
    5578
}
fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}
fn default_discovery_timeout_ms() -> u64 {
    45_000
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            connect_timeout_ms: default_connect_timeout_ms(),
            response_timeout_ms: default_response_timeout_ms(),
            keep_alive_interval_ms: default_keep_alive_interval_ms(),
            status_clear_ms: default_status_clear_ms(),
        }
    }
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            port: default_discovery_port(),
            bind_address: default_bind_address(),
            timeout_ms: default_discovery_timeout_ms(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

// ── Settings repository ───────────────────────────────────────────────────────

/// Resolves the full path to the settings file.
///
/// # Errors
///
/// Returns [`ConfigError::NoPlatformConfigDir`] if the base directory cannot be
/// determined from the environment.
pub fn config_file_path() -> Result<PathBuf, ConfigError> {
    platform_config_dir()
        .map(|dir| dir.join("link.toml"))
        .ok_or(ConfigError::NoPlatformConfigDir)
}

/// Loads settings from `path`, returning defaults if the file does not exist.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system errors other than "not found",
/// and [`ConfigError::Parse`] if the TOML is malformed.
pub fn load_settings_from(path: &Path) -> Result<LinkSettings, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(toml::from_str(&content)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(LinkSettings::default()),
        Err(source) => Err(ConfigError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Writes `settings` to `path`, creating parent directories as needed.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system failures or
/// [`ConfigError::Serialize`] if serialization fails.
pub fn save_settings_to(path: &Path, settings: &LinkSettings) -> Result<(), ConfigError> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(|source| ConfigError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
    }

    let content = toml::to_string_pretty(settings)?;
    std::fs::write(path, content).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn platform_config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        std::env::var_os("APPDATA").map(|p| PathBuf::from(p).join("DotMatrix"))
    }

    #[cfg(target_os = "macos")]
    {
        std::env::var_os("HOME").map(|h| {
            PathBuf::from(h)
                .join("Library")
                .join("Application Support")
                .join("DotMatrix")
        })
    }

    #[cfg(not(any(target_os = "windows", target_os = "macos")))]
    {
        // XDG_CONFIG_HOME or ~/.config
        let base = std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))?;
        Some(base.join("dotmatrix"))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
