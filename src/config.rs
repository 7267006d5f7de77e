/*!
 * Configuration types for artship
 */

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::core::copier::{CopyOptions, DEFAULT_CHUNK_SIZE};
use crate::core::session::DEFAULT_MILESTONE_UNIT;
use crate::error::{ArtshipError, Result};
use crate::protocol::ftp::FileType;

/// Main configuration for transfers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferConfig {
    /// Bytes read per copy iteration
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Bytes per progress milestone
    #[serde(default = "default_milestone_unit")]
    pub milestone_unit: u64,

    /// Show a terminal progress bar instead of milestone log lines
    #[serde(default)]
    pub show_progress: bool,

    #[serde(default)]
    pub log_level: LogLevel,

    /// Log file path (None = stdout)
    #[serde(default)]
    pub log_file: Option<PathBuf>,

    /// Shorthand for log_level = debug
    #[serde(default)]
    pub verbose: bool,

    /// Retries after the first attempt of a network transfer
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,

    #[serde(default = "default_retry_delay")]
    pub retry_delay_secs: u64,

    #[serde(default = "default_true")]
    pub exponential_backoff: bool,

    #[serde(default)]
    pub ftp: FtpConfig,

    #[serde(default)]
    pub repository: RepositoryConfig,

    #[serde(default)]
    pub http: HttpConfig,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            milestone_unit: default_milestone_unit(),
            show_progress: false,
            log_level: LogLevel::Info,
            log_file: None,
            verbose: false,
            retry_attempts: default_retry_attempts(),
            retry_delay_secs: default_retry_delay(),
            exponential_backoff: true,
            ftp: FtpConfig::default(),
            repository: RepositoryConfig::default(),
            http: HttpConfig::default(),
        }
    }
}

/// FTP connection settings, used when a URL carries no credentials
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FtpConfig {
    #[serde(default = "default_ftp_user")]
    pub username: String,

    #[serde(default = "default_ftp_password")]
    pub password: String,

    #[serde(default)]
    pub file_type: FileType,

    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    #[serde(default = "default_read_timeout")]
    pub read_timeout_secs: u64,
}

impl Default for FtpConfig {
    fn default() -> Self {
        Self {
            username: default_ftp_user(),
            password: default_ftp_password(),
            file_type: FileType::default(),
            connect_timeout_secs: default_connect_timeout(),
            read_timeout_secs: default_read_timeout(),
        }
    }
}

/// Where artifacts are resolved from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepositoryConfig {
    /// Local repository root
    #[serde(default = "default_local_repository")]
    pub local: PathBuf,

    /// Remote repository base URLs, tried in order
    #[serde(default)]
    pub remotes: Vec<String>,

    /// Never touch the network
    #[serde(default)]
    pub offline: bool,
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            local: default_local_repository(),
            remotes: Vec::new(),
            offline: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_read_timeout")]
    pub timeout_secs: u64,

    #[serde(default)]
    pub username: Option<String>,

    #[serde(default)]
    pub password: Option<String>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_read_timeout(),
            username: None,
            password: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn to_tracing_level(&self) -> tracing::Level {
        match self {
            LogLevel::Error => tracing::Level::ERROR,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Trace => tracing::Level::TRACE,
        }
    }
}

// Default value functions for serde
fn default_true() -> bool {
    true
}

fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}

fn default_milestone_unit() -> u64 {
    DEFAULT_MILESTONE_UNIT
}

fn default_retry_attempts() -> u32 {
    3
}

fn default_retry_delay() -> u64 {
    2
}

fn default_ftp_user() -> String {
    "anonymous".to_string()
}

fn default_ftp_password() -> String {
    "artship@".to_string()
}

fn default_connect_timeout() -> u64 {
    30
}

fn default_read_timeout() -> u64 {
    300
}

fn default_local_repository() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".m2")
        .join("repository")
}

impl TransferConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            ArtshipError::Config(format!("Cannot read {}: {}", path.display(), e))
        })?;
        toml::from_str(&contents)
            .map_err(|e| ArtshipError::Config(format!("Invalid config {}: {}", path.display(), e)))
    }

    pub fn to_file(&self, path: &Path) -> Result<()> {
        let contents =
            toml::to_string_pretty(self).map_err(|e| ArtshipError::Config(e.to_string()))?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Effective log level, with `verbose` promoting to debug
    pub fn effective_log_level(&self) -> LogLevel {
        if self.verbose && self.log_level != LogLevel::Trace {
            LogLevel::Debug
        } else {
            self.log_level
        }
    }

    /// Copier options derived from this configuration
    pub fn copy_options(&self) -> CopyOptions {
        CopyOptions::default()
            .with_chunk_size(self.chunk_size)
            .with_milestone_unit(self.milestone_unit)
    }
}
