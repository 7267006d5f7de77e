/*!
 * Error types for Artship
 */

use std::fmt;
use std::io;
use std::path::PathBuf;

use crate::protocol::ftp::FtpError;

pub type Result<T> = std::result::Result<T, ArtshipError>;

/// Exit code constants for structured process exit
pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_PARTIAL: i32 = 1;
pub const EXIT_FATAL: i32 = 2;
pub const EXIT_INTEGRITY: i32 = 3;

#[derive(Debug)]
pub enum ArtshipError {
    /// Chunk size must be positive
    InvalidChunkSize(usize),

    /// Milestone unit must be positive
    InvalidMilestoneUnit(u64),

    /// Source file or directory not found
    SourceNotFound(PathBuf),

    /// Invalid path
    InvalidPath(PathBuf),

    /// Source and destination resolve to the same file
    SamePath { source: PathBuf, destination: PathBuf },

    /// File is not located under the given directory
    NotAChild { file: PathBuf, directory: PathBuf },

    /// File or directory could not be removed
    DeleteFailed(PathBuf),

    /// I/O error
    Io(io::Error),

    /// Configuration error
    Config(String),

    /// Protocol error (FTP replies, HTTP status, unsupported schemes)
    Protocol(String),

    /// Authentication error
    Authentication(String),

    /// Artifact could not be resolved
    Resolution(String),

    /// Deployment failed
    Deploy(String),

    /// Retries exhausted; carries the failure of the final attempt
    RetriesExhausted {
        attempts: u32,
        last_error: Box<ArtshipError>,
    },

    /// Checksum verification failed
    ChecksumMismatch { expected: String, actual: String },
}

impl ArtshipError {
    /// Get the process exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self.category() {
            ErrorCategory::Validation | ErrorCategory::Configuration | ErrorCategory::Security => {
                EXIT_FATAL
            }
            ErrorCategory::Integrity => EXIT_INTEGRITY,
            _ => EXIT_PARTIAL,
        }
    }

    /// Check if this error is fatal (should not retry)
    pub fn is_fatal(&self) -> bool {
        match self {
            ArtshipError::InvalidChunkSize(_) => true,
            ArtshipError::InvalidMilestoneUnit(_) => true,
            ArtshipError::SourceNotFound(_) => true,
            ArtshipError::InvalidPath(_) => true,
            ArtshipError::SamePath { .. } => true,
            ArtshipError::NotAChild { .. } => true,
            ArtshipError::Config(_) => true,
            ArtshipError::Authentication(_) => true,
            ArtshipError::RetriesExhausted { .. } => true,
            ArtshipError::ChecksumMismatch { .. } => true,

            ArtshipError::DeleteFailed(_) => false,
            ArtshipError::Io(_) => false,
            ArtshipError::Protocol(_) => false,
            ArtshipError::Resolution(_) => false,
            ArtshipError::Deploy(_) => false,
        }
    }

    /// Check if this error is transient (temporary, worth retrying)
    pub fn is_transient(&self) -> bool {
        match self {
            ArtshipError::Io(io_err) => Self::is_io_transient(io_err),
            ArtshipError::Protocol(_) => true,
            _ => false,
        }
    }

    fn is_io_transient(io_err: &io::Error) -> bool {
        use io::ErrorKind::*;
        matches!(
            io_err.kind(),
            ConnectionRefused
                | ConnectionReset
                | ConnectionAborted
                | NotConnected
                | BrokenPipe
                | TimedOut
                | Interrupted
                | WouldBlock
                | UnexpectedEof
        )
    }

    /// Get error category for logging
    pub fn category(&self) -> ErrorCategory {
        match self {
            ArtshipError::InvalidChunkSize(_)
            | ArtshipError::InvalidMilestoneUnit(_)
            | ArtshipError::SourceNotFound(_)
            | ArtshipError::InvalidPath(_)
            | ArtshipError::SamePath { .. }
            | ArtshipError::NotAChild { .. } => ErrorCategory::Validation,
            ArtshipError::DeleteFailed(_) => ErrorCategory::Filesystem,
            ArtshipError::Io(_) => ErrorCategory::IoError,
            ArtshipError::Config(_) => ErrorCategory::Configuration,
            ArtshipError::Protocol(_) => ErrorCategory::Network,
            ArtshipError::Authentication(_) => ErrorCategory::Security,
            ArtshipError::Resolution(_) => ErrorCategory::Resolution,
            ArtshipError::Deploy(_) => ErrorCategory::Network,
            ArtshipError::RetriesExhausted { .. } => ErrorCategory::Retry,
            ArtshipError::ChecksumMismatch { .. } => ErrorCategory::Integrity,
        }
    }
}

/// Error category for classification and reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Argument and path validation errors
    Validation,
    /// I/O operation errors
    IoError,
    /// Configuration errors
    Configuration,
    /// Filesystem operations (deletes, permissions)
    Filesystem,
    /// Network/protocol errors
    Network,
    /// Authentication/authorization errors
    Security,
    /// Artifact resolution errors
    Resolution,
    /// Retry exhaustion
    Retry,
    /// Data integrity errors (checksums)
    Integrity,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCategory::Validation => write!(f, "validation"),
            ErrorCategory::IoError => write!(f, "io"),
            ErrorCategory::Configuration => write!(f, "configuration"),
            ErrorCategory::Filesystem => write!(f, "filesystem"),
            ErrorCategory::Network => write!(f, "network"),
            ErrorCategory::Security => write!(f, "security"),
            ErrorCategory::Resolution => write!(f, "resolution"),
            ErrorCategory::Retry => write!(f, "retry"),
            ErrorCategory::Integrity => write!(f, "integrity"),
        }
    }
}

impl fmt::Display for ArtshipError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArtshipError::InvalidChunkSize(size) => {
                write!(f, "Invalid chunk size: {} (must be greater than zero)", size)
            }
            ArtshipError::InvalidMilestoneUnit(unit) => {
                write!(f, "Invalid milestone unit: {} (must be greater than zero)", unit)
            }
            ArtshipError::SourceNotFound(path) => {
                write!(f, "Source not found: {}", path.display())
            }
            ArtshipError::InvalidPath(path) => {
                write!(f, "Invalid path: {}", path.display())
            }
            ArtshipError::SamePath {
                source,
                destination,
            } => {
                write!(
                    f,
                    "Source [{}] and destination [{}] are the same",
                    source.display(),
                    destination.display()
                )
            }
            ArtshipError::NotAChild { file, directory } => {
                write!(
                    f,
                    "File [{}] is not a child of [{}]",
                    file.display(),
                    directory.display()
                )
            }
            ArtshipError::DeleteFailed(path) => {
                write!(f, "Failed to delete [{}]", path.display())
            }
            ArtshipError::Io(err) => {
                write!(f, "I/O error: {}", err)
            }
            ArtshipError::Config(msg) => {
                write!(f, "Configuration error: {}", msg)
            }
            ArtshipError::Protocol(msg) => {
                write!(f, "Protocol error: {}", msg)
            }
            ArtshipError::Authentication(msg) => {
                write!(f, "Authentication error: {}", msg)
            }
            ArtshipError::Resolution(msg) => {
                write!(f, "Resolution error: {}", msg)
            }
            ArtshipError::Deploy(msg) => {
                write!(f, "{}", msg)
            }
            ArtshipError::RetriesExhausted {
                attempts,
                last_error,
            } => {
                write!(f, "All {} retry attempts exhausted: {}", attempts, last_error)
            }
            ArtshipError::ChecksumMismatch { expected, actual } => {
                write!(
                    f,
                    "Checksum verification failed: expected {}, got {}",
                    expected, actual
                )
            }
        }
    }
}

impl std::error::Error for ArtshipError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ArtshipError::Io(err) => Some(err),
            ArtshipError::RetriesExhausted { last_error, .. } => Some(last_error.as_ref()),
            _ => None,
        }
    }
}

impl From<io::Error> for ArtshipError {
    fn from(err: io::Error) -> Self {
        ArtshipError::Io(err)
    }
}

impl From<FtpError> for ArtshipError {
    fn from(err: FtpError) -> Self {
        match err {
            FtpError::Io(io_err) => ArtshipError::Io(io_err),
            FtpError::Reply { code: 530, message } => ArtshipError::Authentication(message),
            other => ArtshipError::Protocol(other.to_string()),
        }
    }
}

impl From<reqwest::Error> for ArtshipError {
    fn from(err: reqwest::Error) -> Self {
        ArtshipError::Protocol(format!("HTTP error: {}", err))
    }
}

impl From<url::ParseError> for ArtshipError {
    fn from(err: url::ParseError) -> Self {
        ArtshipError::Config(format!("Invalid URL: {}", err))
    }
}

impl From<regex::Error> for ArtshipError {
    fn from(err: regex::Error) -> Self {
        ArtshipError::Config(format!("Invalid pattern: {}", err))
    }
}
