//! Error types for FTP operations

use std::io;
use thiserror::Error;

/// Result type alias for FTP operations
pub type FtpResult<T> = Result<T, FtpError>;

#[derive(Error, Debug)]
pub enum FtpError {
    /// Socket failure on the control or data connection
    #[error("FTP I/O error: {0}")]
    Io(#[from] io::Error),

    /// The server answered with an unexpected reply code
    #[error("FTP server replied {code}: {message}")]
    Reply { code: u16, message: String },

    /// The server sent something that is not a valid FTP reply
    #[error("FTP protocol error: {0}")]
    Protocol(String),

    /// The control connection was closed by the server
    #[error("FTP server closed the control connection")]
    Disconnected,
}

impl FtpError {
    pub fn reply(code: u16, message: impl Into<String>) -> Self {
        FtpError::Reply {
            code,
            message: message.into(),
        }
    }

    /// Reply codes 5xx are permanent; retrying the same command will not help
    pub fn is_permanent(&self) -> bool {
        matches!(self, FtpError::Reply { code, .. } if (500..600).contains(code))
    }
}
