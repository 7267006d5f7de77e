/*!
 * FTP support: a blocking control/data client and a progress-reporting
 * wrapper around any FTP transport
 */

pub mod connection;
pub mod error;
pub mod monitored;

use std::io::{Read, Write};
use std::time::Duration;

use serde::{Deserialize, Serialize};

pub use connection::{FtpConnection, Reply};
pub use error::{FtpError, FtpResult};
pub use monitored::MonitoredFtpClient;

use crate::config::FtpConfig;
use crate::core::ascii::TransferMode;
use crate::core::session::StreamSize;

/// Default FTP control port
pub const DEFAULT_PORT: u16 = 21;

/// Representation type of a transfer (`TYPE A` / `TYPE I`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    /// FTP's own default
    #[default]
    Ascii,
    Binary,
}

impl FileType {
    pub fn type_code(&self) -> &'static str {
        match self {
            FileType::Ascii => "A",
            FileType::Binary => "I",
        }
    }
}

impl From<FileType> for TransferMode {
    fn from(file_type: FileType) -> Self {
        match file_type {
            FileType::Ascii => TransferMode::Ascii,
            FileType::Binary => TransferMode::Binary,
        }
    }
}

/// Commands that open a data connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataCommand {
    Retr,
    Stor,
}

impl DataCommand {
    pub fn verb(&self) -> &'static str {
        match self {
            DataCommand::Retr => "RETR",
            DataCommand::Stor => "STOR",
        }
    }
}

/// The operations a monitored client needs from an FTP session
pub trait FtpTransport {
    type Data: Read + Write;

    fn file_type(&self) -> FileType;

    fn set_file_type(&mut self, file_type: FileType) -> FtpResult<()>;

    /// Preferred copy buffer size, 0 for the copier default
    fn buffer_size(&self) -> usize;

    fn size(&mut self, path: &str) -> FtpResult<StreamSize>;

    /// Issue `command` for `path` and return the data connection.
    ///
    /// `Ok(None)` means the server reported the file unavailable (450/550);
    /// any other refusal is an error. No data connection is open in either case.
    fn open_data_connection(&mut self, command: DataCommand, path: &str) -> FtpResult<Option<Self::Data>>;

    /// Read the final reply of the command that opened the last data
    /// connection, failing unless the server reports success.
    fn complete_pending_command(&mut self) -> FtpResult<()>;
}

/// Where and how to connect for one FTP transfer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FtpTarget {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub path: String,
}

/// Open a logged-in connection for `target`, falling back to configured
/// credentials when the URL carries none
pub fn connect(target: &FtpTarget, config: &FtpConfig) -> FtpResult<FtpConnection> {
    let mut connection = FtpConnection::connect(
        &target.host,
        target.port,
        Duration::from_secs(config.connect_timeout_secs),
    )?;
    connection.set_read_timeout(Some(Duration::from_secs(config.read_timeout_secs)))?;

    let username = target.username.as_deref().unwrap_or(&config.username);
    let password = target.password.as_deref().unwrap_or(&config.password);
    connection.login(username, password)?;
    connection.set_file_type(config.file_type)?;
    Ok(connection)
}
