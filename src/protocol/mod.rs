/*!
 * Protocol layer: moving whole files to and from local paths, FTP servers
 * and HTTP repositories
 *
 * Every network transfer goes through the monitored copier and is retried as
 * a whole on transient failures.
 */

pub mod ftp;
pub mod http;
pub mod uri;

use std::fs::{self, File};
use std::io::{Cursor, Write};
use std::path::Path;

use tempfile::NamedTempFile;
use tracing::{debug, warn};

pub use uri::{parse_location, Location};

use crate::cli_progress::TransferReporter;
use crate::config::TransferConfig;
use crate::core::copier::copy_stream;
use crate::core::listener::CopyStreamListener;
use crate::core::retry::{with_retry, RetryPolicy};
use crate::core::session::StreamSize;
use crate::error::{ArtshipError, Result};
use ftp::{FtpConnection, MonitoredFtpClient};
use http::HttpClient;

/// Upload a local file to `destination`, returning the bytes sent
pub fn upload(source: &Path, destination: &Location, config: &TransferConfig) -> Result<u64> {
    let policy = RetryPolicy::from_config(config);
    with_retry(&policy, || upload_once(source, destination, config))
}

fn upload_once(source: &Path, destination: &Location, config: &TransferConfig) -> Result<u64> {
    let len = fs::metadata(source)?.len();
    let size = StreamSize::Known(len);
    let mut reporter = TransferReporter::for_transfer(config.show_progress, &destination.to_string(), size);

    let bytes = match destination {
        Location::Local(path) => {
            prepare_parent(path)?;
            let mut input = File::open(source)?;
            let output = File::create(path)?;
            let options = config.copy_options().with_stream_size(size);
            copy_stream(&mut input, output, &options, &mut reporter)?.bytes_copied()
        }
        Location::Ftp(target) => {
            let mut connection = open_ftp(target, config)?;
            connection.make_parent_directories(&target.path)?;
            let mut client = MonitoredFtpClient::with_listener(connection, reporter.clone())
                .with_milestone_unit(config.milestone_unit);

            let mut input = File::open(source)?;
            if !client.store_file_sized(&target.path, &mut input, size)? {
                return Err(ArtshipError::Protocol(format!("Server refused upload to {}", destination)));
            }
            close_ftp(client.into_inner());
            len
        }
        Location::Http(url) => {
            let client = HttpClient::new(&config.http)?;
            client.put_file(url, source, config.milestone_unit, reporter.clone())?
        }
    };

    reporter.finish(bytes);
    Ok(bytes)
}

/// Upload a small in-memory payload, such as a checksum sidecar
pub fn upload_bytes(bytes: &[u8], destination: &Location, config: &TransferConfig) -> Result<()> {
    let policy = RetryPolicy::from_config(config);
    with_retry(&policy, || match destination {
        Location::Local(path) => {
            prepare_parent(path)?;
            fs::write(path, bytes)?;
            Ok(())
        }
        Location::Ftp(target) => {
            let mut connection = open_ftp(target, config)?;
            connection.make_parent_directories(&target.path)?;
            let mut client = MonitoredFtpClient::new(connection);
            if !client.store_file(&target.path, &mut Cursor::new(bytes))? {
                return Err(ArtshipError::Protocol(format!("Server refused upload to {}", destination)));
            }
            close_ftp(client.into_inner());
            Ok(())
        }
        Location::Http(url) => HttpClient::new(&config.http)?.put_bytes(url, bytes.to_vec()),
    })
}

/// Download `source` to the local file `destination`.
///
/// The content lands in a temporary file next to `destination` and is moved
/// into place only once complete. `Ok(None)` when the source does not exist.
pub fn download(source: &Location, destination: &Path, config: &TransferConfig) -> Result<Option<u64>> {
    let policy = RetryPolicy::from_config(config);
    with_retry(&policy, || download_once(source, destination, config))
}

fn download_once(source: &Location, destination: &Path, config: &TransferConfig) -> Result<Option<u64>> {
    let parent = prepare_parent(destination)?;
    let mut temp = NamedTempFile::new_in(parent)?;
    let label = source.to_string();

    let bytes = match source {
        Location::Local(path) => {
            if !path.is_file() {
                return Ok(None);
            }
            let size = StreamSize::Known(fs::metadata(path)?.len());
            let mut reporter = TransferReporter::for_transfer(config.show_progress, &label, size);
            let options = config.copy_options().with_stream_size(size);
            let copied = copy_stream(&mut File::open(path)?, temp.as_file_mut(), &options, &mut reporter)?;
            reporter.finish(copied.bytes_copied());
            copied.bytes_copied()
        }
        Location::Ftp(target) => {
            let connection = open_ftp(target, config)?;
            let reporter = TransferReporter::for_transfer(config.show_progress, &label, StreamSize::Unknown);
            let mut client =
                MonitoredFtpClient::with_listener(connection, reporter).with_milestone_unit(config.milestone_unit);

            if !client.retrieve_file(&target.path, temp.as_file_mut())? {
                debug!("{} not available", label);
                return Ok(None);
            }
            let bytes = temp.as_file().metadata()?.len();
            client.listener().finish(bytes);
            close_ftp(client.into_inner());
            bytes
        }
        Location::Http(url) => {
            let client = HttpClient::new(&config.http)?;
            let mut reporter = TransferReporter::for_transfer(config.show_progress, &label, StreamSize::Unknown);
            let Some(copied) = client.get(url, temp.as_file_mut(), &config.copy_options(), &mut reporter)? else {
                debug!("{} not found", label);
                return Ok(None);
            };
            reporter.finish(copied.bytes_copied());
            copied.bytes_copied()
        }
    };

    temp.as_file_mut().flush()?;
    temp.persist(destination).map_err(|e| ArtshipError::Io(e.error))?;
    Ok(Some(bytes))
}

fn open_ftp(target: &ftp::FtpTarget, config: &TransferConfig) -> Result<FtpConnection> {
    let mut connection = ftp::connect(target, &config.ftp)?;
    connection.set_buffer_size(config.chunk_size);
    Ok(connection)
}

/// QUIT politely; the transfer already succeeded, so a failure here is only logged
fn close_ftp(connection: FtpConnection) {
    if let Err(e) = connection.quit() {
        warn!("FTP QUIT failed: {}", e);
    }
}

/// Create the parent directory of `path`, returning it
fn prepare_parent(path: &Path) -> Result<&Path> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent)?;
    Ok(parent)
}
