/*!
 * FTP client that reports transfer progress
 *
 * Wraps any `FtpTransport` and moves file contents through the monitored
 * copier, so every retrieve and store emits milestone notifications.
 */

use std::io::{Read, Write};

use tracing::{debug, info};

use super::error::FtpResult;
use super::{DataCommand, FileType, FtpTransport};
use crate::core::ascii::ToNetAscii;
use crate::core::copier::{copy_stream, CopyOptions, StreamCopier, DEFAULT_CHUNK_SIZE};
use crate::core::listener::{CopyStreamListener, MilestoneLogger};
use crate::core::session::{StreamSize, DEFAULT_MILESTONE_UNIT};
use crate::error::Result;

pub struct MonitoredFtpClient<T, L = MilestoneLogger> {
    transport: T,
    listener: L,
    milestone_unit: u64,
}

impl<T: FtpTransport> MonitoredFtpClient<T, MilestoneLogger> {
    /// Report progress to the log, one line per mebibyte
    pub fn new(transport: T) -> Self {
        Self::with_listener(transport, MilestoneLogger::new())
    }
}

impl<T: FtpTransport, L: CopyStreamListener> MonitoredFtpClient<T, L> {
    pub fn with_listener(transport: T, listener: L) -> Self {
        Self {
            transport,
            listener,
            milestone_unit: DEFAULT_MILESTONE_UNIT,
        }
    }

    pub fn with_milestone_unit(mut self, milestone_unit: u64) -> Self {
        self.milestone_unit = milestone_unit;
        self
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn listener(&self) -> &L {
        &self.listener
    }

    pub fn into_inner(self) -> T {
        self.transport
    }

    fn copy_options(&self, stream_size: StreamSize) -> CopyOptions {
        let chunk_size = match self.transport.buffer_size() {
            0 => DEFAULT_CHUNK_SIZE,
            n => n,
        };
        CopyOptions::default()
            .with_chunk_size(chunk_size)
            .with_milestone_unit(self.milestone_unit)
            .with_stream_size(stream_size)
            .keep_destination_open(true)
    }

    /// Download `remote` into `local`.
    ///
    /// Returns `Ok(false)` when the server reports the file unavailable. A
    /// transfer the server does not confirm is an error, so a partial copy
    /// never passes for a complete one. `local` is left open for the caller. On a
    /// copy error the data connection is closed and the error returned
    /// without reading the server's final reply.
    pub fn retrieve_file<W: Write>(&mut self, remote: &str, local: &mut W) -> Result<bool> {
        let file_type = self.transport.file_type();
        let stream_size = match file_type {
            // In ASCII mode the byte count on the wire differs from the local one
            FileType::Ascii => StreamSize::Unknown,
            FileType::Binary => self.transport.size(remote).unwrap_or_else(|e| {
                debug!("SIZE {} unavailable: {}", remote, e);
                StreamSize::Unknown
            }),
        };

        let Some(mut data) = self.transport.open_data_connection(DataCommand::Retr, remote)? else {
            return Ok(false);
        };

        let copier = StreamCopier::new(self.copy_options(stream_size));
        let result = copier.copy_translated(&mut data, &mut *local, file_type.into(), &mut self.listener);
        drop(data);

        let copied = result?;
        self.transport.complete_pending_command()?;
        info!("Retrieved {} ({} bytes)", remote, copied.bytes_copied());
        Ok(true)
    }

    /// Upload `local` to `remote`, reporting progress against an unknown size
    pub fn store_file<R: Read>(&mut self, remote: &str, local: &mut R) -> Result<bool> {
        self.store_file_sized(remote, local, StreamSize::Unknown)
    }

    /// Upload `local` to `remote`.
    ///
    /// Closing the data connection marks the end of the file, so it is
    /// dropped before the final reply is read.
    pub fn store_file_sized<R: Read>(&mut self, remote: &str, local: &mut R, stream_size: StreamSize) -> Result<bool> {
        let file_type = self.transport.file_type();
        let Some(mut data) = self.transport.open_data_connection(DataCommand::Stor, remote)? else {
            return Ok(false);
        };

        let options = self.copy_options(stream_size);
        let result = match file_type {
            FileType::Ascii => {
                let mut encoder = ToNetAscii::new(&mut data);
                copy_stream(local, &mut encoder, &options, &mut self.listener).map(|c| c.bytes_copied())
            }
            FileType::Binary => copy_stream(local, &mut data, &options, &mut self.listener).map(|c| c.bytes_copied()),
        };
        drop(data);

        let bytes = result?;
        self.transport.complete_pending_command()?;
        info!("Stored {} ({} bytes)", remote, bytes);
        Ok(true)
    }

    pub fn set_file_type(&mut self, file_type: FileType) -> FtpResult<()> {
        self.transport.set_file_type(file_type)
    }
}
