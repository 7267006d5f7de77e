/*!
 * Monitored stream copy: chunked transfer with milestone progress
 */

use std::io::{self, BufReader, Read, Write};
use std::panic::{self, AssertUnwindSafe};

use tracing::{debug, warn};

use super::ascii::{FromNetAscii, TransferMode};
use super::listener::{CopyStreamListener, ProgressNotification};
use super::session::{StreamSize, TransferSession, DEFAULT_MILESTONE_UNIT};
use crate::error::{ArtshipError, Result};

/// Default number of bytes read per iteration
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

/// Parameters of one copy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CopyOptions {
    /// Maximum bytes read per iteration, must be positive
    pub chunk_size: usize,
    /// Bytes per milestone, must be positive
    pub milestone_unit: u64,
    /// Expected source length, reported to listeners only
    pub stream_size: StreamSize,
    /// Hand the destination back to the caller instead of closing it
    pub keep_destination_open: bool,
}

impl Default for CopyOptions {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            milestone_unit: DEFAULT_MILESTONE_UNIT,
            stream_size: StreamSize::Unknown,
            keep_destination_open: false,
        }
    }
}

impl CopyOptions {
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    pub fn with_milestone_unit(mut self, milestone_unit: u64) -> Self {
        self.milestone_unit = milestone_unit;
        self
    }

    pub fn with_stream_size(mut self, stream_size: StreamSize) -> Self {
        self.stream_size = stream_size;
        self
    }

    pub fn keep_destination_open(mut self, keep: bool) -> Self {
        self.keep_destination_open = keep;
        self
    }

    /// Reject options that would make the copy loop meaningless
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(ArtshipError::InvalidChunkSize(self.chunk_size));
        }
        if self.milestone_unit == 0 {
            return Err(ArtshipError::InvalidMilestoneUnit(self.milestone_unit));
        }
        Ok(())
    }
}

/// Outcome of a successful copy
#[derive(Debug)]
pub struct Copied<W> {
    bytes_copied: u64,
    last_milestone: u64,
    destination: Option<W>,
}

impl<W> Copied<W> {
    pub fn bytes_copied(&self) -> u64 {
        self.bytes_copied
    }

    /// Last milestone reported to the listener (0 when none was)
    pub fn last_milestone(&self) -> u64 {
        self.last_milestone
    }

    /// The destination, when the copy was asked to keep it open
    pub fn into_destination(self) -> Option<W> {
        self.destination
    }
}

/// Copy everything from `source` into `destination`.
///
/// The source is only borrowed: closing it stays with the caller. The
/// destination is flushed, then either dropped (closed) or returned inside
/// [`Copied`] depending on `options.keep_destination_open`. A failed read or
/// write aborts the copy and is returned as is; bytes already written stay
/// in the destination.
pub fn copy_stream<R, W, L>(
    source: &mut R,
    mut destination: W,
    options: &CopyOptions,
    listener: &mut L,
) -> Result<Copied<W>>
where
    R: Read + ?Sized,
    W: Write,
    L: CopyStreamListener + ?Sized,
{
    options.validate()?;

    let mut session = TransferSession::new(options.stream_size, options.milestone_unit)?;
    let mut buffer = vec![0u8; options.chunk_size];

    loop {
        let n = match source.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => {
                debug!(
                    bytes_transferred = session.total_bytes_transferred(),
                    "Read failed: {}", e
                );
                return Err(e.into());
            }
        };

        if let Err(e) = destination.write_all(&buffer[..n]) {
            debug!(
                bytes_transferred = session.total_bytes_transferred(),
                "Write failed: {}", e
            );
            return Err(e.into());
        }

        if let Some(milestone) = session.record(n) {
            let notification = ProgressNotification::new(
                milestone,
                session.total_bytes_transferred(),
                n,
                session.stream_size(),
            );
            notify(listener, &notification);
        }
    }

    destination.flush()?;

    let destination = if options.keep_destination_open {
        Some(destination)
    } else {
        drop(destination);
        None
    };

    Ok(Copied {
        bytes_copied: session.total_bytes_transferred(),
        last_milestone: session.last_reported_milestone(),
        destination,
    })
}

/// Deliver a notification, containing any listener failure
pub(crate) fn notify<L>(listener: &mut L, notification: &ProgressNotification)
where
    L: CopyStreamListener + ?Sized,
{
    match panic::catch_unwind(AssertUnwindSafe(|| listener.bytes_transferred(notification))) {
        Ok(Ok(())) => {}
        Ok(Err(e)) => {
            warn!(milestone = notification.milestone, "Progress listener failed: {:#}", e);
        }
        Err(_) => {
            warn!(milestone = notification.milestone, "Progress listener panicked");
        }
    }
}

/// Reusable copier bound to a set of options
#[derive(Debug, Clone, Copy, Default)]
pub struct StreamCopier {
    options: CopyOptions,
}

impl StreamCopier {
    pub fn new(options: CopyOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &CopyOptions {
        &self.options
    }

    pub fn copy<R, W, L>(&self, source: &mut R, destination: W, listener: &mut L) -> Result<Copied<W>>
    where
        R: Read + ?Sized,
        W: Write,
        L: CopyStreamListener + ?Sized,
    {
        copy_stream(source, destination, &self.options, listener)
    }

    /// Copy through a buffered reader, decoding network ASCII in text mode.
    ///
    /// The buffering and decoding wrappers belong to this call and are dropped
    /// before it returns; `source` itself stays open.
    pub fn copy_translated<R, W, L>(
        &self,
        source: &mut R,
        destination: W,
        mode: TransferMode,
        listener: &mut L,
    ) -> Result<Copied<W>>
    where
        R: Read,
        W: Write,
        L: CopyStreamListener + ?Sized,
    {
        self.options.validate()?;

        let buffered = BufReader::with_capacity(self.options.chunk_size, source);
        match mode {
            TransferMode::Binary => {
                let mut reader = buffered;
                copy_stream(&mut reader, destination, &self.options, listener)
            }
            TransferMode::Ascii => {
                let mut reader = FromNetAscii::new(buffered);
                copy_stream(&mut reader, destination, &self.options, listener)
            }
        }
    }
}

/// `Read` adapter reporting milestones as a consumer pulls bytes through it.
///
/// Used where the transfer loop belongs to someone else, such as an HTTP
/// client streaming a request body.
pub struct MonitoredReader<R, L> {
    inner: R,
    session: TransferSession,
    listener: L,
}

impl<R: Read, L: CopyStreamListener> MonitoredReader<R, L> {
    pub fn new(inner: R, stream_size: StreamSize, milestone_unit: u64, listener: L) -> Result<Self> {
        Ok(Self {
            inner,
            session: TransferSession::new(stream_size, milestone_unit)?,
            listener,
        })
    }

    pub fn total_bytes_transferred(&self) -> u64 {
        self.session.total_bytes_transferred()
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: Read, L: CopyStreamListener> Read for MonitoredReader<R, L> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        if let Some(milestone) = self.session.record(n) {
            let notification = ProgressNotification::new(
                milestone,
                self.session.total_bytes_transferred(),
                n,
                self.session.stream_size(),
            );
            notify(&mut self.listener, &notification);
        }
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::listener::NoopListener;
    use std::io::Cursor;

    const MIB: u64 = 1024 * 1024;

    fn pattern(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i % 251) as u8).collect()
    }

    /// Writer accepting `limit` bytes, then failing every write
    #[derive(Debug)]
    struct FailingWriter {
        written: Vec<u8>,
        limit: usize,
    }

    impl Write for FailingWriter {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            if self.written.len() >= self.limit {
                return Err(io::Error::new(io::ErrorKind::BrokenPipe, "peer went away"));
            }
            let n = buf.len().min(self.limit - self.written.len());
            self.written.extend_from_slice(&buf[..n]);
            Ok(n)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_copy_preserves_content() {
        for len in [0usize, 1, 1023, MIB as usize, MIB as usize + 1, 10 * MIB as usize] {
            let data = pattern(len);
            let mut dest = Vec::new();
            let copied = copy_stream(
                &mut Cursor::new(data.clone()),
                &mut dest,
                &CopyOptions::default(),
                &mut NoopListener,
            )
            .unwrap();
            assert_eq!(copied.bytes_copied(), len as u64);
            assert_eq!(dest, data);
        }
    }

    #[test]
    fn test_zero_chunk_size_rejected_before_io() {
        let mut source = Cursor::new(vec![1u8; 10]);
        let mut dest = Vec::new();
        let options = CopyOptions::default().with_chunk_size(0);
        let err = copy_stream(&mut source, &mut dest, &options, &mut NoopListener).unwrap_err();
        assert!(matches!(err, ArtshipError::InvalidChunkSize(0)));
        assert_eq!(source.position(), 0);
        assert!(dest.is_empty());
    }

    #[test]
    fn test_milestones_strictly_increase() {
        let data = pattern(3 * MIB as usize + 100);
        let mut seen = Vec::new();
        let mut listener = |n: &ProgressNotification| -> anyhow::Result<()> {
            seen.push(n.milestone);
            Ok(())
        };
        let options = CopyOptions::default().with_chunk_size(100_000);
        let copied = copy_stream(&mut Cursor::new(data), io::sink(), &options, &mut listener).unwrap();

        assert_eq!(copied.last_milestone(), 3);
        assert_eq!(seen, vec![1, 2, 3]);
    }

    #[test]
    fn test_oversized_chunk_reports_single_milestone() {
        let unit = 1024u64;
        let data = pattern((5 * unit + unit / 2) as usize);
        let mut seen = Vec::new();
        let mut listener = |n: &ProgressNotification| -> anyhow::Result<()> {
            seen.push((n.milestone, n.bytes_transferred));
            Ok(())
        };
        let options = CopyOptions::default()
            .with_chunk_size(data.len())
            .with_milestone_unit(unit);
        copy_stream(&mut Cursor::new(data.clone()), io::sink(), &options, &mut listener).unwrap();

        assert_eq!(seen, vec![(5, data.len())]);
    }

    #[test]
    fn test_empty_source_reports_nothing() {
        let mut calls = 0;
        let mut counting = |_: &ProgressNotification| -> anyhow::Result<()> {
            calls += 1;
            Ok(())
        };
        let copied = copy_stream(
            &mut Cursor::new(Vec::<u8>::new()),
            Vec::new(),
            &CopyOptions::default(),
            &mut counting,
        )
        .unwrap();
        assert_eq!(copied.bytes_copied(), 0);
        assert_eq!(copied.last_milestone(), 0);
        assert_eq!(calls, 0);
    }

    #[test]
    fn test_write_failure_aborts_copy() {
        let data = pattern(4096);
        let mut source = Cursor::new(data.clone());
        let mut dest = FailingWriter {
            written: Vec::new(),
            limit: 1500,
        };
        let options = CopyOptions::default().with_chunk_size(512);
        let err = copy_stream(&mut source, &mut dest, &options, &mut NoopListener).unwrap_err();

        assert!(matches!(err, ArtshipError::Io(ref e) if e.kind() == io::ErrorKind::BrokenPipe));
        assert_eq!(dest.written, &data[..1500]);
        // The source is still usable by the caller
        assert!(source.position() < data.len() as u64);
    }

    #[test]
    fn test_failing_listener_does_not_abort_copy() {
        let data = pattern(4 * 1024);
        let mut dest = Vec::new();
        let mut listener =
            |_: &ProgressNotification| -> anyhow::Result<()> { Err(anyhow::anyhow!("listener broke")) };
        let options = CopyOptions::default().with_milestone_unit(1024).with_chunk_size(1024);
        let copied = copy_stream(&mut Cursor::new(data.clone()), &mut dest, &options, &mut listener).unwrap();

        assert_eq!(copied.bytes_copied(), data.len() as u64);
        assert_eq!(copied.last_milestone(), 4);
        assert_eq!(dest, data);
    }

    #[test]
    fn test_panicking_listener_does_not_abort_copy() {
        let data = pattern(4 * 1024);
        let mut calls = 0;
        let mut listener = |_: &ProgressNotification| -> anyhow::Result<()> {
            calls += 1;
            panic!("listener exploded");
        };
        let options = CopyOptions::default().with_milestone_unit(1024).with_chunk_size(1024);
        let copied = copy_stream(&mut Cursor::new(data.clone()), Vec::new(), &options, &mut listener).unwrap();

        assert_eq!(copied.bytes_copied(), data.len() as u64);
        assert_eq!(calls, 4);
    }

    #[test]
    fn test_sequential_copies_are_independent() {
        let options = CopyOptions::default().with_milestone_unit(1024);
        let mut seen = Vec::new();
        let mut listener = |n: &ProgressNotification| -> anyhow::Result<()> {
            seen.push(n.milestone);
            Ok(())
        };

        let first = copy_stream(&mut Cursor::new(pattern(2048)), io::sink(), &options, &mut listener).unwrap();
        let second = copy_stream(&mut Cursor::new(pattern(1024)), io::sink(), &options, &mut listener).unwrap();

        assert_eq!(first.bytes_copied(), 2048);
        assert_eq!(second.bytes_copied(), 1024);
        assert_eq!(second.last_milestone(), 1);
        assert_eq!(seen, vec![2, 1]);
    }

    #[test]
    fn test_keep_destination_open_returns_destination() {
        let options = CopyOptions::default().keep_destination_open(true);
        let copied = copy_stream(&mut Cursor::new(b"abc".to_vec()), Vec::new(), &options, &mut NoopListener).unwrap();
        assert_eq!(copied.into_destination().unwrap(), b"abc");

        let options = CopyOptions::default().keep_destination_open(false);
        let copied = copy_stream(&mut Cursor::new(b"abc".to_vec()), Vec::new(), &options, &mut NoopListener).unwrap();
        assert!(copied.into_destination().is_none());
    }

    #[test]
    fn test_copy_translated_ascii() {
        let copier = StreamCopier::new(CopyOptions::default().with_chunk_size(4));
        let mut source = Cursor::new(b"a\r\nb\r\n".to_vec());
        let mut dest = Vec::new();
        copier
            .copy_translated(&mut source, &mut dest, TransferMode::Ascii, &mut NoopListener)
            .unwrap();
        if cfg!(windows) {
            assert_eq!(dest, b"a\r\nb\r\n");
        } else {
            assert_eq!(dest, b"a\nb\n");
        }
    }

    #[test]
    fn test_copy_translated_binary_is_untouched() {
        let copier = StreamCopier::default();
        let mut source = Cursor::new(b"a\r\nb".to_vec());
        let mut dest = Vec::new();
        copier
            .copy_translated(&mut source, &mut dest, TransferMode::Binary, &mut NoopListener)
            .unwrap();
        assert_eq!(dest, b"a\r\nb");
    }

    #[test]
    fn test_monitored_reader_reports_milestones() {
        let data = pattern(2 * 1024 + 10);
        let mut seen = Vec::new();
        {
            let listener = |n: &ProgressNotification| -> anyhow::Result<()> {
                seen.push((n.milestone, n.stream_size));
                Ok(())
            };
            let size = StreamSize::Known(data.len() as u64);
            let mut reader = MonitoredReader::new(Cursor::new(data.clone()), size, 1024, listener).unwrap();
            let mut out = Vec::new();
            reader.read_to_end(&mut out).unwrap();
            assert_eq!(out, data);
            assert_eq!(reader.total_bytes_transferred(), data.len() as u64);
        }
        let milestones: Vec<u64> = seen.iter().map(|(m, _)| *m).collect();
        assert_eq!(milestones.last(), Some(&2));
        assert!(milestones.windows(2).all(|w| w[0] < w[1]));
        assert!(seen.iter().all(|(_, s)| *s == StreamSize::Known(2 * 1024 + 10)));
    }
}
