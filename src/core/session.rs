/*!
 * Transfer session state: cumulative byte count and milestone tracking
 */

use std::fmt;
use std::num::NonZeroU64;

use crate::error::{ArtshipError, Result};

/// One mebibyte, the default milestone granularity
pub const DEFAULT_MILESTONE_UNIT: u64 = 1024 * 1024;

/// Expected length of a stream, when the source can tell in advance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StreamSize {
    Known(u64),
    #[default]
    Unknown,
}

impl StreamSize {
    pub fn from_len(len: Option<u64>) -> Self {
        match len {
            Some(len) => StreamSize::Known(len),
            None => StreamSize::Unknown,
        }
    }

    pub fn known(&self) -> Option<u64> {
        match self {
            StreamSize::Known(len) => Some(*len),
            StreamSize::Unknown => None,
        }
    }

    pub fn is_known(&self) -> bool {
        matches!(self, StreamSize::Known(_))
    }
}

impl fmt::Display for StreamSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamSize::Known(len) => write!(f, "{} bytes", len),
            StreamSize::Unknown => write!(f, "unknown size"),
        }
    }
}

/// Progress state of one in-flight copy.
///
/// A session is created when a transfer starts and dropped when it ends; nothing
/// in it outlives the transfer. The milestone counter only moves forward and moves
/// at most once per recorded chunk, so a chunk spanning several milestone
/// boundaries is reported once, at the latest boundary reached.
#[derive(Debug, Clone)]
pub struct TransferSession {
    total_bytes_transferred: u64,
    last_reported_milestone: u64,
    stream_size: StreamSize,
    milestone_unit: NonZeroU64,
}

impl TransferSession {
    pub fn new(stream_size: StreamSize, milestone_unit: u64) -> Result<Self> {
        let milestone_unit = NonZeroU64::new(milestone_unit)
            .ok_or(ArtshipError::InvalidMilestoneUnit(milestone_unit))?;

        Ok(Self {
            total_bytes_transferred: 0,
            last_reported_milestone: 0,
            stream_size,
            milestone_unit,
        })
    }

    /// Record a delivered chunk.
    ///
    /// Returns the new milestone when this chunk crossed into a milestone unit
    /// that had not been reached before.
    pub fn record(&mut self, bytes: usize) -> Option<u64> {
        self.total_bytes_transferred = self.total_bytes_transferred.saturating_add(bytes as u64);

        let milestone = self.total_bytes_transferred / self.milestone_unit.get();
        if milestone > self.last_reported_milestone {
            self.last_reported_milestone = milestone;
            Some(milestone)
        } else {
            None
        }
    }

    pub fn total_bytes_transferred(&self) -> u64 {
        self.total_bytes_transferred
    }

    pub fn last_reported_milestone(&self) -> u64 {
        self.last_reported_milestone
    }

    pub fn stream_size(&self) -> StreamSize {
        self.stream_size
    }

    pub fn milestone_unit(&self) -> u64 {
        self.milestone_unit.get()
    }
}
