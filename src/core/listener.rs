/*!
 * Progress notifications and the listeners that consume them
 *
 * Listeners run on the copying thread, in order, once per crossed milestone.
 * A listener that fails (returns an error or panics) never aborts the copy; the
 * copier logs the failure and carries on.
 */

use chrono::{DateTime, Local};
use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use tracing::{debug, info};

use super::session::StreamSize;

/// Immutable event emitted when a transfer crosses a new milestone
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressNotification {
    /// Number of whole milestone units transferred so far
    pub milestone: u64,
    /// Cumulative bytes moved so far
    pub total_bytes_transferred: u64,
    /// Size of the chunk that crossed the milestone
    pub bytes_transferred: usize,
    /// Expected size of the whole stream
    pub stream_size: StreamSize,
    pub timestamp: DateTime<Local>,
}

impl ProgressNotification {
    pub fn new(
        milestone: u64,
        total_bytes_transferred: u64,
        bytes_transferred: usize,
        stream_size: StreamSize,
    ) -> Self {
        Self {
            milestone,
            total_bytes_transferred,
            bytes_transferred,
            stream_size,
            timestamp: Local::now(),
        }
    }

    /// Percentage complete, when the stream size is known
    pub fn percent(&self) -> Option<f64> {
        match self.stream_size {
            StreamSize::Known(0) => Some(100.0),
            StreamSize::Known(len) => Some(self.total_bytes_transferred as f64 * 100.0 / len as f64),
            StreamSize::Unknown => None,
        }
    }
}

/// Observer of milestone notifications
pub trait CopyStreamListener {
    fn bytes_transferred(&mut self, notification: &ProgressNotification) -> anyhow::Result<()>;
}

impl<F> CopyStreamListener for F
where
    F: FnMut(&ProgressNotification) -> anyhow::Result<()>,
{
    fn bytes_transferred(&mut self, notification: &ProgressNotification) -> anyhow::Result<()> {
        self(notification)
    }
}

/// Listener that ignores every notification
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopListener;

impl CopyStreamListener for NoopListener {
    fn bytes_transferred(&mut self, _notification: &ProgressNotification) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Writes one line to the log per milestone, the way a build log reports
/// a long download: `[<date>]: [<n>] Mb transferred`
#[derive(Debug, Clone, Default)]
pub struct MilestoneLogger {
    label: Option<String>,
}

impl MilestoneLogger {
    pub fn new() -> Self {
        Self { label: None }
    }

    /// Attach a label (usually the remote path) to every logged line
    pub fn labelled(label: impl Into<String>) -> Self {
        Self {
            label: Some(label.into()),
        }
    }

    pub fn format(notification: &ProgressNotification) -> String {
        format!(
            "[{}]: [{}] Mb transferred",
            notification.timestamp.format("%a %b %d %H:%M:%S %Z %Y"),
            notification.milestone
        )
    }
}

impl CopyStreamListener for MilestoneLogger {
    fn bytes_transferred(&mut self, notification: &ProgressNotification) -> anyhow::Result<()> {
        let line = Self::format(notification);
        match &self.label {
            Some(label) => info!(transfer = %label, "{}", line),
            None => info!("{}", line),
        }
        Ok(())
    }
}

/// Hands notifications to another thread without ever blocking the copy.
///
/// Notifications that do not fit into the channel, or that nobody is left to
/// receive, are dropped.
#[derive(Debug, Clone)]
pub struct ChannelListener {
    sender: Sender<ProgressNotification>,
}

impl ChannelListener {
    /// Create a listener and the receiving end of its bounded channel
    pub fn bounded(capacity: usize) -> (Self, Receiver<ProgressNotification>) {
        let (sender, receiver) = bounded(capacity);
        (Self { sender }, receiver)
    }
}

impl CopyStreamListener for ChannelListener {
    fn bytes_transferred(&mut self, notification: &ProgressNotification) -> anyhow::Result<()> {
        match self.sender.try_send(notification.clone()) {
            Ok(()) => {}
            Err(TrySendError::Full(dropped)) => {
                debug!(milestone = dropped.milestone, "Progress channel full, notification dropped");
            }
            Err(TrySendError::Disconnected(_)) => {
                debug!("Progress channel disconnected");
            }
        }
        Ok(())
    }
}
