/*!
 * Terminal progress bar driven by milestone notifications
 */

use indicatif::{ProgressBar, ProgressStyle};

use crate::core::listener::{CopyStreamListener, MilestoneLogger, ProgressNotification};
use crate::core::session::StreamSize;

const BAR_TEMPLATE: &str =
    "{msg}\n{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})";
const SPINNER_TEMPLATE: &str = "{msg} {spinner:.green} [{elapsed_precise}] {bytes}";

/// Listener rendering one transfer as an `indicatif` bar.
///
/// Known-size transfers get a bar; unknown sizes get a spinner with a byte
/// counter. The bar only moves at milestones.
#[derive(Clone)]
pub struct ProgressBarListener {
    bar: ProgressBar,
}

impl ProgressBarListener {
    pub fn new(label: &str, stream_size: StreamSize) -> Self {
        let bar = match stream_size {
            StreamSize::Known(len) => {
                let bar = ProgressBar::new(len);
                bar.set_style(
                    ProgressStyle::with_template(BAR_TEMPLATE)
                        .unwrap_or_else(|_| ProgressStyle::default_bar())
                        .progress_chars("#>-"),
                );
                bar
            }
            StreamSize::Unknown => {
                let bar = ProgressBar::new_spinner();
                bar.set_style(
                    ProgressStyle::with_template(SPINNER_TEMPLATE)
                        .unwrap_or_else(|_| ProgressStyle::default_spinner()),
                );
                bar
            }
        };
        bar.set_message(label.to_string());
        Self { bar }
    }

    /// Listener that never draws, for non-interactive runs and tests
    pub fn hidden() -> Self {
        Self {
            bar: ProgressBar::hidden(),
        }
    }

    pub fn position(&self) -> u64 {
        self.bar.position()
    }

    /// Complete the bar with the final byte count
    pub fn finish(&self, bytes: u64) {
        self.bar.set_position(bytes);
        self.bar
            .finish_with_message(format!("{} transferred", format_bytes(bytes)));
    }
}

impl CopyStreamListener for ProgressBarListener {
    fn bytes_transferred(&mut self, notification: &ProgressNotification) -> anyhow::Result<()> {
        if let StreamSize::Known(len) = notification.stream_size {
            if self.bar.length() != Some(len) {
                self.bar.set_length(len);
            }
        }
        self.bar.set_position(notification.total_bytes_transferred);
        Ok(())
    }
}

/// The listener a transfer reports to: milestone log lines or a terminal bar
#[derive(Clone)]
pub enum TransferReporter {
    Log(MilestoneLogger),
    Bar(ProgressBarListener),
}

impl TransferReporter {
    pub fn for_transfer(show_progress: bool, label: &str, stream_size: StreamSize) -> Self {
        if show_progress {
            TransferReporter::Bar(ProgressBarListener::new(label, stream_size))
        } else {
            TransferReporter::Log(MilestoneLogger::labelled(label))
        }
    }

    pub fn finish(&self, bytes: u64) {
        if let TransferReporter::Bar(bar) = self {
            bar.finish(bytes);
        }
    }
}

impl CopyStreamListener for TransferReporter {
    fn bytes_transferred(&mut self, notification: &ProgressNotification) -> anyhow::Result<()> {
        match self {
            TransferReporter::Log(logger) => logger.bytes_transferred(notification),
            TransferReporter::Bar(bar) => bar.bytes_transferred(notification),
        }
    }
}

/// Format bytes in human-readable format
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut size = bytes as f64;
    let mut unit_idx = 0;

    while size >= 1024.0 && unit_idx < UNITS.len() - 1 {
        size /= 1024.0;
        unit_idx += 1;
    }

    if unit_idx == 0 {
        format!("{} {}", bytes, UNITS[0])
    } else {
        format!("{:.2} {}", size, UNITS[unit_idx])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(0), "0 B");
        assert_eq!(format_bytes(1023), "1023 B");
        assert_eq!(format_bytes(1024), "1.00 KB");
        assert_eq!(format_bytes(1536), "1.50 KB");
        assert_eq!(format_bytes(1_048_576), "1.00 MB");
    }

    #[test]
    fn test_bar_follows_notifications() {
        let mut listener = ProgressBarListener::hidden();
        let n = ProgressNotification::new(2, 2 * 1024 * 1024, 65536, StreamSize::Known(3 * 1024 * 1024));
        listener.bytes_transferred(&n).unwrap();
        assert_eq!(listener.position(), 2 * 1024 * 1024);

        listener.finish(3 * 1024 * 1024);
        assert_eq!(listener.position(), 3 * 1024 * 1024);
    }
}
