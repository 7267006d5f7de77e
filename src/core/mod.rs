/*!
 * Core transfer machinery: the monitored copier and what it is built from
 */

pub mod ascii;
pub mod checksum;
pub mod copier;
pub mod listener;
pub mod metadata;
pub mod retry;
pub mod session;

pub use ascii::{FromNetAscii, ToNetAscii, TransferMode};
pub use copier::{copy_stream, Copied, CopyOptions, MonitoredReader, StreamCopier, DEFAULT_CHUNK_SIZE};
pub use listener::{ChannelListener, CopyStreamListener, MilestoneLogger, NoopListener, ProgressNotification};
pub use session::{StreamSize, TransferSession, DEFAULT_MILESTONE_UNIT};
