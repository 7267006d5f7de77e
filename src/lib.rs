/*!
 * artship - monitored artifact transfer toolkit
 *
 * Moves build artifacts between local paths, FTP servers and HTTP
 * repositories with:
 * - Chunked stream copies reporting progress at byte milestones
 * - Network-ASCII translation for text-mode FTP transfers
 * - Filtering and replacements applied while copying
 * - Deployment into Maven-layout repositories with SHA-256 sidecars
 * - Artifact resolution from local and remote repositories
 *
 * Version: 0.3.0
 */

pub mod cli_progress;
pub mod config;
pub mod core;
pub mod deploy;
pub mod error;
pub mod fileops;
pub mod logging;
pub mod protocol;
pub mod resolver;

// Re-export commonly used types
pub use config::TransferConfig;
pub use core::{copy_stream, CopyOptions, CopyStreamListener, ProgressNotification, StreamCopier, StreamSize};
pub use deploy::{Coordinates, Deployer};
pub use error::{ArtshipError, Result};
pub use fileops::{copy_file, copy_filtered, CopyRequest};
pub use resolver::{Artifact, ArtifactResolver, RepositoryResolver};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert_eq!(VERSION, env!("CARGO_PKG_VERSION"));
    }
}
