/*!
 * Deploying files into a Maven-layout repository
 *
 * The artifact is uploaded to `<url>/<group path>/<artifact>/<version>/`
 * followed by a `.sha256` checksum file next to it.
 */

use std::fmt;
use std::path::Path;

use tracing::info;

use crate::config::TransferConfig;
use crate::core::checksum::{calculate_checksum, SIDECAR_EXTENSION};
use crate::error::{ArtshipError, Result};
use crate::protocol::ftp::FileType;
use crate::protocol::{parse_location, upload, upload_bytes};

/// Maven coordinates of a deployed file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Coordinates {
    pub group_id: String,
    pub artifact_id: String,
    pub version: String,
    pub classifier: Option<String>,
    /// Packaging, taken from the file extension
    pub extension: String,
}

impl Coordinates {
    pub fn new(group_id: &str, artifact_id: &str, version: &str, extension: &str) -> Self {
        Self {
            group_id: group_id.trim().to_string(),
            artifact_id: artifact_id.trim().to_string(),
            version: version.trim().to_string(),
            classifier: None,
            extension: extension.trim().to_string(),
        }
    }

    pub fn with_classifier(mut self, classifier: Option<&str>) -> Self {
        self.classifier = classifier
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_string);
        self
    }

    /// Coordinates for `file`, its extension used as packaging
    pub fn for_file(file: &Path, group_id: &str, artifact_id: &str, version: &str) -> Result<Self> {
        let extension = file
            .extension()
            .and_then(|e| e.to_str())
            .filter(|e| !e.is_empty())
            .ok_or_else(|| ArtshipError::Deploy(format!("[{}] has no extension to use as packaging", file.display())))?;
        Ok(Self::new(group_id, artifact_id, version, extension))
    }

    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("groupId", &self.group_id),
            ("artifactId", &self.artifact_id),
            ("version", &self.version),
            ("packaging", &self.extension),
        ] {
            if value.is_empty() {
                return Err(ArtshipError::Deploy(format!("{} must not be empty", name)));
            }
        }
        Ok(())
    }

    pub fn file_name(&self) -> String {
        match &self.classifier {
            Some(classifier) => format!(
                "{}-{}-{}.{}",
                self.artifact_id, self.version, classifier, self.extension
            ),
            None => format!("{}-{}.{}", self.artifact_id, self.version, self.extension),
        }
    }

    /// `org/example/app/1.0/app-1.0.jar`
    pub fn repository_path(&self) -> String {
        format!(
            "{}/{}/{}/{}",
            self.group_id.replace('.', "/"),
            self.artifact_id,
            self.version,
            self.file_name()
        )
    }
}

impl fmt::Display for Coordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.group_id, self.artifact_id, self.version)?;
        if let Some(classifier) = &self.classifier {
            write!(f, ":{}", classifier)?;
        }
        Ok(())
    }
}

/// Where a deployment ended up
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployReceipt {
    pub artifact_url: String,
    pub checksum_url: String,
    pub checksum: String,
    pub bytes: u64,
}

pub struct Deployer {
    config: TransferConfig,
}

impl Deployer {
    /// Artifacts always travel in binary mode regardless of the configured FTP file type
    pub fn new(mut config: TransferConfig) -> Self {
        config.ftp.file_type = FileType::Binary;
        Self { config }
    }

    pub fn deploy(&self, file: &Path, coordinates: &Coordinates, repository_url: &str) -> Result<DeployReceipt> {
        if !file.is_file() {
            return Err(ArtshipError::SourceNotFound(file.to_path_buf()));
        }
        coordinates.validate()?;
        let base = repository_url.trim().trim_end_matches('/');
        if base.is_empty() {
            return Err(ArtshipError::Deploy("Repository URL must not be empty".to_string()));
        }

        let description = format!("[{}] to [{}] as [{}]", file.display(), base, coordinates);
        match self.publish(file, coordinates, base) {
            Ok(receipt) => {
                info!("Deployed {}", description);
                Ok(receipt)
            }
            Err(e) => Err(ArtshipError::Deploy(format!("Failed to deploy {}: {}", description, e))),
        }
    }

    fn publish(&self, file: &Path, coordinates: &Coordinates, base: &str) -> Result<DeployReceipt> {
        let artifact_url = format!("{}/{}", base, coordinates.repository_path());
        let checksum_url = format!("{}.{}", artifact_url, SIDECAR_EXTENSION);

        let location = parse_location(&artifact_url)?;
        let bytes = upload(file, &location, &self.config)?;
        let checksum = calculate_checksum(file)?;
        if let Some(deployed) = location.as_local() {
            let actual = calculate_checksum(deployed)?;
            if actual != checksum {
                return Err(ArtshipError::ChecksumMismatch {
                    expected: checksum,
                    actual,
                });
            }
        }
        upload_bytes(checksum.as_bytes(), &parse_location(&checksum_url)?, &self.config)?;

        Ok(DeployReceipt {
            artifact_url,
            checksum_url,
            checksum,
            bytes,
        })
    }
}
