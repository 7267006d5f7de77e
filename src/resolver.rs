/*!
 * Artifact resolution
 *
 * The strategy is picked once, when the resolver is built, from a probe of
 * what the current environment allows. Every lookup afterwards goes straight
 * to that strategy.
 */

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::config::{RepositoryConfig, TransferConfig};
use crate::deploy::Coordinates;
use crate::error::{ArtshipError, Result};
use crate::protocol::ftp::FileType;
use crate::protocol::{download, parse_location};

/// Environment variable forcing offline resolution when set to anything but
/// an empty string, `0` or `false`
pub const OFFLINE_ENV: &str = "ARTSHIP_OFFLINE";

/// An artifact to resolve, optionally with a file already attached
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub group_id: String,
    pub artifact_id: String,
    pub version: String,
    pub classifier: Option<String>,
    pub artifact_type: String,
    pub file: Option<PathBuf>,
}

impl Artifact {
    pub fn new(group_id: &str, artifact_id: &str, version: &str) -> Self {
        Self {
            group_id: group_id.to_string(),
            artifact_id: artifact_id.to_string(),
            version: version.to_string(),
            classifier: None,
            artifact_type: "jar".to_string(),
            file: None,
        }
    }

    /// Parse `group:artifact:version[:type[:classifier]]`
    pub fn parse(input: &str) -> Result<Self> {
        let parts: Vec<&str> = input.trim().split(':').map(str::trim).collect();
        if !(3..=5).contains(&parts.len()) || parts[..3].iter().any(|p| p.is_empty()) {
            return Err(ArtshipError::Resolution(format!(
                "Expected group:artifact:version[:type[:classifier]], got [{}]",
                input
            )));
        }

        let mut artifact = Self::new(parts[0], parts[1], parts[2]);
        if let Some(artifact_type) = parts.get(3).filter(|t| !t.is_empty()) {
            artifact.artifact_type = artifact_type.to_string();
        }
        artifact.classifier = parts.get(4).filter(|c| !c.is_empty()).map(|c| c.to_string());
        Ok(artifact)
    }

    pub fn coordinates(&self) -> Coordinates {
        Coordinates::new(&self.group_id, &self.artifact_id, &self.version, &self.artifact_type)
            .with_classifier(self.classifier.as_deref())
    }
}

/// A way of turning an artifact into a local file
pub trait ArtifactResolver {
    /// `Ok(None)` when the artifact cannot be found
    fn resolve_file(&self, artifact: &Artifact) -> Result<Option<PathBuf>>;

    fn name(&self) -> &'static str;
}

/// Looks only at the attached file and the local repository
#[derive(Debug, Clone)]
pub struct LocalRepositoryResolver {
    root: PathBuf,
}

impl LocalRepositoryResolver {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Where `artifact` lives in the local repository, whether or not it exists
    pub fn path_of(&self, artifact: &Artifact) -> PathBuf {
        self.root.join(artifact.coordinates().repository_path())
    }
}

impl ArtifactResolver for LocalRepositoryResolver {
    fn resolve_file(&self, artifact: &Artifact) -> Result<Option<PathBuf>> {
        if let Some(file) = artifact.file.as_ref().filter(|f| f.is_file()) {
            return Ok(Some(file.clone()));
        }
        let path = self.path_of(artifact);
        Ok(path.is_file().then_some(path))
    }

    fn name(&self) -> &'static str {
        "local repository"
    }
}

/// Local repository first, then each remote in order, downloading into the
/// local repository
pub struct RemoteRepositoryResolver {
    local: LocalRepositoryResolver,
    remotes: Vec<String>,
    config: TransferConfig,
}

impl RemoteRepositoryResolver {
    pub fn new(config: &TransferConfig) -> Self {
        let mut config = config.clone();
        config.ftp.file_type = FileType::Binary;
        Self {
            local: LocalRepositoryResolver::new(&config.repository.local),
            remotes: config.repository.remotes.clone(),
            config,
        }
    }
}

impl ArtifactResolver for RemoteRepositoryResolver {
    fn resolve_file(&self, artifact: &Artifact) -> Result<Option<PathBuf>> {
        if let Some(found) = self.local.resolve_file(artifact)? {
            return Ok(Some(found));
        }

        let target = self.local.path_of(artifact);
        let relative = artifact.coordinates().repository_path();
        let mut last_error = None;

        for remote in &self.remotes {
            let url = format!("{}/{}", remote.trim_end_matches('/'), relative);
            let location = parse_location(&url)?;
            match download(&location, &target, &self.config) {
                Ok(Some(bytes)) => {
                    info!("Downloaded {} ({} bytes)", location, bytes);
                    return Ok(Some(target));
                }
                Ok(None) => debug!("{} not found in {}", artifact.coordinates(), remote),
                Err(e) => {
                    warn!("Failed to download from {}: {}", location, e);
                    last_error = Some(e);
                }
            }
        }

        match last_error {
            Some(e) => Err(ArtshipError::Resolution(format!(
                "Failed to resolve {}: {}",
                artifact.coordinates(),
                e
            ))),
            None => Ok(None),
        }
    }

    fn name(&self) -> &'static str {
        "remote repositories"
    }
}

/// What the environment allows, probed once
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    pub offline: bool,
    pub has_remotes: bool,
}

impl Capabilities {
    pub fn probe(config: &RepositoryConfig) -> Self {
        let env = std::env::var(OFFLINE_ENV).ok();
        Self::from_parts(config, env.as_deref())
    }

    fn from_parts(config: &RepositoryConfig, offline_env: Option<&str>) -> Self {
        let env_offline = offline_env
            .map(|v| v.trim())
            .is_some_and(|v| !v.is_empty() && v != "0" && !v.eq_ignore_ascii_case("false"));
        Self {
            offline: config.offline || env_offline,
            has_remotes: !config.remotes.is_empty(),
        }
    }

    pub fn can_download(&self) -> bool {
        !self.offline && self.has_remotes
    }
}

/// Resolver delegating to the strategy chosen at construction
pub struct RepositoryResolver {
    strategy: Box<dyn ArtifactResolver>,
}

impl RepositoryResolver {
    pub fn select(config: &TransferConfig, capabilities: Capabilities) -> Self {
        let strategy: Box<dyn ArtifactResolver> = if capabilities.can_download() {
            Box::new(RemoteRepositoryResolver::new(config))
        } else {
            Box::new(LocalRepositoryResolver::new(&config.repository.local))
        };
        info!("Resolving artifacts using {}", strategy.name());
        Self { strategy }
    }

    /// Probe the environment and select
    pub fn from_config(config: &TransferConfig) -> Self {
        Self::select(config, Capabilities::probe(&config.repository))
    }
}

impl ArtifactResolver for RepositoryResolver {
    fn resolve_file(&self, artifact: &Artifact) -> Result<Option<PathBuf>> {
        self.strategy.resolve_file(artifact)
    }

    fn name(&self) -> &'static str {
        self.strategy.name()
    }
}
