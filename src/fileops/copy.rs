/*!
 * Copying single files to local paths or network destinations, with
 * optional filtering and replacements on the way
 */

use std::collections::HashMap;
use std::fs::{self, File};
use std::io;
use std::path::Path;

use tracing::{debug, info};

use super::filter::{apply_replacements, filter_properties, Replacement};
use super::temp::TempScope;
use super::{canonical_path, delete};
use crate::cli_progress::TransferReporter;
use crate::config::TransferConfig;
use crate::core::copier::copy_stream;
use crate::core::metadata::{is_identical, preserve_times};
use crate::core::session::StreamSize;
use crate::error::{ArtshipError, Result};
use crate::protocol::{self, parse_location, Location};

/// What `copy_filtered` should do besides copying
#[derive(Debug, Clone, Default)]
pub struct CopyRequest {
    /// Leave the destination alone when it looks identical
    pub skip_identical: bool,
    /// Applied in order after filtering
    pub replacements: Vec<Replacement>,
    /// Property filtering, when set
    pub properties: Option<HashMap<String, String>>,
    /// Log at info instead of debug
    pub verbose: bool,
}

impl CopyRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn skip_identical(mut self, skip: bool) -> Self {
        self.skip_identical = skip;
        self
    }

    pub fn replace(mut self, replacement: Replacement) -> Self {
        self.replacements.push(replacement);
        self
    }

    pub fn filter(mut self, properties: HashMap<String, String>) -> Self {
        self.properties = Some(properties);
        self
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }
}

fn report(verbose: bool, message: String) {
    if verbose {
        info!("{}", message);
    } else {
        debug!("{}", message);
    }
}

/// Copy `source` to `destination`, a local path or an `ftp://` / `http(s)://` URL.
///
/// A local destination is deleted first, its parent directories created, and
/// the copy given the source's modification time.
pub fn copy_file(source: &Path, destination: &str, verbose: bool, config: &TransferConfig) -> Result<()> {
    if !source.is_file() {
        return Err(ArtshipError::SourceNotFound(source.to_path_buf()));
    }
    let source_path = canonical_path(source)?;

    let location = parse_location(destination)?;
    let destination_path = match &location {
        Location::Local(path) => canonical_path(path)?,
        remote => {
            let bytes = protocol::upload(&source_path, remote, config)?;
            report(verbose, format!("[{}] uploaded to [{}] ({} bytes)", source_path.display(), remote, bytes));
            return Ok(());
        }
    };

    if source_path == destination_path {
        return Err(ArtshipError::SamePath {
            source: source_path,
            destination: destination_path,
        });
    }

    delete(&destination_path, None, true)?;
    if let Some(parent) = destination_path.parent() {
        fs::create_dir_all(parent)?;
    }

    let size = StreamSize::Known(fs::metadata(&source_path)?.len());
    let mut reporter = TransferReporter::for_transfer(config.show_progress, &destination_path.to_string_lossy(), size);
    let options = config.copy_options().with_stream_size(size);

    let mut input = File::open(&source_path)?;
    let output = File::create(&destination_path)?;
    let copied = copy_stream(&mut input, output, &options, &mut reporter)?;
    reporter.finish(copied.bytes_copied());

    preserve_times(&source_path, &destination_path)?;
    if !destination_path.is_file() {
        return Err(ArtshipError::Io(io::Error::new(
            io::ErrorKind::NotFound,
            format!("{} missing after copy", destination_path.display()),
        )));
    }

    report(verbose, format!("[{}] copied to [{}]", source_path.display(), destination_path.display()));
    Ok(())
}

fn read_text(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|e| match e.kind() {
        io::ErrorKind::InvalidData => {
            ArtshipError::Config(format!("[{}] is not UTF-8 text and cannot be filtered", path.display()))
        }
        _ => ArtshipError::Io(e),
    })
}

/// Copy with optional filtering and replacements.
///
/// Intermediate results live in a temp scope that is removed before this
/// returns. `Ok(false)` means the destination was skipped as identical.
pub fn copy_filtered(
    source: &Path,
    destination: &str,
    request: &CopyRequest,
    config: &TransferConfig,
) -> Result<bool> {
    if !source.is_file() {
        return Err(ArtshipError::SourceNotFound(source.to_path_buf()));
    }

    let scope = TempScope::new()?;
    let mut from = source.to_path_buf();

    if let Some(properties) = &request.properties {
        let filtered = filter_properties(&read_text(&from)?, properties)?;
        let temp = scope.write("filtered-", filtered.as_bytes())?;
        report(
            request.verbose,
            format!("[{}] copied to [{}] (with filtering)", from.display(), temp.display()),
        );
        from = temp;
    }

    if !request.replacements.is_empty() {
        let replaced = apply_replacements(&read_text(&from)?, &request.replacements);
        let temp = scope.write("replaced-", replaced.as_bytes())?;
        report(
            request.verbose,
            format!("[{}] copied to [{}] (with replacements)", source.display(), temp.display()),
        );
        from = temp;
    }

    if request.skip_identical {
        if let Location::Local(destination_path) = parse_location(destination)? {
            if is_identical(&from, &destination_path)? {
                info!("[{}] skipped - identical to [{}]", from.display(), destination_path.display());
                return Ok(false);
            }
        }
    }

    copy_file(&from, destination, request.verbose, config)?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use filetime::{set_file_mtime, FileTime};
    use tempfile::tempdir;

    fn config() -> TransferConfig {
        TransferConfig {
            retry_attempts: 0,
            ..Default::default()
        }
    }

    #[test]
    fn test_copy_file_local() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("a.txt");
        fs::write(&source, b"payload").unwrap();
        set_file_mtime(&source, FileTime::from_unix_time(1_500_000_000, 0)).unwrap();
        let target = dir.path().join("out/deeper/b.txt");

        copy_file(&source, &target.to_string_lossy(), false, &config()).unwrap();

        assert_eq!(fs::read(&target).unwrap(), b"payload");
        assert_eq!(
            FileTime::from_last_modification_time(&fs::metadata(&target).unwrap()),
            FileTime::from_unix_time(1_500_000_000, 0)
        );
    }

    #[test]
    fn test_copy_file_replaces_existing() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("a.txt");
        let target = dir.path().join("b.txt");
        fs::write(&source, b"new").unwrap();
        fs::write(&target, b"old and longer").unwrap();

        copy_file(&source, &target.to_string_lossy(), true, &config()).unwrap();
        assert_eq!(fs::read(&target).unwrap(), b"new");
    }

    #[test]
    fn test_copy_onto_itself_fails() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("a.txt");
        fs::write(&source, b"x").unwrap();
        let same = dir.path().join("sub/../a.txt");

        let err = copy_file(&source, &same.to_string_lossy(), false, &config()).unwrap_err();
        assert!(matches!(err, ArtshipError::SamePath { .. }));
        assert_eq!(fs::read(&source).unwrap(), b"x");
    }

    #[test]
    fn test_missing_source() {
        let dir = tempdir().unwrap();
        let err = copy_file(&dir.path().join("nope"), "out", false, &config()).unwrap_err();
        assert!(matches!(err, ArtshipError::SourceNotFound(_)));
    }

    #[test]
    fn test_unsupported_destination() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("a.txt");
        fs::write(&source, b"x").unwrap();
        let err = copy_file(&source, "scp://host/tmp/a.txt", false, &config()).unwrap_err();
        assert!(matches!(err, ArtshipError::Config(_)));
    }

    #[test]
    fn test_copy_filtered_applies_filtering_then_replacements() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("app.properties");
        fs::write(&source, "version=${version}\nname=@name@\nhost=localhost\n").unwrap();
        let target = dir.path().join("out/app.properties");

        let properties: HashMap<String, String> =
            [("version".to_string(), "2.0".to_string())].into_iter().collect();
        let request = CopyRequest::new()
            .filter(properties)
            .replace(Replacement::literal("localhost", "build.example.org"))
            .replace(Replacement::regex(r"version=(\d+)\.(\d+)", "version=$1-$2").unwrap());

        assert!(copy_filtered(&source, &target.to_string_lossy(), &request, &config()).unwrap());
        assert_eq!(
            fs::read_to_string(&target).unwrap(),
            "version=2-0\nname=@name@\nhost=build.example.org\n"
        );
    }

    #[test]
    fn test_skip_identical() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("a.bin");
        let target = dir.path().join("b.bin");
        fs::write(&source, b"same bytes").unwrap();

        let request = CopyRequest::new().skip_identical(true);
        assert!(copy_filtered(&source, &target.to_string_lossy(), &request, &config()).unwrap());
        assert!(!copy_filtered(&source, &target.to_string_lossy(), &request, &config()).unwrap());

        fs::write(&source, b"other bytes").unwrap();
        assert!(copy_filtered(&source, &target.to_string_lossy(), &request, &config()).unwrap());
        assert_eq!(fs::read(&target).unwrap(), b"other bytes");
    }

    #[test]
    fn test_filtering_rejects_binary() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("a.bin");
        fs::write(&source, [0xff, 0xfe, 0x00, 0x80]).unwrap();

        let request = CopyRequest::new().replace(Replacement::literal("a", "b"));
        let err = copy_filtered(&source, &dir.path().join("b.bin").to_string_lossy(), &request, &config()).unwrap_err();
        assert!(matches!(err, ArtshipError::Config(_)));
    }
}
