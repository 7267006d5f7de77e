/*!
 * File operations used by build tooling: canonical paths, verified lookups,
 * copying with filtering, recursive deletion, scoped temp files
 */

pub mod copy;
pub mod filter;
pub mod temp;

use std::fs;
use std::path::{Component, Path, PathBuf, MAIN_SEPARATOR};

use tracing::warn;
use walkdir::WalkDir;

pub use copy::{copy_file, copy_filtered, CopyRequest};
pub use filter::{apply_replacements, filter_properties, Replacement};
pub use temp::{CleanupList, TempScope};

use crate::error::{ArtshipError, Result};

/// Include pattern matching everything
pub const INCLUDE_ALL: &[&str] = &["**"];

/// Canonical form of `path`, also for paths whose tail does not exist yet.
///
/// `.` and `..` are folded lexically first, then the longest existing
/// ancestor is resolved through the filesystem and the rest appended.
pub fn canonical_path(path: &Path) -> Result<PathBuf> {
    let absolute = if path.is_absolute() {
        normalize(path)
    } else {
        normalize(&std::env::current_dir()?.join(path))
    };

    let mut existing = absolute.as_path();
    let mut missing = Vec::new();
    let base = loop {
        match fs::canonicalize(existing) {
            Ok(resolved) => break resolved,
            Err(_) => match (existing.parent(), existing.file_name()) {
                (Some(parent), Some(name)) => {
                    missing.push(name.to_os_string());
                    existing = parent;
                }
                _ => return Ok(absolute.clone()),
            },
        }
    };

    let mut result = base;
    for name in missing.into_iter().rev() {
        result.push(name);
    }
    Ok(result)
}

fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

fn verified(parent: Option<&Path>, path: &str) -> Result<PathBuf> {
    let trimmed = path.trim();
    if trimmed.is_empty() {
        return Err(ArtshipError::InvalidPath(PathBuf::from(path)));
    }
    let joined = match parent {
        Some(parent) => parent.join(trimmed),
        None => PathBuf::from(trimmed),
    };
    let canonical = canonical_path(&joined)?;
    if !canonical.exists() {
        return Err(ArtshipError::SourceNotFound(canonical));
    }
    Ok(canonical)
}

/// Existing path, resolved against `parent` when given
pub fn file(parent: Option<&Path>, path: &str) -> Result<PathBuf> {
    verified(parent, path)
}

/// Existing directory
pub fn directory(path: &str) -> Result<PathBuf> {
    let resolved = verified(None, path)?;
    if !resolved.is_dir() {
        return Err(ArtshipError::InvalidPath(resolved));
    }
    Ok(resolved)
}

/// Path of `file` inside `directory`, starting with a separator:
/// `/some` and `/some/folder/1.txt` give `/folder/1.txt`
pub fn relative_path(directory: &Path, file: &Path) -> Result<String> {
    let directory = canonical_path(directory)?;
    let file = canonical_path(file)?;

    let relative = file
        .strip_prefix(&directory)
        .ok()
        .filter(|r| !r.as_os_str().is_empty())
        .ok_or_else(|| ArtshipError::NotAChild {
            file: file.clone(),
            directory: directory.clone(),
        })?;

    let mut result = String::new();
    for component in relative.components() {
        result.push(MAIN_SEPARATOR);
        result.push_str(&component.as_os_str().to_string_lossy());
    }
    Ok(result)
}

/// Delete a file, or a directory with everything in it.
///
/// Paths that cannot be removed are registered with `cleanup` when given.
/// Returns `Ok(false)` when something was left behind, unless
/// `fail_if_failed` turns that into an error.
pub fn delete(path: &Path, cleanup: Option<&CleanupList>, fail_if_failed: bool) -> Result<bool> {
    match fs::symlink_metadata(path) {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(true),
        Err(e) => return Err(e.into()),
    }

    let mut result = true;
    for entry in WalkDir::new(path).contents_first(true) {
        let entry = entry.map_err(std::io::Error::from)?;
        let removal = if entry.file_type().is_dir() {
            fs::remove_dir(entry.path())
        } else {
            fs::remove_file(entry.path())
        };

        if let Err(e) = removal {
            if let Some(cleanup) = cleanup {
                cleanup.register(entry.path());
                warn!("Failed to delete [{}] ({}), will retry on exit", entry.path().display(), e);
            }
            if fail_if_failed {
                return Err(ArtshipError::DeleteFailed(entry.path().to_path_buf()));
            }
            result = false;
        }
    }

    Ok(result)
}

/// A value counts as set unless absent or `"none"` in any case
pub fn is_set(value: Option<&str>) -> bool {
    value.is_some_and(|v| !v.eq_ignore_ascii_case("none"))
}
