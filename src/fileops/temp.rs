/*!
 * Scoped temporary files and the explicit cleanup list
 */

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tempfile::TempDir;
use tracing::{debug, warn};

use crate::error::Result;

/// A private temporary directory; everything created through it is removed
/// when the scope is dropped
#[derive(Debug)]
pub struct TempScope {
    dir: TempDir,
}

impl TempScope {
    pub fn new() -> Result<Self> {
        let dir = tempfile::Builder::new().prefix("artship-").tempdir()?;
        debug!("Temp scope {}", dir.path().display());
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Create a new empty file inside the scope
    pub fn file(&self, prefix: &str) -> Result<PathBuf> {
        self.write(prefix, &[])
    }

    /// Create a file inside the scope holding `contents`
    pub fn write(&self, prefix: &str, contents: &[u8]) -> Result<PathBuf> {
        let mut file = tempfile::Builder::new()
            .prefix(prefix)
            .tempfile_in(self.dir.path())?;
        file.write_all(contents)?;
        file.flush()?;
        let path = file.into_temp_path().keep().map_err(|e| e.error)?;
        Ok(path)
    }
}

/// Paths that could not be deleted when asked to, retried once at shutdown.
///
/// The binary owns one list and drains it right before exiting.
#[derive(Debug, Default)]
pub struct CleanupList {
    paths: Mutex<Vec<PathBuf>>,
}

impl CleanupList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, path: impl Into<PathBuf>) {
        let path = path.into();
        let mut paths = self.paths.lock().unwrap_or_else(|e| e.into_inner());
        if !paths.contains(&path) {
            paths.push(path);
        }
    }

    pub fn len(&self) -> usize {
        self.paths.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Try to delete every registered path, returning how many are still
    /// left behind
    pub fn drain(&self) -> usize {
        let paths: Vec<PathBuf> = std::mem::take(&mut *self.paths.lock().unwrap_or_else(|e| e.into_inner()));

        let mut leftovers = 0;
        for path in paths {
            let removal = if path.is_dir() {
                fs::remove_dir_all(&path)
            } else {
                fs::remove_file(&path)
            };
            match removal {
                Ok(()) => debug!("Cleaned up [{}]", path.display()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    warn!("Failed to delete [{}]: {}", path.display(), e);
                    leftovers += 1;
                }
            }
        }
        leftovers
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_removes_its_files() {
        let scope = TempScope::new().unwrap();
        let first = scope.write("filtered", b"one").unwrap();
        let second = scope.file("replaced").unwrap();
        assert_ne!(first, second);
        assert_eq!(fs::read(&first).unwrap(), b"one");
        assert!(second.is_file());

        let root = scope.path().to_path_buf();
        drop(scope);
        assert!(!root.exists());
        assert!(!first.exists());
    }

    #[test]
    fn test_cleanup_list_drains() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("stale.tmp");
        let nested = dir.path().join("nested");
        fs::write(&file, b"x").unwrap();
        fs::create_dir_all(nested.join("deep")).unwrap();

        let list = CleanupList::new();
        list.register(&file);
        list.register(&file);
        list.register(&nested);
        list.register(dir.path().join("already-gone"));
        assert_eq!(list.len(), 3);

        assert_eq!(list.drain(), 0);
        assert!(list.is_empty());
        assert!(!file.exists());
        assert!(!nested.exists());
    }
}
