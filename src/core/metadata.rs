/*!
 * Timestamp preservation and the "identical file" test used by skip-identical copies
 */

use std::fs;
use std::path::Path;

use filetime::{set_file_mtime, FileTime};

use crate::error::Result;

/// Give `destination` the modification time of `source`
pub fn preserve_times(source: &Path, destination: &Path) -> Result<()> {
    let metadata = fs::metadata(source)?;
    set_file_mtime(destination, FileTime::from_last_modification_time(&metadata))?;
    Ok(())
}

/// Two files count as identical when they have the same length and the same
/// modification time. A missing destination is never identical.
pub fn is_identical(source: &Path, destination: &Path) -> Result<bool> {
    let destination = match fs::metadata(destination) {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(e.into()),
    };
    let source = fs::metadata(source)?;

    Ok(source.len() == destination.len()
        && FileTime::from_last_modification_time(&source)
            == FileTime::from_last_modification_time(&destination))
}
