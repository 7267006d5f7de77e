/*!
 * Streaming SHA-256 for deployed checksum sidecars
 */

use std::fs::File;
use std::io::{self, BufReader, Read, Write};
use std::path::Path;

use sha2::{Digest, Sha256};

use crate::error::Result;

/// Extension of the checksum file published next to a deployed artifact
pub const SIDECAR_EXTENSION: &str = "sha256";

/// Incremental SHA-256
#[derive(Clone, Default)]
pub struct StreamingHasher {
    hasher: Sha256,
}

impl StreamingHasher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, data: &[u8]) {
        self.hasher.update(data);
    }

    /// Lower-case hex digest
    pub fn finalize_hex(self) -> String {
        hex::encode(self.hasher.finalize())
    }
}

impl Write for StreamingHasher {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.update(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Hash everything a reader yields
pub fn checksum_reader<R: Read>(reader: &mut R) -> Result<String> {
    let mut hasher = StreamingHasher::new();
    let mut buffer = [0u8; 64 * 1024];

    loop {
        let n = match reader.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        };
        hasher.update(&buffer[..n]);
    }

    Ok(hasher.finalize_hex())
}

/// Hex SHA-256 of a file
pub fn calculate_checksum(path: &Path) -> Result<String> {
    let mut file = BufReader::new(File::open(path)?);
    checksum_reader(&mut file)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use tempfile::NamedTempFile;

    const HELLO_WORLD: &str = "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9";

    #[test]
    fn test_streaming_hasher() {
        let mut hasher = StreamingHasher::new();
        hasher.update(b"hello ");
        hasher.update(b"world");
        assert_eq!(hasher.finalize_hex(), HELLO_WORLD);
    }

    #[test]
    fn test_hasher_as_writer() {
        let mut hasher = StreamingHasher::new();
        io::copy(&mut Cursor::new(b"hello world".to_vec()), &mut hasher).unwrap();
        assert_eq!(hasher.finalize_hex(), HELLO_WORLD);
    }

    #[test]
    fn test_calculate_checksum() {
        let mut temp = NamedTempFile::new().unwrap();
        temp.write_all(b"hello world").unwrap();
        temp.flush().unwrap();

        assert_eq!(calculate_checksum(temp.path()).unwrap(), HELLO_WORLD);
    }
}
