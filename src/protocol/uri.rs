/*!
 * Parsing transfer destinations: local paths and network URLs
 */

use std::fmt;
use std::path::PathBuf;

use percent_encoding::percent_decode_str;
use url::Url;

use super::ftp::{FtpTarget, DEFAULT_PORT};
use crate::error::{ArtshipError, Result};

/// Where a transfer reads from or writes to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    Local(PathBuf),
    Ftp(FtpTarget),
    Http(Url),
}

impl Location {
    /// True for locations reached over the network
    pub fn is_network(&self) -> bool {
        !matches!(self, Location::Local(_))
    }

    pub fn as_local(&self) -> Option<&PathBuf> {
        match self {
            Location::Local(path) => Some(path),
            _ => None,
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Location::Local(path) => write!(f, "{}", path.display()),
            Location::Ftp(target) => match &target.username {
                Some(user) => write!(f, "ftp://{}@{}:{}{}", user, target.host, target.port, target.path),
                None => write!(f, "ftp://{}:{}{}", target.host, target.port, target.path),
            },
            Location::Http(url) => {
                let mut shown = url.clone();
                if shown.password().is_some() {
                    let _ = shown.set_password(Some("****"));
                }
                write!(f, "{}", shown)
            }
        }
    }
}

/// Parse a destination string.
///
/// Anything without `://` is a local path, so Windows drive letters are never
/// mistaken for URL schemes.
pub fn parse_location(input: &str) -> Result<Location> {
    let input = input.trim();
    if input.is_empty() {
        return Err(ArtshipError::Config("Empty location".to_string()));
    }
    if !input.contains("://") {
        return Ok(Location::Local(PathBuf::from(input)));
    }

    let url = Url::parse(input)?;
    match url.scheme() {
        "file" => url
            .to_file_path()
            .map(Location::Local)
            .map_err(|_| ArtshipError::Config(format!("Invalid file URL: {}", input))),
        "ftp" => parse_ftp(&url),
        "http" | "https" => Ok(Location::Http(url)),
        other => Err(ArtshipError::Config(format!("Unsupported protocol: {}", other))),
    }
}

fn parse_ftp(url: &Url) -> Result<Location> {
    let host = url
        .host_str()
        .filter(|h| !h.is_empty())
        .ok_or_else(|| ArtshipError::Config(format!("FTP URL must include a host: {}", url)))?;

    let path = decode(url.path())?;
    if path.is_empty() || path == "/" {
        return Err(ArtshipError::Config(format!("FTP URL must include a file path: {}", url)));
    }

    let username = match url.username() {
        "" => None,
        user => Some(decode(user)?),
    };
    let password = url.password().map(decode).transpose()?;

    Ok(Location::Ftp(FtpTarget {
        host: host.to_string(),
        port: url.port().unwrap_or(DEFAULT_PORT),
        username,
        password,
        path,
    }))
}

/// Undo URL percent-encoding; FTP commands carry the raw text
fn decode(component: &str) -> Result<String> {
    percent_decode_str(component)
        .decode_utf8()
        .map(|decoded| decoded.into_owned())
        .map_err(|e| ArtshipError::Config(format!("Invalid percent-encoding in {:?}: {}", component, e)))
}
