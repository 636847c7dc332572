//! Where a version document or an update archive comes from.
//!
//! Locations are either `http://`/`https://` URLs fetched with `reqwest`, or local files
//! given as `file://` URLs or plain paths. Local locations make offline updates and
//! tests possible without a server.

use std::fmt;
use std::path::PathBuf;

use crate::core::UpdateError;

/// A parsed document or archive location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    Http(String),
    File(PathBuf),
}

impl Location {
    /// Classify `raw` as a remote URL or a local path.
    ///
    /// # Errors
    ///
    /// Returns [`UpdateError::Fetch`] for an empty location or an unsupported scheme such
    /// as `ftp://`.
    pub fn parse(raw: &str) -> Result<Self, UpdateError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(UpdateError::Fetch {
                location: raw.to_string(),
                reason: "location is empty".to_string(),
            });
        }

        let lower = trimmed.to_ascii_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            return Ok(Self::Http(trimmed.to_string()));
        }

        if let Some(rest) = trimmed.strip_prefix("file://") {
            return Ok(Self::File(file_url_path(rest)));
        }

        if let Some((scheme, _)) = trimmed.split_once("://") {
            return Err(UpdateError::Fetch {
                location: raw.to_string(),
                reason: format!("unsupported scheme '{scheme}'"),
            });
        }

        Ok(Self::File(PathBuf::from(trimmed)))
    }

    /// The final path segment, used to label downloads.
    #[must_use]
    pub fn file_name(&self) -> String {
        match self {
            Self::Http(url) => url
                .split(['?', '#'])
                .next()
                .and_then(|path| path.rsplit('/').find(|segment| !segment.is_empty()))
                .unwrap_or(url)
                .to_string(),
            Self::File(path) => path
                .file_name()
                .map_or_else(|| path.display().to_string(), |name| name.to_string_lossy().into_owned()),
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Http(url) => f.write_str(url),
            Self::File(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Path component of a `file://` URL (`file:///C:/x` becomes `C:/x` on Windows).
fn file_url_path(rest: &str) -> PathBuf {
    let path = rest.strip_prefix("localhost").unwrap_or(rest);
    if cfg!(windows) {
        let bytes = path.as_bytes();
        if bytes.len() >= 3 && bytes[0] == b'/' && bytes[1].is_ascii_alphabetic() && bytes[2] == b':' {
            return PathBuf::from(&path[1..]);
        }
    }
    PathBuf::from(path)
}
