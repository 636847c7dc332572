//! Remote version discovery.
//!
//! The remote side publishes its version as a single-line marker element in an
//! arbitrary text document, for example an HTML download page:
//!
//! ```html
//! <div id="version">1.0.4</div>
//! ```
//!
//! The document is scanned line by line. A line matches when it contains an opening tag
//! carrying `id="<element id>"` immediately followed by a token of digits and dots and a
//! closing tag. Elements spanning several lines are not recognised.

use regex::Regex;
use std::time::Duration;
use tracing::{debug, info};

use crate::constants::PROBE_TIMEOUT;
use crate::core::UpdateError;
use crate::upgrade::location::Location;

/// Find the version token of the first line carrying a marker element with `element_id`.
///
/// # Examples
///
/// ```rust
/// use selfswap::upgrade::probe::extract_marker;
///
/// let page = "<html>\n<div id=\"version\">1.0.4</div>\n</html>";
/// assert_eq!(extract_marker(page, "version").as_deref(), Some("1.0.4"));
/// assert_eq!(extract_marker(page, "build"), None);
/// ```
#[must_use]
pub fn extract_marker(document: &str, element_id: &str) -> Option<String> {
    let pattern = format!(r#"<[^<>]*\sid="{}"[^<>]*>([0-9.]+)</"#, regex::escape(element_id));
    let Ok(marker) = Regex::new(&pattern) else {
        return None;
    };

    document
        .lines()
        .find_map(|line| marker.captures(line).and_then(|caps| caps.get(1)).map(|m| m.as_str().to_string()))
}

/// Read the text behind `location`.
///
/// HTTP(S) locations are requested with `client`; non-success statuses count as failures.
/// Anything else is read from the local file system.
///
/// # Errors
///
/// Every transport, status or read failure becomes [`UpdateError::Fetch`].
pub async fn read_document(client: &reqwest::Client, location: &str) -> Result<String, UpdateError> {
    let fetch_error = |reason: String| UpdateError::Fetch {
        location: location.to_string(),
        reason,
    };

    match Location::parse(location)? {
        Location::Http(url) => {
            debug!("Requesting version document from {}", url);
            let response = client
                .get(&url)
                .send()
                .await
                .and_then(reqwest::Response::error_for_status)
                .map_err(|e| fetch_error(e.to_string()))?;
            response.text().await.map_err(|e| fetch_error(e.to_string()))
        }
        Location::File(path) => {
            debug!("Reading version document from {}", path.display());
            tokio::fs::read_to_string(&path).await.map_err(|e| fetch_error(e.to_string()))
        }
    }
}

/// Fetches a version document and extracts the marker token from it.
pub struct RemoteVersionProbe {
    client: reqwest::Client,
}

impl RemoteVersionProbe {
    /// Probe with the default request timeout.
    pub fn new() -> Result<Self, UpdateError> {
        Self::with_timeout(PROBE_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self, UpdateError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("selfswap/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| UpdateError::Fetch {
                location: String::new(),
                reason: format!("failed to build HTTP client: {e}"),
            })?;
        Ok(Self {
            client,
        })
    }

    /// Fetch `location` and return the version token of the `element_id` marker.
    ///
    /// # Errors
    ///
    /// - [`UpdateError::Fetch`] if the document cannot be retrieved
    /// - [`UpdateError::NotFound`] if no line carries the marker
    pub async fn fetch(&self, location: &str, element_id: &str) -> Result<String, UpdateError> {
        let document = read_document(&self.client, location).await?;

        let version = extract_marker(&document, element_id).ok_or_else(|| UpdateError::NotFound {
            element_id: element_id.to_string(),
            location: location.to_string(),
        })?;

        info!("Remote version at {} is {}", location, version);
        Ok(version)
    }
}
