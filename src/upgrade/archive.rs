//! Downloading and unpacking update archives into a staging directory.
//!
//! Archives are standard zip files. Remote archives are streamed to a temporary file
//! first, then unpacked entry by entry on a blocking thread. Entry paths are preserved
//! relative to the destination; entries that would land outside it are rejected.
//!
//! Extraction is not transactional. When an entry fails, everything unpacked before it
//! stays in the destination and the caller decides whether to delete it.

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info};
use zip::ZipArchive;

use crate::core::UpdateError;
use crate::upgrade::location::Location;
use crate::utils::fs::{ensure_dir, set_mode};
use crate::utils::path_validation::validate_no_traversal;
use crate::utils::progress::ProgressBar;

/// What an extraction produced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExtractSummary {
    pub files: usize,
    pub directories: usize,
}

/// Unpack the zip archive at `archive` into `destination`.
///
/// # Errors
///
/// - [`UpdateError::Io`] if the archive cannot be opened or an output path cannot be created
/// - [`UpdateError::Extract`] for malformed archives, unreadable entries, and entries
///   escaping `destination`
pub fn extract_archive(archive: &Path, destination: &Path) -> Result<ExtractSummary, UpdateError> {
    let extract_error = |reason: String| UpdateError::Extract {
        archive: archive.display().to_string(),
        reason,
    };

    let file = File::open(archive).map_err(|e| UpdateError::io("open archive", archive, e))?;
    let mut zip = ZipArchive::new(file).map_err(|e| extract_error(e.to_string()))?;
    ensure_dir(destination)?;

    let mut summary = ExtractSummary::default();
    for index in 0..zip.len() {
        let mut entry = zip.by_index(index).map_err(|e| extract_error(e.to_string()))?;
        let name = entry.name().to_string();

        validate_no_traversal(Path::new(&name)).map_err(|reason| extract_error(format!("unsafe entry: {reason}")))?;
        let relative = entry
            .enclosed_name()
            .ok_or_else(|| extract_error(format!("unsafe entry: {name}")))?;
        let out_path = destination.join(&relative);

        if entry.is_dir() {
            ensure_dir(&out_path)?;
            summary.directories += 1;
            continue;
        }

        if let Some(parent) = out_path.parent() {
            ensure_dir(parent)?;
        }
        let mut output = File::create(&out_path).map_err(|e| UpdateError::io("create file", &out_path, e))?;
        std::io::copy(&mut entry, &mut output).map_err(|e| extract_error(format!("entry '{name}': {e}")))?;

        if let Some(mode) = entry.unix_mode() {
            set_mode(&out_path, mode & 0o7777)?;
        }

        debug!("Extracted {}", out_path.display());
        summary.files += 1;
    }

    Ok(summary)
}

/// Downloads update archives and unpacks them into staging directories.
///
/// # Examples
///
/// ```rust,no_run
/// use selfswap::upgrade::ArchiveFetcher;
/// use std::path::Path;
///
/// # async fn example() -> Result<(), selfswap::core::UpdateError> {
/// let fetcher = ArchiveFetcher::new()?;
/// let summary = fetcher
///     .fetch_and_stage("https://example.com/app-1.0.4.zip", Path::new("/opt/app/update-staging"))
///     .await?;
/// println!("{} files staged", summary.files);
/// # Ok(())
/// # }
/// ```
pub struct ArchiveFetcher {
    client: reqwest::Client,
    show_progress: bool,
}

impl ArchiveFetcher {
    pub fn new() -> Result<Self, UpdateError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("selfswap/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| UpdateError::Fetch {
                location: String::new(),
                reason: format!("failed to build HTTP client: {e}"),
            })?;
        Ok(Self {
            client,
            show_progress: true,
        })
    }

    /// Enable or disable the download progress bar.
    #[must_use]
    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    /// Fetch the archive at `archive_location` and unpack it into `destination`.
    ///
    /// `destination` and its parents are created as needed.
    pub async fn fetch_and_stage(
        &self,
        archive_location: &str,
        destination: &Path,
    ) -> Result<ExtractSummary, UpdateError> {
        ensure_dir(destination)?;

        let location = Location::parse(archive_location)?;
        // The temp file must outlive extraction.
        let (archive_path, _download): (PathBuf, Option<NamedTempFile>) = match &location {
            Location::Http(url) => {
                let temp = self.download(url, &location.file_name()).await?;
                (temp.path().to_path_buf(), Some(temp))
            }
            Location::File(path) => {
                if !path.is_file() {
                    return Err(UpdateError::Fetch {
                        location: archive_location.to_string(),
                        reason: "archive file does not exist".to_string(),
                    });
                }
                (path.clone(), None)
            }
        };

        let target = destination.to_path_buf();
        let summary = tokio::task::spawn_blocking(move || extract_archive(&archive_path, &target))
            .await
            .map_err(|e| UpdateError::Extract {
                archive: archive_location.to_string(),
                reason: format!("extraction task failed: {e}"),
            })??;

        info!(
            "Staged {} files and {} directories into {}",
            summary.files,
            summary.directories,
            destination.display()
        );
        Ok(summary)
    }

    async fn download(&self, url: &str, label: &str) -> Result<NamedTempFile, UpdateError> {
        let fetch_error = |reason: String| UpdateError::Fetch {
            location: url.to_string(),
            reason,
        };

        debug!("Downloading archive from {}", url);
        let mut response = self
            .client
            .get(url)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| fetch_error(e.to_string()))?;

        let mut temp = NamedTempFile::new().map_err(|e| UpdateError::io("create", std::env::temp_dir(), e))?;
        let progress = ProgressBar::for_download(response.content_length(), self.show_progress);
        progress.set_message(label.to_string());

        loop {
            let chunk = match response.chunk().await {
                Ok(Some(chunk)) => chunk,
                Ok(None) => break,
                Err(e) => {
                    progress.abandon();
                    return Err(fetch_error(e.to_string()));
                }
            };
            temp.write_all(&chunk).map_err(|e| UpdateError::io("write", temp.path(), e))?;
            progress.inc(chunk.len() as u64);
        }

        temp.flush().map_err(|e| UpdateError::io("write", temp.path(), e))?;
        progress.finish_with_message(format!("downloaded {label}"));
        Ok(temp)
    }
}
