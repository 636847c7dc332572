//! Progress indicators for long-running downloads.
//!
//! Wraps `indicatif` with consistent styling. Bars are hidden when the
//! `SELFSWAP_NO_PROGRESS` environment variable is set, when the caller asks for quiet
//! output, or when stderr is not a terminal (indicatif handles the last case itself).
//!
//! # Examples
//!
//! ```rust,no_run
//! use selfswap::utils::progress::ProgressBar;
//!
//! let progress = ProgressBar::for_download(Some(1024), true);
//! progress.set_message("update.zip");
//! progress.inc(512);
//! progress.finish_with_message("downloaded update.zip");
//! ```

use indicatif::{ProgressBar as IndicatifBar, ProgressStyle as IndicatifStyle};
use std::time::Duration;

use crate::constants::NO_PROGRESS_ENV_VAR;

/// Checks if progress bars should be disabled.
///
/// ```bash
/// export SELFSWAP_NO_PROGRESS=1
/// selfswap fetch https://example.com/update.zip ./update-staging  # No progress bar shown
/// ```
fn is_progress_disabled() -> bool {
    std::env::var(NO_PROGRESS_ENV_VAR).is_ok()
}

/// A download progress bar, or a spinner when the total size is unknown.
#[derive(Clone)]
pub struct ProgressBar {
    inner: IndicatifBar,
}

impl ProgressBar {
    /// Creates a byte-counting bar for a download of `total` bytes.
    ///
    /// With `total == None` (no `Content-Length`) a spinner is shown instead. With
    /// `enabled == false` or `SELFSWAP_NO_PROGRESS` set, a hidden bar is returned that
    /// silently ignores all operations.
    #[must_use]
    pub fn for_download(total: Option<u64>, enabled: bool) -> Self {
        if !enabled || is_progress_disabled() {
            return Self::hidden();
        }

        let bar = match total {
            Some(len) => {
                let bar = IndicatifBar::new(len);
                bar.set_style(download_style());
                bar
            }
            None => {
                let bar = IndicatifBar::new_spinner();
                bar.set_style(spinner_style());
                bar.enable_steady_tick(Duration::from_millis(100));
                bar
            }
        };
        Self { inner: bar }
    }

    /// A bar that never draws.
    #[must_use]
    pub fn hidden() -> Self {
        Self {
            inner: IndicatifBar::hidden(),
        }
    }

    pub fn set_message(&self, msg: impl Into<String>) {
        self.inner.set_message(msg.into());
    }

    pub fn inc(&self, delta: u64) {
        self.inner.inc(delta);
    }

    pub fn finish_with_message(&self, msg: impl Into<String>) {
        self.inner.finish_with_message(msg.into());
    }

    /// Removes the bar from the terminal, used when a download fails midway.
    pub fn abandon(&self) {
        self.inner.finish_and_clear();
    }

    /// Whether this bar is hidden.
    #[must_use]
    pub fn is_hidden(&self) -> bool {
        self.inner.is_hidden()
    }
}

fn download_style() -> IndicatifStyle {
    IndicatifStyle::default_bar()
        .template("{msg} [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})")
        .unwrap_or_else(|_| IndicatifStyle::default_bar())
        .progress_chars("━╸━")
}

fn spinner_style() -> IndicatifStyle {
    IndicatifStyle::default_spinner()
        .template("{spinner:.cyan} {msg} {bytes}")
        .unwrap_or_else(|_| IndicatifStyle::default_spinner())
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"])
}
