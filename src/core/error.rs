//! Error handling for selfswap
//!
//! This module provides the error taxonomy shared by every stage of an update and the
//! user-friendly reporting used by the CLI. The error system is built around two ideas:
//! 1. **Strongly-typed errors** so callers can react to a specific failure kind
//! 2. **User-friendly messages** with actionable suggestions for CLI users
//!
//! # Architecture
//!
//! - [`UpdateError`] - one variant per failure kind of the update pipeline
//! - [`Precondition`] - which planning precondition a [`UpdateError::Validation`] violated
//! - [`ErrorContext`] - wrapper that adds details and a suggestion for display
//!
//! # Error Categories
//!
//! - **Parsing**: [`UpdateError::InvalidFormat`] for malformed version strings
//! - **Probing**: [`UpdateError::NotFound`], [`UpdateError::Fetch`]
//! - **Staging**: [`UpdateError::Extract`], [`UpdateError::Io`]
//! - **Planning**: [`UpdateError::Validation`]
//! - **Hand-off**: [`UpdateError::Commit`]
//!
//! None of the library components downgrade an error to a default value. The archive
//! fetcher and the deferred executor never clean up after a failure either: a half
//! extracted staging directory or a launched-but-failing agent is left in place and
//! reported as-is.
//!
//! # Examples
//!
//! ```rust,no_run
//! use selfswap::core::{UpdateError, user_friendly_error};
//! use selfswap::version::compare;
//!
//! match compare("1.0", "two") {
//!     Ok(result) => println!("remote is {result}"),
//!     Err(e @ UpdateError::InvalidFormat { .. }) => {
//!         user_friendly_error(anyhow::Error::from(e)).display();
//!     }
//!     Err(e) => eprintln!("{e}"),
//! }
//! ```

use colored::Colorize;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

use crate::version::VersionArg;

/// Planning preconditions checked before any step is emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Precondition {
    /// The staging directory does not exist.
    StagingMissing,
    /// The staging path exists but is not a directory.
    StagingNotDirectory,
    /// The staging directory has no entries.
    StagingEmpty,
    /// The staging directory lies inside an install entry the swap would delete.
    StagingInsideInstallEntry,
    /// The restart executable is missing from the staging directory.
    ExecutableMissing,
    /// The restart executable is not a regular file.
    ExecutableNotFile,
    /// The restart executable lacks execute permission.
    ExecutableNotExecutable,
    /// The install root cannot be listed.
    InstallRootUnreadable,
    /// The install root holds nothing besides update machinery.
    InstallRootEmpty,
    /// An install entry is neither a regular file nor a directory.
    UnsupportedEntry,
}

impl fmt::Display for Precondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::StagingMissing => "staging directory does not exist",
            Self::StagingNotDirectory => "staging path is not a directory",
            Self::StagingEmpty => "staging directory is empty",
            Self::StagingInsideInstallEntry => "staging directory is nested inside an installed directory",
            Self::ExecutableMissing => "restart executable not found in staging directory",
            Self::ExecutableNotFile => "restart executable is not a regular file",
            Self::ExecutableNotExecutable => "restart executable is not marked executable",
            Self::InstallRootUnreadable => "install root is not readable",
            Self::InstallRootEmpty => "install root has no installed entries",
            Self::UnsupportedEntry => "install entry is neither a file nor a directory",
        };
        f.write_str(text)
    }
}

/// Every failure the update pipeline can report.
#[derive(Error, Debug)]
pub enum UpdateError {
    #[error("{which} version string '{value}' does not match 'number[.number...]'")]
    InvalidFormat {
        which: VersionArg,
        value: String,
    },

    #[error("Element with id '{element_id}' not found in '{location}'")]
    NotFound {
        element_id: String,
        location: String,
    },

    #[error("Failed to fetch '{location}': {reason}")]
    Fetch {
        location: String,
        reason: String,
    },

    #[error("Failed to extract archive '{archive}': {reason}")]
    Extract {
        archive: String,
        reason: String,
    },

    #[error("Failed to {operation} {}: {source}", path.display())]
    Io {
        operation: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Update precondition violated: {precondition} ({})", path.display())]
    Validation {
        precondition: Precondition,
        path: PathBuf,
    },

    #[error("Failed to launch update agent: {reason}")]
    Commit {
        reason: String,
    },
}

impl UpdateError {
    /// Build an [`UpdateError::Io`] for `operation` on `path`.
    pub fn io(operation: impl Into<String>, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            operation: operation.into(),
            path: path.into(),
            source,
        }
    }

    pub(crate) fn validation(precondition: Precondition, path: impl Into<PathBuf>) -> Self {
        Self::Validation {
            precondition,
            path: path.into(),
        }
    }

    /// Short name of the failure kind, used in logs and CLI output.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::InvalidFormat { .. } => "InvalidFormat",
            Self::NotFound { .. } => "NotFound",
            Self::Fetch { .. } => "FetchError",
            Self::Extract { .. } => "ExtractError",
            Self::Io { .. } => "IOError",
            Self::Validation { .. } => "ValidationError",
            Self::Commit { .. } => "CommitError",
        }
    }
}

/// User-facing rendering of an error with optional details and a suggestion.
///
/// # Examples
///
/// ```rust,no_run
/// use selfswap::core::ErrorContext;
///
/// let context = ErrorContext::new("Staging directory is empty")
///     .with_details("The archive did not contain any entries")
///     .with_suggestion("Check the archive URL in your config");
/// context.display();
/// ```
#[derive(Debug)]
pub struct ErrorContext {
    pub message: String,
    pub kind: Option<&'static str>,
    pub suggestion: Option<String>,
    pub details: Option<String>,
}

impl ErrorContext {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            kind: None,
            suggestion: None,
            details: None,
        }
    }

    fn from_update_error(error: &UpdateError) -> Self {
        Self {
            message: error.to_string(),
            kind: Some(error.kind()),
            suggestion: None,
            details: None,
        }
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Print the error to stderr with colours.
    pub fn display(&self) {
        match self.kind {
            Some(kind) => eprintln!("{} [{}]: {}", "error".red().bold(), kind, self.message),
            None => eprintln!("{}: {}", "error".red().bold(), self.message),
        }

        if let Some(details) = &self.details {
            eprintln!("{}: {}", "details".yellow(), details);
        }

        if let Some(suggestion) = &self.suggestion {
            eprintln!("{}: {}", "suggestion".green(), suggestion);
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;

        if let Some(details) = &self.details {
            write!(f, "\nDetails: {details}")?;
        }

        if let Some(suggestion) = &self.suggestion {
            write!(f, "\nSuggestion: {suggestion}")?;
        }

        Ok(())
    }
}

impl std::error::Error for ErrorContext {}

/// Convert any error into an [`ErrorContext`] with an actionable suggestion.
///
/// [`UpdateError`]s anywhere in the context chain get a tailored suggestion, raw
/// [`std::io::Error`]s get a generic filesystem hint, everything else is reported with
/// its full cause chain.
#[must_use]
pub fn user_friendly_error(error: anyhow::Error) -> ErrorContext {
    if let Some(update_error) = error.chain().find_map(|e| e.downcast_ref::<UpdateError>()) {
        let mut context = create_error_context(update_error);
        let outer = error.to_string();
        if outer != update_error.to_string() && context.details.is_none() {
            context.details = Some(outer);
        }
        return context;
    }

    if let Some(io_error) = error.downcast_ref::<std::io::Error>() {
        match io_error.kind() {
            std::io::ErrorKind::PermissionDenied => {
                return ErrorContext::new(error.to_string())
                    .with_suggestion("Check ownership of the install directory or run with elevated permissions");
            }
            std::io::ErrorKind::NotFound => {
                return ErrorContext::new(error.to_string())
                    .with_suggestion("Check that the file or directory exists and the path is correct");
            }
            _ => {}
        }
    }

    if let Some(toml_error) = error.downcast_ref::<toml::de::Error>() {
        return ErrorContext::new(format!("Invalid config file: {toml_error}"))
            .with_suggestion("Check the TOML syntax of your selfswap config file");
    }

    let mut message = error.to_string();
    let chain: Vec<String> = error.chain().skip(1).map(std::string::ToString::to_string).collect();

    if !chain.is_empty() {
        message.push_str("\n\nCaused by:");
        for (i, cause) in chain.iter().enumerate() {
            message.push_str(&format!("\n  {}: {}", i + 1, cause));
        }
    }

    ErrorContext::new(message)
}

fn create_error_context(error: &UpdateError) -> ErrorContext {
    let context = ErrorContext::from_update_error(error);
    match error {
        UpdateError::InvalidFormat { .. } => context
            .with_suggestion("Versions must be dot-separated numbers such as 1.0.4"),
        UpdateError::NotFound { element_id, .. } => context.with_suggestion(format!(
            "Make sure the version page contains a single-line element like <div id=\"{element_id}\">1.2.3</div>"
        )),
        UpdateError::Fetch { .. } => context
            .with_suggestion("Check your network connection and the configured URL"),
        UpdateError::Extract { .. } => context
            .with_details("The staging directory may contain a partial extraction")
            .with_suggestion("Delete the staging directory and retry with a valid zip archive"),
        UpdateError::Io { source, .. } if source.kind() == std::io::ErrorKind::PermissionDenied => context
            .with_suggestion("Check ownership of the install directory or run with elevated permissions"),
        UpdateError::Io { .. } => context,
        UpdateError::Validation { precondition, .. } => match precondition {
            Precondition::ExecutableNotExecutable => {
                context.with_suggestion("Mark the executable with chmod +x or package it with execute permissions")
            }
            Precondition::UnsupportedEntry => {
                context.with_suggestion("Remove symlinks and special files from the install directory")
            }
            Precondition::StagingInsideInstallEntry => context.with_suggestion(
                "Stage the update directly under the install root or outside of it, e.g. --staging update-staging",
            ),
            Precondition::InstallRootEmpty | Precondition::InstallRootUnreadable => {
                context.with_suggestion("Pass the directory of the installed application with --root")
            }
            _ => context.with_suggestion("Re-download the update into a fresh staging directory"),
        },
        UpdateError::Commit { .. } => context
            .with_details("No file of the installation has been touched yet")
            .with_suggestion("Check that the agent interpreter (sh or cmd) is available"),
    }
}
