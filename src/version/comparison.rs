//! Dotted-numeric version comparison.
//!
//! Versions handled here are plain sequences of non-negative integers separated by dots
//! (`1`, `1.0.4`, `0.04.01.3`). They are not semantic versions: there are no pre-release
//! or build suffixes and the number of tokens is arbitrary.
//!
//! # Comparison Rules
//!
//! - Both strings must match `^([0-9]+\.)*[0-9]+$`, otherwise [`UpdateError::InvalidFormat`]
//!   names the offending argument
//! - The shorter token list is right-padded with zeros, so `1.0` equals `1` and `1.0` is
//!   lower than `2`
//! - Tokens are compared as integers from left to right, so `0.01` equals `0.1`
//!
//! # Examples
//!
//! ```rust,no_run
//! use selfswap::version::{VersionComparison, compare};
//!
//! # fn example() -> Result<(), selfswap::core::UpdateError> {
//! assert_eq!(compare("1.0", "2")?, VersionComparison::Higher);
//! assert_eq!(compare("0.01.0.0", "0.0.03")?, VersionComparison::Lower);
//! assert_eq!(compare("1.2", "1.2.0")?, VersionComparison::Equal);
//! # Ok(())
//! # }
//! ```

use regex::Regex;
use std::cmp::Ordering;
use std::fmt;
use std::sync::LazyLock;

use crate::core::UpdateError;

static VERSION_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([0-9]+\.)*[0-9]+$").expect("version pattern is valid"));

/// Which argument of [`compare`] a version string was passed as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionArg {
    /// The version of the running installation.
    Current,
    /// The version advertised by the remote marker.
    Remote,
}

impl fmt::Display for VersionArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Current => f.write_str("current"),
            Self::Remote => f.write_str("remote"),
        }
    }
}

/// Outcome of comparing a remote version against the current one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionComparison {
    /// The remote version is newer.
    Higher,
    /// Both versions are equal after zero padding.
    Equal,
    /// The remote version is older.
    Lower,
}

impl VersionComparison {
    /// Whether an update should be installed.
    #[must_use]
    pub const fn is_update(self) -> bool {
        matches!(self, Self::Higher)
    }

    /// The comparison seen from the other side.
    #[must_use]
    pub const fn reverse(self) -> Self {
        match self {
            Self::Higher => Self::Lower,
            Self::Equal => Self::Equal,
            Self::Lower => Self::Higher,
        }
    }
}

impl From<Ordering> for VersionComparison {
    fn from(ordering: Ordering) -> Self {
        match ordering {
            Ordering::Greater => Self::Higher,
            Ordering::Equal => Self::Equal,
            Ordering::Less => Self::Lower,
        }
    }
}

impl fmt::Display for VersionComparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Higher => f.write_str("higher"),
            Self::Equal => f.write_str("equal"),
            Self::Lower => f.write_str("lower"),
        }
    }
}

/// A parsed dotted-numeric version.
///
/// Equality and ordering ignore trailing zero tokens: `1.0` and `1` are the same version.
#[derive(Debug, Clone)]
pub struct Version {
    tokens: Vec<u64>,
}

impl Version {
    /// Parse `value`, attributing a failure to argument `which`.
    pub fn parse(value: &str, which: VersionArg) -> Result<Self, UpdateError> {
        let invalid = || UpdateError::InvalidFormat {
            which,
            value: value.to_string(),
        };

        if !VERSION_PATTERN.is_match(value) {
            return Err(invalid());
        }

        let tokens = value
            .split('.')
            .map(|token| token.parse::<u64>().map_err(|_| invalid()))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            tokens,
        })
    }

    /// The integer tokens as written.
    #[must_use]
    pub fn tokens(&self) -> &[u64] {
        &self.tokens
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text: Vec<String> = self.tokens.iter().map(u64::to_string).collect();
        f.write_str(&text.join("."))
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.tokens.len().max(other.tokens.len());
        (0..len)
            .map(|i| {
                let ours = self.tokens.get(i).copied().unwrap_or(0);
                let theirs = other.tokens.get(i).copied().unwrap_or(0);
                ours.cmp(&theirs)
            })
            .find(|ordering| *ordering != Ordering::Equal)
            .unwrap_or(Ordering::Equal)
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Version {}

/// Compare the `remote` version against the `current` one.
///
/// Returns [`VersionComparison::Higher`] when `remote` is newer than `current`.
///
/// # Errors
///
/// [`UpdateError::InvalidFormat`] naming `current` or `remote` when either string is not
/// a dot-separated list of non-negative integers, or a token does not fit in a `u64`.
pub fn compare(current: &str, remote: &str) -> Result<VersionComparison, UpdateError> {
    let current = Version::parse(current, VersionArg::Current)?;
    let remote = Version::parse(remote, VersionArg::Remote)?;
    Ok(remote.cmp(&current).into())
}
