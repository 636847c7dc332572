//! Backup directory naming and discovery.
//!
//! Every update run that requests a backup gets its own directory inside the install
//! root, named `<prefix>_<timestamp>` where the timestamp is a 20 digit UTC stamp with
//! microsecond precision (`YYYYMMDDhhmmssffffff`). Names sort lexicographically in
//! creation order, so the newest backup is always the greatest name.
//!
//! # Collision Handling
//!
//! Stamps handed out within one process are strictly increasing: if the clock has not
//! advanced past the previous stamp, the previous stamp plus one microsecond is used. A
//! directory left behind by a different process with the same stamp gets a `-NN`
//! counter suffix appended. Once `-99` is taken a later stamp is used instead.
//!
//! # Retention
//!
//! Backups are never removed automatically. [`list_backups`] exists so users (and the
//! `selfswap backups` command) can find them for manual recovery or cleanup.

use chrono::{DateTime, NaiveDateTime, Utc};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicI64, Ordering};
use tracing::debug;

use crate::core::UpdateError;

/// Number of digits in a backup timestamp.
const STAMP_DIGITS: usize = 20;

/// chrono format producing [`STAMP_DIGITS`] digits.
const STAMP_FORMAT: &str = "%Y%m%d%H%M%S%6f";

/// Last stamp handed out by [`allocate_backup_name`], in microseconds since the epoch.
static LAST_STAMP: AtomicI64 = AtomicI64::new(0);

/// A backup directory found in an install root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupEntry {
    pub name: String,
    pub path: PathBuf,
    /// Creation time decoded from the name, `None` for names with an unreadable stamp.
    pub created: Option<NaiveDateTime>,
}

fn next_stamp() -> i64 {
    let now = Utc::now().timestamp_micros();
    let mut last = LAST_STAMP.load(Ordering::SeqCst);
    loop {
        let candidate = now.max(last + 1);
        match LAST_STAMP.compare_exchange(last, candidate, Ordering::SeqCst, Ordering::SeqCst) {
            Ok(_) => return candidate,
            Err(current) => last = current,
        }
    }
}

fn format_stamp(micros: i64) -> String {
    DateTime::from_timestamp_micros(micros)
        .unwrap_or_default()
        .format(STAMP_FORMAT)
        .to_string()
}

/// Allocate a fresh backup directory name inside `install_root`.
///
/// Only the name is chosen; nothing is created on disk. The returned name is unique
/// among names allocated by this process and does not exist in `install_root` at the
/// time of the call.
///
/// # Examples
///
/// ```rust,no_run
/// use selfswap::upgrade::backup::allocate_backup_name;
/// use std::path::Path;
///
/// let name = allocate_backup_name(Path::new("/opt/app"), "UpdaterBackup");
/// assert!(name.starts_with("UpdaterBackup_"));
/// ```
#[must_use]
pub fn allocate_backup_name(install_root: &Path, prefix: &str) -> String {
    allocate_with(install_root, prefix, next_stamp)
}

/// Highest collision suffix; past it a fresh stamp is taken so names keep sorting in
/// creation order.
const MAX_SUFFIX: u32 = 99;

fn allocate_with(install_root: &Path, prefix: &str, mut stamp: impl FnMut() -> i64) -> String {
    loop {
        let base = format!("{prefix}_{}", format_stamp(stamp()));
        if !install_root.join(&base).exists() {
            return base;
        }

        for counter in 1..=MAX_SUFFIX {
            let candidate = format!("{base}-{counter:02}");
            if !install_root.join(&candidate).exists() {
                debug!("Backup name {} already taken, using {}", base, candidate);
                return candidate;
            }
        }
        debug!("All suffixes of {} taken, taking a new stamp", base);
    }
}

/// Whether `name` is a backup directory name produced with `prefix`.
#[must_use]
pub fn is_backup_name(name: &str, prefix: &str) -> bool {
    let Some(rest) = name.strip_prefix(prefix).and_then(|rest| rest.strip_prefix('_')) else {
        return false;
    };
    if rest.len() < STAMP_DIGITS || !rest.is_char_boundary(STAMP_DIGITS) {
        return false;
    }

    let (stamp, suffix) = rest.split_at(STAMP_DIGITS);
    if !stamp.bytes().all(|b| b.is_ascii_digit()) {
        return false;
    }

    suffix.is_empty()
        || suffix
            .strip_prefix('-')
            .is_some_and(|counter| !counter.is_empty() && counter.bytes().all(|b| b.is_ascii_digit()))
}

fn parse_created(name: &str, prefix: &str) -> Option<NaiveDateTime> {
    let stamp = name.get(prefix.len() + 1..prefix.len() + 1 + STAMP_DIGITS)?;
    NaiveDateTime::parse_from_str(stamp, STAMP_FORMAT).ok()
}

/// List the backup directories retained in `install_root`, newest first.
///
/// # Errors
///
/// Returns [`UpdateError::Io`] if `install_root` cannot be listed.
pub fn list_backups(install_root: &Path, prefix: &str) -> Result<Vec<BackupEntry>, UpdateError> {
    let entries =
        std::fs::read_dir(install_root).map_err(|e| UpdateError::io("read directory", install_root, e))?;

    let mut backups = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| UpdateError::io("read directory", install_root, e))?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if !is_backup_name(&name, prefix) || !entry.path().is_dir() {
            continue;
        }
        backups.push(BackupEntry {
            created: parse_created(&name, prefix),
            path: entry.path(),
            name,
        });
    }

    backups.sort_by(|a, b| b.name.cmp(&a.name));
    Ok(backups)
}
