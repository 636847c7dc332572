//! File system helpers used by the planner, the archive fetcher and the plan runner.
//!
//! All helpers report failures as [`UpdateError::Io`] carrying the operation and the path
//! that failed, so the CLI can tell the user exactly which entry blocked an update.

use std::fs;
use std::path::Path;

use crate::core::UpdateError;

/// Ensures a directory exists, creating it and all parent directories if necessary.
///
/// # Errors
///
/// - the path exists but is not a directory
/// - the directory could not be created
///
/// # Examples
///
/// ```rust,no_run
/// use selfswap::utils::fs::ensure_dir;
/// use std::path::Path;
///
/// # fn example() -> Result<(), selfswap::core::UpdateError> {
/// ensure_dir(Path::new("update-staging/data"))?;
/// # Ok(())
/// # }
/// ```
pub fn ensure_dir(path: &Path) -> Result<(), UpdateError> {
    if !path.exists() {
        fs::create_dir_all(path).map_err(|e| UpdateError::io("create directory", path, e))?;
    } else if !path.is_dir() {
        return Err(UpdateError::io(
            "create directory",
            path,
            std::io::Error::new(std::io::ErrorKind::AlreadyExists, "path exists but is not a directory"),
        ));
    }
    Ok(())
}

/// Recursively copies the contents of `src` into `dst`, merging with what is there.
///
/// # Behavior
///
/// - Creates `dst` if it doesn't exist
/// - Recursively copies all subdirectories
/// - Overwrites existing files in the destination
/// - Recreates symlinks as symlinks with the same target (Unix); the target is not followed
/// - Fails on entries it cannot reproduce (sockets, devices, symlinks on Windows) rather
///   than leaving them out
/// - File permissions travel with the copy, so executables stay executable
pub fn copy_dir(src: &Path, dst: &Path) -> Result<(), UpdateError> {
    ensure_dir(dst)?;

    for entry in fs::read_dir(src).map_err(|e| UpdateError::io("read directory", src, e))? {
        let entry = entry.map_err(|e| UpdateError::io("read directory", src, e))?;
        let src_path = entry.path();
        let file_type = entry.file_type().map_err(|e| UpdateError::io("inspect", &src_path, e))?;
        let dst_path = dst.join(entry.file_name());

        if file_type.is_dir() {
            copy_dir(&src_path, &dst_path)?;
        } else if file_type.is_file() {
            fs::copy(&src_path, &dst_path).map_err(|e| UpdateError::io("copy file to", &dst_path, e))?;
        } else if file_type.is_symlink() {
            copy_symlink(&src_path, &dst_path)?;
        } else {
            return Err(UpdateError::io(
                "copy",
                &src_path,
                std::io::Error::new(std::io::ErrorKind::Unsupported, "not a regular file, directory or symlink"),
            ));
        }
    }

    Ok(())
}

/// Recreates the symlink `src` at `dst`, replacing whatever `dst` was.
fn copy_symlink(src: &Path, dst: &Path) -> Result<(), UpdateError> {
    #[cfg(unix)]
    {
        let target = fs::read_link(src).map_err(|e| UpdateError::io("read link", src, e))?;
        if let Ok(existing) = fs::symlink_metadata(dst) {
            if existing.is_dir() {
                remove_dir_all(dst)?;
            } else {
                remove_file(dst)?;
            }
        }
        std::os::unix::fs::symlink(&target, dst).map_err(|e| UpdateError::io("create link", dst, e))
    }

    #[cfg(not(unix))]
    {
        let _ = dst;
        Err(UpdateError::io(
            "copy",
            src,
            std::io::Error::new(std::io::ErrorKind::Unsupported, "symlinks cannot be copied on this platform"),
        ))
    }
}

/// Copies a single file or directory entry to `dst`, creating `dst`'s parent first.
pub fn copy_entry(src: &Path, dst: &Path, is_dir: bool) -> Result<(), UpdateError> {
    if let Some(parent) = dst.parent() {
        ensure_dir(parent)?;
    }

    if is_dir {
        copy_dir(src, dst)
    } else {
        fs::copy(src, dst).map(|_| ()).map_err(|e| UpdateError::io("copy file to", dst, e))
    }
}

/// Recursively removes a directory and all its contents.
///
/// Succeeds when the directory is already gone.
pub fn remove_dir_all(path: &Path) -> Result<(), UpdateError> {
    match fs::remove_dir_all(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(UpdateError::io("remove directory", path, e)),
    }
}

/// Removes a single file. Succeeds when the file is already gone.
pub fn remove_file(path: &Path) -> Result<(), UpdateError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(UpdateError::io("remove file", path, e)),
    }
}

/// Whether the file behind `metadata` may be executed.
///
/// On Unix this checks the execute bits. Windows has no execute permission; every
/// regular file counts as executable there.
#[must_use]
pub fn is_executable(metadata: &fs::Metadata) -> bool {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        metadata.is_file() && metadata.permissions().mode() & 0o111 != 0
    }

    #[cfg(not(unix))]
    {
        metadata.is_file()
    }
}

/// Sets `mode` on `path` (Unix only, a no-op elsewhere).
pub fn set_mode(path: &Path, mode: u32) -> Result<(), UpdateError> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(mode))
            .map_err(|e| UpdateError::io("set permissions on", path, e))?;
    }

    #[cfg(not(unix))]
    {
        let _ = (path, mode);
    }

    Ok(())
}
