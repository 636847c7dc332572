//! Path validation for untrusted relative paths such as archive entry names.

use std::path::{Component, Path};

/// Validates that `path` stays inside whatever directory it is joined onto.
///
/// # Errors
///
/// Returns a description of the offending component when the path is absolute, carries
/// a drive prefix, or contains a parent directory reference (`..`).
pub fn validate_no_traversal(path: &Path) -> Result<(), String> {
    for component in path.components() {
        match component {
            Component::ParentDir => {
                return Err(format!("path contains parent directory reference (..): {}", path.display()));
            }
            Component::RootDir | Component::Prefix(_) => {
                return Err(format!("path is absolute: {}", path.display()));
            }
            Component::CurDir | Component::Normal(_) => {}
        }
    }
    Ok(())
}
