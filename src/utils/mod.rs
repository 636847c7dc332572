//! Cross-platform utilities and helpers
//!
//! # Modules
//!
//! - [`fs`] - File system operations reporting [`UpdateError`](crate::core::UpdateError)
//! - [`path_validation`] - Rejection of escaping archive entry paths
//! - [`platform`] - Detached process spawning and shell quoting
//! - [`progress`] - Download progress bars

pub mod fs;
pub mod path_validation;
pub mod platform;
pub mod progress;

pub use fs::{copy_dir, ensure_dir, remove_dir_all};
pub use platform::{is_windows, spawn_detached};
