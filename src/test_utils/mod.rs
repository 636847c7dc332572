//! Test utilities for selfswap
//!
//! This module provides helpers for writing tests: logging initialization and fixtures
//! that lay out install roots, staging directories and update archives on disk.
//!
//! # Example
//!
//! ```rust,no_run
//! use selfswap::test_utils::InstallFixture;
//!
//! let fixture = InstallFixture::new().unwrap();
//! fixture.install_file("app.exe", "old").unwrap();
//! fixture.stage_executable("app.exe", "new").unwrap();
//! assert!(fixture.root().join("update-staging/app.exe").exists());
//! ```

pub mod fixtures;

pub use fixtures::{InstallFixture, build_zip};

use std::sync::Once;
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Global flag to ensure logging is only initialized once in tests
static INIT_LOGGING: Once = Once::new();

/// Initialize logging for tests.
///
/// Initializes the tracing subscriber once regardless of how many times it's called. It
/// uses `level` when given, otherwise `RUST_LOG`, otherwise it stays silent.
///
/// ```bash
/// RUST_LOG=selfswap=debug cargo test
/// ```
pub fn init_test_logging(level: Option<Level>) {
    INIT_LOGGING.call_once(|| {
        let filter = if let Some(level) = level {
            EnvFilter::new(level.to_string())
        } else if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            return;
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .with_thread_ids(false)
            .try_init();
    });
}
