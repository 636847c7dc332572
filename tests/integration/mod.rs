//! Integration test suite for selfswap
//!
//! End-to-end tests for the update pipeline and the `selfswap` binary. Everything runs
//! against local files (`file://` locations and temp directories); no network access is
//! needed.
//!
//! # Running Integration Tests
//!
//! ```bash
//! cargo test --test integration
//! ```
//!
//! # Test Organization
//!
//! - **cli**: The `selfswap` binary's subcommands and error output
//! - **config**: Config file discovery and flag precedence
//! - **deferred**: Detached agents swapping a real installation (Unix)
//! - **pipeline**: Probe, compare, fetch, plan and run through the library API

mod cli;
mod config;
mod deferred;
mod pipeline;

use std::path::Path;

/// Write a version document advertising `version` under the `version` id.
pub fn write_version_page(path: &Path, version: &str) {
    let page = format!(
        "<!DOCTYPE html>\n<html>\n<body>\n  <h1>Downloads</h1>\n  <div id=\"version\">{version}</div>\n</body>\n</html>\n"
    );
    std::fs::write(path, page).unwrap();
}
