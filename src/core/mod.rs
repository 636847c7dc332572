//! Core types shared by every stage of an update
//!
//! This module holds the error taxonomy of the update pipeline and the conversion of
//! any error into a user-friendly report for the CLI.
//!
//! # Modules
//!
//! ## `error` - Error Handling
//!
//! - [`UpdateError`] - one variant per failure kind (format, probe, fetch, extract, io,
//!   validation, commit)
//! - [`Precondition`] - the planning precondition a validation error refers to
//! - [`ErrorContext`] - user-friendly error wrapper with suggestions and details
//! - [`user_friendly_error`] - convert any `anyhow::Error` for display

pub mod error;

pub use error::{ErrorContext, Precondition, UpdateError, user_friendly_error};
