//! Version handling for update checks.
//!
//! The only notion of version selfswap knows is the dotted-numeric string published by
//! the remote version marker and the one the running application reports about itself.
//! See [`comparison`] for the parsing and padding rules.

/// Parsing and comparison of dotted-numeric versions.
pub mod comparison;

pub use comparison::{Version, VersionArg, VersionComparison, compare};
