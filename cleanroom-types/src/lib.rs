//! Shared data model for the cleanroom workspace.
//!
//! # Design constraints
//! - Everything here is plain data; no I/O.
//! - Paths are repository-relative and use `/` separators.
//! - Types that may be written to disk derive serde.

pub mod diagnostic;
pub mod exclude;
pub mod module;
pub mod snapshot;

pub use diagnostic::{Diagnostic, Location, SuggestedFix, TextEdit};
pub use exclude::Exclusions;
pub use module::Module;
pub use snapshot::Snapshot;

/// Filename whose presence marks a module root.
pub const MODULE_SENTINEL: &str = "go.mod";

/// Environment variable that marks a trusted, already-clean execution context.
pub const TRUSTED_ENV: &str = "CI";

/// Directory names excluded from discovery, snapshots and analysis.
pub const FIXED_EXCLUSIONS: &[&str] = &[".git", "vendor", "testdata"];
