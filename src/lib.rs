//! phpshift: type-aware renaming for PHP codebases
//!
//! Renames classes, methods and files across a PHP project. A two-pass scan
//! infers what each variable holds, each proposed edit is tagged with a
//! confidence tier, and the run-wide edit mode decides which edits are
//! written and which are only reported for manual review.

// Core infrastructure - re-exported from phpshift-core
pub use phpshift_core::apply;
pub use phpshift_core::edit;
pub use phpshift_core::error;
pub use phpshift_core::output;
pub use phpshift_core::paths;
pub use phpshift_core::registry;

// Language support
pub use phpshift_php as php;

pub mod config;
pub mod run;

// Error bridges - converts root-crate errors to ShiftError
mod error_bridges;
