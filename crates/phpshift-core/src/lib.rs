//! Core infrastructure for phpshift.
//!
//! This crate provides the language-agnostic half of the tool:
//! - Proposed edits, confidence tiers and edit modes
//! - The edit registry that accumulates changes during scanning
//! - The application engine that writes them safely
//! - Path arithmetic for file moves and include rewriting
//! - Error types, exit codes and the run report

pub mod apply;
pub mod edit;
pub mod error;
pub mod output;
pub mod paths;
pub mod registry;
