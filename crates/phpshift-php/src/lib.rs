//! PHP language support for phpshift.
//!
//! This crate provides the PHP half of the tool:
//! - A lossless lexer annotating tokens with scope and bracket structure
//! - The variable type store and the resolver built on top of it
//! - Include and class hierarchy tracking
//! - Type-tracking and rename operations ("sniffs")
//! - The two-pass scanner that runs them over a file set

pub mod classes;
pub mod cursor;
pub mod error_bridges;
pub mod includes;
pub mod lexer;
pub mod ops;
pub mod resolver;
pub mod scanner;
pub mod store;
pub mod token;
pub mod validation;
pub mod var_type;

pub use scanner::{PhpFile, Refactoring, ScanError, ScanResult, Scanner};
pub use store::{StoreError, VariableTypeStore};
