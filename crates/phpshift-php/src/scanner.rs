//! Two-pass scanning of a PHP file set.
//!
//! Every file is tokenized once when added. A run then makes two passes
//! over the whole set:
//!
//! 1. The tracking sniffs alone, so that bindings made in any file (and
//!    later in the same file) are known before anything is renamed.
//! 2. The tracking sniffs again, followed by the refactoring's sniff, which
//!    records proposed edits in a [`ChangeRegistry`].
//!
//! Nothing is written to disk here; applying the registry is the caller's
//! decision.

use std::io;
use std::path::{Path, PathBuf};

use phpshift_core::edit::ContentHash;
use phpshift_core::registry::ChangeRegistry;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

use crate::classes::ClassHierarchy;
use crate::includes::IncludeTracker;
use crate::lexer::tokenize;
use crate::ops::{Dispatch, RenameClass, RenameFile, RenameMethod, Sniff, SniffContext};
use crate::resolver::Resolver;
use crate::store::{StoreError, VariableTypeStore};
use crate::token::Token;

// ============================================================================
// Errors
// ============================================================================

/// Errors that stop a scan.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("invalid rename pattern: {0}")]
    Pattern(#[from] regex::Error),
}

pub type ScanResult<T> = Result<T, ScanError>;

// ============================================================================
// Refactorings
// ============================================================================

/// The refactoring a run performs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "operation", rename_all = "snake_case")]
pub enum Refactoring {
    RenameClass {
        old: String,
        new: String,
    },
    RenameMethod {
        class: String,
        old: String,
        new: String,
    },
    /// Paths are absolute and normalized.
    RenameFile {
        old: PathBuf,
        new: PathBuf,
    },
}

impl Refactoring {
    /// Short name used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            Refactoring::RenameClass { .. } => "rename-class",
            Refactoring::RenameMethod { .. } => "rename-method",
            Refactoring::RenameFile { .. } => "rename-file",
        }
    }

    fn sniff(&self) -> ScanResult<Sniff> {
        Ok(match self {
            Refactoring::RenameClass { old, new } => {
                Sniff::RenameClass(RenameClass::new(old.as_str(), new.as_str())?)
            }
            Refactoring::RenameMethod { class, old, new } => Sniff::RenameMethod(
                RenameMethod::new(class.as_str(), old.as_str(), new.as_str()),
            ),
            Refactoring::RenameFile { old, new } => {
                Sniff::RenameFile(RenameFile::new(old.clone(), new.clone()))
            }
        })
    }
}

// ============================================================================
// Files
// ============================================================================

/// A tokenized PHP file.
#[derive(Debug, Clone)]
pub struct PhpFile {
    /// Absolute path.
    pub path: PathBuf,
    pub tokens: Vec<Token>,
    /// Hash of the content the tokens came from.
    pub hash: ContentHash,
}

impl PhpFile {
    /// Read and tokenize the file at `path`.
    pub fn load(path: &Path) -> ScanResult<Self> {
        let source = std::fs::read(path).map_err(|source| ScanError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(PhpFile::from_source(path, &source))
    }

    pub fn from_source(path: impl Into<PathBuf>, source: &[u8]) -> Self {
        PhpFile {
            path: path.into(),
            tokens: tokenize(source),
            hash: ContentHash::compute(source),
        }
    }
}

// ============================================================================
// Scanner
// ============================================================================

/// The run-wide model: the type store, include graph and class hierarchy
/// built over a set of files.
#[derive(Debug)]
pub struct Scanner {
    store: VariableTypeStore,
    includes: IncludeTracker,
    classes: ClassHierarchy,
    files: Vec<PhpFile>,
}

impl Scanner {
    /// Create a scanner with a fresh in-memory type store.
    pub fn new() -> ScanResult<Self> {
        Ok(Scanner {
            store: VariableTypeStore::open_in_memory()?,
            includes: IncludeTracker::new(),
            classes: ClassHierarchy::new(),
            files: Vec::new(),
        })
    }

    /// Read, tokenize and index the file at `path`.
    pub fn add_file(&mut self, path: &Path) -> ScanResult<()> {
        let file = PhpFile::load(path)?;
        self.add(file);
        Ok(())
    }

    /// Index `source` as the content of `path`.
    pub fn add_source(&mut self, path: impl Into<PathBuf>, source: &[u8]) {
        self.add(PhpFile::from_source(path, source));
    }

    fn add(&mut self, file: PhpFile) {
        debug!(file = %file.path.display(), tokens = file.tokens.len(), "file indexed");
        self.includes.record_file(&file.path, &file.tokens);
        self.classes.record_file(&file.path, &file.tokens);
        self.files.push(file);
    }

    /// Scan every file for `refactoring` and return the proposed changes.
    pub fn run(&self, refactoring: &Refactoring) -> ScanResult<ChangeRegistry> {
        let mut changes = ChangeRegistry::new();
        if let Refactoring::RenameFile { old, new } = refactoring {
            changes.add_rename(old, new);
        }

        info!(
            operation = refactoring.name(),
            files = self.files.len(),
            classes = self.classes.len(),
            "building type model"
        );
        self.pass(&Sniff::tracking(), &mut changes)?;
        debug!(bindings = self.store.binding_count()?, "type model built");

        let mut sniffs = Sniff::tracking();
        sniffs.push(refactoring.sniff()?);
        self.pass(&sniffs, &mut changes)?;

        for file in &self.files {
            changes.expect_content(&file.path, file.hash.clone());
        }
        info!(
            operation = refactoring.name(),
            edits = changes.edit_count(),
            "scan complete"
        );
        Ok(changes)
    }

    fn pass(&self, sniffs: &[Sniff], changes: &mut ChangeRegistry) -> ScanResult<()> {
        let dispatch = Dispatch::new(sniffs);
        for file in &self.files {
            let resolver = Resolver::new(
                &self.store,
                &self.includes,
                &self.classes,
                &file.path,
                &file.tokens,
            );
            let ctx = SniffContext::new(resolver);
            for (index, token) in file.tokens.iter().enumerate() {
                for &position in dispatch.for_kind(token.kind) {
                    sniffs[position].process(&ctx, index, changes)?;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use phpshift_core::edit::Confidence;

    fn scanner(files: &[(&str, &str)]) -> Scanner {
        let mut scanner = Scanner::new().unwrap();
        for (path, source) in files {
            scanner.add_source(*path, source.as_bytes());
        }
        scanner
    }

    #[test]
    fn types_flow_through_includes() {
        let scanner = scanner(&[
            (
                "/p/setup.php",
                "<?php class Foo { function bar() {} }\n$foo = new Foo();\n",
            ),
            ("/p/main.php", "<?php require 'setup.php';\n$foo->bar();\n"),
        ]);
        let refactoring = Refactoring::RenameMethod {
            class: "Foo".to_string(),
            old: "bar".to_string(),
            new: "baz".to_string(),
        };
        let changes = scanner.run(&refactoring).unwrap();
        let main = changes.get(Path::new("/p/main.php")).unwrap();
        assert_eq!(main.edits.len(), 1);
        assert_eq!(main.edits[0].confidence, Confidence::High);
        assert!(main.expected_hash.is_some());
    }

    #[test]
    fn later_bindings_in_the_file_are_known_in_pass_two() {
        let scanner = scanner(&[(
            "/p/main.php",
            "<?php\nfunction go() { $s = make(); $s->bar(); }\nfunction make(): Foo {}\nclass Foo { function bar() {} }\n",
        )]);
        let refactoring = Refactoring::RenameMethod {
            class: "Foo".to_string(),
            old: "bar".to_string(),
            new: "baz".to_string(),
        };
        let changes = scanner.run(&refactoring).unwrap();
        let edits = &changes.get(Path::new("/p/main.php")).unwrap().edits;
        assert!(edits.iter().all(|e| e.confidence == Confidence::High), "{:?}", edits);
        assert_eq!(edits.len(), 2);
    }

    #[test]
    fn file_rename_registers_the_move() {
        let scanner = scanner(&[
            ("/p/lib.php", "<?php\n"),
            ("/p/main.php", "<?php include 'lib.php';\n"),
        ]);
        let refactoring = Refactoring::RenameFile {
            old: PathBuf::from("/p/lib.php"),
            new: PathBuf::from("/p/src/lib.php"),
        };
        let changes = scanner.run(&refactoring).unwrap();
        let moved = changes.get(Path::new("/p/lib.php")).unwrap();
        assert_eq!(moved.rename_to.as_deref(), Some(Path::new("/p/src/lib.php")));
        assert!(moved.expected_hash.is_some());
        let main = changes.get(Path::new("/p/main.php")).unwrap();
        assert_eq!(main.edits[0].replacement, "'src/lib.php'");
    }

    #[test]
    fn refactoring_serializes_with_operation_tag() {
        let refactoring = Refactoring::RenameClass {
            old: "Foo".to_string(),
            new: "Bar".to_string(),
        };
        let json = serde_json::to_value(&refactoring).unwrap();
        assert_eq!(json["operation"], "rename_class");
        assert_eq!(json["new"], "Bar");
    }
}
