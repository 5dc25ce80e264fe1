//! Edit Registry: per-file accumulation of proposed edits and file moves.
//!
//! Operations record what they would change while files are being scanned;
//! nothing touches the disk until [`apply_all`](crate::apply::apply_all) hands each
//! file's [`FileChanges`] to the application engine. Uniqueness of edit
//! positions is checked at application time so that independent passes may
//! accumulate freely.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::edit::{Confidence, ContentHash, ProposedEdit};

/// Everything pending for a single file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileChanges {
    /// Absolute path of the file as scanned.
    pub path: PathBuf,
    /// Proposed edits, in the order they were recorded.
    pub edits: Vec<ProposedEdit>,
    /// New absolute path, when the file itself is to be moved.
    pub rename_to: Option<PathBuf>,
    /// Hash of the content the edits were computed against.
    pub expected_hash: Option<ContentHash>,
}

impl FileChanges {
    /// Create an empty change set for `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        FileChanges {
            path: path.into(),
            ..FileChanges::default()
        }
    }

    /// Whether there is anything to do for this file.
    pub fn is_empty(&self) -> bool {
        self.edits.is_empty() && self.rename_to.is_none()
    }
}

/// Run-wide collection of pending changes, keyed by absolute path.
#[derive(Debug, Default)]
pub struct ChangeRegistry {
    files: BTreeMap<PathBuf, FileChanges>,
}

impl ChangeRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        ChangeRegistry::default()
    }

    fn entry(&mut self, path: &Path) -> &mut FileChanges {
        self.files
            .entry(path.to_path_buf())
            .or_insert_with(|| FileChanges::new(path))
    }

    /// Record a proposed edit for `path`.
    pub fn add_edit(
        &mut self,
        path: &Path,
        line: u32,
        column: u32,
        length: usize,
        replacement: impl Into<String>,
        confidence: Confidence,
    ) {
        let edit = ProposedEdit::new(line, column, length, replacement, confidence);
        debug!(
            file = %path.display(),
            line,
            column,
            length,
            replacement = %edit.replacement,
            ?confidence,
            "edit proposed"
        );
        self.entry(path).edits.push(edit);
    }

    /// Record that `old_path` should move to `new_path` once its edits apply.
    ///
    /// Only one move per file is kept; a second request replaces the first.
    pub fn add_rename(&mut self, old_path: &Path, new_path: &Path) {
        let entry = self.entry(old_path);
        if let Some(previous) = entry.rename_to.replace(new_path.to_path_buf()) {
            if previous != new_path {
                warn!(
                    file = %old_path.display(),
                    previous = %previous.display(),
                    new = %new_path.display(),
                    "replacing earlier rename request"
                );
            }
        }
    }

    /// Remember the content hash edits for `path` were computed against.
    pub fn expect_content(&mut self, path: &Path, hash: ContentHash) {
        if let Some(entry) = self.files.get_mut(path) {
            entry.expected_hash = Some(hash);
        }
    }

    /// Pending changes for one file, if any.
    pub fn get(&self, path: &Path) -> Option<&FileChanges> {
        self.files.get(path)
    }

    /// Total number of proposed edits across all files.
    pub fn edit_count(&self) -> usize {
        self.files.values().map(|f| f.edits.len()).sum()
    }

    /// Whether nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.files.values().all(FileChanges::is_empty)
    }

    /// Take every file's changes out of the registry, in path order.
    pub fn drain(&mut self) -> Vec<FileChanges> {
        std::mem::take(&mut self.files).into_values().collect()
    }
}
