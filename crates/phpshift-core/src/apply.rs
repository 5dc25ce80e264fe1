//! Safe multi-edit application.
//!
//! Each file's pending edits are filtered through the run's [`EditMode`],
//! grouped by line, sorted by column and replayed against the original text
//! while tracking how far earlier edits on the same line shifted later ones.
//! Any conflict aborts the whole file: either every permitted edit lands or
//! the file is left untouched. A pending move is carried out after the
//! content is written, and never in timid mode.
//!
//! Failures are per file. [`apply_all`] keeps going after a failed file and
//! reports the failure alongside the outcomes of the files that succeeded.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::edit::{ContentHash, EditMode, ProposedEdit};
use crate::registry::{ChangeRegistry, FileChanges};

// ============================================================================
// Errors
// ============================================================================

/// Reasons a single file's changes could not be applied.
#[derive(Debug, Error)]
pub enum ApplyError {
    /// An edit starts inside text already rewritten by an earlier edit on the same line.
    #[error("conflicting edits in {} at line {line}, column {column}", path.display())]
    Conflict {
        path: PathBuf,
        line: u32,
        column: u32,
    },

    /// Two edits were proposed at the same position.
    #[error("more than one edit proposed at {}:{line}:{column}", path.display())]
    DuplicateEdit {
        path: PathBuf,
        line: u32,
        column: u32,
    },

    /// An edit addresses text past the end of its line or file.
    #[error("edit at {}:{line}:{column} falls outside the file", path.display())]
    OutOfBounds {
        path: PathBuf,
        line: u32,
        column: u32,
    },

    /// The file no longer has the content the edits were computed against.
    #[error("{} changed on disk after it was scanned", path.display())]
    ContentChanged { path: PathBuf },

    /// The destination of a move is already occupied.
    #[error("cannot move {} to {}: destination exists", path.display(), target.display())]
    RenameTargetExists { path: PathBuf, target: PathBuf },

    /// Reading, writing or moving the file failed.
    #[error("IO error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl ApplyError {
    /// The file this error belongs to.
    pub fn path(&self) -> &Path {
        match self {
            ApplyError::Conflict { path, .. }
            | ApplyError::DuplicateEdit { path, .. }
            | ApplyError::OutOfBounds { path, .. }
            | ApplyError::ContentChanged { path }
            | ApplyError::RenameTargetExists { path, .. }
            | ApplyError::Io { path, .. } => path,
        }
    }

    fn io(path: &Path, source: io::Error) -> Self {
        ApplyError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Result type for application.
pub type ApplyResult<T> = Result<T, ApplyError>;

// ============================================================================
// Outcomes
// ============================================================================

/// What happened to one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileOutcome {
    /// Path of the file before any move.
    pub path: PathBuf,
    /// Number of edits written.
    pub applied: usize,
    /// Whether the content on disk changed.
    pub content_changed: bool,
    /// Where the file now lives, if it was moved.
    pub moved_to: Option<PathBuf>,
    /// Lines holding edits the edit mode withheld, ascending and unique.
    pub withheld_lines: Vec<u32>,
    /// A move the edit mode withheld.
    pub withheld_move: Option<PathBuf>,
}

impl FileOutcome {
    fn untouched(path: &Path) -> Self {
        FileOutcome {
            path: path.to_path_buf(),
            applied: 0,
            content_changed: false,
            moved_to: None,
            withheld_lines: Vec::new(),
            withheld_move: None,
        }
    }

    /// Whether the file changed on disk in any way.
    pub fn changed(&self) -> bool {
        self.content_changed || self.moved_to.is_some()
    }

    /// Number of notifications this file contributes.
    pub fn withheld_count(&self) -> usize {
        self.withheld_lines.len() + usize::from(self.withheld_move.is_some())
    }
}

/// Outcome of applying a whole registry.
#[derive(Debug, Default)]
pub struct ApplySummary {
    /// Files whose changes were processed without error, in path order.
    pub outcomes: Vec<FileOutcome>,
    /// Files whose changes were abandoned.
    pub failures: Vec<ApplyError>,
}

impl ApplySummary {
    /// Number of files changed on disk.
    pub fn changed_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.changed()).count()
    }

    /// Number of withheld edits and moves.
    pub fn withheld_count(&self) -> usize {
        self.outcomes.iter().map(FileOutcome::withheld_count).sum()
    }
}

// ============================================================================
// Line Replay
// ============================================================================

/// Length of a line without its terminator.
fn content_len(line: &[u8]) -> usize {
    let mut len = line.len();
    if len > 0 && line[len - 1] == b'\n' {
        len -= 1;
        if len > 0 && line[len - 1] == b'\r' {
            len -= 1;
        }
    }
    len
}

/// Apply one line's edits, already sorted by column, to `line`.
fn apply_line(path: &Path, line_no: u32, line: &mut Vec<u8>, edits: &[&ProposedEdit]) -> ApplyResult<()> {
    let mut offset: isize = 0;
    // Adjusted column of the last byte written by the previous edit.
    let mut last_changed: isize = 0;

    for edit in edits {
        let adjusted = edit.column as isize + offset;
        if adjusted <= last_changed {
            return Err(ApplyError::Conflict {
                path: path.to_path_buf(),
                line: line_no,
                column: edit.column,
            });
        }

        let start = (adjusted - 1) as usize;
        let end = start + edit.length;
        if end > content_len(line) {
            return Err(ApplyError::OutOfBounds {
                path: path.to_path_buf(),
                line: line_no,
                column: edit.column,
            });
        }

        line.splice(start..end, edit.replacement.bytes());
        offset += edit.delta();
        last_changed = adjusted + edit.replacement.len() as isize - 1;
    }
    Ok(())
}

/// Apply `edits` to `content`, returning the rewritten bytes.
///
/// Every edit is applied or none is. Edits are addressed against the
/// original content; their order in the slice does not matter.
pub fn apply_edits(path: &Path, content: &[u8], edits: &[ProposedEdit]) -> ApplyResult<Vec<u8>> {
    let mut seen = BTreeSet::new();
    let mut by_line: BTreeMap<u32, Vec<&ProposedEdit>> = BTreeMap::new();
    for edit in edits {
        if !seen.insert(edit.key()) {
            return Err(ApplyError::DuplicateEdit {
                path: path.to_path_buf(),
                line: edit.line,
                column: edit.column,
            });
        }
        if edit.line == 0 || edit.column == 0 {
            return Err(ApplyError::OutOfBounds {
                path: path.to_path_buf(),
                line: edit.line,
                column: edit.column,
            });
        }
        by_line.entry(edit.line).or_default().push(edit);
    }

    let mut lines: Vec<Vec<u8>> = content
        .split_inclusive(|b| *b == b'\n')
        .map(<[u8]>::to_vec)
        .collect();

    for (line_no, line_edits) in by_line.iter_mut() {
        line_edits.sort_by_key(|e| e.column);
        let index = (*line_no - 1) as usize;
        let Some(line) = lines.get_mut(index) else {
            return Err(ApplyError::OutOfBounds {
                path: path.to_path_buf(),
                line: *line_no,
                column: line_edits[0].column,
            });
        };
        apply_line(path, *line_no, line, line_edits)?;
    }

    Ok(lines.concat())
}

// ============================================================================
// File Application
// ============================================================================

/// Write `content` to `path` through a temporary file in the same directory.
fn atomic_write(path: &Path, content: &[u8]) -> io::Result<()> {
    let temp_path = path.with_file_name(format!(
        ".{}.{}.phpshift.tmp",
        path.file_name().unwrap_or_default().to_string_lossy(),
        std::process::id()
    ));
    fs::write(&temp_path, content)?;
    if let Err(err) = fs::rename(&temp_path, path) {
        let _ = fs::remove_file(&temp_path);
        return Err(err);
    }
    Ok(())
}

fn move_file(path: &Path, target: &Path) -> ApplyResult<()> {
    if target.exists() {
        return Err(ApplyError::RenameTargetExists {
            path: path.to_path_buf(),
            target: target.to_path_buf(),
        });
    }
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent).map_err(|e| ApplyError::io(target, e))?;
    }
    fs::rename(path, target).map_err(|e| ApplyError::io(path, e))
}

/// Apply one file's changes under `mode`.
pub fn apply_file(changes: &FileChanges, mode: EditMode) -> ApplyResult<FileOutcome> {
    let path = changes.path.as_path();
    let mut outcome = FileOutcome::untouched(path);

    let (permitted, withheld): (Vec<ProposedEdit>, Vec<ProposedEdit>) = changes
        .edits
        .iter()
        .cloned()
        .partition(|edit| mode.permits(edit.confidence));

    outcome.withheld_lines = withheld
        .iter()
        .map(|e| e.line)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    // Duplicates are fatal even when the mode withholds one of the pair.
    let mut keys = BTreeSet::new();
    for edit in &changes.edits {
        if !keys.insert(edit.key()) {
            return Err(ApplyError::DuplicateEdit {
                path: path.to_path_buf(),
                line: edit.line,
                column: edit.column,
            });
        }
    }

    if !permitted.is_empty() {
        let content = fs::read(path).map_err(|e| ApplyError::io(path, e))?;
        if let Some(expected) = &changes.expected_hash {
            let actual = ContentHash::compute(&content);
            if &actual != expected {
                return Err(ApplyError::ContentChanged {
                    path: path.to_path_buf(),
                });
            }
        }

        let rewritten = apply_edits(path, &content, &permitted)?;
        if rewritten != content {
            atomic_write(path, &rewritten).map_err(|e| ApplyError::io(path, e))?;
            outcome.content_changed = true;
        }
        outcome.applied = permitted.len();
        debug!(file = %path.display(), applied = outcome.applied, "edits written");
    }

    if let Some(target) = changes.rename_to.as_ref().filter(|t| t.as_path() != path) {
        if mode.permits_rename() {
            move_file(path, target)?;
            info!(from = %path.display(), to = %target.display(), "file moved");
            outcome.moved_to = Some(target.clone());
        } else {
            outcome.withheld_move = Some(target.clone());
        }
    }

    Ok(outcome)
}

/// Apply every pending change in `registry`, draining it.
///
/// A failed file is reported and skipped; the remaining files still apply.
pub fn apply_all(registry: &mut ChangeRegistry, mode: EditMode) -> ApplySummary {
    let mut summary = ApplySummary::default();
    for changes in registry.drain() {
        if changes.is_empty() {
            continue;
        }
        match apply_file(&changes, mode) {
            Ok(outcome) => summary.outcomes.push(outcome),
            Err(err) => {
                warn!(file = %err.path().display(), error = %err, "file left unchanged");
                summary.failures.push(err);
            }
        }
    }
    info!(
        %mode,
        changed = summary.changed_count(),
        withheld = summary.withheld_count(),
        failed = summary.failures.len(),
        "apply finished"
    );
    summary
}
