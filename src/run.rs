//! Run orchestration: collect files, scan, apply, report.
//!
//! This is the library entry point the CLI calls. It owns the three passes
//! of a run: the two scanning passes inside [`Scanner::run`] and the
//! sequential application of the resulting registry.

use std::collections::BTreeSet;
use std::path::PathBuf;

use globset::{Glob, GlobSet, GlobSetBuilder};
use serde::Serialize;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use phpshift_core::apply::apply_all;
use phpshift_core::edit::EditMode;
use phpshift_core::error::{OutputErrorCode, ShiftError};
use phpshift_core::output::{FileFailure, RunReport};
use phpshift_core::paths::absolute_from_cwd;
use phpshift_php::validation::{validate_class_name, validate_method_name, validate_php_identifier};
use phpshift_php::{Refactoring, Scanner};

/// Options for one run.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Edit mode; a run without one is a configuration error.
    pub edit_mode: Option<EditMode>,
    /// Files and directories to scan.
    pub paths: Vec<PathBuf>,
    /// Extensions of files picked up while walking directories.
    pub extensions: Vec<String>,
    /// Glob patterns excluded while walking directories.
    pub exclude: Vec<String>,
}

impl RunOptions {
    pub fn new(edit_mode: EditMode, paths: Vec<PathBuf>) -> Self {
        RunOptions {
            edit_mode: Some(edit_mode),
            paths,
            extensions: vec!["php".to_string()],
            exclude: Vec::new(),
        }
    }
}

/// JSON response for a completed run.
#[derive(Debug, Clone, Serialize)]
pub struct RunResponse {
    #[serde(flatten)]
    pub report: RunReport,
    #[serde(flatten)]
    pub refactoring: Refactoring,
}

// ============================================================================
// File Collection
// ============================================================================

fn build_exclude_set(patterns: &[String]) -> Result<GlobSet, ShiftError> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern).map_err(|e| {
            ShiftError::invalid_args(format!("invalid exclude pattern '{}': {}", pattern, e))
        })?;
        builder.add(glob);
    }
    builder
        .build()
        .map_err(|e| ShiftError::invalid_args(format!("invalid exclude patterns: {}", e)))
}

/// Absolute paths of the PHP files named by `paths`, sorted and unique.
///
/// Files named directly are always included. Directories are walked, keeping
/// files whose extension is in `extensions` and whose path relative to the
/// walked directory matches none of the `exclude` globs.
pub fn collect_files(
    paths: &[PathBuf],
    extensions: &[String],
    exclude: &[String],
) -> Result<Vec<PathBuf>, ShiftError> {
    let excluded = build_exclude_set(exclude)?;
    let mut files = BTreeSet::new();
    for path in paths {
        let root = absolute_from_cwd(path).map_err(|e| ShiftError::internal(e.to_string()))?;
        if root.is_file() {
            files.insert(root);
            continue;
        }
        if !root.is_dir() {
            return Err(ShiftError::file_not_found(path.to_string_lossy()));
        }
        for entry in WalkDir::new(&root).sort_by_file_name() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    warn!(error = %err, "skipping unreadable directory entry");
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            let file = entry.path();
            let wanted = file
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| extensions.iter().any(|x| x.eq_ignore_ascii_case(e)));
            if !wanted {
                continue;
            }
            let relative = file.strip_prefix(&root).unwrap_or(file);
            if excluded.is_match(relative) {
                debug!(file = %file.display(), "excluded");
                continue;
            }
            files.insert(file.to_path_buf());
        }
    }
    Ok(files.into_iter().collect())
}

// ============================================================================
// Run
// ============================================================================

/// Check names and normalize paths before anything is scanned.
fn prepare(refactoring: &Refactoring) -> Result<Refactoring, ShiftError> {
    match refactoring {
        Refactoring::RenameClass { old, new } => {
            validate_php_identifier(old)?;
            validate_class_name(new)?;
            Ok(refactoring.clone())
        }
        Refactoring::RenameMethod { class, old, new } => {
            validate_php_identifier(class.rsplit('\\').next().unwrap_or(class))?;
            validate_php_identifier(old)?;
            validate_method_name(new)?;
            Ok(refactoring.clone())
        }
        Refactoring::RenameFile { old, new } => {
            let old = absolute_from_cwd(old).map_err(|e| ShiftError::internal(e.to_string()))?;
            let new = absolute_from_cwd(new).map_err(|e| ShiftError::internal(e.to_string()))?;
            if !old.is_file() {
                return Err(ShiftError::file_not_found(old.to_string_lossy()));
            }
            if new.exists() {
                return Err(ShiftError::invalid_args(format!(
                    "rename target already exists: {}",
                    new.display()
                )));
            }
            Ok(Refactoring::RenameFile { old, new })
        }
    }
}

/// Perform `refactoring` over the files named by `options`.
///
/// Fatal problems (no edit mode, bad arguments, missing inputs, store
/// failures) abort with an error. Files that cannot be read or written are
/// reported in the returned report and the rest of the run continues.
pub fn run(refactoring: &Refactoring, options: &RunOptions) -> Result<RunResponse, ShiftError> {
    let mode = options
        .edit_mode
        .ok_or_else(|| ShiftError::configuration("edit mode not set"))?;
    let refactoring = prepare(refactoring)?;

    let mut files = collect_files(&options.paths, &options.extensions, &options.exclude)?;
    if let Refactoring::RenameFile { old, .. } = &refactoring {
        if !files.contains(old) {
            files.push(old.clone());
        }
    }
    info!(operation = refactoring.name(), %mode, files = files.len(), "run started");

    let mut scanner = Scanner::new()?;
    let mut unreadable = Vec::new();
    for path in &files {
        if let Err(err) = scanner.add_file(path) {
            warn!(file = %path.display(), error = %err, "file skipped");
            unreadable.push(FileFailure {
                file: path.to_string_lossy().into_owned(),
                code: OutputErrorCode::ApplyError.code(),
                message: err.to_string(),
            });
        }
    }

    let mut changes = scanner.run(&refactoring)?;
    let summary = apply_all(&mut changes, mode);
    let mut report = RunReport::from_summary(mode, &summary);
    for failure in unreadable {
        report.add_failure(failure);
    }
    Ok(RunResponse {
        report,
        refactoring,
    })
}
