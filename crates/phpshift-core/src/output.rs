//! Run report types and rendering.
//!
//! The report is what a run prints: how many files changed, which possible
//! changes were withheld by the edit mode (so an operator can review them by
//! hand) and which files could not be processed at all.
//!
//! ## Output Principles
//!
//! 1. **Status first:** every JSON response has `status` as its first field
//! 2. **Deterministic:** files and lines are listed in path then line order
//! 3. **Versioned:** responses carry `schema_version`

use std::io::{self, Write};

use serde::Serialize;

use crate::apply::ApplySummary;
use crate::edit::EditMode;
use crate::error::{OutputErrorCode, ShiftError};

/// Current schema version for all responses.
pub const SCHEMA_VERSION: &str = "1";

/// A possible change the edit mode withheld.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    /// File holding the possible change.
    pub file: String,
    /// Line of a withheld edit; absent for a withheld move.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
    /// Destination of a withheld move.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub move_to: Option<String>,
}

impl Notification {
    fn render(&self) -> String {
        match (&self.line, &self.move_to) {
            (Some(line), _) => format!("{}:{}", self.file, line),
            (None, Some(target)) => format!("{} (move to {})", self.file, target),
            (None, None) => self.file.clone(),
        }
    }
}

/// A file whose changes were abandoned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileFailure {
    /// File that failed.
    pub file: String,
    /// Numeric error code.
    pub code: u8,
    /// Human-readable reason.
    pub message: String,
}

/// A file that was moved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MovedFile {
    pub from: String,
    pub to: String,
}

/// Final report of a run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    /// `ok` when every file was processed, `partial` when some failed.
    pub status: String,
    pub schema_version: String,
    /// Edit mode the run used.
    pub mode: EditMode,
    /// Number of files whose content or location changed.
    pub files_changed: usize,
    /// Number of edits written.
    pub edits_applied: usize,
    /// Files moved to a new path.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub moved: Vec<MovedFile>,
    /// Possible changes withheld for manual review.
    pub withheld: Vec<Notification>,
    /// Files that could not be processed.
    pub failures: Vec<FileFailure>,
}

impl RunReport {
    /// Build the report for an apply summary.
    pub fn from_summary(mode: EditMode, summary: &ApplySummary) -> Self {
        let mut moved = Vec::new();
        let mut withheld = Vec::new();
        for outcome in &summary.outcomes {
            let file = outcome.path.to_string_lossy().into_owned();
            if let Some(target) = &outcome.moved_to {
                moved.push(MovedFile {
                    from: file.clone(),
                    to: target.to_string_lossy().into_owned(),
                });
            }
            for line in &outcome.withheld_lines {
                withheld.push(Notification {
                    file: file.clone(),
                    line: Some(*line),
                    move_to: None,
                });
            }
            if let Some(target) = &outcome.withheld_move {
                withheld.push(Notification {
                    file: file.clone(),
                    line: None,
                    move_to: Some(target.to_string_lossy().into_owned()),
                });
            }
        }

        let failures: Vec<FileFailure> = summary
            .failures
            .iter()
            .map(|err| FileFailure {
                file: err.path().to_string_lossy().into_owned(),
                code: OutputErrorCode::ApplyError.code(),
                message: err.to_string(),
            })
            .collect();

        RunReport {
            status: (if failures.is_empty() { "ok" } else { "partial" }).to_string(),
            schema_version: SCHEMA_VERSION.to_string(),
            mode,
            files_changed: summary.changed_count(),
            edits_applied: summary.outcomes.iter().map(|o| o.applied).sum(),
            moved,
            withheld,
            failures,
        }
    }

    /// Record a file that could not be processed before application.
    pub fn add_failure(&mut self, failure: FileFailure) {
        self.failures.push(failure);
        self.status = "partial".to_string();
    }

    /// Whether every file was processed.
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    /// Exit code for the run: success, or the apply error code when a file failed.
    pub fn exit_code(&self) -> u8 {
        if self.is_complete() {
            0
        } else {
            OutputErrorCode::ApplyError.code()
        }
    }

    /// Write the human-readable summary.
    pub fn write_text(&self, writer: &mut impl Write) -> io::Result<()> {
        writeln!(
            writer,
            "{} {} changed ({} mode)",
            self.files_changed,
            plural(self.files_changed, "file", "files"),
            self.mode
        )?;
        for moved in &self.moved {
            writeln!(writer, "  moved {} -> {}", moved.from, moved.to)?;
        }
        if !self.withheld.is_empty() {
            writeln!(
                writer,
                "{} possible {} not applied; review manually:",
                self.withheld.len(),
                plural(self.withheld.len(), "change", "changes")
            )?;
            for note in &self.withheld {
                writeln!(writer, "  {}", note.render())?;
            }
        }
        if !self.failures.is_empty() {
            writeln!(
                writer,
                "{} {} could not be processed:",
                self.failures.len(),
                plural(self.failures.len(), "file", "files")
            )?;
            for failure in &self.failures {
                writeln!(writer, "  {}", failure.message)?;
            }
        }
        Ok(())
    }
}

fn plural<'a>(count: usize, one: &'a str, many: &'a str) -> &'a str {
    if count == 1 {
        one
    } else {
        many
    }
}

// ============================================================================
// Error Response
// ============================================================================

/// Error details for JSON output.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorInfo {
    /// Numeric error code.
    pub code: u8,
    /// Human-readable message.
    pub message: String,
    /// File the error concerns, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
}

impl ErrorInfo {
    /// Create from a ShiftError.
    pub fn from_error(err: &ShiftError) -> Self {
        let file = match err {
            ShiftError::FileNotFound { path } => Some(path.clone()),
            ShiftError::ApplyError { file, .. } => file.clone(),
            _ => None,
        };
        ErrorInfo {
            code: OutputErrorCode::from(err).code(),
            message: err.to_string(),
            file,
        }
    }
}

/// Response emitted when a run aborts.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub status: String,
    pub schema_version: String,
    pub error: ErrorInfo,
}

impl ErrorResponse {
    /// Create an error response for `err`.
    pub fn new(err: &ShiftError) -> Self {
        ErrorResponse {
            status: "error".to_string(),
            schema_version: SCHEMA_VERSION.to_string(),
            error: ErrorInfo::from_error(err),
        }
    }
}

/// Emit a response as pretty-printed JSON to a writer.
pub fn emit_response<T: Serialize>(response: &T, writer: &mut impl Write) -> io::Result<()> {
    let json = serde_json::to_string_pretty(response)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    writeln!(writer, "{}", json)
}

// ============================================================================
// Tests
// ============================================================================
