//! Proposed edits, confidence tiers and the run-wide edit mode.
//!
//! A [`ProposedEdit`] is a line/column-addressed text substitution produced by
//! a rename operation while it walks a file. Edits are never applied while a
//! file is being scanned; they accumulate in the
//! [`ChangeRegistry`](crate::registry::ChangeRegistry) and are consumed once by
//! the application engine in [`apply`](crate::apply).
//!
//! ## Coordinate Conventions
//!
//! - Lines and columns are **1-indexed**
//! - Columns and lengths count **bytes** within the line

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

// ============================================================================
// Confidence
// ============================================================================

/// How sure the proposing operation is that an edit is correct.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    /// The edit targets a token whose meaning was fully resolved.
    High,
    /// The edit is plausible but rests on an unresolved type or a textual match.
    Low,
}

impl Confidence {
    /// Low confidence when `tentative` is set, high otherwise.
    pub fn from_tentative(tentative: bool) -> Self {
        if tentative {
            Confidence::Low
        } else {
            Confidence::High
        }
    }
}

// ============================================================================
// Edit Mode
// ============================================================================

/// Run-wide policy deciding which confidence tiers are applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EditMode {
    /// Apply nothing; every proposed edit becomes a notification.
    Timid,
    /// Apply high-confidence edits; report low-confidence ones.
    #[default]
    Conservative,
    /// Apply every proposed edit.
    Aggressive,
}

impl EditMode {
    /// Whether an edit of the given confidence is applied under this mode.
    pub fn permits(self, confidence: Confidence) -> bool {
        match self {
            EditMode::Timid => false,
            EditMode::Conservative => confidence == Confidence::High,
            EditMode::Aggressive => true,
        }
    }

    /// Whether pending file moves are carried out under this mode.
    pub fn permits_rename(self) -> bool {
        self != EditMode::Timid
    }

    /// Lowercase name used on the command line and in config files.
    pub fn as_str(self) -> &'static str {
        match self {
            EditMode::Timid => "timid",
            EditMode::Conservative => "conservative",
            EditMode::Aggressive => "aggressive",
        }
    }
}

impl fmt::Display for EditMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EditMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "timid" => Ok(EditMode::Timid),
            "conservative" => Ok(EditMode::Conservative),
            "aggressive" => Ok(EditMode::Aggressive),
            other => Err(format!(
                "unknown edit mode '{}', expected timid, conservative or aggressive",
                other
            )),
        }
    }
}

// ============================================================================
// Proposed Edit
// ============================================================================

/// A single text substitution proposed for one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposedEdit {
    /// 1-indexed line number.
    pub line: u32,
    /// 1-indexed byte column where the replaced text begins.
    pub column: u32,
    /// Number of bytes removed.
    pub length: usize,
    /// Text inserted in place of the removed bytes.
    pub replacement: String,
    /// Confidence tier used by the edit-mode policy.
    pub confidence: Confidence,
}

impl ProposedEdit {
    /// Create a new edit.
    pub fn new(
        line: u32,
        column: u32,
        length: usize,
        replacement: impl Into<String>,
        confidence: Confidence,
    ) -> Self {
        ProposedEdit {
            line,
            column,
            length,
            replacement: replacement.into(),
            confidence,
        }
    }

    /// The `(line, column)` key that must be unique per file.
    pub fn key(&self) -> (u32, u32) {
        (self.line, self.column)
    }

    /// Net change in line length once applied.
    pub fn delta(&self) -> isize {
        self.replacement.len() as isize - self.length as isize
    }
}

// ============================================================================
// Content Hash
// ============================================================================

/// SHA-256 of a file's content, stored as hex.
///
/// Recorded when a file is scanned so the application engine can refuse to
/// write over content that changed after the edits were computed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentHash(pub String);

impl ContentHash {
    /// Compute the hash of the given bytes.
    pub fn compute(data: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(data);
        ContentHash(hex::encode(hasher.finalize()))
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
