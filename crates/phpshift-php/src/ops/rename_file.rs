//! File renaming: rewrite include statements that name the moved file.
//!
//! The move itself is registered with the change registry by the scanner;
//! this sniff only proposes edits to the include literals.

use std::path::{Path, PathBuf};

use phpshift_core::edit::Confidence;
use phpshift_core::paths::{absolute_path, match_include_path, relative_path, rewrite_include_literal};
use phpshift_core::registry::ChangeRegistry;
use tracing::debug;

use crate::includes::include_argument;
use crate::ops::SniffContext;
use crate::token::TokenKind;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenameFile {
    old: PathBuf,
    new: PathBuf,
}

impl RenameFile {
    pub const REGISTERS: &'static [TokenKind] = &[
        TokenKind::Include,
        TokenKind::IncludeOnce,
        TokenKind::Require,
        TokenKind::RequireOnce,
    ];

    /// Both paths must be absolute and normalized.
    pub fn new(old: impl Into<PathBuf>, new: impl Into<PathBuf>) -> Self {
        RenameFile {
            old: old.into(),
            new: new.into(),
        }
    }

    pub fn process(&self, ctx: &SniffContext<'_>, index: usize, changes: &mut ChangeRegistry) {
        let tokens = ctx.tokens;
        let Some(argument) = include_argument(tokens, index) else {
            return;
        };
        let Some(literal) = argument.literal(tokens) else {
            return;
        };
        let dir = ctx.path.parent().unwrap_or(Path::new("/"));

        let (replacement, confidence) = if argument.dir_anchored {
            let relative = literal.trim_start_matches('/');
            if absolute_path(Path::new(relative), dir) != self.old {
                return;
            }
            (format!("/{}", relative_path(&self.new, dir)), Confidence::Low)
        } else {
            let Some(matched) = match_include_path(&self.old, &literal, dir) else {
                return;
            };
            let confidence = Confidence::from_tentative(!argument.is_single_literal());
            (rewrite_include_literal(&literal, &matched, &self.new), confidence)
        };

        let (Some(&first), Some(&last)) = (argument.strings.first(), argument.strings.last()) else {
            return;
        };
        let (first, last) = (&tokens[first], &tokens[last]);
        if first.line != last.line {
            debug!(
                file = %ctx.path.display(),
                line = first.line,
                "include spans several lines, not rewritten"
            );
            return;
        }
        let quote = argument.quote(tokens);
        let length = (last.column - first.column) as usize + last.content.len();
        changes.add_edit(
            ctx.path,
            first.line,
            first.column,
            length,
            format!("{}{}{}", quote, replacement, quote),
            confidence,
        );
    }
}
