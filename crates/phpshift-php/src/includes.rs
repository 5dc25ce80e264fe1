//! Include tracking.
//!
//! Records which files each scanned file pulls in through `include`,
//! `include_once`, `require` and `require_once`, so that type lookups can
//! fall back to bindings made in included files.
//!
//! Only arguments built entirely from string literals are understood,
//! optionally anchored with `__DIR__ .`. Anything computed at runtime is
//! ignored.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use phpshift_core::paths::absolute_path;
use tracing::trace;

use crate::cursor::TokenCursor;
use crate::token::{Token, TokenKind};

// ============================================================================
// Include Arguments
// ============================================================================

/// The literal argument of an include statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncludeArgument {
    /// Indexes of the string tokens, in source order.
    pub strings: Vec<usize>,
    /// Whether the strings follow `__DIR__ .`.
    pub dir_anchored: bool,
}

impl IncludeArgument {
    /// The path text: every string's value, concatenated.
    pub fn literal(&self, tokens: &[Token]) -> Option<String> {
        let mut text = String::new();
        for &index in &self.strings {
            let (value, _) = string_value(&tokens[index].content)?;
            text.push_str(value);
        }
        Some(text)
    }

    /// Whether the argument is a single plain string.
    pub fn is_single_literal(&self) -> bool {
        self.strings.len() == 1 && !self.dir_anchored
    }

    /// The quote character of the first string.
    pub fn quote(&self, tokens: &[Token]) -> char {
        self.strings
            .first()
            .and_then(|&index| tokens[index].content.chars().next())
            .unwrap_or('\'')
    }
}

/// The inner text and quote of a quoted string token.
///
/// Double-quoted strings that interpolate variables have no fixed value.
pub fn string_value(content: &str) -> Option<(&str, char)> {
    let quote = content.chars().next()?;
    if quote != '\'' && quote != '"' {
        return None;
    }
    let inner = content.strip_prefix(quote)?.strip_suffix(quote)?;
    if quote == '"' && inner.contains('$') {
        return None;
    }
    Some((inner, quote))
}

/// Extract the literal argument of the include keyword at `index`.
///
/// The argument is either a parenthesized group or everything up to the
/// end of the statement. It may contain only strings, `.` and trivia,
/// optionally preceded by `__DIR__ .`.
pub fn include_argument(tokens: &[Token], index: usize) -> Option<IncludeArgument> {
    let keyword = TokenCursor::at(tokens, index)?;
    if !keyword.kind().is_include() {
        return None;
    }
    let first = keyword.next_significant()?;
    let (start, end) = if first.is(TokenKind::OpenParen) {
        (first.index() + 1, first.matching()?.index())
    } else {
        let end = first.find_next(&[TokenKind::Semicolon, TokenKind::CloseTag])?;
        (first.index(), end.index())
    };

    let mut strings = Vec::new();
    let mut dir_anchored = false;
    let mut expect_operand = true;
    for (offset, token) in tokens[start..end].iter().enumerate() {
        match token.kind {
            kind if kind.is_trivia() => {}
            TokenKind::String if expect_operand => {
                string_value(&token.content)?;
                strings.push(start + offset);
                expect_operand = false;
            }
            TokenKind::Identifier
                if expect_operand && strings.is_empty() && !dir_anchored
                    && token.content.eq_ignore_ascii_case("__DIR__") =>
            {
                dir_anchored = true;
                expect_operand = false;
            }
            TokenKind::Concat if !expect_operand => expect_operand = true,
            _ => return None,
        }
    }
    if strings.is_empty() || expect_operand {
        return None;
    }
    Some(IncludeArgument {
        strings,
        dir_anchored,
    })
}

/// Absolute path named by an include argument found in a file in `including_dir`.
pub fn resolve_include(literal: &str, dir_anchored: bool, including_dir: &Path) -> PathBuf {
    if dir_anchored {
        absolute_path(Path::new(literal.trim_start_matches('/')), including_dir)
    } else {
        absolute_path(Path::new(literal), including_dir)
    }
}

// ============================================================================
// Tracker
// ============================================================================

/// Per-file list of included files, in declaration order.
#[derive(Debug, Default)]
pub struct IncludeTracker {
    includes: HashMap<PathBuf, Vec<PathBuf>>,
}

impl IncludeTracker {
    pub fn new() -> Self {
        IncludeTracker::default()
    }

    /// Record every literal include in `tokens`, the content of `path`.
    ///
    /// Re-recording a file replaces what was known about it.
    pub fn record_file(&mut self, path: &Path, tokens: &[Token]) {
        let dir = path.parent().unwrap_or(Path::new("/"));
        let mut found: Vec<PathBuf> = Vec::new();
        for (index, token) in tokens.iter().enumerate() {
            if !token.kind.is_include() {
                continue;
            }
            let Some(argument) = include_argument(tokens, index) else {
                continue;
            };
            let Some(literal) = argument.literal(tokens) else {
                continue;
            };
            let target = resolve_include(&literal, argument.dir_anchored, dir);
            trace!(file = %path.display(), target = %target.display(), "include recorded");
            if !found.contains(&target) {
                found.push(target);
            }
        }
        self.includes.insert(path.to_path_buf(), found);
    }

    /// Files included by `path`, in declaration order.
    pub fn included_files(&self, path: &Path) -> &[PathBuf] {
        self.includes.get(path).map(Vec::as_slice).unwrap_or(&[])
    }
}
