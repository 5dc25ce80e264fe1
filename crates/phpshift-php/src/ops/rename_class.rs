//! Class renaming.
//!
//! Code references (declarations, `new`, `extends`/`implements`, type
//! hints, static access, `instanceof`, `catch`) are renamed with high
//! confidence. Whole-word mentions inside strings and comments are renamed
//! with low confidence.

use regex::Regex;

use phpshift_core::edit::Confidence;
use phpshift_core::registry::ChangeRegistry;

use crate::cursor::TokenCursor;
use crate::ops::SniffContext;
use crate::token::TokenKind;
use crate::var_type::short_class_name;

#[derive(Debug, Clone)]
pub struct RenameClass {
    old: String,
    new: String,
    /// Whole-word matcher for `old` in free text.
    pattern: Regex,
}

impl RenameClass {
    pub const REGISTERS: &'static [TokenKind] = &[
        TokenKind::Identifier,
        TokenKind::String,
        TokenKind::Heredoc,
        TokenKind::Comment,
        TokenKind::DocComment,
    ];

    pub fn new(old: impl Into<String>, new: impl Into<String>) -> Result<Self, regex::Error> {
        let old = old.into();
        let pattern = Regex::new(&format!(r"\b{}\b", regex::escape(&old)))?;
        Ok(RenameClass {
            old,
            new: new.into(),
            pattern,
        })
    }

    pub fn old(&self) -> &str {
        &self.old
    }

    pub fn new_name(&self) -> &str {
        &self.new
    }

    pub fn process(&self, ctx: &SniffContext<'_>, index: usize, changes: &mut ChangeRegistry) {
        match ctx.tokens[index].kind {
            TokenKind::Identifier => self.process_identifier(ctx, index, changes),
            _ => self.process_text(ctx, index, changes),
        }
    }

    fn process_identifier(&self, ctx: &SniffContext<'_>, index: usize, changes: &mut ChangeRegistry) {
        let token = &ctx.tokens[index];
        let short = short_class_name(&token.content);
        if short != self.old {
            return;
        }
        let Some(cursor) = TokenCursor::at(ctx.tokens, index) else {
            return;
        };
        let prev = cursor.prev_significant();
        let follows_new = prev.is_some_and(|p| p.is(TokenKind::New));
        if prev.is_some_and(|p| {
            p.kind().is_access()
                || matches!(
                    p.kind(),
                    TokenKind::Function | TokenKind::Const | TokenKind::Namespace
                )
        }) {
            // Members, functions, constants and namespaces sharing the name.
            return;
        }
        if !follows_new
            && cursor
                .next_significant()
                .is_some_and(|n| n.is(TokenKind::OpenParen))
        {
            // A function call.
            return;
        }

        let offset = token.content.len() - short.len();
        changes.add_edit(
            ctx.path,
            token.line,
            token.column + offset as u32,
            short.len(),
            self.new.clone(),
            Confidence::High,
        );
    }

    fn process_text(&self, ctx: &SniffContext<'_>, index: usize, changes: &mut ChangeRegistry) {
        let token = &ctx.tokens[index];
        for found in self.pattern.find_iter(&token.content) {
            let (line, column) = token.position_of(found.start());
            changes.add_edit(
                ctx.path,
                line,
                column,
                found.len(),
                self.new.clone(),
                Confidence::Low,
            );
        }
    }
}
