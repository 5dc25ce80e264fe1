//! Method renaming.
//!
//! The declaration in the target class (and overriding declarations in its
//! subclasses) and every call whose receiver resolves into that hierarchy
//! are renamed with high confidence. Calls whose receiver cannot be
//! resolved, or resolves to an ancestor of the target, are renamed with low
//! confidence. Calls on unrelated classes are left alone.

use phpshift_core::edit::Confidence;
use phpshift_core::registry::ChangeRegistry;
use tracing::trace;

use crate::cursor::{declared_name, TokenCursor};
use crate::ops::track_types::declared_class;
use crate::ops::SniffContext;
use crate::store::StoreResult;
use crate::token::TokenKind;
use crate::var_type::{short_class_name, VarType};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenameMethod {
    class: String,
    old: String,
    new: String,
}

impl RenameMethod {
    pub const REGISTERS: &'static [TokenKind] = &[TokenKind::Identifier];

    pub fn new(class: impl Into<String>, old: impl Into<String>, new: impl Into<String>) -> Self {
        let class = class.into();
        RenameMethod {
            class: short_class_name(&class).to_string(),
            old: old.into(),
            new: new.into(),
        }
    }

    pub fn process(
        &self,
        ctx: &SniffContext<'_>,
        index: usize,
        changes: &mut ChangeRegistry,
    ) -> StoreResult<()> {
        if ctx.tokens[index].content != self.old {
            return Ok(());
        }
        let Some(cursor) = TokenCursor::at(ctx.tokens, index) else {
            return Ok(());
        };
        let Some(prev) = cursor.prev_significant() else {
            return Ok(());
        };
        let prev = if prev.is(TokenKind::Ampersand) {
            match prev.prev_significant() {
                Some(p) if p.is(TokenKind::Function) => p,
                _ => prev,
            }
        } else {
            prev
        };

        let confidence = match prev.kind() {
            TokenKind::Function => self.declaration_confidence(ctx, index),
            kind if kind.is_access() => {
                let is_call = cursor
                    .next_significant()
                    .is_some_and(|n| n.is(TokenKind::OpenParen));
                if !is_call {
                    return Ok(());
                }
                self.call_confidence(ctx, prev.index())?
            }
            _ => None,
        };

        if let Some(confidence) = confidence {
            let token = &ctx.tokens[index];
            changes.add_edit(
                ctx.path,
                token.line,
                token.column,
                token.content.len(),
                self.new.clone(),
                confidence,
            );
        }
        Ok(())
    }

    /// A method declaration in the target class or one of its subclasses.
    fn declaration_confidence(&self, ctx: &SniffContext<'_>, index: usize) -> Option<Confidence> {
        let (owner, kind) = ctx.tokens[index].binding_owner()?;
        if !kind.is_class_like() {
            return None;
        }
        let class = declared_name(ctx.tokens, owner).map(short_class_name)?;
        ctx.classes
            .is_subclass_of(class, &self.class)
            .then_some(Confidence::High)
    }

    /// A call through the access operator at `operator`.
    fn call_confidence(&self, ctx: &SniffContext<'_>, operator: usize) -> StoreResult<Option<Confidence>> {
        let Some(receiver) = TokenCursor::at(ctx.tokens, operator).and_then(|c| c.prev_significant())
        else {
            return Ok(Some(Confidence::Low));
        };
        let is_class_reference = ctx.tokens[operator].kind == TokenKind::DoubleColon
            && matches!(receiver.kind(), TokenKind::Identifier | TokenKind::Static);
        let ty = if is_class_reference {
            declared_class(ctx, receiver.index(), receiver.content())
        } else {
            ctx.resolver.receiver_type(receiver.index())?
        };
        trace!(file = %ctx.path.display(), operator, receiver = ?ty, "method call receiver");
        let confidence = match ty.as_deref().and_then(VarType::parse) {
            Some(VarType::Class(class)) => {
                if ctx.classes.is_subclass_of(&class, &self.class) {
                    Some(Confidence::High)
                } else if ctx.classes.is_subclass_of(&self.class, &class) {
                    Some(Confidence::Low)
                } else {
                    None
                }
            }
            _ => Some(Confidence::Low),
        };
        Ok(confidence)
    }
}
