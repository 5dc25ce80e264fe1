//! Token-driven operations ("sniffs").
//!
//! Each [`Sniff`] registers interest in a set of token kinds; the scanner
//! calls [`Sniff::process`] for every matching token. Type-tracking sniffs
//! record bindings through the [`Resolver`]; rename sniffs record proposed
//! edits in the [`ChangeRegistry`].
//!
//! The set of sniffs is closed, so dispatch is a `match` rather than a trait
//! object per operation.

pub mod comment_types;
pub mod rename_class;
pub mod rename_file;
pub mod rename_method;
pub mod track_types;

use std::collections::HashMap;
use std::path::Path;

use phpshift_core::registry::ChangeRegistry;

use crate::classes::ClassHierarchy;
use crate::resolver::Resolver;
use crate::store::StoreResult;
use crate::token::{Token, TokenKind};

pub use rename_class::RenameClass;
pub use rename_file::RenameFile;
pub use rename_method::RenameMethod;

// ============================================================================
// Context
// ============================================================================

/// What a sniff sees while processing one file.
#[derive(Debug, Clone, Copy)]
pub struct SniffContext<'a> {
    pub path: &'a Path,
    pub tokens: &'a [Token],
    pub resolver: Resolver<'a>,
    pub classes: &'a ClassHierarchy,
}

impl<'a> SniffContext<'a> {
    pub fn new(resolver: Resolver<'a>) -> Self {
        SniffContext {
            path: resolver.path(),
            tokens: resolver.tokens(),
            resolver,
            classes: resolver.classes(),
        }
    }
}

// ============================================================================
// Sniffs
// ============================================================================

/// The closed set of operations run over the token stream.
#[derive(Debug, Clone)]
pub enum Sniff {
    /// `$x = ...` assignments.
    TrackAssignments,
    /// `global $x;` declarations.
    TrackGlobals,
    /// Parameter, return and property type declarations, and `catch` variables.
    TrackDeclarations,
    /// `@var`, `@param` and `@return` doc comment tags.
    TrackCommentTypes,
    RenameClass(RenameClass),
    RenameMethod(RenameMethod),
    RenameFile(RenameFile),
}

impl Sniff {
    /// The sniffs that build the type model.
    pub fn tracking() -> Vec<Sniff> {
        vec![
            Sniff::TrackCommentTypes,
            Sniff::TrackDeclarations,
            Sniff::TrackGlobals,
            Sniff::TrackAssignments,
        ]
    }

    /// Token kinds this sniff wants to see.
    pub fn registers(&self) -> &'static [TokenKind] {
        match self {
            Sniff::TrackAssignments => &[TokenKind::Equal],
            Sniff::TrackGlobals => &[TokenKind::Global],
            Sniff::TrackDeclarations => &[
                TokenKind::Function,
                TokenKind::Catch,
                TokenKind::Public,
                TokenKind::Protected,
                TokenKind::Private,
                TokenKind::Var,
                TokenKind::Static,
                TokenKind::Readonly,
            ],
            Sniff::TrackCommentTypes => &[TokenKind::DocComment],
            Sniff::RenameClass(_) => RenameClass::REGISTERS,
            Sniff::RenameMethod(_) => RenameMethod::REGISTERS,
            Sniff::RenameFile(_) => RenameFile::REGISTERS,
        }
    }

    /// Process the token at `index`.
    pub fn process(
        &self,
        ctx: &SniffContext<'_>,
        index: usize,
        changes: &mut ChangeRegistry,
    ) -> StoreResult<()> {
        match self {
            Sniff::TrackAssignments => track_types::process_assignment(ctx, index),
            Sniff::TrackGlobals => track_types::process_global(ctx, index),
            Sniff::TrackDeclarations => track_types::process_declaration(ctx, index),
            Sniff::TrackCommentTypes => comment_types::process_doc_comment(ctx, index),
            Sniff::RenameClass(op) => {
                op.process(ctx, index, changes);
                Ok(())
            }
            Sniff::RenameMethod(op) => op.process(ctx, index, changes),
            Sniff::RenameFile(op) => {
                op.process(ctx, index, changes);
                Ok(())
            }
        }
    }
}

/// Index from token kind to the sniffs interested in it, in sniff order.
#[derive(Debug, Default)]
pub struct Dispatch {
    by_kind: HashMap<TokenKind, Vec<usize>>,
}

impl Dispatch {
    pub fn new(sniffs: &[Sniff]) -> Self {
        let mut by_kind: HashMap<TokenKind, Vec<usize>> = HashMap::new();
        for (position, sniff) in sniffs.iter().enumerate() {
            for kind in sniff.registers() {
                by_kind.entry(*kind).or_default().push(position);
            }
        }
        Dispatch { by_kind }
    }

    /// Positions of the sniffs registered for `kind`.
    pub fn for_kind(&self, kind: TokenKind) -> &[usize] {
        self.by_kind.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dispatch_preserves_sniff_order() {
        let sniffs = vec![Sniff::TrackDeclarations, Sniff::TrackAssignments, Sniff::TrackGlobals];
        let dispatch = Dispatch::new(&sniffs);
        assert_eq!(dispatch.for_kind(TokenKind::Equal), &[1]);
        assert_eq!(dispatch.for_kind(TokenKind::Function), &[0]);
        assert!(dispatch.for_kind(TokenKind::Semicolon).is_empty());
    }
}
