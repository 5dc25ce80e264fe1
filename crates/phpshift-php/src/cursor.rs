//! Bounds-checked navigation over a token slice.
//!
//! A [`TokenCursor`] is a position in an immutable token array. Every step
//! returns a new cursor or `None`; nothing ever indexes past either end.
//! Bracket-aware steps jump from an opening bracket to its matching closer
//! (or back) in one move, so callers can treat a parenthesized group as a
//! single opaque unit.

use crate::token::{Token, TokenKind};

/// A position within a token slice.
#[derive(Debug, Clone, Copy)]
pub struct TokenCursor<'a> {
    tokens: &'a [Token],
    index: usize,
}

impl<'a> TokenCursor<'a> {
    /// Cursor at `index`, or `None` when out of range.
    pub fn at(tokens: &'a [Token], index: usize) -> Option<Self> {
        (index < tokens.len()).then_some(TokenCursor { tokens, index })
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn token(&self) -> &'a Token {
        &self.tokens[self.index]
    }

    pub fn kind(&self) -> TokenKind {
        self.token().kind
    }

    pub fn content(&self) -> &'a str {
        &self.token().content
    }

    /// Whether the current token is of `kind`.
    pub fn is(&self, kind: TokenKind) -> bool {
        self.kind() == kind
    }

    /// The token immediately after this one.
    pub fn next(&self) -> Option<Self> {
        Self::at(self.tokens, self.index + 1)
    }

    /// The token immediately before this one.
    pub fn prev(&self) -> Option<Self> {
        self.index
            .checked_sub(1)
            .and_then(|index| Self::at(self.tokens, index))
    }

    /// Next token that is not whitespace or a comment.
    pub fn next_significant(&self) -> Option<Self> {
        let mut cursor = self.next()?;
        while cursor.kind().is_trivia() {
            cursor = cursor.next()?;
        }
        Some(cursor)
    }

    /// Previous token that is not whitespace or a comment.
    pub fn prev_significant(&self) -> Option<Self> {
        let mut cursor = self.prev()?;
        while cursor.kind().is_trivia() {
            cursor = cursor.prev()?;
        }
        Some(cursor)
    }

    /// The matching bracket, when this token is a linked bracket.
    pub fn matching(&self) -> Option<Self> {
        self.token()
            .matching
            .and_then(|index| Self::at(self.tokens, index))
    }

    /// Jump over a bracketed group starting here, landing on its closer.
    ///
    /// Returns `self` unchanged when the token is not a linked opener.
    pub fn skip_group_forward(&self) -> Self {
        if self.kind().is_opener() {
            self.matching().unwrap_or(*self)
        } else {
            *self
        }
    }

    /// Jump back over a bracketed group ending here, landing on its opener.
    pub fn skip_group_backward(&self) -> Self {
        if self.kind().is_closer() {
            self.matching().unwrap_or(*self)
        } else {
            *self
        }
    }

    /// First token at or after this one whose kind is in `kinds`.
    pub fn find_next(&self, kinds: &[TokenKind]) -> Option<Self> {
        let mut cursor = *self;
        loop {
            if kinds.contains(&cursor.kind()) {
                return Some(cursor);
            }
            cursor = cursor.next()?;
        }
    }

    /// First token at or after this one whose kind is in `kinds`, giving up
    /// at any token whose kind is in `stop`.
    pub fn find_next_before(&self, kinds: &[TokenKind], stop: &[TokenKind]) -> Option<Self> {
        let mut cursor = *self;
        loop {
            if kinds.contains(&cursor.kind()) {
                return Some(cursor);
            }
            if stop.contains(&cursor.kind()) {
                return None;
            }
            cursor = cursor.next()?;
        }
    }

    /// Next significant token, treating a bracketed group as one unit.
    pub fn step_over_forward(&self) -> Option<Self> {
        self.skip_group_forward().next_significant()
    }

    /// Previous significant token, treating a bracketed group as one unit.
    pub fn step_over_backward(&self) -> Option<Self> {
        self.prev_significant().map(|c| c.skip_group_backward())
    }
}

/// Name of the class, interface, trait or function declared by the owner at `index`.
///
/// `None` for anonymous classes and closures.
pub fn declared_name(tokens: &[Token], index: usize) -> Option<&str> {
    let mut cursor = TokenCursor::at(tokens, index)?.next_significant()?;
    if cursor.is(TokenKind::Ampersand) {
        cursor = cursor.next_significant()?;
    }
    cursor.is(TokenKind::Identifier).then(|| cursor.content())
}
