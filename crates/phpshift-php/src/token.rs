//! PHP token model.
//!
//! Tokens carry everything the resolver and the rename operations need
//! without re-scanning source text: kind, verbatim content, 1-based line and
//! byte column, the stack of enclosing scope owners, and links between
//! matching brackets and from scope owners to their opening brace.

use std::fmt;

/// Kind of a lexical token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    // Source regions
    InlineHtml,
    OpenTag,
    CloseTag,
    Whitespace,
    Comment,
    DocComment,

    // Atoms
    Variable,
    Identifier,
    String,
    Heredoc,
    Number,

    // Keywords the resolver and operations look at
    Class,
    Interface,
    Trait,
    Function,
    New,
    Clone,
    Extends,
    Implements,
    Instanceof,
    Global,
    Include,
    IncludeOnce,
    Require,
    RequireOnce,
    Catch,
    Const,
    Return,
    Public,
    Protected,
    Private,
    Static,
    Abstract,
    Final,
    Readonly,
    Var,
    Use,
    Namespace,
    /// `if`, `else`, `elseif`, `while`, `do`, `for`, `foreach`, `switch`, `try`, `finally`, `declare`.
    ControlKeyword,
    /// Any other reserved word (`echo`, `return`, `match`, ...).
    Keyword,

    // Punctuation
    /// `->` or `?->`.
    ObjectOperator,
    /// `::`.
    DoubleColon,
    OpenParen,
    CloseParen,
    OpenBrace,
    CloseBrace,
    /// `[` or the attribute opener `#[`.
    OpenBracket,
    CloseBracket,
    Equal,
    Ampersand,
    Concat,
    Semicolon,
    Comma,
    Question,
    Colon,
    Pipe,
    At,
    /// Any other operator.
    Operator,
}

impl TokenKind {
    /// Whitespace and comments, which navigation steps over.
    pub fn is_trivia(self) -> bool {
        matches!(
            self,
            TokenKind::Whitespace | TokenKind::Comment | TokenKind::DocComment
        )
    }

    /// `include`, `include_once`, `require` or `require_once`.
    pub fn is_include(self) -> bool {
        matches!(
            self,
            TokenKind::Include | TokenKind::IncludeOnce | TokenKind::Require | TokenKind::RequireOnce
        )
    }

    /// Member modifiers that may precede a property or method declaration.
    pub fn is_modifier(self) -> bool {
        matches!(
            self,
            TokenKind::Public
                | TokenKind::Protected
                | TokenKind::Private
                | TokenKind::Static
                | TokenKind::Abstract
                | TokenKind::Final
                | TokenKind::Readonly
                | TokenKind::Var
        )
    }

    /// Opening bracket of any shape.
    pub fn is_opener(self) -> bool {
        matches!(
            self,
            TokenKind::OpenParen | TokenKind::OpenBrace | TokenKind::OpenBracket
        )
    }

    /// Closing bracket of any shape.
    pub fn is_closer(self) -> bool {
        matches!(
            self,
            TokenKind::CloseParen | TokenKind::CloseBrace | TokenKind::CloseBracket
        )
    }

    /// Member or static access operator.
    pub fn is_access(self) -> bool {
        matches!(self, TokenKind::ObjectOperator | TokenKind::DoubleColon)
    }
}

/// What kind of construct owns a brace-delimited scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScopeKind {
    Class,
    Interface,
    Trait,
    Function,
    /// Conditionals, loops, `try`/`catch` and similar blocks.
    Control,
}

impl ScopeKind {
    /// Scopes that own variable bindings.
    pub fn is_binding_scope(self) -> bool {
        !matches!(self, ScopeKind::Control)
    }

    /// Classes, interfaces and traits.
    pub fn is_class_like(self) -> bool {
        matches!(self, ScopeKind::Class | ScopeKind::Interface | ScopeKind::Trait)
    }
}

/// A single token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    /// Verbatim source text.
    pub content: String,
    /// 1-based line of the first byte.
    pub line: u32,
    /// 1-based byte column of the first byte.
    pub column: u32,
    /// Enclosing scope owners, outermost first: `(owner index, kind)`.
    pub conditions: Vec<(usize, ScopeKind)>,
    /// Index of the matching bracket, for bracket tokens.
    pub matching: Option<usize>,
    /// Index of the opening brace, for scope-owner tokens.
    pub scope_opener: Option<usize>,
}

impl Token {
    /// Create a token with no structural links.
    pub fn new(kind: TokenKind, content: impl Into<String>, line: u32, column: u32) -> Self {
        Token {
            kind,
            content: content.into(),
            line,
            column,
            conditions: Vec::new(),
            matching: None,
            scope_opener: None,
        }
    }

    /// Innermost scope owner that can hold bindings (class, interface, trait or function).
    pub fn binding_owner(&self) -> Option<(usize, ScopeKind)> {
        self.conditions
            .iter()
            .rev()
            .find(|(_, kind)| kind.is_binding_scope())
            .copied()
    }

    /// Innermost class-like scope owner, looking through functions.
    pub fn class_owner(&self) -> Option<usize> {
        self.conditions
            .iter()
            .rev()
            .find(|(_, kind)| kind.is_class_like())
            .map(|(index, _)| *index)
    }

    /// Whether this token sits directly in a class body rather than a method.
    pub fn at_class_level(&self) -> bool {
        matches!(self.binding_owner(), Some((_, kind)) if kind.is_class_like())
    }

    /// Line and column of the byte at `offset` within this token's content.
    pub fn position_of(&self, offset: usize) -> (u32, u32) {
        let before = &self.content.as_bytes()[..offset.min(self.content.len())];
        match before.iter().rposition(|b| *b == b'\n') {
            None => (self.line, self.column + offset as u32),
            Some(newline) => {
                let lines = before.iter().filter(|b| **b == b'\n').count() as u32;
                (self.line + lines, (offset - newline) as u32)
            }
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} {:?} at {}:{}", self.kind, self.content, self.line, self.column)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn position_of_single_line_token() {
        let token = Token::new(TokenKind::String, "'abc def'", 3, 10);
        assert_eq!(token.position_of(0), (3, 10));
        assert_eq!(token.position_of(5), (3, 15));
    }

    #[test]
    fn position_of_multi_line_token() {
        let token = Token::new(TokenKind::DocComment, "/**\n * Foo\n */", 2, 5);
        // "Foo" starts after "/**\n * "
        assert_eq!(token.position_of(7), (3, 4));
    }

    #[test]
    fn binding_owner_skips_control_scopes() {
        let mut token = Token::new(TokenKind::Variable, "$x", 1, 1);
        token.conditions = vec![
            (2, ScopeKind::Class),
            (9, ScopeKind::Function),
            (20, ScopeKind::Control),
        ];
        assert_eq!(token.binding_owner(), Some((9, ScopeKind::Function)));
        assert_eq!(token.class_owner(), Some(2));
        assert!(!token.at_class_level());
    }
}
