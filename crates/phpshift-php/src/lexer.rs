//! Lossless PHP lexer.
//!
//! [`tokenize`] turns raw source bytes into a token vector whose contents
//! concatenate back to the input. Besides splitting text, the lexer tracks
//! structure in the same sweep:
//!
//! - bracket tokens are linked to their counterpart through `matching`;
//! - scope owners (`class`, `interface`, `trait`, `function` and control
//!   keywords) are linked to their opening brace through `scope_opener`;
//! - every token records the stack of scope owners enclosing it.
//!
//! A scope owner stays pending until the next `{` at its own bracket depth,
//! which opens its scope, or a `;` at that depth, which abandons it
//! (abstract methods, brace-less control statements).
//!
//! The lexer never fails. Unterminated strings and comments run to the end
//! of input, and stray bytes become single-byte operator tokens.

use crate::token::{ScopeKind, Token, TokenKind};

/// Tokenize PHP source.
pub fn tokenize(source: &[u8]) -> Vec<Token> {
    let mut lexer = Lexer::new(source);
    lexer.run();
    lexer.tokens
}

#[derive(Debug, Clone, Copy)]
struct OpenEntry {
    index: usize,
    kind: TokenKind,
    owner: Option<(usize, ScopeKind)>,
}

#[derive(Debug, Clone, Copy)]
struct PendingOwner {
    index: usize,
    kind: ScopeKind,
    depth: usize,
}

struct Lexer<'a> {
    src: &'a [u8],
    pos: usize,
    line: u32,
    column: u32,
    in_php: bool,
    tokens: Vec<Token>,
    scopes: Vec<(usize, ScopeKind)>,
    open: Vec<OpenEntry>,
    pending: Vec<PendingOwner>,
    last_significant: Option<TokenKind>,
}

const THREE_CHAR_OPS: &[&str] = &["===", "!==", "<=>", "**=", "...", "<<=", ">>=", "??=", "?->"];
const TWO_CHAR_OPS: &[&str] = &[
    "->", "::", "=>", "==", "!=", "<>", "<=", ">=", "&&", "||", "??", ".=", "+=", "-=", "*=", "/=",
    "%=", "&=", "|=", "^=", "**", "++", "--", "<<", ">>",
];

fn is_ident_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_' || b >= 0x80
}

fn is_ident_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b >= 0x80
}

fn keyword_kind(word: &str) -> Option<TokenKind> {
    let kind = match word.to_ascii_lowercase().as_str() {
        "class" => TokenKind::Class,
        "interface" => TokenKind::Interface,
        "trait" => TokenKind::Trait,
        "function" => TokenKind::Function,
        "new" => TokenKind::New,
        "clone" => TokenKind::Clone,
        "extends" => TokenKind::Extends,
        "implements" => TokenKind::Implements,
        "instanceof" => TokenKind::Instanceof,
        "global" => TokenKind::Global,
        "include" => TokenKind::Include,
        "include_once" => TokenKind::IncludeOnce,
        "require" => TokenKind::Require,
        "require_once" => TokenKind::RequireOnce,
        "catch" => TokenKind::Catch,
        "const" => TokenKind::Const,
        "return" => TokenKind::Return,
        "public" => TokenKind::Public,
        "protected" => TokenKind::Protected,
        "private" => TokenKind::Private,
        "static" => TokenKind::Static,
        "abstract" => TokenKind::Abstract,
        "final" => TokenKind::Final,
        "readonly" => TokenKind::Readonly,
        "var" => TokenKind::Var,
        "use" => TokenKind::Use,
        "namespace" => TokenKind::Namespace,
        "if" | "else" | "elseif" | "while" | "do" | "for" | "foreach" | "switch" | "try"
        | "finally" | "declare" => TokenKind::ControlKeyword,
        "echo" | "print" | "match" | "yield" | "throw" | "as" | "insteadof" | "goto" | "break"
        | "continue" | "case" | "default" | "and" | "or" | "xor" | "fn" | "endif" | "endwhile"
        | "endfor" | "endforeach" | "endswitch" | "enddeclare" => TokenKind::Keyword,
        _ => return None,
    };
    Some(kind)
}

impl<'a> Lexer<'a> {
    fn new(src: &'a [u8]) -> Self {
        Lexer {
            src,
            pos: 0,
            line: 1,
            column: 1,
            in_php: false,
            tokens: Vec::new(),
            scopes: Vec::new(),
            open: Vec::new(),
            pending: Vec::new(),
            last_significant: None,
        }
    }

    fn peek(&self, offset: usize) -> Option<u8> {
        self.src.get(self.pos + offset).copied()
    }

    fn starts_with(&self, text: &str) -> bool {
        self.src[self.pos..].starts_with(text.as_bytes())
    }

    fn starts_with_ignore_case(&self, text: &str) -> bool {
        let rest = &self.src[self.pos..];
        rest.len() >= text.len() && rest[..text.len()].eq_ignore_ascii_case(text.as_bytes())
    }

    fn run(&mut self) {
        while self.pos < self.src.len() {
            if self.in_php {
                self.lex_php();
            } else {
                self.lex_html();
            }
        }
    }

    // ========================================================================
    // Emission
    // ========================================================================

    fn emit(&mut self, kind: TokenKind, len: usize) {
        let start = self.pos;
        let end = (start + len.max(1)).min(self.src.len());
        let text = String::from_utf8_lossy(&self.src[start..end]).into_owned();
        let mut token = Token::new(kind, text, self.line, self.column);
        token.conditions = self.scopes.clone();

        for &b in &self.src[start..end] {
            if b == b'\n' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
        }
        self.pos = end;

        let index = self.tokens.len();
        self.tokens.push(token);
        self.track_structure(index);
        if !kind.is_trivia() {
            self.last_significant = Some(kind);
        }
    }

    fn push_pending(&mut self, index: usize, kind: ScopeKind) {
        let depth = self.open.len();
        if let Some(top) = self.pending.last() {
            if top.depth == depth {
                self.pending.pop();
            }
        }
        self.pending.push(PendingOwner { index, kind, depth });
    }

    fn track_structure(&mut self, index: usize) {
        let kind = self.tokens[index].kind;
        match kind {
            TokenKind::Class => self.push_pending(index, ScopeKind::Class),
            TokenKind::Interface => self.push_pending(index, ScopeKind::Interface),
            TokenKind::Trait => self.push_pending(index, ScopeKind::Trait),
            TokenKind::Function => self.push_pending(index, ScopeKind::Function),
            TokenKind::ControlKeyword | TokenKind::Catch => {
                self.push_pending(index, ScopeKind::Control)
            }
            TokenKind::Semicolon => {
                if matches!(self.pending.last(), Some(p) if p.depth == self.open.len()) {
                    self.pending.pop();
                }
            }
            TokenKind::OpenParen | TokenKind::OpenBracket => {
                self.open.push(OpenEntry {
                    index,
                    kind,
                    owner: None,
                });
            }
            TokenKind::OpenBrace => {
                let depth = self.open.len();
                let owner = match self.pending.last() {
                    Some(p) if p.depth == depth => {
                        let p = *p;
                        self.pending.pop();
                        Some((p.index, p.kind))
                    }
                    _ => None,
                };
                if let Some((owner_index, _)) = owner {
                    self.tokens[owner_index].scope_opener = Some(index);
                }
                self.open.push(OpenEntry { index, kind, owner });
                if let Some(owner) = owner {
                    self.scopes.push(owner);
                }
            }
            TokenKind::CloseParen | TokenKind::CloseBracket | TokenKind::CloseBrace => {
                self.close_bracket(index, kind);
            }
            _ => {}
        }
    }

    fn close_bracket(&mut self, index: usize, kind: TokenKind) {
        let opener = match kind {
            TokenKind::CloseParen => TokenKind::OpenParen,
            TokenKind::CloseBracket => TokenKind::OpenBracket,
            _ => TokenKind::OpenBrace,
        };
        let Some(found) = self.open.iter().rposition(|entry| entry.kind == opener) else {
            return;
        };
        // Anything left open above the match is unbalanced; drop it.
        for entry in self.open.drain(found..) {
            if entry.owner.is_some() {
                self.scopes.pop();
            }
            if entry.kind == opener && entry.index != index {
                self.tokens[entry.index].matching = Some(index);
                self.tokens[index].matching = Some(entry.index);
            }
        }
        // Pending owners opened inside the closed group never got a body.
        let depth = self.open.len();
        while matches!(self.pending.last(), Some(p) if p.depth > depth) {
            self.pending.pop();
        }
        if kind == TokenKind::CloseBrace {
            self.tokens[index].conditions = self.scopes.clone();
        }
    }

    // ========================================================================
    // Inline HTML
    // ========================================================================

    fn lex_html(&mut self) {
        if self.starts_with("<?") {
            let len = if self.starts_with_ignore_case("<?php") {
                5
            } else if self.starts_with("<?=") {
                3
            } else {
                2
            };
            self.emit(TokenKind::OpenTag, len);
            self.in_php = true;
            return;
        }
        let rest = &self.src[self.pos..];
        let len = rest
            .windows(2)
            .position(|w| w == b"<?")
            .unwrap_or(rest.len());
        self.emit(TokenKind::InlineHtml, len);
    }

    // ========================================================================
    // PHP Code
    // ========================================================================

    fn lex_php(&mut self) {
        let Some(b) = self.peek(0) else {
            return;
        };

        if self.starts_with("?>") {
            self.emit(TokenKind::CloseTag, 2);
            self.in_php = false;
            return;
        }

        if b.is_ascii_whitespace() {
            let len = self.src[self.pos..]
                .iter()
                .take_while(|c| c.is_ascii_whitespace())
                .count();
            self.emit(TokenKind::Whitespace, len);
            return;
        }

        if self.starts_with("#[") {
            self.emit(TokenKind::OpenBracket, 2);
            return;
        }
        if b == b'#' || self.starts_with("//") {
            self.lex_line_comment();
            return;
        }
        if self.starts_with("/*") {
            self.lex_block_comment();
            return;
        }

        if b == b'$' && self.peek(1).is_some_and(is_ident_start) {
            let len = 1 + self.ident_len(self.pos + 1, false);
            self.emit(TokenKind::Variable, len);
            return;
        }

        if is_ident_start(b) || (b == b'\\' && self.peek(1).is_some_and(is_ident_start)) {
            self.lex_word();
            return;
        }

        if b.is_ascii_digit() {
            self.lex_number();
            return;
        }

        match b {
            b'\'' | b'"' | b'`' => {
                let len = self.quoted_len(b);
                self.emit(TokenKind::String, len);
                return;
            }
            b'<' if self.starts_with("<<<") => {
                if let Some(len) = self.heredoc_len() {
                    self.emit(TokenKind::Heredoc, len);
                    return;
                }
            }
            _ => {}
        }

        self.lex_operator();
    }

    fn ident_len(&self, start: usize, allow_namespace: bool) -> usize {
        let mut end = start;
        while end < self.src.len() {
            let c = self.src[end];
            if is_ident_char(c) {
                end += 1;
            } else if allow_namespace
                && c == b'\\'
                && self.src.get(end + 1).copied().is_some_and(is_ident_start)
            {
                end += 1;
            } else {
                break;
            }
        }
        end - start
    }

    fn lex_word(&mut self) {
        let len = self.ident_len(self.pos, true);
        let word = String::from_utf8_lossy(&self.src[self.pos..self.pos + len]).into_owned();

        let after_access = matches!(
            self.last_significant,
            Some(TokenKind::ObjectOperator) | Some(TokenKind::DoubleColon) | Some(TokenKind::Function)
        );
        let kind = if word.contains('\\') || after_access {
            TokenKind::Identifier
        } else {
            keyword_kind(&word).unwrap_or(TokenKind::Identifier)
        };
        self.emit(kind, len);
    }

    fn lex_number(&mut self) {
        let rest = &self.src[self.pos..];
        let mut len = 0;
        while len < rest.len() {
            let c = rest[len];
            if c.is_ascii_alphanumeric() || c == b'_' {
                len += 1;
            } else if c == b'.' && rest.get(len + 1).is_some_and(|d| d.is_ascii_digit()) {
                len += 1;
            } else {
                break;
            }
        }
        self.emit(TokenKind::Number, len);
    }

    fn lex_line_comment(&mut self) {
        let rest = &self.src[self.pos..];
        let mut len = 0;
        while len < rest.len() {
            if rest[len] == b'\n' || rest[len..].starts_with(b"?>") {
                break;
            }
            len += 1;
        }
        self.emit(TokenKind::Comment, len);
    }

    fn lex_block_comment(&mut self) {
        let rest = &self.src[self.pos..];
        let len = rest[2..]
            .windows(2)
            .position(|w| w == b"*/")
            .map(|p| p + 4)
            .unwrap_or(rest.len());
        let is_doc = rest.starts_with(b"/**") && len > 4;
        let kind = if is_doc {
            TokenKind::DocComment
        } else {
            TokenKind::Comment
        };
        self.emit(kind, len);
    }

    fn quoted_len(&self, quote: u8) -> usize {
        let rest = &self.src[self.pos..];
        let mut i = 1;
        while i < rest.len() {
            match rest[i] {
                b'\\' => i += 2,
                c if c == quote => return i + 1,
                _ => i += 1,
            }
        }
        rest.len()
    }

    /// Length of a heredoc or nowdoc starting at `<<<`, if well formed.
    fn heredoc_len(&self) -> Option<usize> {
        let rest = &self.src[self.pos..];
        let mut i = 3;
        while rest.get(i).is_some_and(|c| *c == b' ' || *c == b'\t') {
            i += 1;
        }
        let quote = match rest.get(i) {
            Some(b'\'') | Some(b'"') => {
                i += 1;
                Some(rest[i - 1])
            }
            _ => None,
        };
        let label_start = i;
        while rest.get(i).copied().is_some_and(is_ident_char) {
            i += 1;
        }
        if i == label_start {
            return None;
        }
        let label = &rest[label_start..i];
        if let Some(q) = quote {
            if rest.get(i) != Some(&q) {
                return None;
            }
            i += 1;
        }
        if rest.get(i) == Some(&b'\r') {
            i += 1;
        }
        if rest.get(i) != Some(&b'\n') {
            return None;
        }
        i += 1;

        // Each following line may close the heredoc: optional indentation,
        // the label, then a non-identifier byte.
        loop {
            let line_start = i;
            let mut j = line_start;
            while rest.get(j).is_some_and(|c| *c == b' ' || *c == b'\t') {
                j += 1;
            }
            if rest[j..].starts_with(label)
                && !rest.get(j + label.len()).copied().is_some_and(is_ident_char)
            {
                return Some(j + label.len());
            }
            match rest[line_start..].iter().position(|c| *c == b'\n') {
                Some(newline) => i = line_start + newline + 1,
                None => return Some(rest.len()),
            }
        }
    }

    fn lex_operator(&mut self) {
        for op in THREE_CHAR_OPS {
            if self.starts_with(op) {
                let kind = if *op == "?->" {
                    TokenKind::ObjectOperator
                } else {
                    TokenKind::Operator
                };
                self.emit(kind, 3);
                return;
            }
        }
        for op in TWO_CHAR_OPS {
            if self.starts_with(op) {
                let kind = match *op {
                    "->" => TokenKind::ObjectOperator,
                    "::" => TokenKind::DoubleColon,
                    _ => TokenKind::Operator,
                };
                self.emit(kind, 2);
                return;
            }
        }

        let kind = match self.src[self.pos] {
            b'=' => TokenKind::Equal,
            b'&' => TokenKind::Ampersand,
            b'.' => TokenKind::Concat,
            b';' => TokenKind::Semicolon,
            b',' => TokenKind::Comma,
            b'?' => TokenKind::Question,
            b':' => TokenKind::Colon,
            b'|' => TokenKind::Pipe,
            b'@' => TokenKind::At,
            b'(' => TokenKind::OpenParen,
            b')' => TokenKind::CloseParen,
            b'{' => TokenKind::OpenBrace,
            b'}' => TokenKind::CloseBrace,
            b'[' => TokenKind::OpenBracket,
            b']' => TokenKind::CloseBracket,
            _ => TokenKind::Operator,
        };
        // Keep multi-byte characters whole.
        let len = match self.src[self.pos] {
            b if b < 0x80 => 1,
            _ => self.src[self.pos..]
                .iter()
                .skip(1)
                .take_while(|c| (**c & 0xC0) == 0x80)
                .count()
                + 1,
        };
        self.emit(kind, len);
    }
}
