//! Type Resolution Engine.
//!
//! A [`Resolver`] answers "what class does this variable hold here?" for one
//! file, reading and writing the run's [`VariableTypeStore`]. It owns no
//! state of its own: the store, include tracker and class hierarchy are
//! borrowed for the lifetime of the resolver, so a fresh resolver per file
//! is cheap.
//!
//! Lookups fall back, in order, to:
//!
//! 1. the current file, in the reference's scope;
//! 2. files included by the current file (global scope only);
//! 3. for class-rooted names, the file declaring that class and then the
//!    files declaring its parents.
//!
//! A type found at any level that is itself a partial chain is resolved
//! again from the same position until it stops changing or the recursion
//! limit is hit.

use std::path::Path;

use tracing::trace;

use crate::classes::ClassHierarchy;
use crate::cursor::{declared_name, TokenCursor};
use crate::includes::IncludeTracker;
use crate::store::{StoreResult, VariableTypeStore, END_OF_FILE, GLOBAL_SCOPE};
use crate::token::{Token, TokenKind};
use crate::var_type::{root_variable, short_class_name, specificity, VarType, CALL_MARKER, MEMBER_SEPARATOR};

/// How many times a resolved type may be re-resolved.
pub const MAX_RESOLUTION_DEPTH: usize = 16;

/// Store key for a file.
pub fn file_key(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

/// Index of the first token of the member-access chain ending at `last`.
///
/// Walks back over `->`/`::` links, call argument lists and array indexes:
/// for `$a->b(1)[0]->c` ending at `c`, the result is the index of `$a`.
pub fn chain_start(tokens: &[Token], last: usize) -> usize {
    let Some(mut cursor) = TokenCursor::at(tokens, last) else {
        return last;
    };
    loop {
        let operand = cursor.skip_group_backward();
        let Some(prev) = operand.prev_significant() else {
            return operand.index();
        };
        if operand.index() != cursor.index() {
            // Argument list or index: keep going when it follows a callee.
            if is_chain_operand(prev.kind()) {
                cursor = prev;
                continue;
            }
            return operand.index();
        }
        if !is_chain_operand(operand.kind()) || !prev.kind().is_access() {
            return operand.index();
        }
        match prev.prev_significant() {
            Some(before) => cursor = before,
            None => return operand.index(),
        }
    }
}

fn is_chain_operand(kind: TokenKind) -> bool {
    matches!(
        kind,
        TokenKind::Variable
            | TokenKind::Identifier
            | TokenKind::Static
            | TokenKind::CloseParen
            | TokenKind::CloseBracket
    )
}

/// Index of the last significant token of the expression starting at `start`.
///
/// The expression ends before the first `;`, `,`, `=` or unbalanced closer
/// at its own nesting level.
pub fn expression_end(tokens: &[Token], start: usize) -> Option<usize> {
    let mut cursor = TokenCursor::at(tokens, start)?;
    let mut last = None;
    loop {
        if matches!(
            cursor.kind(),
            TokenKind::Semicolon
                | TokenKind::Comma
                | TokenKind::Equal
                | TokenKind::CloseParen
                | TokenKind::CloseBracket
                | TokenKind::CloseBrace
                | TokenKind::CloseTag
        ) {
            break;
        }
        last = Some(cursor.skip_group_forward().index());
        match cursor.step_over_forward() {
            Some(next) => cursor = next,
            None => break,
        }
    }
    last
}

/// Result of walking a chain: the accumulated type and whether the walk
/// consumed the whole span.
struct ChainWalk {
    text: String,
    complete: bool,
}

/// Per-file view of the run's type model.
#[derive(Debug, Clone, Copy)]
pub struct Resolver<'a> {
    store: &'a VariableTypeStore,
    includes: &'a IncludeTracker,
    classes: &'a ClassHierarchy,
    path: &'a Path,
    tokens: &'a [Token],
}

impl<'a> Resolver<'a> {
    pub fn new(
        store: &'a VariableTypeStore,
        includes: &'a IncludeTracker,
        classes: &'a ClassHierarchy,
        path: &'a Path,
        tokens: &'a [Token],
    ) -> Self {
        Resolver {
            store,
            includes,
            classes,
            path,
            tokens,
        }
    }

    pub fn path(&self) -> &'a Path {
        self.path
    }

    pub fn tokens(&self) -> &'a [Token] {
        self.tokens
    }

    pub fn classes(&self) -> &'a ClassHierarchy {
        self.classes
    }

    fn key(&self) -> String {
        file_key(self.path)
    }

    // ========================================================================
    // Scopes and self-references
    // ========================================================================

    /// The scope a reference to `name` at `index` belongs to.
    ///
    /// Class-qualified names and call markers of plain functions live in the
    /// global scope. A variable belongs to its innermost class, interface or
    /// function, unless it was declared `global` there.
    pub fn resolve_scope(&self, index: usize, name: &str) -> StoreResult<i64> {
        let bare = name.trim_start_matches(CALL_MARKER);
        if !bare.starts_with('$') {
            return Ok(GLOBAL_SCOPE);
        }
        let Some((owner, _)) = self.tokens.get(index).and_then(Token::binding_owner) else {
            return Ok(GLOBAL_SCOPE);
        };
        let owner = owner as i64;
        if self.store.is_global(root_variable(name), &self.key(), owner)? {
            return Ok(GLOBAL_SCOPE);
        }
        Ok(owner)
    }

    /// Name of the class enclosing `index`, if it has one.
    pub fn enclosing_class(&self, index: usize) -> Option<&'a str> {
        let owner = self.tokens.get(index)?.class_owner()?;
        declared_name(self.tokens, owner).map(short_class_name)
    }

    /// Replace a leading `$this`, `self`, `static` or `parent` with the class it denotes.
    fn normalize_root(&self, index: usize, name: &str) -> String {
        let bare = name.trim_start_matches(CALL_MARKER);
        let marker = &name[..name.len() - bare.len()];
        let root = root_variable(bare);
        let rest = &bare[root.len()..];
        let class = match root.to_ascii_lowercase().as_str() {
            "$this" | "self" | "static" => self.enclosing_class(index),
            "parent" => self
                .enclosing_class(index)
                .and_then(|class| self.classes.parent_class(class)),
            _ => None,
        };
        match class {
            Some(class) => format!("{}{}{}", marker, class, rest),
            None => name.to_string(),
        }
    }

    // ========================================================================
    // Lookup
    // ========================================================================

    /// Best-known type of `name` (default: the token's own text) at `index`.
    ///
    /// `None` when nothing is known, which is common and not an error.
    pub fn get_variable_type(&self, index: usize, name: Option<&str>) -> StoreResult<Option<String>> {
        let name = match name {
            Some(name) => name,
            None => match self.tokens.get(index) {
                Some(token) => token.content.as_str(),
                None => return Ok(None),
            },
        };
        self.type_at_depth(index, name, 0)
    }

    fn type_at_depth(&self, index: usize, name: &str, depth: usize) -> StoreResult<Option<String>> {
        if depth > MAX_RESOLUTION_DEPTH {
            return Ok(None);
        }
        let normalized = self.normalize_root(index, name);
        if normalized != name {
            if let Some(VarType::Class(class)) = VarType::parse(&normalized) {
                return Ok(Some(class));
            }
        }
        let Some(found) = self.lookup(index, &normalized)? else {
            return Ok(None);
        };
        if specificity(&found) == 0 {
            return Ok(Some(found));
        }
        let resolved = self.resolve_type(index, &found, depth + 1)?;
        trace!(name, found = %found, resolved = %resolved, "re-resolved partial type");
        Ok(Some(resolved))
    }

    /// Resolve each link of a stored partial type, left to right.
    fn resolve_type(&self, index: usize, ty: &str, depth: usize) -> StoreResult<String> {
        let Some(parsed) = VarType::parse(ty) else {
            return Ok(ty.to_string());
        };
        match parsed {
            VarType::Class(class) => Ok(class),
            VarType::Chain { base, members } => {
                let mut acc = self.type_at_depth(index, &base, depth)?.unwrap_or(base);
                for member in members {
                    acc = format!("{}{}{}", acc, MEMBER_SEPARATOR, member);
                    if let Some(resolved) = self.type_at_depth(index, &acc, depth)? {
                        acc = resolved;
                    }
                }
                Ok(acc)
            }
            VarType::Call(inner) => {
                let callee = self.resolve_type(index, &inner.to_string(), depth)?;
                let call = format!("{}{}", CALL_MARKER, callee.trim_start_matches(CALL_MARKER));
                Ok(self.type_at_depth(index, &call, depth)?.unwrap_or(call))
            }
        }
    }

    /// Raw lookup with file, include and class fallbacks; no re-resolution.
    fn lookup(&self, index: usize, name: &str) -> StoreResult<Option<String>> {
        let key = self.key();
        let scope = self.resolve_scope(index, name)?;
        if let Some(ty) = self.store.lookup_type(name, &key, scope, index as i64)? {
            return Ok(Some(ty));
        }
        if scope != GLOBAL_SCOPE {
            return Ok(None);
        }
        for included in self.includes.included_files(self.path) {
            if let Some(ty) =
                self.store
                    .lookup_type(name, &file_key(included), GLOBAL_SCOPE, END_OF_FILE)?
            {
                return Ok(Some(ty));
            }
        }

        let bare = name.trim_start_matches(CALL_MARKER);
        if bare.starts_with('$') {
            return Ok(None);
        }
        let marker = &name[..name.len() - bare.len()];
        let root = root_variable(bare);
        let rest = &bare[root.len()..];
        if rest.is_empty() {
            return Ok(None);
        }
        let candidates = std::iter::once(root.to_string()).chain(self.classes.ancestors(root));
        for (depth, class) in candidates.enumerate() {
            let qualified = format!("{}{}{}", marker, class, rest);
            if depth > 0 {
                if let Some(ty) = self.store.lookup_type(&qualified, &key, GLOBAL_SCOPE, END_OF_FILE)? {
                    return Ok(Some(ty));
                }
            }
            if let Some(file) = self.classes.declaring_file(&class) {
                if file == self.path {
                    continue;
                }
                if let Some(ty) =
                    self.store
                        .lookup_type(&qualified, &file_key(file), GLOBAL_SCOPE, END_OF_FILE)?
                {
                    return Ok(Some(ty));
                }
            }
        }
        Ok(None)
    }

    // ========================================================================
    // Recording
    // ========================================================================

    /// Record that `name` (default: the token's text) holds `ty` from `index` on.
    ///
    /// `scope` overrides the scope computed from the token, for parameters
    /// whose binding belongs to a function body they sit outside of. When the
    /// binding lives directly in a class body it is stored under the
    /// class-qualified member name (`Class->member`) in the global scope.
    ///
    /// A binding already at this site with an equal or better specificity is
    /// kept, and a binding of a name to itself is never written.
    pub fn set_variable_type(
        &self,
        index: usize,
        ty: &str,
        name: Option<&str>,
        scope: Option<i64>,
    ) -> StoreResult<()> {
        let name = match name {
            Some(name) => name,
            None => match self.tokens.get(index) {
                Some(token) => token.content.as_str(),
                None => return Ok(()),
            },
        };

        let member_of = match scope {
            Some(GLOBAL_SCOPE) => None,
            Some(owner) => self.class_like_name(owner as usize),
            None => self
                .tokens
                .get(index)
                .and_then(Token::binding_owner)
                .filter(|(_, kind)| kind.is_class_like())
                .and_then(|(owner, _)| self.class_like_name(owner)),
        };

        let (name, scope) = match member_of {
            Some(class) => {
                let marker = if name.starts_with(CALL_MARKER) { "*" } else { "" };
                let member = name.trim_start_matches(CALL_MARKER).trim_start_matches('$');
                (
                    format!("{}{}{}{}", marker, class, MEMBER_SEPARATOR, member),
                    GLOBAL_SCOPE,
                )
            }
            None => {
                let name = self.normalize_root(index, name);
                let scope = if name.trim_start_matches(CALL_MARKER).starts_with('$') {
                    match scope {
                        Some(scope) => scope,
                        None => self.resolve_scope(index, &name)?,
                    }
                } else {
                    GLOBAL_SCOPE
                };
                (name, scope)
            }
        };

        if name == ty {
            return Ok(());
        }
        let key = self.key();
        let position = index as i64;
        if let Some(existing) = self.store.check_existing(&key, position)? {
            if specificity(&existing) <= specificity(ty) {
                return Ok(());
            }
        }
        self.store
            .record_variable_type(&name, ty, &key, scope, position)
    }

    /// Mark the variable at `index` as referring to the global binding within
    /// its enclosing function.
    pub fn set_global(&self, index: usize) -> StoreResult<()> {
        let Some(token) = self.tokens.get(index) else {
            return Ok(());
        };
        let Some((owner, _)) = token.binding_owner() else {
            return Ok(());
        };
        self.store
            .record_global(&token.content, &self.key(), owner as i64, index as i64)
    }

    fn class_like_name(&self, owner: usize) -> Option<&'a str> {
        let token = self.tokens.get(owner)?;
        if !matches!(
            token.kind,
            TokenKind::Class | TokenKind::Interface | TokenKind::Trait
        ) {
            return None;
        }
        declared_name(self.tokens, owner).map(short_class_name)
    }

    // ========================================================================
    // Chains and expressions
    // ========================================================================

    /// Resolve the chain spanning `start..=end` as far as possible.
    ///
    /// Resolution is incremental: after each link the accumulated text is
    /// looked up and, when known, replaced by its type. Unresolvable
    /// prefixes stay verbatim, e.g. `Foo->unknown->property`.
    pub fn resolve_full_variable_chain(&self, start: usize, end: usize) -> StoreResult<String> {
        Ok(self.walk_chain(start, end, true)?.text)
    }

    /// The name an assignment target spanning `start..=end` binds.
    ///
    /// Like [`resolve_full_variable_chain`](Self::resolve_full_variable_chain)
    /// except that the final link is never looked up: `$this->x` becomes
    /// `Foo->x`, not the type of `Foo->x`.
    pub fn resolve_variable_name(&self, start: usize, end: usize) -> StoreResult<String> {
        Ok(self.walk_chain(start, end, false)?.text)
    }

    fn walk_chain(&self, start: usize, end: usize, resolve_last: bool) -> StoreResult<ChainWalk> {
        let end = end.min(self.tokens.len().saturating_sub(1));
        let last = (start..=end)
            .rev()
            .find(|&i| !self.tokens[i].kind.is_trivia())
            .unwrap_or(start);

        let mut acc = String::new();
        let mut after_access = false;
        let mut index = start;
        while index <= end {
            let token = &self.tokens[index];
            match token.kind {
                kind if kind.is_trivia() => {}
                TokenKind::ObjectOperator | TokenKind::DoubleColon => {
                    acc.push_str(MEMBER_SEPARATOR);
                    after_access = true;
                }
                TokenKind::Variable | TokenKind::Identifier | TokenKind::Static => {
                    let text = if after_access {
                        token.content.trim_start_matches('$')
                    } else if token.kind == TokenKind::Identifier {
                        short_class_name(&token.content)
                    } else {
                        &token.content
                    };
                    acc.push_str(text);
                    after_access = false;
                    if resolve_last || index != last {
                        if let Some(ty) = self.get_variable_type(start, Some(&acc))? {
                            acc = ty;
                        }
                    }
                }
                TokenKind::OpenParen if acc.is_empty() => {
                    // A parenthesized expression such as `(new Foo())`.
                    let Some(close) = token.matching else {
                        return Ok(ChainWalk { text: acc, complete: false });
                    };
                    let inner = match self.next_significant_between(index + 1, close) {
                        Some(first) => expression_end(self.tokens, first)
                            .map(|last| self.expression_type(first, last))
                            .transpose()?
                            .flatten(),
                        None => None,
                    };
                    let Some(inner) = inner else {
                        return Ok(ChainWalk { text: acc, complete: false });
                    };
                    acc = inner;
                    index = close;
                }
                TokenKind::OpenParen => {
                    if !acc.starts_with(CALL_MARKER) {
                        acc.insert(0, CALL_MARKER);
                    }
                    if let Some(ty) = self.get_variable_type(start, Some(&acc))? {
                        acc = ty;
                    }
                    match token.matching {
                        Some(close) => index = close,
                        None => return Ok(ChainWalk { text: acc, complete: false }),
                    }
                }
                TokenKind::OpenBracket if !acc.is_empty() => {
                    // Element types are unknown; poison the chain.
                    acc.push_str("[]");
                    match token.matching {
                        Some(close) => index = close,
                        None => return Ok(ChainWalk { text: acc, complete: false }),
                    }
                }
                _ => return Ok(ChainWalk { text: acc, complete: false }),
            }
            index += 1;
        }
        Ok(ChainWalk {
            text: acc,
            complete: true,
        })
    }

    fn next_significant_between(&self, from: usize, until: usize) -> Option<usize> {
        (from..until).find(|&i| !self.tokens[i].kind.is_trivia())
    }

    /// Type of the expression spanning `start..=end`.
    ///
    /// Understands `new Class(...)`, `new self`/`new static`, `clone expr`,
    /// parenthesized expressions and member-access chains. Literals,
    /// operators and bare constants have no class type.
    pub fn expression_type(&self, start: usize, end: usize) -> StoreResult<Option<String>> {
        let Some(mut cursor) = TokenCursor::at(self.tokens, start) else {
            return Ok(None);
        };
        if cursor.kind().is_trivia() {
            match cursor.next_significant() {
                Some(next) => cursor = next,
                None => return Ok(None),
            }
        }
        while matches!(cursor.kind(), TokenKind::At | TokenKind::Ampersand) {
            match cursor.next_significant() {
                Some(next) if next.index() <= end => cursor = next,
                _ => return Ok(None),
            }
        }

        match cursor.kind() {
            TokenKind::New => {
                let Some(class) = cursor.next_significant().filter(|c| c.index() <= end) else {
                    return Ok(None);
                };
                match class.kind() {
                    TokenKind::Identifier | TokenKind::Static => {
                        let name = self.normalize_root(class.index(), class.content());
                        Ok(Some(short_class_name(&name).to_string()))
                    }
                    _ => Ok(None),
                }
            }
            TokenKind::Clone => match cursor.next_significant() {
                Some(operand) if operand.index() <= end => self.expression_type(operand.index(), end),
                _ => Ok(None),
            },
            TokenKind::Variable
            | TokenKind::Identifier
            | TokenKind::Static
            | TokenKind::OpenParen => {
                let walk = self.walk_chain(cursor.index(), end, true)?;
                if !walk.complete || walk.text.is_empty() {
                    return Ok(None);
                }
                let lone_constant = cursor.is(TokenKind::Identifier)
                    && self.next_significant_between(cursor.index() + 1, end + 1).is_none();
                if lone_constant {
                    return Ok(None);
                }
                Ok(Some(walk.text))
            }
            _ => Ok(None),
        }
    }

    /// Type assigned by the `=` at `equal`, following chained assignments
    /// such as `$a = $b = new Foo()`.
    pub fn assigned_type(&self, equal: usize) -> StoreResult<Option<String>> {
        let mut equal = equal;
        for _ in 0..MAX_RESOLUTION_DEPTH {
            let Some(start) = TokenCursor::at(self.tokens, equal).and_then(|c| c.next_significant()) else {
                return Ok(None);
            };
            let Some(end) = expression_end(self.tokens, start.index()) else {
                return Ok(None);
            };
            let follows = TokenCursor::at(self.tokens, end).and_then(|c| c.next_significant());
            match follows {
                Some(next) if next.is(TokenKind::Equal) => equal = next.index(),
                _ => return self.expression_type(start.index(), end),
            }
        }
        Ok(None)
    }

    /// Type of the receiver whose last token is `last`, e.g. `$a->b` in `$a->b->c()`.
    pub fn receiver_type(&self, last: usize) -> StoreResult<Option<String>> {
        let start = chain_start(self.tokens, last);
        self.expression_type(start, last)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;
    use std::path::PathBuf;

    struct Fixture {
        store: VariableTypeStore,
        includes: IncludeTracker,
        classes: ClassHierarchy,
        path: PathBuf,
        tokens: Vec<Token>,
    }

    impl Fixture {
        fn new(source: &str) -> Self {
            let path = PathBuf::from("/p/main.php");
            let tokens = tokenize(source.as_bytes());
            let mut classes = ClassHierarchy::new();
            classes.record_file(&path, &tokens);
            let mut includes = IncludeTracker::new();
            includes.record_file(&path, &tokens);
            Fixture {
                store: VariableTypeStore::open_in_memory().unwrap(),
                includes,
                classes,
                path,
                tokens,
            }
        }

        fn resolver(&self) -> Resolver<'_> {
            Resolver::new(&self.store, &self.includes, &self.classes, &self.path, &self.tokens)
        }

        fn nth(&self, content: &str, n: usize) -> usize {
            self.tokens
                .iter()
                .enumerate()
                .filter(|(_, t)| t.content == content)
                .nth(n)
                .map(|(i, _)| i)
                .unwrap()
        }

        fn find(&self, content: &str) -> usize {
            self.nth(content, 0)
        }
    }

    mod scope_tests {
        use super::*;

        #[test]
        fn top_level_variables_are_global() {
            let fx = Fixture::new("<?php $a = 1;");
            assert_eq!(fx.resolver().resolve_scope(fx.find("$a"), "$a").unwrap(), 0);
        }

        #[test]
        fn function_variables_belong_to_the_function() {
            let fx = Fixture::new("<?php function f() { if (1) { $a = 1; } }");
            let function = fx.find("function");
            let a = fx.find("$a");
            assert_eq!(fx.resolver().resolve_scope(a, "$a").unwrap(), function as i64);
        }

        #[test]
        fn class_qualified_names_are_global() {
            let fx = Fixture::new("<?php function f() { $a = 1; }");
            let a = fx.find("$a");
            assert_eq!(fx.resolver().resolve_scope(a, "Foo->bar").unwrap(), 0);
            assert_eq!(fx.resolver().resolve_scope(a, "*make").unwrap(), 0);
        }

        #[test]
        fn global_declarations_redirect_to_global_scope() {
            let fx = Fixture::new("<?php function f() { global $a; $a->x(); }");
            let resolver = fx.resolver();
            resolver.set_global(fx.find("$a")).unwrap();
            let use_site = fx.nth("$a", 1);
            assert_eq!(resolver.resolve_scope(use_site, "$a").unwrap(), 0);
            assert_eq!(resolver.resolve_scope(use_site, "$a->x").unwrap(), 0);
        }
    }

    mod lookup_tests {
        use super::*;

        #[test]
        fn this_is_the_enclosing_class() {
            let fx = Fixture::new("<?php class Foo { function f() { $this->x(); } }");
            let this = fx.find("$this");
            assert_eq!(
                fx.resolver().get_variable_type(this, None).unwrap().as_deref(),
                Some("Foo")
            );
        }

        #[test]
        fn this_outside_a_class_is_unknown() {
            let fx = Fixture::new("<?php $this->x();");
            assert_eq!(fx.resolver().get_variable_type(fx.find("$this"), None).unwrap(), None);
        }

        #[test]
        fn parent_is_the_parent_class() {
            let fx = Fixture::new(
                "<?php class Base {} class Child extends Base { function f() { parent::f(); } }",
            );
            let parent = fx.find("parent");
            assert_eq!(
                fx.resolver().get_variable_type(parent, None).unwrap().as_deref(),
                Some("Base")
            );
        }

        #[test]
        fn partial_types_are_re_resolved() {
            let fx = Fixture::new("<?php $a = $b; $b = x(); $a->go();");
            let resolver = fx.resolver();
            let a = fx.find("$a");
            resolver.set_variable_type(a, "$b", None, None).unwrap();
            resolver
                .set_variable_type(fx.nth("$b", 1), "Bar->baz", None, None)
                .unwrap();
            fx.store.record_variable_type("Bar->baz", "Actual", "/p/other.php", 0, 1).unwrap();
            let use_site = fx.nth("$a", 1);
            // Without a binding for Bar->baz in reach, the chain stays partial.
            assert_eq!(
                resolver.get_variable_type(use_site, None).unwrap().as_deref(),
                Some("Bar->baz")
            );
            fx.store.record_variable_type("Bar->baz", "Actual", "/p/main.php", 0, 1000).unwrap();
            assert_eq!(
                resolver.get_variable_type(use_site, None).unwrap().as_deref(),
                Some("Actual")
            );
        }

        #[test]
        fn cyclic_bindings_terminate() {
            let fx = Fixture::new("<?php $a = $b; $b = $a; $a->go();");
            let resolver = fx.resolver();
            resolver.set_variable_type(fx.find("$a"), "$b", None, None).unwrap();
            resolver.set_variable_type(fx.find("$b"), "$a", None, None).unwrap();
            let use_site = fx.nth("$a", 2);
            assert!(resolver.get_variable_type(use_site, None).is_ok());
        }

        #[test]
        fn member_falls_back_to_parent_class() {
            let fx = Fixture::new("<?php class Base {} class Child extends Base {} $c->p;");
            fx.store.record_variable_type("Base->p", "Thing", "/p/main.php", 0, 1).unwrap();
            let c = fx.find("$c");
            assert_eq!(
                fx.resolver().get_variable_type(c, Some("Child->p")).unwrap().as_deref(),
                Some("Thing")
            );
        }

        #[test]
        fn included_files_are_searched() {
            let fx = Fixture::new("<?php include 'lib.php'; $f->go();");
            fx.store.record_variable_type("$f", "Foo", "/p/lib.php", 0, 40).unwrap();
            let f = fx.find("$f");
            assert_eq!(
                fx.resolver().get_variable_type(f, None).unwrap().as_deref(),
                Some("Foo")
            );
        }
    }

    mod set_tests {
        use super::*;

        #[test]
        fn class_level_bindings_are_qualified() {
            let fx = Fixture::new("<?php class Foo { private $bar; }");
            let bar = fx.find("$bar");
            fx.resolver().set_variable_type(bar, "Baz", None, None).unwrap();
            assert_eq!(
                fx.store.lookup_type("Foo->bar", "/p/main.php", 0, 100).unwrap().as_deref(),
                Some("Baz")
            );
        }

        #[test]
        fn this_members_are_qualified() {
            let fx = Fixture::new("<?php class Foo { function f() { $this->bar = 1; } }");
            let bar = fx.find("bar");
            let this = fx.find("$this");
            let resolver = fx.resolver();
            let name = resolver.resolve_variable_name(this, bar).unwrap();
            assert_eq!(name, "Foo->bar");
            resolver.set_variable_type(bar, "Baz", Some(&name), None).unwrap();
            assert_eq!(
                fx.store.lookup_type("Foo->bar", "/p/main.php", 0, 100).unwrap().as_deref(),
                Some("Baz")
            );
        }

        #[test]
        fn less_specific_types_never_replace_better_ones() {
            let fx = Fixture::new("<?php $a = 1;");
            let a = fx.find("$a");
            let resolver = fx.resolver();
            resolver.set_variable_type(a, "Foo", None, None).unwrap();
            resolver.set_variable_type(a, "$b->c", None, None).unwrap();
            resolver.set_variable_type(a, "Bar", None, None).unwrap();
            assert_eq!(fx.store.check_existing("/p/main.php", a as i64).unwrap().as_deref(), Some("Foo"));
        }

        #[test]
        fn more_specific_types_replace_partial_ones() {
            let fx = Fixture::new("<?php $a = 1;");
            let a = fx.find("$a");
            let resolver = fx.resolver();
            resolver.set_variable_type(a, "$b", None, None).unwrap();
            resolver.set_variable_type(a, "Foo", None, None).unwrap();
            assert_eq!(fx.store.check_existing("/p/main.php", a as i64).unwrap().as_deref(), Some("Foo"));
        }

        #[test]
        fn self_bindings_are_skipped() {
            let fx = Fixture::new("<?php $a = 1;");
            fx.resolver().set_variable_type(fx.find("$a"), "$a", None, None).unwrap();
            assert_eq!(fx.store.binding_count().unwrap(), 0);
        }
    }

    mod chain_tests {
        use super::*;

        #[test]
        fn resolves_incrementally_through_calls() {
            let fx = Fixture::new("<?php $obj->method()->prop;");
            let resolver = fx.resolver();
            let obj = fx.find("$obj");
            resolver.set_variable_type(obj, "Foo", None, None).unwrap();
            fx.store.record_variable_type("*Foo->method", "Bar", "/p/main.php", 0, 0).unwrap();
            let end = fx.find("prop");
            assert_eq!(resolver.resolve_full_variable_chain(obj, end).unwrap(), "Bar->prop");
        }

        #[test]
        fn unresolved_links_stay_verbatim() {
            let fx = Fixture::new("<?php $foo->unknownVar->property;");
            let resolver = fx.resolver();
            let foo = fx.find("$foo");
            resolver.set_variable_type(foo, "Foo", None, None).unwrap();
            let end = fx.find("property");
            assert_eq!(
                resolver.resolve_full_variable_chain(foo, end).unwrap(),
                "Foo->unknownVar->property"
            );
        }

        #[test]
        fn static_access_uses_member_separator() {
            let fx = Fixture::new("<?php Foo::make();");
            let resolver = fx.resolver();
            let start = fx.find("Foo");
            let close = fx.find(")");
            assert_eq!(resolver.resolve_full_variable_chain(start, close).unwrap(), "*Foo->make");
        }

        #[test]
        fn chain_start_walks_back_over_calls_and_indexes() {
            let fx = Fixture::new("<?php $x = $a->b(1)[0]->c;");
            assert_eq!(chain_start(&fx.tokens, fx.find("c")), fx.find("$a"));
            assert_eq!(chain_start(&fx.tokens, fx.find("$x")), fx.find("$x"));
        }
    }

    mod expression_tests {
        use super::*;

        #[test]
        fn new_and_clone() {
            let fx = Fixture::new("<?php class Foo { function f() { $a = new Bar(1); $b = clone $a; $c = new static; } }");
            let resolver = fx.resolver();
            let a = fx.find("$a");
            assert_eq!(resolver.assigned_type(fx.find("=")).unwrap().as_deref(), Some("Bar"));
            resolver.set_variable_type(a, "Bar", None, None).unwrap();
            assert_eq!(resolver.assigned_type(fx.nth("=", 1)).unwrap().as_deref(), Some("Bar"));
            assert_eq!(resolver.assigned_type(fx.nth("=", 2)).unwrap().as_deref(), Some("Foo"));
        }

        #[test]
        fn chained_assignment_takes_innermost_value() {
            let fx = Fixture::new("<?php $a = $b = new Foo();");
            assert_eq!(fx.resolver().assigned_type(fx.find("=")).unwrap().as_deref(), Some("Foo"));
        }

        #[test]
        fn literals_and_operators_have_no_type() {
            let fx = Fixture::new("<?php $a = 1; $b = $c + 1; $d = null; $e = FOO;");
            let resolver = fx.resolver();
            for n in 0..4 {
                assert_eq!(resolver.assigned_type(fx.nth("=", n)).unwrap(), None);
            }
        }

        #[test]
        fn parenthesized_new_as_receiver() {
            let fx = Fixture::new("<?php (new Foo())->bar();");
            let arrow = fx.find("->");
            assert_eq!(fx.resolver().receiver_type(arrow - 1).unwrap().as_deref(), Some("Foo"));
        }
    }
}
