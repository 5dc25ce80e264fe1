//! Type tracking from code: assignments, `global` declarations, parameter,
//! return and property type declarations, and `catch` variables.

use crate::cursor::TokenCursor;
use crate::ops::SniffContext;
use crate::resolver::chain_start;
use crate::store::StoreResult;
use crate::token::{Token, TokenKind};
use crate::var_type::{class_from_declared_type, CALL_MARKER};

// ============================================================================
// Shared helpers
// ============================================================================

/// A parameter in a function's parameter list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parameter {
    /// Index of the `$name` token.
    pub variable: usize,
    /// Declared type text, e.g. `?Foo` or `Foo|Bar`; empty when untyped.
    pub declared: String,
    /// Index of a constructor-promotion modifier, if present.
    pub promoted: Option<usize>,
}

/// Bounds `(open, close)` of the parameter list of the function at `function`.
pub fn parameter_list(tokens: &[Token], function: usize) -> Option<(usize, usize)> {
    let open = TokenCursor::at(tokens, function)?
        .find_next_before(&[TokenKind::OpenParen], &[TokenKind::OpenBrace, TokenKind::Semicolon])?;
    Some((open.index(), open.matching()?.index()))
}

/// Parameters between the parentheses at `open` and `close`.
pub fn parameters(tokens: &[Token], open: usize, close: usize) -> Vec<Parameter> {
    let mut params = Vec::new();
    let mut declared = String::new();
    let mut variable = None;
    let mut promoted = None;
    let mut index = open + 1;
    while index < close {
        let token = &tokens[index];
        match token.kind {
            TokenKind::Comma => {
                if let Some(variable) = variable.take() {
                    params.push(Parameter {
                        variable,
                        declared: std::mem::take(&mut declared),
                        promoted: promoted.take(),
                    });
                }
                declared.clear();
                promoted = None;
            }
            kind if kind.is_opener() => {
                // Attributes and default values.
                index = token.matching.unwrap_or(index);
            }
            TokenKind::Variable if variable.is_none() => variable = Some(index),
            TokenKind::Public | TokenKind::Protected | TokenKind::Private | TokenKind::Readonly
                if variable.is_none() =>
            {
                promoted.get_or_insert(index);
            }
            TokenKind::Identifier | TokenKind::Static | TokenKind::Question | TokenKind::Pipe
                if variable.is_none() =>
            {
                declared.push_str(&token.content);
            }
            _ => {}
        }
        index += 1;
    }
    if let Some(variable) = variable {
        params.push(Parameter {
            variable,
            declared,
            promoted,
        });
    }
    params
}

/// Index of the name of the function at `function`; `None` for closures.
pub fn function_name(tokens: &[Token], function: usize) -> Option<usize> {
    let mut cursor = TokenCursor::at(tokens, function)?.next_significant()?;
    if cursor.is(TokenKind::Ampersand) {
        cursor = cursor.next_significant()?;
    }
    cursor.is(TokenKind::Identifier).then(|| cursor.index())
}

/// Class named by a declared type, with `self`, `static` and `parent`
/// resolved relative to `index`.
pub fn declared_class(ctx: &SniffContext<'_>, index: usize, declared: &str) -> Option<String> {
    let class = class_from_declared_type(declared)?;
    match class.to_ascii_lowercase().as_str() {
        "self" | "static" => ctx.resolver.enclosing_class(index).map(str::to_string),
        "parent" => {
            let current = ctx.resolver.enclosing_class(index)?;
            ctx.classes.parent_class(current).map(str::to_string)
        }
        _ => Some(class),
    }
}

/// Innermost unclosed `(` before `index` within the current statement.
fn enclosing_paren(tokens: &[Token], index: usize) -> Option<usize> {
    let mut cursor = TokenCursor::at(tokens, index)?.prev()?;
    loop {
        match cursor.kind() {
            TokenKind::OpenParen => return Some(cursor.index()),
            TokenKind::Semicolon | TokenKind::OpenBrace => return None,
            _ => {}
        }
        cursor = cursor.skip_group_backward().prev()?;
    }
}

/// Whether the `(` at `open` starts a function's parameter list.
fn is_parameter_list(tokens: &[Token], open: usize) -> bool {
    let Some(prev) = TokenCursor::at(tokens, open).and_then(|c| c.prev_significant()) else {
        return false;
    };
    match prev.kind() {
        TokenKind::Function => true,
        TokenKind::Keyword => prev.content().eq_ignore_ascii_case("fn"),
        TokenKind::Identifier => prev
            .prev_significant()
            .map(|before| {
                let before = if before.is(TokenKind::Ampersand) {
                    before.prev_significant()
                } else {
                    Some(before)
                };
                before.is_some_and(|b| b.is(TokenKind::Function))
            })
            .unwrap_or(false),
        _ => false,
    }
}

// ============================================================================
// Assignments
// ============================================================================

/// `$x = <expr>`: bind the assignment target to the expression's type.
pub fn process_assignment(ctx: &SniffContext<'_>, index: usize) -> StoreResult<()> {
    let tokens = ctx.tokens;
    let Some(target) = TokenCursor::at(tokens, index).and_then(|c| c.prev_significant()) else {
        return Ok(());
    };
    let is_target = match target.kind() {
        TokenKind::Variable => true,
        TokenKind::Identifier => target
            .prev_significant()
            .is_some_and(|p| p.kind().is_access()),
        _ => false,
    };
    if !is_target {
        return Ok(());
    }
    if enclosing_paren(tokens, index).is_some_and(|open| is_parameter_list(tokens, open)) {
        // Parameter defaults are handled with the declaration.
        return Ok(());
    }

    let Some(ty) = ctx.resolver.assigned_type(index)? else {
        return Ok(());
    };
    let start = chain_start(tokens, target.index());
    let name = ctx.resolver.resolve_variable_name(start, target.index())?;
    if name.is_empty() || name.contains("[]") {
        return Ok(());
    }
    ctx.resolver
        .set_variable_type(target.index(), &ty, Some(&name), None)
}

// ============================================================================
// Globals
// ============================================================================

/// `global $a, $b;`
pub fn process_global(ctx: &SniffContext<'_>, index: usize) -> StoreResult<()> {
    let mut cursor = TokenCursor::at(ctx.tokens, index).and_then(|c| c.next_significant());
    while let Some(c) = cursor {
        match c.kind() {
            TokenKind::Variable => ctx.resolver.set_global(c.index())?,
            TokenKind::Comma => {}
            _ => break,
        }
        cursor = c.next_significant();
    }
    Ok(())
}

// ============================================================================
// Declarations
// ============================================================================

/// Dispatch on the declaration keyword at `index`.
pub fn process_declaration(ctx: &SniffContext<'_>, index: usize) -> StoreResult<()> {
    match ctx.tokens[index].kind {
        TokenKind::Function => process_function(ctx, index),
        TokenKind::Catch => process_catch(ctx, index),
        kind if kind.is_modifier() => process_property(ctx, index),
        _ => Ok(()),
    }
}

/// Parameter hints, promoted constructor parameters and the return type.
fn process_function(ctx: &SniffContext<'_>, function: usize) -> StoreResult<()> {
    let tokens = ctx.tokens;
    let Some((open, close)) = parameter_list(tokens, function) else {
        return Ok(());
    };
    let has_body = tokens[function].scope_opener.is_some();
    let class_owner = tokens[function]
        .binding_owner()
        .filter(|(_, kind)| kind.is_class_like())
        .map(|(owner, _)| owner as i64);

    for param in parameters(tokens, open, close) {
        let Some(class) = declared_class(ctx, function, &param.declared) else {
            continue;
        };
        let name = tokens[param.variable].content.as_str();
        if let (Some(modifier), Some(owner)) = (param.promoted, class_owner) {
            ctx.resolver
                .set_variable_type(modifier, &class, Some(name), Some(owner))?;
        }
        if has_body {
            ctx.resolver
                .set_variable_type(param.variable, &class, Some(name), Some(function as i64))?;
        }
    }

    let Some(name_index) = function_name(tokens, function) else {
        return Ok(());
    };
    let Some(declared) = return_type(tokens, close) else {
        return Ok(());
    };
    let Some(class) = declared_class(ctx, function, &declared) else {
        return Ok(());
    };
    let call_name = format!("{}{}", CALL_MARKER, tokens[name_index].content);
    ctx.resolver
        .set_variable_type(name_index, &class, Some(&call_name), None)
}

/// Declared return type text after the parameter list closing at `close`.
fn return_type(tokens: &[Token], close: usize) -> Option<String> {
    let colon = TokenCursor::at(tokens, close)?.next_significant()?;
    if !colon.is(TokenKind::Colon) {
        return None;
    }
    let mut declared = String::new();
    let mut cursor = colon.next_significant();
    while let Some(c) = cursor {
        match c.kind() {
            TokenKind::Identifier | TokenKind::Static | TokenKind::Question | TokenKind::Pipe => {
                declared.push_str(c.content())
            }
            _ => break,
        }
        cursor = c.next_significant();
    }
    (!declared.is_empty()).then_some(declared)
}

/// `catch (Foo|Bar $e)`
fn process_catch(ctx: &SniffContext<'_>, index: usize) -> StoreResult<()> {
    let tokens = ctx.tokens;
    let Some(open) = TokenCursor::at(tokens, index).and_then(|c| c.next_significant()) else {
        return Ok(());
    };
    let Some(close) = open.is(TokenKind::OpenParen).then(|| open.matching()).flatten() else {
        return Ok(());
    };
    let mut declared = String::new();
    for position in open.index() + 1..close.index() {
        let token = &tokens[position];
        match token.kind {
            TokenKind::Identifier | TokenKind::Pipe => declared.push_str(&token.content),
            TokenKind::Variable => {
                let Some(class) = declared_class(ctx, position, &declared) else {
                    return Ok(());
                };
                return ctx.resolver.set_variable_type(position, &class, None, None);
            }
            _ => {}
        }
    }
    Ok(())
}

/// Typed property declarations: `private ?Foo $foo;`
fn process_property(ctx: &SniffContext<'_>, index: usize) -> StoreResult<()> {
    let tokens = ctx.tokens;
    if !tokens[index].at_class_level() || enclosing_paren(tokens, index).is_some() {
        // Promoted constructor parameters are handled with the function.
        return Ok(());
    }
    let Some(first) = TokenCursor::at(tokens, index) else {
        return Ok(());
    };
    if first
        .prev_significant()
        .is_some_and(|p| p.kind().is_modifier())
    {
        return Ok(());
    }

    let mut declared = String::new();
    let mut cursor = first.next_significant();
    while let Some(c) = cursor {
        match c.kind() {
            kind if kind.is_modifier() => {}
            TokenKind::Identifier | TokenKind::Question | TokenKind::Pipe => {
                declared.push_str(c.content())
            }
            TokenKind::Variable => {
                let Some(class) = declared_class(ctx, c.index(), &declared) else {
                    return Ok(());
                };
                return ctx.resolver.set_variable_type(c.index(), &class, None, None);
            }
            _ => return Ok(()),
        }
        cursor = c.next_significant();
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classes::ClassHierarchy;
    use crate::includes::IncludeTracker;
    use crate::lexer::tokenize;
    use crate::ops::Sniff;
    use crate::resolver::Resolver;
    use crate::store::VariableTypeStore;
    use phpshift_core::registry::ChangeRegistry;
    use std::path::PathBuf;

    struct Tracked {
        store: VariableTypeStore,
        includes: IncludeTracker,
        classes: ClassHierarchy,
        path: PathBuf,
        tokens: Vec<Token>,
    }

    impl Tracked {
        /// Run the tracking sniffs over `source` twice, as the scanner does.
        fn new(source: &str) -> Self {
            let path = PathBuf::from("/p/main.php");
            let tokens = tokenize(source.as_bytes());
            let mut classes = ClassHierarchy::new();
            classes.record_file(&path, &tokens);
            let tracked = Tracked {
                store: VariableTypeStore::open_in_memory().unwrap(),
                includes: IncludeTracker::new(),
                classes,
                path,
                tokens,
            };
            let sniffs = Sniff::tracking();
            let mut changes = ChangeRegistry::new();
            for _ in 0..2 {
                let ctx = SniffContext::new(tracked.resolver());
                for index in 0..tracked.tokens.len() {
                    for sniff in &sniffs {
                        if sniff.registers().contains(&tracked.tokens[index].kind) {
                            sniff.process(&ctx, index, &mut changes).unwrap();
                        }
                    }
                }
            }
            tracked
        }

        fn resolver(&self) -> Resolver<'_> {
            Resolver::new(&self.store, &self.includes, &self.classes, &self.path, &self.tokens)
        }

        fn type_of(&self, content: &str, nth: usize) -> Option<String> {
            let index = self
                .tokens
                .iter()
                .enumerate()
                .filter(|(_, t)| t.content == content)
                .nth(nth)
                .map(|(i, _)| i)
                .unwrap();
            let start = chain_start(&self.tokens, index);
            let text = self.resolver().resolve_full_variable_chain(start, index).unwrap();
            (!text.is_empty() && text != content).then_some(text)
        }
    }

    mod parameter_tests {
        use super::*;

        #[test]
        fn parses_hints_promotion_and_defaults() {
            let tokens = tokenize(
                b"<?php function f(#[A(1)] ?Foo $a, $b = [1, 2], private readonly Bar|Baz &$c, ...$d) {}",
            );
            let function = tokens.iter().position(|t| t.kind == TokenKind::Function).unwrap();
            let (open, close) = parameter_list(&tokens, function).unwrap();
            let params = parameters(&tokens, open, close);
            assert_eq!(params.len(), 4);
            assert_eq!(params[0].declared, "?Foo");
            assert_eq!(tokens[params[1].variable].content, "$b");
            assert_eq!(params[1].declared, "");
            assert_eq!(params[2].declared, "Bar|Baz");
            assert!(params[2].promoted.is_some());
            assert_eq!(tokens[params[3].variable].content, "$d");
        }
    }

    mod assignment_tests {
        use super::*;

        #[test]
        fn new_binds_the_class() {
            let tracked = Tracked::new("<?php $f = new Foo();\n$f->bar();");
            assert_eq!(tracked.type_of("$f", 1).as_deref(), Some("Foo"));
        }

        #[test]
        fn copies_follow_the_source() {
            let tracked = Tracked::new("<?php $f = new Foo();\n$f2 = $f;\n$f2->bar();");
            assert_eq!(tracked.type_of("$f2", 1).as_deref(), Some("Foo"));
        }

        #[test]
        fn reassignment_wins_after_it() {
            let tracked =
                Tracked::new("<?php $f = new Foo();\n$f->a();\n$f = new NotFoo();\n$f->a();");
            assert_eq!(tracked.type_of("$f", 1).as_deref(), Some("Foo"));
            assert_eq!(tracked.type_of("$f", 3).as_deref(), Some("NotFoo"));
        }

        #[test]
        fn this_members_are_tracked() {
            let tracked = Tracked::new(
                "<?php class C { function f() { $this->foo = new Foo(); }\n function g() { $this->foo->bar(); } }",
            );
            let resolved = tracked.type_of("foo", 0);
            assert_eq!(resolved.as_deref(), Some("Foo"));
        }

        #[test]
        fn parameter_defaults_are_not_assignments() {
            let tracked = Tracked::new("<?php class C { function f($x = new Foo()) {} }");
            assert_eq!(tracked.store.binding_count().unwrap(), 0);
        }
    }

    mod declaration_tests {
        use super::*;

        #[test]
        fn parameter_hints_bind_inside_the_body() {
            let tracked = Tracked::new("<?php function f(?Foo $x) { $x->bar(); }\n$x->bar();");
            assert_eq!(tracked.type_of("$x", 1).as_deref(), Some("Foo"));
            assert_eq!(tracked.type_of("$x", 2), None);
        }

        #[test]
        fn return_types_bind_calls() {
            let tracked = Tracked::new(
                "<?php class Maker { function make(): Foo {} }\nfunction build(): Bar {}\n$m = new Maker();\n$a = $m->make();\n$b = build();\n$a->x(); $b->y();",
            );
            assert_eq!(tracked.type_of("$a", 1).as_deref(), Some("Foo"));
            assert_eq!(tracked.type_of("$b", 1).as_deref(), Some("Bar"));
        }

        #[test]
        fn self_return_type_is_the_class() {
            let tracked = Tracked::new(
                "<?php class Builder { static function create(): static {} }\n$b = Builder::create();\n$b->go();",
            );
            assert_eq!(tracked.type_of("$b", 1).as_deref(), Some("Builder"));
        }

        #[test]
        fn typed_and_promoted_properties() {
            let tracked = Tracked::new(
                "<?php class C {\n private ?Foo $foo;\n function __construct(private Bar $bar) {}\n function f() { $this->foo->x(); $this->bar->y(); } }",
            );
            assert_eq!(tracked.type_of("foo", 0).as_deref(), Some("Foo"));
            assert_eq!(tracked.type_of("bar", 0).as_deref(), Some("Bar"));
        }

        #[test]
        fn catch_variables() {
            let tracked = Tracked::new("<?php try {} catch (MyError $e) { $e->report(); }");
            assert_eq!(tracked.type_of("$e", 1).as_deref(), Some("MyError"));
        }
    }

    mod global_tests {
        use super::*;

        #[test]
        fn global_declaration_reaches_top_level_binding() {
            let tracked = Tracked::new(
                "<?php $f = new Foo();\nfunction g() { global $f; $f->bar(); }\nfunction h() { $f->bar(); }",
            );
            assert_eq!(tracked.type_of("$f", 2).as_deref(), Some("Foo"));
            assert_eq!(tracked.type_of("$f", 3), None);
        }
    }
}
