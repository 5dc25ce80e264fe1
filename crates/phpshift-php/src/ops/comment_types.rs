//! Type tracking from doc comments: `@var`, `@param` and `@return`.

use std::sync::LazyLock;

use regex::Regex;

use crate::cursor::TokenCursor;
use crate::ops::track_types::{declared_class, function_name, parameter_list, parameters};
use crate::ops::SniffContext;
use crate::store::StoreResult;
use crate::token::{Token, TokenKind};
use crate::var_type::CALL_MARKER;

/// `@var Type $name`, `@var $name Type` or `@var Type`.
static VAR_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"@var[ \t]+(\S+)(?:[ \t]+(\S+))?").unwrap());

/// `@param Type $name`
static PARAM_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"@param[ \t]+(\S+)[ \t]+&?(?:\.\.\.)?(\$[A-Za-z_][A-Za-z0-9_]*)").unwrap()
});

/// `@return Type`
static RETURN_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"@return[ \t]+(\S+)").unwrap());

fn clean(word: &str) -> &str {
    word.trim_end_matches("*/")
}

/// Record the types declared by the doc comment at `index`.
pub fn process_doc_comment(ctx: &SniffContext<'_>, index: usize) -> StoreResult<()> {
    let content = ctx.tokens[index].content.as_str();
    for captures in VAR_TAG.captures_iter(content) {
        let first = clean(&captures[1]);
        let second = captures.get(2).map(|m| clean(m.as_str()));
        let (ty, name) = if first.starts_with('$') {
            match second {
                Some(ty) => (ty, Some(first)),
                None => continue,
            }
        } else {
            (first, second.filter(|s| s.starts_with('$')))
        };
        process_var(ctx, index, ty, name)?;
    }

    let needs_function = PARAM_TAG.is_match(content) || RETURN_TAG.is_match(content);
    if !needs_function {
        return Ok(());
    }
    let Some(function) = next_function(ctx.tokens, index) else {
        return Ok(());
    };
    for captures in PARAM_TAG.captures_iter(content) {
        process_param(ctx, function, clean(&captures[1]), &captures[2])?;
    }
    if let Some(captures) = RETURN_TAG.captures(content) {
        process_return(ctx, function, clean(&captures[1]))?;
    }
    Ok(())
}

/// The function keyword the doc comment at `index` documents, skipping
/// modifiers and attributes.
fn next_function(tokens: &[Token], index: usize) -> Option<usize> {
    let mut cursor = TokenCursor::at(tokens, index)?.next_significant()?;
    loop {
        match cursor.kind() {
            TokenKind::Function => return Some(cursor.index()),
            kind if kind.is_modifier() => {}
            TokenKind::OpenBracket => cursor = cursor.skip_group_forward(),
            _ => return None,
        }
        cursor = cursor.next_significant()?;
    }
}

/// Bind `@var` to the named variable in the following statement, or to the
/// first variable after the comment.
fn process_var(
    ctx: &SniffContext<'_>,
    index: usize,
    ty: &str,
    name: Option<&str>,
) -> StoreResult<()> {
    let Some(start) = TokenCursor::at(ctx.tokens, index) else {
        return Ok(());
    };
    let mut target = None;
    if let Some(name) = name {
        let mut cursor = start.next();
        while let Some(c) = cursor {
            match c.kind() {
                TokenKind::Variable if c.content() == name => {
                    target = Some(c.index());
                    break;
                }
                TokenKind::Semicolon | TokenKind::OpenBrace | TokenKind::CloseBrace => break,
                _ => {}
            }
            cursor = c.next();
        }
    }
    // A named tag with no matching variable in its statement binds at the
    // comment itself, so earlier uses reach it through the forward lookup.
    let target = match (target, name) {
        (Some(target), _) => target,
        (None, Some(_)) => index,
        (None, None) => match start.find_next(&[TokenKind::Variable]) {
            Some(c) => c.index(),
            None => return Ok(()),
        },
    };
    let Some(class) = declared_class(ctx, target, ty) else {
        return Ok(());
    };
    ctx.resolver.set_variable_type(target, &class, name, None)
}

fn process_param(
    ctx: &SniffContext<'_>,
    function: usize,
    ty: &str,
    name: &str,
) -> StoreResult<()> {
    let tokens = ctx.tokens;
    if tokens[function].scope_opener.is_none() {
        return Ok(());
    }
    let Some((open, close)) = parameter_list(tokens, function) else {
        return Ok(());
    };
    let Some(param) = parameters(tokens, open, close)
        .into_iter()
        .find(|p| tokens[p.variable].content == name)
    else {
        return Ok(());
    };
    let Some(class) = declared_class(ctx, function, ty) else {
        return Ok(());
    };
    ctx.resolver
        .set_variable_type(param.variable, &class, Some(name), Some(function as i64))
}

fn process_return(ctx: &SniffContext<'_>, function: usize, ty: &str) -> StoreResult<()> {
    let Some(name_index) = function_name(ctx.tokens, function) else {
        return Ok(());
    };
    let Some(class) = declared_class(ctx, function, ty) else {
        return Ok(());
    };
    let call_name = format!("{}{}", CALL_MARKER, ctx.tokens[name_index].content);
    ctx.resolver
        .set_variable_type(name_index, &class, Some(&call_name), None)
}
