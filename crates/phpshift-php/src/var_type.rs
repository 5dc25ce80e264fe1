//! Inferred variable types.
//!
//! The store keeps types as strings so they can be matched and rewritten in
//! SQL. [`VarType`] is the structured view of those strings:
//!
//! | String | Value |
//! |--------|-------|
//! | `Foo` | `Class("Foo")` |
//! | `$a`, `$a->b`, `Foo->bar` | `Chain { base, members }` |
//! | `*make`, `*Foo->make` | `Call(..)`: the return type of that call |
//!
//! An unknown type is simply `None`.

use std::fmt;

/// Prefix marking "the return type of this call".
pub const CALL_MARKER: char = '*';

/// Separator between a chain's links.
pub const MEMBER_SEPARATOR: &str = "->";

/// Structured form of a stored type string.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum VarType {
    /// A fully resolved class name.
    Class(String),
    /// A variable or class followed by member accesses not yet resolved.
    Chain { base: String, members: Vec<String> },
    /// The return type of calling the wrapped function or method.
    Call(Box<VarType>),
}

impl VarType {
    /// Parse a stored type string. Returns `None` for an empty string.
    pub fn parse(text: &str) -> Option<VarType> {
        if let Some(rest) = text.strip_prefix(CALL_MARKER) {
            return VarType::parse(rest).map(|inner| VarType::Call(Box::new(inner)));
        }
        if text.is_empty() {
            return None;
        }
        let mut parts = text.split(MEMBER_SEPARATOR).map(str::to_string);
        let base = parts.next()?;
        let members: Vec<String> = parts.collect();
        if members.is_empty() && !base.starts_with('$') {
            Some(VarType::Class(base))
        } else {
            Some(VarType::Chain { base, members })
        }
    }

    /// How far from fully resolved this type is; 0 means a plain class name.
    ///
    /// One per member access, plus one when the type is rooted at a variable
    /// or is a call marker.
    pub fn specificity(&self) -> usize {
        match self {
            VarType::Class(_) => 0,
            VarType::Chain { base, members } => {
                members.len() + usize::from(base.starts_with('$'))
            }
            VarType::Call(inner) => {
                let inner_links = match inner.as_ref() {
                    VarType::Class(_) => 0,
                    other => other.specificity() - usize::from(other.is_variable_rooted()),
                };
                inner_links + 1
            }
        }
    }

    /// Whether the type starts with a `$variable`.
    pub fn is_variable_rooted(&self) -> bool {
        match self {
            VarType::Class(_) => false,
            VarType::Chain { base, .. } => base.starts_with('$'),
            VarType::Call(inner) => inner.is_variable_rooted(),
        }
    }
}

impl fmt::Display for VarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VarType::Class(name) => f.write_str(name),
            VarType::Chain { base, members } => {
                f.write_str(base)?;
                for member in members {
                    write!(f, "{}{}", MEMBER_SEPARATOR, member)?;
                }
                Ok(())
            }
            VarType::Call(inner) => write!(f, "{}{}", CALL_MARKER, inner),
        }
    }
}

/// Specificity of a stored type string; unparseable strings rank as least specific.
pub fn specificity(text: &str) -> usize {
    VarType::parse(text).map_or(usize::MAX, |t| t.specificity())
}

/// The root variable of a chain: `$a` for `$a->b->c`, with any call marker removed.
pub fn root_variable(name: &str) -> &str {
    let bare = name.trim_start_matches(CALL_MARKER);
    bare.split(MEMBER_SEPARATOR).next().unwrap_or(bare)
}

/// Pseudo-types and scalars that never name a class.
const NON_CLASS_TYPES: &[&str] = &[
    "int", "integer", "float", "double", "string", "bool", "boolean", "array", "callable",
    "iterable", "object", "mixed", "void", "null", "false", "true", "never", "resource", "scalar",
    "numeric",
];

/// Reduce a declared type (hint or doc tag) to the class name it names.
///
/// Strips nullability and leading namespace separators, takes the first
/// class-like member of a union and drops namespace qualification. Scalars,
/// pseudo-types and array notations such as `Foo[]` yield `None`.
pub fn class_from_declared_type(declared: &str) -> Option<String> {
    declared
        .split(['|', '&'])
        .map(|part| part.trim().trim_start_matches('?').trim_matches(|c: char| c == '(' || c == ')'))
        .filter(|part| !part.is_empty())
        .filter(|part| !part.ends_with("[]") && !part.contains('<'))
        .map(short_class_name)
        .find(|name| {
            !NON_CLASS_TYPES
                .iter()
                .any(|scalar| scalar.eq_ignore_ascii_case(name))
                && name
                    .chars()
                    .next()
                    .is_some_and(|c| c.is_alphabetic() || c == '_')
        })
        .map(str::to_string)
}

/// Drop namespace qualification: `\App\Model\User` becomes `User`.
pub fn short_class_name(name: &str) -> &str {
    name.rsplit('\\').next().unwrap_or(name)
}
