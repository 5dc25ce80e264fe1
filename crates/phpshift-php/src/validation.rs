//! PHP name validation for rename targets.

use thiserror::Error;

/// Error for validation failures.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// Invalid PHP identifier name.
    #[error("invalid name '{name}': {reason}")]
    InvalidName { name: String, reason: String },
}

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Reserved words that cannot name a class, interface or trait.
pub const PHP_RESERVED_WORDS: &[&str] = &[
    "abstract", "and", "array", "as", "break", "callable", "case", "catch", "class", "clone",
    "const", "continue", "declare", "default", "do", "echo", "else", "elseif", "empty",
    "enddeclare", "endfor", "endforeach", "endif", "endswitch", "endwhile", "enum", "eval",
    "exit", "extends", "final", "finally", "fn", "for", "foreach", "function", "global", "goto",
    "if", "implements", "include", "include_once", "instanceof", "insteadof", "interface",
    "isset", "list", "match", "namespace", "new", "or", "print", "private", "protected",
    "public", "readonly", "require", "require_once", "return", "static", "switch", "throw",
    "trait", "try", "unset", "use", "var", "while", "xor", "yield",
];

/// Names reserved for built-in types and class references.
pub const PHP_RESERVED_TYPES: &[&str] = &[
    "bool", "false", "float", "int", "iterable", "mixed", "never", "null", "object", "parent",
    "self", "string", "true", "void",
];

/// Check if a name is reserved as a class name. PHP keywords are case-insensitive.
pub fn is_reserved_class_name(name: &str) -> bool {
    PHP_RESERVED_WORDS
        .iter()
        .chain(PHP_RESERVED_TYPES)
        .any(|word| word.eq_ignore_ascii_case(name))
}

/// Validate the syntax of a PHP label.
///
/// Checks:
/// - Non-empty
/// - Starts with a letter, underscore or non-ASCII character
/// - Continues with those or digits
pub fn validate_php_identifier(name: &str) -> ValidationResult<()> {
    let invalid = |reason: String| ValidationError::InvalidName {
        name: name.to_string(),
        reason,
    };
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return Err(invalid("name cannot be empty".to_string()));
    };
    if !(first.is_alphabetic() || first == '_' || !first.is_ascii()) {
        return Err(invalid("must start with letter or underscore".to_string()));
    }
    if let Some(ch) = chars.find(|&ch| !(ch.is_alphanumeric() || ch == '_' || !ch.is_ascii())) {
        return Err(invalid(format!("invalid character: '{}'", ch)));
    }
    Ok(())
}

/// Validate a new class, interface or trait name.
pub fn validate_class_name(name: &str) -> ValidationResult<()> {
    validate_php_identifier(name)?;
    if is_reserved_class_name(name) {
        return Err(ValidationError::InvalidName {
            name: name.to_string(),
            reason: "cannot use a reserved word as a class name".to_string(),
        });
    }
    Ok(())
}

/// Validate a new method name. Reserved words are allowed as method names.
pub fn validate_method_name(name: &str) -> ValidationResult<()> {
    validate_php_identifier(name)?;
    if name.eq_ignore_ascii_case("class") {
        return Err(ValidationError::InvalidName {
            name: name.to_string(),
            reason: "'class' is reserved for ::class".to_string(),
        });
    }
    Ok(())
}
