//! Path arithmetic for file renames and include rewriting.
//!
//! All comparisons are lexical: paths are made absolute against a base
//! directory and normalized (`.` dropped, `..` folded) without touching the
//! filesystem, so symlinks are never resolved and missing files still compare.

use std::io;
use std::path::{Component, Path, PathBuf};

/// Lexically normalize a path, folding `.` and `..` components.
///
/// A `..` at the root stays at the root.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Prefix(prefix) => out.push(prefix.as_os_str()),
            Component::RootDir => out.push(Component::RootDir.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            Component::Normal(part) => out.push(part),
        }
    }
    out
}

/// Make `path` absolute against `base` and normalize it.
pub fn absolute_path(path: &Path, base: &Path) -> PathBuf {
    if path.is_absolute() {
        normalize_path(path)
    } else {
        normalize_path(&base.join(path))
    }
}

/// Make `path` absolute against the current working directory.
pub fn absolute_from_cwd(path: &Path) -> io::Result<PathBuf> {
    let cwd = std::env::current_dir()?;
    Ok(absolute_path(path, &cwd))
}

/// Where an include literal was matched against a target file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathMatch {
    /// The literal was an absolute path equal to the target.
    Absolute,
    /// The literal was relative; `base` is the directory it is relative to.
    Relative { base: PathBuf },
}

/// Decide whether an include literal refers to `expected`.
///
/// `including_dir` is the directory of the file containing the literal.
/// Relative literals are first resolved against that directory; failing
/// that, the literal matches when it is a whole-component suffix of
/// `expected` (the include-path case), and the unmatched head becomes the base.
pub fn match_include_path(expected: &Path, literal: &str, including_dir: &Path) -> Option<PathMatch> {
    if literal.is_empty() {
        return None;
    }
    let literal_path = Path::new(literal);
    if literal_path.is_absolute() {
        return (normalize_path(literal_path) == expected).then_some(PathMatch::Absolute);
    }

    if absolute_path(literal_path, including_dir) == expected {
        return Some(PathMatch::Relative {
            base: including_dir.to_path_buf(),
        });
    }

    let relative = normalize_path(literal_path);
    if relative.as_os_str().is_empty() || !expected.ends_with(&relative) {
        return None;
    }
    let depth = relative.components().count();
    let mut base = expected.to_path_buf();
    for _ in 0..depth {
        base.pop();
    }
    Some(PathMatch::Relative { base })
}

/// Express `target` relative to the directory `base`, using `..` as needed.
///
/// Separators are always `/` since the result is written into PHP source.
pub fn relative_path(target: &Path, base: &Path) -> String {
    let target_parts: Vec<Component<'_>> = target.components().collect();
    let base_parts: Vec<Component<'_>> = base.components().collect();

    let common = target_parts
        .iter()
        .zip(base_parts.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut pieces: Vec<String> = Vec::new();
    for _ in common..base_parts.len() {
        pieces.push("..".to_string());
    }
    for part in &target_parts[common..] {
        pieces.push(part.as_os_str().to_string_lossy().into_owned());
    }
    pieces.join("/")
}

/// Produce the literal that should replace `original` once the file it
/// names moves to `new_path`.
///
/// Absolute literals stay absolute; relative ones are re-expressed against
/// the same base, keeping a leading `./` when the original had one.
pub fn rewrite_include_literal(original: &str, matched: &PathMatch, new_path: &Path) -> String {
    match matched {
        PathMatch::Absolute => new_path.to_string_lossy().replace('\\', "/"),
        PathMatch::Relative { base } => {
            let relative = relative_path(new_path, base);
            if original.starts_with("./") && !relative.starts_with("..") {
                format!("./{}", relative)
            } else {
                relative
            }
        }
    }
}
