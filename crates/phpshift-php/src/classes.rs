//! Class hierarchy tracking.
//!
//! Records where each class, interface and trait is declared and what it
//! extends or implements. Names are compared without namespace
//! qualification.

use std::collections::{HashMap, HashSet, VecDeque};
use std::path::{Path, PathBuf};

use tracing::trace;

use crate::cursor::{declared_name, TokenCursor};
use crate::token::{Token, TokenKind};
use crate::var_type::short_class_name;

/// One declared class-like construct.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassInfo {
    pub name: String,
    /// File holding the declaration.
    pub file: PathBuf,
    /// Token index of the `class`/`interface`/`trait` keyword.
    pub position: usize,
    /// The `extends` parent of a class.
    pub parent: Option<String>,
    /// Implemented interfaces, or the parents of an interface.
    pub interfaces: Vec<String>,
}

/// Run-wide index of declared classes.
#[derive(Debug, Default)]
pub struct ClassHierarchy {
    classes: HashMap<String, ClassInfo>,
}

impl ClassHierarchy {
    pub fn new() -> Self {
        ClassHierarchy::default()
    }

    /// Record every class-like declaration in `tokens`, the content of `path`.
    ///
    /// When two files declare the same name, the first one recorded wins.
    pub fn record_file(&mut self, path: &Path, tokens: &[Token]) {
        for (index, token) in tokens.iter().enumerate() {
            if !matches!(
                token.kind,
                TokenKind::Class | TokenKind::Interface | TokenKind::Trait
            ) {
                continue;
            }
            let Some(name) = declared_name(tokens, index) else {
                continue;
            };
            let name = short_class_name(name).to_string();
            if self.classes.contains_key(&name) {
                continue;
            }
            let (parents, interfaces) = header_names(tokens, index);
            let (parent, interfaces) = if token.kind == TokenKind::Interface {
                // Interfaces extend other interfaces; treat them all as implemented.
                (None, parents.into_iter().chain(interfaces).collect())
            } else {
                (parents.into_iter().next(), interfaces)
            };
            trace!(class = %name, file = %path.display(), ?parent, "class recorded");
            self.classes.insert(
                name.clone(),
                ClassInfo {
                    name,
                    file: path.to_path_buf(),
                    position: index,
                    parent,
                    interfaces,
                },
            );
        }
    }

    pub fn get(&self, name: &str) -> Option<&ClassInfo> {
        self.classes.get(short_class_name(name))
    }

    /// The `extends` parent of `name`.
    pub fn parent_class(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(|info| info.parent.as_deref())
    }

    /// The file declaring `name`.
    pub fn declaring_file(&self, name: &str) -> Option<&Path> {
        self.get(name).map(|info| info.file.as_path())
    }

    /// Parent classes of `name`, nearest first. Stops on cycles.
    pub fn ancestors(&self, name: &str) -> Vec<String> {
        let mut seen = HashSet::new();
        seen.insert(short_class_name(name).to_string());
        let mut chain = Vec::new();
        let mut current = self.parent_class(name);
        while let Some(parent) = current {
            if !seen.insert(parent.to_string()) {
                break;
            }
            chain.push(parent.to_string());
            current = self.parent_class(parent);
        }
        chain
    }

    /// Whether `name` is `ancestor` or inherits from it through any mix of
    /// `extends` and `implements`.
    pub fn is_subclass_of(&self, name: &str, ancestor: &str) -> bool {
        let target = short_class_name(ancestor);
        let mut queue = VecDeque::from([short_class_name(name).to_string()]);
        let mut seen = HashSet::new();
        while let Some(current) = queue.pop_front() {
            if current.eq_ignore_ascii_case(target) {
                return true;
            }
            if !seen.insert(current.clone()) {
                continue;
            }
            if let Some(info) = self.get(&current) {
                queue.extend(info.parent.iter().cloned());
                queue.extend(info.interfaces.iter().cloned());
            }
        }
        false
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

/// Names listed after `extends` and after `implements` in a declaration header.
fn header_names(tokens: &[Token], keyword: usize) -> (Vec<String>, Vec<String>) {
    let mut extends = Vec::new();
    let mut implements = Vec::new();
    let Some(start) = TokenCursor::at(tokens, keyword) else {
        return (extends, implements);
    };
    let mut in_implements = None;
    let mut cursor = start.next_significant();
    while let Some(c) = cursor {
        match c.kind() {
            TokenKind::OpenBrace | TokenKind::Semicolon => break,
            TokenKind::Extends => in_implements = Some(false),
            TokenKind::Implements => in_implements = Some(true),
            TokenKind::Identifier => {
                let name = short_class_name(c.content()).to_string();
                match in_implements {
                    Some(false) => extends.push(name),
                    Some(true) => implements.push(name),
                    None => {}
                }
            }
            _ => {}
        }
        cursor = c.next_significant();
    }
    (extends, implements)
}
