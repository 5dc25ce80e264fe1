//! Variable Type Store.
//!
//! A per-run, in-memory SQLite database holding two tables:
//!
//! - `variable_types`: `(filename, scope, variable, type, position)`, at most
//!   one row per `(filename, position)`;
//! - `global_vars`: markers recording that a name was declared `global`
//!   inside a scope.
//!
//! Scope `0` is the file's global scope and also the home of class-qualified
//! names such as `Foo->bar`; any other scope is the token index of the
//! owning class, interface or function.
//!
//! Writing a binding also rewrites partial chains rooted at the bound name
//! (see [`VariableTypeStore::record_variable_type`]). This is a deliberate
//! denormalization: lookups then match on exact names instead of re-walking
//! chains.

use rusqlite::{params, Connection, OptionalExtension};
use thiserror::Error;
use tracing::trace;

use crate::var_type::{CALL_MARKER, MEMBER_SEPARATOR};

/// The reserved global / class-qualified scope.
pub const GLOBAL_SCOPE: i64 = 0;

/// Position that sorts after every real token index.
pub const END_OF_FILE: i64 = i64::MAX;

// ============================================================================
// Errors
// ============================================================================

/// Errors from the variable type store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store was queried before [`VariableTypeStore::init`].
    #[error("variable type store used before initialization")]
    Uninitialized,

    /// The backing database failed.
    #[error("variable type store query failed: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

// ============================================================================
// Store
// ============================================================================

const SCHEMA: &str = r#"
CREATE TABLE variable_types (
    filename  TEXT    NOT NULL,
    scope     INTEGER NOT NULL,
    variable  TEXT    NOT NULL,
    type      TEXT    NOT NULL,
    position  INTEGER NOT NULL,
    UNIQUE (filename, position)
);

CREATE INDEX variable_types_lookup
    ON variable_types (filename, scope, variable, position);

CREATE TABLE global_vars (
    filename  TEXT    NOT NULL,
    scope     INTEGER NOT NULL,
    variable  TEXT    NOT NULL,
    position  INTEGER NOT NULL,
    UNIQUE (filename, position)
);

CREATE INDEX global_vars_lookup
    ON global_vars (filename, scope, variable);
"#;

/// Scope-aware store of inferred variable types for one run.
#[derive(Debug, Default)]
pub struct VariableTypeStore {
    conn: Option<Connection>,
}

impl VariableTypeStore {
    /// Create an uninitialized store.
    pub fn new() -> Self {
        VariableTypeStore { conn: None }
    }

    /// Create and initialize a store.
    pub fn open_in_memory() -> StoreResult<Self> {
        let mut store = VariableTypeStore::new();
        store.init()?;
        Ok(store)
    }

    /// Create a fresh, empty database, discarding any previous contents.
    pub fn init(&mut self) -> StoreResult<()> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        self.conn = Some(conn);
        Ok(())
    }

    fn conn(&self) -> StoreResult<&Connection> {
        self.conn.as_ref().ok_or(StoreError::Uninitialized)
    }

    /// Bind `name` to `ty` at `(filename, position)`, replacing any binding
    /// already at that site, then propagate `ty` into dependent partial chains.
    pub fn record_variable_type(
        &self,
        name: &str,
        ty: &str,
        filename: &str,
        scope: i64,
        position: i64,
    ) -> StoreResult<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT OR REPLACE INTO variable_types (filename, scope, variable, type, position)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![filename, scope, name, ty, position],
        )?;
        trace!(filename, scope, name, ty, position, "binding recorded");
        self.propagate_into_chains(name, ty, filename, scope)?;
        Ok(())
    }

    /// Rewrite every binding in `(filename, scope)` whose name is a chain
    /// rooted at `name` (`name->...`) so that the root becomes `ty`.
    ///
    /// A chain rewritten to a class-rooted name moves to the global scope,
    /// where class-qualified names live.
    fn propagate_into_chains(
        &self,
        name: &str,
        ty: &str,
        filename: &str,
        scope: i64,
    ) -> StoreResult<usize> {
        let conn = self.conn()?;
        let prefix = format!("{}{}", name, MEMBER_SEPARATOR);
        let prefix_len = prefix.chars().count() as i64;
        let target_scope = if ty.trim_start_matches(CALL_MARKER).starts_with('$') {
            scope
        } else {
            GLOBAL_SCOPE
        };
        let rewritten = conn.execute(
            "UPDATE variable_types
                SET variable = ?1 || substr(variable, ?2),
                    scope = ?3
              WHERE filename = ?4
                AND scope = ?5
                AND substr(variable, 1, ?6) = ?7
                AND length(variable) > ?6",
            params![
                ty,
                prefix_len - 1,
                target_scope,
                filename,
                scope,
                prefix_len,
                prefix
            ],
        )?;
        if rewritten > 0 {
            trace!(filename, name, ty, rewritten, "partial chains rewritten");
        }
        Ok(rewritten)
    }

    /// Record that `name` refers to the global binding inside `scope`.
    ///
    /// Recording the same site again is a no-op.
    pub fn record_global(&self, name: &str, filename: &str, scope: i64, position: i64) -> StoreResult<()> {
        self.conn()?.execute(
            "INSERT OR IGNORE INTO global_vars (filename, scope, variable, position)
             VALUES (?1, ?2, ?3, ?4)",
            params![filename, scope, name, position],
        )?;
        Ok(())
    }

    /// The type bound at exactly `(filename, position)`, if any.
    pub fn check_existing(&self, filename: &str, position: i64) -> StoreResult<Option<String>> {
        let ty = self
            .conn()?
            .query_row(
                "SELECT type FROM variable_types WHERE filename = ?1 AND position = ?2",
                params![filename, position],
                |row| row.get(0),
            )
            .optional()?;
        Ok(ty)
    }

    /// The type of `name` in `scope` as seen from `position`.
    ///
    /// The binding at the latest position at or before `position` wins. When
    /// there is none, the earliest binding after `position` is used, so that
    /// type facts scanned later (doc comments after first use, for instance)
    /// still apply.
    pub fn lookup_type(
        &self,
        name: &str,
        filename: &str,
        scope: i64,
        position: i64,
    ) -> StoreResult<Option<String>> {
        let conn = self.conn()?;
        let before = conn
            .query_row(
                "SELECT type FROM variable_types
                  WHERE filename = ?1 AND scope = ?2 AND variable = ?3 AND position <= ?4
                  ORDER BY position DESC LIMIT 1",
                params![filename, scope, name, position],
                |row| row.get(0),
            )
            .optional()?;
        if before.is_some() {
            return Ok(before);
        }
        let after = conn
            .query_row(
                "SELECT type FROM variable_types
                  WHERE filename = ?1 AND scope = ?2 AND variable = ?3 AND position > ?4
                  ORDER BY position ASC LIMIT 1",
                params![filename, scope, name, position],
                |row| row.get(0),
            )
            .optional()?;
        Ok(after)
    }

    /// Whether `name` was declared global inside `scope`.
    pub fn is_global(&self, name: &str, filename: &str, scope: i64) -> StoreResult<bool> {
        let count: i64 = self.conn()?.query_row(
            "SELECT COUNT(*) FROM global_vars WHERE filename = ?1 AND scope = ?2 AND variable = ?3",
            params![filename, scope, name],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Number of stored bindings.
    pub fn binding_count(&self) -> StoreResult<usize> {
        let count: i64 = self
            .conn()?
            .query_row("SELECT COUNT(*) FROM variable_types", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Every binding for `filename` as `(scope, variable, type, position)`, by position.
    pub fn bindings_for(&self, filename: &str) -> StoreResult<Vec<(i64, String, String, i64)>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT scope, variable, type, position FROM variable_types
              WHERE filename = ?1 ORDER BY position",
        )?;
        let rows = stmt.query_map([filename], |row| {
            Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
        })?;
        let mut bindings = Vec::new();
        for row in rows {
            bindings.push(row?);
        }
        Ok(bindings)
    }
}
