//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define access-pattern oriented data contracts (one named query per use).
//! - Isolate SQLite query details from service orchestration.
//! - Refuse connections whose schema does not match this binary.
//!
//! # Invariants
//! - Write paths run `Landmark::validate()` before SQL mutations.
//! - Lookups that find nothing return `Ok(None)`; `NotFound` is reserved for
//!   mutations that target a missing row.

use crate::db::migrations::latest_version;
use crate::db::DbError;
use crate::model::landmark::{LandmarkId, LandmarkValidationError};
use rusqlite::Connection;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod landmark_repo;
pub mod setting_repo;

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error shared by landmark and setting persistence.
#[derive(Debug)]
pub enum RepoError {
    /// Entity failed validation before reaching SQL.
    Validation(LandmarkValidationError),
    /// Underlying SQLite failure, including constraint violations.
    Db(DbError),
    /// Mutation targeted a landmark id with no row.
    NotFound(LandmarkId),
    /// Persisted row cannot be converted to a valid read model.
    InvalidData(String),
    /// Setting key contains characters outside `[A-Za-z0-9_.-]`.
    InvalidSettingKey(String),
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    /// Required table is missing.
    MissingRequiredTable(&'static str),
    /// Required column is missing from expected table.
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
}

impl RepoError {
    /// Returns whether the failure came from a storage constraint, e.g. a
    /// purge blocked by child landmarks that still reference the target.
    pub fn is_constraint_violation(&self) -> bool {
        matches!(self, Self::Db(err) if err.is_constraint_violation())
    }
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "landmark not found: {id}"),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
            Self::InvalidSettingKey(key) => write!(f, "invalid setting key: `{key}`"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "repository requires schema version {expected_version}, got {actual_version}"
            ),
            Self::MissingRequiredTable(table) => {
                write!(f, "repository requires table `{table}`")
            }
            Self::MissingRequiredColumn { table, column } => write!(
                f,
                "repository requires column `{column}` in table `{table}`"
            ),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<LandmarkValidationError> for RepoError {
    fn from(value: LandmarkValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Verifies schema version, table and columns before a repository is handed
/// out for `conn`.
pub(crate) fn ensure_table_ready(
    conn: &Connection,
    table: &'static str,
    columns: &[&'static str],
) -> RepoResult<()> {
    let expected_version = latest_version();
    let actual_version: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    if actual_version != expected_version {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    if !table_exists(conn, table)? {
        return Err(RepoError::MissingRequiredTable(table));
    }

    let existing = table_columns(conn, table)?;
    for column in columns {
        if !existing.iter().any(|current| current == column) {
            return Err(RepoError::MissingRequiredColumn { table, column });
        }
    }

    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn table_columns(conn: &Connection, table: &str) -> RepoResult<Vec<String>> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table});"))?;
    let mut rows = stmt.query([])?;
    let mut columns = Vec::new();
    while let Some(row) = rows.next()? {
        columns.push(row.get::<_, String>(1)?);
    }
    Ok(columns)
}

pub(crate) fn bool_to_int(value: bool) -> i64 {
    if value {
        1
    } else {
        0
    }
}
