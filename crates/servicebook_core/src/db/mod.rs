//! Service book database handle: connection bootstrap and schema versioning.
//!
//! # Responsibility
//! - Hand out connections that the record store can use immediately
//!   (`open_db`, `open_db_in_memory`).
//! - Report the two ways a database can be unusable: SQLite itself failed,
//!   or the file was written by a newer servicebook build.
//!
//! # Invariants
//! - `PRAGMA user_version` always equals the last applied migration.
//! - A database with a newer `user_version` is never opened for writing.
//! - Lock contention between the sweep and request handlers surfaces as
//!   `DbError::Sqlite` with code `sqlite_busy` once the busy timeout expires.

use rusqlite::ErrorCode;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod migrations;
mod open;

pub use open::{open_db, open_db_in_memory};

pub type DbResult<T> = Result<T, DbError>;

/// Failure opening, migrating or querying the service book database.
#[derive(Debug)]
pub enum DbError {
    /// SQLite rejected a statement or the file could not be opened.
    Sqlite(rusqlite::Error),
    /// The schema is ahead of this binary; upgrade servicebook instead.
    UnsupportedSchemaVersion {
        db_version: u32,
        latest_supported: u32,
    },
}

impl DbError {
    /// Stable code for `error_code=` log fields.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Sqlite(err) => match err.sqlite_error_code() {
                Some(ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked) => "sqlite_busy",
                Some(ErrorCode::ConstraintViolation) => "sqlite_constraint",
                _ => "sqlite",
            },
            Self::UnsupportedSchemaVersion { .. } => "schema_too_new",
        }
    }
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "sqlite: {err}"),
            Self::UnsupportedSchemaVersion {
                db_version,
                latest_supported,
            } => write!(
                f,
                "service book schema version {db_version} is newer than this build supports ({latest_supported})"
            ),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            Self::UnsupportedSchemaVersion { .. } => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}
