//! SQLite persistence for the training pipeline.
//!
//! [`SqliteRepository`] implements every store trait of
//! [`oxicoach_training::repository`] on a single [`rusqlite::Connection`]. The schema
//! is created and upgraded on open; the applied version lives in
//! `PRAGMA user_version`.
//!
//! # Storage Forms
//!
//! | Value            | Column form                              |
//! |------------------|------------------------------------------|
//! | timestamps       | RFC 3339 text, second precision, UTC     |
//! | dates            | `YYYY-MM-DD`                             |
//! | moves            | UCI text                                 |
//! | principal line   | space-separated UCI moves                |
//! | motif tags       | comma-separated identifiers              |
//! | weekly curriculum| JSON payload                             |

pub use self::sqlite::SqliteRepository;

use oxicoach_training::repository::RepositoryError;

mod migrations;
mod rows;
mod sqlite;

pub(crate) fn to_storage_err(message: String) -> RepositoryError {
    RepositoryError::Backend { message }
}
