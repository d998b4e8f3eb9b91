//! Core error types for timeboxer-core.
//!
//! This module defines the error hierarchy using thiserror. Collaborator
//! failures (calendar provider, persistence store) are surfaced through
//! `ReconcileError`; a malformed external event id is a typed, non-fatal
//! error consumed by the identity map.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for timeboxer-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Persistence-related errors
    #[error("Persistence error: {0}")]
    Persistence(#[from] PersistenceError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Reconciliation errors
    #[error("Reconcile error: {0}")]
    Reconcile(#[from] ReconcileError),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Persistence-specific errors.
#[derive(Error, Debug)]
pub enum PersistenceError {
    /// Failed to open the database
    #[error("Failed to open database at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// A write (insert/update/delete or save) failed
    #[error("Write failed: {0}")]
    WriteFailed(String),

    /// Database is locked
    #[error("Database is locked")]
    Locked,

    /// IO error while locating or creating the data directory
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<rusqlite::Error> for PersistenceError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(err, _msg) => {
                if err.code == rusqlite::ErrorCode::DatabaseLocked {
                    PersistenceError::Locked
                } else {
                    PersistenceError::QueryFailed(err.to_string())
                }
            }
            _ => PersistenceError::QueryFailed(err.to_string()),
        }
    }
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Failed to parse configuration
    #[error("Failed to parse configuration: {0}")]
    ParseFailed(String),
}

/// Errors surfaced by a reconciliation pass.
///
/// A failed pass is not rolled back and not retried; the next trigger runs a
/// fresh pass against the same external source and converges implicitly.
#[derive(Error, Debug)]
pub enum ReconcileError {
    /// The calendar provider failed to list calendars or events
    #[error("Calendar provider error: {0}")]
    Provider(String),

    /// The persistence store failed to apply or save the plan
    #[error("Persistence write failed: {0}")]
    Persistence(String),
}

/// Validation errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A task must have a non-empty title to persist
    #[error("Task title must not be empty")]
    EmptyTitle,

    /// Externally sourced tasks can only be removed by reconciliation
    #[error("Task {id} was imported from a calendar event and cannot be deleted manually")]
    ImportedTaskDeletion { id: uuid::Uuid },

    /// Invalid time range
    #[error("Invalid time range: end ({end}) is before start ({start})")]
    InvalidTimeRange {
        start: chrono::DateTime<chrono::Utc>,
        end: chrono::DateTime<chrono::Utc>,
    },
}

/// An external event id whose fixed-width suffix is not a parseable UUID.
///
/// Not fatal: the identity map falls back to a fresh random task id and
/// records the pair, so later passes still resolve the same identity.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("External event id {0:?} does not end in a valid UUID")]
pub struct MalformedExternalId(pub String);
