//! Core error types for flightbook-core.
//!
//! This module defines the error hierarchy using thiserror. Pure
//! computation (lane packing, the activity clock, restriction policy)
//! never returns errors for normal-range inputs; only construction-time
//! validation and side-effecting components surface them.

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Core error type for flightbook-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Booking conflicts
    #[error("Booking conflict: {0}")]
    Conflict(#[from] ConflictError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic errors with context
    #[error("{0}")]
    Custom(String),
}

/// Database-specific errors.
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Failed to open database connection
    #[error("Failed to open database at {path}: {source}")]
    OpenFailed {
        path: std::path::PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Migration failed
    #[error("Database migration failed: {0}")]
    MigrationFailed(String),

    /// Row expected but not found
    #[error("Record not found: {entity} id {id}")]
    NotFound { entity: &'static str, id: i64 },

    /// Database is locked
    #[error("Database is locked")]
    Locked,
}

/// Configuration-specific errors.
///
/// Missing course restriction settings are NOT an error -- they load as
/// all-disabled so a misconfigured course never penalizes students.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed {
        path: std::path::PathBuf,
        message: String,
    },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Failed to parse configuration
    #[error("Failed to parse configuration: {0}")]
    ParseFailed(String),
}

/// Validation errors, raised at entity construction time.
#[derive(Error, Debug)]
pub enum ValidationError {
    /// Invalid time range
    #[error("Invalid time window: end ({end}) must be greater than start ({start})")]
    InvalidTimeWindow {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },

    /// Slot posted outside the allowed horizon
    #[error("Window outside the posting horizon: {reason}")]
    OutsidePostingHorizon { reason: String },

    /// Missing required field on a loaded record
    #[error("Missing required field '{field}' on {entity} record")]
    MissingField {
        entity: &'static str,
        field: &'static str,
    },

    /// Invalid value
    #[error("Invalid value for '{field}': {message}")]
    InvalidValue { field: String, message: String },
}

/// Booking conflict errors, surfaced to the caller without retry.
#[derive(Error, Debug)]
pub enum ConflictError {
    /// The instructor or the student already holds an active booking
    /// overlapping the requested window
    #[error("Active booking {booking_id} already overlaps {start} - {end}")]
    OverlappingBooking {
        booking_id: i64,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },

    /// The slot was already consumed by another booking
    #[error("Slot {slot_id} is already booked")]
    SlotTaken { slot_id: i64 },
}

impl From<rusqlite::Error> for DatabaseError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(err, _msg) => {
                if err.code == rusqlite::ErrorCode::DatabaseLocked {
                    DatabaseError::Locked
                } else {
                    DatabaseError::QueryFailed(err.to_string())
                }
            }
            rusqlite::Error::QueryReturnedNoRows => {
                DatabaseError::QueryFailed("no rows returned".to_string())
            }
            _ => DatabaseError::QueryFailed(err.to_string()),
        }
    }
}

impl From<rusqlite::Error> for CoreError {
    fn from(err: rusqlite::Error) -> Self {
        CoreError::Database(err.into())
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
