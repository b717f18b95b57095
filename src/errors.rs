//! Unified error types for `DailyBook`.
//!
//! All fallible operations return [`Result`], and every failure carries
//! enough detail (kind plus the offending id or value) for the caller to
//! render a message. The ledger engine never swallows an error and never
//! retries internally; retry policy belongs to the caller.

use thiserror::Error;

/// Crate-wide error type
#[derive(Debug, Error)]
pub enum Error {
    /// Referenced person does not exist (or is soft-deleted)
    #[error("Person not found: {id}")]
    PersonNotFound {
        /// The person id that failed to resolve
        id: i64,
    },

    /// Referenced cycle does not exist
    #[error("Cycle not found: {id}")]
    CycleNotFound {
        /// The cycle id that failed to resolve
        id: i64,
    },

    /// A withdrawal was attempted with no open cycle for the person
    #[error("No active cycle for person {person_id}")]
    NoActiveCycle {
        /// The person whose active cycle was missing
        person_id: i64,
    },

    /// A partial withdrawal exceeded the cycle's current balance
    #[error("Insufficient balance: requested {requested:.2}, available {available:.2}")]
    InsufficientBalance {
        /// Amount the caller asked to withdraw
        requested: f64,
        /// Current cycle total
        available: f64,
    },

    /// A negative, non-finite, or otherwise unusable amount
    #[error("Invalid amount: {amount}")]
    InvalidAmount {
        /// The rejected amount
        amount: f64,
    },

    /// A malformed input value caught at the boundary (empty name,
    /// unknown frequency); the message carries the offending value
    #[error("Invalid input: {message}")]
    InvalidInput {
        /// What was rejected and why
        message: String,
    },

    /// A date string that is neither `YYYY-MM-DD` nor `DD-MM-YYYY`
    #[error("Invalid date: {value}")]
    InvalidDate {
        /// The rejected input
        value: String,
    },

    /// Backup payload failed shape or semantic validation before restore
    #[error("Import format error: {message}")]
    ImportFormat {
        /// What was wrong with the payload
        message: String,
    },

    /// Configuration error
    #[error("Configuration error: {message}")]
    Config {
        /// What was wrong
        message: String,
    },

    /// Underlying persistence failure, propagated uncaught
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// Backup JSON could not be serialized or deserialized
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Environment variable error
    #[error("Environment variable error: {0}")]
    EnvVar(#[from] std::env::VarError),
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;
