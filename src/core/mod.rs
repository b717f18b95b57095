//! Core business logic - the ledger engine and its read-side rollups.
//!
//! Everything in here is framework-agnostic: functions take a database
//! connection and return plain structured data, leaving rendering to the
//! presentation collaborators.

/// Backup export and destructive restore
pub mod backup;
/// Daily collection recording, skipping, and undo
pub mod collection;
/// Cycle lifecycle, total deltas, and reconciliation
pub mod cycle;
/// Date parsing and calendar helpers
pub mod dates;
/// Person registration and soft deletion
pub mod person;
/// Read-only dashboard, range, and pivot rollups
pub mod report;
/// Full and partial withdrawal settlement
pub mod withdrawal;
