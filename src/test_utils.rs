//! Shared test utilities for `DailyBook`.
//!
//! This module provides common helper functions for setting up test databases
//! and creating test entities with sensible defaults.

use crate::{
    core::{collection, cycle, person},
    entities,
    errors::Result,
};
use chrono::NaiveDate;
use sea_orm::DatabaseConnection;

/// Creates an in-memory `SQLite` database with all tables initialized.
/// This is the standard setup for all integration tests.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// A fixed calendar day in January 2025, keeping test dates deterministic.
///
/// # Panics
/// Panics on a day outside January (test-only code).
#[allow(clippy::expect_used)]
#[must_use]
pub fn test_date(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 1, day).expect("valid test date")
}

/// Creates a test person with sensible defaults, together with their
/// automatically opened first cycle.
///
/// # Defaults
/// * `phone`/`location`/`notes`: None
/// * `default_amount`: 200.0
/// * `frequency`: `"daily"`
pub async fn create_test_person(
    db: &DatabaseConnection,
    name: &str,
) -> Result<(entities::person::Model, entities::cycle::Model)> {
    person::create_person(
        db,
        name.to_string(),
        None,
        None,
        200.0,
        "daily".to_string(),
        None,
    )
    .await
}

/// Creates a test person with custom parameters.
pub async fn create_custom_person(
    db: &DatabaseConnection,
    name: &str,
    phone: Option<String>,
    default_amount: f64,
    frequency: &str,
) -> Result<(entities::person::Model, entities::cycle::Model)> {
    person::create_person(
        db,
        name.to_string(),
        phone,
        None,
        default_amount,
        frequency.to_string(),
        None,
    )
    .await
}

/// Records a collected amount on a January test day.
pub async fn record_test_collection(
    db: &DatabaseConnection,
    person_id: i64,
    amount: f64,
    day: u32,
) -> Result<entities::collection::Model> {
    collection::record_collection(db, person_id, amount, test_date(day)).await
}

/// Reads the person's open cycle total, or 0.0 when no cycle is open.
pub async fn active_total(db: &DatabaseConnection, person_id: i64) -> Result<f64> {
    Ok(cycle::get_active_cycle(db, person_id)
        .await?
        .map_or(0.0, |c| c.total_amount))
}

/// Sets up a complete test environment with one person and their open cycle.
/// Returns (db, person, cycle) for common test scenarios.
pub async fn setup_with_person() -> Result<(
    DatabaseConnection,
    entities::person::Model,
    entities::cycle::Model,
)> {
    let db = setup_test_db().await?;
    let (person, cycle) = create_test_person(&db, "Test Person").await?;
    Ok((db, person, cycle))
}
