//! Person business logic.
//!
//! Registration atomically creates the person together with their first open
//! cycle. Deletion is a soft flag flip so historical cycles, collections and
//! withdrawals stay attached and reportable.

use crate::{
    entities::{Person, cycle, person},
    errors::{Error, Result},
};
use chrono::Utc;
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*};

/// Allowed advisory collection frequencies. Never enforced by the engine.
pub const FREQUENCIES: [&str; 3] = ["daily", "weekly", "custom"];

/// Fields that can be changed on an existing person. `None` leaves the
/// current value untouched.
#[derive(Debug, Clone, Default)]
pub struct PersonUpdate {
    /// New display name
    pub name: Option<String>,
    /// New phone number (`Some(None)` clears it)
    pub phone: Option<Option<String>>,
    /// New location (`Some(None)` clears it)
    pub location: Option<Option<String>>,
    /// New profile photo path (`Some(None)` clears it)
    pub photo_path: Option<Option<String>>,
    /// New expected payment amount
    pub default_amount: Option<f64>,
    /// New advisory frequency
    pub frequency: Option<String>,
    /// New notes (`Some(None)` clears them)
    pub notes: Option<Option<String>>,
}

/// Registers a new person and opens their first cycle in one transaction.
///
/// Validates a non-empty name and a positive, finite `default_amount`.
/// A failure partway leaves neither a person without a cycle nor an
/// orphaned cycle behind.
pub async fn create_person(
    db: &DatabaseConnection,
    name: String,
    phone: Option<String>,
    location: Option<String>,
    default_amount: f64,
    frequency: String,
    notes: Option<String>,
) -> Result<(person::Model, cycle::Model)> {
    if name.trim().is_empty() {
        return Err(Error::InvalidInput {
            message: "Person name cannot be empty".to_string(),
        });
    }

    if !default_amount.is_finite() || default_amount <= 0.0 {
        return Err(Error::InvalidAmount {
            amount: default_amount,
        });
    }

    if !FREQUENCIES.contains(&frequency.as_str()) {
        return Err(Error::InvalidInput {
            message: format!("Unknown frequency '{frequency}', expected one of {FREQUENCIES:?}"),
        });
    }

    let txn = db.begin().await?;

    let now = Utc::now();
    let person = person::ActiveModel {
        name: Set(name.trim().to_string()),
        phone: Set(phone),
        location: Set(location),
        photo_path: Set(None),
        default_amount: Set(default_amount),
        frequency: Set(frequency),
        notes: Set(notes),
        is_active: Set(true),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    let cycle = crate::core::cycle::open_cycle(&txn, person.id, now.date_naive()).await?;

    txn.commit().await?;
    Ok((person, cycle))
}

/// Retrieves all active (non-deleted) people, ordered alphabetically by name.
pub async fn get_active_people(db: &DatabaseConnection) -> Result<Vec<person::Model>> {
    Person::find()
        .filter(person::Column::IsActive.eq(true))
        .order_by_asc(person::Column::Name)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Finds a person by their unique ID, including soft-deleted people.
pub async fn get_person_by_id(
    db: &DatabaseConnection,
    person_id: i64,
) -> Result<Option<person::Model>> {
    Person::find_by_id(person_id)
        .one(db)
        .await
        .map_err(Into::into)
}

/// Resolves a person id to an active person, or fails with
/// [`Error::PersonNotFound`]. Soft-deleted people are treated as missing so
/// no new ledger activity can attach to them.
pub async fn require_active_person<C>(db: &C, person_id: i64) -> Result<person::Model>
where
    C: ConnectionTrait,
{
    let person = Person::find_by_id(person_id)
        .one(db)
        .await?
        .ok_or(Error::PersonNotFound { id: person_id })?;

    if !person.is_active {
        return Err(Error::PersonNotFound { id: person_id });
    }

    Ok(person)
}

/// Applies a partial update to a person's profile fields.
pub async fn update_person(
    db: &DatabaseConnection,
    person_id: i64,
    update: PersonUpdate,
) -> Result<person::Model> {
    if let Some(amount) = update.default_amount
        && (!amount.is_finite() || amount <= 0.0)
    {
        return Err(Error::InvalidAmount { amount });
    }

    if let Some(ref name) = update.name
        && name.trim().is_empty()
    {
        return Err(Error::InvalidInput {
            message: "Person name cannot be empty".to_string(),
        });
    }

    if let Some(ref frequency) = update.frequency
        && !FREQUENCIES.contains(&frequency.as_str())
    {
        return Err(Error::InvalidInput {
            message: format!("Unknown frequency '{frequency}', expected one of {FREQUENCIES:?}"),
        });
    }

    let person = require_active_person(db, person_id).await?;

    let mut active_model: person::ActiveModel = person.into();
    if let Some(name) = update.name {
        active_model.name = Set(name.trim().to_string());
    }
    if let Some(phone) = update.phone {
        active_model.phone = Set(phone);
    }
    if let Some(location) = update.location {
        active_model.location = Set(location);
    }
    if let Some(photo_path) = update.photo_path {
        active_model.photo_path = Set(photo_path);
    }
    if let Some(amount) = update.default_amount {
        active_model.default_amount = Set(amount);
    }
    if let Some(frequency) = update.frequency {
        active_model.frequency = Set(frequency);
    }
    if let Some(notes) = update.notes {
        active_model.notes = Set(notes);
    }
    active_model.updated_at = Set(Utc::now());

    active_model.update(db).await.map_err(Into::into)
}

/// Soft-deletes a person by flipping `is_active`.
///
/// Their cycles, collections and withdrawals are left untouched so history
/// stays reportable; a hard delete would orphan the ledger trail.
pub async fn deactivate_person(db: &DatabaseConnection, person_id: i64) -> Result<person::Model> {
    let person = require_active_person(db, person_id).await?;

    let mut active_model: person::ActiveModel = person.into();
    active_model.is_active = Set(false);
    active_model.updated_at = Set(Utc::now());

    active_model.update(db).await.map_err(Into::into)
}
