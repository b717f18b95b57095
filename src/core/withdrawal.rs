//! Withdrawal settlement business logic.
//!
//! A full withdrawal settles the entire cycle balance: it writes the
//! immutable withdrawal record, closes the cycle, and opens a fresh one, all
//! in a single transaction so the person can never be left without an open
//! cycle. A partial withdrawal only deducts from the running total and
//! leaves the cycle open; the settled amount for a date range is priced by
//! the aggregation layer and passed in, the engine never interprets ranges.

use crate::{
    core::cycle::{adjust_cycle_total_atomic, get_active_cycle},
    entities::{Withdrawal, cycle, withdrawal},
    errors::{Error, Result},
};
use chrono::Utc;
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*};
use tracing::info;

/// Settles the full cycle balance.
///
/// Atomically: records a withdrawal for the entire `total_amount`, closes
/// the cycle (`is_active = false`, `end_date = today`, `withdrawal_date =
/// now`), and opens a fresh zero-total cycle starting today. Prior
/// collection rows stay attached to the closed cycle for history.
///
/// # Errors
/// [`Error::NoActiveCycle`] when the person has no open cycle,
/// [`Error::PersonNotFound`] for missing or deactivated people.
pub async fn process_withdrawal(
    db: &DatabaseConnection,
    person_id: i64,
) -> Result<(withdrawal::Model, cycle::Model)> {
    let txn = db.begin().await?;

    crate::core::person::require_active_person(&txn, person_id).await?;

    let open_cycle = get_active_cycle(&txn, person_id)
        .await?
        .ok_or(Error::NoActiveCycle { person_id })?;

    let now = Utc::now();
    let today = now.date_naive();

    let settled = withdrawal::ActiveModel {
        person_id: Set(person_id),
        cycle_id: Set(open_cycle.id),
        amount: Set(open_cycle.total_amount),
        date: Set(today),
        notes: Set(None),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    let mut closing: cycle::ActiveModel = open_cycle.into();
    closing.is_active = Set(false);
    closing.end_date = Set(Some(today));
    closing.withdrawal_date = Set(Some(now));
    closing.update(&txn).await?;

    let next_cycle = crate::core::cycle::open_cycle(&txn, person_id, today).await?;

    txn.commit().await?;

    info!(
        person_id,
        amount = settled.amount,
        new_cycle_id = next_cycle.id,
        "full withdrawal settled, cycle rolled over"
    );
    Ok((settled, next_cycle))
}

/// Withdraws part of the cycle balance without closing the cycle.
///
/// Records the withdrawal against the still-open cycle and subtracts the
/// amount from its running total; collections keep accruing into the same
/// cycle afterward.
///
/// # Errors
/// [`Error::InvalidAmount`] for non-finite or non-positive amounts,
/// [`Error::InsufficientBalance`] when the amount exceeds the current
/// total (the total is left untouched), [`Error::NoActiveCycle`] when the
/// person has no open cycle.
pub async fn process_partial_withdrawal(
    db: &DatabaseConnection,
    person_id: i64,
    amount: f64,
    notes: Option<String>,
) -> Result<withdrawal::Model> {
    if !amount.is_finite() || amount <= 0.0 {
        return Err(Error::InvalidAmount { amount });
    }

    let txn = db.begin().await?;

    crate::core::person::require_active_person(&txn, person_id).await?;

    let open_cycle = get_active_cycle(&txn, person_id)
        .await?
        .ok_or(Error::NoActiveCycle { person_id })?;

    if amount > open_cycle.total_amount {
        return Err(Error::InsufficientBalance {
            requested: amount,
            available: open_cycle.total_amount,
        });
    }

    let settled = withdrawal::ActiveModel {
        person_id: Set(person_id),
        cycle_id: Set(open_cycle.id),
        amount: Set(amount),
        date: Set(Utc::now().date_naive()),
        notes: Set(notes),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    adjust_cycle_total_atomic(&txn, open_cycle.id, -amount).await?;

    txn.commit().await?;

    info!(
        person_id,
        amount,
        cycle_id = settled.cycle_id,
        "partial withdrawal settled, cycle stays open"
    );
    Ok(settled)
}

/// Retrieves all withdrawals for a person, newest first.
pub async fn get_withdrawals_for_person(
    db: &DatabaseConnection,
    person_id: i64,
) -> Result<Vec<withdrawal::Model>> {
    Withdrawal::find()
        .filter(withdrawal::Column::PersonId.eq(person_id))
        .order_by_desc(withdrawal::Column::Date)
        .order_by_desc(withdrawal::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Retrieves all withdrawals recorded against a cycle, newest first.
pub async fn get_withdrawals_for_cycle(
    db: &DatabaseConnection,
    cycle_id: i64,
) -> Result<Vec<withdrawal::Model>> {
    Withdrawal::find()
        .filter(withdrawal::Column::CycleId.eq(cycle_id))
        .order_by_desc(withdrawal::Column::Date)
        .order_by_desc(withdrawal::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}
