//! Cycle lifecycle business logic.
//!
//! A person always has exactly one open cycle accruing their collections.
//! This module owns cycle lookup, lazy creation, the atomic running-total
//! delta update every other ledger operation goes through, the manual
//! correction path, and the reconciliation diagnostic that compares a stored
//! total against the sum of its collected rows.

use crate::{
    entities::{Cycle, collection, cycle},
    errors::{Error, Result},
};
use chrono::NaiveDate;
use sea_orm::{QueryOrder, Set, prelude::*};
use tracing::{info, warn};

/// Finds the person's currently open cycle, if any.
///
/// The unique-active-cycle invariant means this query matches at most one row.
pub async fn get_active_cycle<C>(db: &C, person_id: i64) -> Result<Option<cycle::Model>>
where
    C: ConnectionTrait,
{
    Cycle::find()
        .filter(cycle::Column::PersonId.eq(person_id))
        .filter(cycle::Column::IsActive.eq(true))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Returns the person's open cycle, creating one lazily when absent.
///
/// Lazy creation defends against data imported without an explicit cycle.
/// Fails with [`Error::PersonNotFound`] for missing or deactivated people.
pub async fn ensure_active_cycle<C>(
    db: &C,
    person_id: i64,
    start_date: NaiveDate,
) -> Result<cycle::Model>
where
    C: ConnectionTrait,
{
    crate::core::person::require_active_person(db, person_id).await?;

    if let Some(existing) = get_active_cycle(db, person_id).await? {
        return Ok(existing);
    }

    info!(person_id, "no active cycle found, creating one lazily");
    open_cycle(db, person_id, start_date).await
}

/// Inserts a fresh open cycle with a zero total.
///
/// Callers are responsible for the unique-active-cycle invariant: the
/// person's previous cycle must already be closed (or absent).
pub(crate) async fn open_cycle<C>(
    db: &C,
    person_id: i64,
    start_date: NaiveDate,
) -> Result<cycle::Model>
where
    C: ConnectionTrait,
{
    cycle::ActiveModel {
        person_id: Set(person_id),
        start_date: Set(start_date),
        end_date: Set(None),
        total_amount: Set(0.0),
        is_active: Set(true),
        withdrawal_date: Set(None),
        notes: Set(None),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(Into::into)
}

/// Retrieves all cycles for a person, newest first.
pub async fn get_cycles_for_person(
    db: &DatabaseConnection,
    person_id: i64,
) -> Result<Vec<cycle::Model>> {
    Cycle::find()
        .filter(cycle::Column::PersonId.eq(person_id))
        .order_by_desc(cycle::Column::StartDate)
        .order_by_desc(cycle::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Adjusts a cycle's running total by atomically adding a delta.
///
/// Uses a single database-level `UPDATE cycles SET total_amount =
/// total_amount + delta WHERE id = ?` instead of read-modify-write, so a
/// concurrent reader can never observe a half-applied total.
///
/// # Arguments
/// * `db` - Database connection or transaction
/// * `cycle_id` - ID of the cycle to update
/// * `delta` - Amount to add to the total (negative to subtract)
///
/// # Returns
/// The updated cycle model
pub async fn adjust_cycle_total_atomic<C>(
    db: &C,
    cycle_id: i64,
    delta: f64,
) -> Result<cycle::Model>
where
    C: ConnectionTrait,
{
    use sea_orm::sea_query::Expr;

    // First verify the cycle exists
    let _cycle = Cycle::find_by_id(cycle_id)
        .one(db)
        .await?
        .ok_or(Error::CycleNotFound { id: cycle_id })?;

    Cycle::update_many()
        .col_expr(
            cycle::Column::TotalAmount,
            Expr::col(cycle::Column::TotalAmount).add(delta),
        )
        .filter(cycle::Column::Id.eq(cycle_id))
        .exec(db)
        .await?;

    Cycle::find_by_id(cycle_id)
        .one(db)
        .await?
        .ok_or(Error::CycleNotFound { id: cycle_id })
}

/// Subtracts a reversal amount from a cycle total, clamping at zero.
///
/// A prior partial withdrawal may already have consumed part of the amount
/// being reversed; the total must never go negative, so the applied reversal
/// is capped at the current total. Returns the amount actually subtracted.
pub(crate) async fn reverse_from_cycle_total<C>(
    db: &C,
    current: &cycle::Model,
    amount: f64,
) -> Result<f64>
where
    C: ConnectionTrait,
{
    let applied = amount.min(current.total_amount).max(0.0);
    if applied < amount {
        warn!(
            cycle_id = current.id,
            amount,
            available = current.total_amount,
            "reversal exceeds cycle total, clamping at zero"
        );
    }
    if applied > 0.0 {
        adjust_cycle_total_atomic(db, current.id, -applied).await?;
    }
    Ok(applied)
}

/// Manually overwrites a cycle's total and/or start date.
///
/// Correction path for historical entry errors (e.g. the app was adopted
/// mid-relationship), bypassing the delta logic. Only non-negativity of the
/// total is enforced; everything else is the operator's responsibility.
pub async fn update_cycle_data(
    db: &DatabaseConnection,
    cycle_id: i64,
    total_amount: Option<f64>,
    start_date: Option<NaiveDate>,
) -> Result<cycle::Model> {
    if let Some(total) = total_amount
        && (!total.is_finite() || total < 0.0)
    {
        return Err(Error::InvalidAmount { amount: total });
    }

    let cycle = Cycle::find_by_id(cycle_id)
        .one(db)
        .await?
        .ok_or(Error::CycleNotFound { id: cycle_id })?;

    let mut active_model: cycle::ActiveModel = cycle.into();
    if let Some(total) = total_amount {
        active_model.total_amount = Set(total);
    }
    if let Some(start) = start_date {
        active_model.start_date = Set(start);
    }
    active_model.update(db).await.map_err(Into::into)
}

/// Result of comparing a cycle's stored total against its collected rows.
///
/// Totals are delta-maintained, so a manual correction (or a skipped write
/// path bug) makes them drift from the sum of collection rows. The stored
/// total stays the source of truth; this is a diagnostic only.
#[derive(Debug, Clone)]
pub struct CycleReconciliation {
    /// The cycle that was checked
    pub cycle_id: i64,
    /// The delta-maintained total stored on the cycle row
    pub stored_total: f64,
    /// Sum of this cycle's collected-status row amounts
    pub collected_sum: f64,
}

impl CycleReconciliation {
    /// Stored total minus the collected-row sum. Non-zero drift is expected
    /// after manual corrections or partial withdrawals.
    #[must_use]
    pub fn drift(&self) -> f64 {
        self.stored_total - self.collected_sum
    }

    /// Whether the stored total matches the collected-row sum.
    #[must_use]
    pub fn is_balanced(&self) -> bool {
        self.drift().abs() < 1e-9
    }
}

/// Recomputes the sum of a cycle's collected rows for comparison against
/// its stored total. Never mutates anything.
pub async fn verify_cycle_total(
    db: &DatabaseConnection,
    cycle_id: i64,
) -> Result<CycleReconciliation> {
    let cycle = Cycle::find_by_id(cycle_id)
        .one(db)
        .await?
        .ok_or(Error::CycleNotFound { id: cycle_id })?;

    let rows = crate::entities::Collection::find()
        .filter(collection::Column::CycleId.eq(cycle_id))
        .filter(collection::Column::Status.eq(collection::STATUS_COLLECTED))
        .all(db)
        .await?;

    let collected_sum = rows.iter().filter_map(|row| row.amount).sum();

    Ok(CycleReconciliation {
        cycle_id,
        stored_total: cycle.total_amount,
        collected_sum,
    })
}
