//! Collection recording business logic.
//!
//! One row exists per person per calendar day, holding either a collected
//! amount or a skip. Recording is upsert-style: re-entering the same date
//! replaces the prior row and applies only the *delta* between the new and
//! previously counted amount to the cycle total. A full re-sum would
//! silently overwrite manual total corrections, so it is never done here.
//!
//! Skip policy: skipping a date that currently holds a collected amount
//! implicitly reverses that amount from the cycle total, so the stored total
//! never counts a row shown as skipped.

use crate::{
    core::cycle::{adjust_cycle_total_atomic, ensure_active_cycle, get_active_cycle},
    entities::{
        Collection, collection,
        collection::{STATUS_COLLECTED, STATUS_SKIPPED},
    },
    errors::{Error, Result},
};
use chrono::{NaiveDate, Utc};
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*};
use tracing::{info, warn};

/// Finds the single collection row for `(person, date)`, if any.
pub async fn get_collection_for_date<C>(
    db: &C,
    person_id: i64,
    date: NaiveDate,
) -> Result<Option<collection::Model>>
where
    C: ConnectionTrait,
{
    Collection::find()
        .filter(collection::Column::PersonId.eq(person_id))
        .filter(collection::Column::Date.eq(date))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Retrieves all collection rows attached to a cycle, oldest first.
///
/// Works for closed cycles too; history stays queryable after a full
/// withdrawal.
pub async fn get_collections_by_cycle(
    db: &DatabaseConnection,
    cycle_id: i64,
) -> Result<Vec<collection::Model>> {
    Collection::find()
        .filter(collection::Column::CycleId.eq(cycle_id))
        .order_by_asc(collection::Column::Date)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Retrieves a person's full collection history across all cycles, oldest first.
pub async fn get_collections_for_person(
    db: &DatabaseConnection,
    person_id: i64,
) -> Result<Vec<collection::Model>> {
    Collection::find()
        .filter(collection::Column::PersonId.eq(person_id))
        .order_by_asc(collection::Column::Date)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Records a collected amount for `(person, date)` and applies the delta to
/// the active cycle's total.
///
/// Upsert semantics: any prior row for the date (collected or skipped) is
/// replaced, never duplicated. The cycle total moves by `amount -
/// previously_counted`, so re-entering the same day twice counts once. An
/// amount of zero is accepted as an edge value but logged. Everything
/// happens in one database transaction.
pub async fn record_collection(
    db: &DatabaseConnection,
    person_id: i64,
    amount: f64,
    date: NaiveDate,
) -> Result<collection::Model> {
    if !amount.is_finite() || amount < 0.0 {
        return Err(Error::InvalidAmount { amount });
    }
    if amount == 0.0 {
        warn!(person_id, %date, "recording zero-amount collection");
    }

    let txn = db.begin().await?;

    let cycle = ensure_active_cycle(&txn, person_id, date).await?;

    let existing = get_collection_for_date(&txn, person_id, date).await?;

    // Only an amount already counted in the *open* cycle's total may offset
    // the delta. A row left on a closed cycle was settled by its withdrawal.
    let existing_amount = existing
        .as_ref()
        .filter(|row| row.status == STATUS_COLLECTED && row.cycle_id == cycle.id)
        .and_then(|row| row.amount)
        .unwrap_or(0.0);

    let saved = if let Some(row) = existing {
        let mut active_model: collection::ActiveModel = row.into();
        active_model.cycle_id = Set(cycle.id);
        active_model.amount = Set(Some(amount));
        active_model.status = Set(STATUS_COLLECTED.to_string());
        active_model.update(&txn).await?
    } else {
        collection::ActiveModel {
            person_id: Set(person_id),
            cycle_id: Set(cycle.id),
            date: Set(date),
            amount: Set(Some(amount)),
            status: Set(STATUS_COLLECTED.to_string()),
            notes: Set(None),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(&txn)
        .await?
    };

    // A negative delta (re-recording a lower amount) goes through the
    // clamped reversal: a partial withdrawal may already have consumed part
    // of the original amount, and the total must never go negative.
    let delta = amount - existing_amount;
    if delta > 0.0 {
        adjust_cycle_total_atomic(&txn, cycle.id, delta).await?;
    } else if delta < 0.0 {
        crate::core::cycle::reverse_from_cycle_total(&txn, &cycle, -delta).await?;
    }

    txn.commit().await?;
    Ok(saved)
}

/// Marks `(person, date)` as skipped.
///
/// If the date currently holds an amount counted in the open cycle, that
/// amount is reversed from the cycle total first, so the total and the row
/// can never disagree about a skipped day.
pub async fn skip_collection(
    db: &DatabaseConnection,
    person_id: i64,
    date: NaiveDate,
) -> Result<collection::Model> {
    let txn = db.begin().await?;

    let cycle = ensure_active_cycle(&txn, person_id, date).await?;

    let existing = get_collection_for_date(&txn, person_id, date).await?;

    let counted_amount = existing
        .as_ref()
        .filter(|row| row.status == STATUS_COLLECTED && row.cycle_id == cycle.id)
        .and_then(|row| row.amount)
        .unwrap_or(0.0);

    if counted_amount > 0.0 {
        info!(
            person_id,
            %date,
            amount = counted_amount,
            "skip over a collected day, reversing its amount"
        );
        crate::core::cycle::reverse_from_cycle_total(&txn, &cycle, counted_amount).await?;
    }

    let saved = if let Some(row) = existing {
        let mut active_model: collection::ActiveModel = row.into();
        active_model.cycle_id = Set(cycle.id);
        active_model.amount = Set(None);
        active_model.status = Set(STATUS_SKIPPED.to_string());
        active_model.update(&txn).await?
    } else {
        collection::ActiveModel {
            person_id: Set(person_id),
            cycle_id: Set(cycle.id),
            date: Set(date),
            amount: Set(None),
            status: Set(STATUS_SKIPPED.to_string()),
            notes: Set(None),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(&txn)
        .await?
    };

    txn.commit().await?;
    Ok(saved)
}

/// Removes the `(person, date)` row entirely, reversing a collected amount
/// from the open cycle's total (symmetric with [`record_collection`]).
///
/// Returns the removed row's collected amount, `None` when the row was
/// skipped or absent. The row is hard-deleted, not flagged.
pub async fn undo_collection(
    db: &DatabaseConnection,
    person_id: i64,
    date: NaiveDate,
) -> Result<Option<f64>> {
    let txn = db.begin().await?;

    crate::core::person::require_active_person(&txn, person_id).await?;

    let Some(row) = get_collection_for_date(&txn, person_id, date).await? else {
        txn.commit().await?;
        return Ok(None);
    };

    let mut reversed = None;
    if row.status == STATUS_COLLECTED
        && let Some(amount) = row.amount
    {
        // Only the open cycle's total reflects this amount; a row on a
        // closed cycle was already settled by its withdrawal.
        if let Some(cycle) = get_active_cycle(&txn, person_id).await?
            && cycle.id == row.cycle_id
        {
            crate::core::cycle::reverse_from_cycle_total(&txn, &cycle, amount).await?;
        }
        reversed = Some(amount);
    }

    row.delete(&txn).await?;

    txn.commit().await?;
    Ok(reversed)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::core::cycle;
    use crate::test_utils::*;
    use sea_orm::{DatabaseBackend, MockDatabase};

    #[tokio::test]
    async fn test_record_collection_validation() -> Result<()> {
        let db = MockDatabase::new(DatabaseBackend::Sqlite).into_connection();

        let result = record_collection(&db, 1, -5.0, test_date(1)).await;
        assert!(matches!(result, Err(Error::InvalidAmount { amount: -5.0 })));

        let result = record_collection(&db, 1, f64::NAN, test_date(1)).await;
        assert!(matches!(result, Err(Error::InvalidAmount { amount: _ })));

        let result = record_collection(&db, 1, f64::INFINITY, test_date(1)).await;
        assert!(matches!(result, Err(Error::InvalidAmount { amount: _ })));

        Ok(())
    }

    #[tokio::test]
    async fn test_record_collection_unknown_person() -> Result<()> {
        let db = setup_test_db().await?;

        let result = record_collection(&db, 999, 100.0, test_date(1)).await;
        assert!(matches!(result, Err(Error::PersonNotFound { id: 999 })));

        Ok(())
    }

    #[tokio::test]
    async fn test_record_collection_updates_total() -> Result<()> {
        let (db, person, cycle) = setup_with_person().await?;

        let row = record_collection(&db, person.id, 200.0, test_date(1)).await?;
        assert_eq!(row.amount, Some(200.0));
        assert_eq!(row.status, STATUS_COLLECTED);
        assert_eq!(row.cycle_id, cycle.id);

        let updated = cycle::get_active_cycle(&db, person.id).await?.unwrap();
        assert_eq!(updated.total_amount, 200.0);

        Ok(())
    }

    #[tokio::test]
    async fn test_record_collection_zero_amount_edge() -> Result<()> {
        let (db, person, _cycle) = setup_with_person().await?;

        // Zero is permitted as an edge value
        let row = record_collection(&db, person.id, 0.0, test_date(1)).await?;
        assert_eq!(row.amount, Some(0.0));

        let total = cycle::get_active_cycle(&db, person.id).await?.unwrap();
        assert_eq!(total.total_amount, 0.0);

        Ok(())
    }

    #[tokio::test]
    async fn test_idempotent_re_collection() -> Result<()> {
        let (db, person, _cycle) = setup_with_person().await?;

        record_collection(&db, person.id, 100.0, test_date(1)).await?;
        record_collection(&db, person.id, 150.0, test_date(1)).await?;

        // Exactly one row for the date, holding the latest amount
        let rows = Collection::find()
            .filter(collection::Column::PersonId.eq(person.id))
            .all(&db)
            .await?;
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].amount, Some(150.0));

        // Net +150, not +250
        let total = cycle::get_active_cycle(&db, person.id).await?.unwrap();
        assert_eq!(total.total_amount, 150.0);

        Ok(())
    }

    #[tokio::test]
    async fn test_record_replaces_skipped_row() -> Result<()> {
        let (db, person, _cycle) = setup_with_person().await?;

        skip_collection(&db, person.id, test_date(1)).await?;
        let row = record_collection(&db, person.id, 120.0, test_date(1)).await?;

        assert_eq!(row.status, STATUS_COLLECTED);
        assert_eq!(row.amount, Some(120.0));

        let rows = get_collections_for_person(&db, person.id).await?;
        assert_eq!(rows.len(), 1);

        // A skipped row contributed nothing, so the full amount is added
        let total = cycle::get_active_cycle(&db, person.id).await?.unwrap();
        assert_eq!(total.total_amount, 120.0);

        Ok(())
    }

    #[tokio::test]
    async fn test_skip_collection_plain() -> Result<()> {
        let (db, person, _cycle) = setup_with_person().await?;

        let row = skip_collection(&db, person.id, test_date(2)).await?;
        assert_eq!(row.status, STATUS_SKIPPED);
        assert_eq!(row.amount, None);

        let total = cycle::get_active_cycle(&db, person.id).await?.unwrap();
        assert_eq!(total.total_amount, 0.0);

        Ok(())
    }

    #[tokio::test]
    async fn test_skip_over_collected_reverses_amount() -> Result<()> {
        let (db, person, _cycle) = setup_with_person().await?;

        record_collection(&db, person.id, 200.0, test_date(1)).await?;
        let row = skip_collection(&db, person.id, test_date(1)).await?;

        assert_eq!(row.status, STATUS_SKIPPED);
        assert_eq!(row.amount, None);

        // The prior amount no longer counts toward the total
        let total = cycle::get_active_cycle(&db, person.id).await?.unwrap();
        assert_eq!(total.total_amount, 0.0);

        Ok(())
    }

    #[tokio::test]
    async fn test_undo_symmetry() -> Result<()> {
        let (db, person, _cycle) = setup_with_person().await?;

        record_collection(&db, person.id, 200.0, test_date(1)).await?;
        let reversed = undo_collection(&db, person.id, test_date(1)).await?;
        assert_eq!(reversed, Some(200.0));

        // Row is gone, total restored
        let rows = get_collections_for_person(&db, person.id).await?;
        assert!(rows.is_empty());

        let total = cycle::get_active_cycle(&db, person.id).await?.unwrap();
        assert_eq!(total.total_amount, 0.0);

        Ok(())
    }

    #[tokio::test]
    async fn test_undo_of_skipped_day_deletes_only() -> Result<()> {
        let (db, person, _cycle) = setup_with_person().await?;

        record_collection(&db, person.id, 100.0, test_date(1)).await?;
        skip_collection(&db, person.id, test_date(2)).await?;

        let reversed = undo_collection(&db, person.id, test_date(2)).await?;
        assert_eq!(reversed, None);

        let rows = get_collections_for_person(&db, person.id).await?;
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].date, test_date(1));

        let total = cycle::get_active_cycle(&db, person.id).await?.unwrap();
        assert_eq!(total.total_amount, 100.0);

        Ok(())
    }

    #[tokio::test]
    async fn test_undo_without_row_is_noop() -> Result<()> {
        let (db, person, _cycle) = setup_with_person().await?;

        let reversed = undo_collection(&db, person.id, test_date(9)).await?;
        assert_eq!(reversed, None);

        Ok(())
    }

    #[tokio::test]
    async fn test_lower_re_record_after_partial_withdrawal_clamps_at_zero() -> Result<()> {
        let (db, person, _cycle) = setup_with_person().await?;

        record_collection(&db, person.id, 200.0, test_date(1)).await?;
        crate::core::withdrawal::process_partial_withdrawal(&db, person.id, 150.0, None).await?;

        // Only 50 remains; replacing the day's 200 with 100 must floor the
        // total at zero, not drive it to -50
        let row = record_collection(&db, person.id, 100.0, test_date(1)).await?;
        assert_eq!(row.amount, Some(100.0));
        assert_eq!(row.status, STATUS_COLLECTED);

        let total = cycle::get_active_cycle(&db, person.id).await?.unwrap();
        assert_eq!(total.total_amount, 0.0);

        Ok(())
    }

    #[tokio::test]
    async fn test_skip_after_partial_withdrawal_clamps_at_zero() -> Result<()> {
        let (db, person, _cycle) = setup_with_person().await?;

        record_collection(&db, person.id, 200.0, test_date(1)).await?;
        crate::core::withdrawal::process_partial_withdrawal(&db, person.id, 150.0, None).await?;

        // Skipping the day reverses its amount, capped at the remaining 50
        let row = skip_collection(&db, person.id, test_date(1)).await?;
        assert_eq!(row.status, STATUS_SKIPPED);
        assert_eq!(row.amount, None);

        let total = cycle::get_active_cycle(&db, person.id).await?.unwrap();
        assert_eq!(total.total_amount, 0.0);

        Ok(())
    }

    #[tokio::test]
    async fn test_undo_after_partial_withdrawal_clamps_at_zero() -> Result<()> {
        let (db, person, _cycle) = setup_with_person().await?;

        record_collection(&db, person.id, 200.0, test_date(1)).await?;
        crate::core::withdrawal::process_partial_withdrawal(&db, person.id, 150.0, None).await?;

        // Only 50 remains in the cycle; undoing the 200 must not go negative
        let reversed = undo_collection(&db, person.id, test_date(1)).await?;
        assert_eq!(reversed, Some(200.0));

        let total = cycle::get_active_cycle(&db, person.id).await?.unwrap();
        assert_eq!(total.total_amount, 0.0);

        Ok(())
    }

    #[tokio::test]
    async fn test_lazy_cycle_creation_on_record() -> Result<()> {
        let (db, person, cycle) = setup_with_person().await?;

        // Simulate imported data: close the cycle out-of-band
        let mut active_model: crate::entities::cycle::ActiveModel = cycle.into();
        active_model.is_active = Set(false);
        active_model.update(&db).await?;

        let row = record_collection(&db, person.id, 80.0, test_date(3)).await?;

        let fresh = cycle::get_active_cycle(&db, person.id).await?.unwrap();
        assert_eq!(row.cycle_id, fresh.id);
        assert_eq!(fresh.total_amount, 80.0);

        Ok(())
    }

    #[tokio::test]
    async fn test_collections_ordered_by_date() -> Result<()> {
        let (db, person, cycle) = setup_with_person().await?;

        record_collection(&db, person.id, 30.0, test_date(3)).await?;
        record_collection(&db, person.id, 10.0, test_date(1)).await?;
        record_collection(&db, person.id, 20.0, test_date(2)).await?;

        let rows = get_collections_by_cycle(&db, cycle.id).await?;
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].date, test_date(1));
        assert_eq!(rows[1].date, test_date(2));
        assert_eq!(rows[2].date, test_date(3));

        Ok(())
    }
}
