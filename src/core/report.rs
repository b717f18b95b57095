//! Read-side aggregation logic.
//!
//! Pure rollups over the stored entities: the daily dashboard summary, the
//! per-person status list, inclusive range totals (used to price partial
//! withdrawals), and the monthly date x person pivot grid. Nothing in this
//! module mutates state, and nothing here touches a cycle total directly.

use crate::{
    core::dates::month_bounds,
    entities::{
        Collection, Cycle, collection, collection::STATUS_COLLECTED, cycle, person,
    },
    errors::Result,
};
use chrono::{Datelike, NaiveDate};
use sea_orm::{DatabaseConnection, prelude::*};
use std::collections::{BTreeMap, HashMap, HashSet};

/// Derived status of one person's day. `Pending` is never stored; it is the
/// default view value when no row exists for the date. The variant order is
/// the dashboard sort order: actionable items first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum DayStatus {
    /// No row recorded for the date yet
    Pending,
    /// An amount was collected
    Collected,
    /// The day was explicitly skipped
    Skipped,
}

impl DayStatus {
    /// Derives the status from an optional stored row.
    #[must_use]
    pub fn from_row(row: Option<&collection::Model>) -> Self {
        match row {
            Some(r) if r.status == STATUS_COLLECTED => Self::Collected,
            Some(_) => Self::Skipped,
            None => Self::Pending,
        }
    }

    /// Display label for the status.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Collected => "collected",
            Self::Skipped => "skipped",
        }
    }
}

/// One day's rollup for the dashboard.
#[derive(Debug, Clone)]
pub struct DashboardSummary {
    /// The day being summarized
    pub date: NaiveDate,
    /// Sum of amounts collected on this day
    pub collected_total: f64,
    /// Number of collected-status rows for this day
    pub collected_count: usize,
    /// Number of active people with no row for this day
    pub pending_count: usize,
    /// Sum of the pending people's `default_amount`s - an estimate of what
    /// is still out there today
    pub pending_estimate: f64,
    /// Sum of collected amounts for this day's calendar month
    pub month_total: f64,
}

/// One active person's row in the daily status list.
#[derive(Debug, Clone)]
pub struct PersonDayStatus {
    /// The person
    pub person: person::Model,
    /// Derived status for the day
    pub status: DayStatus,
    /// Amount collected on the day, if any
    pub amount_today: Option<f64>,
    /// The person's open cycle running total (0 when no cycle exists yet)
    pub cycle_total: f64,
}

/// Monthly date x person grid of collected amounts.
#[derive(Debug, Clone)]
pub struct MonthlyPivot {
    /// Year of the pivot
    pub year: i32,
    /// Month of the pivot (1-12)
    pub month: u32,
    /// Dates with at least one collected entry, ascending
    pub dates: Vec<NaiveDate>,
    /// People appearing as grid columns: the active roster plus anyone
    /// deactivated since but with collected entries in the month
    pub people: Vec<person::Model>,
    /// Collected amount per `(date, person_id)` cell
    pub cells: BTreeMap<(NaiveDate, i64), f64>,
    /// Collected total per person for the month
    pub person_totals: BTreeMap<i64, f64>,
    /// Collected total across all people for the month
    pub grand_total: f64,
}

/// Builds the dashboard rollup for one day.
///
/// Collected figures count every stored row for the date; the pending
/// figures are computed over the active roster only, since deactivated
/// people are no longer expected to pay.
pub async fn dashboard_summary(
    db: &DatabaseConnection,
    date: NaiveDate,
) -> Result<DashboardSummary> {
    let todays_rows = Collection::find()
        .filter(collection::Column::Date.eq(date))
        .all(db)
        .await?;

    let mut collected_total = 0.0;
    let mut collected_count = 0;
    let mut people_with_rows: HashSet<i64> = HashSet::new();
    for row in &todays_rows {
        people_with_rows.insert(row.person_id);
        if row.status == STATUS_COLLECTED {
            collected_total += row.amount.unwrap_or(0.0);
            collected_count += 1;
        }
    }

    let mut pending_count = 0;
    let mut pending_estimate = 0.0;
    for person in crate::core::person::get_active_people(db).await? {
        if !people_with_rows.contains(&person.id) {
            pending_count += 1;
            pending_estimate += person.default_amount;
        }
    }

    let (month_first, month_last) = month_bounds(date.year(), date.month())?;
    let month_rows = Collection::find()
        .filter(collection::Column::Status.eq(STATUS_COLLECTED))
        .filter(collection::Column::Date.between(month_first, month_last))
        .all(db)
        .await?;
    let month_total = month_rows.iter().filter_map(|row| row.amount).sum();

    Ok(DashboardSummary {
        date,
        collected_total,
        collected_count,
        pending_count,
        pending_estimate,
        month_total,
    })
}

/// Lists every active person with their derived status for the day and
/// their open cycle total.
///
/// Sorted pending before collected before skipped, then alphabetically by
/// name, so actionable items surface first.
pub async fn daily_statuses(
    db: &DatabaseConnection,
    date: NaiveDate,
) -> Result<Vec<PersonDayStatus>> {
    let people = crate::core::person::get_active_people(db).await?;

    let todays_rows: HashMap<i64, collection::Model> = Collection::find()
        .filter(collection::Column::Date.eq(date))
        .all(db)
        .await?
        .into_iter()
        .map(|row| (row.person_id, row))
        .collect();

    let open_totals: HashMap<i64, f64> = Cycle::find()
        .filter(cycle::Column::IsActive.eq(true))
        .all(db)
        .await?
        .into_iter()
        .map(|c| (c.person_id, c.total_amount))
        .collect();

    let mut statuses: Vec<PersonDayStatus> = people
        .into_iter()
        .map(|person| {
            let row = todays_rows.get(&person.id);
            let status = DayStatus::from_row(row);
            let amount_today = row.and_then(|r| r.amount);
            let cycle_total = open_totals.get(&person.id).copied().unwrap_or(0.0);
            PersonDayStatus {
                person,
                status,
                amount_today,
                cycle_total,
            }
        })
        .collect();

    statuses.sort_by(|a, b| {
        a.status
            .cmp(&b.status)
            .then_with(|| a.person.name.to_lowercase().cmp(&b.person.name.to_lowercase()))
    });

    Ok(statuses)
}

/// Sums a person's collected amounts within an inclusive date range.
///
/// This prices a date-ranged partial withdrawal before it is confirmed; the
/// result is handed to the withdrawal operation as a plain amount.
pub async fn range_collected_total(
    db: &DatabaseConnection,
    person_id: i64,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<f64> {
    let rows = Collection::find()
        .filter(collection::Column::PersonId.eq(person_id))
        .filter(collection::Column::Status.eq(STATUS_COLLECTED))
        .filter(collection::Column::Date.between(from, to))
        .all(db)
        .await?;

    Ok(rows.iter().filter_map(|row| row.amount).sum())
}

/// Builds the date x person pivot of collected amounts for a calendar month.
///
/// Only dates with at least one collected entry appear as rows. Columns are
/// the active roster plus anyone since deactivated who has collected
/// entries in the month, so printed reports stay complete.
pub async fn monthly_pivot(
    db: &DatabaseConnection,
    year: i32,
    month: u32,
) -> Result<MonthlyPivot> {
    let (first, last) = month_bounds(year, month)?;

    let rows = Collection::find()
        .filter(collection::Column::Status.eq(STATUS_COLLECTED))
        .filter(collection::Column::Date.between(first, last))
        .all(db)
        .await?;

    let mut cells: BTreeMap<(NaiveDate, i64), f64> = BTreeMap::new();
    let mut person_totals: BTreeMap<i64, f64> = BTreeMap::new();
    let mut dates: Vec<NaiveDate> = Vec::new();
    let mut grand_total = 0.0;

    for row in &rows {
        let amount = row.amount.unwrap_or(0.0);
        *cells.entry((row.date, row.person_id)).or_insert(0.0) += amount;
        *person_totals.entry(row.person_id).or_insert(0.0) += amount;
        grand_total += amount;
        if !dates.contains(&row.date) {
            dates.push(row.date);
        }
    }
    dates.sort_unstable();

    let mut people = crate::core::person::get_active_people(db).await?;
    let listed: Vec<i64> = people.iter().map(|p| p.id).collect();
    for person_id in person_totals.keys() {
        if !listed.contains(person_id)
            && let Some(extra) = crate::core::person::get_person_by_id(db, *person_id).await?
        {
            people.push(extra);
        }
    }
    people.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));

    Ok(MonthlyPivot {
        year,
        month,
        dates,
        people,
        cells,
        person_totals,
        grand_total,
    })
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::core::{collection as collection_ops, person as person_ops, withdrawal};
    use crate::test_utils::*;

    #[tokio::test]
    async fn test_dashboard_summary_empty_day() -> Result<()> {
        let db = setup_test_db().await?;
        create_test_person(&db, "Asha").await?;
        create_test_person(&db, "Binu").await?;

        let summary = dashboard_summary(&db, test_date(1)).await?;
        assert_eq!(summary.collected_total, 0.0);
        assert_eq!(summary.collected_count, 0);
        assert_eq!(summary.pending_count, 2);
        assert_eq!(summary.pending_estimate, 400.0); // 2 x default 200
        assert_eq!(summary.month_total, 0.0);

        Ok(())
    }

    #[tokio::test]
    async fn test_dashboard_summary_mixed_day() -> Result<()> {
        let db = setup_test_db().await?;
        let (asha, _) = create_test_person(&db, "Asha").await?;
        let (binu, _) = create_test_person(&db, "Binu").await?;
        create_test_person(&db, "Chitra").await?;

        collection_ops::record_collection(&db, asha.id, 150.0, test_date(5)).await?;
        collection_ops::skip_collection(&db, binu.id, test_date(5)).await?;
        // An earlier day in the same month counts toward month_total only
        collection_ops::record_collection(&db, asha.id, 100.0, test_date(2)).await?;

        let summary = dashboard_summary(&db, test_date(5)).await?;
        assert_eq!(summary.collected_total, 150.0);
        assert_eq!(summary.collected_count, 1);
        // Chitra has no row today; Binu's skip is a row, not pending
        assert_eq!(summary.pending_count, 1);
        assert_eq!(summary.pending_estimate, 200.0);
        assert_eq!(summary.month_total, 250.0);

        Ok(())
    }

    #[tokio::test]
    async fn test_daily_statuses_order_and_content() -> Result<()> {
        let db = setup_test_db().await?;
        let (asha, _) = create_test_person(&db, "Asha").await?;
        let (binu, _) = create_test_person(&db, "Binu").await?;
        let (_chitra, _) = create_test_person(&db, "Chitra").await?;
        let (_dev, _) = create_test_person(&db, "Dev").await?;

        collection_ops::record_collection(&db, asha.id, 150.0, test_date(5)).await?;
        collection_ops::skip_collection(&db, binu.id, test_date(5)).await?;

        let statuses = daily_statuses(&db, test_date(5)).await?;
        assert_eq!(statuses.len(), 4);

        // Pending first (alphabetical), then collected, then skipped
        assert_eq!(statuses[0].person.name, "Chitra");
        assert_eq!(statuses[0].status, DayStatus::Pending);
        assert_eq!(statuses[1].person.name, "Dev");
        assert_eq!(statuses[1].status, DayStatus::Pending);
        assert_eq!(statuses[2].person.name, "Asha");
        assert_eq!(statuses[2].status, DayStatus::Collected);
        assert_eq!(statuses[2].amount_today, Some(150.0));
        assert_eq!(statuses[2].cycle_total, 150.0);
        assert_eq!(statuses[3].person.name, "Binu");
        assert_eq!(statuses[3].status, DayStatus::Skipped);
        assert_eq!(statuses[3].amount_today, None);

        Ok(())
    }

    #[tokio::test]
    async fn test_range_collected_total_inclusive() -> Result<()> {
        let (db, person, _cycle) = setup_with_person().await?;

        collection_ops::record_collection(&db, person.id, 100.0, test_date(1)).await?;
        collection_ops::record_collection(&db, person.id, 200.0, test_date(2)).await?;
        collection_ops::skip_collection(&db, person.id, test_date(3)).await?;
        collection_ops::record_collection(&db, person.id, 300.0, test_date(4)).await?;

        // Inclusive on both ends, skips contribute nothing
        let total = range_collected_total(&db, person.id, test_date(1), test_date(3)).await?;
        assert_eq!(total, 300.0);

        let total = range_collected_total(&db, person.id, test_date(1), test_date(4)).await?;
        assert_eq!(total, 600.0);

        let total = range_collected_total(&db, person.id, test_date(5), test_date(9)).await?;
        assert_eq!(total, 0.0);

        Ok(())
    }

    #[tokio::test]
    async fn test_range_total_prices_partial_withdrawal() -> Result<()> {
        let (db, person, _cycle) = setup_with_person().await?;

        collection_ops::record_collection(&db, person.id, 100.0, test_date(1)).await?;
        collection_ops::record_collection(&db, person.id, 200.0, test_date(10)).await?;

        // Settle everything up to day 5
        let priced = range_collected_total(&db, person.id, test_date(1), test_date(5)).await?;
        assert_eq!(priced, 100.0);

        withdrawal::process_partial_withdrawal(&db, person.id, priced, None).await?;
        let open = crate::core::cycle::get_active_cycle(&db, person.id)
            .await?
            .unwrap();
        assert_eq!(open.total_amount, 200.0);

        Ok(())
    }

    #[tokio::test]
    async fn test_monthly_pivot_grid() -> Result<()> {
        let db = setup_test_db().await?;
        let (asha, _) = create_test_person(&db, "Asha").await?;
        let (binu, _) = create_test_person(&db, "Binu").await?;

        collection_ops::record_collection(&db, asha.id, 100.0, test_date(1)).await?;
        collection_ops::record_collection(&db, binu.id, 50.0, test_date(1)).await?;
        collection_ops::record_collection(&db, asha.id, 200.0, test_date(3)).await?;
        collection_ops::skip_collection(&db, binu.id, test_date(3)).await?;

        let pivot = monthly_pivot(&db, 2025, 1).await?;

        assert_eq!(pivot.dates, vec![test_date(1), test_date(3)]);
        assert_eq!(pivot.people.len(), 2);
        assert_eq!(pivot.cells.get(&(test_date(1), asha.id)), Some(&100.0));
        assert_eq!(pivot.cells.get(&(test_date(1), binu.id)), Some(&50.0));
        assert_eq!(pivot.cells.get(&(test_date(3), asha.id)), Some(&200.0));
        // Skips never appear as cells
        assert_eq!(pivot.cells.get(&(test_date(3), binu.id)), None);

        assert_eq!(pivot.person_totals.get(&asha.id), Some(&300.0));
        assert_eq!(pivot.person_totals.get(&binu.id), Some(&50.0));
        assert_eq!(pivot.grand_total, 350.0);

        Ok(())
    }

    #[tokio::test]
    async fn test_monthly_pivot_includes_deactivated_with_entries() -> Result<()> {
        let db = setup_test_db().await?;
        let (asha, _) = create_test_person(&db, "Asha").await?;
        let (binu, _) = create_test_person(&db, "Binu").await?;

        collection_ops::record_collection(&db, binu.id, 75.0, test_date(2)).await?;
        person_ops::deactivate_person(&db, binu.id).await?;

        let pivot = monthly_pivot(&db, 2025, 1).await?;

        // Binu is deactivated but collected this month, so they stay listed
        assert_eq!(pivot.people.len(), 2);
        assert!(pivot.people.iter().any(|p| p.id == binu.id));
        assert!(pivot.people.iter().any(|p| p.id == asha.id));
        assert_eq!(pivot.grand_total, 75.0);

        Ok(())
    }

    #[tokio::test]
    async fn test_monthly_pivot_empty_month() -> Result<()> {
        let db = setup_test_db().await?;
        create_test_person(&db, "Asha").await?;

        let pivot = monthly_pivot(&db, 2025, 6).await?;
        assert!(pivot.dates.is_empty());
        assert!(pivot.cells.is_empty());
        assert_eq!(pivot.grand_total, 0.0);
        // Active roster still forms the columns
        assert_eq!(pivot.people.len(), 1);

        Ok(())
    }

    #[test]
    fn test_day_status_ordering() {
        assert!(DayStatus::Pending < DayStatus::Collected);
        assert!(DayStatus::Collected < DayStatus::Skipped);
        assert_eq!(DayStatus::Pending.as_str(), "pending");
        assert_eq!(DayStatus::Collected.as_str(), "collected");
        assert_eq!(DayStatus::Skipped.as_str(), "skipped");
    }

    #[test]
    fn test_day_status_from_row_none_is_pending() {
        assert_eq!(DayStatus::from_row(None), DayStatus::Pending);
    }
}
