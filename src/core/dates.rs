//! Date parsing and calendar helpers.
//!
//! Storage and engine APIs use ISO `YYYY-MM-DD` dates throughout. Some input
//! surfaces hand us `DD-MM-YYYY` instead, so the boundary parser accepts both
//! and converts before anything reaches the ledger engine.

use crate::errors::{Error, Result};
use chrono::NaiveDate;

/// Parses a user-supplied date in either `YYYY-MM-DD` or `DD-MM-YYYY` form.
///
/// # Errors
/// Returns [`Error::InvalidDate`] when the input matches neither format.
pub fn parse_input_date(value: &str) -> Result<NaiveDate> {
    let trimmed = value.trim();
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(trimmed, "%d-%m-%Y"))
        .map_err(|_| Error::InvalidDate {
            value: value.to_string(),
        })
}

/// Returns the first and last day of the given calendar month.
///
/// # Errors
/// Returns [`Error::InvalidDate`] for an out-of-range year/month.
pub fn month_bounds(year: i32, month: u32) -> Result<(NaiveDate, NaiveDate)> {
    let first = NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(|| Error::InvalidDate {
        value: format!("{year}-{month:02}"),
    })?;
    let next_month = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    };
    let last = next_month
        .and_then(|d| d.pred_opt())
        .ok_or_else(|| Error::InvalidDate {
            value: format!("{year}-{month:02}"),
        })?;
    Ok((first, last))
}
