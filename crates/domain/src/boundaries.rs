//! Date-boundary arithmetic for hierarchical bucketing
//!
//! Pure functions, no side effects, no I/O. All functions are
//! timezone-naive: callers pass an already-localized date and the resolver
//! performs no timezone conversion itself.

use chrono::{Datelike, Days, NaiveDate, Weekday};

use crate::constants::CANONICAL_DATE_FORMAT;
use crate::errors::{Result, TidesError};

/// Monday of the ISO week containing `date`. Week boundaries are
/// Monday-start regardless of locale, so a Sunday maps to the Monday six
/// days prior.
pub fn week_start(date: NaiveDate) -> NaiveDate {
    let offset = date.weekday().num_days_from_monday();
    date - Days::new(u64::from(offset))
}

/// Sunday closing the ISO week containing `date`.
pub fn week_end(date: NaiveDate) -> NaiveDate {
    week_start(date) + Days::new(6)
}

/// First calendar day of the month containing `date`.
pub fn month_start(date: NaiveDate) -> NaiveDate {
    // day 1 always exists for a valid date's month
    date.with_day(1).unwrap_or(date)
}

/// Last calendar day of the month containing `date`.
pub fn month_end(date: NaiveDate) -> NaiveDate {
    let next_month = if date.month() == 12 {
        NaiveDate::from_ymd_opt(date.year() + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(date.year(), date.month() + 1, 1)
    };
    match next_month {
        Some(first_of_next) => first_of_next - Days::new(1),
        None => date,
    }
}

/// Inclusive membership test.
pub fn in_range(date: NaiveDate, start: NaiveDate, end: NaiveDate) -> bool {
    date >= start && date <= end
}

/// Format a date in the canonical `YYYY-MM-DD` form used for boundary
/// tagging. Canonical strings compare lexicographically in date order.
pub fn canonical(date: NaiveDate) -> String {
    date.format(CANONICAL_DATE_FORMAT).to_string()
}

/// Parse a canonical `YYYY-MM-DD` date.
pub fn parse_canonical(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value, CANONICAL_DATE_FORMAT)
        .map_err(|e| TidesError::Validation(format!("invalid date '{value}': {e}")))
}
