//! Calendar-date helpers shared by the acquisition, horizon and plotting stages.
//!
//! All series in the pipeline are keyed by [`Date`] (calendar-day
//! granularity, no time zone). Dates serialize as ISO-8601 `YYYY-MM-DD`, so
//! chronological and lexicographic order coincide.

use time::macros::format_description;
use time::{Date, Month, OffsetDateTime};

use crate::ValidationError;

const MONTH_ABBREVIATIONS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// Parse an ISO-8601 calendar date (`YYYY-MM-DD`).
pub fn parse_iso_date(input: &str) -> Result<Date, ValidationError> {
    Date::parse(input.trim(), format_description!("[year]-[month]-[day]")).map_err(|_| {
        ValidationError::InvalidDate {
            value: input.to_owned(),
        }
    })
}

/// Parse the calendar-day prefix of an RFC3339 timestamp such as
/// `2024-03-05T14:30:00Z`; the time of day is discarded.
pub fn parse_date_prefix(input: &str) -> Result<Date, ValidationError> {
    let prefix = input.get(..10).ok_or_else(|| ValidationError::InvalidDate {
        value: input.to_owned(),
    })?;
    parse_iso_date(prefix)
}

/// Render a date as `YYYY-MM-DD`.
pub fn format_iso_date(date: Date) -> String {
    format!(
        "{:04}-{:02}-{:02}",
        date.year(),
        u8::from(date.month()),
        date.day()
    )
}

/// Render a date as `05 Jan. 2024`, the form used in chart titles.
pub fn format_title_date(date: Date) -> String {
    let month = MONTH_ABBREVIATIONS[usize::from(u8::from(date.month())) - 1];
    format!("{:02} {month}. {}", date.day(), date.year())
}

/// Calendar-month addition.
///
/// The day of month is preserved where it exists in the target month and
/// clamped to the month's last day otherwise (Jan 31 + 1 month = Feb 28/29).
/// Returns `None` only when the result leaves the representable range.
pub fn add_months(date: Date, months: u32) -> Option<Date> {
    shift_months(date, i32::try_from(months).ok()?)
}

/// Calendar-month subtraction with the same day clamping as [`add_months`].
pub fn sub_months(date: Date, months: u32) -> Option<Date> {
    shift_months(date, i32::try_from(months).ok()?.checked_neg()?)
}

fn shift_months(date: Date, months: i32) -> Option<Date> {
    let zero_based = date.year() * 12 + i32::from(u8::from(date.month())) - 1;
    let target = zero_based.checked_add(months)?;
    let year = target.div_euclid(12);
    let month = Month::try_from(u8::try_from(target.rem_euclid(12) + 1).ok()?).ok()?;
    let day = date.day().min(month.length(year));
    Date::from_calendar_date(year, month, day).ok()
}

/// Convert a unix timestamp to the calendar date observed at `utc_offset_secs`
/// from UTC (the exchange's local trading date).
pub fn date_from_unix(timestamp: i64, utc_offset_secs: i64) -> Result<Date, ValidationError> {
    OffsetDateTime::from_unix_timestamp(timestamp.saturating_add(utc_offset_secs))
        .map(OffsetDateTime::date)
        .map_err(|_| ValidationError::InvalidDate {
            value: timestamp.to_string(),
        })
}
