//! Forward-projected x-axis boundary.

use time::Date;

use crate::domain::calendar::add_months;
use crate::{Period, PriceHistory, ValidationError};

/// Longest supported projection, in months.
pub const MAX_HORIZON_MONTHS: i32 = 12;

/// Months actually projected: the shortest period always projects one
/// month, every other period clamps the request to `0..=12`.
pub fn effective_months(period: Period, requested: i32) -> u32 {
    if period.is_shortest() {
        return 1;
    }
    requested.clamp(0, MAX_HORIZON_MONTHS).unsigned_abs()
}

/// Last history date plus [`effective_months`] calendar months.
///
/// The day of month is kept where valid and clamped to month end otherwise.
/// The result is never earlier than the last history date.
pub fn horizon(history: &PriceHistory, period: Period, months: i32) -> Result<Date, ValidationError> {
    let last = history.end_date();
    let months = effective_months(period, months);
    add_months(last, months).ok_or_else(|| ValidationError::DateOutOfRange {
        value: format!("{last} + {months} months"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PriceBar;
    use time::macros::date;

    fn history(dates: &[Date]) -> PriceHistory {
        PriceHistory::new(
            dates
                .iter()
                .map(|date| PriceBar::new(*date, 10.0, 11.0, 9.0, 10.5, 100).expect("valid bar"))
                .collect(),
        )
        .expect("non-empty")
    }

    #[test]
    fn shortest_period_forces_one_month() {
        let history = history(&[date!(2024 - 05 - 31)]);
        assert_eq!(horizon(&history, Period::OneMonth, 6), Ok(date!(2024 - 06 - 30)));
        assert_eq!(horizon(&history, Period::OneMonth, 0), Ok(date!(2024 - 06 - 30)));
    }

    #[test]
    fn months_are_clamped_to_supported_range() {
        let history = history(&[date!(2024 - 01 - 10), date!(2024 - 03 - 15)]);
        assert_eq!(
            horizon(&history, Period::ThreeMonths, -4),
            horizon(&history, Period::ThreeMonths, 0)
        );
        assert_eq!(
            horizon(&history, Period::OneYear, 40),
            horizon(&history, Period::OneYear, 12)
        );
        assert_eq!(horizon(&history, Period::OneYear, 40), Ok(date!(2025 - 03 - 15)));
    }

    #[test]
    fn single_record_with_zero_months_is_that_date() {
        let history = history(&[date!(2024 - 02 - 29)]);
        assert_eq!(horizon(&history, Period::SixMonths, 0), Ok(date!(2024 - 02 - 29)));
    }

    #[test]
    fn horizon_never_precedes_last_date() {
        let last = date!(2023 - 08 - 31);
        let history = history(&[date!(2023 - 06 - 01), last]);
        for period in Period::ALL {
            for months in -3..=15 {
                let projected = horizon(&history, period, months).expect("in range");
                assert!(projected >= last, "{period} {months} -> {projected}");
            }
        }
    }
}
