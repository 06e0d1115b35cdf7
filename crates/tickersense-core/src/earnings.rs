//! Earnings announcement window.

use serde::{Deserialize, Serialize};
use time::Date;

use crate::data_source::{MarketDataSource, SourceError};
use crate::{InstrumentHandle, PriceHistory};

/// Announcement dates within `[history start, horizon]`.
///
/// `NotApplicable` (indices, currencies, crypto) is kept distinct from an
/// empty `Dates` list; the chart and the report render them differently.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "dates", rename_all = "snake_case")]
pub enum EarningsWindow {
    NotApplicable,
    Dates(Vec<Date>),
}

impl EarningsWindow {
    pub fn empty() -> Self {
        Self::Dates(Vec::new())
    }

    pub const fn is_applicable(&self) -> bool {
        matches!(self, Self::Dates(_))
    }

    /// Dates in ascending order; empty when not applicable.
    pub fn dates(&self) -> &[Date] {
        match self {
            Self::NotApplicable => &[],
            Self::Dates(dates) => dates,
        }
    }
}

/// Keep the dates inside the closed interval `[start, horizon]`, ascending
/// and de-duplicated. `None` stays not-applicable.
pub fn filter_window(dates: Option<Vec<Date>>, start: Date, horizon: Date) -> EarningsWindow {
    match dates {
        None => EarningsWindow::NotApplicable,
        Some(mut dates) => {
            dates.retain(|date| *date >= start && *date <= horizon);
            dates.sort();
            dates.dedup();
            EarningsWindow::Dates(dates)
        }
    }
}

/// Pull the instrument's announcement dates and filter them to the window
/// spanned by the history and the horizon.
pub async fn earnings(
    source: &dyn MarketDataSource,
    handle: &InstrumentHandle,
    history: &PriceHistory,
    horizon: Date,
) -> Result<EarningsWindow, SourceError> {
    let dates = source.earnings_dates(handle).await?;
    Ok(filter_window(dates, history.start_date(), horizon))
}
