//! # Domain Models
//!
//! Canonical domain types for the tickersense pipeline.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Symbol`] | Validated, uppercase ticker symbol |
//! | [`Period`] | Look-back span (1mo, 3mo, 6mo, 1y) |
//! | [`Interval`] | Sampling frequency (1d, 1wk) |
//! | [`InstrumentHandle`] | Resolved security with names and currency |
//! | [`PriceBar`] | OHLCV record for one trading date |
//! | [`PriceHistory`] | Ascending, duplicate-free, non-empty bar sequence |
//! | [`AssetClass`] | Instrument class (decides earnings applicability) |
//!
//! All types validate their invariants at construction time.

pub mod calendar;
mod models;
mod period;
mod symbol;

pub use models::{
    pick_display_name, AssetClass, InstrumentHandle, PriceBar,
    PriceHistory, CURRENCY_UNDEFINED,
};
pub use period::{validate_interval, validate_period, Interval, Period};
pub use symbol::Symbol;
