use serde::{Deserialize, Serialize};
use time::Date;

use crate::{Symbol, ValidationError};

/// Sentinel reported when the provider does not expose a usable currency.
pub const CURRENCY_UNDEFINED: &str = "Currency Undefined";

/// Canonical instrument class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetClass {
    Equity,
    Etf,
    Index,
    Crypto,
    Forex,
    Fund,
    Other,
}

impl AssetClass {
    /// Map the provider's `quoteType` field.
    pub fn from_quote_type(value: &str) -> Self {
        match value.trim().to_ascii_uppercase().as_str() {
            "EQUITY" => Self::Equity,
            "ETF" => Self::Etf,
            "MUTUALFUND" => Self::Fund,
            "INDEX" => Self::Index,
            "CRYPTOCURRENCY" => Self::Crypto,
            "CURRENCY" => Self::Forex,
            _ => Self::Other,
        }
    }

    /// Whether the class has an earnings-announcement concept at all.
    pub const fn has_earnings(self) -> bool {
        matches!(self, Self::Equity)
    }
}

/// Resolved security, created once per request after the provider confirmed
/// the symbol maps to a non-empty record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstrumentHandle {
    pub symbol: Symbol,
    pub short_name: Option<String>,
    pub long_name: Option<String>,
    pub currency: Option<String>,
    pub asset_class: AssetClass,
}

impl InstrumentHandle {
    pub fn new(symbol: Symbol, asset_class: AssetClass) -> Self {
        Self {
            symbol,
            short_name: None,
            long_name: None,
            currency: None,
            asset_class,
        }
    }

    pub fn with_names(mut self, short_name: Option<String>, long_name: Option<String>) -> Self {
        self.short_name = short_name;
        self.long_name = long_name;
        self
    }

    pub fn with_currency(mut self, currency: Option<String>) -> Self {
        self.currency = currency;
        self
    }

    /// The shorter of the two provider names; see [`pick_display_name`].
    pub fn display_name(&self) -> Option<String> {
        pick_display_name(self.short_name.as_deref(), self.long_name.as_deref())
    }

    /// Provider currency code as reported, or [`CURRENCY_UNDEFINED`] when it
    /// is missing or blank. Case is significant: `GBp` is pence, not pounds.
    pub fn currency(&self) -> String {
        self.currency
            .as_deref()
            .map(str::trim)
            .filter(|code| !code.is_empty())
            .map_or_else(|| String::from(CURRENCY_UNDEFINED), str::to_owned)
    }
}

/// Pick the shorter of two candidate names.
///
/// Blank candidates are ignored. Equal lengths resolve to the
/// alphabetically first name, so the result never depends on argument order.
pub fn pick_display_name(first: Option<&str>, second: Option<&str>) -> Option<String> {
    let candidates = [first, second]
        .into_iter()
        .flatten()
        .map(str::trim)
        .filter(|name| !name.is_empty());

    candidates
        .min_by(|a, b| {
            a.chars()
                .count()
                .cmp(&b.chars().count())
                .then_with(|| a.cmp(b))
        })
        .map(str::to_owned)
}

/// OHLCV record for one trading date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    pub date: Date,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

impl PriceBar {
    pub fn new(
        date: Date,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: u64,
    ) -> Result<Self, ValidationError> {
        validate_non_negative("open", open)?;
        validate_non_negative("high", high)?;
        validate_non_negative("low", low)?;
        validate_non_negative("close", close)?;

        if high < low {
            return Err(ValidationError::InvalidBarRange);
        }

        Ok(Self {
            date,
            open,
            high,
            low,
            close,
            volume,
        })
    }
}

/// Ascending, duplicate-free, non-empty sequence of dated OHLCV records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<PriceBar>", into = "Vec<PriceBar>")]
pub struct PriceHistory {
    bars: Vec<PriceBar>,
}

impl PriceHistory {
    /// Sort by date and collapse duplicate dates (the later record wins).
    pub fn new(mut bars: Vec<PriceBar>) -> Result<Self, ValidationError> {
        if bars.is_empty() {
            return Err(ValidationError::EmptyHistory);
        }

        bars.sort_by_key(|bar| bar.date);
        let mut deduped: Vec<PriceBar> = Vec::with_capacity(bars.len());
        for bar in bars {
            match deduped.last_mut() {
                Some(last) if last.date == bar.date => *last = bar,
                _ => deduped.push(bar),
            }
        }

        Ok(Self { bars: deduped })
    }

    pub fn bars(&self) -> &[PriceBar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn start_date(&self) -> Date {
        self.bars[0].date
    }

    pub fn end_date(&self) -> Date {
        self.bars[self.bars.len() - 1].date
    }

    pub fn dates(&self) -> Vec<Date> {
        self.bars.iter().map(|bar| bar.date).collect()
    }

    pub fn mean_close(&self) -> f64 {
        self.bars.iter().map(|bar| bar.close).sum::<f64>() / self.bars.len() as f64
    }

    pub fn mean_volume(&self) -> f64 {
        self.bars.iter().map(|bar| bar.volume as f64).sum::<f64>() / self.bars.len() as f64
    }
}

impl TryFrom<Vec<PriceBar>> for PriceHistory {
    type Error = ValidationError;

    fn try_from(value: Vec<PriceBar>) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<PriceHistory> for Vec<PriceBar> {
    fn from(value: PriceHistory) -> Self {
        value.bars
    }
}

fn validate_non_negative(field: &'static str, value: f64) -> Result<(), ValidationError> {
    if !value.is_finite() {
        return Err(ValidationError::NonFiniteValue { field });
    }
    if value < 0.0 {
        return Err(ValidationError::NegativeValue { field });
    }
    Ok(())
}
