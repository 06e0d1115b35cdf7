//! Market data acquisition: symbol resolution and price history.

use std::sync::Arc;

use tracing::{debug, info};

use crate::data_source::MarketDataSource;
use crate::{InstrumentHandle, Interval, Period, PipelineError, PriceHistory, Symbol};

/// Wraps a [`MarketDataSource`] and maps its failures onto the pipeline
/// error taxonomy.
#[derive(Clone)]
pub struct MarketDataAcquirer {
    source: Arc<dyn MarketDataSource>,
}

impl MarketDataAcquirer {
    pub fn new(source: Arc<dyn MarketDataSource>) -> Self {
        Self { source }
    }

    pub fn source(&self) -> &Arc<dyn MarketDataSource> {
        &self.source
    }

    /// Normalize the symbol and confirm the provider knows it.
    ///
    /// Malformed input and every lookup failure are reported as
    /// [`PipelineError::InvalidSymbol`].
    pub async fn resolve(&self, raw_symbol: &str) -> Result<InstrumentHandle, PipelineError> {
        let symbol = Symbol::parse(raw_symbol).map_err(|error| PipelineError::InvalidSymbol {
            symbol: raw_symbol.trim().to_ascii_uppercase(),
            reason: error.to_string(),
        })?;

        debug!(provider = self.source.name(), %symbol, "resolving symbol");
        let handle = self
            .source
            .resolve(&symbol)
            .await
            .map_err(|error| PipelineError::InvalidSymbol {
                symbol: symbol.to_string(),
                reason: error.to_string(),
            })?;

        info!(symbol = %handle.symbol, asset_class = ?handle.asset_class, "symbol resolved");
        Ok(handle)
    }

    /// Adjusted OHLCV history; provider failures become
    /// [`PipelineError::AcquisitionFailure`] carrying the provider message.
    pub async fn history(
        &self,
        handle: &InstrumentHandle,
        period: Period,
        interval: Interval,
    ) -> Result<PriceHistory, PipelineError> {
        let history = self
            .source
            .history(handle, period, interval)
            .await
            .map_err(|error| PipelineError::AcquisitionFailure {
                symbol: handle.symbol.to_string(),
                reason: error.to_string(),
            })?;

        info!(
            symbol = %handle.symbol,
            bars = history.len(),
            start = %history.start_date(),
            end = %history.end_date(),
            "price history acquired"
        );
        Ok(history)
    }

    /// Shorter of the provider's two names; `None` when neither is usable.
    pub fn display_name(handle: &InstrumentHandle) -> Option<String> {
        handle.display_name()
    }

    /// Provider currency or the `Currency Undefined` sentinel.
    pub fn currency(handle: &InstrumentHandle) -> String {
        handle.currency()
    }
}
