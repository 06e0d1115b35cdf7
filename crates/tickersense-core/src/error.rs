use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use thiserror::Error;

/// Validation and contract errors exposed by `tickersense-core`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("symbol cannot be empty")]
    EmptySymbol,
    #[error("symbol length {len} exceeds max {max}")]
    SymbolTooLong { len: usize, max: usize },
    #[error("symbol contains invalid character '{ch}' at index {index}")]
    SymbolInvalidChar { ch: char, index: usize },

    #[error("invalid period '{value}', expected one of 1mo, 3mo, 6mo, 1y")]
    InvalidPeriod { value: String },
    #[error("invalid interval '{value}', expected one of 1d, 1wk")]
    InvalidInterval { value: String },

    #[error("date must be ISO-8601 (YYYY-MM-DD): '{value}'")]
    InvalidDate { value: String },
    #[error("date arithmetic left the supported range: {value}")]
    DateOutOfRange { value: String },

    #[error("field '{field}' must be finite")]
    NonFiniteValue { field: &'static str },
    #[error("field '{field}' must be non-negative")]
    NegativeValue { field: &'static str },

    #[error("bar high must be >= low")]
    InvalidBarRange,
    #[error("price history must contain at least one bar")]
    EmptyHistory,
}

/// Plot assembly failures.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RenderError {
    #[error("figure has no trace named '{name}'")]
    MissingTrace { name: String },
    #[error("axis range is inverted: {start} > {end}")]
    InvertedRange { start: String, end: String },
    #[error("figure serialization failed: {0}")]
    Serialization(String),
    #[error("failed to write figure: {0}")]
    Io(String),
}

/// Fatal pipeline failures.
///
/// Only the mandatory stages produce these; enrichment stages degrade
/// instead of failing.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PipelineError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("invalid symbol '{symbol}': {reason}")]
    InvalidSymbol { symbol: String, reason: String },
    #[error("price acquisition failed for '{symbol}': {reason}")]
    AcquisitionFailure { symbol: String, reason: String },
    #[error(transparent)]
    Render(#[from] RenderError),
}

impl PipelineError {
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "pipeline.validation",
            Self::InvalidSymbol { .. } => "pipeline.invalid_symbol",
            Self::AcquisitionFailure { .. } => "pipeline.acquisition_failure",
            Self::Render(_) => "pipeline.render",
        }
    }
}

impl Serialize for PipelineError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut state = serializer.serialize_struct("PipelineError", 2)?;
        state.serialize_field("code", self.code())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}

/// Top-level error type for core operations outside the pipeline taxonomy.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
