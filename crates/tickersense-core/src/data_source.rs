//! Provider contracts and the payload types they exchange.
//!
//! Two upstream collaborators feed the pipeline:
//!
//! | Contract | Operations | Implementations |
//! |----------|------------|-----------------|
//! | [`MarketDataSource`] | resolve, history, earnings dates | [`crate::YahooAdapter`] |
//! | [`NewsProvider`] | search | [`crate::NewsApiClient`] |
//!
//! Both return [`SourceError`] so the pipeline can classify failures without
//! knowing which adapter produced them.

use std::fmt::{Display, Formatter};
use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};
use time::Date;

use crate::{InstrumentHandle, Interval, Period, PriceHistory, Symbol};

/// Adapter-level error classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceErrorKind {
    InvalidRequest,
    NotFound,
    Unavailable,
    RateLimited,
    Internal,
}

/// Structured provider error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceError {
    kind: SourceErrorKind,
    message: String,
    retryable: bool,
}

impl SourceError {
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::InvalidRequest,
            message: message.into(),
            retryable: false,
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::NotFound,
            message: message.into(),
            retryable: false,
        }
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::Unavailable,
            message: message.into(),
            retryable: true,
        }
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::RateLimited,
            message: message.into(),
            retryable: true,
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::Internal,
            message: message.into(),
            retryable: false,
        }
    }

    pub const fn kind(&self) -> SourceErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub const fn retryable(&self) -> bool {
        self.retryable
    }

    pub const fn code(&self) -> &'static str {
        match self.kind {
            SourceErrorKind::InvalidRequest => "source.invalid_request",
            SourceErrorKind::NotFound => "source.not_found",
            SourceErrorKind::Unavailable => "source.unavailable",
            SourceErrorKind::RateLimited => "source.rate_limited",
            SourceErrorKind::Internal => "source.internal",
        }
    }
}

impl Display for SourceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.code())
    }
}

impl std::error::Error for SourceError {}

/// Market-data provider contract.
pub trait MarketDataSource: Send + Sync {
    /// Short provider name used in logs.
    fn name(&self) -> &'static str;

    /// Look the symbol up and confirm the provider knows it.
    fn resolve<'a>(
        &'a self,
        symbol: &'a Symbol,
    ) -> Pin<Box<dyn Future<Output = Result<InstrumentHandle, SourceError>> + Send + 'a>>;

    /// Split- and dividend-adjusted OHLCV history.
    fn history<'a>(
        &'a self,
        handle: &'a InstrumentHandle,
        period: Period,
        interval: Interval,
    ) -> Pin<Box<dyn Future<Output = Result<PriceHistory, SourceError>> + Send + 'a>>;

    /// Known earnings announcement dates, ascending.
    ///
    /// `Ok(None)` means the instrument class has no earnings concept, which is
    /// not the same as an instrument with no scheduled announcements.
    fn earnings_dates<'a>(
        &'a self,
        handle: &'a InstrumentHandle,
    ) -> Pin<Box<dyn Future<Output = Result<Option<Vec<Date>>, SourceError>> + Send + 'a>>;
}

/// News search request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewsQuery {
    pub query: String,
    pub language: String,
    pub domains: Vec<String>,
}

impl NewsQuery {
    pub fn new(
        query: impl Into<String>,
        language: impl Into<String>,
        domains: Vec<String>,
    ) -> Result<Self, SourceError> {
        let query = query.into();
        if query.trim().is_empty() {
            return Err(SourceError::invalid_request("news query must not be empty"));
        }
        Ok(Self {
            query,
            language: language.into(),
            domains,
        })
    }
}

/// News search response body.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsPayload {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub total_results: Option<u64>,
    #[serde(default)]
    pub articles: Vec<RawArticle>,
}

impl NewsPayload {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.articles.is_empty()
    }
}

/// One article as the news provider returns it; every field may be absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawArticle {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub published_at: Option<String>,
}

/// News provider contract.
pub trait NewsProvider: Send + Sync {
    fn name(&self) -> &'static str;

    fn search<'a>(
        &'a self,
        query: &'a NewsQuery,
    ) -> Pin<Box<dyn Future<Output = Result<NewsPayload, SourceError>> + Send + 'a>>;
}
