//! # Tickersense Core
//!
//! Price, earnings and news-sentiment fusion for a single ticker symbol.
//!
//! ## Overview
//!
//! One request pulls a security's adjusted price history and earnings
//! calendar, projects a horizon date past the last price, fetches recent
//! headlines about the same entity, scores them for sentiment and assembles
//! everything into one time-aligned chart.
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`acquire`] | Symbol resolution and price history |
//! | [`adapters`] | Yahoo market data and NewsAPI clients |
//! | [`config`] | Environment-driven configuration |
//! | [`data_source`] | Provider traits and payload types |
//! | [`domain`] | Domain models (Symbol, Period, PriceHistory, ...) |
//! | [`earnings`] | Earnings window filter |
//! | [`error`] | Error taxonomy |
//! | [`horizon`] | Forward-projected axis boundary |
//! | [`http_client`] | HTTP client abstraction |
//! | [`news`] | News acquisition and relevance filtering |
//! | [`pipeline`] | Stage orchestration |
//! | [`plot`] | Figure model and chart assembly |
//! | [`retry`] | Bounded fixed-delay retry |
//! | [`sentiment`] | Classification, aggregation and smoothing |
//! | [`session`] | Randomised browser headers |
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use tickersense_core::{AppConfig, NoopHttpClient, Pipeline, PipelineRequest};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AppConfig::from_env()?;
//!     let pipeline = Pipeline::from_config(&config, Arc::new(NoopHttpClient));
//!
//!     let report = pipeline
//!         .run(&PipelineRequest::new("AAPL").with_period("6mo"))
//!         .await;
//!     println!("{:?} via {:?}", report.state, report.trail);
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐
//! │  Validator   │
//! └──────┬───────┘
//!        ▼
//! ┌──────────────┐     ┌──────────────────┐
//! │   Acquirer   │────▶│ Horizon/Earnings │──┐
//! └──────┬───────┘     └──────────────────┘  │
//!        ▼                                   ▼
//! ┌──────────────┐     ┌──────────────┐  ┌────────┐
//! │ News + Filter│────▶│  Sentiment   │─▶│  Plot  │
//! └──────────────┘     └──────────────┘  └────────┘
//! ```
//!
//! ## Security
//!
//! - API keys come from the environment or `.env` and are never logged
//! - Input validation happens before any network call

pub mod acquire;
pub mod adapters;
pub mod config;
pub mod data_source;
pub mod domain;
pub mod earnings;
pub mod error;
pub mod horizon;
pub mod http_client;
pub mod news;
pub mod pipeline;
pub mod plot;
pub mod retry;
pub mod sentiment;
pub mod session;

pub use acquire::MarketDataAcquirer;

pub use adapters::{NewsApiClient, YahooAdapter, YahooAuthManager};

pub use config::{AppConfig, ChartSize, ConfigError, DEFAULT_HORIZON_MONTHS};

pub use data_source::{
    MarketDataSource, NewsPayload, NewsProvider, NewsQuery, RawArticle, SourceError,
    SourceErrorKind,
};

pub use domain::{
    pick_display_name, validate_interval, validate_period, AssetClass,
    InstrumentHandle, Interval, Period, PriceBar, PriceHistory, Symbol, CURRENCY_UNDEFINED,
};

pub use earnings::EarningsWindow;

pub use error::{CoreError, PipelineError, RenderError, ValidationError};

pub use http_client::{
    HttpAuth, HttpClient, HttpError, HttpMethod, HttpRequest, HttpResponse, NoopHttpClient,
    ReqwestHttpClient,
};

pub use news::{Headline, NewsAcquirer, SearchTerms};

pub use pipeline::{
    DegradedStage, Pipeline, PipelineReport, PipelineRequest, PipelineState, RelevantNews,
    SentimentReport, StageOutcome, StageRecord, StageStatus,
};

pub use plot::{ChartRenderer, Figure, Palette, PlotlyRenderer, PriceChart};

pub use retry::{RecordingSleeper, RetryPolicy, Sleeper, TokioSleeper};

pub use sentiment::{
    ClassScores, ClassifierError, DisplayBounds, LexiconClassifier, RemoteClassifier,
    SentimentSeries, TextClassifier,
};

pub use session::{HeaderPools, SessionFactory, SessionProfile};
