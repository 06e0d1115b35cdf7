//! Request orchestration.
//!
//! One [`Pipeline::run`] walks the stages in order, awaiting each before the
//! next starts:
//!
//! ```text
//! Validating -> Acquiring -> Horizoning -> EarningsFiltering
//!            -> NewsFetching -> Scoring -> Rendering -> Done
//! ```
//!
//! Validation and acquisition failures are fatal and end the run in
//! `Errored` with no partial data. The enrichment stages degrade to a safe
//! default and the run continues. A rendering failure ends in `Errored`
//! but keeps everything computed before it.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use time::Date;
use tracing::{info, warn};

use crate::adapters::{NewsApiClient, YahooAdapter};
use crate::data_source::SourceErrorKind;
use crate::earnings::{earnings, EarningsWindow};
use crate::horizon::horizon;
use crate::http_client::HttpClient;
use crate::news::{extract, NewsAcquirer};
use crate::plot::{ChartRenderer, Figure, Palette, PlotlyRenderer, PriceChart};
use crate::sentiment::{
    bounds, score, smooth, DisplayBounds, LexiconClassifier, RemoteClassifier, SentimentSeries,
    TextClassifier,
};
use crate::{
    AppConfig, ChartSize, InstrumentHandle, Interval, MarketDataAcquirer, Period, PipelineError,
    PriceHistory, DEFAULT_HORIZON_MONTHS,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineState {
    Validating,
    Acquiring,
    Horizoning,
    EarningsFiltering,
    NewsFetching,
    Scoring,
    Rendering,
    Done,
    Errored,
}

/// Result of one stage.
#[derive(Debug, Clone, PartialEq)]
pub enum StageOutcome<T> {
    Ok(T),
    /// The stage failed but produced a safe substitute.
    Degraded { value: T, reason: String },
    Fatal(PipelineError),
}

impl<T> StageOutcome<T> {
    pub fn degraded(value: T, reason: impl Into<String>) -> Self {
        Self::Degraded {
            value,
            reason: reason.into(),
        }
    }

    pub const fn status(&self) -> StageStatus {
        match self {
            Self::Ok(_) => StageStatus::Ok,
            Self::Degraded { .. } => StageStatus::Degraded,
            Self::Fatal(_) => StageStatus::Fatal,
        }
    }

    pub fn reason(&self) -> Option<String> {
        match self {
            Self::Ok(_) => None,
            Self::Degraded { reason, .. } => Some(reason.clone()),
            Self::Fatal(error) => Some(error.to_string()),
        }
    }

    /// The produced or substituted value; `Err` only for fatal outcomes.
    pub fn into_value(self) -> Result<T, PipelineError> {
        match self {
            Self::Ok(value) | Self::Degraded { value, .. } => Ok(value),
            Self::Fatal(error) => Err(error),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    Ok,
    Degraded,
    Fatal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageRecord {
    pub stage: PipelineState,
    pub status: StageStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// A stage that continued with a substitute value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DegradedStage {
    pub stage: PipelineState,
    pub reason: String,
}

/// Raw request parameters; period and interval are validated by the run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineRequest {
    pub symbol: String,
    pub period: String,
    pub interval: String,
    pub horizon_months: i32,
    /// `false` runs the data path only.
    pub render: bool,
}

impl PipelineRequest {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            period: String::from("3mo"),
            interval: String::from("1d"),
            horizon_months: DEFAULT_HORIZON_MONTHS,
            render: true,
        }
    }

    pub fn with_period(mut self, period: impl Into<String>) -> Self {
        self.period = period.into();
        self
    }

    pub fn with_interval(mut self, interval: impl Into<String>) -> Self {
        self.interval = interval.into();
        self
    }

    pub fn with_horizon_months(mut self, months: i32) -> Self {
        self.horizon_months = months;
        self
    }

    pub fn with_render(mut self, render: bool) -> Self {
        self.render = render;
        self
    }
}

/// Everything one run produced.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineReport {
    pub state: PipelineState,
    pub trail: Vec<PipelineState>,
    pub stages: Vec<StageRecord>,
    pub degraded: Vec<DegradedStage>,
    pub handle: Option<InstrumentHandle>,
    pub display_name: Option<String>,
    pub currency: Option<String>,
    pub history: Option<PriceHistory>,
    pub horizon: Option<Date>,
    pub earnings: Option<EarningsWindow>,
    pub sentiment: Option<SentimentSeries>,
    pub bounds: Option<DisplayBounds>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub figure: Option<Figure>,
    pub error: Option<PipelineError>,
}

impl PipelineReport {
    fn new() -> Self {
        Self {
            state: PipelineState::Validating,
            trail: Vec::new(),
            stages: Vec::new(),
            degraded: Vec::new(),
            handle: None,
            display_name: None,
            currency: None,
            history: None,
            horizon: None,
            earnings: None,
            sentiment: None,
            bounds: None,
            figure: None,
            error: None,
        }
    }

    pub fn is_done(&self) -> bool {
        self.state == PipelineState::Done
    }

    pub fn reached(&self, state: PipelineState) -> bool {
        self.trail.contains(&state)
    }

    pub fn status_of(&self, stage: PipelineState) -> Option<StageStatus> {
        self.stages
            .iter()
            .find(|record| record.stage == stage)
            .map(|record| record.status)
    }

    fn enter(&mut self, state: PipelineState) {
        info!(stage = ?state, "entering stage");
        self.state = state;
        self.trail.push(state);
    }

    /// Log and record the outcome, then hand back the value. Fatal outcomes
    /// move the report to `Errored`.
    fn record<T>(&mut self, outcome: StageOutcome<T>) -> Option<T> {
        let stage = self.state;
        self.stages.push(StageRecord {
            stage,
            status: outcome.status(),
            reason: outcome.reason(),
        });

        match outcome {
            StageOutcome::Ok(value) => Some(value),
            StageOutcome::Degraded { value, reason } => {
                warn!(stage = ?stage, %reason, "stage degraded");
                self.degraded.push(DegradedStage { stage, reason });
                Some(value)
            }
            StageOutcome::Fatal(error) => {
                warn!(stage = ?stage, code = error.code(), %error, "stage failed");
                self.error = Some(error);
                self.enter(PipelineState::Errored);
                None
            }
        }
    }
}

/// Relevant headlines plus the term they were filtered on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelevantNews {
    pub term: String,
    pub headlines: Vec<(Date, String)>,
}

/// Outcome of the news and sentiment branch on its own.
#[derive(Debug, Clone, Serialize)]
pub struct SentimentReport {
    pub entity_name: String,
    pub term: Option<String>,
    pub headlines: Vec<(Date, String)>,
    pub series: Option<SentimentSeries>,
    pub bounds: DisplayBounds,
    pub degraded: Vec<DegradedStage>,
}

pub struct Pipeline {
    market: MarketDataAcquirer,
    news: NewsAcquirer,
    classifier: Arc<dyn TextClassifier>,
    renderer: Arc<dyn ChartRenderer>,
    palette: Palette,
    chart: ChartSize,
}

impl Pipeline {
    pub fn new(market: MarketDataAcquirer, news: NewsAcquirer, classifier: Arc<dyn TextClassifier>) -> Self {
        Self {
            market,
            news,
            classifier,
            renderer: Arc::new(PlotlyRenderer),
            palette: Palette::default(),
            chart: ChartSize::default(),
        }
    }

    /// Wire the Yahoo and NewsAPI adapters over `http_client`. A configured
    /// remote model is used only with a live transport; otherwise headlines
    /// are scored offline.
    pub fn from_config(config: &AppConfig, http_client: Arc<dyn HttpClient>) -> Self {
        let market = YahooAdapter::with_http_client(http_client.clone()).with_timeout_ms(config.timeout_ms);
        let news = NewsApiClient::with_http_client(http_client.clone(), config.news_api_key.clone())
            .with_base_url(config.news_api_url.as_str())
            .with_timeout_ms(config.timeout_ms);

        let classifier: Arc<dyn TextClassifier> = match &config.sentiment_model_url {
            Some(url) if !http_client.is_mock() => Arc::new(
                RemoteClassifier::new(http_client, url.as_str(), config.sentiment_model_token.clone())
                    .with_timeout_ms(config.timeout_ms),
            ),
            _ => Arc::new(LexiconClassifier::new()),
        };

        let acquirer = NewsAcquirer::new(
            Arc::new(news),
            config.news_language.as_str(),
            config.news_domains.clone(),
        )
        .with_policy(config.news_retry);

        Self::new(MarketDataAcquirer::new(Arc::new(market)), acquirer, classifier).with_chart_size(config.chart)
    }

    pub fn with_palette(mut self, palette: Palette) -> Self {
        self.palette = palette;
        self
    }

    pub fn with_renderer(mut self, renderer: Arc<dyn ChartRenderer>) -> Self {
        self.renderer = renderer;
        self
    }

    pub fn with_chart_size(mut self, chart: ChartSize) -> Self {
        self.chart = chart;
        self
    }

    pub fn palette(&self) -> &Palette {
        &self.palette
    }

    pub async fn run(&self, request: &PipelineRequest) -> PipelineReport {
        let mut report = PipelineReport::new();
        info!(symbol = %request.symbol, period = %request.period, interval = %request.interval, "pipeline started");

        report.enter(PipelineState::Validating);
        let Some((period, interval)) = report.record(validate(request)) else {
            return report;
        };

        report.enter(PipelineState::Acquiring);
        let Some((handle, history)) = report.record(self.acquire(request, period, interval).await) else {
            return report;
        };
        report.display_name = MarketDataAcquirer::display_name(&handle);
        report.currency = Some(MarketDataAcquirer::currency(&handle));

        report.enter(PipelineState::Horizoning);
        let projected = report
            .record(horizon_stage(&history, period, request.horizon_months))
            .flatten();
        report.horizon = projected;

        report.enter(PipelineState::EarningsFiltering);
        let window = report
            .record(self.earnings_stage(&handle, &history, projected).await)
            .unwrap_or_else(EarningsWindow::empty);

        report.enter(PipelineState::NewsFetching);
        let entity_name = report.display_name.clone();
        let news = report
            .record(self.news_stage(entity_name.as_deref()).await)
            .flatten();

        let series = match news {
            Some(news) => {
                report.enter(PipelineState::Scoring);
                report.record(self.scoring_stage(&news.headlines).await).flatten()
            }
            None => {
                info!("no relevant headlines; skipping sentiment scoring");
                None
            }
        };
        report.bounds = series.as_ref().map(bounds);

        if request.render {
            report.enter(PipelineState::Rendering);
            let chart = PriceChart {
                handle: &handle,
                history: &history,
                horizon: projected,
                earnings: &window,
                period,
                interval,
                size: self.chart,
            };
            let figure = report.record(self.render(&chart, series.as_ref()));
            report.figure = figure;
        }

        report.handle = Some(handle);
        report.history = Some(history);
        report.earnings = Some(window);
        report.sentiment = series;

        if report.state != PipelineState::Errored {
            report.enter(PipelineState::Done);
        }
        info!(state = ?report.state, degraded = report.degraded.len(), "pipeline finished");
        report
    }

    /// News and sentiment for an entity name, without market data.
    pub async fn news_sentiment(&self, entity_name: &str) -> SentimentReport {
        let mut degraded = Vec::new();
        let mut note = |stage, outcome_reason: Option<String>| {
            if let Some(reason) = outcome_reason {
                warn!(stage = ?stage, %reason, "stage degraded");
                degraded.push(DegradedStage { stage, reason });
            }
        };

        let fetched = self.news_stage(Some(entity_name)).await;
        note(PipelineState::NewsFetching, fetched.reason());
        let news = fetched.into_value().ok().flatten();

        let series = match &news {
            Some(news) => {
                let scored = self.scoring_stage(&news.headlines).await;
                note(PipelineState::Scoring, scored.reason());
                scored.into_value().ok().flatten()
            }
            None => None,
        };

        let bounds = series.as_ref().map(bounds).unwrap_or_default();
        let (term, headlines) = news.map_or((None, Vec::new()), |news| (Some(news.term), news.headlines));
        SentimentReport {
            entity_name: entity_name.to_owned(),
            term,
            headlines,
            series,
            bounds,
            degraded,
        }
    }

    async fn acquire(
        &self,
        request: &PipelineRequest,
        period: Period,
        interval: Interval,
    ) -> StageOutcome<(InstrumentHandle, PriceHistory)> {
        let handle = match self.market.resolve(&request.symbol).await {
            Ok(handle) => handle,
            Err(error) => return StageOutcome::Fatal(error),
        };
        match self.market.history(&handle, period, interval).await {
            Ok(history) => StageOutcome::Ok((handle, history)),
            Err(error) => StageOutcome::Fatal(error),
        }
    }

    async fn earnings_stage(
        &self,
        handle: &InstrumentHandle,
        history: &PriceHistory,
        projected: Option<Date>,
    ) -> StageOutcome<EarningsWindow> {
        let Some(projected) = projected else {
            return StageOutcome::degraded(EarningsWindow::empty(), "horizon unavailable");
        };

        match earnings(self.market.source().as_ref(), handle, history, projected).await {
            Ok(window) => {
                info!(dates = window.dates().len(), applicable = window.is_applicable(), "earnings filtered");
                StageOutcome::Ok(window)
            }
            Err(error) if error.kind() == SourceErrorKind::NotFound => {
                StageOutcome::degraded(EarningsWindow::NotApplicable, error.to_string())
            }
            Err(error) => StageOutcome::degraded(EarningsWindow::empty(), error.to_string()),
        }
    }

    async fn news_stage(&self, entity_name: Option<&str>) -> StageOutcome<Option<RelevantNews>> {
        let Some(name) = entity_name.map(str::trim).filter(|name| !name.is_empty()) else {
            return StageOutcome::degraded(None, "no entity name");
        };

        let (payload, term) = self.news.fetch(name).await;
        if term.is_empty() {
            return StageOutcome::degraded(None, "entity name has no searchable tokens");
        }
        if payload.is_empty() {
            return StageOutcome::degraded(None, "news provider returned no articles");
        }

        let headlines = extract(&payload, &term);
        info!(articles = payload.articles.len(), relevant = headlines.len(), %term, "headlines filtered");
        if headlines.is_empty() {
            return StageOutcome::degraded(None, format!("no headline mentions '{term}'"));
        }
        StageOutcome::Ok(Some(RelevantNews { term, headlines }))
    }

    async fn scoring_stage(&self, headlines: &[(Date, String)]) -> StageOutcome<Option<SentimentSeries>> {
        let daily: BTreeMap<Date, f64> = match score(self.classifier.as_ref(), headlines).await {
            Ok(daily) => daily,
            Err(error) => return StageOutcome::degraded(None, error.to_string()),
        };
        if daily.is_empty() {
            return StageOutcome::degraded(None, "no headlines scored");
        }

        let series = smooth(&daily);
        info!(classifier = self.classifier.name(), days = series.len(), "sentiment aggregated");
        StageOutcome::Ok(Some(series))
    }

    fn render(&self, chart: &PriceChart<'_>, series: Option<&SentimentSeries>) -> StageOutcome<Figure> {
        match self.renderer.render(chart, series, &self.palette) {
            Ok(figure) => StageOutcome::Ok(figure),
            Err(error) => StageOutcome::Fatal(error.into()),
        }
    }
}

fn validate(request: &PipelineRequest) -> StageOutcome<(Period, Interval)> {
    let period = match request.period.parse::<Period>() {
        Ok(period) => period,
        Err(error) => return StageOutcome::Fatal(error.into()),
    };
    match request.interval.parse::<Interval>() {
        Ok(interval) => StageOutcome::Ok((period, interval)),
        Err(error) => StageOutcome::Fatal(error.into()),
    }
}

fn horizon_stage(history: &PriceHistory, period: Period, months: i32) -> StageOutcome<Option<Date>> {
    match horizon(history, period, months) {
        Ok(date) => {
            info!(horizon = %date, "horizon projected");
            StageOutcome::Ok(Some(date))
        }
        Err(error) => StageOutcome::degraded(None, error.to_string()),
    }
}
