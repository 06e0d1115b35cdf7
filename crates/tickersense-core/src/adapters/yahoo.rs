use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Deserialize;
use serde_json::Value;
use time::{Date, Duration, OffsetDateTime, Weekday};
use tracing::{debug, warn};

use crate::data_source::{MarketDataSource, SourceError};
use crate::domain::calendar::{date_from_unix, parse_date_prefix, sub_months};
use crate::http_client::{HttpClient, HttpRequest, HttpResponse, NoopHttpClient};
use crate::session::SessionFactory;
use crate::{
    AssetClass, InstrumentHandle, Interval, Period, PriceBar, PriceHistory, Symbol,
    ValidationError,
};

const QUOTE_SUMMARY_URL: &str = "https://query2.finance.yahoo.com/v10/finance/quoteSummary";
const CHART_URL: &str = "https://query2.finance.yahoo.com/v8/finance/chart";
const VISUALIZATION_URL: &str = "https://query1.finance.yahoo.com/v1/finance/visualization";
const ANNOUNCEMENT_LIMIT: usize = 25;
const COOKIE_URL: &str = "https://fc.yahoo.com";
const CRUMB_URLS: [&str; 2] = [
    "https://query1.finance.yahoo.com/v1/test/getcrumb",
    "https://query2.finance.yahoo.com/v1/test/getcrumb",
];
const FINANCE_REFERER: &str = "https://finance.yahoo.com/";

// ============================================================================
// Yahoo Auth Manager - Handles cookie/crumb authentication
// ============================================================================

/// Caches the Yahoo crumb token.
///
/// Yahoo's unofficial API requires:
/// 1. Session cookie from fc.yahoo.com (kept by the transport's cookie jar)
/// 2. Crumb token from query1.finance.yahoo.com/v1/test/getcrumb
#[derive(Debug, Default)]
pub struct YahooAuthManager {
    crumb: Mutex<Option<String>>,
}

impl YahooAuthManager {
    /// Cached crumb, fetching a fresh one when none is held.
    pub async fn crumb(
        &self,
        http_client: &dyn HttpClient,
        timeout_ms: u64,
    ) -> Result<String, SourceError> {
        let cached = lock(&self.crumb).clone();
        if let Some(crumb) = cached {
            return Ok(crumb);
        }

        let crumb = Self::fetch_crumb(http_client, timeout_ms).await?;
        *lock(&self.crumb) = Some(crumb.clone());
        Ok(crumb)
    }

    /// Drop the cached crumb; the next call fetches a new one.
    pub fn invalidate(&self) {
        *lock(&self.crumb) = None;
    }

    async fn fetch_crumb(http_client: &dyn HttpClient, timeout_ms: u64) -> Result<String, SourceError> {
        let cookie_request = HttpRequest::get(COOKIE_URL)
            .with_header("referer", FINANCE_REFERER)
            .with_timeout_ms(timeout_ms);

        // fc.yahoo.com answers 404 but still sets the session cookie.
        http_client.execute(cookie_request).await.map_err(|e| {
            SourceError::unavailable(format!("failed to fetch Yahoo cookie: {}", e.message()))
        })?;

        for endpoint in CRUMB_URLS {
            let crumb_request = HttpRequest::get(endpoint)
                .with_header("referer", FINANCE_REFERER)
                .with_timeout_ms(timeout_ms);

            match http_client.execute(crumb_request).await {
                Ok(response) if response.is_success() => {
                    let body = response.body.trim();
                    if body.contains("<html") || body.contains("<!DOCTYPE") {
                        continue;
                    }
                    if body.to_ascii_lowercase().contains("too many requests") {
                        return Err(SourceError::rate_limited(
                            "Yahoo rate limited while fetching crumb",
                        ));
                    }
                    if !body.is_empty() && body.len() < 100 && !body.contains(' ') {
                        return Ok(body.to_owned());
                    }
                }
                Ok(response) => {
                    debug!(endpoint, status = response.status, "crumb endpoint rejected request");
                }
                Err(error) => {
                    debug!(endpoint, error = error.message(), "crumb endpoint unreachable");
                }
            }
        }

        Err(SourceError::unavailable(
            "failed to fetch Yahoo crumb from all endpoints",
        ))
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// ============================================================================
// Yahoo Adapter
// ============================================================================

/// Yahoo Finance market-data source.
///
/// Built on a mock transport (the default), it serves deterministic fake data
/// for a small catalog of instruments and never touches the network.
#[derive(Clone)]
pub struct YahooAdapter {
    http_client: Arc<dyn HttpClient>,
    sessions: Arc<SessionFactory>,
    auth_manager: Arc<YahooAuthManager>,
    use_real_api: bool,
    timeout_ms: u64,
    fake_anchor: Option<Date>,
}

impl Default for YahooAdapter {
    fn default() -> Self {
        Self {
            http_client: Arc::new(NoopHttpClient),
            sessions: Arc::new(SessionFactory::default()),
            auth_manager: Arc::new(YahooAuthManager::default()),
            use_real_api: false,
            timeout_ms: 10_000,
            fake_anchor: None,
        }
    }
}

impl YahooAdapter {
    pub fn with_http_client(http_client: Arc<dyn HttpClient>) -> Self {
        let is_real = !http_client.is_mock();
        Self {
            http_client,
            use_real_api: is_real,
            ..Self::default()
        }
    }

    pub fn with_sessions(mut self, sessions: Arc<SessionFactory>) -> Self {
        self.sessions = sessions;
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Pin the last date of generated fake history (defaults to today, UTC).
    pub fn with_fake_anchor(mut self, anchor: Date) -> Self {
        self.fake_anchor = Some(anchor);
        self
    }

    pub fn is_real_client(&self) -> bool {
        self.use_real_api
    }

    /// GET a Yahoo endpoint with crumb auth.
    async fn fetch_body(&self, url: &str, query: &[(&str, &str)]) -> Result<String, SourceError> {
        let request = query
            .iter()
            .fold(HttpRequest::get(url), |request, (name, value)| {
                request.with_query(*name, *value)
            });
        self.fetch(request).await
    }

    /// Send `request` with the crumb attached, refreshing the crumb and
    /// retrying once when Yahoo answers 401 or 429.
    async fn fetch(&self, request: HttpRequest) -> Result<String, SourceError> {
        let crumb = self
            .auth_manager
            .crumb(self.http_client.as_ref(), self.timeout_ms)
            .await?;
        let response = self.send(&request, &crumb).await?;

        let response = if matches!(response.status, 401 | 429) {
            debug!(url = %request.url, status = response.status, "yahoo rejected crumb; refreshing auth");
            self.auth_manager.invalidate();
            let crumb = self
                .auth_manager
                .crumb(self.http_client.as_ref(), self.timeout_ms)
                .await?;
            self.send(&request, &crumb).await?
        } else {
            response
        };

        if !response.is_success() {
            return Err(status_error(response.status));
        }
        Ok(response.body)
    }

    async fn send(&self, request: &HttpRequest, crumb: &str) -> Result<HttpResponse, SourceError> {
        let request = request
            .clone()
            .with_query("crumb", crumb)
            .with_timeout_ms(self.timeout_ms);
        let request = self.sessions.profile().apply(request);

        self.http_client.execute(request).await.map_err(|error| {
            if error.retryable() {
                SourceError::unavailable(format!("yahoo transport error: {}", error.message()))
            } else {
                SourceError::internal(format!("yahoo transport error: {}", error.message()))
            }
        })
    }
}

impl MarketDataSource for YahooAdapter {
    fn name(&self) -> &'static str {
        "yahoo"
    }

    fn resolve<'a>(
        &'a self,
        symbol: &'a Symbol,
    ) -> Pin<Box<dyn Future<Output = Result<InstrumentHandle, SourceError>> + Send + 'a>> {
        Box::pin(async move {
            if self.is_real_client() {
                let url = format!("{QUOTE_SUMMARY_URL}/{}", urlencoding::encode(symbol.as_str()));
                let body = self.fetch_body(&url, &[("modules", "price,quoteType")]).await?;
                parse_instrument(symbol, &body)
            } else {
                fake_instrument(symbol)
            }
        })
    }

    fn history<'a>(
        &'a self,
        handle: &'a InstrumentHandle,
        period: Period,
        interval: Interval,
    ) -> Pin<Box<dyn Future<Output = Result<PriceHistory, SourceError>> + Send + 'a>> {
        Box::pin(async move {
            if self.is_real_client() {
                let url = format!("{CHART_URL}/{}", urlencoding::encode(handle.symbol.as_str()));
                let body = self
                    .fetch_body(
                        &url,
                        &[
                            ("range", period.as_str()),
                            ("interval", interval.as_str()),
                            ("events", "div,splits"),
                            ("includeAdjustedClose", "true"),
                        ],
                    )
                    .await?;
                parse_history(&body)
            } else {
                fake_history(handle, period, interval, self.anchor())
            }
        })
    }

    fn earnings_dates<'a>(
        &'a self,
        handle: &'a InstrumentHandle,
    ) -> Pin<Box<dyn Future<Output = Result<Option<Vec<Date>>, SourceError>> + Send + 'a>> {
        Box::pin(async move {
            if !handle.asset_class.has_earnings() {
                return Ok(None);
            }

            if self.is_real_client() {
                let url = format!("{QUOTE_SUMMARY_URL}/{}", urlencoding::encode(handle.symbol.as_str()));
                let body = self.fetch_body(&url, &[("modules", "calendarEvents")]).await?;
                let upcoming = parse_upcoming_earnings(&body)?;

                let announced = match self.fetch(announcements_request(&handle.symbol)).await {
                    Ok(body) => parse_announcements(&body)?,
                    Err(error) if upcoming.is_some() => {
                        warn!(symbol = %handle.symbol, %error, "yahoo earnings calendar unavailable; using upcoming dates only");
                        Vec::new()
                    }
                    Err(error) => return Err(error),
                };
                Ok(merge_earnings(upcoming, announced))
            } else {
                Ok(Some(fake_earnings(&handle.symbol, self.anchor())))
            }
        })
    }
}

// Response parsing
fn parse_instrument(requested: &Symbol, body: &str) -> Result<InstrumentHandle, SourceError> {
    let response: QuoteSummaryResponse = serde_json::from_str(body)
        .map_err(|e| SourceError::internal(format!("failed to parse yahoo quoteSummary: {e}")))?;
    let result = first_summary_result(response, requested)?;

    let price = result.price.unwrap_or_default();
    let quote_type = result.quote_type.unwrap_or_default();

    let raw_symbol = price
        .symbol
        .or(quote_type.symbol)
        .filter(|value| !value.trim().is_empty())
        .ok_or_else(|| {
            SourceError::not_found(format!("yahoo returned no symbol for '{requested}'"))
        })?;
    let symbol = Symbol::parse(&raw_symbol).map_err(validation_to_error)?;
    let asset_class = AssetClass::from_quote_type(
        price
            .quote_type
            .or(quote_type.quote_type)
            .as_deref()
            .unwrap_or_default(),
    );

    Ok(InstrumentHandle::new(symbol, asset_class)
        .with_names(
            price.short_name.or(quote_type.short_name),
            price.long_name.or(quote_type.long_name),
        )
        .with_currency(price.currency))
}

fn parse_history(body: &str) -> Result<PriceHistory, SourceError> {
    let response: ChartResponse = serde_json::from_str(body)
        .map_err(|e| SourceError::internal(format!("failed to parse yahoo chart: {e}")))?;

    if let Some(error) = response.chart.error.filter(|error| !error.is_null()) {
        return Err(SourceError::not_found(format!("yahoo chart API error: {error}")));
    }

    let result = response
        .chart
        .result
        .unwrap_or_default()
        .into_iter()
        .next()
        .ok_or_else(|| SourceError::not_found("no chart data in response"))?;

    let offset = result.meta.and_then(|meta| meta.gmtoffset).unwrap_or(0);
    let quote = result.indicators.quote.into_iter().next().unwrap_or_default();
    let adjclose = result
        .indicators
        .adjclose
        .into_iter()
        .next()
        .map(|series| series.adjclose)
        .unwrap_or_default();

    let mut bars = Vec::with_capacity(result.timestamp.len());
    for (index, &timestamp) in result.timestamp.iter().enumerate() {
        // Only rows with a complete OHLC quadruple become bars.
        let (Some(open), Some(high), Some(low), Some(close)) = (
            value_at(&quote.open, index),
            value_at(&quote.high, index),
            value_at(&quote.low, index),
            value_at(&quote.close, index),
        ) else {
            continue;
        };

        let ratio = value_at(&adjclose, index)
            .filter(|_| close > 0.0)
            .map(|adjusted| adjusted / close)
            .unwrap_or(1.0);
        let volume = quote
            .volume
            .get(index)
            .copied()
            .flatten()
            .map(|volume| volume.max(0) as u64)
            .unwrap_or(0);
        let date = date_from_unix(timestamp, offset).map_err(validation_to_error)?;

        match PriceBar::new(date, open * ratio, high * ratio, low * ratio, close * ratio, volume) {
            Ok(bar) => bars.push(bar),
            Err(error) => debug!(%date, %error, "skipping malformed yahoo bar"),
        }
    }

    PriceHistory::new(bars).map_err(|_| SourceError::not_found("yahoo returned no usable price bars"))
}

/// Announcement calendar query: earnings events (`eventtype` 2) for one
/// ticker, newest first.
fn announcements_request(symbol: &Symbol) -> HttpRequest {
    let body = serde_json::json!({
        "size": ANNOUNCEMENT_LIMIT,
        "offset": 0,
        "sortField": "startdatetime",
        "sortType": "DESC",
        "entityIdType": "earnings",
        "includeFields": ["ticker", "startdatetime", "eventtype"],
        "query": {
            "operator": "and",
            "operands": [
                {"operator": "eq", "operands": ["ticker", symbol.as_str()]},
                {"operator": "eq", "operands": ["eventtype", "2"]}
            ]
        }
    });

    HttpRequest::post(VISUALIZATION_URL)
        .with_query("lang", "en-US")
        .with_query("region", "US")
        .with_header("content-type", "application/json")
        .with_body(body.to_string())
}

/// Upcoming announcement dates from `calendarEvents`; `None` when Yahoo has
/// no such module for the instrument.
fn parse_upcoming_earnings(body: &str) -> Result<Option<Vec<Date>>, SourceError> {
    let response: QuoteSummaryResponse = serde_json::from_str(body)
        .map_err(|e| SourceError::internal(format!("failed to parse yahoo earnings: {e}")))?;

    let Some(events) = response
        .quote_summary
        .result
        .unwrap_or_default()
        .into_iter()
        .next()
        .and_then(|result| result.calendar_events)
    else {
        return Ok(None);
    };

    events
        .earnings
        .map(|earnings| earnings.earnings_date)
        .unwrap_or_default()
        .into_iter()
        .filter_map(|value| value.raw)
        .map(|raw| date_from_unix(raw, 0).map_err(validation_to_error))
        .collect::<Result<Vec<_>, _>>()
        .map(Some)
}

/// Announcement dates (`startdatetime`) from the earnings calendar.
fn parse_announcements(body: &str) -> Result<Vec<Date>, SourceError> {
    let response: VisualizationResponse = serde_json::from_str(body).map_err(|e| {
        SourceError::internal(format!("failed to parse yahoo earnings calendar: {e}"))
    })?;

    let mut dates = Vec::new();
    for document in response
        .finance
        .result
        .unwrap_or_default()
        .into_iter()
        .flat_map(|result| result.documents)
    {
        let Some(column) = document
            .columns
            .iter()
            .position(|column| column.id == "startdatetime")
        else {
            continue;
        };
        for row in &document.rows {
            let Some(stamp) = row.get(column).and_then(Value::as_str) else {
                continue;
            };
            dates.push(parse_date_prefix(stamp).map_err(validation_to_error)?);
        }
    }
    Ok(dates)
}

fn merge_earnings(upcoming: Option<Vec<Date>>, announced: Vec<Date>) -> Option<Vec<Date>> {
    if upcoming.is_none() && announced.is_empty() {
        return None;
    }

    let mut dates = upcoming.unwrap_or_default();
    dates.extend(announced);
    dates.sort();
    dates.dedup();
    Some(dates)
}

fn first_summary_result(
    response: QuoteSummaryResponse,
    requested: &Symbol,
) -> Result<QuoteSummaryResult, SourceError> {
    if let Some(error) = response.quote_summary.error.filter(|error| !error.is_null()) {
        return Err(SourceError::not_found(format!(
            "yahoo quoteSummary error for '{requested}': {error}"
        )));
    }

    response
        .quote_summary
        .result
        .unwrap_or_default()
        .into_iter()
        .next()
        .ok_or_else(|| SourceError::not_found(format!("yahoo has no record for '{requested}'")))
}

fn value_at(values: &[Option<f64>], index: usize) -> Option<f64> {
    values
        .get(index)
        .copied()
        .flatten()
        .filter(|value| value.is_finite())
}

fn status_error(status: u16) -> SourceError {
    match status {
        404 => SourceError::not_found("yahoo returned status 404"),
        429 => SourceError::rate_limited("yahoo returned status 429 after auth refresh"),
        _ => SourceError::unavailable(format!("yahoo returned status {status}")),
    }
}

fn validation_to_error(error: ValidationError) -> SourceError {
    SourceError::internal(error.to_string())
}

// Fake data methods (offline mode)
impl YahooAdapter {
    fn anchor(&self) -> Date {
        self.fake_anchor
            .unwrap_or_else(|| OffsetDateTime::now_utc().date())
    }
}

struct CatalogEntry {
    symbol: &'static str,
    short_name: &'static str,
    long_name: &'static str,
    asset_class: AssetClass,
    currency: Option<&'static str>,
}

const CATALOG: [CatalogEntry; 8] = [
    CatalogEntry {
        symbol: "AAPL",
        short_name: "Apple Inc.",
        long_name: "Apple Inc.",
        asset_class: AssetClass::Equity,
        currency: Some("USD"),
    },
    CatalogEntry {
        symbol: "MSFT",
        short_name: "Microsoft Corporation",
        long_name: "Microsoft Corporation",
        asset_class: AssetClass::Equity,
        currency: Some("USD"),
    },
    CatalogEntry {
        symbol: "NVDA",
        short_name: "NVIDIA Corporation",
        long_name: "NVIDIA Corporation",
        asset_class: AssetClass::Equity,
        currency: Some("USD"),
    },
    CatalogEntry {
        symbol: "TSLA",
        short_name: "Tesla, Inc.",
        long_name: "Tesla, Inc.",
        asset_class: AssetClass::Equity,
        currency: Some("USD"),
    },
    CatalogEntry {
        symbol: "SPY",
        short_name: "SPDR S&P 500",
        long_name: "SPDR S&P 500 ETF Trust",
        asset_class: AssetClass::Etf,
        currency: Some("USD"),
    },
    CatalogEntry {
        symbol: "^GSPC",
        short_name: "S&P 500",
        long_name: "S&P 500",
        asset_class: AssetClass::Index,
        currency: Some("USD"),
    },
    CatalogEntry {
        symbol: "BTC-USD",
        short_name: "Bitcoin USD",
        long_name: "Bitcoin USD",
        asset_class: AssetClass::Crypto,
        currency: Some("USD"),
    },
    CatalogEntry {
        symbol: "EURUSD=X",
        short_name: "EUR/USD",
        long_name: "EUR/USD",
        asset_class: AssetClass::Forex,
        currency: None,
    },
];

fn fake_instrument(symbol: &Symbol) -> Result<InstrumentHandle, SourceError> {
    let entry = CATALOG
        .iter()
        .find(|entry| entry.symbol == symbol.as_str())
        .ok_or_else(|| SourceError::not_found(format!("yahoo has no record for '{symbol}'")))?;

    Ok(InstrumentHandle::new(symbol.clone(), entry.asset_class)
        .with_names(
            Some(entry.short_name.to_owned()),
            Some(entry.long_name.to_owned()),
        )
        .with_currency(entry.currency.map(str::to_owned)))
}

fn fake_history(
    handle: &InstrumentHandle,
    period: Period,
    interval: Interval,
    anchor: Date,
) -> Result<PriceHistory, SourceError> {
    let start = sub_months(anchor, period.months())
        .ok_or_else(|| SourceError::internal("fake history start date out of range"))?;
    let dates = fake_dates(start, anchor, interval);

    let seed = symbol_seed(&handle.symbol);
    let base = 90.0 + (seed % 350) as f64 / 10.0;
    let bars = dates
        .into_iter()
        .enumerate()
        .map(|(index, date)| {
            let drift = ((seed + index as u64 * 7) % 23) as f64 / 10.0 - 1.1;
            let close = base + drift + index as f64 * 0.05;
            let open = close - 0.30;
            PriceBar::new(
                date,
                open,
                close + 1.20,
                open - 0.80,
                close,
                20_000 + (seed + index as u64 * 37) % 5_000,
            )
            .map_err(validation_to_error)
        })
        .collect::<Result<Vec<_>, _>>()?;

    PriceHistory::new(bars).map_err(validation_to_error)
}

/// Weekdays in `(start, end]` for daily data, Mondays in `[start, end]` for weekly.
fn fake_dates(start: Date, end: Date, interval: Interval) -> Vec<Date> {
    let mut dates = Vec::new();
    match interval {
        Interval::OneDay => {
            let mut cursor = start;
            while let Some(next) = cursor.next_day().filter(|next| *next <= end) {
                if !matches!(next.weekday(), Weekday::Saturday | Weekday::Sunday) {
                    dates.push(next);
                }
                cursor = next;
            }
        }
        Interval::OneWeek => {
            let mut cursor = Some(start);
            while let Some(date) = cursor.filter(|date| date.weekday() != Weekday::Monday) {
                cursor = date.next_day();
            }
            while let Some(date) = cursor.filter(|date| *date <= end) {
                dates.push(date);
                cursor = date.checked_add(Duration::weeks(1));
            }
        }
    }
    dates
}

/// Quarterly announcement dates spread around the anchor.
fn fake_earnings(symbol: &Symbol, anchor: Date) -> Vec<Date> {
    let offset = (symbol_seed(symbol) % 20) as i64;
    (-4_i64..=2)
        .filter_map(|quarter| anchor.checked_add(Duration::days(quarter * 91 + offset)))
        .collect()
}

fn symbol_seed(symbol: &Symbol) -> u64 {
    symbol.as_str().bytes().fold(0_u64, |acc, byte| {
        acc.wrapping_mul(33).wrapping_add(byte as u64)
    })
}

// Yahoo Finance API response structures
#[derive(Debug, Default, Deserialize)]
struct QuoteSummaryResponse {
    #[serde(rename = "quoteSummary", default)]
    quote_summary: QuoteSummaryData,
}

#[derive(Debug, Default, Deserialize)]
struct QuoteSummaryData {
    #[serde(default)]
    result: Option<Vec<QuoteSummaryResult>>,
    #[serde(default)]
    error: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuoteSummaryResult {
    #[serde(default)]
    price: Option<PriceModule>,
    #[serde(default)]
    quote_type: Option<PriceModule>,
    #[serde(default)]
    calendar_events: Option<CalendarEventsModule>,
}

/// Shared shape of the `price` and `quoteType` modules.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PriceModule {
    #[serde(default)]
    symbol: Option<String>,
    #[serde(default)]
    short_name: Option<String>,
    #[serde(default)]
    long_name: Option<String>,
    #[serde(default)]
    currency: Option<String>,
    #[serde(default)]
    quote_type: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct CalendarEventsModule {
    #[serde(default)]
    earnings: Option<CalendarEarnings>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CalendarEarnings {
    #[serde(default)]
    earnings_date: Vec<RawTimestamp>,
}

#[derive(Debug, Default, Deserialize)]
struct VisualizationResponse {
    #[serde(default)]
    finance: VisualizationData,
}

#[derive(Debug, Default, Deserialize)]
struct VisualizationData {
    #[serde(default)]
    result: Option<Vec<VisualizationResult>>,
}

#[derive(Debug, Default, Deserialize)]
struct VisualizationResult {
    #[serde(default)]
    documents: Vec<VisualizationDocument>,
}

/// Column-major table: `rows[i][j]` holds the value of `columns[j]`.
#[derive(Debug, Default, Deserialize)]
struct VisualizationDocument {
    #[serde(default)]
    columns: Vec<VisualizationColumn>,
    #[serde(default)]
    rows: Vec<Vec<Value>>,
}

#[derive(Debug, Default, Deserialize)]
struct VisualizationColumn {
    #[serde(default)]
    id: String,
}

/// Yahoo wraps values as `{"raw": 1714075200, "fmt": "2024-04-25"}`.
#[derive(Debug, Default, Deserialize)]
struct RawTimestamp {
    #[serde(default)]
    raw: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
struct ChartResponse {
    #[serde(default)]
    chart: ChartData,
}

#[derive(Debug, Default, Deserialize)]
struct ChartData {
    #[serde(default)]
    result: Option<Vec<ChartResult>>,
    #[serde(default)]
    error: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
struct ChartResult {
    #[serde(default)]
    meta: Option<ChartMeta>,
    #[serde(default)]
    timestamp: Vec<i64>,
    #[serde(default)]
    indicators: ChartIndicators,
}

#[derive(Debug, Default, Deserialize)]
struct ChartMeta {
    #[serde(default)]
    gmtoffset: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
struct ChartIndicators {
    #[serde(default)]
    quote: Vec<ChartQuote>,
    #[serde(default)]
    adjclose: Vec<ChartAdjClose>,
}

#[derive(Debug, Default, Deserialize)]
struct ChartQuote {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<i64>>,
}

#[derive(Debug, Default, Deserialize)]
struct ChartAdjClose {
    #[serde(default)]
    adjclose: Vec<Option<f64>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_source::SourceErrorKind;
    use crate::http_client::{HttpError, HttpMethod};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use time::macros::date;

    type Handler = Box<dyn Fn(&HttpRequest) -> Result<HttpResponse, HttpError> + Send + Sync>;

    struct ScriptedHttpClient {
        handler: Handler,
        requests: Mutex<Vec<HttpRequest>>,
    }

    impl ScriptedHttpClient {
        fn new(handler: Handler) -> Self {
            Self {
                handler,
                requests: Mutex::new(Vec::new()),
            }
        }

        fn recorded_urls(&self) -> Vec<String> {
            self.requests
                .lock()
                .expect("request store should not be poisoned")
                .iter()
                .map(HttpRequest::full_url)
                .collect()
        }
    }

    impl HttpClient for ScriptedHttpClient {
        fn execute<'a>(
            &'a self,
            request: HttpRequest,
        ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, HttpError>> + Send + 'a>> {
            let response = (self.handler)(&request);
            self.requests
                .lock()
                .expect("request store should not be poisoned")
                .push(request);
            Box::pin(async move { response })
        }
    }

    const CHART_BODY: &str = r#"{"chart":{"result":[{"meta":{"symbol":"AAPL","gmtoffset":-14400},
        "timestamp":[1709645400,1709731800,1709818200],
        "indicators":{"quote":[{"open":[170.0,171.0,null],"high":[172.0,173.0,174.0],
        "low":[169.0,170.0,171.0],"close":[171.0,172.0,173.0],"volume":[1000,2000,3000]}],
        "adjclose":[{"adjclose":[85.5,86.0,86.5]}]}}],"error":null}}"#;

    fn routed(chart_status: u16) -> Handler {
        Box::new(move |request| {
            let url = request.full_url();
            if url.starts_with(COOKIE_URL) {
                Ok(HttpResponse::with_status(404, ""))
            } else if url.contains("getcrumb") {
                Ok(HttpResponse::ok_json("crumb-1"))
            } else if url.contains("/v8/finance/chart/") {
                Ok(HttpResponse::with_status(chart_status, CHART_BODY))
            } else {
                Ok(HttpResponse::with_status(500, ""))
            }
        })
    }

    fn aapl() -> InstrumentHandle {
        InstrumentHandle::new(Symbol::parse("AAPL").expect("valid"), AssetClass::Equity)
    }

    #[tokio::test]
    async fn history_is_adjusted_and_skips_incomplete_rows() {
        let client = Arc::new(ScriptedHttpClient::new(routed(200)));
        let adapter = YahooAdapter::with_http_client(client.clone());

        let history = adapter
            .history(&aapl(), Period::ThreeMonths, Interval::OneDay)
            .await
            .expect("history should parse");

        assert_eq!(history.len(), 2);
        assert_eq!(history.dates(), vec![date!(2024 - 03 - 05), date!(2024 - 03 - 06)]);
        assert_eq!(history.bars()[0].close, 85.5);
        assert_eq!(history.bars()[0].open, 85.0);
        assert_eq!(history.bars()[1].volume, 2000);

        let chart_url = client
            .recorded_urls()
            .into_iter()
            .find(|url| url.contains("/v8/finance/chart/"))
            .expect("chart request issued");
        assert!(chart_url.contains("range=3mo"));
        assert!(chart_url.contains("interval=1d"));
        assert!(chart_url.contains("crumb=crumb-1"));
    }

    #[tokio::test]
    async fn unauthorized_response_refreshes_crumb_once() {
        let chart_calls = Arc::new(AtomicUsize::new(0));
        let counter = chart_calls.clone();
        let client = Arc::new(ScriptedHttpClient::new(Box::new(move |request| {
            let url = request.full_url();
            if url.contains("getcrumb") {
                Ok(HttpResponse::ok_json("crumb-2"))
            } else if url.contains("/v8/finance/chart/") {
                if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                    Ok(HttpResponse::with_status(401, "Unauthorized"))
                } else {
                    Ok(HttpResponse::ok_json(CHART_BODY))
                }
            } else {
                Ok(HttpResponse::with_status(404, ""))
            }
        })));
        let adapter = YahooAdapter::with_http_client(client.clone());

        let history = adapter
            .history(&aapl(), Period::OneMonth, Interval::OneDay)
            .await
            .expect("retry after refresh should succeed");

        assert_eq!(history.len(), 2);
        assert_eq!(chart_calls.load(Ordering::SeqCst), 2);
        let crumb_fetches = client
            .recorded_urls()
            .iter()
            .filter(|url| url.contains("getcrumb"))
            .count();
        assert_eq!(crumb_fetches, 2);
    }

    #[tokio::test]
    async fn unknown_symbol_maps_to_not_found() {
        let client = Arc::new(ScriptedHttpClient::new(Box::new(|request| {
            let url = request.full_url();
            if url.contains("getcrumb") {
                Ok(HttpResponse::ok_json("crumb"))
            } else if url.contains("quoteSummary") {
                Ok(HttpResponse::with_status(
                    404,
                    r#"{"quoteSummary":{"result":null,"error":{"code":"Not Found"}}}"#,
                ))
            } else {
                Ok(HttpResponse::with_status(404, ""))
            }
        })));
        let adapter = YahooAdapter::with_http_client(client);
        let symbol = Symbol::parse("XXXXXXXXX").expect("syntactically valid");

        let error = adapter.resolve(&symbol).await.expect_err("must fail");
        assert_eq!(error.kind(), SourceErrorKind::NotFound);
    }

    #[test]
    fn parses_instrument_names_currency_and_class() {
        let body = r#"{"quoteSummary":{"result":[{"price":{"symbol":"AAPL","shortName":"Apple Inc.",
            "longName":"Apple Inc.","currency":"USD","quoteType":"EQUITY"}}],"error":null}}"#;
        let handle = parse_instrument(&Symbol::parse("aapl").expect("valid"), body).expect("valid");

        assert_eq!(handle.symbol.as_str(), "AAPL");
        assert_eq!(handle.display_name().as_deref(), Some("Apple Inc."));
        assert_eq!(handle.currency(), "USD");
        assert_eq!(handle.asset_class, AssetClass::Equity);
    }

    #[test]
    fn record_without_symbol_is_not_found() {
        let body = r#"{"quoteSummary":{"result":[{"price":{"shortName":"Ghost"}}],"error":null}}"#;
        let error = parse_instrument(&Symbol::parse("GHST").expect("valid"), body).expect_err("must fail");
        assert_eq!(error.kind(), SourceErrorKind::NotFound);
    }

    const CALENDAR_EVENTS_BODY: &str = r#"{"quoteSummary":{"result":[{
        "calendarEvents":{"earnings":{"earningsDate":[{"raw":1714075200,"fmt":"2024-04-25"}]}}
    }],"error":null}}"#;

    const ANNOUNCEMENTS_BODY: &str = r#"{"finance":{"result":[{"documents":[{
        "columns":[{"id":"ticker"},{"id":"startdatetime"},{"id":"eventtype"}],
        "rows":[
            ["AAPL","2024-05-02T20:30:00.000Z","ERN"],
            ["AAPL","2024-02-01T21:30:00.000Z","ERN"],
            ["AAPL",null,"ERN"]
        ]
    }]}],"error":null}}"#;

    #[test]
    fn announcements_use_event_start_not_fiscal_quarter_end() {
        let dates = parse_announcements(ANNOUNCEMENTS_BODY).expect("valid");
        assert_eq!(dates, vec![date!(2024 - 05 - 02), date!(2024 - 02 - 01)]);
        assert!(!dates.contains(&date!(2023 - 12 - 30)));
    }

    #[test]
    fn earnings_merge_upcoming_and_announced_dates() {
        let upcoming = parse_upcoming_earnings(CALENDAR_EVENTS_BODY).expect("valid");
        let announced = parse_announcements(ANNOUNCEMENTS_BODY).expect("valid");

        assert_eq!(
            merge_earnings(upcoming, announced),
            Some(vec![date!(2024 - 02 - 01), date!(2024 - 04 - 25), date!(2024 - 05 - 02)])
        );
    }

    #[test]
    fn earnings_without_any_source_are_not_applicable() {
        let body = r#"{"quoteSummary":{"result":[{}],"error":null}}"#;
        let upcoming = parse_upcoming_earnings(body).expect("valid");
        assert_eq!(upcoming, None);
        assert_eq!(merge_earnings(upcoming, Vec::new()), None);
    }

    #[tokio::test]
    async fn live_earnings_post_calendar_query_for_announcements() {
        let client = Arc::new(ScriptedHttpClient::new(Box::new(|request| {
            let url = request.full_url();
            if url.contains("getcrumb") {
                Ok(HttpResponse::ok_json("crumb"))
            } else if url.contains("/visualization") {
                let body = request.body.as_deref().unwrap_or_default();
                if request.method == HttpMethod::Post && body.contains("\"AAPL\"") {
                    Ok(HttpResponse::ok_json(ANNOUNCEMENTS_BODY))
                } else {
                    Ok(HttpResponse::with_status(400, ""))
                }
            } else if url.contains("quoteSummary") {
                Ok(HttpResponse::ok_json(CALENDAR_EVENTS_BODY))
            } else {
                Ok(HttpResponse::with_status(404, ""))
            }
        })));
        let adapter = YahooAdapter::with_http_client(client);
        let handle = InstrumentHandle::new(Symbol::parse("AAPL").expect("valid"), AssetClass::Equity);

        let dates = adapter
            .earnings_dates(&handle)
            .await
            .expect("no error")
            .expect("applicable");

        assert_eq!(
            dates,
            vec![date!(2024 - 02 - 01), date!(2024 - 04 - 25), date!(2024 - 05 - 02)]
        );
    }

    #[tokio::test]
    async fn failed_calendar_query_keeps_upcoming_dates() {
        let client = Arc::new(ScriptedHttpClient::new(Box::new(|request| {
            let url = request.full_url();
            if url.contains("getcrumb") {
                Ok(HttpResponse::ok_json("crumb"))
            } else if url.contains("quoteSummary") {
                Ok(HttpResponse::ok_json(CALENDAR_EVENTS_BODY))
            } else {
                Ok(HttpResponse::with_status(503, ""))
            }
        })));
        let adapter = YahooAdapter::with_http_client(client);
        let handle = InstrumentHandle::new(Symbol::parse("AAPL").expect("valid"), AssetClass::Equity);

        let dates = adapter.earnings_dates(&handle).await.expect("degrades");
        assert_eq!(dates, Some(vec![date!(2024 - 04 - 25)]));
    }

    #[tokio::test]
    async fn fake_mode_serves_catalog_and_rejects_unknown_symbols() {
        let adapter = YahooAdapter::default().with_fake_anchor(date!(2024 - 06 - 28));
        let symbol = Symbol::parse("AAPL").expect("valid");

        let handle = adapter.resolve(&symbol).await.expect("catalog symbol");
        let history = adapter
            .history(&handle, Period::ThreeMonths, Interval::OneDay)
            .await
            .expect("fake history");
        assert_eq!(history.end_date(), date!(2024 - 06 - 28));
        assert!(history.start_date() > date!(2024 - 03 - 28));
        assert!(history
            .dates()
            .iter()
            .all(|date| !matches!(date.weekday(), Weekday::Saturday | Weekday::Sunday)));

        let unknown = Symbol::parse("XXXXXXXXX").expect("valid");
        let error = adapter.resolve(&unknown).await.expect_err("must fail");
        assert_eq!(error.kind(), SourceErrorKind::NotFound);
    }

    #[tokio::test]
    async fn non_equities_have_no_earnings_concept() {
        let adapter = YahooAdapter::default();
        let index = adapter
            .resolve(&Symbol::parse("^GSPC").expect("valid"))
            .await
            .expect("catalog symbol");

        assert_eq!(adapter.earnings_dates(&index).await.expect("no error"), None);
    }

    #[test]
    fn weekly_fake_dates_fall_on_mondays() {
        let dates = fake_dates(date!(2024 - 01 - 03), date!(2024 - 02 - 05), Interval::OneWeek);
        assert_eq!(dates.first(), Some(&date!(2024 - 01 - 08)));
        assert_eq!(dates.last(), Some(&date!(2024 - 02 - 05)));
        assert!(dates.iter().all(|date| date.weekday() == Weekday::Monday));
    }
}
