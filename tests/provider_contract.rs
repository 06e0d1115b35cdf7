use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use time::macros::date;

use tickersense_core::{
    AssetClass, HttpClient, HttpError, HttpRequest, HttpResponse, InstrumentHandle, Interval,
    MarketDataAcquirer, MarketDataSource, Period, PipelineError, SourceErrorKind, Symbol,
    YahooAdapter, CURRENCY_UNDEFINED,
};

type Handler = Box<dyn Fn(&HttpRequest) -> Result<HttpResponse, HttpError> + Send + Sync>;

struct ScriptedHttpClient {
    handler: Handler,
    requests: Mutex<Vec<String>>,
}

impl ScriptedHttpClient {
    fn new(handler: Handler) -> Arc<Self> {
        Arc::new(Self {
            handler,
            requests: Mutex::new(Vec::new()),
        })
    }

    fn urls(&self) -> Vec<String> {
        self.requests.lock().expect("request log").clone()
    }
}

impl HttpClient for ScriptedHttpClient {
    fn execute<'a>(
        &'a self,
        request: HttpRequest,
    ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, HttpError>> + Send + 'a>> {
        let response = (self.handler)(&request);
        self.requests.lock().expect("request log").push(request.full_url());
        Box::pin(async move { response })
    }
}

/// Cookie and crumb succeed; everything else is answered by `quote_summary`.
fn with_crumb(quote_summary: fn(&str) -> Result<HttpResponse, HttpError>) -> Handler {
    Box::new(move |request| {
        let url = request.full_url();
        if url.contains("fc.yahoo.com") {
            Ok(HttpResponse::with_status(404, ""))
        } else if url.contains("getcrumb") {
            Ok(HttpResponse::ok_json("abc123"))
        } else {
            quote_summary(&url)
        }
    })
}

fn symbol(raw: &str) -> Symbol {
    Symbol::parse(raw).expect("valid symbol")
}

fn fake_adapter() -> YahooAdapter {
    YahooAdapter::default().with_fake_anchor(date!(2024 - 06 - 28))
}

// =============================================================================
// Offline catalog
// =============================================================================

#[tokio::test]
async fn test_every_catalog_symbol_resolves_with_a_display_name() {
    let adapter = fake_adapter();
    for raw in ["AAPL", "MSFT", "NVDA", "TSLA", "SPY", "^GSPC", "BTC-USD", "EURUSD=X"] {
        let handle = adapter.resolve(&symbol(raw)).await.expect("catalog symbol");
        assert_eq!(handle.symbol.as_str(), raw);
        assert!(handle.display_name().is_some(), "{raw} has no display name");
    }
}

#[tokio::test]
async fn test_history_bars_are_ascending_and_well_formed() {
    let adapter = fake_adapter();
    let handle = adapter.resolve(&symbol("NVDA")).await.expect("catalog symbol");

    for (period, interval) in [
        (Period::OneMonth, Interval::OneDay),
        (Period::ThreeMonths, Interval::OneDay),
        (Period::SixMonths, Interval::OneWeek),
    ] {
        let history = adapter
            .history(&handle, period, interval)
            .await
            .expect("fake history");

        assert!(!history.is_empty());
        assert!(history.dates().windows(2).all(|pair| pair[0] < pair[1]));
        assert!(history.bars().iter().all(|bar| bar.low <= bar.high && bar.volume > 0));
        assert!(history.end_date() <= date!(2024 - 06 - 28));
    }
}

#[tokio::test]
async fn test_only_equities_report_earnings() {
    let adapter = fake_adapter();

    let equity = adapter.resolve(&symbol("TSLA")).await.expect("catalog symbol");
    let dates = adapter
        .earnings_dates(&equity)
        .await
        .expect("no error")
        .expect("equities have earnings");
    assert!(!dates.is_empty());
    assert!(dates.windows(2).all(|pair| pair[0] < pair[1]));

    for raw in ["SPY", "^GSPC", "BTC-USD", "EURUSD=X"] {
        let handle = adapter.resolve(&symbol(raw)).await.expect("catalog symbol");
        assert_eq!(adapter.earnings_dates(&handle).await.expect("no error"), None, "{raw}");
    }
}

#[tokio::test]
async fn test_missing_currency_falls_back_to_sentinel() {
    let handle = fake_adapter()
        .resolve(&symbol("EURUSD=X"))
        .await
        .expect("catalog symbol");

    assert_eq!(MarketDataAcquirer::currency(&handle), CURRENCY_UNDEFINED);
}

// =============================================================================
// Live transport
// =============================================================================

#[tokio::test]
async fn test_live_resolve_reads_price_module_and_sends_crumb() {
    let client = ScriptedHttpClient::new(with_crumb(|_| {
        Ok(HttpResponse::ok_json(
            r#"{"quoteSummary":{"result":[{"price":{"symbol":"SPY","shortName":"SPDR S&P 500",
            "longName":"SPDR S&P 500 ETF Trust","currency":"USD","quoteType":"ETF"}}],"error":null}}"#,
        ))
    }));
    let adapter = YahooAdapter::with_http_client(client.clone());
    assert!(adapter.is_real_client());

    let handle = adapter.resolve(&symbol("spy")).await.expect("resolved");

    assert_eq!(handle.asset_class, AssetClass::Etf);
    assert_eq!(handle.display_name().as_deref(), Some("SPDR S&P 500"));
    assert_eq!(handle.currency(), "USD");
    assert!(client
        .urls()
        .iter()
        .any(|url| url.contains("quoteSummary/SPY") && url.contains("crumb=abc123")));
}

#[tokio::test]
async fn test_crumb_is_fetched_once_across_calls() {
    let client = ScriptedHttpClient::new(with_crumb(|_| {
        Ok(HttpResponse::ok_json(
            r#"{"quoteSummary":{"result":[{"price":{"symbol":"AAPL","shortName":"Apple Inc.","quoteType":"EQUITY"}}],"error":null}}"#,
        ))
    }));
    let adapter = YahooAdapter::with_http_client(client.clone());

    adapter.resolve(&symbol("AAPL")).await.expect("first");
    adapter.resolve(&symbol("AAPL")).await.expect("second");

    let crumb_calls = client.urls().iter().filter(|url| url.contains("getcrumb")).count();
    assert_eq!(crumb_calls, 1);
}

#[tokio::test]
async fn test_server_errors_are_retryable_unavailable() {
    let client = ScriptedHttpClient::new(with_crumb(|_| Ok(HttpResponse::with_status(503, ""))));
    let adapter = YahooAdapter::with_http_client(client);

    let error = adapter.resolve(&symbol("AAPL")).await.expect_err("must fail");
    assert_eq!(error.kind(), SourceErrorKind::Unavailable);
    assert!(error.retryable());
}

#[tokio::test]
async fn test_crumb_rate_limit_is_reported_as_rate_limited() {
    let client = ScriptedHttpClient::new(Box::new(|request| {
        if request.full_url().contains("getcrumb") {
            Ok(HttpResponse::ok_json("Too Many Requests"))
        } else {
            Ok(HttpResponse::with_status(404, ""))
        }
    }));
    let adapter = YahooAdapter::with_http_client(client);

    let error = adapter.resolve(&symbol("AAPL")).await.expect_err("must fail");
    assert_eq!(error.kind(), SourceErrorKind::RateLimited);
    assert_eq!(error.code(), "source.rate_limited");
}

#[tokio::test]
async fn test_non_retryable_transport_errors_are_internal() {
    let client = ScriptedHttpClient::new(with_crumb(|_| {
        Err(HttpError::non_retryable("certificate rejected"))
    }));
    let adapter = YahooAdapter::with_http_client(client);

    let error = adapter.resolve(&symbol("AAPL")).await.expect_err("must fail");
    assert_eq!(error.kind(), SourceErrorKind::Internal);
    assert!(!error.retryable());
}

#[tokio::test]
async fn test_live_earnings_for_equity_without_modules_are_not_applicable() {
    let client = ScriptedHttpClient::new(with_crumb(|_| {
        Ok(HttpResponse::ok_json(r#"{"quoteSummary":{"result":[{}],"error":null}}"#))
    }));
    let adapter = YahooAdapter::with_http_client(client);
    let handle = InstrumentHandle::new(symbol("AAPL"), AssetClass::Equity);

    assert_eq!(adapter.earnings_dates(&handle).await.expect("no error"), None);
}

// =============================================================================
// Acquirer error mapping
// =============================================================================

#[tokio::test]
async fn test_lookup_failures_become_invalid_symbol() {
    let client = ScriptedHttpClient::new(with_crumb(|_| Ok(HttpResponse::with_status(404, ""))));
    let acquirer = MarketDataAcquirer::new(Arc::new(YahooAdapter::with_http_client(client)));

    let error = acquirer.resolve("zzzz").await.expect_err("must fail");
    match error {
        PipelineError::InvalidSymbol { symbol, reason } => {
            assert_eq!(symbol, "ZZZZ");
            assert!(reason.contains("404"), "{reason}");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_history_failures_become_acquisition_failure() {
    let client = ScriptedHttpClient::new(with_crumb(|url| {
        if url.contains("/v8/finance/chart/") {
            Ok(HttpResponse::ok_json(
                r#"{"chart":{"result":null,"error":{"code":"Not Found","description":"No data found"}}}"#,
            ))
        } else {
            Ok(HttpResponse::with_status(500, ""))
        }
    }));
    let acquirer = MarketDataAcquirer::new(Arc::new(YahooAdapter::with_http_client(client)));
    let handle = InstrumentHandle::new(symbol("AAPL"), AssetClass::Equity);

    let error = acquirer
        .history(&handle, Period::ThreeMonths, Interval::OneDay)
        .await
        .expect_err("must fail");

    assert_eq!(error.code(), "pipeline.acquisition_failure");
    assert!(matches!(error, PipelineError::AcquisitionFailure { ref symbol, .. } if symbol == "AAPL"));
}
