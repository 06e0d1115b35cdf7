//! Behavior-driven tests for news acquisition, relevance filtering and
//! sentiment aggregation.
//!
//! The NewsAPI client runs over a recording transport, the retry schedule
//! over a recording sleeper, so no test touches the network or waits.

use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use time::macros::date;
use time::Date;

use tickersense_core::news::{build_query, extract};
use tickersense_core::sentiment::{bounds, score, smooth};
use tickersense_core::{
    HttpClient, HttpError, HttpRequest, HttpResponse, LexiconClassifier, NewsAcquirer,
    NewsApiClient, NewsPayload, NewsProvider, NewsQuery, RawArticle, RecordingSleeper, RetryPolicy,
    SourceErrorKind,
};

// =============================================================================
// Transport stub
// =============================================================================

struct RecordingHttpClient {
    responses: Mutex<Vec<Result<HttpResponse, HttpError>>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl RecordingHttpClient {
    /// Responses are served in order; the last one repeats.
    fn new(responses: Vec<Result<HttpResponse, HttpError>>) -> Self {
        Self {
            responses: Mutex::new(responses),
            requests: Mutex::new(Vec::new()),
        }
    }

    fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().expect("requests lock").clone()
    }
}

impl HttpClient for RecordingHttpClient {
    fn execute<'a>(
        &'a self,
        request: HttpRequest,
    ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, HttpError>> + Send + 'a>> {
        self.requests.lock().expect("requests lock").push(request);
        let mut responses = self.responses.lock().expect("responses lock");
        let next = if responses.len() > 1 {
            responses.remove(0)
        } else {
            responses
                .first()
                .cloned()
                .unwrap_or_else(|| Err(HttpError::new("no scripted response")))
        };
        Box::pin(async move { next })
    }
}

const EVERYTHING_BODY: &str = r#"{
  "status": "ok",
  "totalResults": 4,
  "articles": [
    {"title": "Tesla deliveries beat estimates", "description": "EV maker tops forecasts", "content": null, "publishedAt": "2024-06-03T13:05:00Z"},
    {"title": "Auto stocks mixed", "description": "Tesla and peers trade flat", "content": "...", "publishedAt": "2024-06-03T18:00:00Z"},
    {"title": "Oil extends gains", "description": "Brent rises", "content": "Crude markets", "publishedAt": "2024-06-04T09:00:00Z"},
    {"title": null, "description": "tesla", "content": "tesla", "publishedAt": "2024-06-04T10:00:00Z"}
  ]
}"#;

fn acquirer(client: Arc<RecordingHttpClient>, api_key: Option<&str>, sleeper: Arc<RecordingSleeper>) -> NewsAcquirer {
    let provider = NewsApiClient::with_http_client(client, api_key.map(str::to_owned))
        .with_base_url("https://news.example/v2/everything");
    NewsAcquirer::new(
        Arc::new(provider),
        "en",
        vec![String::from("reuters.com"), String::from("cnbc.com")],
    )
    .with_policy(RetryPolicy::fixed(3, Duration::from_millis(250)))
    .with_sleeper(sleeper)
}

// =============================================================================
// News acquisition
// =============================================================================

#[tokio::test]
async fn when_news_is_fetched_query_uses_first_two_name_tokens_and_api_key_header() {
    // Given: a provider that answers immediately
    let client = Arc::new(RecordingHttpClient::new(vec![Ok(HttpResponse::ok_json(EVERYTHING_BODY))]));
    let sleeper = Arc::new(RecordingSleeper::new());

    // When: news for "Tesla, Inc." is fetched
    let (payload, term) = acquirer(client.clone(), Some("secret"), sleeper.clone())
        .fetch("Tesla, Inc.")
        .await;

    // Then: one request carried the query, language, domains and key
    assert_eq!(term, "tesla,");
    assert_eq!(payload.articles.len(), 4);
    let requests = client.requests();
    assert_eq!(requests.len(), 1);
    let query: BTreeMap<&str, &str> = requests[0]
        .query
        .iter()
        .map(|(name, value)| (name.as_str(), value.as_str()))
        .collect();
    assert_eq!(query.get("q"), Some(&"tesla, OR (tesla, AND inc.)"));
    assert_eq!(query.get("language"), Some(&"en"));
    assert_eq!(query.get("domains"), Some(&"reuters.com,cnbc.com"));
    assert_eq!(requests[0].headers.get("x-api-key").map(String::as_str), Some("secret"));
    assert!(requests[0].headers.contains_key("user-agent"));
    assert!(sleeper.pauses().is_empty());
}

#[tokio::test]
async fn when_provider_keeps_failing_acquirer_gives_up_after_three_attempts() {
    // Given: a provider that returns 503 and then malformed bodies
    let client = Arc::new(RecordingHttpClient::new(vec![
        Ok(HttpResponse::with_status(503, "unavailable")),
        Ok(HttpResponse::ok_json("{not json")),
        Ok(HttpResponse::ok_json(r#"{"status":"ok"}"#)),
    ]));
    let sleeper = Arc::new(RecordingSleeper::new());

    // When: news is fetched
    let (payload, term) = acquirer(client.clone(), Some("secret"), sleeper.clone())
        .fetch("Microsoft Corporation")
        .await;

    // Then: three attempts, fixed pauses between them, empty payload
    assert_eq!(client.requests().len(), 3);
    assert_eq!(sleeper.pauses(), vec![Duration::from_millis(250); 2]);
    assert!(payload.is_empty());
    assert_eq!(term, "microsoft");
}

#[tokio::test]
async fn when_transport_errors_then_recovers_payload_is_returned() {
    let client = Arc::new(RecordingHttpClient::new(vec![
        Err(HttpError::new("connection reset")),
        Ok(HttpResponse::ok_json(EVERYTHING_BODY)),
    ]));
    let sleeper = Arc::new(RecordingSleeper::new());

    let (payload, _) = acquirer(client.clone(), Some("secret"), sleeper.clone())
        .fetch("Tesla")
        .await;

    assert_eq!(client.requests().len(), 2);
    assert_eq!(sleeper.pauses().len(), 1);
    assert!(!payload.is_empty());
}

#[tokio::test]
async fn when_api_key_is_missing_no_request_is_sent_and_no_retry_happens() {
    let client = Arc::new(RecordingHttpClient::new(vec![Ok(HttpResponse::ok_json(EVERYTHING_BODY))]));
    let sleeper = Arc::new(RecordingSleeper::new());

    let (payload, term) = acquirer(client.clone(), None, sleeper.clone()).fetch("Tesla").await;

    assert!(payload.is_empty());
    assert_eq!(term, "tesla");
    assert!(client.requests().is_empty());
    assert!(sleeper.pauses().is_empty());
}

#[tokio::test]
async fn when_provider_reports_error_status_it_is_a_transient_failure() {
    let client = Arc::new(RecordingHttpClient::new(vec![Ok(HttpResponse::ok_json(
        r#"{"status":"error","code":"rateLimited","message":"slow down"}"#,
    ))]));
    let provider = NewsApiClient::with_http_client(client, Some(String::from("secret")));
    let query = NewsQuery::new("tesla", "en", Vec::new()).expect("valid query");

    let error = provider.search(&query).await.expect_err("error status");
    assert_eq!(error.kind(), SourceErrorKind::Unavailable);
    assert!(error.retryable());
    assert!(error.message().contains("slow down"));
}

#[tokio::test]
async fn when_name_has_no_tokens_no_search_is_made() {
    let client = Arc::new(RecordingHttpClient::new(vec![Ok(HttpResponse::ok_json(EVERYTHING_BODY))]));
    let sleeper = Arc::new(RecordingSleeper::new());

    let (payload, term) = acquirer(client.clone(), Some("secret"), sleeper).fetch("  -  ").await;

    assert!(payload.is_empty());
    assert!(term.is_empty());
    assert!(client.requests().is_empty());
}

// =============================================================================
// Relevance filter
// =============================================================================

#[test]
fn relevance_filter_keeps_headlines_mentioning_term_in_any_field() {
    let payload: NewsPayload = serde_json::from_str(EVERYTHING_BODY).expect("valid payload");

    let relevant = extract(&payload, "TESLA");

    assert_eq!(
        relevant,
        vec![
            (date!(2024 - 06 - 03), String::from("Tesla deliveries beat estimates")),
            (date!(2024 - 06 - 03), String::from("Auto stocks mixed")),
        ]
    );
}

#[test]
fn articles_without_any_text_fields_are_dropped_silently() {
    let payload = NewsPayload {
        articles: vec![RawArticle {
            published_at: Some(String::from("2024-06-03T13:05:00Z")),
            ..RawArticle::default()
        }],
        ..NewsPayload::default()
    };

    assert!(extract(&payload, "tesla").is_empty());
}

#[test]
fn hyphenated_names_search_for_their_first_part() {
    let terms = build_query("Coca-Cola").expect("searchable");
    assert_eq!(terms.term, "coca");
    assert_eq!(terms.query, "coca OR (coca AND cola)");
}

// =============================================================================
// Sentiment aggregation
// =============================================================================

fn consecutive(start: Date, titles: &[&str]) -> Vec<(Date, String)> {
    titles
        .iter()
        .enumerate()
        .map(|(offset, title)| (start + time::Duration::days(offset as i64), (*title).to_owned()))
        .collect()
}

#[tokio::test]
async fn score_of_no_headlines_is_an_empty_mapping() {
    let scored = score(&LexiconClassifier::new(), &[]).await.expect("nothing to fail");
    assert!(scored.is_empty());
    assert_eq!(bounds(&smooth(&scored)), tickersense_core::DisplayBounds { lower: -1.0, upper: 1.0 });
}

#[tokio::test]
async fn spreads_stay_within_unit_interval_and_rolling_starts_at_seventh_day() {
    let headlines = consecutive(
        date!(2024 - 06 - 01),
        &[
            "Tesla shares surge after record quarterly revenue",
            "Tesla faces lawsuit over supply chain delays",
            "Analysts upgrade Tesla on strong growth outlook",
            "Tesla stock slides as regulators open probe",
            "Investors weigh Tesla guidance ahead of earnings",
            "Tesla announces buyback, beats expectations",
            "Tesla cuts jobs amid weak demand",
            "Is Tesla a buy after the rally?",
        ],
    );

    let daily = score(&LexiconClassifier::new(), &headlines).await.expect("scored");
    assert_eq!(daily.len(), 8);
    assert!(daily.values().all(|value| (-1.0..=1.0).contains(value)));

    let series = smooth(&daily);
    let rolling = series.rolling();
    assert!(rolling[..6].iter().all(Option::is_none));
    assert!(rolling[6..].iter().all(Option::is_some));

    let display = bounds(&series);
    assert!(display.lower >= -1.0 && display.upper <= 1.0);
    assert!(display.lower < display.upper);
}

#[tokio::test]
async fn same_day_headlines_are_averaged() {
    let day = date!(2024 - 06 - 03);
    let headlines = vec![
        (day, String::from("Tesla shares surge after record quarterly revenue")),
        (day, String::from("Tesla stock slides as regulators open probe")),
    ];
    let classifier = LexiconClassifier::new();

    let daily = score(&classifier, &headlines).await.expect("scored");

    let expected = (classifier.scores(&headlines[0].1).spread().expect("labels")
        + classifier.scores(&headlines[1].1).spread().expect("labels"))
        / 2.0;
    assert_eq!(daily.len(), 1);
    assert!((daily[&day] - expected).abs() < 1e-12);
}
