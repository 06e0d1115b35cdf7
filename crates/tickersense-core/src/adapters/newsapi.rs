use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde::Deserialize;
use time::{Date, Duration, OffsetDateTime};

use crate::config::DEFAULT_NEWS_API_URL;
use crate::data_source::{NewsPayload, NewsProvider, NewsQuery, RawArticle, SourceError};
use crate::domain::calendar::format_iso_date;
use crate::http_client::{HttpClient, HttpRequest, NoopHttpClient};
use crate::session::SessionFactory;

/// NewsAPI `everything` search client.
///
/// Like the Yahoo adapter, a mock transport switches it to deterministic fake
/// headlines.
#[derive(Clone)]
pub struct NewsApiClient {
    http_client: Arc<dyn HttpClient>,
    sessions: Arc<SessionFactory>,
    base_url: String,
    api_key: Option<String>,
    timeout_ms: u64,
    use_real_api: bool,
    fake_anchor: Option<Date>,
}

impl Default for NewsApiClient {
    fn default() -> Self {
        Self {
            http_client: Arc::new(NoopHttpClient),
            sessions: Arc::new(SessionFactory::default()),
            base_url: String::from(DEFAULT_NEWS_API_URL),
            api_key: None,
            timeout_ms: 10_000,
            use_real_api: false,
            fake_anchor: None,
        }
    }
}

impl NewsApiClient {
    pub fn with_http_client(http_client: Arc<dyn HttpClient>, api_key: Option<String>) -> Self {
        let is_real = !http_client.is_mock();
        Self {
            http_client,
            api_key,
            use_real_api: is_real,
            ..Self::default()
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_sessions(mut self, sessions: Arc<SessionFactory>) -> Self {
        self.sessions = sessions;
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Pin the newest fake publication date (defaults to today, UTC).
    pub fn with_fake_anchor(mut self, anchor: Date) -> Self {
        self.fake_anchor = Some(anchor);
        self
    }

    async fn search_real(&self, query: &NewsQuery) -> Result<NewsPayload, SourceError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| SourceError::invalid_request("NEWS_API_KEY is not configured"))?;

        let request = HttpRequest::get(self.base_url.as_str())
            .with_query("q", query.query.as_str())
            .with_query("language", query.language.as_str())
            .with_query("domains", query.domains.join(","))
            .with_timeout_ms(self.timeout_ms);
        let request = self.sessions.profile().with_api_key(api_key).apply(request);

        let response = self.http_client.execute(request).await.map_err(|error| {
            SourceError::unavailable(format!("news transport error: {}", error.message()))
        })?;

        match response.status {
            429 => {
                return Err(SourceError::rate_limited("news provider returned status 429"));
            }
            status if !response.is_success() => {
                return Err(SourceError::unavailable(format!(
                    "news provider returned status {status}"
                )));
            }
            _ => {}
        }

        parse_everything(&response.body)
    }

    fn search_fake(&self, query: &NewsQuery) -> NewsPayload {
        let anchor = self
            .fake_anchor
            .unwrap_or_else(|| OffsetDateTime::now_utc().date());
        fake_payload(first_term(&query.query), anchor)
    }
}

impl NewsProvider for NewsApiClient {
    fn name(&self) -> &'static str {
        "newsapi"
    }

    fn search<'a>(
        &'a self,
        query: &'a NewsQuery,
    ) -> Pin<Box<dyn Future<Output = Result<NewsPayload, SourceError>> + Send + 'a>> {
        Box::pin(async move {
            if self.use_real_api {
                self.search_real(query).await
            } else {
                Ok(self.search_fake(query))
            }
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EverythingResponse {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    total_results: Option<u64>,
    #[serde(default)]
    articles: Option<Vec<RawArticle>>,
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

fn parse_everything(body: &str) -> Result<NewsPayload, SourceError> {
    let response: EverythingResponse = serde_json::from_str(body)
        .map_err(|e| SourceError::unavailable(format!("malformed news response: {e}")))?;

    if response.status.as_deref() == Some("error") {
        return Err(SourceError::unavailable(format!(
            "news provider error {}: {}",
            response.code.as_deref().unwrap_or("unknown"),
            response.message.as_deref().unwrap_or("no message")
        )));
    }

    let articles = response
        .articles
        .ok_or_else(|| SourceError::unavailable("news response has no articles field"))?;

    Ok(NewsPayload {
        status: response.status,
        total_results: response.total_results,
        articles,
    })
}

fn first_term(query: &str) -> &str {
    query.split_whitespace().next().unwrap_or(query)
}

const FAKE_HEADLINES: [&str; 8] = [
    "{} shares surge after record quarterly revenue",
    "Analysts upgrade {} on strong growth outlook",
    "{} faces lawsuit over supply chain delays",
    "{} stock slides as regulators open probe",
    "Investors weigh {} guidance ahead of earnings",
    "{} announces buyback, beats expectations",
    "{} cuts jobs amid weak demand",
    "Is {} a buy after the rally?",
];

/// Deterministic headlines: one or two per day over the two weeks before
/// `anchor`, plus an unrelated headline the relevance filter should drop.
fn fake_payload(term: &str, anchor: Date) -> NewsPayload {
    let subject = capitalize(term);
    let mut articles = Vec::new();

    for day in 0..14_i64 {
        let Some(date) = anchor.checked_sub(Duration::days(13 - day)) else {
            continue;
        };
        let per_day = if day % 3 == 0 { 2 } else { 1 };
        for slot in 0..per_day {
            let template = FAKE_HEADLINES[((day * 3 + slot) % FAKE_HEADLINES.len() as i64) as usize];
            articles.push(RawArticle {
                title: Some(template.replace("{}", &subject)),
                description: Some(format!("Coverage of {subject} from the markets desk.")),
                content: None,
                published_at: Some(format!("{}T{:02}:00:00Z", format_iso_date(date), 9 + slot)),
            });
        }
    }

    articles.push(RawArticle {
        title: Some(String::from("Central bank holds rates steady")),
        description: Some(String::from("Policy makers signal patience.")),
        content: Some(String::from("Markets were little changed.")),
        published_at: Some(format!("{}T12:00:00Z", format_iso_date(anchor))),
    });

    NewsPayload {
        status: Some(String::from("ok")),
        total_results: Some(articles.len() as u64),
        articles,
    }
}

fn capitalize(term: &str) -> String {
    let mut chars = term.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
