//! News acquisition and relevance filtering.
//!
//! The acquirer turns an entity name into a search query, calls the news
//! provider under a bounded retry policy and falls back to an empty payload
//! once the attempts are spent. Relevance filtering keeps only headlines that
//! mention the query term.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use time::Date;
use tracing::{debug, info, warn};

use crate::data_source::{NewsPayload, NewsProvider, NewsQuery, RawArticle, SourceError};
use crate::domain::calendar::parse_date_prefix;
use crate::retry::{RetryPolicy, Sleeper, TokioSleeper};

/// One article reduced to the fields the pipeline uses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Headline {
    pub published: Date,
    pub title: String,
    pub description: Option<String>,
    pub body: Option<String>,
}

impl Headline {
    /// `None` when the article lacks a title or a parsable publish date.
    pub fn from_article(article: &RawArticle) -> Option<Self> {
        let title = article.title.as_deref()?.trim();
        if title.is_empty() {
            return None;
        }
        let published = parse_date_prefix(article.published_at.as_deref()?).ok()?;

        Some(Self {
            published,
            title: title.to_owned(),
            description: article.description.clone(),
            body: article.content.clone(),
        })
    }

    /// Case-insensitive substring match against title, description and body.
    pub fn mentions(&self, term: &str) -> bool {
        let term = term.trim().to_lowercase();
        if term.is_empty() {
            return false;
        }

        [
            Some(self.title.as_str()),
            self.description.as_deref(),
            self.body.as_deref(),
        ]
        .into_iter()
        .flatten()
        .any(|field| field.to_lowercase().contains(&term))
    }
}

/// Search query and the term used later for relevance filtering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchTerms {
    pub query: String,
    pub term: String,
}

/// Build the search query from the first one or two tokens of a name.
///
/// The name is lowercased and hyphens become spaces. One token searches for
/// itself; two or more search `t0 OR (t0 AND t1)`. Blank names yield `None`.
pub fn build_query(entity_name: &str) -> Option<SearchTerms> {
    let normalized = entity_name.to_lowercase().replace('-', " ");
    let mut tokens = normalized.split_whitespace();
    let first = tokens.next()?;

    let query = match tokens.next() {
        Some(second) => format!("{first} OR ({first} AND {second})"),
        None => first.to_owned(),
    };

    Some(SearchTerms {
        query,
        term: first.to_owned(),
    })
}

/// Parse every usable headline; articles missing a title or date are skipped.
pub fn headlines(payload: &NewsPayload) -> Vec<Headline> {
    payload
        .articles
        .iter()
        .filter_map(|article| {
            let headline = Headline::from_article(article);
            if headline.is_none() {
                debug!("skipping article without title or publish date");
            }
            headline
        })
        .collect()
}

/// Relevant `(publish date, title)` pairs in provider order.
pub fn extract(payload: &NewsPayload, query_term: &str) -> Vec<(Date, String)> {
    headlines(payload)
        .into_iter()
        .filter(|headline| headline.mentions(query_term))
        .map(|headline| (headline.published, headline.title))
        .collect()
}

#[derive(Debug)]
enum AttemptError {
    Source(SourceError),
    NoArticles,
}

impl AttemptError {
    fn retryable(&self) -> bool {
        match self {
            Self::Source(error) => error.retryable(),
            Self::NoArticles => true,
        }
    }
}

/// Retrying news fetcher.
#[derive(Clone)]
pub struct NewsAcquirer {
    provider: Arc<dyn NewsProvider>,
    sleeper: Arc<dyn Sleeper>,
    policy: RetryPolicy,
    language: String,
    domains: Vec<String>,
}

impl NewsAcquirer {
    pub fn new(provider: Arc<dyn NewsProvider>, language: impl Into<String>, domains: Vec<String>) -> Self {
        Self {
            provider,
            sleeper: Arc::new(TokioSleeper),
            policy: RetryPolicy::default(),
            language: language.into(),
            domains,
        }
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    /// Fetch headlines for `entity_name`.
    ///
    /// Returns the payload together with the query term. A failed request, a
    /// malformed response and an empty article list all count as a failed
    /// attempt; after the last one the payload is empty. An unusable name
    /// yields an empty payload and an empty term without any request.
    pub async fn fetch(&self, entity_name: &str) -> (NewsPayload, String) {
        let Some(terms) = build_query(entity_name) else {
            warn!("entity name has no searchable tokens; skipping news search");
            return (NewsPayload::empty(), String::new());
        };

        let query = match NewsQuery::new(terms.query.as_str(), self.language.as_str(), self.domains.clone()) {
            Ok(query) => query,
            Err(error) => {
                warn!(%error, "could not build news query");
                return (NewsPayload::empty(), terms.term);
            }
        };

        let provider = self.provider.as_ref();
        let query_ref = &query;
        let outcome = self
            .policy
            .run_if(self.sleeper.as_ref(), AttemptError::retryable, |attempt| async move {
                debug!(provider = provider.name(), attempt, query = %query_ref.query, "searching news");
                match provider.search(query_ref).await {
                    Ok(payload) if payload.is_empty() => {
                        warn!(attempt, "news search returned no articles");
                        Err(AttemptError::NoArticles)
                    }
                    Ok(payload) => Ok(payload),
                    Err(error) => {
                        warn!(attempt, code = error.code(), %error, "news search failed");
                        Err(AttemptError::Source(error))
                    }
                }
            })
            .await;

        match outcome {
            Ok(payload) => {
                info!(articles = payload.articles.len(), term = %terms.term, "news fetched");
                (payload, terms.term)
            }
            Err(errors) => {
                warn!(attempts = errors.len(), "news search exhausted; continuing without articles");
                (NewsPayload::empty(), terms.term)
            }
        }
    }
}
