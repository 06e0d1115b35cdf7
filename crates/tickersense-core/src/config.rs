//! Runtime configuration.
//!
//! Values come from the process environment after an optional `.env` file has
//! been loaded. A missing news API key is not a load error: the news stage
//! degrades instead.

use std::time::Duration;

use thiserror::Error;

use crate::retry::RetryPolicy;

pub const DEFAULT_NEWS_API_URL: &str = "https://newsapi.org/v2/everything";
pub const DEFAULT_NEWS_LANGUAGE: &str = "en";
pub const DEFAULT_HORIZON_MONTHS: i32 = 3;
pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;

/// Publisher allowlist for news searches.
pub const NEWS_DOMAINS: [&str; 15] = [
    "aljazeera.com",
    "bbc.com",
    "biztoc.com",
    "businessinsider.com",
    "cnn.com",
    "etfdailynews.com",
    "forbes.com",
    "indiatimes.com",
    "investing.com",
    "marketwatch.com",
    "marketscreener.com",
    "qz.com",
    "seekingalpha.com",
    "wsj.com",
    "washingtonpost.com",
];

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("environment variable {name} has invalid value '{value}'")]
    InvalidValue { name: &'static str, value: String },
}

/// Chart output dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChartSize {
    pub width: u32,
    pub height: u32,
}

impl Default for ChartSize {
    fn default() -> Self {
        Self {
            width: 1080,
            height: 720,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub news_api_key: Option<String>,
    pub news_api_url: String,
    pub news_language: String,
    pub news_domains: Vec<String>,
    pub news_retry: RetryPolicy,
    pub horizon_months: i32,
    pub timeout_ms: u64,
    pub sentiment_model_url: Option<String>,
    pub sentiment_model_token: Option<String>,
    pub chart: ChartSize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            news_api_key: None,
            news_api_url: String::from(DEFAULT_NEWS_API_URL),
            news_language: String::from(DEFAULT_NEWS_LANGUAGE),
            news_domains: NEWS_DOMAINS.iter().map(|domain| (*domain).to_owned()).collect(),
            news_retry: RetryPolicy::fixed(3, Duration::from_secs(1)),
            horizon_months: DEFAULT_HORIZON_MONTHS,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            sentiment_model_url: None,
            sentiment_model_token: None,
            chart: ChartSize::default(),
        }
    }
}

impl AppConfig {
    /// Load `.env` (if present) and read the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_owned())
                .filter(|value| !value.is_empty())
        };

        let mut config = Self::default();
        config.news_api_key = read("NEWS_API_KEY");
        if let Some(url) = read("NEWS_API_URL") {
            config.news_api_url = url;
        }
        config.sentiment_model_url = read("SENTIMENT_MODEL_URL");
        config.sentiment_model_token = read("SENTIMENT_MODEL_TOKEN");

        if let Some(value) = read("TICKERSENSE_TIMEOUT_MS") {
            config.timeout_ms = value
                .parse::<u64>()
                .ok()
                .filter(|timeout| *timeout > 0)
                .ok_or(ConfigError::InvalidValue {
                    name: "TICKERSENSE_TIMEOUT_MS",
                    value,
                })?;
        }

        Ok(config)
    }

    pub fn with_news_api_key(mut self, key: impl Into<String>) -> Self {
        self.news_api_key = Some(key.into());
        self
    }

    pub fn with_horizon_months(mut self, months: i32) -> Self {
        self.horizon_months = months;
        self
    }

    pub fn with_news_retry(mut self, policy: RetryPolicy) -> Self {
        self.news_retry = policy;
        self
    }
}
