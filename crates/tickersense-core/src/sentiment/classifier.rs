//! Text classification seam.
//!
//! | Classifier | Backend |
//! |------------|---------|
//! | [`LexiconClassifier`] | VADER polarity plus a financial keyword lexicon, offline |
//! | [`RemoteClassifier`] | Hosted inference endpoint returning `[{label, score}]` |

use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use vader_sentiment::SentimentIntensityAnalyzer;

use crate::http_client::{HttpAuth, HttpClient, HttpRequest};

pub const POSITIVE: &str = "positive";
pub const NEGATIVE: &str = "negative";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ClassifierError {
    #[error("classifier output has no '{label}' label")]
    MissingLabel { label: &'static str },
    #[error("classifier request failed: {0}")]
    Request(String),
    #[error("classifier response is malformed: {0}")]
    Malformed(String),
}

/// Class label to probability, labels stored lowercase.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ClassScores {
    scores: BTreeMap<String, f64>,
}

impl ClassScores {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, label: &str, probability: f64) -> Self {
        self.insert(label, probability);
        self
    }

    pub fn insert(&mut self, label: &str, probability: f64) {
        self.scores.insert(label.trim().to_lowercase(), probability);
    }

    pub fn get(&self, label: &str) -> Option<f64> {
        self.scores.get(&label.trim().to_lowercase()).copied()
    }

    /// Sentiment spread `positive - negative`, clamped to `[-1, 1]`.
    pub fn spread(&self) -> Result<f64, ClassifierError> {
        let positive = self
            .get(POSITIVE)
            .ok_or(ClassifierError::MissingLabel { label: POSITIVE })?;
        let negative = self
            .get(NEGATIVE)
            .ok_or(ClassifierError::MissingLabel { label: NEGATIVE })?;
        let spread = positive - negative;
        if !spread.is_finite() {
            return Err(ClassifierError::Malformed(format!(
                "non-finite probabilities {positive} / {negative}"
            )));
        }
        Ok(spread.clamp(-1.0, 1.0))
    }
}

impl<S: AsRef<str>> FromIterator<(S, f64)> for ClassScores {
    fn from_iter<I: IntoIterator<Item = (S, f64)>>(iter: I) -> Self {
        let mut scores = Self::new();
        for (label, probability) in iter {
            scores.insert(label.as_ref(), probability);
        }
        scores
    }
}

/// Pretrained text classifier contract.
pub trait TextClassifier: Send + Sync {
    fn name(&self) -> &'static str;

    fn classify<'a>(
        &'a self,
        text: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<ClassScores, ClassifierError>> + Send + 'a>>;
}

const BULLISH_KEYWORDS: &[(&str, f64)] = &[
    ("surge", 0.4),
    ("surges", 0.4),
    ("rally", 0.4),
    ("rallies", 0.4),
    ("soar", 0.5),
    ("soars", 0.5),
    ("jumps", 0.3),
    ("gains", 0.3),
    ("beat", 0.3),
    ("beats", 0.3),
    ("upgrade", 0.3),
    ("upgrades", 0.3),
    ("outperform", 0.3),
    ("bullish", 0.5),
    ("buyback", 0.3),
    ("record high", 0.4),
    ("all-time high", 0.5),
    ("record quarterly revenue", 0.3),
    ("breakthrough", 0.4),
    ("partnership", 0.2),
];

const BEARISH_KEYWORDS: &[(&str, f64)] = &[
    ("crash", 0.5),
    ("crashes", 0.5),
    ("plunge", 0.5),
    ("plunges", 0.5),
    ("slides", 0.3),
    ("slump", 0.4),
    ("tumbles", 0.4),
    ("downgrade", 0.3),
    ("downgrades", 0.3),
    ("misses", 0.3),
    ("bearish", 0.5),
    ("lawsuit", 0.4),
    ("probe", 0.3),
    ("fraud", 0.5),
    ("recall", 0.3),
    ("bankruptcy", 0.6),
    ("layoffs", 0.3),
    ("cuts jobs", 0.3),
    ("sell-off", 0.4),
    ("selloff", 0.4),
    ("weak demand", 0.3),
];

/// Offline classifier: VADER polarity proportions boosted by a financial
/// keyword lexicon.
pub struct LexiconClassifier {
    analyzer: SentimentIntensityAnalyzer<'static>,
}

impl LexiconClassifier {
    pub fn new() -> Self {
        Self {
            analyzer: SentimentIntensityAnalyzer::new(),
        }
    }

    /// Synchronous scoring; `positive + negative` never exceeds 1.
    pub fn scores(&self, text: &str) -> ClassScores {
        if text.trim().is_empty() {
            return ClassScores::new().with(POSITIVE, 0.0).with(NEGATIVE, 0.0);
        }

        let polarity = self.analyzer.polarity_scores(text);
        let (bullish, bearish) = keyword_boost(text);

        let mut positive = (polarity.get("pos").copied().unwrap_or(0.0) + bullish * 0.5).clamp(0.0, 1.0);
        let mut negative = (polarity.get("neg").copied().unwrap_or(0.0) + bearish * 0.5).clamp(0.0, 1.0);
        let total = positive + negative;
        if total > 1.0 {
            positive /= total;
            negative /= total;
        }

        ClassScores::new()
            .with(POSITIVE, positive)
            .with(NEGATIVE, negative)
            .with("neutral", (1.0 - positive - negative).max(0.0))
    }
}

impl Default for LexiconClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl TextClassifier for LexiconClassifier {
    fn name(&self) -> &'static str {
        "lexicon"
    }

    fn classify<'a>(
        &'a self,
        text: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<ClassScores, ClassifierError>> + Send + 'a>> {
        let scores = self.scores(text);
        Box::pin(async move { Ok(scores) })
    }
}

/// Summed bullish and bearish keyword weights. Phrases match as substrings,
/// single words only as whole words.
fn keyword_boost(text: &str) -> (f64, f64) {
    let lower = text.to_lowercase();
    let words: Vec<&str> = lower
        .split(|ch: char| !(ch.is_alphanumeric() || ch == '-'))
        .filter(|word| !word.is_empty())
        .collect();
    let matches = |keyword: &str| {
        if keyword.contains(' ') {
            lower.contains(keyword)
        } else {
            words.iter().any(|word| *word == keyword)
        }
    };

    let sum = |lexicon: &[(&str, f64)]| {
        lexicon
            .iter()
            .filter(|(keyword, _)| matches(keyword))
            .map(|(_, weight)| weight)
            .sum::<f64>()
    };

    (sum(BULLISH_KEYWORDS), sum(BEARISH_KEYWORDS))
}

/// Hosted classifier speaking the common inference API shape: POST
/// `{"inputs": text}`, answer `[{label, score}]` or `[[{label, score}]]`.
#[derive(Clone)]
pub struct RemoteClassifier {
    http_client: Arc<dyn HttpClient>,
    url: String,
    auth: HttpAuth,
    timeout_ms: u64,
}

impl RemoteClassifier {
    pub fn new(http_client: Arc<dyn HttpClient>, url: impl Into<String>, token: Option<String>) -> Self {
        Self {
            http_client,
            url: url.into(),
            auth: token.map_or(HttpAuth::None, HttpAuth::BearerToken),
            timeout_ms: 30_000,
        }
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }
}

#[derive(Debug, Serialize)]
struct InferenceRequest<'a> {
    inputs: &'a str,
}

#[derive(Debug, Deserialize)]
struct LabelScore {
    label: String,
    score: f64,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum InferenceResponse {
    Flat(Vec<LabelScore>),
    Nested(Vec<Vec<LabelScore>>),
}

fn parse_inference(body: &str) -> Result<ClassScores, ClassifierError> {
    let response: InferenceResponse =
        serde_json::from_str(body).map_err(|e| ClassifierError::Malformed(e.to_string()))?;
    let labels = match response {
        InferenceResponse::Flat(labels) => labels,
        InferenceResponse::Nested(batches) => batches.into_iter().next().unwrap_or_default(),
    };
    if labels.is_empty() {
        return Err(ClassifierError::Malformed(String::from("no labels returned")));
    }
    Ok(labels
        .into_iter()
        .map(|entry| (entry.label, entry.score))
        .collect())
}

impl TextClassifier for RemoteClassifier {
    fn name(&self) -> &'static str {
        "remote"
    }

    fn classify<'a>(
        &'a self,
        text: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<ClassScores, ClassifierError>> + Send + 'a>> {
        Box::pin(async move {
            let body = serde_json::to_string(&InferenceRequest { inputs: text })
                .map_err(|e| ClassifierError::Request(e.to_string()))?;
            let request = HttpRequest::post(self.url.as_str())
                .with_header("content-type", "application/json")
                .with_auth(&self.auth)
                .with_body(body)
                .with_timeout_ms(self.timeout_ms);

            let response = self
                .http_client
                .execute(request)
                .await
                .map_err(|e| ClassifierError::Request(e.message().to_owned()))?;
            if !response.is_success() {
                return Err(ClassifierError::Request(format!(
                    "inference endpoint returned status {}",
                    response.status
                )));
            }

            parse_inference(&response.body)
        })
    }
}
