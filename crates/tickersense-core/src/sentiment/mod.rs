//! Headline sentiment: classification, per-day aggregation and smoothing.

mod aggregate;
mod classifier;

pub use aggregate::{
    bounds, score, smooth, smooth_with_window, DisplayBounds, SentimentPoint, SentimentSeries,
    BOUND_PADDING, ROLLING_WINDOW,
};
pub use classifier::{
    ClassScores, ClassifierError, LexiconClassifier, RemoteClassifier, TextClassifier, NEGATIVE,
    POSITIVE,
};
