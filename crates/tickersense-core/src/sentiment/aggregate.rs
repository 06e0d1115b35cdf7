//! Per-day sentiment aggregation, rolling smoothing and display bounds.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use time::Date;
use tracing::{debug, warn};

use super::classifier::{ClassifierError, TextClassifier};

/// Trailing window of the rolling mean, in dated points.
pub const ROLLING_WINDOW: usize = 7;
/// Padding added around the rolling extrema before clamping to `[-1, 1]`.
pub const BOUND_PADDING: f64 = 0.2;

/// Score each headline and average the spreads per publish date.
///
/// A headline the classifier cannot score is skipped. When every headline
/// fails, the last error is returned so the caller can degrade the stage.
/// Empty input yields an empty map.
pub async fn score(
    classifier: &dyn TextClassifier,
    headlines: &[(Date, String)],
) -> Result<BTreeMap<Date, f64>, ClassifierError> {
    let mut per_day: BTreeMap<Date, (f64, u32)> = BTreeMap::new();
    let mut last_error = None;

    for (date, title) in headlines {
        let spread = match classifier.classify(title).await.and_then(|scores| scores.spread()) {
            Ok(spread) => spread,
            Err(error) => {
                warn!(classifier = classifier.name(), %date, %error, "headline could not be scored");
                last_error = Some(error);
                continue;
            }
        };
        let entry = per_day.entry(*date).or_insert((0.0, 0));
        entry.0 += spread;
        entry.1 += 1;
    }

    if per_day.is_empty() {
        if let Some(error) = last_error {
            return Err(error);
        }
    }

    debug!(days = per_day.len(), headlines = headlines.len(), "headlines scored");
    Ok(per_day
        .into_iter()
        .map(|(date, (sum, count))| (date, sum / f64::from(count)))
        .collect())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentPoint {
    pub date: Date,
    pub raw: f64,
    /// Trailing mean; `None` until a full window is available.
    pub rolling: Option<f64>,
}

/// Date-ascending daily sentiment with its rolling mean.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SentimentSeries {
    points: Vec<SentimentPoint>,
}

impl SentimentSeries {
    pub fn points(&self) -> &[SentimentPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn dates(&self) -> Vec<Date> {
        self.points.iter().map(|point| point.date).collect()
    }

    pub fn rolling(&self) -> Vec<Option<f64>> {
        self.points.iter().map(|point| point.rolling).collect()
    }

    pub fn has_rolling(&self) -> bool {
        self.points.iter().any(|point| point.rolling.is_some())
    }
}

/// [`smooth_with_window`] with the standard seven-point window.
pub fn smooth(daily: &BTreeMap<Date, f64>) -> SentimentSeries {
    smooth_with_window(daily, ROLLING_WINDOW)
}

/// Trailing mean over `window` consecutive dated points. The first
/// `window - 1` points stay unset rather than defaulting to zero.
pub fn smooth_with_window(daily: &BTreeMap<Date, f64>, window: usize) -> SentimentSeries {
    let window = window.max(1);
    let values: Vec<f64> = daily.values().copied().collect();

    let points = daily
        .iter()
        .enumerate()
        .map(|(index, (date, raw))| {
            let rolling = (index + 1 >= window).then(|| {
                let slice = &values[index + 1 - window..=index];
                slice.iter().sum::<f64>() / slice.len() as f64
            });
            SentimentPoint {
                date: *date,
                raw: *raw,
                rolling,
            }
        })
        .collect();

    SentimentSeries { points }
}

/// Secondary y-axis range for the sentiment overlay.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DisplayBounds {
    pub lower: f64,
    pub upper: f64,
}

impl Default for DisplayBounds {
    fn default() -> Self {
        Self {
            lower: -1.0,
            upper: 1.0,
        }
    }
}

/// Padded extrema of the defined rolling values; `(-1, 1)` when none exist.
pub fn bounds(series: &SentimentSeries) -> DisplayBounds {
    let defined = series.points.iter().filter_map(|point| point.rolling);
    let (min, max) = defined.fold((None::<f64>, None::<f64>), |(min, max), value| {
        (
            Some(min.map_or(value, |current| current.min(value))),
            Some(max.map_or(value, |current| current.max(value))),
        )
    });

    match (min, max) {
        (Some(min), Some(max)) => DisplayBounds {
            lower: (min - BOUND_PADDING).max(-1.0),
            upper: (max + BOUND_PADDING).min(1.0),
        },
        _ => DisplayBounds::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sentiment::classifier::ClassScores;
    use std::future::Future;
    use std::pin::Pin;
    use time::macros::date;
    use time::Duration;

    struct KeywordClassifier;

    impl TextClassifier for KeywordClassifier {
        fn name(&self) -> &'static str {
            "keyword"
        }

        fn classify<'a>(
            &'a self,
            text: &'a str,
        ) -> Pin<Box<dyn Future<Output = Result<ClassScores, ClassifierError>> + Send + 'a>> {
            let result = if text.contains("up") {
                Ok(ClassScores::new().with("positive", 0.9).with("negative", 0.1))
            } else if text.contains("down") {
                Ok(ClassScores::new().with("positive", 0.2).with("negative", 0.6))
            } else {
                Err(ClassifierError::Malformed(String::from("unscorable")))
            };
            Box::pin(async move { result })
        }
    }

    fn daily(values: &[f64]) -> BTreeMap<Date, f64> {
        let start = date!(2024 - 03 - 01);
        values
            .iter()
            .enumerate()
            .map(|(offset, value)| (start + Duration::days(offset as i64), *value))
            .collect()
    }

    #[tokio::test]
    async fn score_of_empty_input_is_empty() {
        let scored = score(&KeywordClassifier, &[]).await.expect("no failures");
        assert!(scored.is_empty());
    }

    #[tokio::test]
    async fn score_averages_spreads_per_date() {
        let headlines = vec![
            (date!(2024 - 03 - 05), String::from("shares up")),
            (date!(2024 - 03 - 05), String::from("shares down")),
            (date!(2024 - 03 - 04), String::from("shares up")),
            (date!(2024 - 03 - 04), String::from("noise")),
        ];
        let scored = score(&KeywordClassifier, &headlines).await.expect("partial success");

        assert_eq!(scored.len(), 2);
        assert!((scored[&date!(2024 - 03 - 04)] - 0.8).abs() < 1e-12);
        assert!((scored[&date!(2024 - 03 - 05)] - 0.2).abs() < 1e-12);
    }

    #[tokio::test]
    async fn score_fails_only_when_every_headline_fails() {
        let headlines = vec![(date!(2024 - 03 - 05), String::from("noise"))];
        let error = score(&KeywordClassifier, &headlines).await.expect_err("all failed");
        assert!(matches!(error, ClassifierError::Malformed(_)));
    }

    #[test]
    fn fewer_than_seven_points_have_no_rolling_values() {
        let series = smooth(&daily(&[0.1, 0.2, 0.3, 0.4, 0.5, 0.6]));
        assert_eq!(series.len(), 6);
        assert!(!series.has_rolling());
        assert_eq!(bounds(&series), DisplayBounds { lower: -1.0, upper: 1.0 });
    }

    #[test]
    fn rolling_mean_starts_at_seventh_point() {
        let series = smooth(&daily(&[0.7, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.7]));
        let rolling = series.rolling();

        assert!(rolling[..6].iter().all(Option::is_none));
        assert!((rolling[6].expect("defined") - 0.1).abs() < 1e-12);
        assert!((rolling[7].expect("defined") - 0.1).abs() < 1e-12);
    }

    #[test]
    fn bounds_pad_extrema_and_clamp() {
        let series = smooth_with_window(&daily(&[0.1, -0.3, 0.95]), 1);
        let padded = bounds(&series);
        assert!((padded.lower - -0.5).abs() < 1e-12);
        assert_eq!(padded.upper, 1.0);

        let series = smooth_with_window(&daily(&[-0.9]), 1);
        assert_eq!(bounds(&series).lower, -1.0);
    }

    #[test]
    fn series_is_date_ascending() {
        let mut map = BTreeMap::new();
        map.insert(date!(2024 - 03 - 09), 0.1);
        map.insert(date!(2024 - 03 - 01), 0.2);
        let series = smooth(&map);
        assert_eq!(series.dates(), vec![date!(2024 - 03 - 01), date!(2024 - 03 - 09)]);
    }
}
