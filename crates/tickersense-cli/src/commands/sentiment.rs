use tickersense_core::Pipeline;

use crate::cli::SentimentArgs;
use crate::error::CliError;

use super::CommandResult;

pub async fn run(args: &SentimentArgs, pipeline: &Pipeline) -> Result<CommandResult, CliError> {
    let report = pipeline.news_sentiment(&args.name).await;
    Ok(CommandResult::ok(serde_json::to_value(report)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tickersense_core::{AppConfig, NoopHttpClient};

    #[tokio::test]
    async fn mock_headlines_produce_a_scored_series() {
        let pipeline = Pipeline::from_config(&AppConfig::default(), Arc::new(NoopHttpClient));
        let args = SentimentArgs {
            name: String::from("Apple Inc."),
        };

        let result = run(&args, &pipeline).await.expect("command completes");
        assert!(result.failure.is_none());
        assert_eq!(result.data["term"], "apple");
        assert!(result.data["headlines"].as_array().is_some_and(|rows| !rows.is_empty()));
        assert!(result.data["series"].is_array());
    }
}
