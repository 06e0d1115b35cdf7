mod chart;
mod sentiment;

use std::sync::Arc;

use serde_json::Value;
use tickersense_core::{AppConfig, HttpClient, NoopHttpClient, Pipeline, ReqwestHttpClient};

use crate::cli::{Cli, Command};
use crate::error::CliError;

/// Command data plus the failure, if any, that decides the exit code.
/// The data is printed either way so partial results are not lost.
pub struct CommandResult {
    pub data: Value,
    pub failure: Option<CliError>,
}

impl CommandResult {
    pub fn ok(data: Value) -> Self {
        Self { data, failure: None }
    }

    pub fn with_failure(mut self, failure: Option<CliError>) -> Self {
        self.failure = failure;
        self
    }
}

pub const fn command_name(command: &Command) -> &'static str {
    match command {
        Command::Chart(_) => "chart",
        Command::Sentiment(_) => "sentiment",
    }
}

pub async fn run(cli: &Cli) -> Result<CommandResult, CliError> {
    let mut config = AppConfig::from_env()?;
    if let Some(timeout_ms) = cli.timeout_ms {
        config.timeout_ms = timeout_ms;
    }
    let pipeline = build_pipeline(&config, cli.mock)?;

    match &cli.command {
        Command::Chart(args) => chart::run(args, &config, &pipeline).await,
        Command::Sentiment(args) => sentiment::run(args, &pipeline).await,
    }
}

fn build_pipeline(config: &AppConfig, mock: bool) -> Result<Pipeline, CliError> {
    let http_client: Arc<dyn HttpClient> = if mock {
        Arc::new(NoopHttpClient)
    } else {
        Arc::new(ReqwestHttpClient::new()?)
    };
    Ok(Pipeline::from_config(config, http_client))
}
