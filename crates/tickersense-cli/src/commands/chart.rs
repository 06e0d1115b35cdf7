use serde::Serialize;
use tracing::info;

use tickersense_core::{AppConfig, Pipeline, PipelineReport, PipelineRequest};

use crate::cli::ChartArgs;
use crate::error::CliError;

use super::CommandResult;

#[derive(Debug, Serialize)]
struct ChartResponseData {
    #[serde(flatten)]
    report: PipelineReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    chart_path: Option<String>,
}

pub async fn run(args: &ChartArgs, config: &AppConfig, pipeline: &Pipeline) -> Result<CommandResult, CliError> {
    let request = PipelineRequest::new(args.symbol.as_str())
        .with_period(args.period.as_str())
        .with_interval(args.interval.as_str())
        .with_horizon_months(args.horizon_months.unwrap_or(config.horizon_months))
        .with_render(!args.no_render);

    let mut report = pipeline.run(&request).await;
    let mut failure = report.error.clone().map(CliError::from);

    let mut chart_path = None;
    if let Some(figure) = report.figure.take() {
        match figure.write_html(&args.output) {
            Ok(()) => {
                info!(path = %args.output.display(), "chart written");
                chart_path = Some(args.output.display().to_string());
            }
            Err(error) => failure = failure.or(Some(CliError::Render(error))),
        }
    }

    let data = serde_json::to_value(ChartResponseData { report, chart_path })?;
    Ok(CommandResult::ok(data).with_failure(failure))
}
