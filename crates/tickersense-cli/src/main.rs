mod cli;
mod commands;
mod error;
mod metadata;
mod output;

use std::process::ExitCode;
use std::time::Instant;

use clap::Parser;
use tracing::info_span;
use tracing::Instrument;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::cli::Cli;
use crate::error::CliError;
use crate::metadata::{Metadata, RequestId};
use crate::output::Envelope;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(&cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("error: {error}");
            ExitCode::from(error.exit_code())
        }
    }
}

/// Logs go to stderr; stdout carries the JSON report only.
fn init_tracing(verbose: bool) {
    let default_filter = if verbose {
        "tickersense=debug,tickersense_core=debug"
    } else {
        "tickersense=info,tickersense_core=info"
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

async fn run(cli: &Cli) -> Result<(), CliError> {
    let request_id = RequestId::new_v4();
    let command = commands::command_name(&cli.command);
    let started = Instant::now();

    let result = commands::run(cli)
        .instrument(info_span!("request", id = %request_id, command))
        .await?;

    let latency_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
    let envelope = Envelope {
        meta: Metadata::new(request_id, command, cli.mock, latency_ms),
        data: result.data,
    };
    output::render(&envelope, cli.pretty)?;

    match result.failure {
        Some(failure) => Err(failure),
        None => Ok(()),
    }
}
