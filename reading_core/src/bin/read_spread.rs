//! Run one reading from a JSON request and print the response.
//!
//! Usage:
//!   read-spread --request reading.json [--config reading.toml] [--metrics metrics.json]
//!
//! Pass `-` as the request path to read from stdin. The process waits for the
//! evaluation task before exiting so its score reaches the metrics store.

use clap::Parser;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use reading_core::telemetry::init_tracing;
use reading_core::{ConfigError, JsonFileMetrics, ReadingConfig, ReadingError, ReadingPipeline, ReadingRequest};

#[derive(Parser, Debug)]
#[command(name = "read-spread", about = "Generate a gated narrative for one tarot spread")]
struct Args {
    /// Request JSON file, or `-` for stdin
    #[arg(short = 'r', long = "request", value_name = "FILE")]
    request: PathBuf,

    /// Pipeline configuration (TOML)
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Persist metrics to this JSON file instead of memory
    #[arg(short = 'm', long = "metrics", value_name = "FILE")]
    metrics: Option<PathBuf>,

    /// Emit logs as JSON
    #[arg(long = "log-json")]
    log_json: bool,
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("could not read request: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed request or response JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Reading(#[from] ReadingError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

fn read_request(path: &Path) -> Result<ReadingRequest, CliError> {
    let text = if path.as_os_str() == "-" {
        let mut text = String::new();
        std::io::stdin().read_to_string(&mut text)?;
        text
    } else {
        std::fs::read_to_string(path)?
    };
    Ok(serde_json::from_str(&text)?)
}

async fn run(args: Args) -> Result<(), CliError> {
    let mut config = match &args.config {
        Some(path) => ReadingConfig::from_file(path)?,
        None => ReadingConfig::default(),
    };
    if args.log_json {
        config.observability.json = true;
    }
    init_tracing(&config.observability);

    let request = read_request(&args.request)?;

    let mut pipeline = ReadingPipeline::from_config(config)?;
    if let Some(path) = &args.metrics {
        pipeline = pipeline.with_metrics(Arc::new(JsonFileMetrics::new(path.clone())));
    }

    let (response, evaluation) = pipeline.run_with_handle(&request).await?;
    println!("{}", serde_json::to_string_pretty(&response)?);

    if let Some(handle) = evaluation {
        if let Err(err) = handle.await {
            tracing::warn!(error = %err, "evaluation task did not complete");
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    if let Err(err) = run(args).await {
        eprintln!("read-spread: {}", err);
        std::process::exit(1);
    }
}
