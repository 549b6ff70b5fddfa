//! `rallycoach-worker` -- runs one stroke-analysis job.
//!
//! Reads a job JSON file (`{job_id?, stroke_type, video_url, fps?, frames}`),
//! analyzes it, and writes `{result, deviation_report, generated_at}` to the
//! output path or to stdout. Logs go to stderr.
//!
//! ```text
//! rallycoach-worker <job.json> [output.json]
//! ```
//!
//! # Environment variables
//!
//! | Variable               | Required | Default  | Description                                |
//! |------------------------|----------|----------|--------------------------------------------|
//! | `JOB_TIMEOUT_SECS`     | no       | `300`    | Whole-job timeout                          |
//! | `MIN_SUSTAINED_FRAMES` | no       | `3`      | Frames a risk must persist to be reported  |
//! | `VISIBILITY_GATE`      | no       | --       | Ignore landmarks below this visibility     |
//! | `CLASSIFIER_HISTORY`   | no       | `10`     | Frames of history per classification       |
//! | `LOG_FORMAT`           | no       | `pretty` | `pretty` or `json`                         |
//! | `RUST_LOG`             | no       | --       | Standard `tracing` filter directives       |

use std::path::PathBuf;
use std::process::ExitCode;

use rallycoach_worker::config::{LogFormat, WorkerConfig};
use rallycoach_worker::job;

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_LOG_FILTER: &str = "rallycoach_worker=info,rallycoach_pipeline=info";

fn init_tracing(format: LogFormat) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_LOG_FILTER.into());
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init(),
        LogFormat::Pretty => registry
            .with(fmt::layer().with_writer(std::io::stderr))
            .init(),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    let config = WorkerConfig::from_env();
    init_tracing(
        config
            .as_ref()
            .map(|c| c.log_format)
            .unwrap_or_default(),
    );

    let config = match config {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "Invalid worker configuration");
            return ExitCode::FAILURE;
        }
    };

    let mut args = std::env::args_os().skip(1);
    let Some(input) = args.next().map(PathBuf::from) else {
        tracing::error!("Usage: rallycoach-worker <job.json> [output.json]");
        return ExitCode::from(2);
    };
    let output = args.next().map(PathBuf::from);

    tracing::info!(
        input = %input.display(),
        timeout_secs = config.job_timeout_secs,
        "Starting rallycoach-worker",
    );

    match job::run_job_file(&input, output.as_deref(), &config).await {
        Ok(done) => {
            tracing::info!(
                job_id = %done.result.job_id,
                strokes = done.result.strokes.len(),
                overall_risk = ?done.result.summary.overall_risk,
                deviation_score = done.deviation_report.overall_score,
                "Job complete",
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %format!("{e:#}"), "Job failed");
            ExitCode::FAILURE
        }
    }
}
