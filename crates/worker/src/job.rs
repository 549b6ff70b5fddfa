//! One analysis job: read the job file, analyze, write the result.

use std::path::Path;

use anyhow::{anyhow, Context};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use rallycoach_core::deviation::DeviationReport;
use rallycoach_core::stroke::StrokeSelector;
use rallycoach_core::types::RawFrame;
use rallycoach_pipeline::{analyze_session, AnalysisConfig, PipelineError, SessionRequest, SessionResult};

use crate::config::WorkerConfig;

/// Job file contents.
#[derive(Debug, Clone, Deserialize)]
pub struct JobInput {
    /// Generated (UUID v7) when absent or blank.
    #[serde(default)]
    pub job_id: Option<String>,
    #[serde(default)]
    pub stroke_type: StrokeSelector,
    #[serde(default, alias = "videoUrl")]
    pub video_url: String,
    #[serde(default)]
    pub fps: Option<f64>,
    pub frames: Vec<RawFrame>,
}

impl JobInput {
    pub fn into_request(self) -> SessionRequest {
        let job_id = self
            .job_id
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| Uuid::now_v7().to_string());
        SessionRequest {
            job_id,
            stroke_type: self.stroke_type,
            video_url: self.video_url,
            fps: self.fps,
            frames: self.frames,
        }
    }
}

/// What the worker writes for a finished job.
#[derive(Debug, Serialize)]
pub struct JobOutput {
    pub result: SessionResult,
    pub deviation_report: DeviationReport,
    pub generated_at: DateTime<Utc>,
}

/// Analyze one job synchronously.
pub fn run_job(input: JobInput, config: &AnalysisConfig) -> Result<JobOutput, PipelineError> {
    let result = analyze_session(input.into_request(), config)?;
    let deviation_report = result.deviation_report();
    Ok(JobOutput {
        result,
        deviation_report,
        generated_at: Utc::now(),
    })
}

pub async fn load_job(path: &Path) -> anyhow::Result<JobInput> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read job file {}", path.display()))?;
    serde_json::from_slice(&bytes)
        .with_context(|| format!("Failed to parse job file {}", path.display()))
}

/// Run the analysis on the blocking pool, bounded by the configured timeout.
pub async fn execute(input: JobInput, config: &WorkerConfig) -> anyhow::Result<JobOutput> {
    let analysis = config.analysis.clone();
    let task = tokio::task::spawn_blocking(move || run_job(input, &analysis));

    let joined = tokio::time::timeout(config.job_timeout(), task)
        .await
        .map_err(|_| anyhow!("Job exceeded the {}s timeout", config.job_timeout_secs))?;
    let output = joined.context("Analysis task failed")??;
    Ok(output)
}

/// Write pretty JSON to `path`, or to stdout when no path is given.
pub async fn write_output(output: &JobOutput, path: Option<&Path>) -> anyhow::Result<()> {
    let mut json = serde_json::to_vec_pretty(output).context("Failed to serialize job output")?;
    json.push(b'\n');

    match path {
        Some(path) => tokio::fs::write(path, &json)
            .await
            .with_context(|| format!("Failed to write output file {}", path.display())),
        None => {
            let mut stdout = tokio::io::stdout();
            stdout.write_all(&json).await.context("Failed to write to stdout")?;
            stdout.flush().await.context("Failed to flush stdout")
        }
    }
}

/// Load, analyze and write one job file.
pub async fn run_job_file(
    input: &Path,
    output: Option<&Path>,
    config: &WorkerConfig,
) -> anyhow::Result<JobOutput> {
    let job = load_job(input).await?;
    tracing::info!(
        input = %input.display(),
        frames = job.frames.len(),
        stroke_type = %job.stroke_type,
        "Loaded job",
    );

    let result = execute(job, config).await?;
    write_output(&result, output).await?;
    Ok(result)
}
