use std::str::FromStr;
use std::time::Duration;

use rallycoach_core::error::CoreError;
use rallycoach_pipeline::AnalysisConfig;

/// Default whole-job timeout in seconds.
pub const DEFAULT_JOB_TIMEOUT_SECS: u64 = 300;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{name} must be {expected}, got '{value}'")]
    Invalid {
        name: &'static str,
        value: String,
        expected: &'static str,
    },

    #[error(transparent)]
    Analysis(#[from] CoreError),
}

/// Log output format for the worker binary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" | "text" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            _ => Err(()),
        }
    }
}

/// Worker configuration loaded from environment variables.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkerConfig {
    pub job_timeout_secs: u64,
    pub analysis: AnalysisConfig,
    pub log_format: LogFormat,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            job_timeout_secs: DEFAULT_JOB_TIMEOUT_SECS,
            analysis: AnalysisConfig::default(),
            log_format: LogFormat::default(),
        }
    }
}

fn parse_var<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: T,
    expected: &'static str,
) -> Result<T, ConfigError> {
    match lookup(name) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid {
            name,
            value: raw,
            expected,
        }),
    }
}

impl WorkerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                | Default  |
    /// |------------------------|----------|
    /// | `JOB_TIMEOUT_SECS`     | `300`    |
    /// | `MIN_SUSTAINED_FRAMES` | `3`      |
    /// | `VISIBILITY_GATE`      | unset    |
    /// | `CLASSIFIER_HISTORY`   | `10`     |
    /// | `LOG_FORMAT`           | `pretty` |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as [`WorkerConfig::from_env`] with a custom variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = AnalysisConfig::default();

        let job_timeout_secs: u64 = parse_var(
            &lookup,
            "JOB_TIMEOUT_SECS",
            DEFAULT_JOB_TIMEOUT_SECS,
            "a positive integer",
        )?;
        if job_timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                name: "JOB_TIMEOUT_SECS",
                value: "0".into(),
                expected: "a positive integer",
            });
        }

        let min_sustained_frames = parse_var(
            &lookup,
            "MIN_SUSTAINED_FRAMES",
            defaults.min_sustained_frames,
            "a frame count",
        )?;
        let classifier_history = parse_var(
            &lookup,
            "CLASSIFIER_HISTORY",
            defaults.classifier_history,
            "a frame count",
        )?;
        let visibility_gate = match lookup("VISIBILITY_GATE") {
            None => None,
            Some(raw) if raw.trim().is_empty() => None,
            Some(raw) => Some(raw.trim().parse::<f64>().map_err(|_| ConfigError::Invalid {
                name: "VISIBILITY_GATE",
                value: raw,
                expected: "a number between 0.0 and 1.0",
            })?),
        };
        let log_format = parse_var(&lookup, "LOG_FORMAT", LogFormat::Pretty, "'pretty' or 'json'")?;

        let analysis = AnalysisConfig {
            min_sustained_frames,
            visibility_gate,
            classifier_history,
            ..defaults
        };
        analysis.validate()?;

        Ok(Self {
            job_timeout_secs,
            analysis,
            log_format,
        })
    }

    pub fn job_timeout(&self) -> Duration {
        Duration::from_secs(self.job_timeout_secs)
    }
}
