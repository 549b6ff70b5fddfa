use rallycoach_core::error::CoreError;

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Invalid analysis config: {0}")]
    Config(#[from] CoreError),

    #[error("Invalid fps: {0} (must be finite and > 0)")]
    InvalidFps(f64),
}
