#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Unknown stroke type: '{0}'")]
    UnknownStrokeType(String),
}
