//! `rallycoach-pipeline` -- drives one session through the core analysis.
//!
//! Owns the orchestration concerns the core leaves out: configuration,
//! fps estimation, stage ordering, logging and result assembly.

pub mod config;
pub mod error;
pub mod fps;
pub mod session;

pub use config::AnalysisConfig;
pub use error::PipelineError;
pub use session::{analyze_session, SessionRequest, SessionResult, SessionSummary};
