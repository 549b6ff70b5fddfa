use serde::{Deserialize, Serialize};

use rallycoach_core::classifier::DEFAULT_HISTORY_LEN;
use rallycoach_core::error::CoreError;
use rallycoach_core::risk::DEFAULT_MIN_SUSTAINED_FRAMES;
use rallycoach_core::threshold_validation::{
    validate_min_count, validate_positive, validate_unit_range,
};

/// Frame rate assumed when none is supplied and none can be estimated.
pub const DEFAULT_FPS: f64 = 30.0;

/// Tunable settings for one analysis run.
///
/// Missing fields deserialize to their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Minimum consecutive frames a risk must persist to be kept.
    pub min_sustained_frames: usize,
    /// Landmarks below this visibility are treated as missing. `None` keeps
    /// every landmark the tracker reported.
    pub visibility_gate: Option<f64>,
    /// Frames of history given to the stroke classifier.
    pub classifier_history: usize,
    pub default_fps: f64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            min_sustained_frames: DEFAULT_MIN_SUSTAINED_FRAMES,
            visibility_gate: None,
            classifier_history: DEFAULT_HISTORY_LEN,
            default_fps: DEFAULT_FPS,
        }
    }
}

impl AnalysisConfig {
    pub fn validate(&self) -> Result<(), CoreError> {
        validate_min_count(self.min_sustained_frames, 1, "min_sustained_frames")?;
        if let Some(gate) = self.visibility_gate {
            validate_unit_range(gate, "visibility_gate")?;
        }
        validate_min_count(self.classifier_history, 1, "classifier_history")?;
        validate_positive(self.default_fps, "default_fps")?;
        Ok(())
    }
}
