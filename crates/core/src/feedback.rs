//! Short per-frame coaching cues keyed on the declared stroke.

use crate::metrics::FrameMetrics;
use crate::stroke::{StrokeSelector, StrokeType};

pub const SERVE_CONTACT_TOO_HIGH: &str = "FAULT: Contact point too high (above waist)";
pub const SERVE_ROTATE_HIPS: &str = "Power: Rotate hips more before contact";
pub const DINK_GET_LOWER: &str = "Form: Get lower! Bend your knees, not just your back.";
pub const OVERHEAD_EXTEND_ARM: &str = "Power: Extend arm fully at contact";

/// Serve hip rotation below this earns the rotate-hips cue.
const SERVE_MIN_HIP_ROTATION: f64 = 10.0;
/// Dink knee angle above this (legs too straight) earns the get-lower cue.
const DINK_MAX_KNEE_ANGLE: f64 = 150.0;
/// Overhead elbow angle below this (bent arm) earns the extend-arm cue.
const OVERHEAD_MIN_ELBOW_ANGLE: f64 = 150.0;

/// Feedback strings for one frame. Generic sessions get none.
pub fn frame_feedback(metrics: &FrameMetrics, selector: StrokeSelector) -> Vec<String> {
    let mut feedback = Vec::new();

    match selector.hint() {
        Some(StrokeType::Serve) => {
            // The paddle must meet the ball below the waist.
            if let (Some(wrist), Some(hip)) = (metrics.right_wrist, metrics.right_hip) {
                if wrist.y < hip.y {
                    feedback.push(SERVE_CONTACT_TOO_HIGH.to_string());
                }
            }
            if metrics
                .hip_rotation_deg
                .is_some_and(|r| r < SERVE_MIN_HIP_ROTATION)
            {
                feedback.push(SERVE_ROTATE_HIPS.to_string());
            }
        }
        Some(StrokeType::Dink) => {
            if metrics
                .right_knee_flexion
                .is_some_and(|k| k > DINK_MAX_KNEE_ANGLE)
            {
                feedback.push(DINK_GET_LOWER.to_string());
            }
        }
        Some(StrokeType::Overhead) => {
            if metrics
                .right_elbow_flexion
                .is_some_and(|e| e < OVERHEAD_MIN_ELBOW_ANGLE)
            {
                feedback.push(OVERHEAD_EXTEND_ARM.to_string());
            }
        }
        Some(StrokeType::Groundstroke | StrokeType::Volley) | None => {}
    }

    feedback
}
