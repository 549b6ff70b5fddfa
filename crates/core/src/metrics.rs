//! Per-frame biomechanics metrics and the analyzed-frame record.
//!
//! Every field that depends on landmarks is optional: `None` means the
//! frame did not carry the landmarks needed to compute it.

use serde::{Deserialize, Serialize};

use crate::feedback;
use crate::risk::{self, InjuryRisk, RiskSeverity};
use crate::stroke::StrokeSelector;
use crate::types::{Point3, RawFrame};
use crate::velocity::Velocity;

// ---------------------------------------------------------------------------
// FrameMetrics
// ---------------------------------------------------------------------------

/// Joint angles, position flags, reference coordinates and velocities for
/// one frame. Angles are in degrees.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FrameMetrics {
    pub frame_idx: i64,
    pub timestamp_sec: f64,

    pub right_elbow_flexion: Option<f64>,
    pub left_elbow_flexion: Option<f64>,
    pub right_knee_flexion: Option<f64>,
    pub left_knee_flexion: Option<f64>,
    pub right_shoulder_abduction: Option<f64>,
    pub hip_rotation_deg: Option<f64>,
    pub spine_flexion: Option<f64>,

    pub wrist_above_waist: Option<bool>,
    pub wrist_above_head: Option<bool>,
    pub wrist_to_body_distance: Option<f64>,

    pub right_wrist: Option<Point3>,
    pub right_shoulder: Option<Point3>,
    pub left_shoulder: Option<Point3>,
    pub right_hip: Option<Point3>,
    pub nose: Option<Point3>,

    #[serde(default)]
    pub wrist_velocity: Velocity,
    #[serde(default)]
    pub shoulder_velocity: Velocity,
}

/// Reference points whose raw coordinates are kept on [`FrameMetrics`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackedPoint {
    RightWrist,
    RightShoulder,
    LeftShoulder,
    RightHip,
    Nose,
}

/// Coordinate axis of a tracked point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Point3 {
    pub fn axis(&self, axis: Axis) -> f64 {
        match axis {
            Axis::X => self.x,
            Axis::Y => self.y,
            Axis::Z => self.z,
        }
    }
}

impl FrameMetrics {
    /// Metrics for a frame that carried no usable landmarks.
    pub fn empty(frame_idx: i64, timestamp_sec: f64) -> Self {
        Self {
            frame_idx,
            timestamp_sec,
            ..Self::default()
        }
    }

    pub fn point(&self, which: TrackedPoint) -> Option<&Point3> {
        match which {
            TrackedPoint::RightWrist => self.right_wrist.as_ref(),
            TrackedPoint::RightShoulder => self.right_shoulder.as_ref(),
            TrackedPoint::LeftShoulder => self.left_shoulder.as_ref(),
            TrackedPoint::RightHip => self.right_hip.as_ref(),
            TrackedPoint::Nose => self.nose.as_ref(),
        }
    }

    /// One coordinate of a tracked point, e.g. the y of the right wrist.
    pub fn coordinate(&self, which: TrackedPoint, axis: Axis) -> Option<f64> {
        self.point(which).map(|p| p.axis(axis))
    }
}

// ---------------------------------------------------------------------------
// AnalyzedFrame
// ---------------------------------------------------------------------------

/// A raw frame together with everything derived from it.
///
/// Built once per frame. The only field mutated afterwards is
/// `injury_risks`, by [`risk::filter_sustained_risks`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyzedFrame {
    #[serde(flatten)]
    pub raw: RawFrame,
    pub metrics: FrameMetrics,
    pub injury_risk: RiskSeverity,
    pub injury_risks: Vec<InjuryRisk>,
    pub feedback: Vec<String>,
}

impl AnalyzedFrame {
    /// Evaluate risks and feedback for already-computed metrics.
    pub fn assemble(raw: RawFrame, metrics: FrameMetrics, selector: StrokeSelector) -> Self {
        let injury_risks = risk::detect_frame_risks(&metrics, selector);
        let injury_risk = risk::overall_risk_level(&injury_risks);
        let feedback = feedback::frame_feedback(&metrics, selector);
        Self {
            raw,
            metrics,
            injury_risk,
            injury_risks,
            feedback,
        }
    }

    pub fn has_risk(&self, risk_type: risk::RiskType) -> bool {
        self.injury_risks.iter().any(|r| r.risk_type == risk_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coordinate_reads_named_axis() {
        let metrics = FrameMetrics {
            right_wrist: Some(Point3::new(0.1, 0.2, 0.3)),
            ..FrameMetrics::empty(0, 0.0)
        };
        assert_eq!(metrics.coordinate(TrackedPoint::RightWrist, Axis::Y), Some(0.2));
        assert_eq!(metrics.coordinate(TrackedPoint::RightWrist, Axis::Z), Some(0.3));
        assert_eq!(metrics.coordinate(TrackedPoint::Nose, Axis::Y), None);
    }

    #[test]
    fn missing_angles_serialize_as_null() {
        let json = serde_json::to_value(FrameMetrics::empty(4, 0.1)).unwrap();
        assert!(json["right_elbow_flexion"].is_null());
        assert!(json["wrist_above_head"].is_null());
        assert_eq!(json["frame_idx"], 4);
    }
}
