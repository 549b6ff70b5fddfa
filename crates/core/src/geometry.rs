//! Joint angles and position flags from pose landmarks.
//!
//! All angles are reported in degrees rounded to 0.1. Degenerate input
//! (zero-length rays) yields 0 rather than NaN.
//!
//! Hip rotation is a depth-differential heuristic, not a calibrated 3D
//! rotation: it compares the depth gap between the hips with their lateral
//! gap, so its accuracy is bounded by the tracker's depth estimate and the
//! camera setup. Treat it as approximate.

use crate::metrics::FrameMetrics;
use crate::types::{Landmark, Point3, PoseLandmark, RawFrame};

/// Rays shorter than this are treated as zero length.
const MIN_RAY_LENGTH: f64 = 1e-9;

/// Round to one decimal place.
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Round to `places` decimal places.
pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

// ---------------------------------------------------------------------------
// Angles
// ---------------------------------------------------------------------------

/// Angle at `b` between the rays `b -> a` and `b -> c`, in `[0, 180]`.
///
/// Returns 0 when either ray has zero length.
pub fn calculate_angle(a: &Point3, b: &Point3, c: &Point3) -> f64 {
    let ba = [a.x - b.x, a.y - b.y, a.z - b.z];
    let bc = [c.x - b.x, c.y - b.y, c.z - b.z];

    let norm_ba = (ba[0] * ba[0] + ba[1] * ba[1] + ba[2] * ba[2]).sqrt();
    let norm_bc = (bc[0] * bc[0] + bc[1] * bc[1] + bc[2] * bc[2]).sqrt();
    if norm_ba < MIN_RAY_LENGTH || norm_bc < MIN_RAY_LENGTH {
        return 0.0;
    }

    let dot = ba[0] * bc[0] + ba[1] * bc[1] + ba[2] * bc[2];
    let cosine = (dot / (norm_ba * norm_bc)).clamp(-1.0, 1.0);
    round1(cosine.acos().to_degrees())
}

/// Hip rotation about the vertical axis: `atan(|dz| / |dx|)` in degrees.
///
/// Equal-depth hips give 0 (square to the camera); hips stacked on the same
/// x give 90 (fully side-on).
pub fn calculate_hip_rotation(left_hip: &Point3, right_hip: &Point3) -> f64 {
    let dx = (right_hip.x - left_hip.x).abs();
    let dz = (right_hip.z - left_hip.z).abs();
    if dx < MIN_RAY_LENGTH {
        return 90.0;
    }
    round1((dz / dx).atan().to_degrees())
}

/// Forward trunk lean from vertical, measured in the image plane from the
/// mid-hip to the mid-shoulder. 0 = upright.
pub fn calculate_spine_flexion(mid_hip: &Point3, mid_shoulder: &Point3) -> f64 {
    let dx = mid_shoulder.x - mid_hip.x;
    let dy = mid_shoulder.y - mid_hip.y;
    let len = (dx * dx + dy * dy).sqrt();
    if len < MIN_RAY_LENGTH {
        return 0.0;
    }
    // Image y grows downward, so "up" is (0, -1).
    let cosine = (-dy / len).clamp(-1.0, 1.0);
    round1(cosine.acos().to_degrees())
}

// ---------------------------------------------------------------------------
// Frame metrics
// ---------------------------------------------------------------------------

/// Resolve a landmark, optionally rejecting it below a visibility gate.
fn resolve(frame: &RawFrame, which: PoseLandmark, visibility_gate: Option<f64>) -> Option<Point3> {
    frame
        .landmark(which)
        .filter(|lm: &&Landmark| visibility_gate.is_none_or(|gate| lm.visibility >= gate))
        .map(Landmark::point)
}

fn angle_of(a: Option<Point3>, b: Option<Point3>, c: Option<Point3>) -> Option<f64> {
    Some(calculate_angle(&a?, &b?, &c?))
}

/// Compute the positional metrics for one frame.
///
/// Velocity fields are left at zero; they need the previous frame and are
/// filled in by the caller (see [`crate::velocity::compute_velocity`]).
///
/// `visibility_gate` of `None` uses every landmark the tracker reported,
/// regardless of its visibility score.
pub fn compute_frame_metrics(frame: &RawFrame, visibility_gate: Option<f64>) -> FrameMetrics {
    let mut metrics = FrameMetrics::empty(frame.frame_idx, frame.timestamp_sec);
    if !frame.has_pose() {
        return metrics;
    }

    let get = |which| resolve(frame, which, visibility_gate);

    let nose = get(PoseLandmark::Nose);
    let r_shoulder = get(PoseLandmark::RightShoulder);
    let l_shoulder = get(PoseLandmark::LeftShoulder);
    let r_elbow = get(PoseLandmark::RightElbow);
    let l_elbow = get(PoseLandmark::LeftElbow);
    let r_wrist = get(PoseLandmark::RightWrist);
    let l_wrist = get(PoseLandmark::LeftWrist);
    let r_hip = get(PoseLandmark::RightHip);
    let l_hip = get(PoseLandmark::LeftHip);
    let r_knee = get(PoseLandmark::RightKnee);
    let l_knee = get(PoseLandmark::LeftKnee);
    let r_ankle = get(PoseLandmark::RightAnkle);
    let l_ankle = get(PoseLandmark::LeftAnkle);

    metrics.right_elbow_flexion = angle_of(r_shoulder, r_elbow, r_wrist);
    metrics.left_elbow_flexion = angle_of(l_shoulder, l_elbow, l_wrist);
    metrics.right_shoulder_abduction = angle_of(r_hip, r_shoulder, r_elbow);
    metrics.right_knee_flexion = angle_of(r_hip, r_knee, r_ankle);
    metrics.left_knee_flexion = angle_of(l_hip, l_knee, l_ankle);

    if let (Some(lh), Some(rh)) = (l_hip, r_hip) {
        metrics.hip_rotation_deg = Some(calculate_hip_rotation(&lh, &rh));

        let mid_hip = lh.midpoint(&rh);
        if let (Some(ls), Some(rs)) = (l_shoulder, r_shoulder) {
            metrics.spine_flexion = Some(calculate_spine_flexion(&mid_hip, &ls.midpoint(&rs)));
        }

        if let Some(wrist) = r_wrist {
            let dx = wrist.x - mid_hip.x;
            let dy = wrist.y - mid_hip.y;
            metrics.wrist_to_body_distance = Some(round_to((dx * dx + dy * dy).sqrt(), 3));
            // Smaller y is higher in the frame.
            metrics.wrist_above_waist = Some(wrist.y < mid_hip.y);
            metrics.wrist_above_head = nose.map(|n| wrist.y < n.y);
        }
    }

    metrics.right_wrist = r_wrist;
    metrics.right_shoulder = r_shoulder;
    metrics.left_shoulder = l_shoulder;
    metrics.right_hip = r_hip;
    metrics.nose = nose;

    metrics
}
