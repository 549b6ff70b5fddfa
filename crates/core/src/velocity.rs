//! Frame-to-frame displacement of tracked points and strike confirmation.
//!
//! Velocities are in normalized image units per frame. Image y grows
//! downward, so a negative y velocity means the point is rising.

use serde::{Deserialize, Serialize};

use crate::metrics::{Axis, FrameMetrics, TrackedPoint};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// A candidate peak below this magnitude is drift, not a strike.
pub const PEAK_VELOCITY_FLOOR: f64 = 0.02;

/// Frames before the peak that must average below `RAMP_UP_RATIO * peak`.
pub const RAMP_UP_WINDOW: usize = 2;
pub const RAMP_UP_RATIO: f64 = 0.9;

/// Frames after the peak searched for the required drop.
pub const DECELERATION_WINDOW: usize = 3;

/// Required post-peak drop for most strokes, in percent of the peak.
pub const DEFAULT_MIN_DROP_PERCENT: f64 = 40.0;

/// Serves decelerate more gently than drives.
pub const SERVE_MIN_DROP_PERCENT: f64 = 25.0;

// ---------------------------------------------------------------------------
// Velocity
// ---------------------------------------------------------------------------

/// Per-axis displacement between two frames plus its Euclidean norm.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Velocity {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub magnitude: f64,
}

impl Velocity {
    fn set(&mut self, axis: Axis, value: f64) {
        match axis {
            Axis::X => self.x = value,
            Axis::Y => self.y = value,
            Axis::Z => self.z = value,
        }
    }
}

/// Displacement of `point` from `previous` to `current` along `axes`.
///
/// Only the listed axes contribute (at most three are used); the others
/// stay zero. A missing previous frame, or a missing coordinate on either
/// side, contributes zero.
pub fn compute_velocity(
    current: &FrameMetrics,
    previous: Option<&FrameMetrics>,
    point: TrackedPoint,
    axes: &[Axis],
) -> Velocity {
    let mut velocity = Velocity::default();
    let Some(previous) = previous else {
        return velocity;
    };

    let mut sum_sq = 0.0;
    for &axis in axes.iter().take(3) {
        let delta = match (
            current.coordinate(point, axis),
            previous.coordinate(point, axis),
        ) {
            (Some(now), Some(before)) => now - before,
            _ => 0.0,
        };
        velocity.set(axis, delta);
        sum_sq += delta * delta;
    }
    velocity.magnitude = sum_sq.sqrt();
    velocity
}

/// Count the trailing frames in `history` whose y coordinate for `point`
/// strictly decreased (moved up) relative to the frame before.
///
/// Scans backward from the newest frame and stops at the first step that
/// did not rise or where the coordinate is missing.
pub fn count_upward_frames(history: &[FrameMetrics], point: TrackedPoint) -> usize {
    history
        .windows(2)
        .rev()
        .take_while(|pair| {
            match (
                pair[1].coordinate(point, Axis::Y),
                pair[0].coordinate(point, Axis::Y),
            ) {
                (Some(now), Some(before)) => now < before,
                _ => false,
            }
        })
        .count()
}

/// Decide whether `velocities[peak_idx]` is a genuine strike.
///
/// A peak is confirmed only if:
/// 1. it reaches [`PEAK_VELOCITY_FLOOR`];
/// 2. the (up to) two frames before it average below 90% of the peak, i.e.
///    there was a ramp-up (a peak at the very first frame passes this check);
/// 3. within the three frames after it, velocity falls by at least
///    `min_drop_percent` of the peak (a peak with no following frames fails).
pub fn is_velocity_peak_confirmed(velocities: &[f64], peak_idx: usize, min_drop_percent: f64) -> bool {
    let Some(&peak) = velocities.get(peak_idx) else {
        return false;
    };
    if peak < PEAK_VELOCITY_FLOOR {
        return false;
    }

    let before = &velocities[peak_idx.saturating_sub(RAMP_UP_WINDOW)..peak_idx];
    if !before.is_empty() {
        let mean = before.iter().sum::<f64>() / before.len() as f64;
        if mean >= peak * RAMP_UP_RATIO {
            return false;
        }
    }

    let end = (peak_idx + 1 + DECELERATION_WINDOW).min(velocities.len());
    let after = &velocities[peak_idx + 1..end];
    let threshold = peak * (1.0 - min_drop_percent / 100.0);
    after.iter().any(|&v| v <= threshold)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Point3;

    fn wrist_at(x: f64, y: f64, z: f64) -> FrameMetrics {
        FrameMetrics {
            right_wrist: Some(Point3::new(x, y, z)),
            ..FrameMetrics::default()
        }
    }

    // -- compute_velocity -----------------------------------------------------

    #[test]
    fn no_previous_frame_gives_zero_vector() {
        let v = compute_velocity(&wrist_at(0.5, 0.5, 0.0), None, TrackedPoint::RightWrist, &[Axis::X, Axis::Y]);
        assert_eq!(v, Velocity::default());
    }

    #[test]
    fn magnitude_is_norm_of_requested_axes() {
        let prev = wrist_at(0.1, 0.5, 0.0);
        let cur = wrist_at(0.13, 0.46, 0.5);
        let v = compute_velocity(&cur, Some(&prev), TrackedPoint::RightWrist, &[Axis::X, Axis::Y]);
        assert!((v.x - 0.03).abs() < 1e-12);
        assert!((v.y + 0.04).abs() < 1e-12);
        assert_eq!(v.z, 0.0);
        assert!((v.magnitude - 0.05).abs() < 1e-12);
    }

    #[test]
    fn missing_coordinate_contributes_zero() {
        let prev = FrameMetrics::default();
        let cur = wrist_at(0.2, 0.2, 0.0);
        let v = compute_velocity(&cur, Some(&prev), TrackedPoint::RightWrist, &[Axis::Y]);
        assert_eq!(v.magnitude, 0.0);
    }

    // -- count_upward_frames --------------------------------------------------

    #[test]
    fn counts_trailing_rising_frames() {
        let history: Vec<_> = [0.5, 0.6, 0.55, 0.5, 0.45]
            .iter()
            .map(|&y| wrist_at(0.5, y, 0.0))
            .collect();
        assert_eq!(count_upward_frames(&history, TrackedPoint::RightWrist), 3);
    }

    #[test]
    fn stops_at_first_non_rising_step() {
        let history: Vec<_> = [0.4, 0.3, 0.3]
            .iter()
            .map(|&y| wrist_at(0.5, y, 0.0))
            .collect();
        assert_eq!(count_upward_frames(&history, TrackedPoint::RightWrist), 0);
    }

    #[test]
    fn short_history_has_no_upward_frames() {
        assert_eq!(count_upward_frames(&[], TrackedPoint::RightWrist), 0);
        assert_eq!(count_upward_frames(&[wrist_at(0.1, 0.1, 0.0)], TrackedPoint::RightWrist), 0);
    }

    // -- is_velocity_peak_confirmed -------------------------------------------

    #[test]
    fn confirms_ramp_peak_and_drop() {
        let v = [0.0, 0.01, 0.015, 0.03, 0.015, 0.01];
        assert!(is_velocity_peak_confirmed(&v, 3, DEFAULT_MIN_DROP_PERCENT));
    }

    #[test]
    fn rejects_peak_below_floor() {
        let v = [0.0, 0.005, 0.019, 0.0];
        assert!(!is_velocity_peak_confirmed(&v, 2, DEFAULT_MIN_DROP_PERCENT));
    }

    #[test]
    fn rejects_plateau_without_ramp_up() {
        let v = [0.03, 0.03, 0.031, 0.0];
        assert!(!is_velocity_peak_confirmed(&v, 2, DEFAULT_MIN_DROP_PERCENT));
    }

    #[test]
    fn rejects_insufficient_deceleration() {
        // 0.03 -> 0.022 is a 27% drop: enough for a serve, not for a drive.
        let v = [0.0, 0.01, 0.03, 0.025, 0.022, 0.024];
        assert!(!is_velocity_peak_confirmed(&v, 2, DEFAULT_MIN_DROP_PERCENT));
        assert!(is_velocity_peak_confirmed(&v, 2, SERVE_MIN_DROP_PERCENT));
    }

    #[test]
    fn drop_outside_window_does_not_count() {
        let v = [0.0, 0.01, 0.03, 0.029, 0.028, 0.027, 0.0];
        assert!(!is_velocity_peak_confirmed(&v, 2, DEFAULT_MIN_DROP_PERCENT));
    }

    #[test]
    fn peak_at_end_of_stream_is_unconfirmed() {
        let v = [0.0, 0.01, 0.04];
        assert!(!is_velocity_peak_confirmed(&v, 2, DEFAULT_MIN_DROP_PERCENT));
    }

    #[test]
    fn out_of_range_index_is_unconfirmed() {
        assert!(!is_velocity_peak_confirmed(&[0.05], 4, DEFAULT_MIN_DROP_PERCENT));
    }
}
