//! Priority-ordered heuristic stroke classification.
//!
//! Strokes are told apart by motion as much as by position, so each
//! detector scores weighted position and velocity conditions from the
//! current frame and a short history window. Detectors run in a fixed
//! priority order (overhead, serve, dink, volley, groundstroke) and the
//! first match wins. The numeric ranges of neighbouring strokes overlap,
//! so the order decides the outcome for ambiguous frames.
//!
//! With a stroke hint only the hinted detector runs, using relaxed
//! thresholds and a confidence floor.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::geometry::round_to;
use crate::metrics::{Axis, FrameMetrics, TrackedPoint};
use crate::stroke::{StrokeClass, StrokeType};
use crate::velocity::{compute_velocity, count_upward_frames};

/// Frames of history each classification looks back over.
pub const DEFAULT_HISTORY_LEN: usize = 10;

/// Confidence reported for frames no detector accepts.
pub const UNKNOWN_CONFIDENCE: f64 = 0.40;

/// Evaluation order when no hint is given.
pub const DETECTOR_PRIORITY: [StrokeType; 5] = [
    StrokeType::Overhead,
    StrokeType::Serve,
    StrokeType::Dink,
    StrokeType::Volley,
    StrokeType::Groundstroke,
];

// ---------------------------------------------------------------------------
// Thresholds
// ---------------------------------------------------------------------------

/// Numeric thresholds for the overhead detector.
#[derive(Debug, Clone, Copy)]
pub struct OverheadThresholds {
    /// Required `nose_y - wrist_y` (wrist above the head).
    pub min_wrist_above_nose: f64,
    pub min_shoulder_abduction: f64,
    pub high_shoulder_abduction: f64,
}

pub const OVERHEAD: OverheadThresholds = OverheadThresholds {
    min_wrist_above_nose: 0.05,
    min_shoulder_abduction: 110.0,
    high_shoulder_abduction: 130.0,
};

pub const OVERHEAD_HINTED: OverheadThresholds = OverheadThresholds {
    min_wrist_above_nose: 0.0,
    min_shoulder_abduction: 100.0,
    high_shoulder_abduction: 130.0,
};

const OVERHEAD_MIN_SCORE: u32 = 4;
const OVERHEAD_DOWNSWING_VELOCITY: f64 = 0.005;

// Serve: underhand, contact at or below the waist, driven by a fast upward
// wrist swing.
const SERVE_MAX_WRIST_ABOVE_HIP: f64 = 0.20;
const SERVE_MIN_SHOULDER_ABDUCTION: f64 = 20.0;
const SERVE_MAX_SHOULDER_ABDUCTION: f64 = 100.0;
const SERVE_MIN_HIP_ROTATION: f64 = 3.0;
const SERVE_UPWARD_VELOCITY: f64 = 0.005;
const SERVE_MIN_WRIST_VELOCITY: f64 = 0.008;
const SERVE_STRONG_WRIST_VELOCITY: f64 = 0.02;
const SERVE_MIN_UPWARD_FRAMES: usize = 2;
const SERVE_STICKY_WINDOW: usize = 5;
const SERVE_STICKY_VELOCITY: f64 = 0.015;
const SERVE_MIN_SCORE: u32 = 7;
const SERVE_HINTED_MIN_SCORE: u32 = 6;
const SERVE_HINTED_FLOOR: f64 = 0.85;

// Dink: soft touch from a low body position.
const DINK_MAX_SHOULDER_ABDUCTION: f64 = 55.0;
const DINK_MAX_WRIST_VELOCITY: f64 = 0.012;
const DINK_MIN_KNEE_ANGLE: f64 = 100.0;
const DINK_MAX_KNEE_ANGLE: f64 = 160.0;
const DINK_MIN_SCORE: u32 = 4;
const DINK_HINTED_MIN_SCORE: u32 = 3;
const DINK_HINTED_FLOOR: f64 = 0.80;

/// Numeric thresholds for the volley detector.
#[derive(Debug, Clone, Copy)]
pub struct VolleyThresholds {
    pub min_shoulder_abduction: f64,
    pub max_shoulder_abduction: f64,
    pub max_wrist_velocity: f64,
    pub punch_min_shoulder: f64,
}

pub const VOLLEY: VolleyThresholds = VolleyThresholds {
    min_shoulder_abduction: 30.0,
    max_shoulder_abduction: 85.0,
    max_wrist_velocity: 0.015,
    punch_min_shoulder: 55.0,
};

pub const VOLLEY_HINTED: VolleyThresholds = VolleyThresholds {
    min_shoulder_abduction: 25.0,
    max_shoulder_abduction: 95.0,
    max_wrist_velocity: 0.02,
    punch_min_shoulder: 55.0,
};

const VOLLEY_MIN_SCORE: u32 = 4;
const VOLLEY_HINTED_FLOOR: f64 = 0.80;

/// Numeric thresholds for the groundstroke detector.
#[derive(Debug, Clone, Copy)]
pub struct GroundstrokeThresholds {
    pub min_shoulder_abduction: f64,
    pub max_shoulder_abduction: f64,
    pub min_hip_rotation: f64,
    pub min_horizontal_velocity: f64,
}

pub const GROUNDSTROKE: GroundstrokeThresholds = GroundstrokeThresholds {
    min_shoulder_abduction: 45.0,
    max_shoulder_abduction: 110.0,
    min_hip_rotation: 10.0,
    min_horizontal_velocity: 0.01,
};

pub const GROUNDSTROKE_HINTED: GroundstrokeThresholds = GroundstrokeThresholds {
    min_shoulder_abduction: 40.0,
    max_shoulder_abduction: 120.0,
    min_hip_rotation: 10.0,
    min_horizontal_velocity: 0.01,
};

const GROUNDSTROKE_MIN_SCORE: u32 = 2;
const GROUNDSTROKE_DRIVE_SHOULDER: f64 = 70.0;
const GROUNDSTROKE_HINTED_FLOOR: f64 = 0.80;

const MAX_CONFIDENCE: f64 = 0.95;

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

/// Result of classifying one frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Classification {
    pub stroke: StrokeClass,
    pub confidence: f64,
    pub sub_type: &'static str,
}

impl Classification {
    pub const fn unknown() -> Self {
        Self {
            stroke: StrokeClass::Unknown,
            confidence: UNKNOWN_CONFIDENCE,
            sub_type: "unclassified",
        }
    }

    fn matched(stroke: StrokeType, confidence: f64, sub_type: &'static str) -> Self {
        Self {
            stroke: stroke.into(),
            confidence: confidence.min(MAX_CONFIDENCE),
            sub_type,
        }
    }
}

fn wrist_velocity_y(metrics: &FrameMetrics, history: &[FrameMetrics]) -> f64 {
    compute_velocity(metrics, history.last(), TrackedPoint::RightWrist, &[Axis::Y]).y
}

fn in_range(value: f64, min: f64, max: f64) -> bool {
    (min..=max).contains(&value)
}

fn detect_overhead(
    metrics: &FrameMetrics,
    history: &[FrameMetrics],
    hinted: bool,
) -> Option<Classification> {
    let t = if hinted { OVERHEAD_HINTED } else { OVERHEAD };
    let wrist_y = metrics.coordinate(TrackedPoint::RightWrist, Axis::Y)?;
    let nose_y = metrics.coordinate(TrackedPoint::Nose, Axis::Y)?;
    let shoulder = metrics.right_shoulder_abduction?;

    let wrist_above_head = nose_y - wrist_y >= t.min_wrist_above_nose;
    let high_shoulder = shoulder >= t.min_shoulder_abduction;
    if !(wrist_above_head && high_shoulder) {
        return None;
    }

    let mut score = 4;
    // A fully raised arm alone is a confident smash.
    if shoulder >= t.high_shoulder_abduction {
        score += 2;
    }
    if wrist_velocity_y(metrics, history) > OVERHEAD_DOWNSWING_VELOCITY {
        score += 1;
    }

    let confidence = 0.85 + 0.05 * f64::from(score - OVERHEAD_MIN_SCORE);
    Some(Classification::matched(StrokeType::Overhead, confidence, "smash"))
}

/// Whether any of the last few history steps moved the wrist fast enough to
/// still be inside a serve's follow-through.
fn recent_serve_velocity(history: &[FrameMetrics]) -> bool {
    let start = history.len().saturating_sub(SERVE_STICKY_WINDOW + 1);
    history[start..].windows(2).any(|pair| {
        match (
            pair[1].coordinate(TrackedPoint::RightWrist, Axis::Y),
            pair[0].coordinate(TrackedPoint::RightWrist, Axis::Y),
        ) {
            (Some(now), Some(before)) => (now - before).abs() >= SERVE_STICKY_VELOCITY,
            _ => false,
        }
    })
}

fn detect_serve(
    metrics: &FrameMetrics,
    history: &[FrameMetrics],
    hinted: bool,
) -> Option<Classification> {
    let wrist_y = metrics.coordinate(TrackedPoint::RightWrist, Axis::Y);
    let hip_y = metrics.coordinate(TrackedPoint::RightHip, Axis::Y);

    let (wrist_at_waist, wrist_in_follow_through) = match (wrist_y, hip_y) {
        (Some(w), Some(h)) => (h - w <= SERVE_MAX_WRIST_ABOVE_HIP, w < h),
        _ => (false, false),
    };
    let shoulder_in_range = metrics.right_shoulder_abduction.is_some_and(|s| {
        in_range(s, SERVE_MIN_SHOULDER_ABDUCTION, SERVE_MAX_SHOULDER_ABDUCTION)
    });
    let has_hip_rotation = metrics
        .hip_rotation_deg
        .is_some_and(|r| r.abs() >= SERVE_MIN_HIP_ROTATION);

    let velocity = compute_velocity(metrics, history.last(), TrackedPoint::RightWrist, &[Axis::Y]);
    let moving_up = velocity.y < -SERVE_UPWARD_VELOCITY;

    // Rising steps counted over history plus the current frame.
    let previous_y = history
        .last()
        .and_then(|h| h.coordinate(TrackedPoint::RightWrist, Axis::Y));
    let rising_now = matches!((wrist_y, previous_y), (Some(now), Some(before)) if now < before);
    let upward_frames = if rising_now {
        1 + count_upward_frames(history, TrackedPoint::RightWrist)
    } else {
        0
    };

    let mut score = 0;
    if wrist_at_waist {
        score += 1;
    }
    if shoulder_in_range {
        score += 1;
    }
    if has_hip_rotation {
        score += 1;
    }
    if moving_up {
        score += 2;
    }
    if velocity.magnitude >= SERVE_MIN_WRIST_VELOCITY {
        score += 1;
    }
    if upward_frames >= SERVE_MIN_UPWARD_FRAMES {
        score += 1;
    }
    if velocity.magnitude >= SERVE_STRONG_WRIST_VELOCITY {
        score += 2;
    }
    // Keep labelling the follow-through tail after the power frame.
    if wrist_in_follow_through && shoulder_in_range && recent_serve_velocity(history) {
        score += 2;
    }

    let min_score = if hinted { SERVE_HINTED_MIN_SCORE } else { SERVE_MIN_SCORE };
    if score < min_score {
        return None;
    }

    let mut confidence = 0.55 + 0.06 * f64::from(score - 3);
    if hinted {
        confidence = confidence.max(SERVE_HINTED_FLOOR);
    }
    Some(Classification::matched(StrokeType::Serve, confidence, "underhand"))
}

fn detect_dink(
    metrics: &FrameMetrics,
    history: &[FrameMetrics],
    hinted: bool,
) -> Option<Classification> {
    let wrist_y = metrics.coordinate(TrackedPoint::RightWrist, Axis::Y);
    let hip_y = metrics.coordinate(TrackedPoint::RightHip, Axis::Y);
    if metrics.right_shoulder_abduction.is_none()
        && metrics.right_knee_flexion.is_none()
        && wrist_y.is_none()
    {
        return None;
    }

    let low_shoulder = metrics
        .right_shoulder_abduction
        .is_some_and(|s| s <= DINK_MAX_SHOULDER_ABDUCTION);
    let soft_touch = wrist_velocity_y(metrics, history).abs() <= DINK_MAX_WRIST_VELOCITY;
    let low_body = metrics
        .right_knee_flexion
        .is_some_and(|k| in_range(k, DINK_MIN_KNEE_ANGLE, DINK_MAX_KNEE_ANGLE));
    let wrist_below_waist = matches!((wrist_y, hip_y), (Some(w), Some(h)) if w >= h);

    let mut score = 0;
    if low_shoulder {
        score += 1;
    }
    if soft_touch {
        score += 2;
    }
    if low_body {
        score += 1;
    }
    if wrist_below_waist {
        score += 1;
    }

    let min_score = if hinted { DINK_HINTED_MIN_SCORE } else { DINK_MIN_SCORE };
    if score < min_score {
        return None;
    }

    let mut confidence = 0.70 + 0.08 * f64::from(score - 3);
    if hinted {
        confidence = confidence.max(DINK_HINTED_FLOOR);
    }
    Some(Classification::matched(StrokeType::Dink, confidence, "soft_game"))
}

fn detect_volley(
    metrics: &FrameMetrics,
    history: &[FrameMetrics],
    hinted: bool,
) -> Option<Classification> {
    let t = if hinted { VOLLEY_HINTED } else { VOLLEY };
    let shoulder = metrics.right_shoulder_abduction?;
    if !in_range(shoulder, t.min_shoulder_abduction, t.max_shoulder_abduction) {
        return None;
    }

    let mut score = 2;
    if wrist_velocity_y(metrics, history).abs() <= t.max_wrist_velocity {
        score += 2;
    }
    let punch = shoulder >= t.punch_min_shoulder;
    if punch {
        score += 1;
    }
    if score < VOLLEY_MIN_SCORE {
        return None;
    }

    let mut confidence = 0.80 + 0.05 * f64::from(score - VOLLEY_MIN_SCORE);
    if hinted {
        confidence = confidence.max(VOLLEY_HINTED_FLOOR);
    }
    let sub_type = if punch { "punch" } else { "block" };
    Some(Classification::matched(StrokeType::Volley, confidence, sub_type))
}

fn detect_groundstroke(
    metrics: &FrameMetrics,
    history: &[FrameMetrics],
    hinted: bool,
) -> Option<Classification> {
    let t = if hinted { GROUNDSTROKE_HINTED } else { GROUNDSTROKE };
    let shoulder = metrics.right_shoulder_abduction?;
    if !in_range(shoulder, t.min_shoulder_abduction, t.max_shoulder_abduction) {
        return None;
    }

    let mut score = 2;
    if metrics
        .hip_rotation_deg
        .is_some_and(|r| r.abs() >= t.min_hip_rotation)
    {
        score += 1;
    }
    let horizontal = compute_velocity(metrics, history.last(), TrackedPoint::RightWrist, &[Axis::X]);
    if horizontal.x.abs() >= t.min_horizontal_velocity {
        score += 1;
    }
    if score < GROUNDSTROKE_MIN_SCORE {
        return None;
    }

    let forehand = matches!(
        (
            metrics.coordinate(TrackedPoint::RightShoulder, Axis::X),
            metrics.coordinate(TrackedPoint::LeftShoulder, Axis::X),
        ),
        (Some(r), Some(l)) if r > l
    );
    let drive = shoulder >= GROUNDSTROKE_DRIVE_SHOULDER;
    let sub_type = match (forehand, drive) {
        (true, true) => "forehand_drive",
        (true, false) => "forehand_control",
        (false, true) => "backhand_drive",
        (false, false) => "backhand_control",
    };

    let mut confidence = 0.75 + 0.10 * f64::from(score - GROUNDSTROKE_MIN_SCORE);
    if hinted {
        confidence = confidence.max(GROUNDSTROKE_HINTED_FLOOR);
    }
    Some(Classification::matched(StrokeType::Groundstroke, confidence, sub_type))
}

fn run_detector(
    stroke: StrokeType,
    metrics: &FrameMetrics,
    history: &[FrameMetrics],
    hinted: bool,
) -> Option<Classification> {
    match stroke {
        StrokeType::Overhead => detect_overhead(metrics, history, hinted),
        StrokeType::Serve => detect_serve(metrics, history, hinted),
        StrokeType::Dink => detect_dink(metrics, history, hinted),
        StrokeType::Volley => detect_volley(metrics, history, hinted),
        StrokeType::Groundstroke => detect_groundstroke(metrics, history, hinted),
    }
}

/// Classify one frame given the frames immediately before it (oldest first,
/// at most [`DEFAULT_HISTORY_LEN`] are useful).
///
/// With `hint`, only the hinted stroke's detector runs; anything it rejects
/// is `unknown`.
pub fn classify_stroke(
    metrics: &FrameMetrics,
    history: &[FrameMetrics],
    hint: Option<StrokeType>,
) -> Classification {
    let found = match hint {
        Some(stroke) => run_detector(stroke, metrics, history, true),
        None => DETECTOR_PRIORITY
            .iter()
            .find_map(|&stroke| run_detector(stroke, metrics, history, false)),
    };
    found.unwrap_or_else(Classification::unknown)
}

/// Classify every frame of a session with a sliding history window.
pub fn classify_frames(
    metrics: &[FrameMetrics],
    hint: Option<StrokeType>,
    history_len: usize,
) -> Vec<Classification> {
    (0..metrics.len())
        .map(|i| {
            let history = &metrics[i.saturating_sub(history_len)..i];
            classify_stroke(&metrics[i], history, hint)
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Sequence vote
// ---------------------------------------------------------------------------

/// Majority label over a whole session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SequenceVote {
    pub dominant: StrokeClass,
    /// Share of frames carrying the dominant label, two decimals.
    pub confidence: f64,
    pub votes: BTreeMap<StrokeClass, usize>,
}

/// Majority vote over per-frame labels. Ties go to the label seen first.
pub fn vote(classifications: &[Classification]) -> SequenceVote {
    let mut votes: BTreeMap<StrokeClass, usize> = BTreeMap::new();
    let mut first_seen: Vec<StrokeClass> = Vec::new();
    for c in classifications {
        let count = votes.entry(c.stroke).or_insert(0);
        if *count == 0 {
            first_seen.push(c.stroke);
        }
        *count += 1;
    }

    let mut dominant = StrokeClass::Unknown;
    let mut best = 0;
    for label in first_seen {
        let count = votes[&label];
        if count > best {
            best = count;
            dominant = label;
        }
    }

    let confidence = if classifications.is_empty() {
        0.0
    } else {
        round_to(best as f64 / classifications.len() as f64, 2)
    };

    SequenceVote {
        dominant,
        confidence,
        votes,
    }
}

/// Classify a session and reduce it to its dominant stroke.
pub fn classify_sequence(
    metrics: &[FrameMetrics],
    hint: Option<StrokeType>,
    history_len: usize,
) -> SequenceVote {
    vote(&classify_frames(metrics, hint, history_len))
}
