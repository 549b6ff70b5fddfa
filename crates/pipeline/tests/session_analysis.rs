//! End-to-end tests for `analyze_session` over synthetic landmark streams.
//!
//! Landmarks not placed explicitly get zero visibility and the tests run
//! with a visibility gate, so only the joints each scenario sets up feed
//! the metrics.

use rallycoach_core::risk::{RiskSeverity, RiskType};
use rallycoach_core::stroke::{StrokeClass, StrokeSelector, StrokeType};
use rallycoach_core::types::{Landmark, PoseLandmark, RawFrame, POSE_LANDMARK_COUNT};
use rallycoach_pipeline::{analyze_session, AnalysisConfig, SessionRequest};

const FPS: f64 = 30.0;

fn gated() -> AnalysisConfig {
    AnalysisConfig {
        visibility_gate: Some(0.5),
        ..AnalysisConfig::default()
    }
}

fn pose_frame(idx: i64, joints: &[(PoseLandmark, [f64; 3])]) -> RawFrame {
    let mut landmarks = vec![
        Landmark {
            x: 0.0,
            y: 0.0,
            z: 0.0,
            visibility: 0.0,
        };
        POSE_LANDMARK_COUNT
    ];
    for (which, [x, y, z]) in joints {
        landmarks[which.index()] = Landmark {
            x: *x,
            y: *y,
            z: *z,
            visibility: 0.99,
        };
    }
    RawFrame {
        confidence: 0.9,
        track_id: 1,
        landmarks: Some(landmarks),
        ..RawFrame::empty(idx, idx as f64 / FPS)
    }
}

fn request(stroke: StrokeSelector, frames: Vec<RawFrame>) -> SessionRequest {
    SessionRequest {
        job_id: "job-42".into(),
        stroke_type: stroke,
        video_url: "https://cdn.example.com/session.mp4".into(),
        fps: None,
        frames,
    }
}

/// Upright player, hips turned ~10°, hitting arm raised ~150° from the trunk.
fn raised_arm_pose(idx: i64) -> RawFrame {
    // tan(10°) * 0.2 lateral hip gap.
    let hip_depth = 0.035_265;
    pose_frame(
        idx,
        &[
            (PoseLandmark::Nose, [0.5, 0.15, 0.0]),
            (PoseLandmark::LeftShoulder, [0.4, 0.3, 0.0]),
            (PoseLandmark::RightShoulder, [0.6, 0.3, hip_depth]),
            (PoseLandmark::RightElbow, [0.7, 0.126_795, hip_depth]),
            (PoseLandmark::RightWrist, [0.85, 0.2, hip_depth]),
            (PoseLandmark::LeftHip, [0.4, 0.6, 0.0]),
            (PoseLandmark::RightHip, [0.6, 0.6, hip_depth]),
        ],
    )
}

/// Underhand serve posture with the wrist at height `wrist_y`.
fn serve_pose(idx: i64, wrist_y: f64) -> RawFrame {
    pose_frame(
        idx,
        &[
            (PoseLandmark::Nose, [0.5, 0.15, 0.0]),
            (PoseLandmark::LeftShoulder, [0.4, 0.3, 0.0]),
            (PoseLandmark::RightShoulder, [0.6, 0.3, 0.0]),
            (PoseLandmark::RightElbow, [0.7, 0.4, 0.0]),
            (PoseLandmark::RightWrist, [0.7, wrist_y, 0.0]),
            (PoseLandmark::LeftHip, [0.4, 0.6, 0.0]),
            (PoseLandmark::RightHip, [0.6, 0.6, 0.05]),
        ],
    )
}

/// 20 idle frames, a 7-frame upward swing, then the wrist holds still.
fn serve_session() -> Vec<RawFrame> {
    const SWING: [f64; 8] = [0.69, 0.67, 0.64, 0.60, 0.575, 0.56, 0.555, 0.555];
    let mut frames: Vec<RawFrame> = (0..20).map(|i| serve_pose(i, 0.70)).collect();
    frames.extend(SWING.iter().zip(20..).map(|(&y, i)| serve_pose(i, y)));
    frames.extend((28..50).map(|i| serve_pose(i, 0.555)));
    frames
}

// ---------------------------------------------------------------------------
// Risk scenario
// ---------------------------------------------------------------------------

#[test]
fn sustained_shoulder_load_on_groundstroke_is_high_risk() {
    let frames: Vec<_> = (0..30).map(raised_arm_pose).collect();
    let result = analyze_session(
        request(StrokeSelector::Stroke(StrokeType::Groundstroke), frames),
        &gated(),
    )
    .expect("analysis should succeed");

    let first = &result.frames[0].metrics;
    assert_eq!(first.hip_rotation_deg, Some(10.0));
    assert_eq!(first.right_shoulder_abduction, Some(150.0));

    for frame in &result.frames[2..] {
        assert!(frame.has_risk(RiskType::ShoulderOveruse));
        assert!(frame.has_risk(RiskType::PoorKineticChain));
        let chain = frame
            .injury_risks
            .iter()
            .find(|r| r.risk_type == RiskType::PoorKineticChain)
            .unwrap();
        assert_eq!(chain.severity, RiskSeverity::Medium);
    }

    assert_eq!(result.summary.risk_percentages.shoulder_overuse, 100.0);
    assert_eq!(result.summary.overall_risk, RiskSeverity::High);
}

#[test]
fn overhead_sessions_do_not_flag_raised_shoulder() {
    let frames: Vec<_> = (0..30).map(raised_arm_pose).collect();
    let result = analyze_session(
        request(StrokeSelector::Stroke(StrokeType::Overhead), frames),
        &gated(),
    )
    .unwrap();
    assert_eq!(result.summary.risk_percentages.shoulder_overuse, 0.0);
}

#[test]
fn single_frame_spike_is_filtered_out() {
    let mut frames: Vec<_> = (0..30).map(|i| serve_pose(i, 0.70)).collect();
    frames[10] = raised_arm_pose(10);
    let result = analyze_session(
        request(StrokeSelector::Stroke(StrokeType::Volley), frames),
        &gated(),
    )
    .unwrap();
    assert!(!result.frames[10].has_risk(RiskType::ShoulderOveruse));
    // The frame-level level is evaluated before filtering and is kept.
    assert_eq!(result.frames[10].injury_risk, RiskSeverity::High);
    assert_eq!(result.summary.risk_percentages.shoulder_overuse, 0.0);
}

// ---------------------------------------------------------------------------
// Stroke detection
// ---------------------------------------------------------------------------

#[test]
fn serve_swing_yields_one_stroke_segment() {
    let result = analyze_session(
        request(StrokeSelector::Stroke(StrokeType::Serve), serve_session()),
        &gated(),
    )
    .unwrap();

    assert_eq!(result.summary.fps, 30.0);
    assert_eq!(result.strokes.len(), 1);
    let serve = &result.strokes[0];
    assert_eq!(serve.stroke_type, StrokeType::Serve);
    assert!(serve.start_frame >= 20 && serve.end_frame <= 28);
    assert_eq!(serve.peak_frame, 23);
    assert!(serve.confidence >= 0.85);
}

#[test]
fn declared_stroke_shapes_deviation_report() {
    let result = analyze_session(
        request(StrokeSelector::Stroke(StrokeType::Serve), serve_session()),
        &gated(),
    )
    .unwrap();
    let report = result.deviation_report();
    assert_eq!(report.stroke_type, StrokeType::Serve);
    assert_eq!(report.parameters.len(), 4);
    assert!((0.0..=100.0).contains(&report.overall_score));
}

// ---------------------------------------------------------------------------
// Wire shape
// ---------------------------------------------------------------------------

#[test]
fn result_serializes_with_expected_keys() {
    let mut req = request(StrokeSelector::parse("drive"), serve_session());
    req.fps = Some(60.0);
    let result = analyze_session(req, &gated()).unwrap();

    let json = serde_json::to_value(&result).expect("serialization should succeed");
    assert_eq!(json["job_id"], "job-42");
    assert_eq!(json["stroke_type"], "groundstroke");
    assert_eq!(json["videoUrl"], "https://cdn.example.com/session.mp4");

    let frame = &json["frames"][0];
    assert_eq!(frame["frameIdx"], 0);
    assert_eq!(frame["track_id"], 1);
    assert!(frame["metrics"]["right_shoulder_abduction"].is_number());
    assert!(frame["injury_risks"].is_array());
    assert!(frame["feedback"].is_array());

    let summary = &json["summary"];
    assert_eq!(summary["total_frames"], 50);
    assert_eq!(summary["analyzed_frames"], 50);
    assert_eq!(summary["fps"], 60.0);
    assert_eq!(summary["duration_sec"], 0.8);
    assert!(summary["risk_percentages"]["shoulder_overuse"].is_number());
    assert!(summary["dominant_stroke"]["dominant"].is_string());
    assert!(json["strokes"].is_array());
}

#[test]
fn generic_session_reports_against_dominant_stroke() {
    let result = analyze_session(
        request(StrokeSelector::parse("overall"), serve_session()),
        &gated(),
    )
    .unwrap();
    // Without a hint the held poses split between volley and dink.
    let vote = &result.summary.dominant_stroke;
    assert_eq!(vote.dominant, StrokeClass::Volley);
    assert_eq!(vote.votes.get(&StrokeClass::Volley), Some(&23));
    assert_eq!(result.deviation_stroke(), StrokeType::Volley);
    assert_eq!(result.deviation_report().stroke_type, StrokeType::Volley);
}

// ---------------------------------------------------------------------------
// Movement and risk advice
// ---------------------------------------------------------------------------

#[test]
fn player_movement_comes_from_bbox_track() {
    // Feet drift 0.02 right per frame under a 0.5-high box: 0.07 m per step.
    let frames: Vec<_> = serve_session()
        .into_iter()
        .map(|f| {
            let x = 0.2 + f.frame_idx as f64 * 0.02;
            RawFrame {
                bbox: [x - 0.1, 0.4, x + 0.1, 0.9],
                ..f
            }
        })
        .collect();
    let result = analyze_session(
        request(StrokeSelector::Stroke(StrokeType::Serve), frames),
        &gated(),
    )
    .unwrap();

    let movement = result.summary.movement;
    assert_eq!(movement.total_distance_m, 3.43);
    // 49 steps over 50 / 30 s.
    assert_eq!(movement.avg_speed_kmh, 7.41);

    let json = serde_json::to_value(&result.summary).unwrap();
    assert_eq!(json["movement"]["total_distance_m"], 3.43);
}

#[test]
fn raised_arm_session_raises_shoulder_alert() {
    let frames: Vec<_> = (0..30).map(raised_arm_pose).collect();
    let result = analyze_session(
        request(StrokeSelector::Stroke(StrokeType::Groundstroke), frames),
        &gated(),
    )
    .unwrap();

    let types: Vec<_> = result.summary.alerts.iter().map(|a| a.alert_type.as_str()).collect();
    assert_eq!(types, vec!["shoulder_overuse", "technique"]);
    let titles: Vec<_> = result
        .summary
        .recommendations
        .iter()
        .map(|r| r.title.as_str())
        .collect();
    assert!(titles.contains(&"Reduce Shoulder Strain"));
    assert!(!titles.contains(&"Excellent Biomechanics"));
}
