//! End-to-end analysis of one recorded session.
//!
//! Stages, in order:
//!
//! 1. fps (supplied, or estimated from timestamps);
//! 2. per-frame metrics, with wrist and shoulder velocity against the
//!    previous frame;
//! 3. per-frame stroke classification over a sliding history window;
//! 4. player movement from the tracker's boxes;
//! 5. per-frame risks and feedback, then the sustained-risk filter;
//! 6. session risk percentages, overall level, alerts and recommendations;
//! 7. stroke segmentation through the rally state machine;
//! 8. result assembly.

use serde::{Deserialize, Serialize};

use rallycoach_core::classifier::{self, SequenceVote};
use rallycoach_core::deviation::{compute_deviation_report, DeviationReport};
use rallycoach_core::geometry::{compute_frame_metrics, round1};
use rallycoach_core::metrics::{AnalyzedFrame, Axis, FrameMetrics, TrackedPoint};
use rallycoach_core::movement::{movement_stats, MovementStats};
use rallycoach_core::risk::{
    filter_sustained_risks, risk_advice, risk_percentages, session_risk_level, Recommendation,
    RiskAlert, RiskPercentages, RiskSeverity,
};
use rallycoach_core::segmentation::{detect_strokes, ClassifiedFrame, StrokeSegment};
use rallycoach_core::stroke::{StrokeSelector, StrokeType};
use rallycoach_core::types::RawFrame;
use rallycoach_core::velocity::compute_velocity;

use crate::config::AnalysisConfig;
use crate::error::PipelineError;
use crate::fps::estimate_fps;

const ALL_AXES: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];

/// Stroke scored by the deviation report when the session is generic and
/// no stroke dominated it.
pub const FALLBACK_DEVIATION_STROKE: StrokeType = StrokeType::Groundstroke;

/// One session to analyze. `job_id` and `video_url` are echoed verbatim.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRequest {
    pub job_id: String,
    #[serde(default)]
    pub stroke_type: StrokeSelector,
    pub video_url: String,
    #[serde(default)]
    pub fps: Option<f64>,
    pub frames: Vec<RawFrame>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub total_frames: usize,
    /// Frames that carried a pose.
    pub analyzed_frames: usize,
    pub fps: f64,
    pub duration_sec: f64,
    pub overall_risk: RiskSeverity,
    pub risk_percentages: RiskPercentages,
    pub alerts: Vec<RiskAlert>,
    pub recommendations: Vec<Recommendation>,
    pub movement: MovementStats,
    pub dominant_stroke: SequenceVote,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionResult {
    pub job_id: String,
    pub stroke_type: StrokeSelector,
    #[serde(rename = "videoUrl")]
    pub video_url: String,
    pub frames: Vec<AnalyzedFrame>,
    pub summary: SessionSummary,
    pub strokes: Vec<StrokeSegment>,
}

impl SessionResult {
    /// The stroke the deviation report scores against: the declared one,
    /// else the session's dominant stroke, else groundstroke.
    pub fn deviation_stroke(&self) -> StrokeType {
        self.stroke_type
            .hint()
            .or(self.summary.dominant_stroke.dominant.stroke_type())
            .unwrap_or(FALLBACK_DEVIATION_STROKE)
    }

    /// Score the session's metrics against the optimal ranges.
    pub fn deviation_report(&self) -> DeviationReport {
        compute_deviation_report(self.frames.iter().map(|f| &f.metrics), self.deviation_stroke())
    }
}

fn resolve_fps(requested: Option<f64>, frames: &[RawFrame], default_fps: f64) -> Result<f64, PipelineError> {
    match requested {
        Some(fps) if fps.is_finite() && fps > 0.0 => Ok(fps),
        Some(fps) => Err(PipelineError::InvalidFps(fps)),
        None => Ok(estimate_fps(frames, default_fps)),
    }
}

/// Per-frame metrics with velocities filled in from the previous frame.
fn frame_metrics(frames: &[RawFrame], config: &AnalysisConfig) -> Vec<FrameMetrics> {
    let mut metrics: Vec<FrameMetrics> = Vec::with_capacity(frames.len());
    for frame in frames {
        let mut current = compute_frame_metrics(frame, config.visibility_gate);
        let previous = metrics.last();
        current.wrist_velocity =
            compute_velocity(&current, previous, TrackedPoint::RightWrist, &ALL_AXES);
        current.shoulder_velocity =
            compute_velocity(&current, previous, TrackedPoint::RightShoulder, &ALL_AXES);
        metrics.push(current);
    }
    metrics
}

/// Run the full analysis for one session.
///
/// Errors only on invalid configuration or an invalid explicit fps; any
/// well-formed frame stream (including an empty one) produces a result.
pub fn analyze_session(
    request: SessionRequest,
    config: &AnalysisConfig,
) -> Result<SessionResult, PipelineError> {
    config.validate()?;

    let SessionRequest {
        job_id,
        stroke_type,
        video_url,
        fps,
        frames,
    } = request;

    tracing::info!(
        job_id = %job_id,
        frame_count = frames.len(),
        stroke_type = %stroke_type,
        "Starting session analysis",
    );

    let fps = resolve_fps(fps, &frames, config.default_fps)?;
    tracing::debug!(job_id = %job_id, fps, "Resolved frame rate");

    let metrics = frame_metrics(&frames, config);

    let classifications =
        classifier::classify_frames(&metrics, stroke_type.hint(), config.classifier_history);
    let classified: Vec<ClassifiedFrame> = metrics
        .iter()
        .zip(&classifications)
        .map(|(m, c)| ClassifiedFrame {
            frame_idx: m.frame_idx,
            timestamp_sec: m.timestamp_sec,
            stroke: c.stroke,
            confidence: c.confidence,
            wrist_velocity: m.wrist_velocity.magnitude,
        })
        .collect();
    let dominant_stroke = classifier::vote(&classifications);
    tracing::debug!(
        job_id = %job_id,
        dominant = ?dominant_stroke.dominant,
        share = dominant_stroke.confidence,
        "Classified frames",
    );

    let total_frames = frames.len();
    let analyzed_frames = frames.iter().filter(|f| f.has_pose()).count();
    let movement = movement_stats(&frames, fps);

    let mut analyzed: Vec<AnalyzedFrame> = frames
        .into_iter()
        .zip(metrics)
        .map(|(raw, m)| AnalyzedFrame::assemble(raw, m, stroke_type))
        .collect();

    let removed = filter_sustained_risks(&mut analyzed, config.min_sustained_frames);
    tracing::debug!(
        job_id = %job_id,
        removed,
        min_frames = config.min_sustained_frames,
        "Sustained-risk filter applied",
    );

    let percentages = risk_percentages(&analyzed);
    let overall_risk = session_risk_level(&percentages);
    let (alerts, recommendations) = risk_advice(&percentages, overall_risk);

    let outcome = detect_strokes(&classified, stroke_type.hint(), fps);
    for rejected in &outcome.rejected {
        tracing::debug!(
            job_id = %job_id,
            stroke = %rejected.segment.stroke_type,
            start_frame = rejected.segment.start_frame,
            end_frame = rejected.segment.end_frame,
            reason = ?rejected.reason,
            "Segment rejected",
        );
    }
    tracing::debug!(
        job_id = %job_id,
        raw = outcome.accepted.len() + outcome.rejected.len(),
        accepted = outcome.accepted.len(),
        "Segmentation complete",
    );

    let summary = SessionSummary {
        total_frames,
        analyzed_frames,
        fps,
        duration_sec: round1(total_frames as f64 / fps),
        overall_risk,
        risk_percentages: percentages,
        alerts,
        recommendations,
        movement,
        dominant_stroke,
    };

    tracing::info!(
        job_id = %job_id,
        overall_risk = ?summary.overall_risk,
        alerts = summary.alerts.len(),
        distance_m = summary.movement.total_distance_m,
        strokes = outcome.accepted.len(),
        fps = summary.fps,
        "Session analysis complete",
    );

    Ok(SessionResult {
        job_id,
        stroke_type,
        video_url,
        frames: analyzed,
        summary,
        strokes: outcome.accepted,
    })
}
