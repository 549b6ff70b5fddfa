//! Temporal segmentation of classified frames into stroke events.
//!
//! Per-frame labels are coalesced into raw segments, then filtered through
//! a rally state machine:
//!
//! 1. a long, quiet gap since the last accepted stroke ends the rally and
//!    releases the serve-lock;
//! 2. segments that are too short or low-confidence are dropped;
//! 3. power strokes must show a confirmed velocity peak;
//! 4. only one serve is accepted per rally;
//! 5. a segment starting inside the previous stroke's cooldown is a
//!    duplicate detection of the same hit.
//!
//! Multi-rally videos are handled by the quiet-gap reset only. Callers that
//! know the rally boundaries should split the frames and segment each part
//! with its own [`RallyState`].

use serde::{Deserialize, Serialize};

use crate::geometry::round_to;
use crate::stroke::{StrokeClass, StrokeType};
use crate::velocity::{
    is_velocity_peak_confirmed, DEFAULT_MIN_DROP_PERCENT, PEAK_VELOCITY_FLOOR,
    SERVE_MIN_DROP_PERCENT,
};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Raw segments shorter than this are noise.
pub const MIN_SEGMENT_FRAMES: i64 = 3;

/// Same-type segments separated by at most this many frames are merged.
pub const MERGE_GAP_FRAMES: i64 = 3;

/// A gap longer than this (2 s at 30 fps) may end the rally.
pub const RALLY_END_GAP_FRAMES: i64 = 60;

/// Wrist velocity at or below this counts as idle.
pub const RALLY_IDLE_VELOCITY: f64 = 0.01;

/// The gap ends the rally only if fewer than this share of its frames move.
pub const RALLY_ACTIVE_SAMPLE_RATIO: f64 = 0.10;

// ---------------------------------------------------------------------------
// Input / raw segments
// ---------------------------------------------------------------------------

/// One classified frame, as consumed by segmentation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassifiedFrame {
    pub frame_idx: i64,
    pub timestamp_sec: f64,
    pub stroke: StrokeClass,
    pub confidence: f64,
    /// Magnitude of the wrist velocity at this frame.
    pub wrist_velocity: f64,
}

/// A run of same-type frames before filtering. Bounds are inclusive frame
/// indices.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RawSegment {
    pub stroke_type: StrokeType,
    pub start_frame: i64,
    pub end_frame: i64,
    /// Highest per-frame confidence inside the run.
    pub confidence: f64,
}

impl RawSegment {
    pub fn len_frames(&self) -> i64 {
        self.end_frame - self.start_frame + 1
    }

    fn contains(&self, frame_idx: i64) -> bool {
        (self.start_frame..=self.end_frame).contains(&frame_idx)
    }
}

/// Coalesce consecutive same-label frames into segments.
///
/// Unknown runs and runs shorter than [`MIN_SEGMENT_FRAMES`] are dropped
/// first; the survivors are then merged with a preceding segment of the same
/// type when the gap between them is at most [`MERGE_GAP_FRAMES`].
pub fn detect_segments(frames: &[ClassifiedFrame]) -> Vec<RawSegment> {
    struct Run {
        label: StrokeClass,
        start: i64,
        end: i64,
        confidence: f64,
    }

    let mut runs: Vec<Run> = Vec::new();
    for frame in frames {
        match runs.last_mut() {
            Some(run) if run.label == frame.stroke => {
                run.end = frame.frame_idx;
                run.confidence = run.confidence.max(frame.confidence);
            }
            _ => runs.push(Run {
                label: frame.stroke,
                start: frame.frame_idx,
                end: frame.frame_idx,
                confidence: frame.confidence,
            }),
        }
    }

    let kept = runs.into_iter().filter_map(|run| {
        let segment = RawSegment {
            stroke_type: run.label.stroke_type()?,
            start_frame: run.start,
            end_frame: run.end,
            confidence: run.confidence,
        };
        (segment.len_frames() >= MIN_SEGMENT_FRAMES).then_some(segment)
    });

    let mut merged: Vec<RawSegment> = Vec::new();
    for run in kept {
        match merged.last_mut() {
            Some(prev)
                if prev.stroke_type == run.stroke_type
                    && run.start_frame - prev.end_frame - 1 <= MERGE_GAP_FRAMES =>
            {
                prev.end_frame = run.end_frame;
                prev.confidence = prev.confidence.max(run.confidence);
            }
            _ => merged.push(run),
        }
    }

    merged
}

/// Maximum wrist velocity inside a segment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PeakVelocity {
    pub frame_idx: i64,
    /// Position of the peak frame in the input slice.
    pub position: usize,
    pub timestamp_sec: f64,
    pub velocity: f64,
}

/// Locate the frame of maximum wrist velocity within the segment's range.
/// The earliest frame wins ties. `None` if no frame falls inside it.
pub fn find_peak_velocity(frames: &[ClassifiedFrame], segment: &RawSegment) -> Option<PeakVelocity> {
    frames
        .iter()
        .enumerate()
        .filter(|(_, f)| segment.contains(f.frame_idx))
        .fold(None, |best: Option<PeakVelocity>, (position, f)| match best {
            Some(b) if b.velocity >= f.wrist_velocity => Some(b),
            _ => Some(PeakVelocity {
                frame_idx: f.frame_idx,
                position,
                timestamp_sec: f.timestamp_sec,
                velocity: f.wrist_velocity,
            }),
        })
}

// ---------------------------------------------------------------------------
// Rally state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RallyPhase {
    #[default]
    PreRally,
    ActiveRally,
}

/// Mutable state of one segmentation pass. Create one per pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RallyState {
    pub serve_used: bool,
    pub phase: RallyPhase,
    /// End frame of the last accepted stroke.
    pub last_stroke_frame: Option<i64>,
    pub last_stroke_type: Option<StrokeType>,
    pub rally_start_frame: Option<i64>,
    pub cooldown_end_frame: Option<i64>,
}

impl RallyState {
    pub fn new() -> Self {
        Self::default()
    }

    fn end_rally(&mut self) {
        self.serve_used = false;
        self.phase = RallyPhase::PreRally;
        self.rally_start_frame = None;
    }

    fn accept(&mut self, segment: &RawSegment, cooldown_frames: i64) {
        if self.phase == RallyPhase::PreRally {
            self.phase = RallyPhase::ActiveRally;
            self.rally_start_frame = Some(segment.start_frame);
        }
        if segment.stroke_type == StrokeType::Serve {
            self.serve_used = true;
        }
        self.last_stroke_frame = Some(segment.end_frame);
        self.last_stroke_type = Some(segment.stroke_type);
        self.cooldown_end_frame = Some(segment.end_frame + cooldown_frames);
    }
}

/// Whether the stretch between the last accepted stroke and `next_start`
/// is long and quiet enough to count as a break between rallies.
fn rally_has_ended(frames: &[ClassifiedFrame], last_end: i64, next_start: i64) -> bool {
    if next_start - last_end <= RALLY_END_GAP_FRAMES {
        return false;
    }

    let (samples, active) = frames
        .iter()
        .filter(|f| f.frame_idx > last_end && f.frame_idx < next_start)
        .fold((0usize, 0usize), |(n, moving), f| {
            (n + 1, moving + usize::from(f.wrist_velocity > RALLY_IDLE_VELOCITY))
        });

    samples == 0 || (active as f64) < RALLY_ACTIVE_SAMPLE_RATIO * samples as f64
}

// ---------------------------------------------------------------------------
// Filtering
// ---------------------------------------------------------------------------

/// Stroke-specific acceptance thresholds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SegmentFilterConfig {
    pub min_confidence: f64,
    pub min_peak_velocity: f64,
    pub min_length_frames: i64,
    pub cooldown_sec: f64,
    pub min_drop_percent: f64,
    /// Soft strokes move below the peak floor and skip peak confirmation.
    pub require_peak_confirmation: bool,
}

impl SegmentFilterConfig {
    pub const fn for_stroke(stroke: StrokeType) -> Self {
        match stroke {
            StrokeType::Serve => Self {
                min_confidence: 0.75,
                min_peak_velocity: PEAK_VELOCITY_FLOOR,
                min_length_frames: 3,
                cooldown_sec: 1.5,
                min_drop_percent: SERVE_MIN_DROP_PERCENT,
                require_peak_confirmation: true,
            },
            StrokeType::Groundstroke => Self {
                min_confidence: 0.70,
                min_peak_velocity: PEAK_VELOCITY_FLOOR,
                min_length_frames: 3,
                cooldown_sec: 0.8,
                min_drop_percent: DEFAULT_MIN_DROP_PERCENT,
                require_peak_confirmation: true,
            },
            StrokeType::Overhead => Self {
                min_confidence: 0.75,
                min_peak_velocity: PEAK_VELOCITY_FLOOR,
                min_length_frames: 3,
                cooldown_sec: 1.0,
                min_drop_percent: DEFAULT_MIN_DROP_PERCENT,
                require_peak_confirmation: true,
            },
            StrokeType::Dink => Self {
                min_confidence: 0.70,
                min_peak_velocity: 0.0,
                min_length_frames: 3,
                cooldown_sec: 0.6,
                min_drop_percent: DEFAULT_MIN_DROP_PERCENT,
                require_peak_confirmation: false,
            },
            StrokeType::Volley => Self {
                min_confidence: 0.70,
                min_peak_velocity: 0.0,
                min_length_frames: 3,
                cooldown_sec: 0.5,
                min_drop_percent: DEFAULT_MIN_DROP_PERCENT,
                require_peak_confirmation: false,
            },
        }
    }

    pub fn cooldown_frames(&self, fps: f64) -> i64 {
        (self.cooldown_sec * fps).round() as i64
    }
}

/// An accepted stroke event.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StrokeSegment {
    pub stroke_type: StrokeType,
    pub start_frame: i64,
    pub end_frame: i64,
    pub start_sec: f64,
    pub end_sec: f64,
    pub peak_frame: i64,
    pub peak_time_sec: f64,
    pub peak_velocity: f64,
    pub confidence: f64,
}

/// Why a raw segment was not accepted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum RejectReason {
    TooShort { length: i64, min: i64 },
    LowConfidence { confidence: f64, min: f64 },
    NoFrames,
    WeakPeak { velocity: f64, min: f64 },
    PeakNotConfirmed { velocity: f64 },
    ServeLocked,
    Cooldown { cooldown_end_frame: i64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RejectedSegment {
    pub segment: RawSegment,
    pub reason: RejectReason,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SegmentationOutcome {
    pub accepted: Vec<StrokeSegment>,
    pub rejected: Vec<RejectedSegment>,
}

fn check_segment(
    frames: &[ClassifiedFrame],
    velocities: &[f64],
    segment: &RawSegment,
    config: &SegmentFilterConfig,
    state: &RallyState,
) -> Result<StrokeSegment, RejectReason> {
    let length = segment.len_frames();
    if length < config.min_length_frames {
        return Err(RejectReason::TooShort {
            length,
            min: config.min_length_frames,
        });
    }
    if segment.confidence < config.min_confidence {
        return Err(RejectReason::LowConfidence {
            confidence: segment.confidence,
            min: config.min_confidence,
        });
    }

    let peak = find_peak_velocity(frames, segment).ok_or(RejectReason::NoFrames)?;
    if peak.velocity < config.min_peak_velocity {
        return Err(RejectReason::WeakPeak {
            velocity: peak.velocity,
            min: config.min_peak_velocity,
        });
    }
    if config.require_peak_confirmation
        && !is_velocity_peak_confirmed(velocities, peak.position, config.min_drop_percent)
    {
        return Err(RejectReason::PeakNotConfirmed {
            velocity: peak.velocity,
        });
    }

    if segment.stroke_type == StrokeType::Serve && state.serve_used {
        return Err(RejectReason::ServeLocked);
    }
    if let Some(cooldown_end_frame) = state.cooldown_end_frame {
        if segment.start_frame <= cooldown_end_frame {
            return Err(RejectReason::Cooldown { cooldown_end_frame });
        }
    }

    let mut in_range = frames.iter().filter(|f| segment.contains(f.frame_idx));
    let first = in_range.next().ok_or(RejectReason::NoFrames)?;
    let last = in_range.last().unwrap_or(first);

    Ok(StrokeSegment {
        stroke_type: segment.stroke_type,
        start_frame: segment.start_frame,
        end_frame: segment.end_frame,
        start_sec: round_to(first.timestamp_sec, 2),
        end_sec: round_to(last.timestamp_sec, 2),
        peak_frame: peak.frame_idx,
        peak_time_sec: round_to(peak.timestamp_sec, 3),
        peak_velocity: round_to(peak.velocity, 4),
        confidence: round_to(segment.confidence, 2),
    })
}

/// Run raw segments (in frame order) through the rally state machine.
///
/// `state` is advanced for every accepted segment; pass a fresh
/// [`RallyState`] per independent pass.
pub fn filter_segments(
    frames: &[ClassifiedFrame],
    segments: &[RawSegment],
    state: &mut RallyState,
    fps: f64,
) -> SegmentationOutcome {
    let velocities: Vec<f64> = frames.iter().map(|f| f.wrist_velocity).collect();
    let mut outcome = SegmentationOutcome::default();

    for segment in segments {
        if let Some(last_end) = state.last_stroke_frame {
            if rally_has_ended(frames, last_end, segment.start_frame) {
                state.end_rally();
            }
        }

        let config = SegmentFilterConfig::for_stroke(segment.stroke_type);
        match check_segment(frames, &velocities, segment, &config, state) {
            Ok(stroke) => {
                state.accept(segment, config.cooldown_frames(fps));
                outcome.accepted.push(stroke);
            }
            Err(reason) => outcome.rejected.push(RejectedSegment {
                segment: *segment,
                reason,
            }),
        }
    }

    outcome
}

/// Segment a classified frame stream end to end.
///
/// With `declared`, only segments of that stroke type are considered.
pub fn detect_strokes(
    frames: &[ClassifiedFrame],
    declared: Option<StrokeType>,
    fps: f64,
) -> SegmentationOutcome {
    let mut segments = detect_segments(frames);
    if let Some(stroke) = declared {
        segments.retain(|s| s.stroke_type == stroke);
    }
    let mut state = RallyState::new();
    filter_segments(frames, &segments, &mut state, fps)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    const FPS: f64 = 30.0;
    const SWING: [f64; 10] = [0.0, 0.005, 0.01, 0.02, 0.03, 0.02, 0.015, 0.01, 0.01, 0.01];

    fn idle_stream(len: usize) -> Vec<ClassifiedFrame> {
        (0..len)
            .map(|i| ClassifiedFrame {
                frame_idx: i as i64,
                timestamp_sec: i as f64 / FPS,
                stroke: StrokeClass::Unknown,
                confidence: 0.40,
                wrist_velocity: 0.0,
            })
            .collect()
    }

    fn paint(frames: &mut [ClassifiedFrame], start: usize, stroke: StrokeClass, confidence: f64, velocities: &[f64]) {
        for (offset, &v) in velocities.iter().enumerate() {
            let f = &mut frames[start + offset];
            f.stroke = stroke;
            f.confidence = confidence;
            f.wrist_velocity = v;
        }
    }

    fn raw(stroke_type: StrokeType, start_frame: i64, end_frame: i64, confidence: f64) -> RawSegment {
        RawSegment {
            stroke_type,
            start_frame,
            end_frame,
            confidence,
        }
    }

    // -- detect_segments ------------------------------------------------------

    #[test]
    fn drops_unknown_and_short_runs() {
        let mut frames = idle_stream(20);
        paint(&mut frames, 2, StrokeClass::Dink, 0.8, &[0.0; 2]);
        paint(&mut frames, 8, StrokeClass::Volley, 0.8, &[0.0; 4]);
        let segments = detect_segments(&frames);
        assert_eq!(segments, vec![raw(StrokeType::Volley, 8, 11, 0.8)]);
    }

    #[test]
    fn merges_same_type_across_small_gap() {
        let mut frames = idle_stream(30);
        paint(&mut frames, 5, StrokeClass::Groundstroke, 0.8, &[0.0; 4]);
        paint(&mut frames, 12, StrokeClass::Groundstroke, 0.9, &[0.0; 4]);
        paint(&mut frames, 20, StrokeClass::Groundstroke, 0.7, &[0.0; 4]);
        let segments = detect_segments(&frames);
        // Frames 9..=11 are a 3-frame gap (merged); 16..=19 are 4 (kept apart).
        assert_eq!(
            segments,
            vec![
                raw(StrokeType::Groundstroke, 5, 15, 0.9),
                raw(StrokeType::Groundstroke, 20, 23, 0.7),
            ]
        );
    }

    #[test]
    fn empty_stream_has_no_segments() {
        assert!(detect_segments(&[]).is_empty());
        assert_eq!(detect_strokes(&[], None, FPS), SegmentationOutcome::default());
    }

    // -- find_peak_velocity ---------------------------------------------------

    #[test]
    fn peak_is_max_inside_segment() {
        let mut frames = idle_stream(20);
        paint(&mut frames, 5, StrokeClass::Serve, 0.9, &SWING);
        frames[2].wrist_velocity = 0.5; // outside the segment
        let peak = find_peak_velocity(&frames, &raw(StrokeType::Serve, 5, 14, 0.9)).unwrap();
        assert_eq!(peak.frame_idx, 9);
        assert_eq!(peak.position, 9);
        assert_eq!(peak.velocity, 0.03);
    }

    // -- detect_strokes -------------------------------------------------------

    #[test]
    fn single_serve_window_yields_one_segment() {
        let mut frames = idle_stream(40);
        paint(&mut frames, 15, StrokeClass::Serve, 0.9, &SWING);

        let outcome = detect_strokes(&frames, None, FPS);
        assert_eq!(outcome.accepted.len(), 1);
        assert!(outcome.rejected.is_empty());

        let s = outcome.accepted[0];
        assert_eq!(s.stroke_type, StrokeType::Serve);
        assert_eq!((s.start_frame, s.end_frame), (15, 24));
        assert_eq!(s.peak_frame, 19);
        assert_eq!(s.start_sec, 0.5);
        assert_eq!(s.peak_time_sec, 0.633);
        assert!((s.confidence - 0.9).abs() < 1e-9);
    }

    #[test]
    fn serve_lock_holds_within_rally_and_resets_after_idle_gap() {
        let mut frames = idle_stream(140);
        paint(&mut frames, 10, StrokeClass::Serve, 0.9, &SWING);
        paint(&mut frames, 40, StrokeClass::Serve, 0.9, &SWING);
        paint(&mut frames, 120, StrokeClass::Serve, 0.9, &SWING);

        let outcome = detect_strokes(&frames, Some(StrokeType::Serve), FPS);
        let starts: Vec<_> = outcome.accepted.iter().map(|s| s.start_frame).collect();
        assert_eq!(starts, vec![10, 120]);
        assert_eq!(outcome.rejected.len(), 1);
        assert_eq!(outcome.rejected[0].segment.start_frame, 40);
        assert_eq!(outcome.rejected[0].reason, RejectReason::ServeLocked);
    }

    #[test]
    fn busy_gap_keeps_rally_alive() {
        let mut frames = idle_stream(140);
        paint(&mut frames, 10, StrokeClass::Serve, 0.9, &SWING);
        paint(&mut frames, 120, StrokeClass::Serve, 0.9, &SWING);
        for f in &mut frames[30..110] {
            f.wrist_velocity = 0.05;
        }

        let outcome = detect_strokes(&frames, None, FPS);
        assert_eq!(outcome.accepted.len(), 1);
        assert_eq!(outcome.rejected[0].reason, RejectReason::ServeLocked);
    }

    #[test]
    fn declared_stroke_filters_other_types() {
        let mut frames = idle_stream(60);
        paint(&mut frames, 5, StrokeClass::Dink, 0.9, &[0.005; 5]);
        paint(&mut frames, 30, StrokeClass::Serve, 0.9, &SWING);

        let all = detect_strokes(&frames, None, FPS);
        assert_eq!(all.accepted.len(), 2);

        let serves = detect_strokes(&frames, Some(StrokeType::Serve), FPS);
        assert_eq!(serves.accepted.len(), 1);
        assert_eq!(serves.accepted[0].stroke_type, StrokeType::Serve);
    }

    // -- filter_segments ------------------------------------------------------

    #[test]
    fn cooldown_rejects_duplicate_hit() {
        let mut frames = idle_stream(60);
        paint(&mut frames, 10, StrokeClass::Groundstroke, 0.9, &SWING);
        paint(&mut frames, 30, StrokeClass::Groundstroke, 0.9, &SWING);
        let segments = [
            raw(StrokeType::Groundstroke, 10, 19, 0.9),
            raw(StrokeType::Groundstroke, 30, 39, 0.9),
        ];

        let mut state = RallyState::new();
        let outcome = filter_segments(&frames, &segments, &mut state, FPS);
        assert_eq!(outcome.accepted.len(), 1);
        // 0.8 s at 30 fps after frame 19.
        assert_matches!(
            outcome.rejected[0].reason,
            RejectReason::Cooldown { cooldown_end_frame: 43 }
        );
        assert_eq!(state.phase, RallyPhase::ActiveRally);
        assert_eq!(state.rally_start_frame, Some(10));
        assert_eq!(state.last_stroke_type, Some(StrokeType::Groundstroke));
    }

    #[test]
    fn low_confidence_and_short_segments_are_rejected() {
        let mut frames = idle_stream(40);
        paint(&mut frames, 5, StrokeClass::Serve, 0.6, &SWING);
        let segments = [raw(StrokeType::Serve, 5, 14, 0.6), raw(StrokeType::Volley, 20, 21, 0.9)];

        let outcome = filter_segments(&frames, &segments, &mut RallyState::new(), FPS);
        assert!(outcome.accepted.is_empty());
        assert_matches!(outcome.rejected[0].reason, RejectReason::LowConfidence { .. });
        assert_matches!(outcome.rejected[1].reason, RejectReason::TooShort { length: 2, min: 3 });
    }

    #[test]
    fn drift_without_peak_is_not_a_power_stroke() {
        let mut frames = idle_stream(30);
        paint(&mut frames, 5, StrokeClass::Groundstroke, 0.9, &[0.03; 10]);
        let outcome = detect_strokes(&frames, None, FPS);
        assert!(outcome.accepted.is_empty());
        assert_matches!(outcome.rejected[0].reason, RejectReason::PeakNotConfirmed { .. });
    }

    #[test]
    fn soft_strokes_skip_peak_confirmation() {
        let mut frames = idle_stream(30);
        paint(&mut frames, 5, StrokeClass::Volley, 0.8, &[0.004; 6]);
        let outcome = detect_strokes(&frames, None, FPS);
        assert_eq!(outcome.accepted.len(), 1);
        assert_eq!(outcome.accepted[0].stroke_type, StrokeType::Volley);
    }
}
