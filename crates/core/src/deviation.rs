//! Deviation scoring against per-stroke optimal ranges.
//!
//! Four session-level parameters are compared with a fixed optimal
//! `[min, max]` for the stroke being coached. Inside the range scores 100;
//! outside it the score decays linearly to 0 over a parameter-specific
//! distance. The overall score is the impact-weighted mean of the parameters
//! that could be measured.

use serde::Serialize;

use crate::geometry::round1;
use crate::metrics::FrameMetrics;
use crate::stroke::StrokeType;

/// Parameters scoring at or above this are on target.
pub const OPTIMAL_SCORE: f64 = 80.0;
/// Parameters scoring at or above this (and below optimal) need attention.
pub const WARNING_SCORE: f64 = 50.0;

/// Maximum number of deviations singled out for coaching.
pub const MAX_TOP_DEVIATIONS: usize = 3;

// ---------------------------------------------------------------------------
// Parameters
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviationParameterKey {
    HipRotation,
    ShoulderAbduction,
    ElbowFlexion,
    KneeFlexion,
}

/// How per-frame values reduce to one session value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aggregate {
    Mean,
    Max,
}

impl DeviationParameterKey {
    pub const ALL: [DeviationParameterKey; 4] = [
        DeviationParameterKey::HipRotation,
        DeviationParameterKey::ShoulderAbduction,
        DeviationParameterKey::ElbowFlexion,
        DeviationParameterKey::KneeFlexion,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            DeviationParameterKey::HipRotation => "Hip Rotation",
            DeviationParameterKey::ShoulderAbduction => "Shoulder Abduction (peak)",
            DeviationParameterKey::ElbowFlexion => "Elbow Flexion",
            DeviationParameterKey::KneeFlexion => "Knee Flexion",
        }
    }

    pub const fn impact_weight(self) -> f64 {
        match self {
            DeviationParameterKey::HipRotation => 1.5,
            DeviationParameterKey::ShoulderAbduction => 1.4,
            DeviationParameterKey::ElbowFlexion => 1.2,
            DeviationParameterKey::KneeFlexion => 1.1,
        }
    }

    /// Distance outside the range (degrees) at which the score reaches 0.
    pub const fn max_deviation(self) -> f64 {
        match self {
            DeviationParameterKey::HipRotation => 40.0,
            DeviationParameterKey::ShoulderAbduction => 50.0,
            DeviationParameterKey::ElbowFlexion => 40.0,
            DeviationParameterKey::KneeFlexion => 35.0,
        }
    }

    pub const fn aggregate(self) -> Aggregate {
        match self {
            DeviationParameterKey::ShoulderAbduction => Aggregate::Max,
            _ => Aggregate::Mean,
        }
    }

    fn value(self, metrics: &FrameMetrics) -> Option<f64> {
        match self {
            DeviationParameterKey::HipRotation => metrics.hip_rotation_deg,
            DeviationParameterKey::ShoulderAbduction => metrics.right_shoulder_abduction,
            DeviationParameterKey::ElbowFlexion => metrics.right_elbow_flexion,
            DeviationParameterKey::KneeFlexion => metrics.right_knee_flexion,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct OptimalRange {
    pub min: f64,
    pub max: f64,
}

const fn range(min: f64, max: f64) -> OptimalRange {
    OptimalRange { min, max }
}

/// Optimal range of `key` for `stroke`.
pub const fn optimal_range(stroke: StrokeType, key: DeviationParameterKey) -> OptimalRange {
    use DeviationParameterKey::*;
    match (stroke, key) {
        (StrokeType::Serve, ElbowFlexion) => range(90.0, 120.0),
        (StrokeType::Serve, HipRotation) => range(10.0, 20.0),
        (StrokeType::Serve, ShoulderAbduction) => range(30.0, 90.0),
        (StrokeType::Serve, KneeFlexion) => range(145.0, 170.0),

        (StrokeType::Groundstroke, ElbowFlexion) => range(120.0, 160.0),
        (StrokeType::Groundstroke, HipRotation) => range(45.0, 90.0),
        (StrokeType::Groundstroke, ShoulderAbduction) => range(45.0, 110.0),
        (StrokeType::Groundstroke, KneeFlexion) => range(135.0, 165.0),

        (StrokeType::Dink, ElbowFlexion) => range(90.0, 110.0),
        (StrokeType::Dink, HipRotation) => range(0.0, 15.0),
        (StrokeType::Dink, ShoulderAbduction) => range(20.0, 55.0),
        (StrokeType::Dink, KneeFlexion) => range(125.0, 155.0),

        (StrokeType::Volley, ElbowFlexion) => range(90.0, 120.0),
        (StrokeType::Volley, HipRotation) => range(10.0, 30.0),
        (StrokeType::Volley, ShoulderAbduction) => range(30.0, 85.0),
        (StrokeType::Volley, KneeFlexion) => range(130.0, 160.0),

        (StrokeType::Overhead, ElbowFlexion) => range(90.0, 170.0),
        (StrokeType::Overhead, HipRotation) => range(60.0, 90.0),
        (StrokeType::Overhead, ShoulderAbduction) => range(120.0, 160.0),
        (StrokeType::Overhead, KneeFlexion) => range(140.0, 170.0),
    }
}

// ---------------------------------------------------------------------------
// Scoring
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviationStatus {
    Optimal,
    Warning,
    Critical,
}

/// Signed distance from the nearest bound: negative below the range,
/// positive above it, zero inside.
pub fn signed_deviation(value: f64, range: OptimalRange) -> f64 {
    if value < range.min {
        value - range.min
    } else if value > range.max {
        value - range.max
    } else {
        0.0
    }
}

/// 100 inside `range`, decaying linearly to 0 at `max_deviation` degrees
/// outside it. Never negative.
pub fn calculate_deviation_score(value: f64, range: OptimalRange, max_deviation: f64) -> f64 {
    let distance = signed_deviation(value, range).abs();
    if distance == 0.0 {
        return 100.0;
    }
    if max_deviation <= 0.0 {
        return 0.0;
    }
    round1((100.0 * (1.0 - distance / max_deviation)).max(0.0))
}

pub fn deviation_status(score: f64) -> DeviationStatus {
    if score >= OPTIMAL_SCORE {
        DeviationStatus::Optimal
    } else if score >= WARNING_SCORE {
        DeviationStatus::Warning
    } else {
        DeviationStatus::Critical
    }
}

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviationParameter {
    pub key: DeviationParameterKey,
    pub label: &'static str,
    /// `None` when no frame carried this measurement.
    pub user_value: Option<f64>,
    pub optimal_range: OptimalRange,
    pub score: f64,
    pub deviation: f64,
    pub status: DeviationStatus,
    pub impact_weight: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TopDeviation {
    pub key: DeviationParameterKey,
    pub label: &'static str,
    pub user_value: f64,
    pub optimal_range: OptimalRange,
    pub deviation: f64,
    pub score: f64,
    pub status: DeviationStatus,
    pub recommendation: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviationReport {
    pub stroke_type: StrokeType,
    pub overall_score: f64,
    pub parameters: Vec<DeviationParameter>,
    pub top_deviations: Vec<TopDeviation>,
    pub summary: String,
}

#[derive(Debug, Default, Clone, Copy)]
struct Accumulator {
    sum: f64,
    count: usize,
    max: Option<f64>,
}

impl Accumulator {
    fn push(&mut self, value: f64) {
        self.sum += value;
        self.count += 1;
        self.max = Some(self.max.map_or(value, |m| m.max(value)));
    }

    fn finish(&self, aggregate: Aggregate) -> Option<f64> {
        if self.count == 0 {
            return None;
        }
        let value = match aggregate {
            Aggregate::Mean => self.sum / self.count as f64,
            Aggregate::Max => self.max?,
        };
        Some(round1(value))
    }
}

fn score_parameter(key: DeviationParameterKey, user_value: Option<f64>, stroke: StrokeType) -> DeviationParameter {
    let optimal_range = optimal_range(stroke, key);
    let (score, deviation, status) = match user_value {
        Some(v) => {
            let score = calculate_deviation_score(v, optimal_range, key.max_deviation());
            (score, round1(signed_deviation(v, optimal_range)), deviation_status(score))
        }
        None => (0.0, 0.0, DeviationStatus::Critical),
    };

    DeviationParameter {
        key,
        label: key.label(),
        user_value,
        optimal_range,
        score,
        deviation,
        status,
        impact_weight: key.impact_weight(),
    }
}

fn recommendation(key: DeviationParameterKey, deviation: f64, value: f64, range: OptimalRange) -> String {
    let too_high = deviation > 0.0;
    let action = match (key, too_high) {
        (DeviationParameterKey::HipRotation, false) => {
            "Increase hip rotation to drive power from the legs and core"
        }
        (DeviationParameterKey::HipRotation, true) => {
            "Reduce hip rotation to keep the stroke compact and controlled"
        }
        (DeviationParameterKey::ShoulderAbduction, false) => {
            "Raise the hitting arm higher through contact"
        }
        (DeviationParameterKey::ShoulderAbduction, true) => {
            "Lower the hitting arm and keep the elbow below shoulder height"
        }
        (DeviationParameterKey::ElbowFlexion, false) => "Extend the elbow more through contact",
        (DeviationParameterKey::ElbowFlexion, true) => {
            "Keep a slight bend in the elbow instead of locking it out"
        }
        (DeviationParameterKey::KneeFlexion, false) => {
            "Straighten up slightly, the knees are bending too deeply"
        }
        (DeviationParameterKey::KneeFlexion, true) => {
            "Bend the knees more to lower your center of gravity"
        }
    };
    format!(
        "{action} (yours: {value:.0}°, target: {:.0}-{:.0}°).",
        range.min, range.max
    )
}

pub fn summary_text(overall_score: f64) -> &'static str {
    if overall_score >= 90.0 {
        "Excellent technique. Your mechanics closely match the optimal ranges for this stroke."
    } else if overall_score >= 75.0 {
        "Good technique with a few areas to refine."
    } else if overall_score >= 50.0 {
        "Fair technique. Several parameters fall outside the optimal ranges."
    } else {
        "Significant deviations from optimal technique. Focus on the top recommendations first."
    }
}

/// Score a session's metrics against the optimal ranges for `stroke`.
pub fn compute_deviation_report<'a, I>(metrics: I, stroke: StrokeType) -> DeviationReport
where
    I: IntoIterator<Item = &'a FrameMetrics>,
{
    let mut acc = [Accumulator::default(); 4];
    for m in metrics {
        for (slot, key) in acc.iter_mut().zip(DeviationParameterKey::ALL) {
            if let Some(v) = key.value(m) {
                slot.push(v);
            }
        }
    }

    let parameters: Vec<DeviationParameter> = DeviationParameterKey::ALL
        .into_iter()
        .zip(acc)
        .map(|(key, a)| score_parameter(key, a.finish(key.aggregate()), stroke))
        .collect();

    let (weighted, total_weight) = parameters
        .iter()
        .filter(|p| p.user_value.is_some())
        .fold((0.0, 0.0), |(sum, w), p| {
            (sum + p.score * p.impact_weight, w + p.impact_weight)
        });
    let overall_score = if total_weight > 0.0 {
        round1(weighted / total_weight)
    } else {
        0.0
    };

    let mut flagged: Vec<&DeviationParameter> = parameters
        .iter()
        .filter(|p| p.status != DeviationStatus::Optimal && p.user_value.is_some())
        .collect();
    flagged.sort_by(|a, b| {
        b.impact_weight
            .total_cmp(&a.impact_weight)
            .then(a.score.total_cmp(&b.score))
    });

    let top_deviations = flagged
        .into_iter()
        .take(MAX_TOP_DEVIATIONS)
        .filter_map(|p| {
            let user_value = p.user_value?;
            Some(TopDeviation {
                key: p.key,
                label: p.label,
                user_value,
                optimal_range: p.optimal_range,
                deviation: p.deviation,
                score: p.score,
                status: p.status,
                recommendation: recommendation(p.key, p.deviation, user_value, p.optimal_range),
            })
        })
        .collect();

    DeviationReport {
        stroke_type: stroke,
        overall_score,
        parameters,
        top_deviations,
        summary: summary_text(overall_score).to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(hip: f64, shoulder: f64, elbow: f64, knee: f64) -> FrameMetrics {
        FrameMetrics {
            hip_rotation_deg: Some(hip),
            right_shoulder_abduction: Some(shoulder),
            right_elbow_flexion: Some(elbow),
            right_knee_flexion: Some(knee),
            ..FrameMetrics::default()
        }
    }

    fn param(report: &DeviationReport, key: DeviationParameterKey) -> &DeviationParameter {
        report.parameters.iter().find(|p| p.key == key).unwrap()
    }

    // -- calculate_deviation_score --------------------------------------------

    #[test]
    fn bounds_score_exactly_100() {
        let r = range(10.0, 20.0);
        assert_eq!(calculate_deviation_score(10.0, r, 40.0), 100.0);
        assert_eq!(calculate_deviation_score(20.0, r, 40.0), 100.0);
        assert_eq!(calculate_deviation_score(15.0, r, 40.0), 100.0);
    }

    #[test]
    fn decays_linearly_and_clamps_at_zero() {
        let r = range(10.0, 20.0);
        assert_eq!(calculate_deviation_score(40.0, r, 40.0), 50.0);
        assert_eq!(calculate_deviation_score(0.0, r, 40.0), 75.0);
        assert_eq!(calculate_deviation_score(60.0, r, 40.0), 0.0);
        assert_eq!(calculate_deviation_score(500.0, r, 40.0), 0.0);
    }

    #[test]
    fn status_bands() {
        assert_eq!(deviation_status(80.0), DeviationStatus::Optimal);
        assert_eq!(deviation_status(79.9), DeviationStatus::Warning);
        assert_eq!(deviation_status(50.0), DeviationStatus::Warning);
        assert_eq!(deviation_status(49.9), DeviationStatus::Critical);
    }

    // -- compute_deviation_report ---------------------------------------------

    #[test]
    fn all_null_session_scores_zero() {
        let frames = vec![FrameMetrics::default(); 5];
        let report = compute_deviation_report(&frames, StrokeType::Serve);
        assert_eq!(report.overall_score, 0.0);
        assert_eq!(report.parameters.len(), 4);
        for p in &report.parameters {
            assert_eq!(p.user_value, None);
            assert_eq!(p.score, 0.0);
            assert_eq!(p.status, DeviationStatus::Critical);
        }
        assert!(report.top_deviations.is_empty());
        assert_eq!(report.summary, summary_text(0.0));
    }

    #[test]
    fn textbook_groundstroke_scores_100() {
        let frames = vec![frame(60.0, 80.0, 140.0, 150.0); 10];
        let report = compute_deviation_report(&frames, StrokeType::Groundstroke);
        assert_eq!(report.overall_score, 100.0);
        assert!(report.top_deviations.is_empty());
        assert!(report.summary.starts_with("Excellent"));
    }

    #[test]
    fn shoulder_uses_peak_others_use_mean() {
        let frames = [frame(12.0, 80.0, 100.0, 150.0), frame(18.0, 120.0, 110.0, 160.0)];
        let report = compute_deviation_report(&frames, StrokeType::Serve);

        assert_eq!(param(&report, DeviationParameterKey::HipRotation).user_value, Some(15.0));
        assert_eq!(param(&report, DeviationParameterKey::ElbowFlexion).user_value, Some(105.0));

        let shoulder = param(&report, DeviationParameterKey::ShoulderAbduction);
        assert_eq!(shoulder.user_value, Some(120.0));
        assert_eq!(shoulder.deviation, 30.0);
        assert_eq!(shoulder.score, 40.0);
        assert_eq!(shoulder.status, DeviationStatus::Critical);

        // (1.5*100 + 1.4*40 + 1.2*100 + 1.1*100) / 5.2
        assert_eq!(report.overall_score, 83.8);
        assert_eq!(report.top_deviations.len(), 1);
        assert!(report.top_deviations[0].recommendation.starts_with("Lower the hitting arm"));
    }

    #[test]
    fn top_deviations_ordered_by_weight_then_score() {
        // Serve: hip 10-20, shoulder 30-90, elbow 90-120, knee 145-170.
        let frames = [frame(35.0, 120.0, 60.0, 120.0)];
        let report = compute_deviation_report(&frames, StrokeType::Serve);
        let keys: Vec<_> = report.top_deviations.iter().map(|d| d.key).collect();
        assert_eq!(
            keys,
            vec![
                DeviationParameterKey::HipRotation,
                DeviationParameterKey::ShoulderAbduction,
                DeviationParameterKey::ElbowFlexion,
            ]
        );
        let hip = &report.top_deviations[0];
        assert_eq!(hip.deviation, 15.0);
        assert!(hip.recommendation.starts_with("Reduce hip rotation"));
        let elbow = &report.top_deviations[2];
        assert_eq!(elbow.deviation, -30.0);
        assert!(elbow.recommendation.starts_with("Extend the elbow"));
    }

    #[test]
    fn missing_parameter_is_excluded_from_overall() {
        let frames = [FrameMetrics {
            hip_rotation_deg: Some(15.0),
            ..FrameMetrics::default()
        }];
        let report = compute_deviation_report(&frames, StrokeType::Serve);
        assert_eq!(report.overall_score, 100.0);
        let knee = param(&report, DeviationParameterKey::KneeFlexion);
        assert_eq!(knee.status, DeviationStatus::Critical);
        assert!(report.top_deviations.is_empty());
    }

    #[test]
    fn report_serializes_camel_case() {
        let report = compute_deviation_report(&[frame(15.0, 60.0, 100.0, 150.0)], StrokeType::Serve);
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["strokeType"], "serve");
        assert_eq!(json["overallScore"], 100.0);
        assert_eq!(json["parameters"][0]["key"], "hip_rotation");
        assert_eq!(json["parameters"][0]["optimalRange"]["min"], 10.0);
    }
}
