//! Injury-risk rules, sustained-risk filtering and session aggregation.
//!
//! Per-frame evaluation is stateless and compares joint angles with fixed
//! thresholds. Session-level conclusions only count risks that persisted
//! across a minimum run of consecutive frames, so single-frame tracking
//! noise does not inflate the percentages.

use serde::{Deserialize, Serialize};

use crate::geometry::round1;
use crate::metrics::{AnalyzedFrame, FrameMetrics};
use crate::stroke::{StrokeSelector, StrokeType};

// ---------------------------------------------------------------------------
// Thresholds
// ---------------------------------------------------------------------------

pub const SHOULDER_ABDUCTION_MEDIUM: f64 = 90.0;
pub const SHOULDER_ABDUCTION_HIGH: f64 = 140.0;

pub const ELBOW_HYPEREXTENSION_MEDIUM: f64 = 170.0;
/// `acos` tops out at 180, so "high" means fully locked.
pub const ELBOW_HYPEREXTENSION_HIGH: f64 = 180.0;

pub const KNEE_FLEXION_MEDIUM: f64 = 120.0;
pub const KNEE_FLEXION_HIGH: f64 = 90.0;
pub const KNEE_LOCKED: f64 = 175.0;

pub const SPINAL_FLEXION_MEDIUM: f64 = 30.0;
pub const SPINAL_FLEXION_HIGH: f64 = 45.0;

/// Hip rotation below this on a power stroke is an arm-only swing.
pub const HIP_ROTATION_MIN_POWER: f64 = 30.0;

/// Default minimum run (frames) for a risk to count as sustained,
/// about 0.1s at 30 fps.
pub const DEFAULT_MIN_SUSTAINED_FRAMES: usize = 3;

// Session-level percentage thresholds.
const SESSION_SHOULDER_HIGH_PCT: f64 = 8.0;
const SESSION_SPINE_HIGH_PCT: f64 = 15.0;
const SESSION_CHAIN_HIGH_PCT: f64 = 25.0;
const SESSION_KNEE_WITH_CHAIN_HIGH_PCT: f64 = 20.0;
const SESSION_SHOULDER_MEDIUM_PCT: f64 = 3.0;
const SESSION_CHAIN_MEDIUM_PCT: f64 = 10.0;
const SESSION_KNEE_MEDIUM_PCT: f64 = 8.0;
const SESSION_SPINE_MEDIUM_PCT: f64 = 5.0;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Severity of a risk, ordered so that `max` gives the worst.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskSeverity {
    #[default]
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskType {
    ShoulderOveruse,
    ElbowHyperextension,
    KneeStress,
    SpinalFlexion,
    PoorKineticChain,
}

impl RiskType {
    pub const ALL: [RiskType; 5] = [
        RiskType::ShoulderOveruse,
        RiskType::ElbowHyperextension,
        RiskType::KneeStress,
        RiskType::SpinalFlexion,
        RiskType::PoorKineticChain,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            RiskType::ShoulderOveruse => "shoulder_overuse",
            RiskType::ElbowHyperextension => "elbow_hyperextension",
            RiskType::KneeStress => "knee_stress",
            RiskType::SpinalFlexion => "spinal_flexion",
            RiskType::PoorKineticChain => "poor_kinetic_chain",
        }
    }

    pub const fn recommendation(self) -> &'static str {
        match self {
            RiskType::ShoulderOveruse => {
                "Reduce shoulder abduction below 140°. Generate power from hip rotation instead of the arm."
            }
            RiskType::ElbowHyperextension => {
                "Keep a slight bend in the elbow at contact. Avoid snapping the arm straight."
            }
            RiskType::KneeStress => {
                "Maintain an athletic stance with soft knees. Avoid deep squats and locked legs."
            }
            RiskType::SpinalFlexion => {
                "Bend at the knees and hips rather than the lower back. Keep the chest up."
            }
            RiskType::PoorKineticChain => {
                "Engage hips and core for power. Rotate through the stroke to reduce arm strain."
            }
        }
    }
}

/// One risk detected on one frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InjuryRisk {
    #[serde(rename = "type")]
    pub risk_type: RiskType,
    pub severity: RiskSeverity,
    pub angle: f64,
    pub message: String,
    pub recommendation: String,
}

impl InjuryRisk {
    fn new(risk_type: RiskType, severity: RiskSeverity, angle: f64, message: String) -> Self {
        Self {
            risk_type,
            severity,
            angle,
            message,
            recommendation: risk_type.recommendation().to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Per-frame rules
// ---------------------------------------------------------------------------

fn shoulder_risk(angle: f64) -> Option<InjuryRisk> {
    let severity = if angle > SHOULDER_ABDUCTION_HIGH {
        RiskSeverity::High
    } else if angle > SHOULDER_ABDUCTION_MEDIUM {
        RiskSeverity::Medium
    } else {
        return None;
    };
    Some(InjuryRisk::new(
        RiskType::ShoulderOveruse,
        severity,
        angle,
        format!("Shoulder abduction {angle:.1}° exceeds safe range"),
    ))
}

fn elbow_risk(angle: f64) -> Option<InjuryRisk> {
    let severity = if angle >= ELBOW_HYPEREXTENSION_HIGH {
        RiskSeverity::High
    } else if angle > ELBOW_HYPEREXTENSION_MEDIUM {
        RiskSeverity::Medium
    } else {
        return None;
    };
    Some(InjuryRisk::new(
        RiskType::ElbowHyperextension,
        severity,
        angle,
        format!("Elbow extension {angle:.1}° risks hyperextension"),
    ))
}

fn knee_risk(angle: f64) -> Option<InjuryRisk> {
    let (severity, message) = if angle > KNEE_LOCKED {
        (
            RiskSeverity::High,
            format!("Locked knee ({angle:.1}°) transfers impact to the joint"),
        )
    } else if angle < KNEE_FLEXION_HIGH {
        (
            RiskSeverity::High,
            format!("Deep knee flexion ({angle:.1}°) puts the patellar tendon under stress"),
        )
    } else if angle < KNEE_FLEXION_MEDIUM {
        (
            RiskSeverity::Medium,
            format!("Deep knee flexion ({angle:.1}°) detected"),
        )
    } else {
        return None;
    };
    Some(InjuryRisk::new(RiskType::KneeStress, severity, angle, message))
}

fn spine_risk(angle: f64) -> Option<InjuryRisk> {
    let severity = if angle > SPINAL_FLEXION_HIGH {
        RiskSeverity::High
    } else if angle > SPINAL_FLEXION_MEDIUM {
        RiskSeverity::Medium
    } else {
        return None;
    };
    Some(InjuryRisk::new(
        RiskType::SpinalFlexion,
        severity,
        angle,
        format!("Trunk flexion {angle:.1}° loads the lower back"),
    ))
}

fn kinetic_chain_risk(angle: f64) -> Option<InjuryRisk> {
    (angle < HIP_ROTATION_MIN_POWER).then(|| {
        InjuryRisk::new(
            RiskType::PoorKineticChain,
            RiskSeverity::Medium,
            angle,
            format!("Insufficient hip rotation ({angle:.1}°)"),
        )
    })
}

/// Evaluate every rule against one frame.
///
/// Shoulder abduction is exempt on overhead sessions, where a raised arm is
/// expected. Hip rotation is only judged on power-stroke sessions.
pub fn detect_frame_risks(metrics: &FrameMetrics, selector: StrokeSelector) -> Vec<InjuryRisk> {
    let mut risks = Vec::new();

    if !selector.is(StrokeType::Overhead) {
        risks.extend(metrics.right_shoulder_abduction.and_then(shoulder_risk));
    }
    risks.extend(metrics.right_elbow_flexion.and_then(elbow_risk));
    risks.extend(metrics.right_knee_flexion.and_then(knee_risk));
    risks.extend(metrics.spine_flexion.and_then(spine_risk));
    if selector.hint().is_some_and(StrokeType::is_power_stroke) {
        risks.extend(metrics.hip_rotation_deg.and_then(kinetic_chain_risk));
    }

    risks
}

/// Worst severity among `risks`, or `Low` if there are none.
pub fn overall_risk_level(risks: &[InjuryRisk]) -> RiskSeverity {
    risks
        .iter()
        .map(|r| r.severity)
        .max()
        .unwrap_or(RiskSeverity::Low)
}

// ---------------------------------------------------------------------------
// Sustained-risk filter
// ---------------------------------------------------------------------------

/// Remove risks that do not persist for at least `min_frames` consecutive
/// frames. Each risk type is filtered independently.
///
/// Only `injury_risks` is touched. Re-running on already-filtered frames is
/// a no-op. Returns how many risk entries were removed.
pub fn filter_sustained_risks(frames: &mut [AnalyzedFrame], min_frames: usize) -> usize {
    let mut removed = 0;

    for risk_type in RiskType::ALL {
        let mut i = 0;
        while i < frames.len() {
            if !frames[i].has_risk(risk_type) {
                i += 1;
                continue;
            }
            let start = i;
            while i < frames.len() && frames[i].has_risk(risk_type) {
                i += 1;
            }
            if i - start < min_frames {
                for frame in &mut frames[start..i] {
                    let before = frame.injury_risks.len();
                    frame.injury_risks.retain(|r| r.risk_type != risk_type);
                    removed += before - frame.injury_risks.len();
                }
            }
        }
    }

    removed
}

// ---------------------------------------------------------------------------
// Session aggregation
// ---------------------------------------------------------------------------

/// Share of frames (percent, one decimal) carrying each risk type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RiskPercentages {
    pub shoulder_overuse: f64,
    pub elbow_hyperextension: f64,
    pub knee_stress: f64,
    pub spinal_flexion: f64,
    pub poor_kinetic_chain: f64,
}

impl RiskPercentages {
    pub fn get(&self, risk_type: RiskType) -> f64 {
        match risk_type {
            RiskType::ShoulderOveruse => self.shoulder_overuse,
            RiskType::ElbowHyperextension => self.elbow_hyperextension,
            RiskType::KneeStress => self.knee_stress,
            RiskType::SpinalFlexion => self.spinal_flexion,
            RiskType::PoorKineticChain => self.poor_kinetic_chain,
        }
    }

    fn set(&mut self, risk_type: RiskType, value: f64) {
        match risk_type {
            RiskType::ShoulderOveruse => self.shoulder_overuse = value,
            RiskType::ElbowHyperextension => self.elbow_hyperextension = value,
            RiskType::KneeStress => self.knee_stress = value,
            RiskType::SpinalFlexion => self.spinal_flexion = value,
            RiskType::PoorKineticChain => self.poor_kinetic_chain = value,
        }
    }
}

/// Percentage of all frames with at least one occurrence of each risk type.
///
/// Run [`filter_sustained_risks`] first. An empty session yields all zeros.
pub fn risk_percentages(frames: &[AnalyzedFrame]) -> RiskPercentages {
    let mut pct = RiskPercentages::default();
    if frames.is_empty() {
        return pct;
    }
    let total = frames.len() as f64;
    for risk_type in RiskType::ALL {
        let hits = frames.iter().filter(|f| f.has_risk(risk_type)).count() as f64;
        pct.set(risk_type, round1(hits / total * 100.0));
    }
    pct
}

/// Overall session risk from the sustained-risk percentages.
pub fn session_risk_level(pct: &RiskPercentages) -> RiskSeverity {
    let shoulder = pct.shoulder_overuse;
    let spine = pct.spinal_flexion;
    let chain = pct.poor_kinetic_chain;
    let knee = pct.knee_stress;

    if shoulder > SESSION_SHOULDER_HIGH_PCT
        || spine > SESSION_SPINE_HIGH_PCT
        || (chain > SESSION_CHAIN_HIGH_PCT && knee > SESSION_KNEE_WITH_CHAIN_HIGH_PCT)
    {
        RiskSeverity::High
    } else if shoulder > SESSION_SHOULDER_MEDIUM_PCT
        || chain > SESSION_CHAIN_MEDIUM_PCT
        || knee > SESSION_KNEE_MEDIUM_PCT
        || spine > SESSION_SPINE_MEDIUM_PCT
    {
        RiskSeverity::Medium
    } else {
        RiskSeverity::Low
    }
}

// ---------------------------------------------------------------------------
// Alerts and recommendations
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationPriority {
    Info,
    Low,
    Medium,
    High,
}

/// A session-level warning for a risk type over its alert threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAlert {
    #[serde(rename = "type")]
    pub alert_type: String,
    pub severity: RiskSeverity,
    pub percentage: f64,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub priority: RecommendationPriority,
    pub category: String,
    pub title: String,
    pub description: String,
    pub actions: Vec<String>,
}

struct RecommendationRule {
    priority: RecommendationPriority,
    category: &'static str,
    title: &'static str,
    description: &'static str,
    actions: &'static [&'static str],
}

impl RecommendationRule {
    fn build(&self) -> Recommendation {
        Recommendation {
            priority: self.priority,
            category: self.category.to_string(),
            title: self.title.to_string(),
            description: self.description.to_string(),
            actions: self.actions.iter().map(|a| a.to_string()).collect(),
        }
    }
}

struct AlertRule {
    risk_type: RiskType,
    /// Percentage of frames that must be exceeded.
    threshold_pct: f64,
    /// `None` for rules that only produce a recommendation.
    alert: Option<(&'static str, RiskSeverity, &'static str)>,
    recommendation: RecommendationRule,
}

/// Alert rules in output order. `{pct}` in the message is replaced with the
/// percentage.
const ALERT_RULES: [AlertRule; 4] = [
    AlertRule {
        risk_type: RiskType::ShoulderOveruse,
        threshold_pct: 10.0,
        alert: Some((
            "shoulder_overuse",
            RiskSeverity::High,
            "{pct}% of frames show high shoulder risk",
        )),
        recommendation: RecommendationRule {
            priority: RecommendationPriority::High,
            category: "Injury Prevention",
            title: "Reduce Shoulder Strain",
            description: "Excessive shoulder abduction detected. Focus on proper technique.",
            actions: &[
                "Practice shoulder rotation drills",
                "Reduce overhead smash frequency",
                "Strengthen rotator cuff muscles",
                "Consider professional coaching for form correction",
            ],
        },
    },
    AlertRule {
        risk_type: RiskType::PoorKineticChain,
        threshold_pct: 20.0,
        alert: Some((
            "technique",
            RiskSeverity::Medium,
            "Insufficient hip rotation in {pct}% of strokes",
        )),
        recommendation: RecommendationRule {
            priority: RecommendationPriority::Medium,
            category: "Technique",
            title: "Improve Power Generation",
            description: "Using arm-only swings increases injury risk and reduces power.",
            actions: &[
                "Practice weight transfer drills",
                "Focus on hip rotation before arm swing",
                "Strengthen core muscles",
                "Watch tutorial videos on kinetic chain",
            ],
        },
    },
    AlertRule {
        risk_type: RiskType::KneeStress,
        threshold_pct: 15.0,
        alert: Some((
            "knee_stress",
            RiskSeverity::Medium,
            "Excessive knee flexion in {pct}% of frames",
        )),
        recommendation: RecommendationRule {
            priority: RecommendationPriority::Medium,
            category: "Form",
            title: "Protect Your Knees",
            description: "Deep squatting increases patellar tendinitis risk.",
            actions: &[
                "Maintain athletic stance (knees bent 20-45°)",
                "Avoid excessive squatting during dinks",
                "Strengthen quadriceps and hamstrings",
                "Consider knee support if pain persists",
            ],
        },
    },
    AlertRule {
        risk_type: RiskType::ElbowHyperextension,
        threshold_pct: 15.0,
        alert: None,
        recommendation: RecommendationRule {
            priority: RecommendationPriority::Low,
            category: "Technique",
            title: "Elbow Positioning",
            description: "Elbow angles outside optimal range detected.",
            actions: &[
                "Focus on proper elbow extension for each stroke",
                "Avoid tight grip (causes elbow strain)",
                "Practice with lighter paddle if experiencing pain",
            ],
        },
    },
];

const LOW_RISK_RECOMMENDATION: RecommendationRule = RecommendationRule {
    priority: RecommendationPriority::Info,
    category: "Great Job!",
    title: "Excellent Biomechanics",
    description: "Your form shows low injury risk. Keep it up!",
    actions: &[
        "Continue current training routine",
        "Maintain proper warm-up and cool-down",
        "Stay consistent with technique",
    ],
};

/// Alerts and coaching recommendations for a session.
///
/// `overall` is the level from [`session_risk_level`]; a low session also
/// gets the positive feedback entry.
pub fn risk_advice(
    pct: &RiskPercentages,
    overall: RiskSeverity,
) -> (Vec<RiskAlert>, Vec<Recommendation>) {
    let mut alerts = Vec::new();
    let mut recommendations = Vec::new();

    for rule in &ALERT_RULES {
        let value = pct.get(rule.risk_type);
        if value <= rule.threshold_pct {
            continue;
        }
        if let Some((alert_type, severity, message)) = rule.alert {
            alerts.push(RiskAlert {
                alert_type: alert_type.to_string(),
                severity,
                percentage: value,
                message: message.replace("{pct}", &format!("{value:.1}")),
            });
        }
        recommendations.push(rule.recommendation.build());
    }

    if overall == RiskSeverity::Low {
        recommendations.push(LOW_RISK_RECOMMENDATION.build());
    }

    (alerts, recommendations)
}
