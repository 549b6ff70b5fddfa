//! Pose landmark stream types.
//!
//! A session arrives as an ordered list of [`RawFrame`] records, one per
//! captured video frame, each optionally carrying the 33-point pose layout
//! produced by the upstream tracker. Coordinates are normalized image
//! coordinates: `x`/`y` in `[0, 1]` with `y` growing downward, `z` a relative
//! depth estimate.

use serde::{Deserialize, Serialize};

/// Number of landmarks in a full pose.
pub const POSE_LANDMARK_COUNT: usize = 33;

// ---------------------------------------------------------------------------
// PoseLandmark
// ---------------------------------------------------------------------------

/// Index of each landmark in the 33-point pose array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PoseLandmark {
    Nose = 0,
    LeftEyeInner = 1,
    LeftEye = 2,
    LeftEyeOuter = 3,
    RightEyeInner = 4,
    RightEye = 5,
    RightEyeOuter = 6,
    LeftEar = 7,
    RightEar = 8,
    MouthLeft = 9,
    MouthRight = 10,
    LeftShoulder = 11,
    RightShoulder = 12,
    LeftElbow = 13,
    RightElbow = 14,
    LeftWrist = 15,
    RightWrist = 16,
    LeftPinky = 17,
    RightPinky = 18,
    LeftIndex = 19,
    RightIndex = 20,
    LeftThumb = 21,
    RightThumb = 22,
    LeftHip = 23,
    RightHip = 24,
    LeftKnee = 25,
    RightKnee = 26,
    LeftAnkle = 27,
    RightAnkle = 28,
    LeftHeel = 29,
    RightHeel = 30,
    LeftFootIndex = 31,
    RightFootIndex = 32,
}

impl PoseLandmark {
    /// Position of this landmark in the pose array.
    pub const fn index(self) -> usize {
        self as usize
    }
}

// ---------------------------------------------------------------------------
// Point3 / Landmark
// ---------------------------------------------------------------------------

/// A bare 3D coordinate in normalized image space.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point3 {
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub z: f64,
}

impl Point3 {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Component-wise midpoint of two points.
    pub fn midpoint(&self, other: &Point3) -> Point3 {
        Point3 {
            x: (self.x + other.x) / 2.0,
            y: (self.y + other.y) / 2.0,
            z: (self.z + other.z) / 2.0,
        }
    }
}

fn default_visibility() -> f64 {
    1.0
}

/// One tracked body joint as produced by the pose tracker.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub z: f64,
    #[serde(default = "default_visibility")]
    pub visibility: f64,
}

impl Landmark {
    pub fn point(&self) -> Point3 {
        Point3::new(self.x, self.y, self.z)
    }
}

// ---------------------------------------------------------------------------
// RawFrame
// ---------------------------------------------------------------------------

fn default_track_id() -> i64 {
    -1
}

/// One captured frame as delivered by the tracker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawFrame {
    #[serde(rename = "frameIdx")]
    pub frame_idx: i64,
    #[serde(rename = "timestampSec")]
    pub timestamp_sec: f64,
    #[serde(default)]
    pub bbox: [f64; 4],
    #[serde(default)]
    pub confidence: f64,
    #[serde(default = "default_track_id")]
    pub track_id: i64,
    #[serde(default)]
    pub landmarks: Option<Vec<Landmark>>,
}

impl RawFrame {
    /// A frame with no detection attached.
    pub fn empty(frame_idx: i64, timestamp_sec: f64) -> Self {
        Self {
            frame_idx,
            timestamp_sec,
            bbox: [0.0; 4],
            confidence: 0.0,
            track_id: default_track_id(),
            landmarks: None,
        }
    }

    /// Look up a landmark, if the frame carries a pose that includes it.
    pub fn landmark(&self, which: PoseLandmark) -> Option<&Landmark> {
        self.landmarks.as_ref()?.get(which.index())
    }

    /// Whether the tracker produced any pose for this frame.
    pub fn has_pose(&self) -> bool {
        self.landmarks.as_ref().is_some_and(|l| !l.is_empty())
    }
}
