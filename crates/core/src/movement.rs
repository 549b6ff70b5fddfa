//! Player court movement from the tracker's bounding boxes.
//!
//! The bottom-centre of the box stands in for the player's feet. Steps are
//! converted to metres by assuming the box spans the player's height.

use serde::{Deserialize, Serialize};

use crate::geometry::round_to;
use crate::types::RawFrame;

/// Assumed player height in metres.
pub const PLAYER_HEIGHT_M: f64 = 1.75;

const MS_TO_KMH: f64 = 3.6;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MovementStats {
    pub total_distance_m: f64,
    pub avg_speed_kmh: f64,
}

fn feet(bbox: &[f64; 4]) -> (f64, f64) {
    let [x1, _, x2, y2] = *bbox;
    ((x1 + x2) / 2.0, y2)
}

/// Total distance travelled, in metres.
///
/// Boxes with no height carry no detection; they are skipped and the next
/// step is measured from the last real box.
pub fn total_distance(frames: &[RawFrame]) -> f64 {
    let mut previous: Option<(f64, f64)> = None;
    let mut total = 0.0;

    for frame in frames {
        let height = frame.bbox[3] - frame.bbox[1];
        if height <= 0.0 {
            continue;
        }
        let current = feet(&frame.bbox);
        if let Some((px, py)) = previous {
            let step = ((current.0 - px).powi(2) + (current.1 - py).powi(2)).sqrt();
            total += step * PLAYER_HEIGHT_M / height;
        }
        previous = Some(current);
    }

    total
}

/// Distance and average speed over a session of `frames.len() / fps` seconds.
pub fn movement_stats(frames: &[RawFrame], fps: f64) -> MovementStats {
    let distance = total_distance(frames);
    let duration = frames.len() as f64 / fps;
    let speed = if duration > 0.0 {
        distance / duration * MS_TO_KMH
    } else {
        0.0
    };
    MovementStats {
        total_distance_m: round_to(distance, 2),
        avg_speed_kmh: round_to(speed, 2),
    }
}
