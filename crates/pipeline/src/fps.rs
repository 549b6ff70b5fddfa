//! Frame-rate estimation from frame timestamps.

use rallycoach_core::geometry::round_to;
use rallycoach_core::types::RawFrame;

/// Inter-frame deltas sampled from the start of the stream.
pub const FPS_SAMPLE_DELTAS: usize = 30;

/// Estimate fps from the first [`FPS_SAMPLE_DELTAS`] consecutive frame pairs.
///
/// Each pair contributes its per-frame duration (time delta divided by the
/// frame-index delta, so dropped frames do not skew the result). Pairs with
/// a non-positive index or time delta are skipped. Falls back to
/// `default_fps` when no pair is usable.
pub fn estimate_fps(frames: &[RawFrame], default_fps: f64) -> f64 {
    let durations: Vec<f64> = frames
        .windows(2)
        .take(FPS_SAMPLE_DELTAS)
        .filter_map(|pair| {
            let frames_apart = pair[1].frame_idx - pair[0].frame_idx;
            let dt = pair[1].timestamp_sec - pair[0].timestamp_sec;
            (frames_apart > 0 && dt > 0.0).then(|| dt / frames_apart as f64)
        })
        .collect();

    if durations.is_empty() {
        return default_fps;
    }
    let mean = durations.iter().sum::<f64>() / durations.len() as f64;
    round_to(1.0 / mean, 2)
}
