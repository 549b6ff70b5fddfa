//! `rallycoach-core` -- pure biomechanics analysis for racket-sport strokes.
//!
//! Turns per-frame pose landmarks into joint-angle metrics, injury-risk
//! flags, a classified stroke timeline and a deviation score. No I/O, no
//! logging, no async: everything here is a function of its arguments plus
//! immutable threshold tables.

pub mod classifier;
pub mod deviation;
pub mod error;
pub mod feedback;
pub mod geometry;
pub mod metrics;
pub mod movement;
pub mod risk;
pub mod segmentation;
pub mod stroke;
pub mod threshold_validation;
pub mod types;
pub mod velocity;
