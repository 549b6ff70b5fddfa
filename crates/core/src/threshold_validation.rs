//! Shared threshold validation helpers.
//!
//! Provides reusable range-checking functions for analysis settings.

use crate::error::CoreError;

/// Validate that a value falls within `[0.0, 1.0]`.
///
/// Returns a `CoreError::Validation` naming the field if out of range.
pub fn validate_unit_range(value: f64, name: &str) -> Result<(), CoreError> {
    if !(0.0..=1.0).contains(&value) {
        return Err(CoreError::Validation(format!(
            "{name} must be between 0.0 and 1.0, got {value}"
        )));
    }
    Ok(())
}

/// Validate that a value is finite and strictly positive.
pub fn validate_positive(value: f64, name: &str) -> Result<(), CoreError> {
    if !value.is_finite() || value <= 0.0 {
        return Err(CoreError::Validation(format!(
            "{name} must be > 0, got {value}"
        )));
    }
    Ok(())
}

/// Validate that a frame/window count is at least `min`.
pub fn validate_min_count(value: usize, min: usize, name: &str) -> Result<(), CoreError> {
    if value < min {
        return Err(CoreError::Validation(format!(
            "{name} must be >= {min}, got {value}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use assert_matches::assert_matches;

    #[test]
    fn accepts_boundary_values() {
        assert!(validate_unit_range(0.0, "test").is_ok());
        assert!(validate_unit_range(0.5, "test").is_ok());
        assert!(validate_unit_range(1.0, "test").is_ok());
    }

    #[test]
    fn rejects_below_zero() {
        assert!(validate_unit_range(-0.01, "test").is_err());
    }

    #[test]
    fn rejects_above_one() {
        assert!(validate_unit_range(1.01, "test").is_err());
    }

    #[test]
    fn positive_rejects_zero_and_nan() {
        assert!(validate_positive(30.0, "fps").is_ok());
        assert!(validate_positive(0.0, "fps").is_err());
        assert!(validate_positive(f64::NAN, "fps").is_err());
    }

    #[test]
    fn min_count_names_field_in_error() {
        assert!(validate_min_count(3, 1, "min_sustained_frames").is_ok());
        assert_matches!(
            validate_min_count(0, 1, "min_sustained_frames"),
            Err(CoreError::Validation(msg)) if msg.contains("min_sustained_frames")
        );
    }
}
