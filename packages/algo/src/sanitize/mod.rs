//! Data Sanitization
//!
//! Numerical guards for difficulty tracks and externally supplied scores.
//!
//! Functions:
//! - Track floor / feedback ceiling clamping
//! - Score normalization

use crate::types::{FEEDBACK_CEILING, MAX_SCORE, TRACK_FLOOR};

/// Apply the track floor; non-finite values collapse to the floor
pub fn floor_track(value: f64) -> f64 {
    if value.is_finite() {
        value.max(TRACK_FLOOR)
    } else {
        TRACK_FLOOR
    }
}

/// Clamp into the per-answer feedback band `[TRACK_FLOOR, FEEDBACK_CEILING]`
pub fn clamp_feedback_track(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(TRACK_FLOOR, FEEDBACK_CEILING)
    } else {
        TRACK_FLOOR
    }
}

/// Normalize an external score into `[0, MAX_SCORE]`; `None` for NaN/Inf
pub fn sanitize_score(score: f64) -> Option<f64> {
    if score.is_finite() {
        Some(score.clamp(0.0, MAX_SCORE))
    } else {
        None
    }
}

/// A difficulty value supplied from outside (manual override, assessment)
/// is accepted only when it is a finite number
pub fn accept_level(value: f64) -> Option<f64> {
    value.is_finite().then_some(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_floor_track() {
        assert_eq!(floor_track(0.4), 1.0);
        assert_eq!(floor_track(12.0), 12.0);
        assert_eq!(floor_track(f64::NAN), 1.0);
    }

    #[test]
    fn test_clamp_feedback_track_boundaries() {
        assert_eq!(clamp_feedback_track(8.05), 8.0);
        assert_eq!(clamp_feedback_track(0.95), 1.0);
        assert_eq!(clamp_feedback_track(3.3), 3.3);
    }

    #[test]
    fn test_sanitize_score() {
        assert_eq!(sanitize_score(11.0), Some(10.0));
        assert_eq!(sanitize_score(-1.0), Some(0.0));
        assert_eq!(sanitize_score(f64::INFINITY), None);
    }

    #[test]
    fn test_accept_level() {
        assert_eq!(accept_level(0.5), Some(0.5));
        assert_eq!(accept_level(f64::NAN), None);
    }
}
