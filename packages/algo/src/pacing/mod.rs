//! Sprint Pacing
//!
//! Compares the productive difficulty track against a linear expectation
//! that runs from `start` to `target` over `duration_days`.
//!
//! - expected(t) = start + min(1, t / duration) * (target - start)
//! - gap_days    = (current - expected) / daily_growth, truncated toward zero
//! - Once current >= target the sprint is permanently `Completed`

use crate::types::{PaceReport, PaceStatus, SprintParams, EPSILON, PACE_GAP_DAYS};

/// Linear expectation for a given day of the sprint
pub fn expected_difficulty(days_passed: i64, params: &SprintParams) -> f64 {
    let days_passed = days_passed.max(1) as f64;
    let duration = f64::from(params.duration_days.max(1));
    let ratio = (days_passed / duration).min(1.0);
    params.start + ratio * (params.target - params.start)
}

/// Evaluate pacing for the productive track.
///
/// `days_since_start` may be zero or negative (clock skew, same-day start);
/// it is treated as day 1.
pub fn pace(current: f64, days_since_start: i64, params: &SprintParams) -> PaceReport {
    let days_passed = days_since_start.max(1);
    let expected = expected_difficulty(days_passed, params);

    if current >= params.target {
        return PaceReport {
            days_passed,
            expected,
            status: PaceStatus::Completed,
        };
    }

    let growth = params.daily_growth();
    let gap = if growth.abs() < EPSILON {
        0
    } else {
        ((current - expected) / growth) as i64
    };

    let status = if gap >= PACE_GAP_DAYS {
        PaceStatus::Ahead(gap)
    } else if gap <= -PACE_GAP_DAYS {
        PaceStatus::Behind(gap)
    } else {
        PaceStatus::OnPace(gap)
    };

    PaceReport {
        days_passed,
        expected,
        status,
    }
}
