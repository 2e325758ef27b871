//! Common Types and Constants
//!
//! Shared data structures used across the selection and pacing modules.

use serde::{Deserialize, Serialize};

// ==================== Constants ====================

/// Number of items in a regular practice session
pub const DEFAULT_SESSION_SIZE: usize = 10;

/// Size of the weak set (top-weighted tier)
pub const WEAK_SET_SIZE: usize = 10;

/// Weak items guaranteed a slot in every session
pub const MANDATORY_WEAK_ITEMS: usize = 3;

/// Weight multiplier used by flat (no weak/normal split) sampling
pub const FLAT_WEIGHT_MULTIPLIER: u32 = 5;

/// Lowest value a difficulty track may take
pub const TRACK_FLOOR: f64 = 1.0;

/// Ceiling applied by per-answer feedback drift
pub const FEEDBACK_CEILING: f64 = 8.0;

/// Highest score a graded answer can receive
pub const MAX_SCORE: f64 = 10.0;

/// Pacing gap (in days) beyond which a learner counts as ahead/behind
pub const PACE_GAP_DAYS: i64 = 5;

/// Numerical stability epsilon
pub const EPSILON: f64 = 1e-10;

// ==================== Sprint Types ====================

/// Long-horizon goal the productive track is paced against
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SprintParams {
    /// Sprint length in days
    pub duration_days: u32,
    /// Difficulty at day zero
    pub start: f64,
    /// Difficulty expected at the end of the sprint
    pub target: f64,
}

impl Default for SprintParams {
    fn default() -> Self {
        Self {
            duration_days: 180,
            start: 1.0,
            target: 4.0,
        }
    }
}

impl SprintParams {
    /// Expected difficulty growth per day
    pub fn daily_growth(&self) -> f64 {
        let days = f64::from(self.duration_days.max(1));
        (self.target - self.start) / days
    }
}

/// Pacing bucket reported by the sprint pacer
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "gapDays", rename_all = "camelCase")]
pub enum PaceStatus {
    /// Target reached; no further gap is reported
    Completed,
    Ahead(i64),
    OnPace(i64),
    Behind(i64),
}

impl PaceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Ahead(_) => "ahead",
            Self::OnPace(_) => "on_pace",
            Self::Behind(_) => "behind",
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed)
    }

    /// Signed day gap, `None` once the sprint is completed
    pub fn gap_days(&self) -> Option<i64> {
        match *self {
            Self::Completed => None,
            Self::Ahead(d) | Self::OnPace(d) | Self::Behind(d) => Some(d),
        }
    }
}

/// Snapshot produced by [`crate::pacing::pace`]
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaceReport {
    /// Days since the sprint started (at least 1)
    pub days_passed: i64,
    /// Linearly interpolated expectation for today
    pub expected: f64,
    pub status: PaceStatus,
}

// ==================== Selection Types ====================

/// Tunables for the weak-first session selector
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectorOptions {
    pub weak_set_size: usize,
    pub mandatory: usize,
    pub flat_multiplier: u32,
}

impl Default for SelectorOptions {
    fn default() -> Self {
        Self {
            weak_set_size: WEAK_SET_SIZE,
            mandatory: MANDATORY_WEAK_ITEMS,
            flat_multiplier: FLAT_WEIGHT_MULTIPLIER,
        }
    }
}

/// Result of a selection, expressed as indices into the input pool
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Selection {
    /// Final (shuffled) session order; indices may repeat
    pub picks: Vec<usize>,
    /// Weak items that were guaranteed a slot
    pub mandatory: Vec<usize>,
}

impl Selection {
    pub fn len(&self) -> usize {
        self.picks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.picks.is_empty()
    }
}
