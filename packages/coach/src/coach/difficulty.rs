//! Dual-track difficulty controller: sprint pacing, daily rollover,
//! per-answer drift and bonus difficulty.

use chrono::NaiveDate;
use renshu_algo::sanitize::{accept_level, clamp_feedback_track, floor_track, sanitize_score};
use renshu_algo::{pace, PaceReport, PaceStatus};
use serde::Serialize;
use tracing::{info, warn};

use crate::coach::config::CoachConfig;
use crate::coach::types::{AssessmentResult, AssessmentStatus, Direction, LearnerState, SessionMode};

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "step", rename_all = "camelCase")]
pub enum RolloverStep {
    /// First rollover ever; no step function applied
    Greeting,
    Promoted { from: f64, to: f64, perfect: bool },
    Held { pacing_warning: Option<PaceReport> },
    Demoted { from: f64, to: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RolloverOutcome {
    pub step: RolloverStep,
    pub completion_rate: f64,
    pub yesterday_main: u32,
    pub yesterday_bonus: u32,
    pub streak_days: u32,
    pub execution_count: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssessmentTally {
    pub attempted: usize,
    pub skipped: usize,
    pub average: Option<f64>,
    pub productive_delta: f64,
    pub receptive_delta: f64,
}

pub struct DifficultyController<'a> {
    config: &'a CoachConfig,
}

impl<'a> DifficultyController<'a> {
    pub fn new(config: &'a CoachConfig) -> Self {
        Self { config }
    }

    pub fn sprint_status(&self, state: &LearnerState, today: NaiveDate) -> PaceReport {
        let start = state.sprint_start.unwrap_or(today);
        let days = (today - start).num_days();
        pace(state.productive, days, &self.config.sprint)
    }

    pub fn resolve_mode(state: &LearnerState, today: NaiveDate) -> SessionMode {
        if state.last_quiz_date == Some(today) {
            SessionMode::Bonus
        } else {
            SessionMode::Daily
        }
    }

    /// Once-per-day transition; `None` when today already rolled over.
    pub fn rollover(&self, state: &mut LearnerState, today: NaiveDate) -> Option<RolloverOutcome> {
        if state.last_quiz_date == Some(today) {
            return None;
        }

        state.yesterday_main = state.main_answers;
        state.yesterday_bonus = state.bonus_answers;
        state.main_answers = 0;
        state.bonus_answers = 0;
        state.execution_count = state.execution_count.saturating_add(1);

        let yesterday = today.pred_opt();
        state.streak_days = if state.last_active.is_some() && state.last_active == yesterday {
            state.streak_days.saturating_add(1)
        } else {
            1
        };
        state.last_active = Some(today);

        let quota = f64::from(self.config.main_quota.max(1));
        let completion_rate = f64::from(state.yesterday_main) / quota;
        let params = &self.config.rollover;

        let step = if state.last_quiz_date.is_none() {
            RolloverStep::Greeting
        } else if completion_rate >= params.promote_rate {
            let from = state.productive;
            let perfect = completion_rate >= 1.0;
            let step = if perfect { params.perfect_step } else { params.promote_step };
            state.productive = floor_track(from + step);
            RolloverStep::Promoted { from, to: state.productive, perfect }
        } else if completion_rate >= params.demote_rate {
            let report = self.sprint_status(state, today);
            let behind = !report.status.is_completed() && state.productive < report.expected;
            RolloverStep::Held { pacing_warning: behind.then_some(report) }
        } else {
            let from = state.productive;
            state.productive = floor_track(from - params.demote_step);
            RolloverStep::Demoted { from, to: state.productive }
        };

        state.last_quiz_date = Some(today);

        let outcome = RolloverOutcome {
            step,
            completion_rate,
            yesterday_main: state.yesterday_main,
            yesterday_bonus: state.yesterday_bonus,
            streak_days: state.streak_days,
            execution_count: state.execution_count,
        };
        info!(
            ?step,
            completion_rate,
            streak = state.streak_days,
            productive = state.productive,
            "daily rollover"
        );
        Some(outcome)
    }

    /// Per-answer drift; skipped answers and non-finite scores are left out.
    pub fn apply_assessments(
        &self,
        state: &mut LearnerState,
        assessments: &[AssessmentResult],
    ) -> AssessmentTally {
        let mut tally = AssessmentTally::default();
        let mut sum = 0.0;
        let (productive_before, receptive_before) = (state.productive, state.receptive);

        for assessment in assessments {
            if assessment.status == AssessmentStatus::Skipped {
                tally.skipped += 1;
                continue;
            }
            let Some(score) = sanitize_score(assessment.score) else {
                warn!(input = %assessment.input, "non-finite score ignored");
                tally.skipped += 1;
                continue;
            };
            tally.attempted += 1;
            sum += score;

            let Some(delta) = self.drift(score) else {
                continue;
            };
            match assessment.direction {
                Direction::Productive => state.productive = clamp_feedback_track(state.productive + delta),
                Direction::Receptive => state.receptive = clamp_feedback_track(state.receptive + delta),
                Direction::Unknown => {}
            }
        }

        if tally.attempted > 0 {
            tally.average = Some(sum / tally.attempted as f64);
        }
        tally.productive_delta = state.productive - productive_before;
        tally.receptive_delta = state.receptive - receptive_before;
        tally
    }

    fn drift(&self, score: f64) -> Option<f64> {
        let params = &self.config.feedback;
        if score >= params.excellent_score {
            Some(params.excellent_step)
        } else if score >= params.good_score {
            Some(params.good_step)
        } else if score < params.weak_score {
            Some(params.weak_step)
        } else {
            None
        }
    }

    /// Recomputed on every bonus session, never persisted.
    pub fn bonus_difficulty(&self, state: &LearnerState) -> f64 {
        let params = &self.config.bonus;
        let average = (state.productive + state.receptive) / 2.0;
        let steps = state.bonus_answers / params.answers_per_step.max(1);
        average + f64::from(steps) * params.step + params.base_offset
    }

    /// Set both tracks verbatim; non-finite levels are rejected.
    pub fn apply_level(&self, state: &mut LearnerState, level: f64) -> Option<f64> {
        let level = accept_level(level)?;
        state.productive = level;
        state.receptive = level;
        info!(level, "difficulty overridden");
        Some(level)
    }

    /// Shift both tracks by `adjustment`, floored at 1.0.
    pub fn apply_adjustment(&self, state: &mut LearnerState, adjustment: f64) -> bool {
        if !adjustment.is_finite() || adjustment == 0.0 {
            return false;
        }
        state.productive = floor_track(state.productive + adjustment);
        state.receptive = floor_track(state.receptive + adjustment);
        info!(adjustment, productive = state.productive, receptive = state.receptive, "difficulty adjusted");
        true
    }
}

const LEVEL_DESCRIPTIONS: [&str; 8] = [
    "Lv1 (novice): N5 basics, vocabulary first",
    "Lv2 (beginner): N4 grammar, simple compound sentences",
    "Lv3 (intermediate): N3 everyday usage, standard conversation",
    "Lv4 (advanced): N2 business and news, long sentences",
    "Lv5 (expert): N1 comprehensive, pushing the limits",
    "Lv6 (native): specialist fields, technical documents",
    "Lv7 (literary): classical, philosophical and poetic style",
    "Lv8 (mythic): beyond what a human is expected to reach",
];

/// Labels for the integer part of `level` and the level above it.
pub fn describe_level(level: f64) -> (String, String) {
    let base = if level.is_finite() { level.floor().max(0.0) as usize } else { 1 };
    let label = |n: usize, fallback: &str| {
        n.checked_sub(1)
            .and_then(|i| LEVEL_DESCRIPTIONS.get(i))
            .map(|s| s.to_string())
            .unwrap_or_else(|| format!("Lv{n} ({fallback})"))
    };
    (label(base, "beyond the scale"), label(base + 1, "uncharted"))
}

pub fn pace_summary(report: &PaceReport, duration_days: u32) -> String {
    match report.status {
        PaceStatus::Completed => "open-ended challenge (sprint target reached)".to_string(),
        PaceStatus::Ahead(gap) => {
            format!("sprint day {}/{duration_days}, {gap} days ahead", report.days_passed)
        }
        PaceStatus::OnPace(_) => format!("sprint day {}/{duration_days}, on pace", report.days_passed),
        PaceStatus::Behind(gap) => format!(
            "sprint day {}/{duration_days}, {} days behind",
            report.days_passed,
            gap.unsigned_abs()
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 5, d).unwrap()
    }

    fn assessment(direction: Direction, score: f64, status: AssessmentStatus) -> AssessmentResult {
        AssessmentResult {
            input: "x".into(),
            direction,
            score,
            status,
        }
    }

    #[test]
    fn test_first_rollover_greets() {
        let config = CoachConfig::default();
        let controller = DifficultyController::new(&config);
        let mut state = LearnerState::default();
        let outcome = controller.rollover(&mut state, day(10)).unwrap();
        assert_eq!(outcome.step, RolloverStep::Greeting);
        assert_eq!(state.execution_count, 1);
        assert_eq!(state.streak_days, 1);
        assert_eq!(state.last_quiz_date, Some(day(10)));
        assert!(controller.rollover(&mut state, day(10)).is_none());
    }

    #[test]
    fn test_streak_continues_or_resets() {
        let config = CoachConfig::default();
        let controller = DifficultyController::new(&config);

        let mut state = LearnerState {
            last_active: Some(day(9)),
            last_quiz_date: Some(day(9)),
            streak_days: 4,
            ..LearnerState::default()
        };
        controller.rollover(&mut state, day(10));
        assert_eq!(state.streak_days, 5);

        let mut state = LearnerState {
            last_active: Some(day(7)),
            last_quiz_date: Some(day(7)),
            streak_days: 4,
            ..LearnerState::default()
        };
        controller.rollover(&mut state, day(10));
        assert_eq!(state.streak_days, 1);
    }

    #[test]
    fn test_perfect_day_promotes_by_point_three() {
        let config = CoachConfig::default();
        let controller = DifficultyController::new(&config);
        let mut state = LearnerState {
            productive: 2.0,
            main_answers: 10,
            bonus_answers: 4,
            last_quiz_date: Some(day(9)),
            ..LearnerState::default()
        };
        let outcome = controller.rollover(&mut state, day(10)).unwrap();
        assert!((state.productive - 2.3).abs() < 1e-9);
        assert_eq!(outcome.yesterday_main, 10);
        assert_eq!(outcome.yesterday_bonus, 4);
        assert_eq!(state.main_answers, 0);
        assert_eq!(state.bonus_answers, 0);
        assert!(matches!(outcome.step, RolloverStep::Promoted { perfect: true, .. }));
    }

    #[test]
    fn test_rollover_bands() {
        let config = CoachConfig::default();
        let controller = DifficultyController::new(&config);

        let mut good = LearnerState {
            productive: 2.0,
            main_answers: 8,
            last_quiz_date: Some(day(9)),
            ..LearnerState::default()
        };
        controller.rollover(&mut good, day(10));
        assert!((good.productive - 2.2).abs() < 1e-9);

        let mut lazy = LearnerState {
            productive: 1.2,
            main_answers: 3,
            last_quiz_date: Some(day(9)),
            ..LearnerState::default()
        };
        controller.rollover(&mut lazy, day(10));
        assert_eq!(lazy.productive, 1.0);

        let mut average = LearnerState {
            productive: 1.0,
            main_answers: 5,
            sprint_start: Some(day(1) - chrono::Duration::days(60)),
            last_quiz_date: Some(day(9)),
            ..LearnerState::default()
        };
        let outcome = controller.rollover(&mut average, day(10)).unwrap();
        assert_eq!(average.productive, 1.0);
        match outcome.step {
            RolloverStep::Held { pacing_warning: Some(report) } => {
                assert!(matches!(report.status, PaceStatus::Behind(_)))
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_assessment_drift_and_ceiling() {
        let config = CoachConfig::default();
        let controller = DifficultyController::new(&config);
        let mut state = LearnerState {
            productive: 7.95,
            receptive: 1.05,
            ..LearnerState::default()
        };
        let tally = controller.apply_assessments(
            &mut state,
            &[
                assessment(Direction::Productive, 9.5, AssessmentStatus::Attempted),
                assessment(Direction::Receptive, 2.0, AssessmentStatus::Attempted),
                assessment(Direction::Unknown, 6.5, AssessmentStatus::Attempted),
            ],
        );
        assert_eq!(state.productive, 8.0);
        assert_eq!(state.receptive, 1.0);
        assert_eq!(tally.attempted, 3);
        let average = tally.average.unwrap();
        assert!((average - 6.0).abs() < 1e-9);
    }

    #[test]
    fn test_skipped_answers_are_inert() {
        let config = CoachConfig::default();
        let controller = DifficultyController::new(&config);
        let mut state = LearnerState {
            productive: 3.0,
            receptive: 3.0,
            ..LearnerState::default()
        };
        let tally = controller.apply_assessments(
            &mut state,
            &[
                assessment(Direction::Productive, 0.0, AssessmentStatus::Skipped),
                assessment(Direction::Receptive, 8.0, AssessmentStatus::Attempted),
            ],
        );
        assert_eq!(state.productive, 3.0);
        assert!((state.receptive - 3.05).abs() < 1e-9);
        assert_eq!(tally.skipped, 1);
        assert_eq!(tally.average, Some(8.0));
    }

    #[test]
    fn test_bonus_difficulty() {
        let config = CoachConfig::default();
        let controller = DifficultyController::new(&config);
        let state = LearnerState {
            productive: 2.0,
            receptive: 3.0,
            bonus_answers: 7,
            ..LearnerState::default()
        };
        assert!((controller.bonus_difficulty(&state) - 4.0).abs() < 1e-9);
    }

    #[test]
    fn test_level_and_adjustment() {
        let config = CoachConfig::default();
        let controller = DifficultyController::new(&config);
        let mut state = LearnerState::default();
        assert_eq!(controller.apply_level(&mut state, 0.5), Some(0.5));
        assert_eq!(state.receptive, 0.5);
        assert_eq!(controller.apply_level(&mut state, f64::NAN), None);
        assert_eq!(state.productive, 0.5);

        state.productive = 2.0;
        state.receptive = 1.2;
        assert!(controller.apply_adjustment(&mut state, -0.5));
        assert_eq!(state.productive, 1.5);
        assert_eq!(state.receptive, 1.0);
        assert!(!controller.apply_adjustment(&mut state, 0.0));
    }

    #[test]
    fn test_mode_resolution() {
        let mut state = LearnerState::default();
        assert_eq!(DifficultyController::resolve_mode(&state, day(3)), SessionMode::Daily);
        state.last_quiz_date = Some(day(3));
        assert_eq!(DifficultyController::resolve_mode(&state, day(3)), SessionMode::Bonus);
        assert_eq!(DifficultyController::resolve_mode(&state, day(4)), SessionMode::Daily);
    }

    #[test]
    fn test_describe_level() {
        let (base, next) = describe_level(2.7);
        assert!(base.starts_with("Lv2"));
        assert!(next.starts_with("Lv3"));
        let (base, next) = describe_level(8.4);
        assert!(base.starts_with("Lv8"));
        assert_eq!(next, "Lv9 (uncharted)");
    }
}
