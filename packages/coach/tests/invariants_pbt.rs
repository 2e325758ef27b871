//! Property tests for the scheduling invariants
//!
//! - Watermark never decreases, whatever the batch
//! - Item weights never drop below 1
//! - Feedback drift keeps tracks inside [1.0, 8.0]
//! - Rollover never pushes the productive track under 1.0

mod common;

use std::collections::HashSet;

use proptest::prelude::*;

use common::{date, message, sample_pool, test_config};
use renshu_coach::coach::difficulty::DifficultyController;
use renshu_coach::coach::ingest::{ingest, Classifier};
use renshu_coach::coach::types::{AssessmentResult, AssessmentStatus, Category, Direction, LearnerState};

// ============================================================================
// Generators
// ============================================================================

fn arb_direction() -> impl Strategy<Value = Direction> {
    prop_oneof![
        Just(Direction::Productive),
        Just(Direction::Receptive),
        Just(Direction::Unknown),
    ]
}

fn arb_assessment() -> impl Strategy<Value = AssessmentResult> {
    (arb_direction(), -5.0f64..15.0, any::<bool>()).prop_map(|(direction, score, skipped)| AssessmentResult {
        input: "answer".into(),
        direction,
        score,
        status: if skipped {
            AssessmentStatus::Skipped
        } else {
            AssessmentStatus::Attempted
        },
    })
}

#[derive(Debug, Clone)]
enum WeightOp {
    Penalize(usize),
    Reward(usize),
}

fn arb_weight_op() -> impl Strategy<Value = WeightOp> {
    prop_oneof![
        (0usize..6).prop_map(WeightOp::Penalize),
        (0usize..6).prop_map(WeightOp::Reward),
    ]
}

const TERMS: [&str; 6] = ["猫", "犬", "鳥", "魚", "馬", "牛"];

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #[test]
    fn watermark_is_monotonic(
        start in 0i64..1_000,
        ids in prop::collection::vec(0i64..2_000, 0..40),
    ) {
        let config = test_config();
        let classifier = Classifier::new(&config);
        let batch: Vec<_> = ids.iter().map(|&id| message(id, "私は学生です")).collect();

        let outcome = ingest(start, &batch, Some(common::ORIGIN), &classifier);

        prop_assert!(outcome.watermark >= start);
        let expected = ids.iter().copied().chain(std::iter::once(start)).max().unwrap_or(start);
        prop_assert_eq!(outcome.watermark, expected);
        prop_assert!(outcome.events.windows(2).all(|w| w[0].id < w[1].id));
        prop_assert!(outcome.events.iter().all(|e| e.id > start));
    }

    #[test]
    fn weights_never_drop_below_one(
        weights in prop::collection::vec(1u32..8, 6),
        ops in prop::collection::vec(arb_weight_op(), 0..60),
    ) {
        let terms: Vec<(&str, u32)> = TERMS.iter().copied().zip(weights).collect();
        let mut pool = sample_pool(&terms);
        let today = date(2025, 5, 1);

        for op in ops {
            match op {
                WeightOp::Penalize(i) => {
                    pool.penalize_mistake(TERMS[i], "meaning", Category::Word, today);
                }
                WeightOp::Reward(i) => {
                    pool.reward_correct_usage(&format!("今日は{}を見た", TERMS[i]), &HashSet::new());
                }
            }
        }

        prop_assert!(pool.words.iter().all(|w| w.weight >= 1));
        prop_assert_eq!(pool.len(), TERMS.len());
    }

    #[test]
    fn feedback_drift_stays_in_band(
        productive in 1.0f64..8.0,
        receptive in 1.0f64..8.0,
        assessments in prop::collection::vec(arb_assessment(), 0..30),
    ) {
        let config = test_config();
        let controller = DifficultyController::new(&config);
        let mut state = LearnerState { productive, receptive, ..LearnerState::default() };

        let tally = controller.apply_assessments(&mut state, &assessments);

        prop_assert!((1.0..=8.0).contains(&state.productive));
        prop_assert!((1.0..=8.0).contains(&state.receptive));
        prop_assert_eq!(tally.attempted + tally.skipped, assessments.len());
        if let Some(average) = tally.average {
            prop_assert!((0.0..=10.0).contains(&average));
        }
    }

    #[test]
    fn rollover_respects_track_floor(
        productive in 1.0f64..6.0,
        days in prop::collection::vec(0u32..15, 1..20),
    ) {
        let config = test_config();
        let controller = DifficultyController::new(&config);
        let mut state = LearnerState {
            productive,
            last_quiz_date: Some(date(2025, 1, 1)),
            sprint_start: Some(date(2025, 1, 1)),
            ..LearnerState::default()
        };
        let mut today = date(2025, 1, 1);

        for answers in days {
            today = today.succ_opt().unwrap();
            state.main_answers = answers;
            prop_assert!(controller.rollover(&mut state, today).is_some());
            prop_assert!(controller.rollover(&mut state, today).is_none());
            prop_assert!(state.productive >= 1.0);
            prop_assert_eq!(state.main_answers, 0);
        }
    }
}
