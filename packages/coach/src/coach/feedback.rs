use std::collections::HashSet;
use std::fmt;

use chrono::NaiveDate;
use serde::Serialize;
use tracing::info;

use crate::coach::difficulty::{AssessmentTally, DifficultyController};
use crate::coach::text::normalize_text;
use crate::coach::types::{LearnerState, VocabularyPool};
use crate::coach::verdict::Verdict;

pub const MISTAKE_PLACEHOLDER_MEANING: &str = "flagged during grading";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Rank {
    #[serde(rename = "SSS")]
    Sss,
    S,
    A,
    B,
    C,
}

impl Rank {
    pub fn from_average(average: f64) -> Self {
        if average >= 9.0 {
            Self::Sss
        } else if average >= 8.0 {
            Self::S
        } else if average >= 7.0 {
            Self::A
        } else if average >= 6.0 {
            Self::B
        } else {
            Self::C
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sss => "SSS",
            Self::S => "S",
            Self::A => "A",
            Self::B => "B",
            Self::C => "C",
        }
    }
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackReport {
    /// Mistaken terms with their weight after the penalty
    pub penalized: Vec<(String, u32)>,
    pub rewarded: Vec<String>,
    pub tally: AssessmentTally,
}

impl FeedbackReport {
    pub fn rank(&self) -> Option<Rank> {
        self.tally.average.map(Rank::from_average)
    }

    /// One-line score summary, absent when nothing was attempted
    pub fn summary(&self) -> Option<String> {
        let average = self.tally.average?;
        Some(format!(
            "Average score: {average:.1} / 10.0 (Rank {})",
            Rank::from_average(average)
        ))
    }
}

/// Penalize mistakes, reward correct usage elsewhere in `submission`, then drift the tracks.
pub fn apply_verdict(
    verdict: &Verdict,
    submission: &str,
    pool: &mut VocabularyPool,
    state: &mut LearnerState,
    controller: &DifficultyController<'_>,
    today: NaiveDate,
) -> FeedbackReport {
    let mut report = FeedbackReport::default();
    let mut mistaken = HashSet::new();

    for mistake in &verdict.mistakes {
        let term = mistake.term.trim();
        if term.is_empty() {
            continue;
        }
        let meaning = mistake
            .meaning
            .as_deref()
            .filter(|m| !m.trim().is_empty())
            .unwrap_or(MISTAKE_PLACEHOLDER_MEANING);
        let weight = pool.penalize_mistake(term, meaning, mistake.category.unwrap_or_default(), today);
        mistaken.insert(normalize_text(term));
        report.penalized.push((term.to_string(), weight));
    }

    report.rewarded = pool.reward_correct_usage(submission, &mistaken);
    report.tally = controller.apply_assessments(state, &verdict.assessments);

    info!(
        penalized = report.penalized.len(),
        rewarded = report.rewarded.len(),
        attempted = report.tally.attempted,
        skipped = report.tally.skipped,
        average = ?report.tally.average,
        "verdict applied"
    );
    report
}
