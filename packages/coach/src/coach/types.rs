use std::collections::VecDeque;

use chrono::NaiveDate;
use renshu_algo::Weighted;
use serde::{Deserialize, Serialize};

pub const START_LEVEL: f64 = 1.0;
pub const HISTORY_CAPACITY: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Grammar,
    #[default]
    #[serde(other)]
    Word,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Word => "word",
            Self::Grammar => "grammar",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "grammar" => Self::Grammar,
            _ => Self::Word,
        }
    }

    /// Grammar patterns are written with a wave dash or an ellipsis placeholder
    pub fn infer_from_term(term: &str) -> Self {
        if term.contains('~') || term.contains('～') || term.contains("...") {
            Self::Grammar
        } else {
            Self::Word
        }
    }
}

fn default_weight() -> u32 {
    1
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VocabularyItem {
    #[serde(alias = "kanji")]
    pub term: String,
    #[serde(alias = "kana", default)]
    pub reading: String,
    #[serde(default)]
    pub meaning: String,
    #[serde(alias = "type", default)]
    pub category: Category,
    #[serde(alias = "count", default = "default_weight")]
    pub weight: u32,
    #[serde(alias = "added_date", default)]
    pub added: Option<NaiveDate>,
}

impl Weighted for VocabularyItem {
    fn weight(&self) -> u32 {
        self.weight
    }
}

/// A term/reading/meaning triple waiting to be recorded in the pool
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VocabularyEntry {
    pub term: String,
    pub reading: String,
    pub meaning: String,
    pub category: Category,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VocabularyPool {
    #[serde(default)]
    pub words: Vec<VocabularyItem>,
}

impl VocabularyPool {
    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

/// Recent submission excerpts, oldest evicted first
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubmissionHistory {
    entries: VecDeque<String>,
}

impl SubmissionHistory {
    pub fn push(&mut self, entry: String, capacity: usize) {
        self.entries.push_back(entry);
        while self.entries.len() > capacity.max(1) {
            self.entries.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Up to `n` most recent entries, ignoring the newest `skip_newest`
    pub fn recent(&self, n: usize, skip_newest: usize) -> Vec<String> {
        let end = self.entries.len().saturating_sub(skip_newest);
        let start = end.saturating_sub(n);
        self.entries.range(start..end).cloned().collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LearnerState {
    pub productive: f64,
    pub receptive: f64,
    pub sprint_start: Option<NaiveDate>,
    pub streak_days: u32,
    pub execution_count: u32,
    pub last_active: Option<NaiveDate>,
    pub last_quiz_date: Option<NaiveDate>,
    pub main_answers: u32,
    pub bonus_answers: u32,
    pub yesterday_main: u32,
    pub yesterday_bonus: u32,
    pub last_update_id: i64,
    pub pending_answers: String,
    pub next_quiz_instruction: String,
    pub history: SubmissionHistory,
}

impl Default for LearnerState {
    fn default() -> Self {
        Self {
            productive: START_LEVEL,
            receptive: START_LEVEL,
            sprint_start: None,
            streak_days: 0,
            execution_count: 0,
            last_active: None,
            last_quiz_date: None,
            main_answers: 0,
            bonus_answers: 0,
            yesterday_main: 0,
            yesterday_bonus: 0,
            last_update_id: 0,
            pending_answers: String::new(),
            next_quiz_instruction: String::new(),
            history: SubmissionHistory::default(),
        }
    }
}

/// One message from the inbound feed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedMessage {
    pub id: i64,
    pub timestamp: i64,
    pub origin_id: String,
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Direction {
    #[serde(alias = "CN_TO_JP")]
    Productive,
    #[serde(alias = "JP_TO_CN")]
    Receptive,
    #[default]
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AssessmentStatus {
    #[default]
    Attempted,
    #[serde(other)]
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssessmentResult {
    #[serde(default)]
    pub input: String,
    #[serde(alias = "type", default)]
    pub direction: Direction,
    #[serde(default)]
    pub score: f64,
    #[serde(default)]
    pub status: AssessmentStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionMode {
    Daily,
    Bonus,
}

impl SessionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Bonus => "bonus",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionMix {
    pub productive: u32,
    pub receptive: u32,
}

impl QuestionMix {
    pub fn total(&self) -> u32 {
        self.productive + self.receptive
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizSession {
    pub mode: SessionMode,
    pub items: Vec<VocabularyItem>,
    pub must_review: Vec<VocabularyItem>,
    pub mix: QuestionMix,
    pub productive_level: f64,
    pub receptive_level: f64,
    pub instruction: Option<String>,
}
