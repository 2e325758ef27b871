use renshu_algo::{SelectorOptions, SprintParams, DEFAULT_SESSION_SIZE};
use serde::{Deserialize, Serialize};

use crate::coach::types::{QuestionMix, HISTORY_CAPACITY};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RolloverParams {
    /// Completion rate at or above which the productive track is promoted
    pub promote_rate: f64,
    /// Completion rate below which the productive track is demoted
    pub demote_rate: f64,
    pub promote_step: f64,
    pub perfect_step: f64,
    pub demote_step: f64,
}

impl Default for RolloverParams {
    fn default() -> Self {
        Self {
            promote_rate: 0.8,
            demote_rate: 0.4,
            promote_step: 0.2,
            perfect_step: 0.3,
            demote_step: 0.3,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackParams {
    pub excellent_score: f64,
    pub good_score: f64,
    pub weak_score: f64,
    pub excellent_step: f64,
    pub good_step: f64,
    pub weak_step: f64,
}

impl Default for FeedbackParams {
    fn default() -> Self {
        Self {
            excellent_score: 9.0,
            good_score: 7.0,
            weak_score: 6.0,
            excellent_step: 0.1,
            good_step: 0.05,
            weak_step: -0.1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BonusParams {
    /// Bonus answers needed per difficulty bump
    pub answers_per_step: u32,
    pub step: f64,
    pub base_offset: f64,
}

impl Default for BonusParams {
    fn default() -> Self {
        Self {
            answers_per_step: 3,
            step: 0.5,
            base_offset: 0.5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LevelTier {
    pub keyword: String,
    pub level: f64,
}

fn default_tiers() -> Vec<LevelTier> {
    [("n5", 1.0), ("n4", 2.0), ("n3", 3.0), ("n2", 4.0), ("n1", 5.0)]
        .into_iter()
        .map(|(keyword, level)| LevelTier { keyword: keyword.to_string(), level })
        .collect()
}

/// How session items are drawn from the pool
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionStrategy {
    /// Guaranteed weak items, weighted fill from the rest
    #[default]
    WeakFirst,
    /// Weighted draws over the whole pool, no guaranteed slots
    Flat,
}

impl SelectionStrategy {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "weak_first" | "weak-first" => Some(Self::WeakFirst),
            "flat" => Some(Self::Flat),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoachConfig {
    pub sprint: SprintParams,
    pub main_quota: u32,
    pub session_size: usize,
    pub selector: SelectorOptions,
    pub selection: SelectionStrategy,
    pub daily_mix: QuestionMix,
    pub bonus_mix: QuestionMix,
    pub history_capacity: usize,
    pub grading_history: usize,
    pub assessment_history: usize,
    pub excerpt_chars: usize,
    /// Texts at or above this many characters never count as vocabulary entries
    pub entry_max_chars: usize,
    pub level_tiers: Vec<LevelTier>,
    pub rollover: RolloverParams,
    pub feedback: FeedbackParams,
    pub bonus: BonusParams,
    pub send_delay_ms: u64,
    pub answer_sheet_delay_ms: u64,
    pub selection_seed: Option<u64>,
}

impl Default for CoachConfig {
    fn default() -> Self {
        Self {
            sprint: SprintParams::default(),
            main_quota: 10,
            session_size: DEFAULT_SESSION_SIZE,
            selector: SelectorOptions::default(),
            selection: SelectionStrategy::default(),
            daily_mix: QuestionMix { productive: 7, receptive: 3 },
            bonus_mix: QuestionMix { productive: 2, receptive: 1 },
            history_capacity: HISTORY_CAPACITY,
            grading_history: 10,
            assessment_history: 50,
            excerpt_chars: 100,
            entry_max_chars: 50,
            level_tiers: default_tiers(),
            rollover: RolloverParams::default(),
            feedback: FeedbackParams::default(),
            bonus: BonusParams::default(),
            send_delay_ms: 1000,
            answer_sheet_delay_ms: 3000,
            selection_seed: None,
        }
    }
}

impl CoachConfig {
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(days) = env_parse("RENSHU_SPRINT_DAYS") {
            config.sprint.duration_days = days;
        }
        if let Some(start) = env_parse("RENSHU_SPRINT_START") {
            config.sprint.start = start;
        }
        if let Some(target) = env_parse("RENSHU_SPRINT_TARGET") {
            config.sprint.target = target;
        }
        if let Some(quota) = env_parse::<u32>("RENSHU_MAIN_QUOTA") {
            config.main_quota = quota.max(1);
        }
        if let Some(size) = env_parse::<usize>("RENSHU_SESSION_SIZE") {
            config.session_size = size.max(1);
        }
        if let Some(size) = env_parse("RENSHU_WEAK_SET_SIZE") {
            config.selector.weak_set_size = size;
        }
        if let Some(mandatory) = env_parse("RENSHU_MANDATORY_WEAK") {
            config.selector.mandatory = mandatory;
        }
        if let Some(capacity) = env_parse::<usize>("RENSHU_HISTORY_CAPACITY") {
            config.history_capacity = capacity.max(1);
        }
        if let Some(delay) = env_parse("RENSHU_SEND_DELAY_MS") {
            config.send_delay_ms = delay;
        }
        if let Some(delay) = env_parse("RENSHU_ANSWER_SHEET_DELAY_MS") {
            config.answer_sheet_delay_ms = delay;
        }
        if let Some(strategy) = std::env::var("RENSHU_SELECTION").ok().as_deref().and_then(SelectionStrategy::parse) {
            config.selection = strategy;
        }
        config.selection_seed = env_parse("RENSHU_SELECTION_SEED");

        config
    }

    /// First tier whose keyword occurs in a lowercased, space-stripped directive
    pub fn find_tier(&self, compact: &str) -> Option<&LevelTier> {
        self.level_tiers.iter().find(|tier| compact.contains(&tier.keyword))
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok()?.trim().parse().ok()
}
