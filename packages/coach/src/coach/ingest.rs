//! Watermark tracking and message classification.

use std::sync::OnceLock;

use regex::Regex;
use serde_json::Value;
use tracing::{debug, info};

use crate::coach::config::CoachConfig;
use crate::coach::text::normalize_brackets;
use crate::coach::types::{Category, FeedMessage, VocabularyEntry};

const LEVEL_PREFIX: &str = "[LV]";
const LEGACY_LEVEL_PREFIX: &str = "[CH]";
const REQUEST_PREFIX: &str = "[RE]";
const COMMAND_PREFIX: char = '/';
const RESERVED_TERM_PREFIX: &str = "part";

fn entry_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^([^/\s]+)(?:[ \u{3000}]+|/)([^/\s]+)(?:[ \u{3000}]+|/)(.+)$")
            .expect("vocabulary entry pattern is valid")
    })
}

fn number_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(\d+(\.\d+)?)").expect("level number pattern is valid"))
}

#[derive(Debug, Clone, PartialEq)]
pub enum LevelDirective {
    /// A named tier such as `n3`
    Tier { keyword: String, level: f64 },
    Literal(f64),
    /// Nothing recognizable; the content service assesses the learner
    Assess(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Classified {
    LevelOverride(LevelDirective),
    CustomRequest(String),
    Import(Vec<Value>),
    VocabularyEntry(VocabularyEntry),
    Submission(String),
    Ignored,
}

impl Classified {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::LevelOverride(_) => "level_override",
            Self::CustomRequest(_) => "custom_request",
            Self::Import(_) => "import",
            Self::VocabularyEntry(_) => "vocabulary_entry",
            Self::Submission(_) => "submission",
            Self::Ignored => "ignored",
        }
    }

    /// Directives and submissions are not replayed on a fresh start
    fn replays_on_fresh_start(&self) -> bool {
        matches!(self, Self::Import(_) | Self::VocabularyEntry(_))
    }
}

pub struct Classifier<'a> {
    config: &'a CoachConfig,
}

impl<'a> Classifier<'a> {
    pub fn new(config: &'a CoachConfig) -> Self {
        Self { config }
    }

    /// First matching rule wins.
    pub fn classify(&self, raw: &str) -> Classified {
        let text = normalize_brackets(raw.trim());
        if text.is_empty() {
            return Classified::Ignored;
        }

        if let Some(payload) = strip_prefix_ci(&text, LEVEL_PREFIX)
            .or_else(|| strip_prefix_ci(&text, LEGACY_LEVEL_PREFIX))
        {
            return Classified::LevelOverride(self.level_directive(payload.trim()));
        }

        if let Some(payload) = strip_prefix_ci(&text, REQUEST_PREFIX) {
            return Classified::CustomRequest(payload.trim().to_string());
        }

        if text.starts_with('[') {
            return match serde_json::from_str::<Value>(&text) {
                Ok(Value::Array(items)) => Classified::Import(items),
                _ => Classified::Ignored,
            };
        }

        if let Some(entry) = self.vocabulary_entry(&text) {
            return Classified::VocabularyEntry(entry);
        }

        if !text.starts_with(COMMAND_PREFIX) {
            return Classified::Submission(text);
        }

        Classified::Ignored
    }

    fn level_directive(&self, payload: &str) -> LevelDirective {
        let compact: String = payload
            .to_lowercase()
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect();

        if let Some(tier) = self.config.find_tier(&compact) {
            return LevelDirective::Tier {
                keyword: tier.keyword.clone(),
                level: tier.level,
            };
        }

        if let Some(level) = number_pattern()
            .captures(payload)
            .and_then(|caps| caps.get(1))
            .and_then(|m| m.as_str().parse::<f64>().ok())
        {
            return LevelDirective::Literal(level);
        }

        LevelDirective::Assess(payload.to_string())
    }

    fn vocabulary_entry(&self, text: &str) -> Option<VocabularyEntry> {
        if text.chars().count() >= self.config.entry_max_chars {
            return None;
        }
        let caps = entry_pattern().captures(text)?;
        let term = caps.get(1)?.as_str();
        if term.to_lowercase().starts_with(RESERVED_TERM_PREFIX) {
            return None;
        }
        Some(VocabularyEntry {
            term: term.to_string(),
            reading: caps.get(2)?.as_str().to_string(),
            meaning: caps.get(3)?.as_str().trim().to_string(),
            category: Category::infer_from_term(term),
        })
    }
}

fn strip_prefix_ci<'t>(text: &'t str, prefix: &str) -> Option<&'t str> {
    let head = text.get(..prefix.len())?;
    head.eq_ignore_ascii_case(prefix).then(|| &text[prefix.len()..])
}

#[derive(Debug, Clone, PartialEq)]
pub struct IngestEvent {
    pub id: i64,
    pub timestamp: i64,
    pub text: String,
    pub classified: Classified,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IngestOutcome {
    pub watermark: i64,
    pub fresh_start: bool,
    /// Classified events in id order, fresh-start suppressions removed
    pub events: Vec<IngestEvent>,
    /// Messages newer than the prior watermark
    pub seen: usize,
    pub suppressed: usize,
}

/// New watermark after observing `ids`; never moves backwards.
pub fn advance_watermark(watermark: i64, ids: impl IntoIterator<Item = i64>) -> i64 {
    ids.into_iter().fold(watermark, i64::max)
}

/// Drop replays, filter by origin, classify the rest in id order.
pub fn ingest(
    watermark: i64,
    batch: &[FeedMessage],
    origin: Option<&str>,
    classifier: &Classifier<'_>,
) -> IngestOutcome {
    let fresh_start = watermark == 0;
    let next_watermark = advance_watermark(watermark, batch.iter().map(|m| m.id));

    let mut fresh: Vec<&FeedMessage> = batch.iter().filter(|m| m.id > watermark).collect();
    fresh.sort_by_key(|m| m.id);
    fresh.dedup_by_key(|m| m.id);

    let mut outcome = IngestOutcome {
        watermark: next_watermark,
        fresh_start,
        events: Vec::new(),
        seen: fresh.len(),
        suppressed: 0,
    };

    for message in fresh {
        if origin.is_some_and(|expected| expected != message.origin_id) {
            debug!(id = message.id, origin = %message.origin_id, "message from other origin dropped");
            continue;
        }
        let classified = classifier.classify(&message.text);
        if classified == Classified::Ignored {
            continue;
        }
        if fresh_start && !classified.replays_on_fresh_start() {
            outcome.suppressed += 1;
            continue;
        }
        outcome.events.push(IngestEvent {
            id: message.id,
            timestamp: message.timestamp,
            text: normalize_brackets(message.text.trim()),
            classified,
        });
    }

    info!(
        watermark = outcome.watermark,
        seen = outcome.seen,
        events = outcome.events.len(),
        suppressed = outcome.suppressed,
        fresh_start,
        "feed ingested"
    );
    outcome
}
