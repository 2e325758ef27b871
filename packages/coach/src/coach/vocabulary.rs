//! Weight arithmetic over the vocabulary pool.

use std::collections::HashSet;

use chrono::NaiveDate;
use serde_json::Value;
use tracing::{debug, info};

use crate::coach::text::normalize_text;
use crate::coach::types::{Category, VocabularyEntry, VocabularyItem, VocabularyPool};

pub const REINFORCE_STEP: u32 = 1;
pub const MISTAKE_STEP: u32 = 2;
pub const MISTAKE_INITIAL_WEIGHT: u32 = 5;
pub const REWARD_STEP: u32 = 2;
pub const MIN_WEIGHT: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reinforcement {
    Reinforced { weight: u32 },
    Recorded,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportReport {
    pub added: usize,
    pub duplicates: usize,
    pub skipped: usize,
}

impl VocabularyPool {
    pub fn position(&self, term: &str) -> Option<usize> {
        let key = normalize_text(term);
        self.words.iter().position(|w| normalize_text(&w.term) == key)
    }

    pub fn get(&self, term: &str) -> Option<&VocabularyItem> {
        self.position(term).map(|idx| &self.words[idx])
    }

    pub fn reinforce_or_insert(&mut self, entry: VocabularyEntry, today: NaiveDate) -> Reinforcement {
        if let Some(idx) = self.position(&entry.term) {
            let item = &mut self.words[idx];
            item.weight = item.weight.saturating_add(REINFORCE_STEP);
            info!(term = %item.term, weight = item.weight, "vocabulary reinforced");
            return Reinforcement::Reinforced { weight: item.weight };
        }

        info!(term = %entry.term, category = entry.category.as_str(), "vocabulary recorded");
        self.words.push(VocabularyItem {
            term: entry.term,
            reading: entry.reading,
            meaning: entry.meaning,
            category: entry.category,
            weight: MIN_WEIGHT,
            added: Some(today),
        });
        Reinforcement::Recorded
    }

    /// Add unseen items with weight 1; entries without a term are skipped one by one.
    pub fn bulk_import(&mut self, items: &[Value], today: NaiveDate) -> ImportReport {
        let mut report = ImportReport::default();

        for raw in items {
            let Some(item) = import_item(raw, today) else {
                report.skipped += 1;
                continue;
            };
            if self.position(&item.term).is_some() {
                report.duplicates += 1;
                continue;
            }
            self.words.push(item);
            report.added += 1;
        }

        info!(
            added = report.added,
            duplicates = report.duplicates,
            skipped = report.skipped,
            "vocabulary import finished"
        );
        report
    }

    /// Returns the item's weight after the penalty.
    pub fn penalize_mistake(
        &mut self,
        term: &str,
        meaning: &str,
        category: Category,
        today: NaiveDate,
    ) -> u32 {
        if let Some(idx) = self.position(term) {
            let item = &mut self.words[idx];
            item.weight = item.weight.saturating_add(MISTAKE_STEP);
            item.category = category;
            debug!(term = %item.term, weight = item.weight, "mistake penalized");
            return item.weight;
        }

        debug!(term, "mistake recorded as new item");
        self.words.push(VocabularyItem {
            term: term.trim().to_string(),
            reading: String::new(),
            meaning: meaning.to_string(),
            category,
            weight: MISTAKE_INITIAL_WEIGHT,
            added: Some(today),
        });
        MISTAKE_INITIAL_WEIGHT
    }

    /// Lower the weight of every item used in `submission` and not in `excluded`.
    pub fn reward_correct_usage(&mut self, submission: &str, excluded: &HashSet<String>) -> Vec<String> {
        let haystack = normalize_text(submission);
        let mut rewarded = Vec::new();

        for item in &mut self.words {
            let key = normalize_text(&item.term);
            if key.is_empty() || excluded.contains(&key) || !haystack.contains(&key) {
                continue;
            }
            item.weight = item.weight.saturating_sub(REWARD_STEP).max(MIN_WEIGHT);
            rewarded.push(item.term.clone());
        }

        if !rewarded.is_empty() {
            debug!(count = rewarded.len(), "correct usage rewarded");
        }
        rewarded
    }

    /// Clamp weights loaded from disk back to the floor.
    pub fn enforce_weight_floor(&mut self) -> usize {
        let mut fixed = 0;
        for item in &mut self.words {
            if item.weight < MIN_WEIGHT {
                item.weight = MIN_WEIGHT;
                fixed += 1;
            }
        }
        fixed
    }
}

fn field<'v>(obj: &'v serde_json::Map<String, Value>, keys: &[&str]) -> Option<&'v str> {
    keys.iter().find_map(|k| obj.get(*k).and_then(Value::as_str))
}

fn import_item(raw: &Value, today: NaiveDate) -> Option<VocabularyItem> {
    let obj = raw.as_object()?;
    let term = field(obj, &["term", "kanji"])?.trim();
    if term.is_empty() {
        return None;
    }
    let category = field(obj, &["category", "type"])
        .map(Category::parse)
        .unwrap_or_default();

    Some(VocabularyItem {
        term: term.to_string(),
        reading: field(obj, &["reading", "kana"]).unwrap_or_default().to_string(),
        meaning: field(obj, &["meaning"]).unwrap_or_default().to_string(),
        category,
        weight: MIN_WEIGHT,
        added: Some(today),
    })
}
