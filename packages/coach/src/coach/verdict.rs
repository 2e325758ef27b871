//! Best-effort decoding of structured blocks embedded in content-service replies.

use std::sync::OnceLock;

use regex::Regex;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::coach::types::{AssessmentResult, Category};

fn fenced_block() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?s)```json\s*(\{.*?\})\s*```").expect("fenced block pattern is valid"))
}

#[derive(Debug, Clone, PartialEq)]
pub enum Decoded<T> {
    /// Block found and decoded; `prose` is the reply with the block removed
    Structured { prose: String, value: T },
    Missing,
    Malformed { reason: String },
}

impl<T> Decoded<T> {
    pub fn value(&self) -> Option<&T> {
        match self {
            Self::Structured { value, .. } => Some(value),
            _ => None,
        }
    }
}

/// Decode the first fenced ```json block of `reply`.
pub fn decode_fenced<T: DeserializeOwned>(reply: &str) -> Decoded<T> {
    let Some(found) = fenced_block().captures(reply) else {
        return Decoded::Missing;
    };
    let (Some(whole), Some(body)) = (found.get(0), found.get(1)) else {
        return Decoded::Missing;
    };
    match serde_json::from_str::<T>(body.as_str()) {
        Ok(value) => {
            let prose = format!("{}{}", &reply[..whole.start()], &reply[whole.end()..]);
            Decoded::Structured {
                prose: prose.trim().to_string(),
                value,
            }
        }
        Err(e) => Decoded::Malformed { reason: e.to_string() },
    }
}

/// Decode a reply that should be a bare JSON object, tolerating stray code fences.
pub fn decode_bare<T: DeserializeOwned>(reply: &str) -> Decoded<T> {
    let cleaned = reply.replace("```json", "").replace("```", "");
    let trimmed = cleaned.trim();
    let (Some(start), Some(end)) = (trimmed.find('{'), trimmed.rfind('}')) else {
        return Decoded::Missing;
    };
    if end < start {
        return Decoded::Missing;
    }
    match serde_json::from_str::<T>(&trimmed[start..=end]) {
        Ok(value) => Decoded::Structured {
            prose: String::new(),
            value,
        },
        Err(e) => Decoded::Malformed { reason: e.to_string() },
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mistake {
    #[serde(default)]
    pub term: String,
    #[serde(alias = "type", default)]
    pub category: Option<Category>,
    #[serde(default)]
    pub meaning: Option<String>,
}

/// Grading payload returned alongside the prose feedback
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    #[serde(default)]
    pub mistakes: Vec<Mistake>,
    #[serde(default)]
    pub assessments: Vec<AssessmentResult>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Actions {
    #[serde(alias = "adjust_difficulty", default)]
    pub adjust_difficulty: f64,
    #[serde(alias = "quiz_instruction", default)]
    pub quiz_instruction: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActionBlock {
    #[serde(default)]
    pub actions: Option<Actions>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelAssessment {
    #[serde(alias = "new_difficulty")]
    pub new_difficulty: f64,
    #[serde(default)]
    pub reason: String,
}
