#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use chrono::NaiveDate;

use renshu_coach::coach::types::{Category, FeedMessage, VocabularyItem, VocabularyPool};
use renshu_coach::coach::CoachConfig;
use renshu_coach::services::content::{ContentError, ContentRequest, ContentService};
use renshu_coach::services::feed::{Feed, FeedError};
use renshu_coach::services::sink::{Sink, SinkError};

pub const ORIGIN: &str = "777";
pub const QUIZ_REPLY: &str = "Q1 ... Q10\n|||SEPARATOR|||\nA1 ... A10";

pub fn message(id: i64, text: &str) -> FeedMessage {
    FeedMessage {
        id,
        timestamp: 1_735_689_600 + id,
        origin_id: ORIGIN.to_string(),
        text: text.to_string(),
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn test_config() -> CoachConfig {
    CoachConfig {
        selection_seed: Some(42),
        send_delay_ms: 0,
        answer_sheet_delay_ms: 0,
        ..CoachConfig::default()
    }
}

pub fn item(term: &str, weight: u32) -> VocabularyItem {
    VocabularyItem {
        term: term.to_string(),
        reading: String::new(),
        meaning: format!("meaning of {term}"),
        category: Category::Word,
        weight,
        added: Some(date(2025, 1, 1)),
    }
}

pub fn sample_pool(terms: &[(&str, u32)]) -> VocabularyPool {
    VocabularyPool {
        words: terms.iter().map(|&(term, weight)| item(term, weight)).collect(),
    }
}

/// Returns the same batch on every fetch, ignoring the watermark
pub struct ScriptedFeed {
    batch: Mutex<Vec<FeedMessage>>,
    watermarks: Mutex<Vec<i64>>,
    fail: bool,
}

impl ScriptedFeed {
    pub fn new(batch: Vec<FeedMessage>) -> Self {
        Self { batch: Mutex::new(batch), watermarks: Mutex::default(), fail: false }
    }

    pub fn failing() -> Self {
        Self { batch: Mutex::new(Vec::new()), watermarks: Mutex::default(), fail: true }
    }

    /// Watermark passed to each fetch, in call order
    pub fn watermarks(&self) -> Vec<i64> {
        self.watermarks.lock().unwrap().clone()
    }

    pub fn replace(&self, batch: Vec<FeedMessage>) {
        *self.batch.lock().unwrap() = batch;
    }
}

impl Feed for ScriptedFeed {
    async fn fetch(&self, watermark: i64) -> Result<Vec<FeedMessage>, FeedError> {
        self.watermarks.lock().unwrap().push(watermark);
        if self.fail {
            return Err(FeedError::Unavailable("scripted outage".into()));
        }
        Ok(self.batch.lock().unwrap().clone())
    }
}

/// Replies from a per-kind queue; falls back to a default reply per kind
#[derive(Default)]
pub struct ScriptedContent {
    grade: Mutex<VecDeque<Result<String, String>>>,
    quiz: Mutex<VecDeque<Result<String, String>>>,
    requests: Mutex<Vec<ContentRequest>>,
}

impl ScriptedContent {
    pub fn push_grade(&self, reply: Result<&str, &str>) {
        self.grade.lock().unwrap().push_back(reply.map(str::to_string).map_err(str::to_string));
    }

    pub fn push_quiz(&self, reply: Result<&str, &str>) {
        self.quiz.lock().unwrap().push_back(reply.map(str::to_string).map_err(str::to_string));
    }

    pub fn kinds(&self) -> Vec<&'static str> {
        self.requests.lock().unwrap().iter().map(ContentRequest::kind).collect()
    }

    pub fn requests(&self) -> Vec<ContentRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl ContentService for ScriptedContent {
    async fn generate(&self, request: &ContentRequest) -> Result<String, ContentError> {
        self.requests.lock().unwrap().push(request.clone());
        let scripted = match request {
            ContentRequest::Grade { .. } => self.grade.lock().unwrap().pop_front(),
            ContentRequest::DailyQuiz(_) | ContentRequest::BonusQuiz(_) => self.quiz.lock().unwrap().pop_front(),
            _ => None,
        };
        match scripted {
            Some(Ok(reply)) => Ok(reply),
            Some(Err(reason)) => Err(ContentError::Unavailable(reason)),
            None => match request {
                ContentRequest::Grade { .. } => Ok("Looks fine.".to_string()),
                ContentRequest::AssessLevel { .. } => Ok(r#"{"newDifficulty": 2.0, "reason": "ok"}"#.to_string()),
                ContentRequest::CustomRequest { .. } => Ok("Noted.".to_string()),
                _ => Ok(QUIZ_REPLY.to_string()),
            },
        }
    }
}

#[derive(Default)]
pub struct RecordingSink {
    pub sent: Mutex<Vec<String>>,
    delay: Duration,
}

impl RecordingSink {
    /// Takes `millis` per message, like a rate-limited chat API
    pub fn slow(millis: u64) -> Self {
        Self {
            sent: Mutex::default(),
            delay: Duration::from_millis(millis),
        }
    }

    pub fn messages(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }
}

impl Sink for RecordingSink {
    async fn send(&self, text: &str) -> Result<(), SinkError> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.sent.lock().unwrap().push(text.to_string());
        Ok(())
    }
}
