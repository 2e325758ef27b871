use std::future::Future;

use renshu_algo::PaceReport;
use thiserror::Error;

use crate::coach::difficulty::RolloverOutcome;
use crate::coach::types::QuizSession;
use crate::services::llm_provider::LLMError;

#[derive(Debug, Error)]
pub enum ContentError {
    #[error("content service unavailable: {0}")]
    Unavailable(String),
    #[error("provider error: {0}")]
    Provider(#[from] LLMError),
    #[error("empty reply")]
    Empty,
}

/// Everything a quiz generator needs besides the items themselves
#[derive(Debug, Clone, PartialEq)]
pub struct SessionBrief {
    pub session: QuizSession,
    pub rollover: Option<RolloverOutcome>,
    pub pace: PaceReport,
    pub sprint_days: u32,
    pub main_quota: u32,
    pub execution_count: u32,
    pub streak_days: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ContentRequest {
    Grade {
        submissions: Vec<String>,
        history: Vec<String>,
        progress: String,
    },
    CustomRequest {
        request: String,
        productive: f64,
        receptive: f64,
    },
    AssessLevel {
        history: Vec<String>,
        request: String,
    },
    DailyQuiz(SessionBrief),
    BonusQuiz(SessionBrief),
}

impl ContentRequest {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Grade { .. } => "grade",
            Self::CustomRequest { .. } => "custom_request",
            Self::AssessLevel { .. } => "assess_level",
            Self::DailyQuiz(_) => "daily_quiz",
            Self::BonusQuiz(_) => "bonus_quiz",
        }
    }
}

/// Produces grading prose, coach replies, level assessments and quizzes.
pub trait ContentService: Send + Sync {
    fn generate(&self, request: &ContentRequest) -> impl Future<Output = Result<String, ContentError>> + Send;
}
