//! One invocation end to end: ingest, grade, roll over, select, generate.

use chrono::NaiveDate;
use renshu_algo::session_rng;
use serde::Serialize;
use thiserror::Error;
use tracing::{info, instrument, warn};

use crate::coach::config::CoachConfig;
use crate::coach::difficulty::{DifficultyController, RolloverOutcome};
use crate::coach::feedback::{apply_verdict, FeedbackReport};
use crate::coach::ingest::{ingest, Classified, Classifier, IngestEvent, LevelDirective};
use crate::coach::session::{build_session, split_answer_sheet};
use crate::coach::text::{count_answer_lines, excerpt};
use crate::coach::transcript::{MessageKind, OutboundMessage, Outbox, Role, Transcript};
use crate::coach::types::{LearnerState, SessionMode, VocabularyPool};
use crate::coach::vocabulary::Reinforcement;
use crate::coach::verdict::{decode_bare, decode_fenced, ActionBlock, Decoded, LevelAssessment, Verdict};
use crate::services::content::{ContentRequest, ContentService, SessionBrief};
use crate::services::feed::{Feed, FeedError};

pub const EMPTY_POOL_NOTICE: &str =
    "The vocabulary pool is empty. Send a word as \"term reading meaning\" or import a JSON list.";
pub const QUIZ_FALLBACK_NOTICE: &str = "Quiz generation failed, please try again later.";
pub const BONUS_FALLBACK_NOTICE: &str = "Bonus quiz generation failed, please try again later.";
pub const GRADING_FALLBACK_NOTICE: &str = "Grading is unavailable right now; your answers were recorded.";

/// The two persisted documents, owned by the engine for one cycle
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Documents {
    pub pool: VocabularyPool,
    pub state: LearnerState,
}

#[derive(Debug, Error)]
pub enum CycleError {
    #[error("feed unavailable: {0}")]
    Feed(#[from] FeedError),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CycleReport {
    pub watermark_before: i64,
    pub watermark_after: i64,
    pub fresh_start: bool,
    pub seen: usize,
    pub events: usize,
    pub submissions: usize,
    pub answers: u32,
    pub mode: Option<SessionMode>,
    pub rollover: Option<RolloverOutcome>,
    pub feedback: Option<FeedbackReport>,
    pub session_generated: bool,
}

#[derive(Debug, Clone)]
pub struct CycleOutcome {
    pub documents: Documents,
    pub outbox: Vec<OutboundMessage>,
    pub transcript: Transcript,
    pub report: CycleReport,
}

pub struct CycleEngine<F, C> {
    feed: F,
    content: C,
    config: CoachConfig,
    origin: Option<String>,
}

/// Mutable working set threaded through the cycle steps
struct Cycle<'a> {
    today: NaiveDate,
    pool: VocabularyPool,
    state: LearnerState,
    outbox: Outbox,
    transcript: Transcript,
    report: CycleReport,
    submissions: Vec<String>,
    controller: DifficultyController<'a>,
}

impl<F: Feed, C: ContentService> CycleEngine<F, C> {
    pub fn new(feed: F, content: C, config: CoachConfig, origin: Option<String>) -> Self {
        Self {
            feed,
            content,
            config,
            origin,
        }
    }

    pub fn config(&self) -> &CoachConfig {
        &self.config
    }

    pub fn feed(&self) -> &F {
        &self.feed
    }

    pub fn content(&self) -> &C {
        &self.content
    }

    #[instrument(skip_all, fields(%today))]
    pub async fn run_cycle(&self, documents: Documents, today: NaiveDate) -> Result<CycleOutcome, CycleError> {
        let messages = self.feed.fetch(documents.state.last_update_id).await?;

        let Documents { pool, mut state } = documents;
        if state.sprint_start.is_none() {
            state.sprint_start = Some(today);
        }

        let mut cycle = Cycle {
            today,
            pool,
            report: CycleReport {
                watermark_before: state.last_update_id,
                ..CycleReport::default()
            },
            state,
            outbox: Outbox::default(),
            transcript: Transcript::default(),
            submissions: Vec::new(),
            controller: DifficultyController::new(&self.config),
        };

        let classifier = Classifier::new(&self.config);
        let ingested = ingest(cycle.state.last_update_id, &messages, self.origin.as_deref(), &classifier);
        cycle.state.last_update_id = ingested.watermark;
        cycle.report.watermark_after = ingested.watermark;
        cycle.report.fresh_start = ingested.fresh_start;
        cycle.report.seen = ingested.seen;
        cycle.report.events = ingested.events.len();

        if ingested.fresh_start {
            cycle.transcript.push(
                Role::System,
                format!("Fresh start: {} directives and submissions not replayed", ingested.suppressed),
            );
        }
        for event in ingested.events {
            self.apply_event(&mut cycle, event).await;
        }
        if ingested.seen == 0 {
            cycle.transcript.push(Role::System, "No new user messages found.");
        } else {
            cycle.transcript.push(Role::System, format!("Processed {} new messages.", ingested.seen));
        }

        self.account_answers(&mut cycle);
        self.grade(&mut cycle).await;
        self.run_session(&mut cycle).await;

        info!(
            watermark = cycle.report.watermark_after,
            events = cycle.report.events,
            submissions = cycle.report.submissions,
            mode = ?cycle.report.mode,
            generated = cycle.report.session_generated,
            "cycle finished"
        );

        Ok(CycleOutcome {
            documents: Documents {
                pool: cycle.pool,
                state: cycle.state,
            },
            outbox: cycle.outbox.into_messages(),
            transcript: cycle.transcript,
            report: cycle.report,
        })
    }

    async fn apply_event(&self, cycle: &mut Cycle<'_>, event: IngestEvent) {
        cycle
            .transcript
            .push(Role::User, format!("{} (id {})", event.text, event.id));

        match event.classified {
            Classified::LevelOverride(directive) => self.apply_level_directive(cycle, directive).await,
            Classified::CustomRequest(request) => self.handle_custom_request(cycle, request).await,
            Classified::Import(items) => {
                let report = cycle.pool.bulk_import(&items, cycle.today);
                cycle.outbox.notice(format!("Imported {} new items", report.added));
            }
            Classified::VocabularyEntry(entry) => {
                let term = entry.term.clone();
                let category = entry.category;
                match cycle.pool.reinforce_or_insert(entry, cycle.today) {
                    Reinforcement::Reinforced { .. } => cycle.outbox.notice(format!("Reinforced: {term}")),
                    Reinforcement::Recorded => {
                        cycle.outbox.notice(format!("Recorded ({}): {term}", category.as_str()))
                    }
                }
            }
            Classified::Submission(text) => {
                cycle.report.answers += count_answer_lines(&text);
                let entry = format!("{}: {}", cycle.today, excerpt(&text, self.config.excerpt_chars));
                cycle.state.history.push(entry, self.config.history_capacity);
                cycle.submissions.push(text);
            }
            Classified::Ignored => {}
        }
    }

    async fn apply_level_directive(&self, cycle: &mut Cycle<'_>, directive: LevelDirective) {
        let (level, message) = match directive {
            LevelDirective::Tier { keyword, level } => (
                Some(level),
                format!("Difficulty set to {} (Lv {level:.1}) as requested.", keyword.to_uppercase()),
            ),
            LevelDirective::Literal(level) => (Some(level), format!("Difficulty set to Lv {level:.1} as requested.")),
            LevelDirective::Assess(request) => {
                cycle.transcript.push(Role::Content, "Running level assessment");
                let history = cycle.state.history.recent(self.config.assessment_history, 0);
                let reply = self
                    .content
                    .generate(&ContentRequest::AssessLevel { history, request })
                    .await;
                match reply.map(|text| decode_bare::<LevelAssessment>(&text)) {
                    Ok(Decoded::Structured { value, .. }) => {
                        let level = value.new_difficulty;
                        (Some(level), format!("Assessment complete: Lv {level:.1}.\nReason: {}", value.reason))
                    }
                    Ok(Decoded::Missing) | Ok(Decoded::Malformed { .. }) => {
                        warn!("level assessment reply could not be decoded");
                        cycle.transcript.push(Role::Warning, "Level assessment reply undecodable");
                        (None, String::new())
                    }
                    Err(e) => {
                        warn!(error = %e, "level assessment failed");
                        cycle.transcript.push(Role::Warning, format!("Level assessment failed: {e}"));
                        (None, String::new())
                    }
                }
            }
        };

        let Some(level) = level else {
            return;
        };
        match cycle.controller.apply_level(&mut cycle.state, level) {
            Some(applied) => {
                cycle.transcript.push(Role::Adjust, format!("Both tracks set to {applied:.2}"));
                cycle.outbox.notice(message);
            }
            None => {
                warn!(level, "non-finite level rejected");
                cycle.transcript.push(Role::Warning, "Non-finite level rejected");
            }
        }
    }

    async fn handle_custom_request(&self, cycle: &mut Cycle<'_>, request: String) {
        cycle.transcript.push(Role::Content, format!("Custom request: {request}"));
        let reply = self
            .content
            .generate(&ContentRequest::CustomRequest {
                request,
                productive: cycle.state.productive,
                receptive: cycle.state.receptive,
            })
            .await;

        let reply = match reply {
            Ok(reply) => reply,
            Err(e) => {
                warn!(error = %e, "custom request failed");
                cycle.transcript.push(Role::Warning, format!("Custom request failed: {e}"));
                cycle.outbox.notice("The coach could not answer your request right now.");
                return;
            }
        };

        let prose = match decode_fenced::<ActionBlock>(&reply) {
            Decoded::Structured { prose, value } => {
                if let Some(actions) = value.actions {
                    if cycle.controller.apply_adjustment(&mut cycle.state, actions.adjust_difficulty) {
                        cycle.transcript.push(
                            Role::Adjust,
                            format!("Difficulty adjusted by {}", actions.adjust_difficulty),
                        );
                    }
                    let instruction = actions.quiz_instruction.trim();
                    if !instruction.is_empty() {
                        cycle.state.next_quiz_instruction = instruction.to_string();
                        cycle
                            .transcript
                            .push(Role::Adjust, format!("Next quiz instruction set: {instruction}"));
                    }
                }
                prose
            }
            Decoded::Missing => reply,
            Decoded::Malformed { reason } => {
                warn!(%reason, "custom request action block malformed");
                cycle.transcript.push(Role::Warning, format!("Action block malformed: {reason}"));
                reply
            }
        };
        cycle.outbox.notice(format!("Coach reply:\n{prose}"));
    }

    /// Fill the main quota first, overflow into bonus answers.
    fn account_answers(&self, cycle: &mut Cycle<'_>) {
        let answers = cycle.report.answers;
        if answers == 0 {
            return;
        }
        let remaining = self.config.main_quota.saturating_sub(cycle.state.main_answers);
        let to_main = answers.min(remaining);
        cycle.state.main_answers += to_main;
        cycle.state.bonus_answers = cycle.state.bonus_answers.saturating_add(answers - to_main);
        cycle.transcript.push(
            Role::System,
            format!(
                "Counted {answers} answers (main {}/{}, bonus {})",
                cycle.state.main_answers, self.config.main_quota, cycle.state.bonus_answers
            ),
        );
    }

    async fn grade(&self, cycle: &mut Cycle<'_>) {
        cycle.report.submissions = cycle.submissions.len();
        if cycle.submissions.is_empty() {
            return;
        }

        let history = cycle
            .state
            .history
            .recent(self.config.grading_history, cycle.submissions.len());
        let progress = if cycle.state.bonus_answers > 0 {
            format!("bonus challenge, {} bonus answers so far", cycle.state.bonus_answers)
        } else {
            format!("main {}/{}", cycle.state.main_answers, self.config.main_quota)
        };
        let submissions = std::mem::take(&mut cycle.submissions);
        let combined = submissions.join("\n\n");
        let count = submissions.len();

        cycle.transcript.push(Role::Content, format!("Grading {count} submissions ({progress})"));
        let reply = self
            .content
            .generate(&ContentRequest::Grade { submissions, history, progress })
            .await;

        let reply = match reply {
            Ok(reply) => reply,
            Err(e) => {
                warn!(error = %e, "grading failed");
                cycle.transcript.push(Role::Warning, format!("Grading failed: {e}"));
                cycle.outbox.push(MessageKind::Fallback, GRADING_FALLBACK_NOTICE);
                return;
            }
        };

        let body = match decode_fenced::<Verdict>(&reply) {
            Decoded::Structured { prose, value } => {
                let report = apply_verdict(
                    &value,
                    &combined,
                    &mut cycle.pool,
                    &mut cycle.state,
                    &cycle.controller,
                    cycle.today,
                );
                for (term, weight) in &report.penalized {
                    cycle.outbox.notice(format!("Weak point marked (weight {weight}): {term}"));
                }
                let body = match report.summary() {
                    Some(summary) => format!("{prose}\n\n{summary}"),
                    None => prose,
                };
                cycle.report.feedback = Some(report);
                body
            }
            Decoded::Missing => {
                warn!("grading reply carried no verdict");
                cycle.transcript.push(Role::Warning, "Grading reply carried no verdict");
                reply
            }
            Decoded::Malformed { reason } => {
                warn!(%reason, "grading verdict malformed");
                cycle.transcript.push(Role::Warning, format!("Verdict malformed: {reason}"));
                reply
            }
        };
        cycle
            .outbox
            .push(MessageKind::Grading, format!("Graded {count} submissions:\n{body}"));
    }

    async fn run_session(&self, cycle: &mut Cycle<'_>) {
        if cycle.pool.is_empty() {
            cycle.outbox.push(MessageKind::Notice, EMPTY_POOL_NOTICE);
            cycle.transcript.push(Role::System, "Empty pool, no session");
            return;
        }

        // Rollover and the new answer sheet land only once a quiz is in hand
        let mode = DifficultyController::resolve_mode(&cycle.state, cycle.today);
        cycle.report.mode = Some(mode);
        let mut staged = cycle.state.clone();
        let rollover = match mode {
            SessionMode::Daily => cycle.controller.rollover(&mut staged, cycle.today),
            SessionMode::Bonus => None,
        };

        let mut rng = session_rng(self.config.selection_seed);
        let Some(session) = build_session(&cycle.pool, &staged, mode, &self.config, &mut rng) else {
            return;
        };
        let brief = SessionBrief {
            session,
            rollover,
            pace: cycle.controller.sprint_status(&staged, cycle.today),
            sprint_days: self.config.sprint.duration_days,
            main_quota: self.config.main_quota,
            execution_count: staged.execution_count,
            streak_days: staged.streak_days,
        };
        cycle.transcript.push(
            Role::Content,
            format!(
                "Generating {} quiz (productive Lv {:.1}, receptive Lv {:.1})",
                mode.as_str(),
                brief.session.productive_level,
                brief.session.receptive_level
            ),
        );

        let request = match mode {
            SessionMode::Daily => ContentRequest::DailyQuiz(brief),
            SessionMode::Bonus => ContentRequest::BonusQuiz(brief),
        };
        let generated = match self.content.generate(&request).await {
            Ok(reply) => split_answer_sheet(&reply),
            Err(e) => {
                warn!(error = %e, mode = mode.as_str(), "quiz generation failed");
                cycle.transcript.push(Role::Warning, format!("Quiz generation failed: {e}"));
                None
            }
        };

        let Some((questions, answers)) = generated else {
            let notice = match mode {
                SessionMode::Daily => QUIZ_FALLBACK_NOTICE,
                SessionMode::Bonus => BONUS_FALLBACK_NOTICE,
            };
            cycle.outbox.push(MessageKind::Fallback, notice);
            return;
        };

        let previous = std::mem::replace(&mut staged.pending_answers, answers);
        if !previous.is_empty() {
            cycle
                .outbox
                .push(MessageKind::AnswerSheet, format!("Answer sheet for the previous quiz\n\n{previous}"));
        }
        cycle.outbox.push(MessageKind::Quiz, questions);
        if mode == SessionMode::Daily {
            staged.next_quiz_instruction.clear();
        }
        cycle.state = staged;
        cycle.report.rollover = rollover;
        cycle.report.session_generated = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use crate::coach::types::FeedMessage;
    use crate::services::content::ContentError;

    struct StaticFeed(Vec<FeedMessage>);

    impl Feed for StaticFeed {
        async fn fetch(&self, _watermark: i64) -> Result<Vec<FeedMessage>, FeedError> {
            Ok(self.0.clone())
        }
    }

    #[derive(Default)]
    struct EchoContent {
        kinds: Mutex<Vec<&'static str>>,
    }

    impl ContentService for EchoContent {
        async fn generate(&self, request: &ContentRequest) -> Result<String, ContentError> {
            self.kinds.lock().unwrap().push(request.kind());
            match request {
                ContentRequest::AssessLevel { .. } => Ok(r#"{"newDifficulty": 2.7, "reason": "solid"}"#.into()),
                ContentRequest::CustomRequest { .. } => Ok(
                    "Fine.\n```json\n{\"actions\":{\"adjustDifficulty\":-0.5,\"quizInstruction\":\"keigo\"}}\n```".into(),
                ),
                _ => Ok("questions|||SEPARATOR|||answers".into()),
            }
        }
    }

    fn msg(id: i64, text: &str) -> FeedMessage {
        FeedMessage {
            id,
            timestamp: 0,
            origin_id: "1".into(),
            text: text.into(),
        }
    }

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 7, 1).unwrap()
    }

    fn seeded_config() -> CoachConfig {
        CoachConfig {
            selection_seed: Some(11),
            ..CoachConfig::default()
        }
    }

    fn warm_state() -> LearnerState {
        LearnerState {
            last_update_id: 10,
            productive: 3.0,
            receptive: 3.0,
            last_quiz_date: NaiveDate::from_ymd_opt(2025, 6, 30),
            ..LearnerState::default()
        }
    }

    #[tokio::test]
    async fn test_assessment_directive_sets_both_tracks() {
        let engine = CycleEngine::new(
            StaticFeed(vec![msg(11, "[LV]"), msg(12, "猫 ねこ cat")]),
            EchoContent::default(),
            seeded_config(),
            Some("1".into()),
        );
        let documents = Documents { pool: VocabularyPool::default(), state: warm_state() };
        let outcome = engine.run_cycle(documents, day()).await.unwrap();

        assert_eq!(outcome.documents.state.receptive, 2.7);
        assert!(outcome.outbox[0].text.contains("Assessment complete: Lv 2.7"));
        assert!(outcome.outbox[0].text.contains("Recorded (word): 猫"));
        assert_eq!(outcome.documents.pool.len(), 1);
    }

    #[tokio::test]
    async fn test_custom_request_applies_actions_and_instruction_is_consumed() {
        let content = EchoContent::default();
        let engine = CycleEngine::new(
            StaticFeed(vec![msg(11, "[RE] too hard"), msg(12, "猫 ねこ cat")]),
            content,
            seeded_config(),
            None,
        );
        let documents = Documents { pool: VocabularyPool::default(), state: warm_state() };
        let outcome = engine.run_cycle(documents, day()).await.unwrap();
        let state = &outcome.documents.state;

        assert_eq!(state.receptive, 2.5);
        assert!(state.next_quiz_instruction.is_empty());
        assert_eq!(state.pending_answers, "answers");
        assert!(outcome.outbox[0].text.contains("Coach reply:\nFine."));
        assert_eq!(
            *engine.content().kinds.lock().unwrap(),
            vec!["custom_request", "daily_quiz"]
        );
    }

    #[tokio::test]
    async fn test_empty_pool_skips_session_and_rollover() {
        let engine = CycleEngine::new(StaticFeed(Vec::new()), EchoContent::default(), seeded_config(), None);
        let documents = Documents { pool: VocabularyPool::default(), state: warm_state() };
        let outcome = engine.run_cycle(documents, day()).await.unwrap();

        assert_eq!(outcome.outbox.len(), 1);
        assert_eq!(outcome.outbox[0].text, EMPTY_POOL_NOTICE);
        assert_eq!(outcome.documents.state.last_quiz_date, NaiveDate::from_ymd_opt(2025, 6, 30));
        assert!(outcome.report.mode.is_none());
    }
}
