//! Prompt text for each content request kind.

use std::fmt::Write;

use crate::coach::difficulty::{describe_level, pace_summary, RolloverOutcome, RolloverStep};
use crate::coach::session::ANSWER_SEPARATOR;
use crate::coach::types::{Category, SessionMode};
use crate::services::content::{ContentRequest, SessionBrief};

pub const SYSTEM_PROMPT: &str = "You are a strict but caring Japanese coach preparing a learner for the JLPT. \
Write plain text for a chat client: no markdown headings, no HTML tags, emoji are fine as section markers.";

const NO_HISTORY: &str = "(no history yet)";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub user: String,
}

pub fn render(request: &ContentRequest) -> Prompt {
    let user = match request {
        ContentRequest::Grade { submissions, history, progress } => grade(submissions, history, progress),
        ContentRequest::CustomRequest { request, productive, receptive } => {
            custom_request(request, *productive, *receptive)
        }
        ContentRequest::AssessLevel { history, request } => assess_level(history, request),
        ContentRequest::DailyQuiz(brief) | ContentRequest::BonusQuiz(brief) => quiz(brief),
    };
    Prompt { user }
}

fn history_block(history: &[String]) -> String {
    if history.is_empty() {
        NO_HISTORY.to_string()
    } else {
        history.join("\n")
    }
}

fn grade(submissions: &[String], history: &[String], progress: &str) -> String {
    format!(
        "The learner just sent these translation answers:\n\"{answers}\"\n\n\
Recent history:\n{history}\n\n\
Progress: {progress}\n\n\
Grade every sentence: point out grammar and particle errors, suggest a more natural phrasing, \
and praise good word choices. Then append one fenced block:\n\
```json\n\
{{\"mistakes\": [{{\"term\": \"...\", \"category\": \"word|grammar\", \"meaning\": \"...\"}}],\n \
\"assessments\": [{{\"input\": \"...\", \"direction\": \"PRODUCTIVE|RECEPTIVE\", \"score\": 0-10, \"status\": \"ATTEMPTED|SKIPPED\"}}]}}\n\
```\n\
List under mistakes only the words or grammar the learner actually got wrong. \
Mark an answer SKIPPED when the learner clearly did not try it.",
        answers = submissions.join("\n\n"),
        history = history_block(history),
    )
}

fn custom_request(request: &str, productive: f64, receptive: f64) -> String {
    format!(
        "The learner sent a custom request:\n\"{request}\"\n\n\
Current levels: productive Lv {productive:.1}, receptive Lv {receptive:.1}.\n\n\
Reply in character, improvising rather than using a template. Finish with one fenced block:\n\
```json\n\
{{\"actions\": {{\"adjustDifficulty\": 0.0, \"quizInstruction\": \"\"}}}}\n\
```\n\
adjustDifficulty is a signed float (suggest -0.2 to -0.5 when the learner finds it too hard, 0 for no change). \
quizInstruction is an extra instruction for the next daily quiz, or an empty string."
    )
}

fn assess_level(history: &[String], request: &str) -> String {
    let mut prompt = format!(
        "The learner asked for a re-assessment of their level.\n\nTranslation history:\n{}\n\n",
        history_block(history)
    );
    if !request.trim().is_empty() {
        let _ = writeln!(prompt, "Their note: \"{request}\"\n");
    }
    prompt.push_str(
        "Scale: Lv1 N5, Lv2 N4, Lv3 N3, Lv4 N2, Lv5 N1, Lv6+ native or specialist.\n\
Weigh particle accuracy, verb conjugation and sentence variety more than vocabulary size. \
Reply with JSON only: {\"newDifficulty\": 2.5, \"reason\": \"one or two sentences in the coach's voice\"}",
    );
    prompt
}

fn mood(rollover: Option<&RolloverOutcome>, quota: u32) -> String {
    let Some(outcome) = rollover else {
        return "Same-day session.".to_string();
    };
    let main = outcome.yesterday_main;
    match outcome.step {
        RolloverStep::Greeting => {
            "This is your first meeting with the learner. Introduce yourself and the routine: \
a quiz every day, reviewed the next day."
                .to_string()
        }
        RolloverStep::Promoted { to, .. } if outcome.yesterday_bonus > 0 => format!(
            "Yesterday: main {main}/{quota} plus {} bonus answers. Outstanding discipline, praise it. Productive level is now Lv {to:.1}.",
            outcome.yesterday_bonus
        ),
        RolloverStep::Promoted { to, .. } => {
            format!("Yesterday: main {main}/{quota}. Excellent, acknowledge it. Productive level is now Lv {to:.1}.")
        }
        RolloverStep::Held { pacing_warning: Some(_) } => format!(
            "Yesterday: main {main}/{quota}. Acceptable, but the sprint is behind plan; tell the learner to speed up."
        ),
        RolloverStep::Held { pacing_warning: None } => format!("Yesterday: main {main}/{quota}. Fine, keep it up."),
        RolloverStep::Demoted { to, .. } => format!(
            "Yesterday: main {main}/{quota}. The learner slacked off. Tease them with humour and cite the sprint status. Productive level dropped to Lv {to:.1}."
        ),
    }
}

fn quiz(brief: &SessionBrief) -> String {
    let session = &brief.session;
    let mut word_list = String::new();
    for item in &session.items {
        let marker = if session.must_review.iter().any(|w| w.term == item.term) { " [weak]" } else { "" };
        let tag = if item.category == Category::Grammar { " (grammar)" } else { "" };
        let _ = writeln!(word_list, "{} ({}){tag}{marker}", item.term, item.meaning);
    }
    let must_review: Vec<&str> = session.must_review.iter().map(|w| w.term.as_str()).collect();
    let mix = session.mix;

    let mut prompt = match session.mode {
        SessionMode::Daily => {
            let (productive_desc, _) = describe_level(session.productive_level);
            let (receptive_desc, _) = describe_level(session.receptive_level);
            format!(
                "{pace}\n{mood}\nMention that this is training session #{exec} (day {streak} of the streak).\n\n\
Today's vocabulary:\n{word_list}\n\
Write {total} translation questions:\n\
1. {p} productive questions at Lv {pl:.1} ({productive_desc}), covering these weak items: {weak}.\n\
2. {r} receptive questions at Lv {rl:.1} ({receptive_desc}).\n\
Grammar items must appear in Japanese, never only by their meaning.\n",
                pace = pace_summary(&brief.pace, brief.sprint_days),
                mood = mood(brief.rollover.as_ref(), brief.main_quota),
                exec = brief.execution_count,
                streak = brief.streak_days,
                total = mix.total(),
                p = mix.productive,
                pl = session.productive_level,
                weak = must_review.join(", "),
                r = mix.receptive,
                rl = session.receptive_level,
            )
        }
        SessionMode::Bonus => {
            let level = session.productive_level;
            let base = level.floor();
            let share = level - base;
            let (base_desc, next_desc) = describe_level(level);
            format!(
                "The learner already finished today's quiz and came back for more. Open with a teasing, challenging tone.\n\n\
Bonus level {level:.1}: {base_desc} ({:.0}%), {next_desc} ({:.0}%).\n\n\
Today's vocabulary:\n{word_list}\n\
Write {} questions ({} productive, {} receptive), preferring items marked [weak].\n",
                (1.0 - share) * 100.0,
                share * 100.0,
                mix.total(),
                mix.productive,
                mix.receptive,
            )
        }
    };

    if let Some(instruction) = session.instruction.as_deref() {
        let _ = writeln!(prompt, "\nSpecial instruction from the learner: {instruction}");
    }
    let _ = write!(
        prompt,
        "\nReference answers must be natural, native Japanese.\n\
Structure: part 1 is the question sheet without answers, then a line containing only {ANSWER_SEPARATOR}, \
then part 2 with reference answers and explanations."
    );
    prompt
}
