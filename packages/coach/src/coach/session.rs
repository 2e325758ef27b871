use renshu_algo::{select_flat, select_session, SessionRng};
use tracing::debug;

use crate::coach::config::{CoachConfig, SelectionStrategy};
use crate::coach::difficulty::DifficultyController;
use crate::coach::types::{LearnerState, QuizSession, SessionMode, VocabularyPool};

pub const ANSWER_SEPARATOR: &str = "|||SEPARATOR|||";

/// Pick the session's items and difficulty; `None` for an empty pool.
pub fn build_session(
    pool: &VocabularyPool,
    state: &LearnerState,
    mode: SessionMode,
    config: &CoachConfig,
    rng: &mut SessionRng,
) -> Option<QuizSession> {
    if pool.is_empty() {
        return None;
    }

    let selection = match config.selection {
        SelectionStrategy::WeakFirst => select_session(&pool.words, config.session_size, &config.selector, rng),
        SelectionStrategy::Flat => select_flat(&pool.words, config.session_size, &config.selector, rng),
    };
    let items = selection.picks.iter().map(|&i| pool.words[i].clone()).collect();
    let must_review = selection.mandatory.iter().map(|&i| pool.words[i].clone()).collect();

    let (mix, productive_level, receptive_level, instruction) = match mode {
        SessionMode::Daily => {
            let instruction = Some(state.next_quiz_instruction.trim())
                .filter(|s| !s.is_empty())
                .map(str::to_string);
            (config.daily_mix, state.productive, state.receptive, instruction)
        }
        SessionMode::Bonus => {
            let level = DifficultyController::new(config).bonus_difficulty(state);
            (config.bonus_mix, level, level, None)
        }
    };

    debug!(
        mode = mode.as_str(),
        items = selection.picks.len(),
        mandatory = selection.mandatory.len(),
        "session assembled"
    );

    Some(QuizSession {
        mode,
        items,
        must_review,
        mix,
        productive_level,
        receptive_level,
        instruction,
    })
}

/// Split a generated quiz into the question sheet and the deferred answer sheet.
pub fn split_answer_sheet(reply: &str) -> Option<(String, String)> {
    let (questions, answers) = reply.split_once(ANSWER_SEPARATOR)?;
    Some((questions.trim().to_string(), answers.trim().to_string()))
}
