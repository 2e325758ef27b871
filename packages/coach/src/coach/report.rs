//! Markdown status dashboard: stats header followed by the newest-first run history.

use std::path::{Path, PathBuf};

use chrono::{DateTime, FixedOffset, NaiveDate};
use tracing::debug;

use crate::coach::config::CoachConfig;
use crate::coach::difficulty::{describe_level, pace_summary, DifficultyController};
use crate::coach::persistence::StoreError;
use crate::coach::transcript::Transcript;
use crate::coach::types::LearnerState;

pub const DASHBOARD_FILE: &str = "dashboard.md";
pub const HISTORY_SEPARATOR: &str = "<!-- HISTORY LOGS START -->";

#[derive(Debug, Clone)]
pub struct Dashboard {
    path: PathBuf,
}

impl Dashboard {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            path: dir.as_ref().join(DASHBOARD_FILE),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Rewrite the header and prepend this run's transcript to the kept history.
    pub async fn write(
        &self,
        state: &LearnerState,
        config: &CoachConfig,
        transcript: &Transcript,
        at: DateTime<FixedOffset>,
    ) -> Result<(), StoreError> {
        let io_err = |source: std::io::Error| StoreError::Io {
            path: self.path.clone(),
            source,
        };
        let previous = match tokio::fs::read_to_string(&self.path).await {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
            Err(e) => return Err(io_err(e)),
        };
        let history = previous
            .split_once(HISTORY_SEPARATOR)
            .map(|(_, rest)| rest.trim_start())
            .unwrap_or_default();

        let mut out = render_header(state, config, at.date_naive());
        out.push_str("\n## Run history\n");
        out.push_str(HISTORY_SEPARATOR);
        out.push_str("\n\n");
        out.push_str(&transcript.render(at));
        if !history.is_empty() {
            out.push('\n');
            out.push_str(history);
        }

        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(io_err)?;
        }
        tokio::fs::write(&self.path, out).await.map_err(io_err)?;
        debug!(path = %self.path.display(), "dashboard written");
        Ok(())
    }
}

pub fn render_header(state: &LearnerState, config: &CoachConfig, today: NaiveDate) -> String {
    let report = DifficultyController::new(config).sprint_status(state, today);
    let (productive_desc, _) = describe_level(state.productive);
    let (receptive_desc, _) = describe_level(state.receptive);
    let last_quiz = state
        .last_quiz_date
        .map(|d| d.to_string())
        .unwrap_or_else(|| "never".to_string());

    format!(
        "# Practice dashboard\n\n\
- **Sprint**: {}\n\
- **Productive**: Lv {:.2} ({productive_desc})\n\
- **Receptive**: Lv {:.2} ({receptive_desc})\n\
- **Today**: main {}/{}, bonus {}\n\
- **Yesterday**: main {}, bonus {}\n\
- **Streak**: {} days, {} sessions\n\
- **Last quiz**: {last_quiz}\n\
- **Watermark**: {}\n",
        pace_summary(&report, config.sprint.duration_days),
        state.productive,
        state.receptive,
        state.main_answers,
        config.main_quota,
        state.bonus_answers,
        state.yesterday_main,
        state.yesterday_bonus,
        state.streak_days,
        state.execution_count,
        state.last_update_id,
    )
}
