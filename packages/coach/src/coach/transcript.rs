//! Per-cycle transcript and the ordered outbox of user-visible messages.

use chrono::{DateTime, FixedOffset};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Coach,
    System,
    Adjust,
    Content,
    Warning,
}

impl Role {
    pub fn label(&self) -> &'static str {
        match self {
            Self::User => "User",
            Self::Coach => "Coach",
            Self::System => "Sys",
            Self::Adjust => "Adjust",
            Self::Content => "AI",
            Self::Warning => "Warn",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TranscriptLine {
    pub role: Role,
    pub text: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Transcript {
    lines: Vec<TranscriptLine>,
}

impl Transcript {
    pub fn push(&mut self, role: Role, text: impl Into<String>) {
        self.lines.push(TranscriptLine { role, text: text.into() });
    }

    pub fn lines(&self) -> &[TranscriptLine] {
        &self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Markdown block headed by the run time, one bullet per line
    pub fn render(&self, at: DateTime<FixedOffset>) -> String {
        let mut out = format!("### {}\n", at.format("%Y-%m-%d %H:%M:%S"));
        for line in &self.lines {
            out.push_str(&format!("- **{}**: {}\n", line.role.label(), line.text));
        }
        out
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    Notice,
    Grading,
    AnswerSheet,
    Quiz,
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutboundMessage {
    pub kind: MessageKind,
    pub text: String,
}

/// Ingestion notices are merged into one leading message; everything else keeps push order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Outbox {
    notices: Vec<String>,
    messages: Vec<OutboundMessage>,
}

impl Outbox {
    pub fn notice(&mut self, text: impl Into<String>) {
        let text = text.into();
        if !self.notices.contains(&text) {
            self.notices.push(text);
        }
    }

    pub fn push(&mut self, kind: MessageKind, text: impl Into<String>) {
        self.messages.push(OutboundMessage { kind, text: text.into() });
    }

    pub fn is_empty(&self) -> bool {
        self.notices.is_empty() && self.messages.is_empty()
    }

    pub fn into_messages(self) -> Vec<OutboundMessage> {
        let mut out = Vec::with_capacity(self.messages.len() + 1);
        if !self.notices.is_empty() {
            out.push(OutboundMessage {
                kind: MessageKind::Notice,
                text: self.notices.join("\n"),
            });
        }
        out.extend(self.messages);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_outbox_merges_and_dedups_notices() {
        let mut outbox = Outbox::default();
        outbox.push(MessageKind::Grading, "graded");
        outbox.notice("recorded: 猫");
        outbox.notice("recorded: 猫");
        outbox.notice("reinforced: 犬");
        let messages = outbox.into_messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].kind, MessageKind::Notice);
        assert_eq!(messages[0].text, "recorded: 猫\nreinforced: 犬");
        assert_eq!(messages[1].kind, MessageKind::Grading);
    }

    #[test]
    fn test_transcript_render() {
        let mut transcript = Transcript::default();
        transcript.push(Role::User, "hello (id 4)");
        transcript.push(Role::System, "processed 1 message");
        let offset = FixedOffset::east_opt(8 * 3600).unwrap();
        let at = offset.with_ymd_and_hms(2025, 1, 2, 12, 0, 0).unwrap();
        let rendered = transcript.render(at);
        assert!(rendered.starts_with("### 2025-01-02 12:00:00\n"));
        assert!(rendered.contains("- **User**: hello (id 4)\n"));
        assert!(rendered.contains("- **Sys**: processed 1 message\n"));
    }
}
