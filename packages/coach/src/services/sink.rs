use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tokio::time::sleep;
use tracing::{info, warn};

use crate::coach::transcript::{MessageKind, OutboundMessage};

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("sink not configured: {0}")]
    NotConfigured(&'static str),
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("HTTP {status}: {body}")]
    HttpStatus {
        status: reqwest::StatusCode,
        body: String,
    },
    #[error("message rejected: {0}")]
    Rejected(String),
}

pub trait Sink: Send + Sync {
    fn send(&self, text: &str) -> impl Future<Output = Result<(), SinkError>> + Send;
}

/// Logs messages instead of delivering them; used when no bot token is configured.
#[derive(Debug, Clone, Default)]
pub struct ConsoleSink;

impl Sink for ConsoleSink {
    async fn send(&self, text: &str) -> Result<(), SinkError> {
        info!(chars = text.chars().count(), "outbound message\n{text}");
        Ok(())
    }
}

/// Strip formatting markers the chat client would show literally.
pub fn clean_outbound(text: &str) -> String {
    text.replace("**", "")
        .replace("##", "")
        .replace("__", "")
        .replace("<br>", "\n")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeliveryDelays {
    pub between: Duration,
    pub after_answer_sheet: Duration,
}

impl DeliveryDelays {
    pub fn from_millis(between: u64, after_answer_sheet: u64) -> Self {
        Self {
            between: Duration::from_millis(between),
            after_answer_sheet: Duration::from_millis(after_answer_sheet),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    pub sent: usize,
    pub failed: usize,
}

/// Send in order; a failed message is logged and delivery continues.
pub async fn deliver_outbox<S: Sink>(
    sink: &S,
    messages: &[OutboundMessage],
    delays: DeliveryDelays,
) -> DeliveryReport {
    let mut report = DeliveryReport::default();

    for (idx, message) in messages.iter().enumerate() {
        let text = clean_outbound(&message.text);
        if text.trim().is_empty() {
            continue;
        }
        match sink.send(&text).await {
            Ok(()) => report.sent += 1,
            Err(e) => {
                warn!(error = %e, kind = ?message.kind, "failed to deliver message");
                report.failed += 1;
            }
        }

        if idx + 1 < messages.len() {
            let pause = if message.kind == MessageKind::AnswerSheet {
                delays.after_answer_sheet
            } else {
                delays.between
            };
            if !pause.is_zero() {
                sleep(pause).await;
            }
        }
    }

    info!(sent = report.sent, failed = report.failed, "outbox delivered");
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct FlakySink {
        sent: Mutex<Vec<String>>,
    }

    impl Sink for FlakySink {
        async fn send(&self, text: &str) -> Result<(), SinkError> {
            if text.contains("boom") {
                return Err(SinkError::Rejected("boom".into()));
            }
            self.sent.lock().unwrap().push(text.to_string());
            Ok(())
        }
    }

    fn message(kind: MessageKind, text: &str) -> OutboundMessage {
        OutboundMessage { kind, text: text.to_string() }
    }

    #[test]
    fn test_clean_outbound() {
        assert_eq!(clean_outbound("**Bold** ## title __x__<br>next"), "Bold  title x\nnext");
    }

    #[tokio::test]
    async fn test_delivery_continues_after_failure() {
        let sink = FlakySink::default();
        let messages = vec![
            message(MessageKind::Notice, "first"),
            message(MessageKind::Grading, "boom"),
            message(MessageKind::Quiz, "**third**"),
            message(MessageKind::Quiz, "  "),
        ];
        let report = deliver_outbox(&sink, &messages, DeliveryDelays::from_millis(0, 0)).await;
        assert_eq!(report, DeliveryReport { sent: 2, failed: 1 });
        assert_eq!(*sink.sent.lock().unwrap(), vec!["first".to_string(), "third".to_string()]);
    }
}
