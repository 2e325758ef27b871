use std::future::Future;

use thiserror::Error;

use crate::coach::types::FeedMessage;

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("feed not configured: {0}")]
    NotConfigured(&'static str),
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("HTTP {status}: {body}")]
    HttpStatus {
        status: reqwest::StatusCode,
        body: String,
    },
    #[error("feed rejected request: {0}")]
    Api(String),
    #[error("feed unavailable: {0}")]
    Unavailable(String),
}

/// Source of learner messages; may return already-seen messages again.
///
/// `watermark` is the highest id already processed. Feeds that support it
/// skip those ids server-side; callers still filter.
pub trait Feed: Send + Sync {
    fn fetch(&self, watermark: i64) -> impl Future<Output = Result<Vec<FeedMessage>, FeedError>> + Send;
}
