use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, FixedOffset, NaiveDate, Offset, Utc};

use crate::coach::CoachConfig;
use crate::services::llm_provider::{LLMConfig, DEFAULT_API_ENDPOINT, DEFAULT_MODEL, DEFAULT_TIMEOUT_MS};
use crate::services::telegram::{TelegramConfig, DEFAULT_API_BASE};

pub const DEFAULT_SCHEDULE: &str = "0 0 12 * * *";
pub const DEFAULT_UTC_OFFSET_HOURS: i32 = 8;

#[derive(Debug, Clone)]
pub struct Config {
    pub telegram: TelegramConfig,
    pub llm: LLMConfig,
    pub data_dir: PathBuf,
    pub clock: Clock,
    pub schedule: String,
    pub log_level: String,
    /// Set when ENABLE_FILE_LOGS is on
    pub log_dir: Option<PathBuf>,
    pub coach: CoachConfig,
}

impl Config {
    pub fn from_env() -> Self {
        let telegram = TelegramConfig {
            bot_token: env_string("TG_BOT_TOKEN"),
            chat_id: env_string("TG_CHAT_ID"),
            api_base: env_string("TELEGRAM_API_BASE").unwrap_or_else(|| DEFAULT_API_BASE.to_string()),
        };

        let llm = LLMConfig {
            api_key: env_string("LLM_API_KEY"),
            model: env_string("LLM_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            api_endpoint: env_string("LLM_API_ENDPOINT")
                .or_else(|| env_string("LLM_BASE_URL"))
                .unwrap_or_else(|| DEFAULT_API_ENDPOINT.to_string()),
            timeout: Duration::from_millis(
                env_string("LLM_TIMEOUT")
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(DEFAULT_TIMEOUT_MS),
            ),
        };

        let data_dir = env_string("RENSHU_DATA_DIR")
            .map(PathBuf::from)
            .or_else(|| dirs::data_local_dir().map(|d| d.join("renshu")))
            .unwrap_or_else(|| PathBuf::from("./data"));

        let offset_hours = env_string("RENSHU_UTC_OFFSET_HOURS")
            .and_then(|v| v.parse::<i32>().ok())
            .unwrap_or(DEFAULT_UTC_OFFSET_HOURS);

        let log_dir = file_logging_enabled().then(|| {
            PathBuf::from(env_string("LOG_DIR").unwrap_or_else(|| "./logs".to_string()))
        });

        Self {
            telegram,
            llm,
            data_dir,
            clock: Clock::from_hours(offset_hours),
            schedule: env_string("RENSHU_SCHEDULE").unwrap_or_else(|| DEFAULT_SCHEDULE.to_string()),
            log_level: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            log_dir,
            coach: CoachConfig::from_env(),
        }
    }
}

/// Calendar clock pinned to a fixed UTC offset
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Clock {
    offset: FixedOffset,
}

impl Clock {
    /// Out-of-range offsets fall back to UTC.
    pub fn from_hours(hours: i32) -> Self {
        let offset = hours
            .checked_mul(3600)
            .and_then(FixedOffset::east_opt)
            .unwrap_or_else(|| Utc.fix());
        Self { offset }
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    pub fn now(&self) -> DateTime<FixedOffset> {
        Utc::now().with_timezone(&self.offset)
    }

    pub fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }
}

pub fn file_logging_enabled() -> bool {
    std::env::var("ENABLE_FILE_LOGS")
        .map(|v| v == "true" || v == "1")
        .unwrap_or(false)
}

fn env_string(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}
