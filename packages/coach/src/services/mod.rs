pub mod content;
pub mod feed;
pub mod llm_provider;
pub mod prompts;
pub mod sink;
pub mod telegram;
