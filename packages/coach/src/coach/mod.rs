pub mod config;
pub mod difficulty;
pub mod engine;
pub mod feedback;
pub mod ingest;
pub mod persistence;
pub mod report;
pub mod session;
pub mod text;
pub mod transcript;
pub mod types;
pub mod verdict;
pub mod vocabulary;

pub use config::CoachConfig;
pub use difficulty::{DifficultyController, RolloverOutcome, RolloverStep};
pub use engine::{CycleEngine, CycleError, CycleOutcome, CycleReport, Documents};
pub use persistence::{DocumentStore, StoreError};
pub use report::Dashboard;
pub use types::{FeedMessage, LearnerState, SessionMode, VocabularyItem, VocabularyPool};
