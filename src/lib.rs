pub mod config;
pub mod content;
pub mod db;
pub mod logging;
pub mod services;
pub mod types;

pub use services::adaptive_difficulty::{AdaptiveDifficultyEngine, DifficultyUpdate, ResponseData};
pub use services::fsrs::{FsrsModel, MemoryModel, MemoryState, Rating};
pub use services::outcome::determine_outcome;
pub use services::personalized::{PersonalizedScheduler, SchedulerConfig, SubjectDistribution};
pub use services::recall_boss::RecallBoss;
pub use services::review::ReviewScheduler;
pub use services::variant::VariantSystem;
pub use types::{GradeBand, LearningItem, Outcome, ReviewState, Subject, UserProfile};
