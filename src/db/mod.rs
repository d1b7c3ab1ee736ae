//! Review-state persistence
//!
//! The scheduling core only talks to [`RecordStore`]; the backing store is
//! chosen at start-up:
//! - `MemoryStore` keeps everything in process (tests, demos)
//! - `JsonFileStore` persists a snapshot file after every write

pub mod data_management;
pub mod json_file;
pub mod memory;

pub use data_management::{
    delete_all_data, delete_by_kind, export_data, import_data, DataKind, Snapshot,
};
pub use json_file::JsonFileStore;
pub use memory::MemoryStore;

use async_trait::async_trait;
use thiserror::Error;

use crate::types::{ReviewState, UserProfile};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Keyed record store for review states and the singleton user profile.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn get_review_state(&self, item_id: &str) -> StoreResult<Option<ReviewState>>;

    async fn put_review_state(&self, state: ReviewState) -> StoreResult<()>;

    async fn put_review_states(&self, states: Vec<ReviewState>) -> StoreResult<()> {
        for state in states {
            self.put_review_state(state).await?;
        }
        Ok(())
    }

    async fn review_states(&self) -> StoreResult<Vec<ReviewState>>;

    async fn review_states_for(&self, item_ids: &[String]) -> StoreResult<Vec<ReviewState>> {
        let mut out = Vec::with_capacity(item_ids.len());
        for id in item_ids {
            if let Some(state) = self.get_review_state(id).await? {
                out.push(state);
            }
        }
        Ok(out)
    }

    async fn get_profile(&self) -> StoreResult<Option<UserProfile>>;

    async fn put_profile(&self, profile: UserProfile) -> StoreResult<()>;

    async fn clear_review_states(&self) -> StoreResult<()>;

    async fn clear_profile(&self) -> StoreResult<()>;

    async fn clear(&self) -> StoreResult<()> {
        self.clear_review_states().await?;
        self.clear_profile().await
    }
}
