use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::db::{MemoryStore, RecordStore, Snapshot, StoreResult};
use crate::types::{ReviewState, UserProfile};

/// File-backed store: an in-memory copy flushed as one JSON snapshot on every write.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    cache: MemoryStore,
    write_lock: Mutex<()>,
}

impl JsonFileStore {
    pub async fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref().to_path_buf();
        let cache = match tokio::fs::read(&path).await {
            Ok(bytes) => {
                let snapshot: Snapshot = serde_json::from_slice(&bytes)?;
                tracing::info!(
                    path = %path.display(),
                    review_states = snapshot.review_states.len(),
                    "loaded review store"
                );
                MemoryStore::from_snapshot(snapshot)
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = %path.display(), "starting empty review store");
                MemoryStore::new()
            }
            Err(err) => return Err(err.into()),
        };

        Ok(Self {
            path,
            cache,
            write_lock: Mutex::new(()),
        })
    }

    /// Applies `mutate` to a copy of the current contents, writes that copy to
    /// disk, and only then swaps it into the cache. A failed write leaves the
    /// cache untouched.
    async fn commit<F>(&self, mutate: F) -> StoreResult<()>
    where
        F: FnOnce(&mut Snapshot) + Send,
    {
        let _guard = self.write_lock.lock().await;
        let mut candidate = self.cache.snapshot();
        mutate(&mut candidate);
        candidate
            .review_states
            .sort_by(|a, b| a.item_id.cmp(&b.item_id));

        if let Err(err) = self.write_snapshot(&candidate).await {
            tracing::error!(path = %self.path.display(), error = %err, "review store write failed");
            return Err(err);
        }
        self.cache.replace(candidate);
        Ok(())
    }

    async fn write_snapshot(&self, snapshot: &Snapshot) -> StoreResult<()> {
        let bytes = serde_json::to_vec_pretty(snapshot)?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, &bytes).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

fn upsert(snapshot: &mut Snapshot, state: ReviewState) {
    match snapshot
        .review_states
        .iter_mut()
        .find(|existing| existing.item_id == state.item_id)
    {
        Some(existing) => *existing = state,
        None => snapshot.review_states.push(state),
    }
}

#[async_trait]
impl RecordStore for JsonFileStore {
    async fn get_review_state(&self, item_id: &str) -> StoreResult<Option<ReviewState>> {
        self.cache.get_review_state(item_id).await
    }

    async fn put_review_state(&self, state: ReviewState) -> StoreResult<()> {
        self.commit(|snapshot| upsert(snapshot, state)).await
    }

    async fn put_review_states(&self, states: Vec<ReviewState>) -> StoreResult<()> {
        self.commit(|snapshot| {
            for state in states {
                upsert(snapshot, state);
            }
        })
        .await
    }

    async fn review_states(&self) -> StoreResult<Vec<ReviewState>> {
        self.cache.review_states().await
    }

    async fn review_states_for(&self, item_ids: &[String]) -> StoreResult<Vec<ReviewState>> {
        self.cache.review_states_for(item_ids).await
    }

    async fn get_profile(&self) -> StoreResult<Option<UserProfile>> {
        self.cache.get_profile().await
    }

    async fn put_profile(&self, profile: UserProfile) -> StoreResult<()> {
        self.commit(|snapshot| snapshot.user_profile = Some(profile))
            .await
    }

    async fn clear_review_states(&self) -> StoreResult<()> {
        self.commit(|snapshot| snapshot.review_states.clear()).await
    }

    async fn clear_profile(&self) -> StoreResult<()> {
        self.commit(|snapshot| snapshot.user_profile = None).await
    }

    async fn clear(&self) -> StoreResult<()> {
        self.commit(|snapshot| {
            snapshot.review_states.clear();
            snapshot.user_profile = None;
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::StoreError;
    use crate::types::Outcome;

    #[tokio::test]
    async fn test_reopen_sees_previous_writes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("store.json");

        let store = JsonFileStore::open(&path).await.unwrap();
        store
            .put_review_state(ReviewState {
                item_id: "e-010".to_string(),
                memory: None,
                last_outcome: Outcome::Hard,
                last_latency_ms: None,
            })
            .await
            .unwrap();
        drop(store);

        let reopened = JsonFileStore::open(&path).await.unwrap();
        let state = reopened.get_review_state("e-010").await.unwrap().unwrap();
        assert_eq!(state.last_outcome, Outcome::Hard);
    }

    #[tokio::test]
    async fn test_corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        tokio::fs::write(&path, b"[[[").await.unwrap();
        let err = JsonFileStore::open(&path).await.unwrap_err();
        assert!(matches!(err, StoreError::Serialization(_)));
    }

    #[tokio::test]
    async fn test_failed_write_keeps_cache_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        let store = JsonFileStore::open(blocker.join("store.json")).await.unwrap();
        store.put_profile(UserProfile::default()).await.unwrap();

        // the parent directory turns into a plain file, so every write fails
        tokio::fs::remove_dir_all(&blocker).await.unwrap();
        tokio::fs::write(&blocker, b"not a directory").await.unwrap();

        let result = store
            .put_review_state(ReviewState {
                item_id: "m-001".to_string(),
                memory: None,
                last_outcome: Outcome::Good,
                last_latency_ms: Some(1500),
            })
            .await;
        assert!(matches!(result, Err(StoreError::Io(_))));
        assert!(store.get_review_state("m-001").await.unwrap().is_none());

        assert!(store.clear().await.is_err());
        assert!(store.get_profile().await.unwrap().is_some());
    }
}
