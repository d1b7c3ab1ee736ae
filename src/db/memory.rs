use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::db::{RecordStore, Snapshot, StoreResult};
use crate::types::{ReviewState, UserProfile};

#[derive(Debug, Default)]
pub struct MemoryStore {
    review_states: RwLock<HashMap<String, ReviewState>>,
    profile: RwLock<Option<UserProfile>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_snapshot(snapshot: Snapshot) -> Self {
        let store = Self::new();
        store.restore(snapshot);
        store
    }

    pub(crate) fn restore(&self, snapshot: Snapshot) {
        let mut states = self.review_states.write();
        for state in snapshot.review_states {
            states.insert(state.item_id.clone(), state);
        }
        if snapshot.user_profile.is_some() {
            *self.profile.write() = snapshot.user_profile;
        }
    }

    /// Point-in-time copy, ordered by item id so snapshot files diff cleanly.
    pub fn snapshot(&self) -> Snapshot {
        let mut review_states: Vec<ReviewState> =
            self.review_states.read().values().cloned().collect();
        review_states.sort_by(|a, b| a.item_id.cmp(&b.item_id));
        Snapshot::new(review_states, self.profile.read().clone())
    }

    pub fn len(&self) -> usize {
        self.review_states.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.review_states.read().is_empty()
    }

    /// Swaps the whole contents for the snapshot's.
    pub(crate) fn replace(&self, snapshot: Snapshot) {
        *self.review_states.write() = snapshot
            .review_states
            .into_iter()
            .map(|state| (state.item_id.clone(), state))
            .collect();
        *self.profile.write() = snapshot.user_profile;
    }

    fn insert(&self, state: ReviewState) {
        self.review_states
            .write()
            .insert(state.item_id.clone(), state);
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn get_review_state(&self, item_id: &str) -> StoreResult<Option<ReviewState>> {
        Ok(self.review_states.read().get(item_id).cloned())
    }

    async fn put_review_state(&self, state: ReviewState) -> StoreResult<()> {
        self.insert(state);
        Ok(())
    }

    async fn review_states(&self) -> StoreResult<Vec<ReviewState>> {
        Ok(self.review_states.read().values().cloned().collect())
    }

    async fn review_states_for(&self, item_ids: &[String]) -> StoreResult<Vec<ReviewState>> {
        let states = self.review_states.read();
        Ok(item_ids
            .iter()
            .filter_map(|id| states.get(id).cloned())
            .collect())
    }

    async fn get_profile(&self) -> StoreResult<Option<UserProfile>> {
        Ok(self.profile.read().clone())
    }

    async fn put_profile(&self, profile: UserProfile) -> StoreResult<()> {
        *self.profile.write() = Some(profile);
        Ok(())
    }

    async fn clear_review_states(&self) -> StoreResult<()> {
        self.review_states.write().clear();
        Ok(())
    }

    async fn clear_profile(&self) -> StoreResult<()> {
        *self.profile.write() = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Outcome;

    fn state(id: &str) -> ReviewState {
        ReviewState {
            item_id: id.to_string(),
            memory: None,
            last_outcome: Outcome::Good,
            last_latency_ms: Some(1200),
        }
    }

    #[tokio::test]
    async fn test_put_and_get() {
        let store = MemoryStore::new();
        assert!(store.get_review_state("a").await.unwrap().is_none());
        store.put_review_state(state("a")).await.unwrap();
        assert_eq!(store.get_review_state("a").await.unwrap(), Some(state("a")));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_review_states_for_skips_missing() {
        let store = MemoryStore::new();
        store
            .put_review_states(vec![state("a"), state("b")])
            .await
            .unwrap();
        let ids = vec!["b".to_string(), "zz".to_string(), "a".to_string()];
        let found: Vec<String> = store
            .review_states_for(&ids)
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.item_id)
            .collect();
        assert_eq!(found, vec!["b", "a"]);
    }

    #[tokio::test]
    async fn test_clear_drops_profile() {
        let store = MemoryStore::new();
        store.put_profile(UserProfile::default()).await.unwrap();
        store.put_review_state(state("a")).await.unwrap();
        store.clear().await.unwrap();
        assert!(store.is_empty());
        assert!(store.get_profile().await.unwrap().is_none());
    }
}
