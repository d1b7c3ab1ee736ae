use std::cmp::Ordering;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::db::{RecordStore, StoreResult};
use crate::services::fsrs::{MemoryModel, Rating};
use crate::types::{Outcome, ReviewState};

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewStats {
    pub total: usize,
    pub new_items: usize,
    pub due: usize,
    pub mastered: usize,
    pub avg_stability: f64,
    /// Mean recall probability right now over scheduled items.
    pub avg_retrievability: f64,
}

/// Spaced-repetition front end: applies the memory model to stored review states.
#[derive(Clone)]
pub struct ReviewScheduler {
    store: Arc<dyn RecordStore>,
    model: Arc<dyn MemoryModel>,
}

impl ReviewScheduler {
    pub fn new(store: Arc<dyn RecordStore>, model: Arc<dyn MemoryModel>) -> Self {
        Self { store, model }
    }

    pub async fn record_review(
        &self,
        item_id: &str,
        outcome: Outcome,
        latency_ms: Option<i64>,
    ) -> StoreResult<ReviewState> {
        self.record_review_at(item_id, outcome, latency_ms, Utc::now())
            .await
    }

    pub async fn record_review_at(
        &self,
        item_id: &str,
        outcome: Outcome,
        latency_ms: Option<i64>,
        now: DateTime<Utc>,
    ) -> StoreResult<ReviewState> {
        let existing = self.store.get_review_state(item_id).await?;
        let prior = existing.as_ref().and_then(|state| state.memory.as_ref());

        let memory = self.model.schedule(prior, Rating::from(outcome), now);

        let state = ReviewState {
            item_id: item_id.to_string(),
            memory: Some(memory),
            last_outcome: outcome,
            last_latency_ms: latency_ms,
        };
        self.store.put_review_state(state.clone()).await?;

        if let Some(memory) = &state.memory {
            tracing::info!(
                item_id,
                ?outcome,
                due = %memory.due,
                stability = memory.stability,
                "review recorded"
            );
        }
        Ok(state)
    }

    pub async fn get_review_state(&self, item_id: &str) -> StoreResult<Option<ReviewState>> {
        self.store.get_review_state(item_id).await
    }

    pub async fn get_due_items(&self, limit: usize) -> StoreResult<Vec<String>> {
        self.get_due_items_at(limit, Utc::now()).await
    }

    /// Due item ids, most overdue first: never-scheduled items lead, then ascending due date.
    pub async fn get_due_items_at(
        &self,
        limit: usize,
        now: DateTime<Utc>,
    ) -> StoreResult<Vec<String>> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let mut due: Vec<ReviewState> = self
            .store
            .review_states()
            .await?
            .into_iter()
            .filter(|state| state.is_due(now))
            .collect();

        due.sort_by(compare_overdue);
        due.truncate(limit);

        tracing::debug!(count = due.len(), limit, "due items resolved");
        Ok(due.into_iter().map(|state| state.item_id).collect())
    }

    pub async fn stats(&self, now: DateTime<Utc>) -> StoreResult<ReviewStats> {
        let states = self.store.review_states().await?;
        let mut stats = ReviewStats {
            total: states.len(),
            ..Default::default()
        };

        let mut stability_sum = 0.0;
        let mut retrievability_sum = 0.0;
        let mut scheduled = 0usize;
        for state in &states {
            if state.is_due(now) {
                stats.due += 1;
            }
            match &state.memory {
                None => stats.new_items += 1,
                Some(memory) => {
                    scheduled += 1;
                    stability_sum += memory.stability;
                    retrievability_sum += memory.retrievability_at(now);
                    if memory.is_mastered() {
                        stats.mastered += 1;
                    }
                }
            }
        }
        if scheduled > 0 {
            stats.avg_stability = stability_sum / scheduled as f64;
            stats.avg_retrievability = retrievability_sum / scheduled as f64;
        }
        Ok(stats)
    }
}

fn compare_overdue(a: &ReviewState, b: &ReviewState) -> Ordering {
    match (&a.memory, &b.memory) {
        (None, None) => a.item_id.cmp(&b.item_id),
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(ma), Some(mb)) => ma
            .due
            .cmp(&mb.due)
            .then_with(|| a.item_id.cmp(&b.item_id)),
    }
}
