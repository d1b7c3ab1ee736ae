use std::collections::HashSet;
use std::sync::Arc;

use crate::content::ContentPool;
use crate::services::review::ReviewScheduler;
use crate::services::ServiceResult;
use crate::types::{LearningItem, Outcome, ReviewState};

/// End-of-session review batch: due items, then today's misses, then weak-tag items.
///
/// Concept and correctness driven; no subject balancing happens here.
#[derive(Clone)]
pub struct RecallBoss {
    reviews: ReviewScheduler,
    pool: Arc<ContentPool>,
}

impl RecallBoss {
    pub fn new(reviews: ReviewScheduler, pool: Arc<ContentPool>) -> Self {
        Self { reviews, pool }
    }

    pub async fn select_recall_items(
        &self,
        incorrect_item_ids: &[String],
        weak_tags: &[String],
        limit: usize,
    ) -> ServiceResult<Vec<LearningItem>> {
        let mut selected: Vec<LearningItem> = Vec::with_capacity(limit);
        if limit == 0 {
            return Ok(selected);
        }
        let mut taken: HashSet<String> = HashSet::new();

        let due_ids = self.reviews.get_due_items(limit).await?;
        if !due_ids.is_empty() {
            let due_items = self.pool.by_ids(&due_ids).await?;
            push_unique(&mut selected, &mut taken, due_items, limit);
        }

        if !incorrect_item_ids.is_empty() && selected.len() < limit {
            let incorrect = self.pool.by_ids(incorrect_item_ids).await?;
            push_unique(&mut selected, &mut taken, incorrect, limit);
        }

        if !weak_tags.is_empty() && selected.len() < limit {
            let weak: HashSet<&str> = weak_tags.iter().map(String::as_str).collect();
            let pool = self.pool.all().await?;
            let weak_items = pool
                .iter()
                .filter(|item| item.has_any_tag(&weak))
                .cloned();
            push_unique(&mut selected, &mut taken, weak_items, limit);
        }

        tracing::debug!(
            due = due_ids.len(),
            incorrect = incorrect_item_ids.len(),
            selected = selected.len(),
            limit,
            "recall batch selected"
        );
        Ok(selected)
    }

    pub async fn record_recall_result(
        &self,
        item_id: &str,
        outcome: Outcome,
        latency_ms: Option<i64>,
    ) -> ServiceResult<ReviewState> {
        Ok(self.reviews.record_review(item_id, outcome, latency_ms).await?)
    }
}

fn push_unique(
    selected: &mut Vec<LearningItem>,
    taken: &mut HashSet<String>,
    items: impl IntoIterator<Item = LearningItem>,
    limit: usize,
) {
    for item in items {
        if selected.len() >= limit {
            break;
        }
        if taken.insert(item.id.clone()) {
            selected.push(item);
        }
    }
}
