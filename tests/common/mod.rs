#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use jihoo_review::content::ContentPool;
use jihoo_review::db::{MemoryStore, RecordStore, StoreError, StoreResult};
use jihoo_review::services::fsrs::FsrsModel;
use jihoo_review::services::review::ReviewScheduler;
use jihoo_review::types::{GradeBand, LearningItem, ReviewState, Subject, UserProfile};

pub fn item(id: &str, subject: Subject, tags: &[&str], difficulty: f64) -> LearningItem {
    LearningItem {
        id: id.to_string(),
        subject,
        area: String::new(),
        grade_band: vec![GradeBand::ES34],
        concept_tag: tags.iter().map(|t| t.to_string()).collect(),
        difficulty,
        variants: Vec::new(),
        payload: Default::default(),
    }
}

pub fn banded(mut item: LearningItem, bands: &[GradeBand]) -> LearningItem {
    item.grade_band = bands.to_vec();
    item
}

pub fn ids(items: &[LearningItem]) -> Vec<&str> {
    items.iter().map(|item| item.id.as_str()).collect()
}

pub fn strings(raw: &[&str]) -> Vec<String> {
    raw.iter().map(|s| s.to_string()).collect()
}

pub fn t0() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2026-05-11T08:30:00Z")
        .unwrap()
        .with_timezone(&Utc)
}

/// Small mixed pool: ten math, four english, two science, two social.
pub fn sample_items() -> Vec<LearningItem> {
    let mut items = Vec::new();
    for i in 1..=10 {
        let tag = if i <= 3 { "math.fractions" } else { "math.addition" };
        items.push(item(&format!("m-{i:03}"), Subject::Math, &[tag], i as f64));
    }
    for i in 1..=4 {
        items.push(item(&format!("e-{i:03}"), Subject::English, &["english.vocab"], 3.0));
    }
    items.push(item("s-001", Subject::Science, &["science.plants"], 4.0));
    items.push(item("s-002", Subject::Science, &["science.energy"], 6.0));
    items.push(item("so-001", Subject::Social, &["social.maps"], 2.0));
    items.push(item("so-002", Subject::Social, &["social.history"], 5.0));
    items
}

pub fn pool(items: Vec<LearningItem>) -> Arc<ContentPool> {
    Arc::new(ContentPool::from_items(items))
}

pub fn memory_scheduler() -> (Arc<MemoryStore>, ReviewScheduler) {
    let store = Arc::new(MemoryStore::new());
    let reviews = ReviewScheduler::new(store.clone(), Arc::new(FsrsModel::default()));
    (store, reviews)
}

/// A store whose every operation fails, for checking that errors surface.
pub struct FailingStore;

fn unavailable() -> StoreError {
    StoreError::Unavailable("disk detached".to_string())
}

#[async_trait]
impl RecordStore for FailingStore {
    async fn get_review_state(&self, _item_id: &str) -> StoreResult<Option<ReviewState>> {
        Err(unavailable())
    }

    async fn put_review_state(&self, _state: ReviewState) -> StoreResult<()> {
        Err(unavailable())
    }

    async fn review_states(&self) -> StoreResult<Vec<ReviewState>> {
        Err(unavailable())
    }

    async fn get_profile(&self) -> StoreResult<Option<UserProfile>> {
        Err(unavailable())
    }

    async fn put_profile(&self, _profile: UserProfile) -> StoreResult<()> {
        Err(unavailable())
    }

    async fn clear_review_states(&self) -> StoreResult<()> {
        Err(unavailable())
    }

    async fn clear_profile(&self) -> StoreResult<()> {
        Err(unavailable())
    }
}

pub fn failing_scheduler() -> ReviewScheduler {
    ReviewScheduler::new(Arc::new(FailingStore), Arc::new(FsrsModel::default()))
}
