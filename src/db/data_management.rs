use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::db::{RecordStore, StoreResult};
use crate::types::{ReviewState, UserProfile};

/// Portable dump of everything the core persists.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    #[serde(default)]
    pub review_states: Vec<ReviewState>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_profile: Option<UserProfile>,
    #[serde(default = "Utc::now")]
    pub export_date: DateTime<Utc>,
}

impl Snapshot {
    pub fn new(review_states: Vec<ReviewState>, user_profile: Option<UserProfile>) -> Self {
        Self {
            review_states,
            user_profile,
            export_date: Utc::now(),
        }
    }
}

pub async fn export_data(store: &dyn RecordStore) -> StoreResult<String> {
    let mut review_states = store.review_states().await?;
    review_states.sort_by(|a, b| a.item_id.cmp(&b.item_id));
    let snapshot = Snapshot::new(review_states, store.get_profile().await?);
    Ok(serde_json::to_string_pretty(&snapshot)?)
}

/// Bulk-puts every record in the dump; existing records with the same key are replaced.
pub async fn import_data(store: &dyn RecordStore, json: &str) -> StoreResult<usize> {
    let snapshot: Snapshot = serde_json::from_str(json)?;
    let imported = snapshot.review_states.len();
    store.put_review_states(snapshot.review_states).await?;
    if let Some(profile) = snapshot.user_profile {
        store.put_profile(profile).await?;
    }
    tracing::info!(imported, "imported review states");
    Ok(imported)
}

pub async fn delete_all_data(store: &dyn RecordStore) -> StoreResult<()> {
    store.clear().await?;
    tracing::info!("deleted all review data");
    Ok(())
}

/// Record families that can be wiped independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DataKind {
    ReviewStates,
    UserProfile,
}

pub async fn delete_by_kind(store: &dyn RecordStore, kind: DataKind) -> StoreResult<()> {
    match kind {
        DataKind::ReviewStates => store.clear_review_states().await?,
        DataKind::UserProfile => store.clear_profile().await?,
    }
    tracing::info!(?kind, "deleted learner data");
    Ok(())
}
