//! Learning-item content
//!
//! Items are read-only to the scheduling core. They are loaded once through a
//! [`ContentLoader`] and cached for the session in a [`ContentPool`].

pub mod validator;

pub use validator::{check_content_quality, validate_learning_items, QualityReport};

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::OnceCell;

use crate::types::{GradeBand, LearningItem, Subject};

#[derive(Debug, Error)]
pub enum ContentError {
    #[error("content io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("content parse error at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("content validation failed: {}", .0.join(", "))]
    Validation(Vec<String>),
}

#[async_trait]
pub trait ContentLoader: Send + Sync {
    async fn load_all_learning_items(&self) -> Result<Vec<LearningItem>, ContentError>;
}

/// Fixed in-memory content, mostly for tests and embedding.
#[derive(Debug, Clone, Default)]
pub struct StaticContentLoader {
    items: Vec<LearningItem>,
}

impl StaticContentLoader {
    pub fn new(items: Vec<LearningItem>) -> Self {
        Self { items }
    }
}

#[async_trait]
impl ContentLoader for StaticContentLoader {
    async fn load_all_learning_items(&self) -> Result<Vec<LearningItem>, ContentError> {
        Ok(self.items.clone())
    }
}

/// Reads either a single JSON array of items or a content directory whose
/// `index.json` maps each subject to files under `<dir>/<subject>/`.
#[derive(Debug, Clone)]
pub struct JsonContentLoader {
    root: PathBuf,
}

impl JsonContentLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    async fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, ContentError> {
        let bytes = tokio::fs::read(path).await.map_err(|source| ContentError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_slice(&bytes).map_err(|source| ContentError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    async fn load_file(path: &Path) -> Result<Vec<LearningItem>, ContentError> {
        let items: Vec<LearningItem> = Self::read_json(path).await?;
        let items = validate_learning_items(items)?;
        let quality = check_content_quality(&items);
        if !quality.valid {
            tracing::warn!(
                path = %path.display(),
                warnings = ?quality.warnings,
                "content quality warnings"
            );
        }
        Ok(items)
    }
}

#[async_trait]
impl ContentLoader for JsonContentLoader {
    async fn load_all_learning_items(&self) -> Result<Vec<LearningItem>, ContentError> {
        let is_dir = tokio::fs::metadata(&self.root)
            .await
            .map_err(|source| ContentError::Io {
                path: self.root.clone(),
                source,
            })?
            .is_dir();

        if !is_dir {
            return Self::load_file(&self.root).await;
        }

        let index_path = self.root.join("index.json");
        let index: HashMap<String, Vec<String>> = Self::read_json(&index_path).await?;

        let mut subjects: Vec<_> = index.into_iter().collect();
        subjects.sort_by(|a, b| a.0.cmp(&b.0));

        let mut items = Vec::new();
        for (subject, files) in subjects {
            for file in files {
                let path = self.root.join(&subject).join(&file);
                items.extend(Self::load_file(&path).await?);
            }
        }
        Ok(items)
    }
}

/// Session-wide read-only item pool, populated on first access and never invalidated.
pub struct ContentPool {
    loader: Arc<dyn ContentLoader>,
    items: OnceCell<Arc<Vec<LearningItem>>>,
}

impl ContentPool {
    pub fn new(loader: Arc<dyn ContentLoader>) -> Self {
        Self {
            loader,
            items: OnceCell::new(),
        }
    }

    pub fn from_items(items: Vec<LearningItem>) -> Self {
        Self::new(Arc::new(StaticContentLoader::new(items)))
    }

    pub async fn all(&self) -> Result<Arc<Vec<LearningItem>>, ContentError> {
        let items = self
            .items
            .get_or_try_init(|| async {
                let items = self.loader.load_all_learning_items().await?;
                tracing::info!(count = items.len(), "content pool loaded");
                Ok::<_, ContentError>(Arc::new(items))
            })
            .await?;
        Ok(Arc::clone(items))
    }

    pub async fn by_subject(
        &self,
        subject: Subject,
        grade_band: Option<GradeBand>,
    ) -> Result<Vec<LearningItem>, ContentError> {
        let items = self.all().await?;
        Ok(items
            .iter()
            .filter(|item| item.subject == subject)
            .filter(|item| grade_band.map_or(true, |band| item.in_grade_band(band)))
            .cloned()
            .collect())
    }

    /// Resolves ids to items in the order requested; unknown ids are skipped.
    pub async fn by_ids(&self, ids: &[String]) -> Result<Vec<LearningItem>, ContentError> {
        let items = self.all().await?;
        let by_id: HashMap<&str, &LearningItem> =
            items.iter().map(|item| (item.id.as_str(), item)).collect();
        Ok(ids
            .iter()
            .filter_map(|id| by_id.get(id.as_str()).map(|item| (*item).clone()))
            .collect())
    }
}
