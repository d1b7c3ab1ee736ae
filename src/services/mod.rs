pub mod adaptive_difficulty;
pub mod cognitive_load;
pub mod diagnostic;
pub mod fsrs;
pub mod outcome;
pub mod personalized;
pub mod recall_boss;
pub mod review;
pub mod variant;

use thiserror::Error;

use crate::content::ContentError;
use crate::db::StoreError;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Content(#[from] ContentError),
}

pub type ServiceResult<T> = Result<T, ServiceError>;
