use async_trait::async_trait;
use thiserror::Error;

use wastegate_core::domain::actor::{Actor, ActorId};
use wastegate_core::domain::branch::{Branch, BranchId};
use wastegate_core::domain::review::{ReviewFilter, ReviewRequest, ReviewRequestId};
use wastegate_core::domain::waste::{WasteRecord, WasteRecordFilter, WasteRecordId};
use wastegate_core::scope::BranchScope;

pub(crate) mod codec;

pub mod actor;
pub mod branch;
pub mod memory;
pub mod review;
pub mod waste;

pub use actor::SqlActorRepository;
pub use branch::SqlBranchRepository;
pub use memory::{InMemoryReviewRequestRepository, InMemoryWasteRecordRepository};
pub use review::SqlReviewRequestRepository;
pub use waste::SqlWasteRecordRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
}

#[async_trait]
pub trait BranchRepository: Send + Sync {
    async fn find_by_id(&self, id: &BranchId) -> Result<Option<Branch>, RepositoryError>;
    async fn save(&self, branch: Branch) -> Result<(), RepositoryError>;
    async fn list(&self) -> Result<Vec<Branch>, RepositoryError>;
}

#[async_trait]
pub trait ActorRepository: Send + Sync {
    async fn find_by_id(&self, id: &ActorId) -> Result<Option<Actor>, RepositoryError>;
    async fn save(&self, actor: Actor) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait WasteRecordRepository: Send + Sync {
    async fn find_by_id(&self, id: &WasteRecordId)
        -> Result<Option<WasteRecord>, RepositoryError>;
    async fn save(&self, record: WasteRecord) -> Result<(), RepositoryError>;
    async fn delete(&self, id: &WasteRecordId) -> Result<bool, RepositoryError>;
    async fn list(
        &self,
        scope: &BranchScope,
        filter: &WasteRecordFilter,
    ) -> Result<Vec<WasteRecord>, RepositoryError>;
}

#[async_trait]
pub trait ReviewRequestRepository: Send + Sync {
    async fn find_by_id(
        &self,
        id: &ReviewRequestId,
    ) -> Result<Option<ReviewRequest>, RepositoryError>;
    async fn save(&self, request: ReviewRequest) -> Result<(), RepositoryError>;
    async fn find_pending_for_target(
        &self,
        target: &WasteRecordId,
    ) -> Result<Option<ReviewRequest>, RepositoryError>;
    async fn list(
        &self,
        scope: &BranchScope,
        filter: &ReviewFilter,
    ) -> Result<Vec<ReviewRequest>, RepositoryError>;
}
