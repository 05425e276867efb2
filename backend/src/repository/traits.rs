//! Repository Layer - Core Traits
//!
//! Owner-scoped CRUD over entity rows. Every call names the owning account
//! and never sees rows belonging to another one.

use async_trait::async_trait;
use taskdeck::models::Entity;
use taskdeck::AccountId;

use crate::domain::DomainResult;

#[async_trait]
pub trait Repository<E: Entity>: Send + Sync {
    /// Insert a row, assigning id and creation time
    async fn create(&self, owner: &AccountId, row: &E::NewRow) -> DomainResult<E::Row>;

    async fn find_by_id(&self, owner: &AccountId, id: &str) -> DomainResult<Option<E::Row>>;

    /// Newest first
    async fn list(&self, owner: &AccountId) -> DomainResult<Vec<E::Row>>;

    /// Apply the fields present in `patch`
    async fn update(&self, owner: &AccountId, id: &str, patch: &E::RowPatch) -> DomainResult<()>;

    async fn delete(&self, owner: &AccountId, id: &str) -> DomainResult<()>;
}
