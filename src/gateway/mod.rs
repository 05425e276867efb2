//! Remote Data Gateway
//!
//! Abstract interfaces to the hosted data service. Stores depend only on
//! these traits; implementations can be the hosted REST service, a local
//! SQLite database, or an in-memory fake.

mod rest;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::GatewayResult;
use crate::models::{AccountId, Entity, Profile, ProfileFlag, Project, Task, TeamMember};

pub use rest::RestGateway;

/// An authenticated session issued by the service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub account: AccountId,
    pub email: Option<String>,
    pub access_token: String,
}

/// Per-collection CRUD against the remote service.
///
/// Calls are scoped to the account of the gateway's current session.
#[async_trait]
pub trait RemoteTable<E: Entity>: Send + Sync {
    /// All rows for the session account, newest first
    async fn list(&self) -> GatewayResult<Vec<E::Row>>;

    /// Insert a row; the service assigns id and creation time
    async fn insert(&self, row: E::NewRow) -> GatewayResult<E::Row>;

    /// Apply a partial update to the row with `id`
    async fn update(&self, id: &str, patch: E::RowPatch) -> GatewayResult<()>;

    /// Delete the row with `id`
    async fn delete(&self, id: &str) -> GatewayResult<()>;
}

/// Session issuance and profile access
#[async_trait]
pub trait AuthGateway: Send + Sync {
    /// Session persisted from an earlier sign-in, if any
    async fn restore_session(&self) -> GatewayResult<Option<Session>>;

    async fn sign_in(&self, email: &str, password: &str) -> GatewayResult<Session>;

    /// Create the account and its profile (`is_premium = false`)
    async fn sign_up(&self, email: &str, password: &str, full_name: &str) -> GatewayResult<Session>;

    async fn sign_out(&self) -> GatewayResult<()>;

    async fn fetch_profile(&self, account: &AccountId) -> GatewayResult<Profile>;

    async fn update_profile_flag(
        &self,
        account: &AccountId,
        flag: ProfileFlag,
        value: bool,
    ) -> GatewayResult<()>;
}

/// Who is signed in right now, as seen by the client
pub trait AccountSource: Send + Sync {
    fn current_account(&self) -> Option<AccountId>;
}

/// Everything the client needs from one service
pub trait Gateway:
    RemoteTable<Task> + RemoteTable<Project> + RemoteTable<TeamMember> + AuthGateway + 'static
{
}

impl<G> Gateway for G where
    G: RemoteTable<Task> + RemoteTable<Project> + RemoteTable<TeamMember> + AuthGateway + 'static
{
}
