//! Local Gateway
//!
//! The remote data contract served from a SQLite file, for offline use,
//! development and tests. Behaves like the hosted service: rows are scoped
//! to the signed-in account, ids and timestamps are assigned here, and a
//! missing row on update/delete is reported as not found.

use std::path::Path;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use taskdeck::{AccountId, AuthGateway, GatewayError, GatewayResult, Profile, ProfileFlag, RemoteTable, Session};

use crate::domain::DomainResult;
use crate::repository::{
    init_db, AccountRepository, DbState, ProfileRepository, RecordRepository, Repository, SessionRepository, Stored,
};

pub struct LocalGateway {
    db: DbState,
    profiles: ProfileRepository,
    accounts: AccountRepository,
    sessions: SessionRepository,
    session: RwLock<Option<Session>>,
}

impl LocalGateway {
    /// Open (creating if needed) the database at `db_path`; `:memory:` is accepted
    pub async fn open(db_path: &Path) -> DomainResult<Self> {
        let db = init_db(db_path).await?;
        Ok(Self {
            profiles: ProfileRepository::new(db.connection()),
            accounts: AccountRepository::new(db.connection()),
            sessions: SessionRepository::new(db.connection()),
            session: RwLock::new(None),
            db,
        })
    }

    pub async fn in_memory() -> DomainResult<Self> {
        Self::open(Path::new(":memory:")).await
    }

    fn records<E: Stored>(&self) -> RecordRepository<E> {
        RecordRepository::new(self.db.connection())
    }

    fn owner(&self) -> GatewayResult<AccountId> {
        self.session
            .read()
            .as_ref()
            .map(|s| s.account.clone())
            .ok_or_else(|| GatewayError::Auth("No active session".into()))
    }

    fn set_session(&self, session: Option<Session>) {
        *self.session.write() = session;
    }
}

#[async_trait]
impl<E: Stored> RemoteTable<E> for LocalGateway {
    async fn list(&self) -> GatewayResult<Vec<E::Row>> {
        let owner = self.owner()?;
        Ok(self.records::<E>().list(&owner).await?)
    }

    async fn insert(&self, row: E::NewRow) -> GatewayResult<E::Row> {
        let owner = self.owner()?;
        let created = self.records::<E>().create(&owner, &row).await?;
        log::debug!("[local] inserted {} for {}", E::TABLE, owner);
        Ok(created)
    }

    async fn update(&self, id: &str, patch: E::RowPatch) -> GatewayResult<()> {
        let owner = self.owner()?;
        Ok(self.records::<E>().update(&owner, id, &patch).await?)
    }

    async fn delete(&self, id: &str) -> GatewayResult<()> {
        let owner = self.owner()?;
        Ok(self.records::<E>().delete(&owner, id).await?)
    }
}

#[async_trait]
impl AuthGateway for LocalGateway {
    async fn restore_session(&self) -> GatewayResult<Option<Session>> {
        if let Some(session) = self.session.read().clone() {
            return Ok(Some(session));
        }
        let restored = self.sessions.latest().await?;
        if let Some(session) = &restored {
            log::info!("[local] restored session for {}", session.account);
            self.set_session(Some(session.clone()));
        }
        Ok(restored)
    }

    async fn sign_in(&self, email: &str, password: &str) -> GatewayResult<Session> {
        let account = self.accounts.verify(email, password).await?;
        let session = self.sessions.issue(&account).await?;
        self.set_session(Some(session.clone()));
        Ok(session)
    }

    async fn sign_up(&self, email: &str, password: &str, full_name: &str) -> GatewayResult<Session> {
        let (account, _) = self.accounts.register(email, password, full_name).await?;
        let session = self.sessions.issue(&account).await?;
        log::info!("[local] registered {}", account.id);
        self.set_session(Some(session.clone()));
        Ok(session)
    }

    async fn sign_out(&self) -> GatewayResult<()> {
        let current = self.session.write().take();
        if let Some(session) = current {
            self.sessions.revoke(&session.access_token).await?;
        }
        Ok(())
    }

    async fn fetch_profile(&self, account: &AccountId) -> GatewayResult<Profile> {
        self.profiles
            .find(account)
            .await?
            .ok_or_else(|| GatewayError::NotFound(format!("profile {}", account)))
    }

    async fn update_profile_flag(&self, account: &AccountId, flag: ProfileFlag, value: bool) -> GatewayResult<()> {
        if self.owner()? != *account {
            return Err(GatewayError::Auth("cannot modify another account's profile".into()));
        }
        self.profiles.set_flag(account, flag, value).await?;
        log::info!("[local] {} = {} for {} at {}", flag.column(), value, account, Utc::now());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use taskdeck::entitlement::TrialState;
    use taskdeck::{AppContext, SyncOutcome, Task, TaskDraft, TaskPatch, TrialPolicy};

    use super::*;

    #[tokio::test]
    async fn test_sign_up_then_crud() {
        let gateway = Arc::new(LocalGateway::in_memory().await.unwrap());
        let ctx = AppContext::new(gateway.clone(), TrialPolicy::default());
        ctx.start().await.unwrap();

        ctx.sign_up("ada@example.com", "secret", "Ada").await.unwrap();
        let profile = ctx.auth.profile().unwrap();
        assert!(!profile.is_premium);
        assert_eq!(ctx.entitlement.state(), TrialState::Trial { days_remaining: 7 });

        let task = ctx.tasks.add(TaskDraft::new("Local task")).await.unwrap();
        let ticket = ctx.tasks.update(&task.id, TaskPatch::new().title("Renamed"));
        assert_eq!(ticket.settled().await, SyncOutcome::Confirmed);

        ctx.tasks.fetch_all().await.unwrap();
        assert_eq!(ctx.tasks.get(&task.id).unwrap().title, "Renamed");

        assert_eq!(ctx.tasks.delete(&task.id).settled().await, SyncOutcome::Confirmed);
        ctx.tasks.fetch_all().await.unwrap();
        assert!(ctx.tasks.items().is_empty());
    }

    #[tokio::test]
    async fn test_missing_row_resyncs() {
        let gateway = Arc::new(LocalGateway::in_memory().await.unwrap());
        let ctx = AppContext::new(gateway.clone(), TrialPolicy::default());
        ctx.sign_up("ada@example.com", "secret", "Ada").await.unwrap();
        let task = ctx.tasks.add(TaskDraft::new("Twice")).await.unwrap();

        RemoteTable::<Task>::delete(gateway.as_ref(), &task.id).await.unwrap();
        let outcome = ctx.tasks.update(&task.id, TaskPatch::new().completed(true)).settled().await;

        assert!(matches!(outcome, SyncOutcome::Resynced(GatewayError::NotFound(_))));
        assert!(ctx.tasks.items().is_empty());
        assert!(ctx.tasks.error().is_some());
    }

    #[tokio::test]
    async fn test_activate_premium_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("taskdeck.db");
        {
            let gateway = Arc::new(LocalGateway::open(&path).await.unwrap());
            let ctx = AppContext::new(gateway, TrialPolicy::default());
            ctx.sign_up("ada@example.com", "secret", "Ada").await.unwrap();
            ctx.entitlement.activate_premium().await.unwrap();
            assert_eq!(ctx.entitlement.state(), TrialState::Premium);
        }

        let gateway = Arc::new(LocalGateway::open(&path).await.unwrap());
        let ctx = AppContext::new(gateway, TrialPolicy::default());
        ctx.start().await.unwrap();
        assert!(ctx.auth.session().is_some());
        assert!(ctx.entitlement.status().is_premium);
    }

    #[tokio::test]
    async fn test_signed_out_calls_are_rejected() {
        let gateway = LocalGateway::in_memory().await.unwrap();
        let result = RemoteTable::<Task>::list(&gateway).await;
        assert!(matches!(result, Err(GatewayError::Auth(_))));

        let result = gateway
            .update_profile_flag(&AccountId::new("someone"), ProfileFlag::IsPremium, true)
            .await;
        assert!(matches!(result, Err(GatewayError::Auth(_))));
    }

    #[tokio::test]
    async fn test_failed_sign_up_leaves_no_account() {
        let gateway = LocalGateway::in_memory().await.unwrap();
        gateway
            .db
            .connection()
            .lock()
            .await
            .execute_batch(
                "CREATE TRIGGER reject_profiles BEFORE INSERT ON profiles
                 BEGIN SELECT RAISE(ABORT, 'profiles unavailable'); END;",
            )
            .unwrap();

        assert!(gateway.sign_up("ada@example.com", "secret", "Ada").await.is_err());
        assert!(gateway.owner().is_err());
        assert!(matches!(
            gateway.sign_in("ada@example.com", "secret").await,
            Err(GatewayError::Auth(_))
        ));

        gateway.db.connection().lock().await.execute_batch("DROP TRIGGER reject_profiles;").unwrap();
        let session = gateway.sign_up("ada@example.com", "secret", "Ada").await.unwrap();
        let profile = gateway.fetch_profile(&session.account).await.unwrap();
        assert_eq!(profile.full_name.as_deref(), Some("Ada"));
        assert!(!profile.is_premium);
    }

    #[tokio::test]
    async fn test_sign_in_wrong_password() {
        let gateway = LocalGateway::in_memory().await.unwrap();
        gateway.sign_up("ada@example.com", "secret", "Ada").await.unwrap();
        gateway.sign_out().await.unwrap();

        assert!(matches!(
            gateway.sign_in("ada@example.com", "nope").await,
            Err(GatewayError::Auth(_))
        ));
        assert!(gateway.restore_session().await.unwrap().is_none());
        assert!(gateway.sign_in("ADA@example.com", "secret").await.is_ok());
    }
}
