//! Application Context
//!
//! One instance per application, constructed with an injected gateway and
//! cloned into every consumer. Owns one store per entity type plus the auth
//! store and the entitlement engine.

use std::sync::Arc;

use crate::auth::AuthStore;
use crate::config::{AppConfig, GatewayConfig};
use crate::entitlement::{Clock, EntitlementEngine, SystemClock, TrialPolicy};
use crate::error::{GatewayError, GatewayResult};
use crate::gateway::{AccountSource, AuthGateway, Gateway, RemoteTable, RestGateway, Session};
use crate::models::{Project, Task, TeamMember};
use crate::store::{EntityStore, ProjectStore, TaskStore, TeamStore};

#[derive(Clone)]
pub struct AppContext {
    pub tasks: TaskStore,
    pub projects: ProjectStore,
    pub team: TeamStore,
    pub auth: AuthStore,
    pub entitlement: EntitlementEngine,
}

impl AppContext {
    pub fn new<G: Gateway>(gateway: Arc<G>, policy: TrialPolicy) -> Self {
        Self::with_clock(gateway, policy, Arc::new(SystemClock))
    }

    pub fn with_clock<G: Gateway>(gateway: Arc<G>, policy: TrialPolicy, clock: Arc<dyn Clock>) -> Self {
        let auth_gateway: Arc<dyn AuthGateway> = gateway.clone();
        let auth = AuthStore::new(auth_gateway);
        let accounts: Arc<dyn AccountSource> = Arc::new(auth.clone());

        let tasks: Arc<dyn RemoteTable<Task>> = gateway.clone();
        let projects: Arc<dyn RemoteTable<Project>> = gateway.clone();
        let team: Arc<dyn RemoteTable<TeamMember>> = gateway;

        Self {
            tasks: EntityStore::new(tasks, accounts.clone()),
            projects: EntityStore::new(projects, accounts.clone()),
            team: EntityStore::new(team, accounts),
            entitlement: EntitlementEngine::new(auth.clone(), policy, clock),
            auth,
        }
    }

    /// Context backed by the hosted service described in `config`
    pub fn hosted(config: &AppConfig) -> GatewayResult<Self> {
        match &config.gateway {
            GatewayConfig::Hosted { url, anon_key } => {
                let gateway = Arc::new(RestGateway::new(url.as_str(), anon_key.as_str())?);
                Ok(Self::new(gateway, config.trial_policy()))
            }
            GatewayConfig::Local { db_path } => Err(GatewayError::Validation(format!(
                "config points at local database {}",
                db_path.display()
            ))),
        }
    }

    /// Restore the session and, if signed in, load every collection
    pub async fn start(&self) -> GatewayResult<()> {
        self.auth.initialize().await?;
        if self.auth.current_account().is_some() {
            self.refresh_all().await?;
        }
        Ok(())
    }

    /// Fetch all three collections concurrently; returns the first failure.
    ///
    /// Each store records its own error regardless.
    pub async fn refresh_all(&self) -> GatewayResult<()> {
        let (tasks, projects, team) = tokio::join!(
            self.tasks.fetch_all(),
            self.projects.fetch_all(),
            self.team.fetch_all()
        );
        tasks.and(projects).and(team)
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> GatewayResult<Session> {
        let session = self.auth.sign_in(email, password).await?;
        self.clear_stores();
        if let Err(e) = self.refresh_all().await {
            log::warn!("[context] initial load after sign-in failed: {}", e);
        }
        Ok(session)
    }

    pub async fn sign_up(&self, email: &str, password: &str, full_name: &str) -> GatewayResult<Session> {
        let session = self.auth.sign_up(email, password, full_name).await?;
        self.clear_stores();
        Ok(session)
    }

    /// Wait for pending syncs, then drop the session and every cached collection
    pub async fn sign_out(&self) -> GatewayResult<()> {
        self.flush().await;
        let result = self.auth.sign_out().await;
        self.clear_stores();
        result
    }

    pub async fn flush(&self) {
        tokio::join!(self.tasks.flush(), self.projects.flush(), self.team.flush());
    }

    fn clear_stores(&self) {
        self.tasks.clear();
        self.projects.clear();
        self.team.clear();
    }
}
