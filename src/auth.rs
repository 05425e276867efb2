//! Auth Store
//!
//! Holds the current session and the signed-in account's profile. The
//! entity stores read the owner for new rows from here, and the
//! entitlement engine derives trial status from the profile.

use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::watch;

use crate::error::{GatewayError, GatewayResult};
use crate::gateway::{AccountSource, AuthGateway, Session};
use crate::models::{AccountId, Profile};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuthSnapshot {
    pub session: Option<Session>,
    pub profile: Option<Profile>,
    pub is_loading: bool,
}

struct AuthInner {
    gateway: Arc<dyn AuthGateway>,
    state: RwLock<AuthSnapshot>,
    version: watch::Sender<u64>,
}

#[derive(Clone)]
pub struct AuthStore {
    inner: Arc<AuthInner>,
}

impl AuthStore {
    pub fn new(gateway: Arc<dyn AuthGateway>) -> Self {
        let (version, _) = watch::channel(0);
        Self {
            inner: Arc::new(AuthInner {
                gateway,
                // Loading until `initialize` has looked for a session
                state: RwLock::new(AuthSnapshot {
                    is_loading: true,
                    ..AuthSnapshot::default()
                }),
                version,
            }),
        }
    }

    pub(crate) fn gateway(&self) -> Arc<dyn AuthGateway> {
        Arc::clone(&self.inner.gateway)
    }

    pub fn snapshot(&self) -> AuthSnapshot {
        self.inner.state.read().clone()
    }

    pub fn session(&self) -> Option<Session> {
        self.inner.state.read().session.clone()
    }

    pub fn profile(&self) -> Option<Profile> {
        self.inner.state.read().profile.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.inner.state.read().is_loading
    }

    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.inner.version.subscribe()
    }

    /// Restore a persisted session and load its profile.
    ///
    /// A missing profile is not an error; the account simply stays unresolved
    /// for entitlement purposes until the next refresh.
    pub async fn initialize(&self) -> GatewayResult<()> {
        self.set_loading(true);
        let result = match self.inner.gateway.restore_session().await {
            Ok(Some(session)) => {
                log::info!("[auth] restored session for {}", session.account);
                self.set_session(Some(session));
                self.load_profile().await;
                Ok(())
            }
            Ok(None) => Ok(()),
            Err(e) => {
                log::error!("[auth] initialization failed: {}", e);
                Err(e)
            }
        };
        self.set_loading(false);
        result
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> GatewayResult<Session> {
        let session = self.inner.gateway.sign_in(email, password).await?;
        log::info!("[auth] signed in {}", session.account);
        self.set_session(Some(session.clone()));
        self.load_profile().await;
        Ok(session)
    }

    /// Create an account; the gateway also creates its profile with `is_premium = false`
    pub async fn sign_up(&self, email: &str, password: &str, full_name: &str) -> GatewayResult<Session> {
        let session = self.inner.gateway.sign_up(email, password, full_name).await?;
        log::info!("[auth] signed up {}", session.account);
        self.set_session(Some(session.clone()));
        self.load_profile().await;
        Ok(session)
    }

    /// Local state is cleared even if the remote sign-out fails
    pub async fn sign_out(&self) -> GatewayResult<()> {
        let result = self.inner.gateway.sign_out().await;
        if let Err(e) = &result {
            log::warn!("[auth] remote sign-out failed: {}", e);
        }
        {
            let mut state = self.inner.state.write();
            state.session = None;
            state.profile = None;
        }
        self.notify();
        log::info!("[auth] signed out");
        result
    }

    /// Reload the profile of the signed-in account
    pub async fn refresh_profile(&self) -> GatewayResult<Profile> {
        let account = self.current_account().ok_or(GatewayError::NotAuthenticated)?;
        let profile = self.inner.gateway.fetch_profile(&account).await?;

        // Ignore the result if the account changed while the request was out
        let applied = {
            let mut state = self.inner.state.write();
            let current = state.session.as_ref().map(|s| &s.account);
            if current == Some(&account) {
                state.profile = Some(profile.clone());
                true
            } else {
                false
            }
        };
        if applied {
            self.notify();
        }
        Ok(profile)
    }

    async fn load_profile(&self) {
        if let Err(e) = self.refresh_profile().await {
            log::warn!("[auth] profile load failed: {}", e);
        }
    }

    fn set_session(&self, session: Option<Session>) {
        {
            let mut state = self.inner.state.write();
            let switched = state.session.as_ref().map(|s| &s.account) != session.as_ref().map(|s| &s.account);
            if switched {
                state.profile = None;
            }
            state.session = session;
        }
        self.notify();
    }

    fn set_loading(&self, loading: bool) {
        self.inner.state.write().is_loading = loading;
        self.notify();
    }

    fn notify(&self) {
        self.inner.version.send_modify(|v| *v += 1);
    }
}

impl AccountSource for AuthStore {
    fn current_account(&self) -> Option<AccountId> {
        self.inner.state.read().session.as_ref().map(|s| s.account.clone())
    }
}
