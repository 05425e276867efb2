//! In-memory gateway for unit tests.
//!
//! Rows are kept as JSON objects per collection so one implementation
//! serves every entity type. Failures can be queued per operation and
//! calls can be held open to observe state while a request is in flight.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::{watch, Notify};

use crate::error::{GatewayError, GatewayResult};
use crate::gateway::{AccountSource, AuthGateway, RemoteTable, Session};
use crate::models::{AccountId, Entity, Profile, ProfileFlag};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum Op {
    List,
    Insert,
    Update,
    Delete,
    FetchProfile,
    UpdateProfile,
}

pub(crate) struct FakeGateway {
    tables: Mutex<HashMap<&'static str, Vec<Value>>>,
    profiles: Mutex<HashMap<AccountId, Profile>>,
    users: Mutex<HashMap<String, (String, AccountId)>>,
    session: Mutex<Option<Session>>,
    failures: Mutex<VecDeque<(Op, GatewayError)>>,
    calls: Mutex<Vec<Op>>,
    latches: Mutex<VecDeque<(Op, Arc<Notify>)>>,
    next_id: AtomicUsize,
    tick: AtomicI64,
    gate: watch::Sender<bool>,
}

impl FakeGateway {
    pub(crate) fn new() -> Arc<Self> {
        let (gate, _) = watch::channel(true);
        Arc::new(Self {
            tables: Mutex::new(HashMap::new()),
            profiles: Mutex::new(HashMap::new()),
            users: Mutex::new(HashMap::new()),
            session: Mutex::new(None),
            failures: Mutex::new(VecDeque::new()),
            calls: Mutex::new(Vec::new()),
            latches: Mutex::new(VecDeque::new()),
            next_id: AtomicUsize::new(1),
            tick: AtomicI64::new(0),
            gate,
        })
    }

    /// Gateway with a signed-in account `u-1` and its profile
    pub(crate) fn signed_in() -> Arc<Self> {
        let gateway = Self::new();
        gateway.add_account("u-1", "ada@example.com", "secret", Utc::now());
        gateway.set_session("u-1");
        gateway
    }

    pub(crate) fn add_account(&self, id: &str, email: &str, password: &str, created_at: DateTime<Utc>) {
        let account = AccountId::new(id);
        self.users
            .lock()
            .insert(email.to_string(), (password.to_string(), account.clone()));
        self.profiles.lock().insert(
            account.clone(),
            Profile {
                id: account,
                email: Some(email.to_string()),
                full_name: None,
                avatar_url: None,
                is_premium: false,
                created_at,
            },
        );
    }

    pub(crate) fn set_session(&self, id: &str) {
        *self.session.lock() = Some(Session {
            account: AccountId::new(id),
            email: None,
            access_token: format!("token-{}", id),
        });
    }

    pub(crate) fn profile(&self, id: &str) -> Option<Profile> {
        self.profiles.lock().get(&AccountId::new(id)).cloned()
    }

    /// Queue a failure for the next call of `op`
    pub(crate) fn fail_next(&self, op: Op, error: GatewayError) {
        self.failures.lock().push_back((op, error));
    }

    /// Block every following call until [`release`](Self::release)
    pub(crate) fn hold(&self) {
        self.gate.send_replace(false);
    }

    pub(crate) fn release(&self) {
        self.gate.send_replace(true);
    }

    /// Hold only the next call of `op`; a held `List` has already read
    /// its rows, so it answers with the data as of its arrival.
    ///
    /// The call resumes once the returned latch is notified.
    pub(crate) fn hold_next(&self, op: Op) -> Arc<Notify> {
        let latch = Arc::new(Notify::new());
        self.latches.lock().push_back((op, latch.clone()));
        latch
    }

    pub(crate) fn calls(&self, op: Op) -> usize {
        self.calls.lock().iter().filter(|c| **c == op).count()
    }

    pub(crate) fn total_calls(&self) -> usize {
        self.calls.lock().len()
    }

    /// Wait until at least `n` calls of `op` have been issued
    pub(crate) async fn wait_for_calls(&self, op: Op, n: usize) {
        while self.calls(op) < n {
            tokio::task::yield_now().await;
        }
    }

    /// Insert a row directly, bypassing call accounting
    pub(crate) fn seed<E: Entity>(&self, new_row: E::NewRow) -> E::Row {
        let value = self.materialize(serde_json::to_value(new_row).expect("serializable row"));
        self.tables.lock().entry(E::TABLE).or_default().insert(0, value.clone());
        serde_json::from_value(value).expect("row shape")
    }

    /// Remove a row directly, as if another client deleted it
    pub(crate) fn remove_remote(&self, table: &str, id: &str) {
        if let Some(rows) = self.tables.lock().get_mut(table) {
            rows.retain(|row| row["id"] != id);
        }
    }

    pub(crate) fn remote_ids(&self, table: &str) -> Vec<String> {
        self.tables
            .lock()
            .get(table)
            .map(|rows| rows.iter().filter_map(|r| r["id"].as_str().map(String::from)).collect())
            .unwrap_or_default()
    }

    fn materialize(&self, mut value: Value) -> Value {
        let n = self.next_id.fetch_add(1, Ordering::SeqCst);
        let tick = self.tick.fetch_add(1, Ordering::SeqCst);
        let created_at = Utc.timestamp_opt(1_767_225_600, 0).single().unwrap_or_else(Utc::now) + Duration::seconds(tick);
        if let Some(object) = value.as_object_mut() {
            object.insert("id".into(), Value::String(format!("id-{}", n)));
            object.insert("created_at".into(), Value::String(created_at.to_rfc3339()));
        }
        value
    }

    async fn enter(&self, op: Op) -> GatewayResult<()> {
        if let Some(latch) = self.admit(op).await? {
            latch.notified().await;
        }
        Ok(())
    }

    /// Record the call, pass the global gate and claim any per-call latch
    async fn admit(&self, op: Op) -> GatewayResult<Option<Arc<Notify>>> {
        let latch = {
            let mut latches = self.latches.lock();
            latches
                .iter()
                .position(|(o, _)| *o == op)
                .and_then(|pos| latches.remove(pos))
                .map(|(_, latch)| latch)
        };
        self.calls.lock().push(op);
        let mut gate = self.gate.subscribe();
        let _ = gate.wait_for(|open| *open).await;
        let mut failures = self.failures.lock();
        if let Some(pos) = failures.iter().position(|(o, _)| *o == op) {
            if let Some((_, error)) = failures.remove(pos) {
                return Err(error);
            }
        }
        Ok(latch)
    }

    fn owner(&self) -> GatewayResult<AccountId> {
        self.session
            .lock()
            .as_ref()
            .map(|s| s.account.clone())
            .ok_or_else(|| GatewayError::Auth("no session".into()))
    }
}

#[async_trait]
impl<E: Entity> RemoteTable<E> for FakeGateway {
    async fn list(&self) -> GatewayResult<Vec<E::Row>> {
        let latch = self.admit(Op::List).await?;
        let owner = self.owner()?;
        let rows = self.tables.lock().get(E::TABLE).cloned().unwrap_or_default();
        if let Some(latch) = latch {
            latch.notified().await;
        }
        rows.into_iter()
            .filter(|row| row["user_id"] == owner.as_str())
            .map(|row| serde_json::from_value(row).map_err(|e| GatewayError::Transport(e.to_string())))
            .collect()
    }

    async fn insert(&self, row: E::NewRow) -> GatewayResult<E::Row> {
        self.enter(Op::Insert).await?;
        let value = serde_json::to_value(row).map_err(|e| GatewayError::Validation(e.to_string()))?;
        let value = self.materialize(value);
        self.tables.lock().entry(E::TABLE).or_default().insert(0, value.clone());
        serde_json::from_value(value).map_err(|e| GatewayError::Validation(e.to_string()))
    }

    async fn update(&self, id: &str, patch: E::RowPatch) -> GatewayResult<()> {
        self.enter(Op::Update).await?;
        let patch = serde_json::to_value(patch).map_err(|e| GatewayError::Validation(e.to_string()))?;
        let mut tables = self.tables.lock();
        let row = tables
            .get_mut(E::TABLE)
            .and_then(|rows| rows.iter_mut().find(|row| row["id"] == id))
            .ok_or_else(|| GatewayError::NotFound(format!("{} {}", E::TABLE, id)))?;
        if let (Some(row), Some(patch)) = (row.as_object_mut(), patch.as_object()) {
            for (key, value) in patch {
                row.insert(key.clone(), value.clone());
            }
        }
        Ok(())
    }

    async fn delete(&self, id: &str) -> GatewayResult<()> {
        self.enter(Op::Delete).await?;
        let mut tables = self.tables.lock();
        let rows = tables.entry(E::TABLE).or_default();
        let before = rows.len();
        rows.retain(|row| row["id"] != id);
        if rows.len() == before {
            return Err(GatewayError::NotFound(format!("{} {}", E::TABLE, id)));
        }
        Ok(())
    }
}

#[async_trait]
impl AuthGateway for FakeGateway {
    async fn restore_session(&self) -> GatewayResult<Option<Session>> {
        Ok(self.session.lock().clone())
    }

    async fn sign_in(&self, email: &str, password: &str) -> GatewayResult<Session> {
        let account = match self.users.lock().get(email) {
            Some((stored, account)) if stored == password => account.clone(),
            _ => return Err(GatewayError::Auth("Invalid login credentials".into())),
        };
        self.set_session(account.as_str());
        Ok(self.session.lock().clone().expect("session just set"))
    }

    async fn sign_up(&self, email: &str, password: &str, _full_name: &str) -> GatewayResult<Session> {
        if self.users.lock().contains_key(email) {
            return Err(GatewayError::Validation("User already registered".into()));
        }
        let id = format!("u-{}", self.next_id.fetch_add(1, Ordering::SeqCst));
        self.add_account(&id, email, password, Utc::now());
        self.set_session(&id);
        Ok(self.session.lock().clone().expect("session just set"))
    }

    async fn sign_out(&self) -> GatewayResult<()> {
        *self.session.lock() = None;
        Ok(())
    }

    async fn fetch_profile(&self, account: &AccountId) -> GatewayResult<Profile> {
        self.enter(Op::FetchProfile).await?;
        self.profiles
            .lock()
            .get(account)
            .cloned()
            .ok_or_else(|| GatewayError::NotFound(format!("profile {}", account)))
    }

    async fn update_profile_flag(&self, account: &AccountId, flag: ProfileFlag, value: bool) -> GatewayResult<()> {
        self.enter(Op::UpdateProfile).await?;
        let mut profiles = self.profiles.lock();
        let profile = profiles
            .get_mut(account)
            .ok_or_else(|| GatewayError::NotFound(format!("profile {}", account)))?;
        match flag {
            ProfileFlag::IsPremium => profile.is_premium = value,
        }
        Ok(())
    }
}

/// Fixed account source for store tests
pub(crate) struct StaticAccount(pub(crate) Option<AccountId>);

impl AccountSource for StaticAccount {
    fn current_account(&self) -> Option<AccountId> {
        self.0.clone()
    }
}
