//! Entity Stores
//!
//! One long-lived store per entity type, holding the local collection, a
//! loading flag and an error slot.
//!
//! `fetch_all` and `add` wait for the gateway before touching `items`.
//! `update` and `delete` are two-phase: the local collection changes
//! immediately, then a spawned task sends the change to the gateway. If
//! that call fails the error is recorded and the whole collection is
//! fetched again; there is no field-level rollback and no retry beyond
//! that single resync.

use std::future::Future;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::{watch, Notify};
use tokio::task::JoinHandle;

use crate::error::{GatewayError, GatewayResult};
use crate::gateway::{AccountSource, RemoteTable};
use crate::models::{Entity, Project, Task, TaskPatch, TeamMember};

pub type TaskStore = EntityStore<Task>;
pub type ProjectStore = EntityStore<Project>;
pub type TeamStore = EntityStore<TeamMember>;

/// Point-in-time copy of a store's observable state
#[derive(Debug, Clone, PartialEq)]
pub struct StoreSnapshot<E> {
    /// Newest first
    pub items: Vec<E>,
    pub is_loading: bool,
    pub error: Option<String>,
}

/// How the background half of an optimistic mutation ended
#[derive(Debug, Clone, PartialEq)]
pub enum SyncOutcome {
    /// The gateway applied the change; local state already matched
    Confirmed,
    /// The gateway rejected the change and the collection was fetched again
    Resynced(GatewayError),
    /// The background task did not run to completion (runtime shut down)
    Abandoned,
}

/// Handle on the background half of `update`/`delete`.
///
/// Dropping it does not cancel the remote call.
#[must_use = "dropping the ticket detaches the sync; await `settled` to observe the outcome"]
#[derive(Debug)]
pub struct SyncTicket {
    handle: JoinHandle<SyncOutcome>,
}

impl SyncTicket {
    pub async fn settled(self) -> SyncOutcome {
        self.handle.await.unwrap_or(SyncOutcome::Abandoned)
    }
}

struct StoreState<E> {
    items: Vec<E>,
    error: Option<String>,
    /// fetch/add requests awaiting the gateway
    outstanding: usize,
    /// issue number of the last fetch whose response replaced `items`
    applied_fetch: u64,
}

struct StoreInner<E: Entity> {
    state: RwLock<StoreState<E>>,
    remote: Arc<dyn RemoteTable<E>>,
    accounts: Arc<dyn AccountSource>,
    version: watch::Sender<u64>,
    fetch_seq: AtomicU64,
    in_flight: AtomicUsize,
    idle: Notify,
}

/// Optimistic state container for one entity type
pub struct EntityStore<E: Entity> {
    inner: Arc<StoreInner<E>>,
}

impl<E: Entity> Clone for EntityStore<E> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<E: Entity> EntityStore<E> {
    pub fn new(remote: Arc<dyn RemoteTable<E>>, accounts: Arc<dyn AccountSource>) -> Self {
        let (version, _) = watch::channel(0);
        Self {
            inner: Arc::new(StoreInner {
                state: RwLock::new(StoreState {
                    items: Vec::new(),
                    error: None,
                    outstanding: 0,
                    applied_fetch: 0,
                }),
                remote,
                accounts,
                version,
                fetch_seq: AtomicU64::new(0),
                in_flight: AtomicUsize::new(0),
                idle: Notify::new(),
            }),
        }
    }

    pub fn snapshot(&self) -> StoreSnapshot<E> {
        let state = self.inner.state.read();
        StoreSnapshot {
            items: state.items.clone(),
            is_loading: state.outstanding > 0,
            error: state.error.clone(),
        }
    }

    pub fn items(&self) -> Vec<E> {
        self.inner.state.read().items.clone()
    }

    pub fn get(&self, id: &str) -> Option<E> {
        self.inner
            .state
            .read()
            .items
            .iter()
            .find(|item| item.id() == id)
            .cloned()
    }

    pub fn is_loading(&self) -> bool {
        self.inner.state.read().outstanding > 0
    }

    pub fn error(&self) -> Option<String> {
        self.inner.state.read().error.clone()
    }

    pub fn clear_error(&self) {
        self.inner.state.write().error = None;
        self.inner.notify();
    }

    /// Change counter, bumped after every observable state change
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.inner.version.subscribe()
    }

    /// Whether any optimistic mutation is still waiting on the gateway
    pub fn is_syncing(&self) -> bool {
        self.inner.in_flight.load(Ordering::SeqCst) > 0
    }

    /// Drop all local state (sign-out). Fetches already in flight are ignored when they land.
    pub fn clear(&self) {
        {
            let mut state = self.inner.state.write();
            state.items.clear();
            state.error = None;
            state.applied_fetch = self.inner.fetch_seq.load(Ordering::SeqCst);
        }
        self.inner.notify();
    }

    /// Replace `items` with the authoritative collection
    pub async fn fetch_all(&self) -> GatewayResult<()> {
        self.inner.fetch(true).await
    }

    /// User-facing retry after an error; same as [`fetch_all`](Self::fetch_all)
    pub async fn retry(&self) -> GatewayResult<()> {
        self.fetch_all().await
    }

    /// Create a record. Not optimistic: the item appears only once the gateway returns it.
    pub async fn add(&self, draft: E::Draft) -> GatewayResult<E> {
        let Some(owner) = self.inner.accounts.current_account() else {
            let error = GatewayError::NotAuthenticated;
            self.inner.record_error(&error);
            return Err(error);
        };

        self.inner.begin_request(true);
        let result = self.inner.remote.insert(E::new_row(&draft, &owner)).await;

        let outcome = {
            let mut state = self.inner.state.write();
            state.outstanding -= 1;
            match result {
                Ok(row) => {
                    let item = E::from_row(row);
                    state.items.insert(0, item.clone());
                    Ok(item)
                }
                Err(error) => {
                    state.error = Some(error.to_string());
                    Err(error)
                }
            }
        };
        self.inner.notify();
        match &outcome {
            Ok(item) => log::debug!("[store:{}] added {}", E::TABLE, item.id()),
            Err(error) => log::warn!("[store:{}] add failed: {}", E::TABLE, error),
        }
        outcome
    }

    /// Merge `patch` into the local item now, then send it to the gateway
    pub fn update(&self, id: &str, patch: E::Patch) -> SyncTicket {
        let found = {
            let mut state = self.inner.state.write();
            match state.items.iter_mut().find(|item| item.id() == id) {
                Some(item) => {
                    item.apply(&patch);
                    true
                }
                None => false,
            }
        };
        if found {
            self.inner.notify();
        } else {
            log::debug!("[store:{}] update of unknown {} sent without local merge", E::TABLE, id);
        }

        let remote = Arc::clone(&self.inner.remote);
        let row_patch = E::row_patch(&patch);
        let target = id.to_string();
        self.spawn_sync("update", id, async move { remote.update(&target, row_patch).await })
    }

    /// Remove the local item now, then delete it remotely
    pub fn delete(&self, id: &str) -> SyncTicket {
        {
            let mut state = self.inner.state.write();
            state.items.retain(|item| item.id() != id);
        }
        self.inner.notify();

        let remote = Arc::clone(&self.inner.remote);
        let target = id.to_string();
        self.spawn_sync("delete", id, async move { remote.delete(&target).await })
    }

    /// Wait until every background sync (and any resync it triggered) has finished
    pub async fn flush(&self) {
        loop {
            let idle = self.inner.idle.notified();
            if self.inner.in_flight.load(Ordering::SeqCst) == 0 {
                return;
            }
            idle.await;
        }
    }

    fn spawn_sync<F>(&self, op: &'static str, id: &str, call: F) -> SyncTicket
    where
        F: Future<Output = GatewayResult<()>> + Send + 'static,
    {
        let inner = Arc::clone(&self.inner);
        let id = id.to_string();
        inner.in_flight.fetch_add(1, Ordering::SeqCst);
        let guard = InFlight(Arc::clone(&inner));

        let handle = tokio::spawn(async move {
            let _guard = guard;
            match call.await {
                Ok(()) => {
                    log::debug!("[store:{}] {} {} confirmed", E::TABLE, op, id);
                    SyncOutcome::Confirmed
                }
                Err(error) => {
                    log::warn!("[store:{}] {} {} failed, resyncing: {}", E::TABLE, op, id, error);
                    inner.record_error(&error);
                    // The resync keeps the mutation error visible; its own failure overwrites it
                    let _ = inner.fetch(false).await;
                    SyncOutcome::Resynced(error)
                }
            }
        });
        SyncTicket { handle }
    }
}

impl EntityStore<Task> {
    /// Flip `completed` on a task, optimistically. `None` if the task is not loaded.
    pub fn toggle_completed(&self, id: &str) -> Option<SyncTicket> {
        let completed = self.get(id)?.completed;
        Some(self.update(id, TaskPatch::new().completed(!completed)))
    }
}

impl<E: Entity> StoreInner<E> {
    fn notify(&self) {
        self.version.send_modify(|v| *v += 1);
    }

    fn record_error(&self, error: &GatewayError) {
        self.state.write().error = Some(error.to_string());
        self.notify();
    }

    fn begin_request(&self, clear_error: bool) {
        {
            let mut state = self.state.write();
            state.outstanding += 1;
            if clear_error {
                state.error = None;
            }
        }
        self.notify();
    }

    async fn fetch(&self, clear_error: bool) -> GatewayResult<()> {
        let seq = self.fetch_seq.fetch_add(1, Ordering::SeqCst) + 1;
        self.begin_request(clear_error);
        let result = self.remote.list().await;

        let outcome = {
            let mut state = self.state.write();
            state.outstanding -= 1;
            match result {
                Ok(rows) if seq > state.applied_fetch => {
                    state.applied_fetch = seq;
                    state.items = rows.into_iter().map(E::from_row).collect();
                    Ok(())
                }
                Ok(_) => {
                    log::debug!("[store:{}] dropping stale fetch #{}", E::TABLE, seq);
                    Ok(())
                }
                Err(error) => {
                    state.error = Some(error.to_string());
                    Err(error)
                }
            }
        };
        self.notify();
        if let Err(error) = &outcome {
            log::warn!("[store:{}] fetch failed, keeping previous items: {}", E::TABLE, error);
        }
        outcome
    }
}

/// Counts a background sync as in flight until dropped
struct InFlight<E: Entity>(Arc<StoreInner<E>>);

impl<E: Entity> Drop for InFlight<E> {
    fn drop(&mut self) {
        if self.0.in_flight.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.0.idle.notify_waiters();
        }
    }
}
