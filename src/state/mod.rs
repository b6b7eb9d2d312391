pub mod bids;
pub mod ledger;
pub mod reconcile;
pub mod rotation;
pub mod series;
pub mod session;
mod sse;
pub mod win_policy;

use std::sync::Arc;

use tokio::sync::{RwLock, watch};

use crate::{
    config::AppConfig,
    dao::{local_snapshot::LocalSnapshot, match_store::MatchStore, players::PlayerDirectory},
    error::ServiceError,
    services::sync_reconciler::SyncReconciler,
    state::session::{MatchMode, MatchSession},
};

pub use self::sse::SseHub;

/// Shared handle passed to every handler and background task.
pub type SharedState = Arc<AppState>;

const PUBLIC_SSE_CAPACITY: usize = 32;

/// Central application state: the active match, its collaborators and the storage handle.
pub struct AppState {
    config: AppConfig,
    match_store: RwLock<Option<Arc<dyn MatchStore>>>,
    players: Arc<dyn PlayerDirectory>,
    snapshot: LocalSnapshot,
    public_sse: SseHub,
    session: RwLock<MatchSession>,
    sync: SyncReconciler,
    degraded: watch::Sender<bool>,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be cloned cheaply.
    ///
    /// The application starts in degraded mode until a storage backend is installed.
    pub fn new(
        config: AppConfig,
        players: Arc<dyn PlayerDirectory>,
        snapshot: LocalSnapshot,
    ) -> SharedState {
        let (degraded_tx, _rx) = watch::channel(true);
        let session = MatchSession::new(MatchMode::default(), config.default_target_score());

        Arc::new(Self {
            config,
            match_store: RwLock::new(None),
            players,
            snapshot,
            public_sse: SseHub::new(PUBLIC_SSE_CAPACITY),
            session: RwLock::new(session),
            sync: SyncReconciler::new(),
            degraded: degraded_tx,
        })
    }

    /// Runtime configuration.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Obtain a handle to the current match store, if one is installed.
    pub async fn match_store(&self) -> Option<Arc<dyn MatchStore>> {
        let guard = self.match_store.read().await;
        guard.as_ref().cloned()
    }

    /// Install a new match store implementation and leave degraded mode.
    pub async fn set_match_store(&self, store: Arc<dyn MatchStore>) {
        {
            let mut guard = self.match_store.write().await;
            *guard = Some(store);
        }
        self.update_degraded(false);
    }

    /// Remove the current match store and enter degraded mode.
    pub async fn clear_match_store(&self) {
        {
            let mut guard = self.match_store.write().await;
            guard.take();
        }
        self.update_degraded(true);
    }

    /// Return the match store or fail when running degraded.
    pub async fn require_match_store(&self) -> Result<Arc<dyn MatchStore>, ServiceError> {
        if self.is_degraded() {
            return Err(ServiceError::Degraded);
        }
        self.match_store().await.ok_or(ServiceError::Degraded)
    }

    /// Current degraded flag.
    pub fn is_degraded(&self) -> bool {
        *self.degraded.borrow()
    }

    /// Update and broadcast the degraded flag when the value changes.
    pub fn update_degraded(&self, value: bool) {
        self.degraded.send_if_modified(|current| {
            if *current == value {
                return false;
            }
            *current = value;
            true
        });
    }

    /// Subscribe to degraded mode updates.
    pub fn degraded_watcher(&self) -> watch::Receiver<bool> {
        self.degraded.subscribe()
    }

    /// Read-only player lookup.
    pub fn players(&self) -> &dyn PlayerDirectory {
        self.players.as_ref()
    }

    /// Local JSON snapshot of the active match.
    pub fn snapshot(&self) -> &LocalSnapshot {
        &self.snapshot
    }

    /// Broadcast hub used for the public SSE stream.
    pub fn public_sse(&self) -> &SseHub {
        &self.public_sse
    }

    /// The single session object every mutation goes through.
    pub fn session(&self) -> &RwLock<MatchSession> {
        &self.session
    }

    /// Mirror outbox and remote subscription handle.
    pub fn sync(&self) -> &SyncReconciler {
        &self.sync
    }

    /// Run `f` against the current session under a read lock.
    pub async fn read_session<F, T>(&self, f: F) -> T
    where
        F: FnOnce(&MatchSession) -> T,
    {
        let guard = self.session.read().await;
        f(&guard)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dao::{match_store::memory::MemoryMatchStore, players::StaticPlayerDirectory};

    fn state() -> SharedState {
        AppState::new(
            AppConfig::default(),
            Arc::new(StaticPlayerDirectory::default()),
            LocalSnapshot::disabled(),
        )
    }

    #[tokio::test]
    async fn starts_degraded_until_a_store_is_installed() {
        let state = state();
        assert!(state.is_degraded());
        assert!(matches!(
            state.require_match_store().await,
            Err(ServiceError::Degraded)
        ));

        state
            .set_match_store(Arc::new(MemoryMatchStore::new()))
            .await;
        assert!(!state.is_degraded());
        assert!(state.require_match_store().await.is_ok());

        state.clear_match_store().await;
        assert!(state.is_degraded());
    }

    #[tokio::test]
    async fn degraded_watcher_only_sees_real_changes() {
        let state = state();
        let mut watcher = state.degraded_watcher();
        state.update_degraded(true);
        assert!(!watcher.has_changed().unwrap());

        state.update_degraded(false);
        assert!(watcher.has_changed().unwrap());
        assert!(!*watcher.borrow_and_update());
    }
}
