//! Mirror of the active match on the remote store.
//!
//! Local changes are queued in a single-slot outbox drained by one writer
//! task, so writes reach the store in mutation order and a burst of changes
//! collapses into the newest document. Remote snapshots of the listened match
//! come back through [`apply_remote_snapshot`].

use futures::StreamExt;
use tokio::{
    sync::{Mutex, watch},
    task::JoinHandle,
};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    dao::models::{MatchEntity, MatchRecordEntity},
    error::ServiceError,
    services::{
        history_service,
        match_service::{Origin, publish},
        sse_events,
    },
    state::{
        SharedState,
        reconcile::{self, SyncDecision},
        session::MatchState,
    },
};

struct Subscription {
    match_id: Uuid,
    task: JoinHandle<()>,
}

/// Outbox of pending mirror writes and the handle of the remote subscription.
pub struct SyncReconciler {
    outbox: watch::Sender<Option<MatchEntity>>,
    archives: Mutex<Vec<MatchRecordEntity>>,
    subscription: Mutex<Option<Subscription>>,
}

impl SyncReconciler {
    /// Empty outbox, not listening.
    pub fn new() -> Self {
        let (outbox, _rx) = watch::channel(None);
        Self {
            outbox,
            archives: Mutex::new(Vec::new()),
            subscription: Mutex::new(None),
        }
    }

    /// Queue `game` for the mirror, replacing any write not yet performed.
    pub fn push(&self, game: MatchEntity) {
        self.outbox.send_replace(Some(game));
    }

    /// Keep a finalized record until the store accepts it.
    pub async fn defer_archive(&self, record: MatchRecordEntity) {
        let mut archives = self.archives.lock().await;
        archives.retain(|queued| queued.game.id != record.game.id);
        archives.push(record);
    }

    /// Drain the records waiting to be archived, oldest first.
    pub async fn take_deferred_archives(&self) -> Vec<MatchRecordEntity> {
        std::mem::take(&mut *self.archives.lock().await)
    }

    /// Number of finalized records not archived yet.
    pub async fn deferred_archive_count(&self) -> usize {
        self.archives.lock().await.len()
    }

    /// Match currently listened to, if any.
    pub async fn listening_to(&self) -> Option<Uuid> {
        let guard = self.subscription.lock().await;
        guard
            .as_ref()
            .filter(|subscription| !subscription.task.is_finished())
            .map(|subscription| subscription.match_id)
    }
}

impl Default for SyncReconciler {
    fn default() -> Self {
        Self::new()
    }
}

/// Spawn the task that drains the outbox into the match store.
///
/// A write skipped while degraded is flushed once storage comes back, along
/// with the finished matches waiting to be archived. A failed mirror write is
/// only logged.
pub fn spawn_writer(state: SharedState) -> JoinHandle<()> {
    let mut outbox = state.sync().outbox.subscribe();
    let mut degraded = state.degraded_watcher();
    outbox.mark_changed();

    tokio::spawn(async move {
        let mut skipped = false;
        loop {
            tokio::select! {
                changed = outbox.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
                changed = degraded.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    if *degraded.borrow_and_update() {
                        continue;
                    }
                    history_service::flush_deferred_archives(&state).await;
                    if !skipped {
                        continue;
                    }
                    debug!("storage is back; flushing the pending mirror write");
                }
            }

            let pending = outbox.borrow_and_update().clone();
            if let Some(game) = pending {
                skipped = !write_mirror(&state, game).await;
            }
        }
    })
}

/// Write one document. Returns `false` when the write was skipped for lack of storage.
async fn write_mirror(state: &SharedState, game: MatchEntity) -> bool {
    let id = game.id;
    let store = match state.require_match_store().await {
        Ok(store) => store,
        Err(_) => {
            debug!(match_id = %id, "storage unavailable; mirror write skipped");
            return false;
        }
    };

    match store.save_live_match(game).await {
        Ok(()) => debug!(match_id = %id, "mirrored live match"),
        Err(err) => warn!(match_id = %id, error = %err, "mirror write failed"),
    }
    true
}

/// Subscribe to the remote document of `match_id`. Listening again to the
/// same match is a no-op; listening to another one replaces the subscription.
pub async fn listen_to_match(state: &SharedState, match_id: Uuid) -> Result<(), ServiceError> {
    let store = state.require_match_store().await?;

    let mut slot = state.sync().subscription.lock().await;
    if slot
        .as_ref()
        .is_some_and(|current| current.match_id == match_id && !current.task.is_finished())
    {
        return Ok(());
    }
    if let Some(previous) = slot.take() {
        previous.task.abort();
        debug!(match_id = %previous.match_id, "dropped previous remote subscription");
    }

    let mut snapshots = store.watch_match(match_id).await?;
    let task_state = state.clone();
    let task = tokio::spawn(async move {
        while let Some(snapshot) = snapshots.next().await {
            match snapshot {
                Ok(game) => apply_remote_snapshot(&task_state, game).await,
                Err(err) => warn!(%match_id, error = %err, "remote snapshot unavailable"),
            }
        }
        debug!(%match_id, "remote subscription ended");
    });

    *slot = Some(Subscription { match_id, task });
    info!(%match_id, "listening to remote match");
    Ok(())
}

/// Cancel the remote subscription. Returns the match that was listened to.
pub async fn stop_listening(state: &SharedState) -> Option<Uuid> {
    let mut slot = state.sync().subscription.lock().await;
    let subscription = slot.take()?;
    subscription.task.abort();
    info!(match_id = %subscription.match_id, "stopped listening to remote match");
    Some(subscription.match_id)
}

/// Reconcile one remote snapshot with the local match.
///
/// Remote changes are persisted locally and broadcast. Only an adopted match
/// is queued for the mirror again, so a stale local write still in the outbox
/// cannot shorten the remote document.
pub async fn apply_remote_snapshot(state: &SharedState, game: MatchEntity) {
    let remote = MatchState::from(game);
    let mut session = state.session().write().await;

    match reconcile::decide(session.state(), &remote) {
        SyncDecision::AdoptRemote => {
            let previous = session.adopt(remote);
            let current = session.state().clone();
            publish(state, &current, Origin::Remote).await;
            state.sync().push(MatchEntity::from(&current));
            sse_events::broadcast_match_adopted(state, current.id, previous.id);
            drop(session);

            info!(
                match_id = %current.id,
                previous_match_id = %previous.id,
                actions = current.ledger().len(),
                "adopted remote match"
            );
            if previous.id != current.id {
                history_service::archive_if_finished(state, &previous).await;
            }
        }
        SyncDecision::PatchNames { nosotros, ellos } => {
            session.apply_name_patch(nosotros, ellos);
            let current = session.state().clone();
            publish(state, &current, Origin::Remote).await;
            debug!(match_id = %current.id, "took remote team names");
        }
        SyncDecision::KeepLocal => {
            debug!(match_id = %remote.id, "remote snapshot carries nothing new");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{
        session::{MatchMode, MatchSession},
        win_policy::TargetScore,
    };

    fn record(session: &MatchSession) -> MatchRecordEntity {
        MatchRecordEntity::finalized(MatchEntity::from(session.state()))
    }

    #[tokio::test]
    async fn deferring_the_same_match_twice_keeps_the_latest_record() {
        let sync = SyncReconciler::new();
        let first = MatchSession::new(MatchMode::default(), TargetScore::Thirty);
        let second = MatchSession::new(MatchMode::default(), TargetScore::Fifteen);

        sync.defer_archive(record(&first)).await;
        sync.defer_archive(record(&second)).await;
        let mut renamed = record(&first);
        renamed.game.nosotros.name = "Los de siempre".into();
        sync.defer_archive(renamed).await;
        assert_eq!(sync.deferred_archive_count().await, 2);

        let drained = sync.take_deferred_archives().await;
        assert_eq!(drained[0].game.id, second.state().id);
        assert_eq!(drained[1].game.nosotros.name, "Los de siempre");
        assert_eq!(sync.deferred_archive_count().await, 0);
    }
}
