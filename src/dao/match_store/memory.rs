//! In-process [`MatchStore`] used in single-device mode and in tests.

use std::sync::Arc;

use dashmap::DashMap;
use futures::{StreamExt, future::BoxFuture, stream};
use indexmap::IndexMap;
use tokio::sync::{Mutex, broadcast};
use tokio_stream::wrappers::BroadcastStream;
use uuid::Uuid;

use crate::dao::{
    match_store::{MatchSnapshots, MatchStore, merge_record, page_history},
    models::{MatchEntity, MatchRecordEntity},
    storage::{StorageError, StorageResult},
};

const WATCH_CAPACITY: usize = 16;

/// Shared in-memory mirror. Clones see the same documents.
#[derive(Clone, Default)]
pub struct MemoryMatchStore {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    live: DashMap<Uuid, MatchEntity>,
    watchers: DashMap<Uuid, broadcast::Sender<MatchEntity>>,
    history: Mutex<IndexMap<Uuid, MatchRecordEntity>>,
}

impl MemoryMatchStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a record as deleted, standing in for the external actor that owns deletion.
    pub async fn tombstone(&self, id: Uuid, actor: &str) -> bool {
        let mut history = self.inner.history.lock().await;
        let Some(record) = history.get_mut(&id) else {
            return false;
        };
        record.deleted = true;
        record.deleted_by = Some(actor.to_string());
        record.deleted_at = Some(std::time::SystemTime::now());
        true
    }

    fn sender(&self, id: Uuid) -> broadcast::Sender<MatchEntity> {
        self.inner
            .watchers
            .entry(id)
            .or_insert_with(|| broadcast::channel(WATCH_CAPACITY).0)
            .clone()
    }
}

impl MatchStore for MemoryMatchStore {
    fn save_live_match(&self, game: MatchEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            store.inner.live.insert(game.id, game.clone());
            if let Some(sender) = store.inner.watchers.get(&game.id) {
                let _ = sender.send(game);
            }
            Ok(())
        })
    }

    fn find_live_match(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<MatchEntity>>> {
        let store = self.clone();
        Box::pin(async move { Ok(store.inner.live.get(&id).map(|entry| entry.clone())) })
    }

    fn watch_match(&self, id: Uuid) -> BoxFuture<'static, StorageResult<MatchSnapshots>> {
        let store = self.clone();
        Box::pin(async move {
            // Subscribe before reading so no write falls between the two.
            let receiver = store.sender(id).subscribe();
            let current = store.inner.live.get(&id).map(|entry| entry.clone());

            let updates = BroadcastStream::new(receiver)
                .filter_map(|update| async move { update.ok().map(Ok::<_, StorageError>) });
            Ok(stream::iter(current.map(Ok)).chain(updates).boxed())
        })
    }

    fn archive_match(&self, record: MatchRecordEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            record.check_consistency()?;
            let mut history = store.inner.history.lock().await;
            let merged = merge_record(history.get(&record.game.id), record);
            history.insert(merged.game.id, merged);
            Ok(())
        })
    }

    fn list_history(
        &self,
        offset: usize,
        limit: usize,
    ) -> BoxFuture<'static, StorageResult<Vec<MatchRecordEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let history = store.inner.history.lock().await;
            Ok(page_history(history.values().cloned(), offset, limit))
        })
    }

    fn list_series(
        &self,
        series_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<MatchRecordEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let history = store.inner.history.lock().await;
            Ok(history
                .values()
                .filter(|record| !record.deleted)
                .filter(|record| record.game.series.is_some_and(|series| series.id == series_id))
                .cloned()
                .collect())
        })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, SystemTime};

    use super::*;
    use crate::state::{
        bids::BidType,
        ledger::TeamId,
        session::{MatchMode, MatchSession, SeriesInfo},
        win_policy::TargetScore,
    };

    fn finished(series: Option<SeriesInfo>, date: Option<SystemTime>) -> MatchEntity {
        let mut session = MatchSession::new(MatchMode::OneVsOne, TargetScore::Fifteen);
        session.set_series(series);
        session.set_metadata(None, date);
        session
            .add_points(TeamId::Ellos, 15, BidType::ManualAdjustment)
            .unwrap();
        MatchEntity::from(session.state())
    }

    #[tokio::test]
    async fn watch_delivers_current_document_then_updates() {
        let store = MemoryMatchStore::new();
        let mut game = finished(None, None);
        store.save_live_match(game.clone()).await.unwrap();

        let mut snapshots = store.watch_match(game.id).await.unwrap();
        assert_eq!(snapshots.next().await.unwrap().unwrap(), game);

        game.nosotros.name = "Renamed".into();
        store.save_live_match(game.clone()).await.unwrap();
        let update = snapshots.next().await.unwrap().unwrap();
        assert_eq!(update.nosotros.name, "Renamed");
    }

    #[tokio::test]
    async fn history_is_paged_by_descending_effective_date() {
        let store = MemoryMatchStore::new();
        let base = SystemTime::UNIX_EPOCH + Duration::from_secs(1_000);
        let older = finished(None, Some(base));
        let newer = finished(None, Some(base + Duration::from_secs(60)));
        let newest = finished(None, None);

        for game in [&older, &newest, &newer] {
            store
                .archive_match(MatchRecordEntity::finalized(game.clone()))
                .await
                .unwrap();
        }

        let page = store.list_history(0, 2).await.unwrap();
        let ids = page.iter().map(|record| record.game.id).collect::<Vec<_>>();
        assert_eq!(ids, vec![newest.id, newer.id]);

        let rest = store.list_history(2, 2).await.unwrap();
        assert_eq!(rest.len(), 1);
        assert_eq!(rest[0].game.id, older.id);
    }

    #[tokio::test]
    async fn archiving_twice_keeps_the_tombstone() {
        let store = MemoryMatchStore::new();
        let game = finished(None, None);
        let record = MatchRecordEntity::finalized(game.clone());

        store.archive_match(record.clone()).await.unwrap();
        assert!(store.tombstone(game.id, "admin").await);
        store.archive_match(record).await.unwrap();

        assert!(store.list_history(0, 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn inconsistent_records_are_rejected() {
        let store = MemoryMatchStore::new();
        let mut record = MatchRecordEntity::finalized(finished(None, None));
        record.game.winner = Some(TeamId::Nosotros);

        let result = store.archive_match(record).await;
        assert!(matches!(
            result,
            Err(StorageError::ResultInconsistency { .. })
        ));
        assert!(store.list_history(0, 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn series_listing_filters_by_series() {
        let store = MemoryMatchStore::new();
        let series = SeriesInfo::best_of(3);
        for game in [finished(Some(series), None), finished(None, None)] {
            store
                .archive_match(MatchRecordEntity::finalized(game))
                .await
                .unwrap();
        }

        let records = store.list_series(series.id).await.unwrap();
        assert_eq!(records.len(), 1);
    }
}
