#[cfg(feature = "couch-store")]
pub mod couchdb;
pub mod memory;

use crate::dao::models::{MatchEntity, MatchRecordEntity};
use crate::dao::storage::StorageResult;
use futures::{future::BoxFuture, stream::BoxStream};
use uuid::Uuid;

/// Stream of remote snapshots for one match, starting with the current document.
pub type MatchSnapshots = BoxStream<'static, StorageResult<MatchEntity>>;

/// Abstraction over the remote mirror (one document per live match) and the
/// history collaborator (finalized records).
///
/// Implementations must not rely on multi-document transactions.
pub trait MatchStore: Send + Sync {
    /// Merge-write the full live document of a match.
    fn save_live_match(&self, game: MatchEntity) -> BoxFuture<'static, StorageResult<()>>;
    /// Fetch the live document of a match.
    fn find_live_match(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<MatchEntity>>>;
    /// Subscribe to a live document. The current document, if any, is delivered first.
    fn watch_match(&self, id: Uuid) -> BoxFuture<'static, StorageResult<MatchSnapshots>>;
    /// Create or merge a finalized record. Repeating the call is safe and keeps tombstones.
    fn archive_match(&self, record: MatchRecordEntity) -> BoxFuture<'static, StorageResult<()>>;
    /// Non-deleted records by descending effective date.
    fn list_history(
        &self,
        offset: usize,
        limit: usize,
    ) -> BoxFuture<'static, StorageResult<Vec<MatchRecordEntity>>>;
    /// Non-deleted records that belong to `series_id`.
    fn list_series(
        &self,
        series_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<MatchRecordEntity>>>;
    /// Check that the backend answers.
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
    /// Re-establish the backend connection after a failed health check.
    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>>;
}

/// Keep live records, order them by descending effective date and cut one page.
pub(crate) fn page_history(
    records: impl IntoIterator<Item = MatchRecordEntity>,
    offset: usize,
    limit: usize,
) -> Vec<MatchRecordEntity> {
    let mut records = records
        .into_iter()
        .filter(|record| !record.deleted)
        .collect::<Vec<_>>();
    records.sort_by_key(|record| std::cmp::Reverse(record.effective_date()));
    records.into_iter().skip(offset).take(limit).collect()
}

/// Merge an incoming record over an existing one, keeping the tombstone.
pub(crate) fn merge_record(
    existing: Option<&MatchRecordEntity>,
    mut incoming: MatchRecordEntity,
) -> MatchRecordEntity {
    if let Some(existing) = existing.filter(|existing| existing.deleted) {
        incoming.deleted = true;
        incoming.deleted_by = existing.deleted_by.clone();
        incoming.deleted_at = existing.deleted_at;
    }
    incoming
}
