use tracing::{debug, info, warn};

use crate::{
    dao::{
        models::{MatchEntity, MatchRecordEntity},
        storage::StorageError,
    },
    dto::history::{HistoryPage, HistoryQuery},
    error::ServiceError,
    state::{SharedState, session::MatchState},
};

/// Store `previous` as a finalized record when it has a winner.
///
/// Called once a match has been superseded; live matches are never archived.
/// The record waits in the sync outbox while storage is unavailable.
pub async fn archive_if_finished(state: &SharedState, previous: &MatchState) {
    if !previous.is_finished() {
        return;
    }

    let record = MatchRecordEntity::finalized(MatchEntity::from(previous));
    state.sync().defer_archive(record).await;
    flush_deferred_archives(state).await;
}

/// Archive every finished match still waiting for storage.
///
/// Records rejected as inconsistent are dropped; any other failure puts the
/// record back in the queue.
pub async fn flush_deferred_archives(state: &SharedState) {
    let store = match state.require_match_store().await {
        Ok(store) => store,
        Err(_) => {
            let pending = state.sync().deferred_archive_count().await;
            if pending > 0 {
                warn!(pending, "storage unavailable; finished matches kept for archiving");
            }
            return;
        }
    };

    for record in state.sync().take_deferred_archives().await {
        let id = record.game.id;
        match store.archive_match(record.clone()).await {
            Ok(()) => info!(match_id = %id, "archived finished match"),
            Err(err @ StorageError::ResultInconsistency { .. }) => {
                warn!(match_id = %id, error = %err, "dropped inconsistent match record")
            }
            Err(err) => {
                warn!(match_id = %id, error = %err, "failed to archive match; will retry");
                state.sync().defer_archive(record).await;
            }
        }
    }
}

/// One page of finalized matches, newest first.
pub async fn list_history(
    state: &SharedState,
    query: HistoryQuery,
) -> Result<HistoryPage, ServiceError> {
    let store = state.require_match_store().await?;
    flush_deferred_archives(state).await;
    debug!(offset = query.offset, limit = query.limit, "listing match history");
    let records = store.list_history(query.offset, query.limit).await?;

    Ok(HistoryPage {
        offset: query.offset,
        limit: query.limit,
        records: records.into_iter().map(Into::into).collect(),
    })
}
