use std::iter;

use uuid::Uuid;

use crate::{
    dto::series::SeriesProgressResponse,
    error::ServiceError,
    services::history_service,
    state::{
        SharedState,
        series::SeriesCoordinator,
        session::{MatchState, SeriesInfo},
    },
};

/// Wins per side of `series_id`, counting archived records and the current
/// match when it already has a winner.
pub async fn series_progress(
    state: &SharedState,
    series_id: Uuid,
) -> Result<SeriesProgressResponse, ServiceError> {
    let store = state.require_match_store().await?;
    history_service::flush_deferred_archives(state).await;
    let records = store.list_series(series_id).await?;
    let current = state.read_session(|session| session.state().clone()).await;

    // The current match holds the latest target, archived records the older ones.
    let info = current
        .series
        .filter(|series| series.id == series_id)
        .or_else(|| {
            records.iter().find_map(|record| {
                record.game.series.map(|series| SeriesInfo {
                    id: series.id,
                    target_wins: series.target_wins,
                })
            })
        })
        .ok_or_else(|| ServiceError::NotFound(format!("series `{series_id}` not found")))?;

    let archived = records
        .into_iter()
        .map(|record| MatchState::from(record.game))
        .collect::<Vec<_>>();
    let progress = SeriesCoordinator::progress(&info, archived.iter().chain(iter::once(&current)));

    Ok(progress.into())
}
