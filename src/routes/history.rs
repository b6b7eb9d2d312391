use axum::{
    Json, Router,
    extract::{Query, State},
    routing::get,
};
use axum_valid::Valid;

use crate::{
    dto::history::{HistoryPage, HistoryQuery},
    error::AppError,
    services::history_service,
    state::SharedState,
};

#[utoipa::path(
    get,
    path = "/history",
    tag = "history",
    params(HistoryQuery),
    responses(
        (status = 200, description = "Finalized matches, newest first", body = HistoryPage),
        (status = 503, description = "Storage unavailable")
    )
)]
/// List finalized matches.
pub async fn list_history(
    State(state): State<SharedState>,
    Valid(Query(query)): Valid<Query<HistoryQuery>>,
) -> Result<Json<HistoryPage>, AppError> {
    Ok(Json(history_service::list_history(&state, query).await?))
}

/// Configure the history routes subtree.
pub fn router() -> Router<SharedState> {
    Router::<SharedState>::new().route("/history", get(list_history))
}
