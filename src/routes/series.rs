use axum::{
    Json, Router,
    extract::{Path, State},
    routing::get,
};
use uuid::Uuid;

use crate::{
    dto::series::SeriesProgressResponse, error::AppError, services::series_service,
    state::SharedState,
};

#[utoipa::path(
    get,
    path = "/series/{id}",
    tag = "series",
    params(("id" = Uuid, Path, description = "Series identifier")),
    responses(
        (status = 200, description = "Wins per side", body = SeriesProgressResponse),
        (status = 404, description = "Unknown series"),
        (status = 503, description = "Storage unavailable")
    )
)]
/// Aggregate the wins of a best-of-N series.
pub async fn series_progress(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SeriesProgressResponse>, AppError> {
    Ok(Json(series_service::series_progress(&state, id).await?))
}

/// Configure the series routes subtree.
pub fn router() -> Router<SharedState> {
    Router::<SharedState>::new().route("/series/{id}", get(series_progress))
}
