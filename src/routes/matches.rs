use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get, post, put},
};
use axum_valid::Valid;
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    dto::match_state::{
        AddPointsRequest, FaltaEnvidoQuery, FaltaEnvidoSuggestion, MatchSummary, MetadataRequest,
        PairIdRequest, ResetMatchRequest, RotationRequest, SeriesRequest, SubtractPointsRequest,
        TargetScoreRequest, TeamNameRequest, TeamPlayersRequest,
    },
    error::AppError,
    services::{match_service, sync_reconciler},
    state::{SharedState, ledger::TeamId},
};

/// Endpoints driving the active match.
pub fn router() -> Router<SharedState> {
    Router::<SharedState>::new()
        .route("/match", get(current_match))
        .route("/match/points", post(add_points))
        .route("/match/points/subtract", post(subtract_points))
        .route("/match/undo", post(undo))
        .route("/match/reset", post(reset_match))
        .route("/match/rematch", post(rematch))
        .route("/match/target", put(set_target_score))
        .route("/match/teams/{team}/name", put(set_team_name))
        .route("/match/teams/{team}/players", put(set_players))
        .route("/match/teams/{team}/pair", put(set_pair_id))
        .route("/match/metadata", put(set_metadata))
        .route("/match/series", put(set_series))
        .route("/match/rotation", put(set_rotation))
        .route("/match/falta-envido", get(falta_envido))
        .route("/match/listen/{id}", post(listen_to_match))
        .route("/match/listen", delete(stop_listening))
}

/// Remote subscription state.
#[derive(Debug, Serialize, ToSchema)]
pub struct ListeningResponse {
    /// Match whose remote document is followed, if any.
    pub match_id: Option<Uuid>,
}

#[utoipa::path(
    get,
    path = "/match",
    tag = "match",
    responses((status = 200, description = "Active match", body = MatchSummary))
)]
/// Return the active match.
pub async fn current_match(State(state): State<SharedState>) -> Json<MatchSummary> {
    Json(match_service::current_match(&state).await)
}

#[utoipa::path(
    post,
    path = "/match/points",
    tag = "match",
    request_body = AddPointsRequest,
    responses(
        (status = 200, description = "Points recorded, or ignored when the match is finished", body = MatchSummary),
        (status = 400, description = "Invalid amount")
    )
)]
/// Credit points to a team.
pub async fn add_points(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<AddPointsRequest>>,
) -> Result<Json<MatchSummary>, AppError> {
    Ok(Json(match_service::add_points(&state, payload).await?))
}

#[utoipa::path(
    post,
    path = "/match/points/subtract",
    tag = "match",
    request_body = SubtractPointsRequest,
    responses((status = 200, description = "Points removed, or ignored on underflow", body = MatchSummary))
)]
/// Remove points from a team.
pub async fn subtract_points(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<SubtractPointsRequest>>,
) -> Json<MatchSummary> {
    Json(match_service::subtract_points(&state, payload).await)
}

#[utoipa::path(
    post,
    path = "/match/undo",
    tag = "match",
    responses((status = 200, description = "Last action removed, or ignored when there is none", body = MatchSummary))
)]
/// Drop the newest scoring action.
pub async fn undo(State(state): State<SharedState>) -> Json<MatchSummary> {
    Json(match_service::undo(&state).await)
}

#[utoipa::path(
    post,
    path = "/match/reset",
    tag = "match",
    request_body = ResetMatchRequest,
    responses((status = 200, description = "Fresh match started", body = MatchSummary))
)]
/// Start a fresh match.
pub async fn reset_match(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<ResetMatchRequest>>,
) -> Json<MatchSummary> {
    Json(match_service::reset(&state, payload).await)
}

#[utoipa::path(
    post,
    path = "/match/rematch",
    tag = "match",
    responses((status = 200, description = "New match with the same line-up", body = MatchSummary))
)]
/// Start a new match keeping teams, series and rotation pairings.
pub async fn rematch(State(state): State<SharedState>) -> Json<MatchSummary> {
    Json(match_service::rematch(&state).await)
}

#[utoipa::path(
    put,
    path = "/match/target",
    tag = "match",
    request_body = TargetScoreRequest,
    responses((status = 200, description = "Target switched and scores rescaled", body = MatchSummary))
)]
/// Switch between 15 and 30 points.
pub async fn set_target_score(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<TargetScoreRequest>>,
) -> Json<MatchSummary> {
    Json(match_service::set_target_score(&state, payload.target_score).await)
}

#[utoipa::path(
    put,
    path = "/match/teams/{team}/name",
    tag = "match",
    params(("team" = TeamId, Path, description = "Team to rename")),
    request_body = TeamNameRequest,
    responses(
        (status = 200, description = "Team renamed", body = MatchSummary),
        (status = 400, description = "Blank or too long name")
    )
)]
/// Rename a team.
pub async fn set_team_name(
    State(state): State<SharedState>,
    Path(team): Path<TeamId>,
    Valid(Json(payload)): Valid<Json<TeamNameRequest>>,
) -> Result<Json<MatchSummary>, AppError> {
    Ok(Json(
        match_service::set_team_name(&state, team, payload.name).await?,
    ))
}

#[utoipa::path(
    put,
    path = "/match/teams/{team}/players",
    tag = "match",
    params(("team" = TeamId, Path, description = "Team whose roster changes")),
    request_body = TeamPlayersRequest,
    responses(
        (status = 200, description = "Roster replaced", body = MatchSummary),
        (status = 400, description = "More than three players or blank ids")
    )
)]
/// Replace a team's roster.
pub async fn set_players(
    State(state): State<SharedState>,
    Path(team): Path<TeamId>,
    Valid(Json(payload)): Valid<Json<TeamPlayersRequest>>,
) -> Json<MatchSummary> {
    Json(match_service::set_players(&state, team, payload.players).await)
}

#[utoipa::path(
    put,
    path = "/match/teams/{team}/pair",
    tag = "match",
    params(("team" = TeamId, Path, description = "Team to link")),
    request_body = PairIdRequest,
    responses((status = 200, description = "Pair link updated", body = MatchSummary))
)]
/// Link a team to a persisted pair.
pub async fn set_pair_id(
    State(state): State<SharedState>,
    Path(team): Path<TeamId>,
    Valid(Json(payload)): Valid<Json<PairIdRequest>>,
) -> Json<MatchSummary> {
    Json(match_service::set_pair_id(&state, team, payload.pair_id).await)
}

#[utoipa::path(
    put,
    path = "/match/metadata",
    tag = "match",
    request_body = MetadataRequest,
    responses(
        (status = 200, description = "Location and date updated", body = MatchSummary),
        (status = 400, description = "Invalid date")
    )
)]
/// Set location and user-edited date.
pub async fn set_metadata(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<MetadataRequest>>,
) -> Result<Json<MatchSummary>, AppError> {
    Ok(Json(match_service::set_metadata(&state, payload).await?))
}

#[utoipa::path(
    put,
    path = "/match/series",
    tag = "match",
    request_body = SeriesRequest,
    responses((status = 200, description = "Series link updated", body = MatchSummary))
)]
/// Attach the match to a series.
pub async fn set_series(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<SeriesRequest>>,
) -> Json<MatchSummary> {
    Json(match_service::set_series(&state, payload).await)
}

#[utoipa::path(
    put,
    path = "/match/rotation",
    tag = "match",
    request_body = RotationRequest,
    responses((status = 200, description = "Rotation configured", body = MatchSummary))
)]
/// Configure pica-pica.
pub async fn set_rotation(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<RotationRequest>>,
) -> Json<MatchSummary> {
    Json(match_service::set_rotation(&state, payload).await)
}

#[utoipa::path(
    get,
    path = "/match/falta-envido",
    tag = "match",
    params(FaltaEnvidoQuery),
    responses((status = 200, description = "Suggested falta envido points", body = FaltaEnvidoSuggestion))
)]
/// Suggest the points of a falta envido.
pub async fn falta_envido(
    State(state): State<SharedState>,
    Valid(Query(query)): Valid<Query<FaltaEnvidoQuery>>,
) -> Json<FaltaEnvidoSuggestion> {
    Json(match_service::falta_envido(&state, query.winner).await)
}

#[utoipa::path(
    post,
    path = "/match/listen/{id}",
    tag = "match",
    params(("id" = Uuid, Path, description = "Remote match to follow")),
    responses(
        (status = 200, description = "Following the remote match", body = ListeningResponse),
        (status = 503, description = "Storage unavailable")
    )
)]
/// Follow the remote document of a match.
pub async fn listen_to_match(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ListeningResponse>, AppError> {
    sync_reconciler::listen_to_match(&state, id).await?;
    Ok(Json(ListeningResponse { match_id: Some(id) }))
}

#[utoipa::path(
    delete,
    path = "/match/listen",
    tag = "match",
    responses((status = 204, description = "No longer following a remote match"))
)]
/// Stop following the remote match.
pub async fn stop_listening(State(state): State<SharedState>) -> StatusCode {
    sync_reconciler::stop_listening(&state).await;
    StatusCode::NO_CONTENT
}
