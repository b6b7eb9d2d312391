use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for Anotador Back.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::sse::public_stream,
        crate::routes::matches::current_match,
        crate::routes::matches::add_points,
        crate::routes::matches::subtract_points,
        crate::routes::matches::undo,
        crate::routes::matches::reset_match,
        crate::routes::matches::rematch,
        crate::routes::matches::set_target_score,
        crate::routes::matches::set_team_name,
        crate::routes::matches::set_players,
        crate::routes::matches::set_pair_id,
        crate::routes::matches::set_metadata,
        crate::routes::matches::set_series,
        crate::routes::matches::set_rotation,
        crate::routes::matches::falta_envido,
        crate::routes::matches::listen_to_match,
        crate::routes::matches::stop_listening,
        crate::routes::history::list_history,
        crate::routes::series::series_progress,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::match_state::MatchSummary,
            crate::dto::match_state::MatchStatusKind,
            crate::dto::match_state::TeamSummary,
            crate::dto::match_state::PlayerSummary,
            crate::dto::match_state::ScoringActionSummary,
            crate::dto::match_state::RotationSummary,
            crate::dto::match_state::DuelSummary,
            crate::dto::match_state::SeriesLinkSummary,
            crate::dto::match_state::AddPointsRequest,
            crate::dto::match_state::SubtractPointsRequest,
            crate::dto::match_state::ResetMatchRequest,
            crate::dto::match_state::TargetScoreRequest,
            crate::dto::match_state::TeamNameRequest,
            crate::dto::match_state::TeamPlayersRequest,
            crate::dto::match_state::PairIdRequest,
            crate::dto::match_state::MetadataRequest,
            crate::dto::match_state::SeriesRequest,
            crate::dto::match_state::SeriesInput,
            crate::dto::match_state::RotationRequest,
            crate::dto::match_state::PairingInput,
            crate::dto::match_state::FaltaEnvidoSuggestion,
            crate::dto::history::HistoryPage,
            crate::dto::history::MatchRecordSummary,
            crate::dto::series::SeriesProgressResponse,
            crate::dto::sse::Handshake,
            crate::dto::sse::SystemStatus,
            crate::dto::sse::MatchAdoptedEvent,
            crate::routes::matches::ListeningResponse,
            crate::state::ledger::TeamId,
            crate::state::bids::BidType,
            crate::state::session::MatchMode,
        )
    ),
    tags(
        (name = "match", description = "Scoring and configuration of the active match"),
        (name = "history", description = "Finalized matches"),
        (name = "series", description = "Best-of-N series progress"),
        (name = "health", description = "Health check endpoints"),
        (name = "sse", description = "Server-sent events streams"),
    )
)]
pub struct ApiDoc;
