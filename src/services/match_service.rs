//! Mutation API over the active match.
//!
//! Every operation takes the session write lock, applies the change, then,
//! still under the lock, writes the local snapshot, queues the mirror write
//! and broadcasts the new state. Holding the lock across these steps keeps
//! snapshots, mirror writes and SSE events in mutation order.

use rand::rng;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    dao::models::MatchEntity,
    dto::{
        match_state::{
            AddPointsRequest, FaltaEnvidoSuggestion, MatchSummary, MetadataRequest,
            ResetMatchRequest, RotationRequest, SeriesRequest, SubtractPointsRequest,
        },
        parse_system_time,
    },
    error::ServiceError,
    services::{history_service, sse_events, sync_reconciler},
    state::{
        SharedState,
        bids::{BidType, falta_envido_points, is_en_buenas},
        ledger::TeamId,
        rotation::RotationConfig,
        session::{InvalidOperation, MatchSession, MatchState, SeriesInfo},
        win_policy::TargetScore,
    },
};

/// Where a change to the active match came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Origin {
    /// Made on this device; mirrored to the remote store.
    Local,
    /// Taken from the remote store; never written back.
    Remote,
}

/// Persist and announce `current`. Callers hold the session write lock.
pub(crate) async fn publish(state: &SharedState, current: &MatchState, origin: Origin) {
    let entity = MatchEntity::from(current);
    if let Err(err) = state.snapshot().save(&entity).await {
        warn!(match_id = %current.id, error = %err, "failed to write local snapshot");
    }
    if origin == Origin::Local {
        state.sync().push(entity);
    }
    sse_events::broadcast_match_state(state, current);
}

fn summarize(state: &SharedState, current: &MatchState) -> MatchSummary {
    MatchSummary::build(current, state.players())
}

/// Apply `change` to the session. A rejected change leaves the match untouched
/// and the current summary is returned.
async fn mutate<F>(state: &SharedState, change: F) -> MatchSummary
where
    F: FnOnce(&mut MatchSession) -> Result<(), InvalidOperation>,
{
    let mut session = state.session().write().await;
    match change(&mut session) {
        Ok(()) => {
            let current = session.state().clone();
            publish(state, &current, Origin::Local).await;
            summarize(state, &current)
        }
        Err(reason) => {
            debug!(match_id = %session.state().id, %reason, "ignored match operation");
            summarize(state, session.state())
        }
    }
}

/// Replace the active match, then archive the superseded one if it finished.
async fn supersede<F>(state: &SharedState, replace: F) -> MatchSummary
where
    F: FnOnce(&mut MatchSession) -> MatchState,
{
    // Updates of the old match id would otherwise be adopted over the new one.
    sync_reconciler::stop_listening(state).await;

    let (previous, summary) = {
        let mut session = state.session().write().await;
        let previous = replace(&mut session);
        let current = session.state().clone();
        publish(state, &current, Origin::Local).await;
        info!(match_id = %current.id, previous_match_id = %previous.id, "started new match");
        (previous, summarize(state, &current))
    };

    history_service::archive_if_finished(state, &previous).await;
    summary
}

// ---------------------------------------------------------------------------
// Read-only projections
// ---------------------------------------------------------------------------

/// Summary of the active match.
pub async fn current_match(state: &SharedState) -> MatchSummary {
    state
        .read_session(|session| summarize(state, session.state()))
        .await
}

/// Points a falta envido won by `winner` is worth right now.
pub async fn falta_envido(state: &SharedState, winner: TeamId) -> FaltaEnvidoSuggestion {
    state
        .read_session(|session| suggest_falta_envido(session.state(), winner))
        .await
}

fn suggest_falta_envido(current: &MatchState, winner: TeamId) -> FaltaEnvidoSuggestion {
    let scores = current.scores();
    let target = current.target();
    let opponent = scores.get(winner.opponent());
    FaltaEnvidoSuggestion {
        winner,
        points: falta_envido_points(target, scores.get(winner), opponent),
        opponent_en_buenas: is_en_buenas(opponent, target),
    }
}

// ---------------------------------------------------------------------------
// Scoring
// ---------------------------------------------------------------------------

/// Credit points to a team. Without an explicit amount the bid's value is used.
pub async fn add_points(
    state: &SharedState,
    request: AddPointsRequest,
) -> Result<MatchSummary, ServiceError> {
    let AddPointsRequest {
        team,
        bid_type,
        amount,
    } = request;

    if amount.is_none() && bid_type == BidType::ManualAdjustment {
        return Err(ServiceError::InvalidInput(
            "manual adjustments need an explicit amount".into(),
        ));
    }

    Ok(mutate(state, |session| {
        let amount = amount
            .or_else(|| bid_type.default_points())
            .unwrap_or_else(|| suggest_falta_envido(session.state(), team).points);
        session.add_points(team, amount, bid_type)
    })
    .await)
}

/// Remove points from a team.
pub async fn subtract_points(state: &SharedState, request: SubtractPointsRequest) -> MatchSummary {
    mutate(state, |session| {
        session.subtract_points(request.team, request.amount)
    })
    .await
}

/// Drop the newest scoring action.
pub async fn undo(state: &SharedState) -> MatchSummary {
    mutate(state, MatchSession::undo).await
}

// ---------------------------------------------------------------------------
// Match lifecycle
// ---------------------------------------------------------------------------

/// Start a fresh match. Omitted fields keep the current mode and use the
/// configured target.
pub async fn reset(state: &SharedState, request: ResetMatchRequest) -> MatchSummary {
    let target = request
        .target_score
        .map(TargetScore::coerce)
        .unwrap_or_else(|| state.config().default_target_score());

    supersede(state, |session| {
        let mode = request.mode.unwrap_or(session.state().mode);
        session.reset(mode, target)
    })
    .await
}

/// Start a new match with the same line-up.
pub async fn rematch(state: &SharedState) -> MatchSummary {
    supersede(state, MatchSession::rematch).await
}

/// Switch between 15 and 30 points.
pub async fn set_target_score(state: &SharedState, target_score: u32) -> MatchSummary {
    mutate(state, |session| {
        session.set_target_score(target_score);
        Ok(())
    })
    .await
}

/// Restore the match kept in the local snapshot, if any.
pub async fn restore_local_snapshot(state: &SharedState) {
    let stored = match state.snapshot().load().await {
        Ok(Some(stored)) => stored,
        Ok(None) => {
            debug!("no local snapshot; starting with a fresh match");
            return;
        }
        Err(err) => {
            warn!(error = %err, "failed to read local snapshot; starting with a fresh match");
            return;
        }
    };

    let restored = MatchState::from(stored);
    info!(
        match_id = %restored.id,
        actions = restored.ledger().len(),
        "restored match from local snapshot"
    );

    let mut session = state.session().write().await;
    *session = MatchSession::from_state(restored);
    state.sync().push(MatchEntity::from(session.state()));
}

// ---------------------------------------------------------------------------
// Teams and metadata
// ---------------------------------------------------------------------------

/// Rename a team.
pub async fn set_team_name(
    state: &SharedState,
    team: TeamId,
    name: String,
) -> Result<MatchSummary, ServiceError> {
    let name = name.trim().to_string();
    if name.is_empty() {
        return Err(ServiceError::InvalidInput("team name cannot be blank".into()));
    }

    Ok(mutate(state, |session| {
        session.set_team_name(team, name);
        Ok(())
    })
    .await)
}

/// Replace a team's roster.
pub async fn set_players(state: &SharedState, team: TeamId, players: Vec<String>) -> MatchSummary {
    let players = players
        .into_iter()
        .map(|player| player.trim().to_string())
        .collect();

    mutate(state, |session| {
        session.set_players(team, players);
        Ok(())
    })
    .await
}

/// Link a team to a persisted pair, or unlink it.
pub async fn set_pair_id(
    state: &SharedState,
    team: TeamId,
    pair_id: Option<String>,
) -> MatchSummary {
    mutate(state, |session| {
        session.set_pair_id(team, pair_id);
        Ok(())
    })
    .await
}

/// Set location and user-edited date. Blank locations are cleared.
pub async fn set_metadata(
    state: &SharedState,
    request: MetadataRequest,
) -> Result<MatchSummary, ServiceError> {
    let date = match request.date.as_deref() {
        Some(value) => Some(parse_system_time(value).ok_or_else(|| {
            ServiceError::InvalidInput(format!("`{value}` is not an RFC 3339 date"))
        })?),
        None => None,
    };
    let location = request
        .location
        .map(|location| location.trim().to_string())
        .filter(|location| !location.is_empty());

    Ok(mutate(state, |session| {
        session.set_metadata(location, date);
        Ok(())
    })
    .await)
}

/// Attach the match to a series, creating one when no id is given.
pub async fn set_series(state: &SharedState, request: SeriesRequest) -> MatchSummary {
    let series = request.series.map(|input| SeriesInfo {
        id: input.id.unwrap_or_else(Uuid::new_v4),
        target_wins: input.target_wins,
    });

    mutate(state, |session| {
        session.set_series(series);
        Ok(())
    })
    .await
}

/// Configure pica-pica. Without explicit pairings the current rosters are
/// paired by position.
pub async fn set_rotation(state: &SharedState, request: RotationRequest) -> MatchSummary {
    let window = state.config().rotation_window();
    let start_at = request.start_at.unwrap_or(window.start_at);
    let end_at = request.end_at.unwrap_or(window.end_at);

    mutate(state, |session| {
        let current = session.state();
        let mut rotation = match request.pairings {
            Some(pairings) => RotationConfig::new(
                start_at,
                end_at,
                pairings.into_iter().map(Into::into).collect(),
            ),
            None => RotationConfig::from_rosters(
                start_at,
                end_at,
                &current.team(TeamId::Nosotros).players,
                &current.team(TeamId::Ellos).players,
            ),
        };
        if request.shuffle {
            rotation = rotation.shuffled(&mut rng());
        }
        rotation.enabled = request.enabled;

        session.set_rotation_config(Some(rotation));
        Ok(())
    })
    .await
}
