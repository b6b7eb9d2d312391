use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::{Validate, ValidationErrors};

use crate::{
    dao::players::PlayerDirectory,
    dto::{
        format_system_time,
        validation::{validate_rfc3339, validate_roster},
    },
    state::{
        bids::BidType,
        ledger::{ScoringAction, TeamId},
        rotation::{Pairing, RotationConfig},
        session::{MatchMode, MatchState, Team},
        win_policy::MatchStatus,
    },
};

/// Credit points to a team.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct AddPointsRequest {
    pub team: TeamId,
    pub bid_type: BidType,
    /// Defaults to the bid's fixed value, or to the falta-envido suggestion.
    /// Required for `manual_adjustment`.
    #[serde(default)]
    #[validate(range(min = 1))]
    pub amount: Option<u32>,
}

/// Remove points from a team.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct SubtractPointsRequest {
    pub team: TeamId,
    #[validate(range(min = 1))]
    pub amount: u32,
}

/// Start a fresh match.
#[derive(Debug, Default, Deserialize, ToSchema, Validate)]
pub struct ResetMatchRequest {
    /// Keeps the current mode when omitted.
    #[serde(default)]
    pub mode: Option<MatchMode>,
    /// Uses the configured default when omitted. Coerced to 15 or 30.
    #[serde(default)]
    pub target_score: Option<u32>,
}

/// Change the target score. Any value other than 30 becomes 15.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct TargetScoreRequest {
    pub target_score: u32,
}

/// Rename a team.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct TeamNameRequest {
    #[validate(length(min = 1, max = 40))]
    pub name: String,
}

/// Replace a team's roster.
#[derive(Debug, Deserialize, ToSchema)]
pub struct TeamPlayersRequest {
    pub players: Vec<String>,
}

impl Validate for TeamPlayersRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if let Err(e) = validate_roster(&self.players) {
            errors.add("players", e);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Link a team to a persisted pair; `null` unlinks it.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct PairIdRequest {
    #[serde(default)]
    #[validate(length(min = 1, max = 64))]
    pub pair_id: Option<String>,
}

/// Location and user-edited date of the match.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct MetadataRequest {
    #[serde(default)]
    #[validate(length(max = 120))]
    pub location: Option<String>,
    /// RFC 3339 timestamp.
    #[serde(default)]
    #[validate(custom(function = "validate_rfc3339"))]
    pub date: Option<String>,
}

/// Attach the match to a series; `null` detaches it.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct SeriesRequest {
    #[serde(default)]
    #[validate(nested)]
    pub series: Option<SeriesInput>,
}

/// Series link supplied by the client.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct SeriesInput {
    /// Existing series to join; a new one is created when omitted.
    #[serde(default)]
    pub id: Option<Uuid>,
    #[validate(range(min = 1, max = 10))]
    pub target_wins: u32,
}

/// Pica-pica settings.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct RotationRequest {
    pub enabled: bool,
    /// Defaults to the configured window.
    #[serde(default)]
    pub start_at: Option<u32>,
    #[serde(default)]
    pub end_at: Option<u32>,
    /// Explicit duels; when omitted the rosters are paired by position.
    #[serde(default)]
    #[validate(nested)]
    pub pairings: Option<Vec<PairingInput>>,
    /// Randomize the order of the duels.
    #[serde(default)]
    pub shuffle: bool,
}

/// One explicit duel.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct PairingInput {
    #[validate(length(min = 1))]
    pub first: String,
    #[validate(length(min = 1))]
    pub second: String,
}

impl From<PairingInput> for Pairing {
    fn from(value: PairingInput) -> Self {
        Self {
            first: value.first,
            second: value.second,
        }
    }
}

/// Query of the falta-envido suggestion.
#[derive(Debug, Deserialize, IntoParams, Validate)]
#[into_params(parameter_in = Query)]
pub struct FaltaEnvidoQuery {
    /// Team that won the envido.
    pub winner: TeamId,
}

/// Points a falta envido is worth right now.
#[derive(Debug, Serialize, ToSchema)]
pub struct FaltaEnvidoSuggestion {
    pub winner: TeamId,
    pub points: u32,
    /// Whether the opponent is past half the target.
    pub opponent_en_buenas: bool,
}

/// Lifecycle of the match as exposed to clients.
#[derive(Debug, Clone, Copy, Serialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MatchStatusKind {
    Live,
    Finished,
}

/// Player id with its display name.
#[derive(Debug, Clone, Serialize, ToSchema, PartialEq, Eq)]
pub struct PlayerSummary {
    pub id: String,
    pub name: String,
}

impl PlayerSummary {
    fn resolve(id: &str, players: &dyn PlayerDirectory) -> Self {
        Self {
            id: id.to_string(),
            name: players.resolve(id),
        }
    }
}

/// One side of the scoreboard.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TeamSummary {
    pub id: TeamId,
    pub name: String,
    pub score: u32,
    pub players: Vec<PlayerSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pair_id: Option<String>,
}

impl TeamSummary {
    fn build(team: &Team, players: &dyn PlayerDirectory) -> Self {
        Self {
            id: team.id,
            name: team.name.clone(),
            score: team.score(),
            players: team
                .players
                .iter()
                .map(|id| PlayerSummary::resolve(id, players))
                .collect(),
            pair_id: team.pair_id.clone(),
        }
    }
}

/// One ledger entry.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ScoringActionSummary {
    pub id: Uuid,
    pub timestamp: String,
    pub team: TeamId,
    pub amount: u32,
    pub bid_type: BidType,
}

impl From<&ScoringAction> for ScoringActionSummary {
    fn from(action: &ScoringAction) -> Self {
        Self {
            id: action.id,
            timestamp: format_system_time(action.timestamp),
            team: action.team,
            amount: action.amount,
            bid_type: action.bid_type,
        }
    }
}

/// Duel being played with resolved names.
#[derive(Debug, Clone, Serialize, ToSchema, PartialEq, Eq)]
pub struct DuelSummary {
    pub first: PlayerSummary,
    pub second: PlayerSummary,
}

/// Pica-pica state.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RotationSummary {
    pub enabled: bool,
    pub start_at: u32,
    pub end_at: u32,
    pub pairings: Vec<DuelSummary>,
    pub current_index: usize,
    pub active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_duel: Option<DuelSummary>,
}

impl RotationSummary {
    fn build(rotation: &RotationConfig, players: &dyn PlayerDirectory) -> Self {
        let duel = |pairing: &Pairing| DuelSummary {
            first: PlayerSummary::resolve(&pairing.first, players),
            second: PlayerSummary::resolve(&pairing.second, players),
        };

        Self {
            enabled: rotation.enabled,
            start_at: rotation.start_at,
            end_at: rotation.end_at,
            pairings: rotation.pairings.iter().map(duel).collect(),
            current_index: rotation.current_index,
            active: rotation.is_active(),
            active_duel: rotation.current_pairing().map(duel),
        }
    }
}

/// Series link of the match.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SeriesLinkSummary {
    pub id: Uuid,
    pub target_wins: u32,
}

/// Full view of the active match.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct MatchSummary {
    pub id: Uuid,
    pub created_at: String,
    pub mode: MatchMode,
    pub target_score: u32,
    pub status: MatchStatusKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub winner: Option<TeamId>,
    pub nosotros: TeamSummary,
    pub ellos: TeamSummary,
    pub history: Vec<ScoringActionSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub series: Option<SeriesLinkSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rotation: Option<RotationSummary>,
    /// Whether switching back to 30 would restore the scores kept by the last switch to 15.
    pub target_backup_available: bool,
}

impl MatchSummary {
    /// Build the client view of `state`, resolving player names through `players`.
    pub fn build(state: &MatchState, players: &dyn PlayerDirectory) -> Self {
        let status = state.status();
        Self {
            id: state.id,
            created_at: format_system_time(state.created_at),
            mode: state.mode,
            target_score: state.target().points(),
            status: match status {
                MatchStatus::Live => MatchStatusKind::Live,
                MatchStatus::Finished { .. } => MatchStatusKind::Finished,
            },
            winner: status.winner(),
            nosotros: TeamSummary::build(state.team(TeamId::Nosotros), players),
            ellos: TeamSummary::build(state.team(TeamId::Ellos), players),
            history: state.ledger().actions().iter().map(Into::into).collect(),
            location: state.metadata.location.clone(),
            date: state.metadata.date.map(format_system_time),
            series: state.series.map(|series| SeriesLinkSummary {
                id: series.id,
                target_wins: series.target_wins,
            }),
            rotation: state
                .rotation
                .as_ref()
                .map(|rotation| RotationSummary::build(rotation, players)),
            target_backup_available: state.target_backup().is_some(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        dao::players::StaticPlayerDirectory,
        state::{session::MatchSession, win_policy::TargetScore},
    };

    #[test]
    fn summary_resolves_players_and_active_duel() {
        let players = StaticPlayerDirectory::new([
            ("p1".to_string(), "Ana".to_string()),
            ("p2".to_string(), "Beto".to_string()),
        ]);
        let mut session = MatchSession::new(MatchMode::OneVsOne, TargetScore::Thirty);
        session.set_players(TeamId::Nosotros, vec!["p1".into()]);
        session.set_players(TeamId::Ellos, vec!["p2".into()]);
        session.set_rotation_config(Some(RotationConfig::from_rosters(
            0,
            5,
            &["p1".to_string()],
            &["p2".to_string()],
        )));

        let summary = MatchSummary::build(session.state(), &players);
        assert_eq!(summary.nosotros.players[0].name, "Ana");
        assert_eq!(summary.status, MatchStatusKind::Live);
        let rotation = summary.rotation.unwrap();
        assert!(rotation.active);
        assert_eq!(
            rotation.active_duel.map(|duel| duel.second.name),
            Some("Beto".to_string())
        );
    }

    #[test]
    fn roster_validation_rejects_four_players() {
        let request = TeamPlayersRequest {
            players: vec!["a".into(), "b".into(), "c".into(), "d".into()],
        };
        assert!(request.validate().is_err());
    }

    #[test]
    fn metadata_validation_checks_date_and_location() {
        let request = MetadataRequest {
            location: Some("Club Atlético".into()),
            date: Some("2024-03-01T20:30:00Z".into()),
        };
        assert!(request.validate().is_ok());

        let request = MetadataRequest {
            location: Some("x".repeat(121)),
            date: Some("tomorrow".into()),
        };
        let errors = request.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("location"));
        assert!(errors.field_errors().contains_key("date"));
    }
}
