use serde::{Deserialize, Serialize};
use std::time::SystemTime;
use uuid::Uuid;

use crate::{
    dao::storage::StorageError,
    state::{
        bids::BidType,
        ledger::{ScoreLedger, ScoringAction, TeamId, TeamScores},
        rotation::{Pairing, RotationConfig},
        session::{MatchMode, MatchState, SeriesInfo, TargetBackup, Team},
        win_policy::{MatchStatus, TargetScore},
    },
};

/// One ledger entry as stored.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScoringActionEntity {
    /// Unique identifier of the action.
    pub id: Uuid,
    /// When the action was recorded.
    pub timestamp: SystemTime,
    /// Team credited with the points.
    pub team: TeamId,
    /// Points credited.
    pub amount: u32,
    /// Bid that produced the points.
    pub bid_type: BidType,
}

/// Representation of a team stored in persistence and shared across layers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TeamEntity {
    /// Display name chosen for the team.
    pub name: String,
    /// Player identifiers in display order.
    #[serde(default)]
    pub players: Vec<String>,
    /// Score at the time of the write. Informative only: readers replay `history`.
    pub score: u32,
    /// Reference to a persisted pair.
    #[serde(default)]
    pub pair_id: Option<String>,
}

/// Stored duel of the rotation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PairingEntity {
    /// Player on the nosotros side.
    pub first: String,
    /// Player on the ellos side.
    pub second: String,
}

/// Stored rotation configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RotationEntity {
    /// Whether rotation applies.
    pub enabled: bool,
    /// Inclusive lower bound of the window.
    pub start_at: u32,
    /// Inclusive upper bound of the window.
    pub end_at: u32,
    /// Duels in rotation order.
    pub pairings: Vec<PairingEntity>,
    /// Index of the pairing currently playing.
    pub current_index: usize,
    /// Whether the last evaluation found a score inside the window.
    #[serde(default)]
    pub in_window: bool,
    /// Whether the current window stretch was counted by an entry.
    #[serde(default)]
    pub entry_counted: bool,
}

/// Stored series link.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct SeriesEntity {
    /// Series identifier.
    pub id: Uuid,
    /// Wins needed to take the series.
    pub target_wins: u32,
}

/// Stored one-level backup of a 30 to 15 switch.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct TargetBackupEntity {
    /// Nosotros score under 30.
    pub nosotros: u32,
    /// Ellos score under 30.
    pub ellos: u32,
    /// Ledger length when the backup was taken.
    pub ledger_len: usize,
    /// Newest action id when the backup was taken.
    pub ledger_head: Option<Uuid>,
}

/// Aggregate match document: used for the live mirror, the local snapshot and
/// as the body of history records.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MatchEntity {
    /// Primary key of the match.
    pub id: Uuid,
    /// Creation timestamp.
    pub created_at: SystemTime,
    /// Team size.
    pub mode: MatchMode,
    /// 15 or 30.
    pub target_score: u32,
    /// Nosotros side.
    pub nosotros: TeamEntity,
    /// Ellos side.
    pub ellos: TeamEntity,
    /// Scoring actions in recording order.
    pub history: Vec<ScoringActionEntity>,
    /// Whether a team has won.
    pub is_finished: bool,
    /// Winning team, set iff `is_finished`.
    pub winner: Option<TeamId>,
    /// Where the match was played.
    #[serde(default)]
    pub location: Option<String>,
    /// User-edited date.
    #[serde(default)]
    pub date: Option<SystemTime>,
    /// Series link.
    #[serde(default)]
    pub series: Option<SeriesEntity>,
    /// Pica-pica configuration.
    #[serde(default)]
    pub rotation: Option<RotationEntity>,
    /// Backup of the last 30 to 15 switch.
    #[serde(default)]
    pub target_backup: Option<TargetBackupEntity>,
}

/// Finalized match as kept by the history store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MatchRecordEntity {
    /// The match as it was when superseded.
    #[serde(flatten)]
    pub game: MatchEntity,
    /// Tombstone flag set by an external actor.
    #[serde(default)]
    pub deleted: bool,
    /// Who tombstoned the record.
    #[serde(default)]
    pub deleted_by: Option<String>,
    /// When the record was tombstoned.
    #[serde(default)]
    pub deleted_at: Option<SystemTime>,
}

impl MatchRecordEntity {
    /// Wrap a finished match into a fresh, non-deleted record.
    pub fn finalized(game: MatchEntity) -> Self {
        Self {
            game,
            deleted: false,
            deleted_by: None,
            deleted_at: None,
        }
    }

    /// Date used to order history: the user-edited date, else the creation time.
    pub fn effective_date(&self) -> SystemTime {
        self.game.date.unwrap_or(self.game.created_at)
    }

    /// Reject records whose winner does not follow from their scores.
    pub fn check_consistency(&self) -> Result<(), StorageError> {
        let game = &self.game;
        let inconsistent = |reason: &str| StorageError::ResultInconsistency {
            id: game.id,
            reason: reason.to_string(),
        };

        let (winner, loser) = match (game.is_finished, game.winner) {
            (true, Some(TeamId::Nosotros)) => (&game.nosotros, &game.ellos),
            (true, Some(TeamId::Ellos)) => (&game.ellos, &game.nosotros),
            (true, None) => return Err(inconsistent("finished without a winner")),
            (false, _) => return Err(inconsistent("match is not finished")),
        };

        if winner.score < game.target_score {
            return Err(inconsistent("winner did not reach the target score"));
        }
        if winner.score < loser.score {
            return Err(inconsistent("winner scored less than the opponent"));
        }
        Ok(())
    }
}

impl From<&ScoringAction> for ScoringActionEntity {
    fn from(action: &ScoringAction) -> Self {
        Self {
            id: action.id,
            timestamp: action.timestamp,
            team: action.team,
            amount: action.amount,
            bid_type: action.bid_type,
        }
    }
}

impl From<ScoringActionEntity> for ScoringAction {
    fn from(entity: ScoringActionEntity) -> Self {
        Self {
            id: entity.id,
            timestamp: entity.timestamp,
            team: entity.team,
            amount: entity.amount,
            bid_type: entity.bid_type,
        }
    }
}

impl From<&Team> for TeamEntity {
    fn from(team: &Team) -> Self {
        Self {
            name: team.name.clone(),
            players: team.players.clone(),
            score: team.score(),
            pair_id: team.pair_id.clone(),
        }
    }
}

impl From<&RotationConfig> for RotationEntity {
    fn from(rotation: &RotationConfig) -> Self {
        Self {
            enabled: rotation.enabled,
            start_at: rotation.start_at,
            end_at: rotation.end_at,
            pairings: rotation
                .pairings
                .iter()
                .map(|pairing| PairingEntity {
                    first: pairing.first.clone(),
                    second: pairing.second.clone(),
                })
                .collect(),
            current_index: rotation.current_index,
            in_window: rotation.in_window,
            entry_counted: rotation.entry_counted,
        }
    }
}

impl From<RotationEntity> for RotationConfig {
    fn from(entity: RotationEntity) -> Self {
        let pairings = entity
            .pairings
            .into_iter()
            .map(|pairing| Pairing {
                first: pairing.first,
                second: pairing.second,
            })
            .collect();
        let mut rotation = RotationConfig::new(entity.start_at, entity.end_at, pairings);
        rotation.enabled = entity.enabled;
        rotation.current_index = entity.current_index;
        rotation.in_window = entity.in_window;
        rotation.entry_counted = entity.entry_counted;
        rotation
    }
}

impl From<&MatchState> for MatchEntity {
    fn from(state: &MatchState) -> Self {
        let status = state.status();
        Self {
            id: state.id,
            created_at: state.created_at,
            mode: state.mode,
            target_score: state.target().points(),
            nosotros: state.team(TeamId::Nosotros).into(),
            ellos: state.team(TeamId::Ellos).into(),
            history: state.ledger().actions().iter().map(Into::into).collect(),
            is_finished: status.is_finished(),
            winner: status.winner(),
            location: state.metadata.location.clone(),
            date: state.metadata.date,
            series: state.series.map(|series| SeriesEntity {
                id: series.id,
                target_wins: series.target_wins,
            }),
            rotation: state.rotation.as_ref().map(Into::into),
            target_backup: state.target_backup().map(|backup| TargetBackupEntity {
                nosotros: backup.scores.nosotros,
                ellos: backup.scores.ellos,
                ledger_len: backup.ledger_len,
                ledger_head: backup.ledger_head,
            }),
        }
    }
}

impl From<MatchEntity> for MatchState {
    fn from(entity: MatchEntity) -> Self {
        let team = |id: TeamId, team: TeamEntity| {
            Team::with_roster(id, team.name, team.players, team.pair_id)
        };
        let status = match (entity.is_finished, entity.winner) {
            (true, Some(winner)) => MatchStatus::Finished { winner },
            _ => MatchStatus::Live,
        };
        let ledger =
            ScoreLedger::from_actions(entity.history.into_iter().map(Into::into).collect());
        let target_backup = entity.target_backup.map(|backup| TargetBackup {
            scores: TeamScores {
                nosotros: backup.nosotros,
                ellos: backup.ellos,
            },
            ledger_len: backup.ledger_len,
            ledger_head: backup.ledger_head,
        });

        let mut state = MatchState::restore(
            entity.id,
            entity.created_at,
            entity.mode,
            TargetScore::coerce(entity.target_score),
            [
                team(TeamId::Nosotros, entity.nosotros),
                team(TeamId::Ellos, entity.ellos),
            ],
            ledger,
            status,
            target_backup,
        );
        state.metadata.location = entity.location;
        state.metadata.date = entity.date;
        state.series = entity.series.map(|series| SeriesInfo {
            id: series.id,
            target_wins: series.target_wins,
        });
        state.rotation = entity.rotation.map(Into::into);
        state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::session::MatchSession;

    fn finished_match() -> MatchEntity {
        let mut session = MatchSession::new(MatchMode::TwoVsTwo, TargetScore::Fifteen);
        session.set_team_name(TeamId::Ellos, "Los de enfrente");
        session.set_players(TeamId::Nosotros, vec!["ana".into(), "beto".into()]);
        session
            .add_points(TeamId::Ellos, 3, BidType::Retruco)
            .unwrap();
        session
            .add_points(TeamId::Nosotros, 15, BidType::ManualAdjustment)
            .unwrap();
        MatchEntity::from(session.state())
    }

    #[test]
    fn entity_restores_the_same_match() {
        let entity = finished_match();
        let json = serde_json::to_string(&entity).unwrap();
        let decoded: MatchEntity = serde_json::from_str(&json).unwrap();
        let state = MatchState::from(decoded);

        assert_eq!(MatchEntity::from(&state), entity);
        assert_eq!(state.team(TeamId::Ellos).name, "Los de enfrente");
        assert_eq!(state.status().winner(), Some(TeamId::Nosotros));
    }

    #[test]
    fn stored_scores_are_ignored_in_favour_of_history() {
        let mut entity = finished_match();
        entity.ellos.score = 12;
        let state = MatchState::from(entity);
        assert_eq!(state.team(TeamId::Ellos).score(), 3);
    }

    #[test]
    fn consistent_record_is_accepted() {
        let record = MatchRecordEntity::finalized(finished_match());
        assert!(record.check_consistency().is_ok());
    }

    #[test]
    fn record_with_mismatched_winner_is_rejected() {
        let mut record = MatchRecordEntity::finalized(finished_match());
        record.game.winner = Some(TeamId::Ellos);
        assert!(matches!(
            record.check_consistency(),
            Err(StorageError::ResultInconsistency { .. })
        ));

        record.game.winner = None;
        assert!(record.check_consistency().is_err());
    }

    #[test]
    fn effective_date_prefers_the_edited_date() {
        let mut record = MatchRecordEntity::finalized(finished_match());
        assert_eq!(record.effective_date(), record.game.created_at);
        let edited = SystemTime::UNIX_EPOCH;
        record.game.date = Some(edited);
        assert_eq!(record.effective_date(), edited);
    }

    #[test]
    fn tombstone_fields_default_when_absent() {
        let json = serde_json::to_value(finished_match()).unwrap();
        let record: MatchRecordEntity = serde_json::from_value(json).unwrap();
        assert!(!record.deleted);
        assert!(record.deleted_by.is_none());
    }
}
