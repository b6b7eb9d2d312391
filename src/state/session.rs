//! The match aggregate and the session object that owns every mutation of it.

use std::{mem, time::SystemTime};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::state::{
    bids::BidType,
    ledger::{ScoreLedger, ScoringAction, TeamId, TeamScores},
    rotation::RotationConfig,
    win_policy::{MatchStatus, TargetScore, apply_points, rescale, status_for},
};

/// Maximum number of players listed on one side.
pub const MAX_PLAYERS_PER_TEAM: usize = 3;

/// Team size of a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, ToSchema)]
pub enum MatchMode {
    /// One player per side.
    #[default]
    #[serde(rename = "1v1")]
    OneVsOne,
    /// Two players per side.
    #[serde(rename = "2v2")]
    TwoVsTwo,
    /// Three players per side, usually played with pica-pica rotation.
    #[serde(rename = "3v3")]
    ThreeVsThree,
}

/// Local precondition violated by a mutation. Callers treat these as no-ops.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum InvalidOperation {
    /// Scores are frozen once a team has won.
    #[error("match is already finished")]
    MatchFinished,
    /// Removing points would drive a score below zero.
    #[error("cannot remove {requested} points from a score of {current}")]
    Underflow {
        /// Score before the attempted removal.
        current: u32,
        /// Points the caller tried to remove.
        requested: u32,
    },
    /// Nothing to undo.
    #[error("no scoring action to undo")]
    EmptyLedger,
    /// Zero-point actions are not recorded.
    #[error("amount must be strictly positive")]
    ZeroAmount,
}

/// One side of the match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Team {
    /// Role of the team.
    pub id: TeamId,
    /// Display name.
    pub name: String,
    /// Player ids, at most [`MAX_PLAYERS_PER_TEAM`].
    pub players: Vec<String>,
    /// Opaque reference to a persisted pair, used for 2v2 statistics.
    pub pair_id: Option<String>,
    score: u32,
}

impl Team {
    fn new(id: TeamId) -> Self {
        let name = match id {
            TeamId::Nosotros => "Nosotros",
            TeamId::Ellos => "Ellos",
        };
        Self {
            id,
            name: name.to_string(),
            players: Vec::new(),
            pair_id: None,
            score: 0,
        }
    }

    /// Team rebuilt from persisted fields. The score stays at zero until the
    /// owning [`MatchState`] replays its ledger.
    pub fn with_roster(
        id: TeamId,
        name: impl Into<String>,
        mut players: Vec<String>,
        pair_id: Option<String>,
    ) -> Self {
        players.truncate(MAX_PLAYERS_PER_TEAM);
        Self {
            id,
            name: name.into(),
            players,
            pair_id,
            score: 0,
        }
    }

    /// Score derived from the ledger.
    pub fn score(&self) -> u32 {
        self.score
    }

    fn without_score(&self) -> Self {
        Self {
            score: 0,
            ..self.clone()
        }
    }
}

/// Free-form details attached to a match.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchMetadata {
    /// Where the match was played.
    pub location: Option<String>,
    /// Date chosen by the user, overriding the creation timestamp for display.
    pub date: Option<SystemTime>,
}

/// Link between a match and the best-of-N series it belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeriesInfo {
    /// Identifier shared by every match of the series.
    pub id: Uuid,
    /// Match wins needed to take the series.
    pub target_wins: u32,
}

impl SeriesInfo {
    /// New series decided by a majority of `matches` games.
    pub fn best_of(matches: u32) -> Self {
        Self {
            id: Uuid::new_v4(),
            target_wins: matches / 2 + 1,
        }
    }
}

/// Scores captured right before a 30 to 15 switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TargetBackup {
    /// Scores under the target of 30.
    pub scores: TeamScores,
    /// Ledger length when the backup was taken.
    pub ledger_len: usize,
    /// Newest action id when the backup was taken.
    pub ledger_head: Option<Uuid>,
}

impl TargetBackup {
    fn capture(scores: TeamScores, ledger: &ScoreLedger) -> Self {
        Self {
            scores,
            ledger_len: ledger.len(),
            ledger_head: ledger.last().map(|action| action.id),
        }
    }

    fn matches(&self, ledger: &ScoreLedger) -> bool {
        self.ledger_len == ledger.len() && self.ledger_head == ledger.last().map(|action| action.id)
    }
}

/// Complete state of one match.
///
/// Scores, status and the ledger are private: they only change through
/// [`MatchSession`], which keeps every team score equal to a replay of the
/// ledger under the current target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchState {
    /// Identifier of the match.
    pub id: Uuid,
    /// Creation timestamp.
    pub created_at: SystemTime,
    /// Team size.
    pub mode: MatchMode,
    /// Location and user-edited date.
    pub metadata: MatchMetadata,
    /// Series the match belongs to.
    pub series: Option<SeriesInfo>,
    /// Pica-pica configuration.
    pub rotation: Option<RotationConfig>,
    target: TargetScore,
    nosotros: Team,
    ellos: Team,
    ledger: ScoreLedger,
    status: MatchStatus,
    target_backup: Option<TargetBackup>,
}

impl MatchState {
    /// Fresh match with zero scores and an empty ledger.
    pub fn new(mode: MatchMode, target: TargetScore) -> Self {
        Self {
            id: Uuid::new_v4(),
            created_at: SystemTime::now(),
            mode,
            metadata: MatchMetadata::default(),
            series: None,
            rotation: None,
            target,
            nosotros: Team::new(TeamId::Nosotros),
            ellos: Team::new(TeamId::Ellos),
            ledger: ScoreLedger::new(),
            status: MatchStatus::Live,
            target_backup: None,
        }
    }

    /// Rebuild a match from persisted parts.
    ///
    /// Team scores are always re-derived from the ledger. A stored status is
    /// kept when it agrees with the derived scores, otherwise the replay winner
    /// is used.
    #[allow(clippy::too_many_arguments)]
    pub fn restore(
        id: Uuid,
        created_at: SystemTime,
        mode: MatchMode,
        target: TargetScore,
        teams: [Team; 2],
        ledger: ScoreLedger,
        stored_status: MatchStatus,
        target_backup: Option<TargetBackup>,
    ) -> Self {
        let [nosotros, ellos] = teams;
        let replay = ledger.recompute(target);
        let goal = target.points();

        let status = match stored_status {
            MatchStatus::Finished { winner } if replay.scores.get(winner) >= goal => stored_status,
            MatchStatus::Live if replay.winner.is_none() => stored_status,
            other => {
                warn!(
                    match_id = %id,
                    stored = ?other,
                    "stored match status disagrees with ledger; using replay"
                );
                status_for(replay.winner)
            }
        };

        let mut state = Self {
            id,
            created_at,
            mode,
            metadata: MatchMetadata::default(),
            series: None,
            rotation: None,
            target,
            nosotros,
            ellos,
            ledger,
            status,
            target_backup,
        };
        state.set_scores(replay.scores);
        state
    }

    /// Current target score.
    pub fn target(&self) -> TargetScore {
        self.target
    }

    /// Borrow one side.
    pub fn team(&self, id: TeamId) -> &Team {
        match id {
            TeamId::Nosotros => &self.nosotros,
            TeamId::Ellos => &self.ellos,
        }
    }

    fn team_mut(&mut self, id: TeamId) -> &mut Team {
        match id {
            TeamId::Nosotros => &mut self.nosotros,
            TeamId::Ellos => &mut self.ellos,
        }
    }

    /// Both teams in display order.
    pub fn teams(&self) -> [&Team; 2] {
        [&self.nosotros, &self.ellos]
    }

    /// Current score pair.
    pub fn scores(&self) -> TeamScores {
        TeamScores {
            nosotros: self.nosotros.score,
            ellos: self.ellos.score,
        }
    }

    /// Scoring history.
    pub fn ledger(&self) -> &ScoreLedger {
        &self.ledger
    }

    /// Live or finished.
    pub fn status(&self) -> MatchStatus {
        self.status
    }

    /// Whether a team has won.
    pub fn is_finished(&self) -> bool {
        self.status.is_finished()
    }

    /// Snapshot kept by the last 30 to 15 switch.
    pub fn target_backup(&self) -> Option<TargetBackup> {
        self.target_backup
    }

    /// Date used to sort and display the match.
    pub fn effective_date(&self) -> SystemTime {
        self.metadata.date.unwrap_or(self.created_at)
    }

    fn set_scores(&mut self, scores: TeamScores) {
        self.nosotros.score = scores.nosotros;
        self.ellos.score = scores.ellos;
    }

    /// Replay the ledger and take scores and status from it.
    fn rederive(&mut self) {
        let replay = self.ledger.recompute(self.target);
        self.set_scores(replay.scores);
        self.status = status_for(replay.winner);
    }

    /// Fresh match sharing this one's line-up and settings.
    fn rematch(&self) -> Self {
        let mut next = Self::new(self.mode, self.target);
        next.nosotros = self.nosotros.without_score();
        next.ellos = self.ellos.without_score();
        next.metadata.location = self.metadata.location.clone();
        next.series = self.series;
        next.rotation = self.rotation.clone().map(RotationConfig::restarted);
        if let Some(rotation) = next.rotation.as_mut() {
            rotation.resync(TeamScores::default());
        }
        next
    }
}

/// Single writer over the active [`MatchState`].
#[derive(Debug, Clone)]
pub struct MatchSession {
    state: MatchState,
}

impl MatchSession {
    /// Session over a brand-new match.
    pub fn new(mode: MatchMode, target: TargetScore) -> Self {
        Self {
            state: MatchState::new(mode, target),
        }
    }

    /// Session over an existing match.
    pub fn from_state(state: MatchState) -> Self {
        Self { state }
    }

    /// Current match.
    pub fn state(&self) -> &MatchState {
        &self.state
    }

    /// Credit `amount` points to `team`.
    pub fn add_points(
        &mut self,
        team: TeamId,
        amount: u32,
        bid_type: BidType,
    ) -> Result<(), InvalidOperation> {
        if self.state.is_finished() {
            return Err(InvalidOperation::MatchFinished);
        }
        if amount == 0 {
            return Err(InvalidOperation::ZeroAmount);
        }

        let state = &mut self.state;
        let (score, won) = apply_points(state.team(team).score, amount, state.target);
        state.ledger = mem::take(&mut state.ledger).append(ScoringAction::new(team, amount, bid_type));
        state.team_mut(team).score = score;
        if won {
            state.status = status_for(Some(team));
        }

        let scores = state.scores();
        if let Some(rotation) = state.rotation.as_mut() {
            rotation.advance(scores);
        }
        Ok(())
    }

    /// Remove `amount` points from `team` by trimming its latest ledger entries.
    pub fn subtract_points(&mut self, team: TeamId, amount: u32) -> Result<(), InvalidOperation> {
        if self.state.is_finished() {
            return Err(InvalidOperation::MatchFinished);
        }
        if amount == 0 {
            return Err(InvalidOperation::ZeroAmount);
        }
        let current = self.state.team(team).score;
        if amount > current {
            return Err(InvalidOperation::Underflow {
                current,
                requested: amount,
            });
        }

        let state = &mut self.state;
        state.ledger = mem::take(&mut state.ledger).trim_team_points(team, amount);
        state.rederive();

        let scores = state.scores();
        if let Some(rotation) = state.rotation.as_mut() {
            rotation.retreat(scores);
        }
        Ok(())
    }

    /// Drop the newest scoring action and replay what is left.
    pub fn undo(&mut self) -> Result<(), InvalidOperation> {
        if self.state.ledger.is_empty() {
            return Err(InvalidOperation::EmptyLedger);
        }

        let state = &mut self.state;
        let (ledger, _removed) = mem::take(&mut state.ledger).without_last();
        state.ledger = ledger;
        state.rederive();

        let scores = state.scores();
        if let Some(rotation) = state.rotation.as_mut() {
            rotation.retreat(scores);
        }
        Ok(())
    }

    /// Replace the match with a fresh one. Returns the superseded match.
    pub fn reset(&mut self, mode: MatchMode, target: TargetScore) -> MatchState {
        mem::replace(&mut self.state, MatchState::new(mode, target))
    }

    /// Start a new match with the same line-up, series and rotation pairings.
    /// Returns the superseded match.
    pub fn rematch(&mut self) -> MatchState {
        let next = self.state.rematch();
        mem::replace(&mut self.state, next)
    }

    /// Replace the match wholesale with a remote copy. Returns the previous match.
    pub fn adopt(&mut self, remote: MatchState) -> MatchState {
        mem::replace(&mut self.state, remote)
    }

    /// Switch the target to 15 or 30 (other values are coerced) and rescale.
    ///
    /// Going from 30 to 15 keeps a one-level backup of the previous scores;
    /// going back to 30 restores it when the ledger has not moved since.
    pub fn set_target_score(&mut self, requested: u32) {
        let target = TargetScore::coerce(requested);
        let state = &mut self.state;
        if target == state.target {
            return;
        }

        let source = match target {
            TargetScore::Fifteen => {
                state.target_backup = Some(TargetBackup::capture(state.scores(), &state.ledger));
                state.scores()
            }
            TargetScore::Thirty => match state.target_backup.take() {
                Some(backup) if backup.matches(&state.ledger) => backup.scores,
                _ => state.ledger.recompute(target).scores,
            },
        };

        let (scores, status) = rescale(source, target);
        state.target = target;
        state.set_scores(scores);
        state.status = status;

        if let Some(rotation) = state.rotation.as_mut() {
            rotation.resync(scores);
        }
    }

    /// Rename a team.
    pub fn set_team_name(&mut self, team: TeamId, name: impl Into<String>) {
        self.state.team_mut(team).name = name.into();
    }

    /// Replace a team's player list, keeping at most [`MAX_PLAYERS_PER_TEAM`].
    pub fn set_players(&mut self, team: TeamId, mut players: Vec<String>) {
        players.truncate(MAX_PLAYERS_PER_TEAM);
        self.state.team_mut(team).players = players;
    }

    /// Link a team to a persisted pair, or unlink it.
    pub fn set_pair_id(&mut self, team: TeamId, pair_id: Option<String>) {
        self.state.team_mut(team).pair_id = pair_id;
    }

    /// Set location and user-edited date.
    pub fn set_metadata(&mut self, location: Option<String>, date: Option<SystemTime>) {
        self.state.metadata = MatchMetadata { location, date };
    }

    /// Attach the match to a series, or detach it.
    pub fn set_series(&mut self, series: Option<SeriesInfo>) {
        self.state.series = series;
    }

    /// Install or remove the rotation configuration.
    pub fn set_rotation_config(&mut self, rotation: Option<RotationConfig>) {
        let scores = self.state.scores();
        self.state.rotation = rotation.map(|mut rotation| {
            rotation.resync(scores);
            rotation
        });
    }

    /// Take remote display names without touching scores or history.
    pub fn apply_name_patch(&mut self, nosotros: Option<String>, ellos: Option<String>) {
        if let Some(name) = nosotros {
            self.state.nosotros.name = name;
        }
        if let Some(name) = ellos {
            self.state.ellos.name = name;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::rotation::Pairing;

    fn session(target: TargetScore) -> MatchSession {
        MatchSession::new(MatchMode::TwoVsTwo, target)
    }

    fn score_to(session: &mut MatchSession, team: TeamId, points: u32) {
        let mut remaining = points;
        while remaining > 0 {
            let step = remaining.min(3);
            session.add_points(team, step, BidType::RealEnvido).unwrap();
            remaining -= step;
        }
    }

    fn assert_scores_match_ledger(state: &MatchState) {
        assert_eq!(state.scores(), state.ledger().recompute(state.target()).scores);
    }

    #[test]
    fn bids_accumulate_without_finishing() {
        let mut session = session(TargetScore::Thirty);
        session.add_points(TeamId::Nosotros, 2, BidType::Envido).unwrap();
        session.add_points(TeamId::Nosotros, 3, BidType::RealEnvido).unwrap();
        session.add_points(TeamId::Nosotros, 3, BidType::Retruco).unwrap();

        let state = session.state();
        assert_eq!(state.team(TeamId::Nosotros).score(), 8);
        assert!(!state.is_finished());
        assert_eq!(state.ledger().len(), 3);
    }

    #[test]
    fn winning_bid_clamps_and_undo_restores_previous_score() {
        let mut session = session(TargetScore::Fifteen);
        score_to(&mut session, TeamId::Nosotros, 13);

        session.add_points(TeamId::Nosotros, 4, BidType::ValeCuatro).unwrap();
        assert_eq!(session.state().team(TeamId::Nosotros).score(), 15);
        assert_eq!(
            session.state().status(),
            MatchStatus::Finished {
                winner: TeamId::Nosotros
            }
        );

        session.undo().unwrap();
        assert_eq!(session.state().team(TeamId::Nosotros).score(), 13);
        assert_eq!(session.state().status(), MatchStatus::Live);
        assert_eq!(session.state().status().winner(), None);
    }

    #[test]
    fn finished_match_ignores_scoring() {
        let mut session = session(TargetScore::Fifteen);
        score_to(&mut session, TeamId::Ellos, 15);
        let before = session.state().clone();

        assert_eq!(
            session.add_points(TeamId::Nosotros, 2, BidType::Truco),
            Err(InvalidOperation::MatchFinished)
        );
        assert_eq!(
            session.subtract_points(TeamId::Ellos, 1),
            Err(InvalidOperation::MatchFinished)
        );
        assert_eq!(session.state(), &before);
    }

    #[test]
    fn undo_on_empty_ledger_is_rejected() {
        let mut session = session(TargetScore::Thirty);
        assert_eq!(session.undo(), Err(InvalidOperation::EmptyLedger));
    }

    #[test]
    fn zero_amount_is_rejected() {
        let mut session = session(TargetScore::Thirty);
        assert_eq!(
            session.add_points(TeamId::Ellos, 0, BidType::ManualAdjustment),
            Err(InvalidOperation::ZeroAmount)
        );
        assert!(session.state().ledger().is_empty());
    }

    #[test]
    fn undo_after_plain_add_restores_previous_state() {
        let mut session = session(TargetScore::Thirty);
        score_to(&mut session, TeamId::Ellos, 7);
        let before = session.state().clone();

        session.add_points(TeamId::Ellos, 2, BidType::Truco).unwrap();
        session.undo().unwrap();
        assert_eq!(session.state(), &before);
    }

    #[test]
    fn subtract_trims_the_ledger() {
        let mut session = session(TargetScore::Thirty);
        session.add_points(TeamId::Nosotros, 4, BidType::ValeCuatro).unwrap();
        session.add_points(TeamId::Ellos, 2, BidType::Envido).unwrap();

        session.subtract_points(TeamId::Nosotros, 1).unwrap();
        let state = session.state();
        assert_eq!(state.team(TeamId::Nosotros).score(), 3);
        assert_eq!(state.team(TeamId::Ellos).score(), 2);
        assert_scores_match_ledger(state);
    }

    #[test]
    fn subtract_below_zero_is_rejected() {
        let mut session = session(TargetScore::Thirty);
        session.add_points(TeamId::Nosotros, 2, BidType::Envido).unwrap();
        let before = session.state().clone();

        assert_eq!(
            session.subtract_points(TeamId::Nosotros, 3),
            Err(InvalidOperation::Underflow {
                current: 2,
                requested: 3
            })
        );
        assert_eq!(session.state(), &before);
    }

    #[test]
    fn lowering_the_target_clamps_and_raising_restores() {
        let mut session = session(TargetScore::Thirty);
        score_to(&mut session, TeamId::Nosotros, 10);
        score_to(&mut session, TeamId::Ellos, 20);

        session.set_target_score(15);
        let state = session.state();
        assert_eq!(state.team(TeamId::Nosotros).score(), 10);
        assert_eq!(state.team(TeamId::Ellos).score(), 15);
        assert_eq!(state.status().winner(), Some(TeamId::Ellos));
        assert_eq!(
            state.target_backup().map(|backup| backup.scores),
            Some(TeamScores {
                nosotros: 10,
                ellos: 20
            })
        );
        assert_scores_match_ledger(state);

        session.set_target_score(30);
        let state = session.state();
        assert_eq!(state.team(TeamId::Nosotros).score(), 10);
        assert_eq!(state.team(TeamId::Ellos).score(), 20);
        assert!(!state.is_finished());
        assert!(state.target_backup().is_none());
        assert_scores_match_ledger(state);
    }

    #[test]
    fn raising_the_target_after_new_points_replays_the_ledger() {
        let mut session = session(TargetScore::Thirty);
        score_to(&mut session, TeamId::Nosotros, 6);
        session.set_target_score(15);
        session.add_points(TeamId::Nosotros, 3, BidType::Retruco).unwrap();

        session.set_target_score(30);
        assert_eq!(session.state().team(TeamId::Nosotros).score(), 9);
        assert_scores_match_ledger(session.state());
    }

    #[test]
    fn unsupported_target_values_are_coerced() {
        let mut session = session(TargetScore::Thirty);
        session.set_target_score(21);
        assert_eq!(session.state().target(), TargetScore::Fifteen);
        session.set_target_score(30);
        assert_eq!(session.state().target(), TargetScore::Thirty);
    }

    #[test]
    fn second_switch_discards_the_earlier_backup() {
        let mut session = session(TargetScore::Thirty);
        score_to(&mut session, TeamId::Ellos, 4);
        session.set_target_score(15);
        let first = session.state().target_backup();
        session.set_target_score(30);
        session.add_points(TeamId::Ellos, 2, BidType::Truco).unwrap();
        session.set_target_score(15);

        let second = session.state().target_backup();
        assert_ne!(first, second);
        assert_eq!(second.map(|backup| backup.scores.ellos), Some(6));
    }

    #[test]
    fn rotation_follows_scoring_and_undo() {
        let mut session = session(TargetScore::Thirty);
        score_to(&mut session, TeamId::Nosotros, 9);
        let pairings = (0..3)
            .map(|index| Pairing {
                first: format!("n{index}"),
                second: format!("e{index}"),
            })
            .collect();
        session.set_rotation_config(Some(RotationConfig::new(10, 15, pairings)));

        session.add_points(TeamId::Nosotros, 2, BidType::Truco).unwrap();
        let rotation = session.state().rotation.as_ref().unwrap();
        assert_eq!(rotation.current_index, 1);
        assert!(rotation.is_active());

        session.undo().unwrap();
        let rotation = session.state().rotation.as_ref().unwrap();
        assert_eq!(rotation.current_index, 0);
        assert!(!rotation.is_active());
    }

    #[test]
    fn rotation_installed_mid_window_is_not_rewound_by_undo() {
        let mut session = session(TargetScore::Thirty);
        score_to(&mut session, TeamId::Nosotros, 12);
        let pairings = (0..3)
            .map(|index| Pairing {
                first: format!("n{index}"),
                second: format!("e{index}"),
            })
            .collect();
        session.set_rotation_config(Some(RotationConfig::new(10, 15, pairings)));
        assert_eq!(session.state().rotation.as_ref().unwrap().current_index, 0);

        session.undo().unwrap();
        assert_eq!(session.state().team(TeamId::Nosotros).score(), 9);
        let rotation = session.state().rotation.as_ref().unwrap();
        assert_eq!(rotation.current_index, 0);
        assert!(!rotation.is_active());
    }

    #[test]
    fn target_switch_inside_the_window_keeps_the_counted_entry() {
        let mut session = session(TargetScore::Thirty);
        score_to(&mut session, TeamId::Nosotros, 9);
        let pairings = (0..3)
            .map(|index| Pairing {
                first: format!("n{index}"),
                second: format!("e{index}"),
            })
            .collect();
        session.set_rotation_config(Some(RotationConfig::new(10, 15, pairings)));
        session.add_points(TeamId::Nosotros, 2, BidType::Truco).unwrap();
        session.set_target_score(15);
        assert_eq!(session.state().rotation.as_ref().unwrap().current_index, 1);

        session.undo().unwrap();
        assert_eq!(session.state().rotation.as_ref().unwrap().current_index, 0);
    }

    #[test]
    fn reset_allocates_a_new_identity() {
        let mut session = session(TargetScore::Fifteen);
        session.add_points(TeamId::Ellos, 2, BidType::Truco).unwrap();
        let previous = session.reset(MatchMode::ThreeVsThree, TargetScore::Thirty);

        let state = session.state();
        assert_ne!(state.id, previous.id);
        assert!(state.ledger().is_empty());
        assert_eq!(state.mode, MatchMode::ThreeVsThree);
        assert_eq!(state.target(), TargetScore::Thirty);
        assert_eq!(previous.ledger().len(), 1);
    }

    #[test]
    fn rematch_keeps_line_up_and_series() {
        let mut session = session(TargetScore::Fifteen);
        session.set_team_name(TeamId::Nosotros, "Los Pibes");
        session.set_players(
            TeamId::Ellos,
            vec!["a".into(), "b".into(), "c".into(), "d".into()],
        );
        let series = SeriesInfo::best_of(3);
        session.set_series(Some(series));
        score_to(&mut session, TeamId::Nosotros, 15);

        let previous = session.rematch();
        let state = session.state();
        assert!(previous.is_finished());
        assert_ne!(state.id, previous.id);
        assert_eq!(state.team(TeamId::Nosotros).name, "Los Pibes");
        assert_eq!(state.team(TeamId::Nosotros).score(), 0);
        assert_eq!(state.team(TeamId::Ellos).players.len(), MAX_PLAYERS_PER_TEAM);
        assert_eq!(state.series, Some(series));
        assert_eq!(state.target(), TargetScore::Fifteen);
        assert!(!state.is_finished());
    }

    #[test]
    fn best_of_three_needs_two_wins() {
        assert_eq!(SeriesInfo::best_of(3).target_wins, 2);
        assert_eq!(SeriesInfo::best_of(5).target_wins, 3);
    }

    #[test]
    fn restore_rederives_scores_from_the_ledger() {
        let ledger = ScoreLedger::new()
            .append(ScoringAction::new(TeamId::Ellos, 4, BidType::ValeCuatro))
            .append(ScoringAction::new(TeamId::Ellos, 3, BidType::Retruco));
        let mut ellos = Team::new(TeamId::Ellos);
        ellos.score = 99;

        let state = MatchState::restore(
            Uuid::new_v4(),
            SystemTime::now(),
            MatchMode::OneVsOne,
            TargetScore::Fifteen,
            [Team::new(TeamId::Nosotros), ellos],
            ledger,
            MatchStatus::Finished {
                winner: TeamId::Ellos,
            },
            None,
        );

        assert_eq!(state.team(TeamId::Ellos).score(), 7);
        assert_eq!(state.status(), MatchStatus::Live);
    }

    #[test]
    fn name_patch_leaves_scores_alone() {
        let mut session = session(TargetScore::Thirty);
        session.add_points(TeamId::Nosotros, 3, BidType::Retruco).unwrap();
        session.apply_name_patch(None, Some("Visitantes".into()));

        let state = session.state();
        assert_eq!(state.team(TeamId::Ellos).name, "Visitantes");
        assert_eq!(state.team(TeamId::Nosotros).name, "Nosotros");
        assert_eq!(state.team(TeamId::Nosotros).score(), 3);
    }
}
