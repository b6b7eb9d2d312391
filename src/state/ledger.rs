//! Append-only log of scoring actions and the replay that derives team scores
//! from it. Nothing in here performs I/O.

use std::time::SystemTime;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::state::{
    bids::BidType,
    win_policy::{TargetScore, apply_points},
};

/// The two fixed team roles of a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum TeamId {
    /// The scorekeeper's own side.
    Nosotros,
    /// The opposing side.
    Ellos,
}

impl TeamId {
    /// Both roles in display order.
    pub const ALL: [TeamId; 2] = [TeamId::Nosotros, TeamId::Ellos];

    /// The other team.
    pub fn opponent(self) -> Self {
        match self {
            TeamId::Nosotros => TeamId::Ellos,
            TeamId::Ellos => TeamId::Nosotros,
        }
    }
}

/// Pair of per-team counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TeamScores {
    /// Counter for [`TeamId::Nosotros`].
    pub nosotros: u32,
    /// Counter for [`TeamId::Ellos`].
    pub ellos: u32,
}

impl TeamScores {
    /// Read the counter of `team`.
    pub fn get(&self, team: TeamId) -> u32 {
        match team {
            TeamId::Nosotros => self.nosotros,
            TeamId::Ellos => self.ellos,
        }
    }

    /// Overwrite the counter of `team`.
    pub fn set(&mut self, team: TeamId, value: u32) {
        match team {
            TeamId::Nosotros => self.nosotros = value,
            TeamId::Ellos => self.ellos = value,
        }
    }
}

/// One immutable scoring event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoringAction {
    /// Unique identifier of the action.
    pub id: Uuid,
    /// When the action was recorded.
    pub timestamp: SystemTime,
    /// Team credited with the points.
    pub team: TeamId,
    /// Points credited (always positive).
    pub amount: u32,
    /// Bid that produced the points.
    pub bid_type: BidType,
}

impl ScoringAction {
    /// Record a new action stamped with a fresh id and the current time.
    pub fn new(team: TeamId, amount: u32, bid_type: BidType) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: SystemTime::now(),
            team,
            amount,
            bid_type,
        }
    }
}

/// Scores and winner obtained by replaying a ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Recomputed {
    /// Clamped team scores.
    pub scores: TeamScores,
    /// Last team whose score reached the target during the replay.
    pub winner: Option<TeamId>,
}

/// Ordered history of scoring actions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScoreLedger {
    actions: Vec<ScoringAction>,
}

impl ScoreLedger {
    /// Empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a ledger from persisted actions, preserving their order.
    pub fn from_actions(actions: Vec<ScoringAction>) -> Self {
        Self { actions }
    }

    /// Actions in recording order.
    pub fn actions(&self) -> &[ScoringAction] {
        &self.actions
    }

    /// Number of recorded actions; used as the logical clock during sync.
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    /// Whether nothing has been recorded yet.
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Most recent action.
    pub fn last(&self) -> Option<&ScoringAction> {
        self.actions.last()
    }

    /// Append an action. No business rule is enforced here.
    pub fn append(mut self, action: ScoringAction) -> Self {
        self.actions.push(action);
        self
    }

    /// Drop the most recent action, returning it alongside the shortened ledger.
    pub fn without_last(mut self) -> (Self, Option<ScoringAction>) {
        let removed = self.actions.pop();
        (self, removed)
    }

    /// Replay every action from zero under `target`.
    ///
    /// Each team is clamped at the target on every step. A later crossing
    /// overwrites an earlier one, so the winner is the last team to reach the
    /// target in ledger order.
    pub fn recompute(&self, target: TargetScore) -> Recomputed {
        let mut scores = TeamScores::default();
        let mut winner = None;

        for action in &self.actions {
            let (next, reached) = apply_points(scores.get(action.team), action.amount, target);
            scores.set(action.team, next);
            if reached {
                winner = Some(action.team);
            }
        }

        Recomputed { scores, winner }
    }

    /// Unclamped point totals per team.
    pub fn totals(&self) -> TeamScores {
        self.actions
            .iter()
            .fold(TeamScores::default(), |mut totals, action| {
                let next = totals.get(action.team).saturating_add(action.amount);
                totals.set(action.team, next);
                totals
            })
    }

    /// Remove `amount` points of `team` by trimming its most recent actions.
    ///
    /// Actions of `team` are dropped newest first until `amount` is covered. If
    /// the last dropped action overshoots, a [`BidType::ManualAdjustment`]
    /// carrying the remainder takes its place. The other team's actions are
    /// left untouched.
    pub fn trim_team_points(self, team: TeamId, amount: u32) -> Self {
        let mut actions = self.actions;
        let mut remaining = amount;
        let mut index = actions.len();

        while remaining > 0 && index > 0 {
            index -= 1;
            if actions[index].team != team {
                continue;
            }

            let removed = actions.remove(index);
            if removed.amount > remaining {
                actions.insert(
                    index,
                    ScoringAction {
                        id: Uuid::new_v4(),
                        timestamp: removed.timestamp,
                        team,
                        amount: removed.amount - remaining,
                        bid_type: BidType::ManualAdjustment,
                    },
                );
                remaining = 0;
            } else {
                remaining -= removed.amount;
            }
        }

        Self { actions }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ledger(entries: &[(TeamId, u32)]) -> ScoreLedger {
        entries
            .iter()
            .fold(ScoreLedger::new(), |ledger, (team, amount)| {
                ledger.append(ScoringAction::new(*team, *amount, BidType::ManualAdjustment))
            })
    }

    #[test]
    fn recompute_is_deterministic() {
        let ledger = ledger(&[
            (TeamId::Nosotros, 2),
            (TeamId::Ellos, 3),
            (TeamId::Nosotros, 4),
        ]);
        let first = ledger.recompute(TargetScore::Thirty);
        let second = ledger.recompute(TargetScore::Thirty);
        assert_eq!(first, second);
        assert_eq!(
            first.scores,
            TeamScores {
                nosotros: 6,
                ellos: 3
            }
        );
        assert_eq!(first.winner, None);
    }

    #[test]
    fn recompute_clamps_each_team_at_target() {
        let ledger = ledger(&[(TeamId::Nosotros, 13), (TeamId::Nosotros, 4)]);
        let replay = ledger.recompute(TargetScore::Fifteen);
        assert_eq!(replay.scores.nosotros, 15);
        assert_eq!(replay.winner, Some(TeamId::Nosotros));
        assert_eq!(ledger.totals().nosotros, 17);
    }

    #[test]
    fn last_crossing_wins_the_replay() {
        let ledger = ledger(&[
            (TeamId::Nosotros, 15),
            (TeamId::Ellos, 14),
            (TeamId::Ellos, 2),
        ]);
        let replay = ledger.recompute(TargetScore::Fifteen);
        assert_eq!(replay.winner, Some(TeamId::Ellos));
        assert_eq!(replay.scores.ellos, 15);
    }

    #[test]
    fn without_last_drops_only_the_newest_action() {
        let ledger = ledger(&[(TeamId::Nosotros, 2), (TeamId::Ellos, 3)]);
        let (shorter, removed) = ledger.without_last();
        assert_eq!(shorter.len(), 1);
        assert_eq!(removed.map(|action| action.team), Some(TeamId::Ellos));

        let (empty, _) = ScoreLedger::new().without_last();
        assert!(empty.is_empty());
    }

    #[test]
    fn trim_removes_whole_actions_newest_first() {
        let ledger = ledger(&[
            (TeamId::Nosotros, 2),
            (TeamId::Ellos, 3),
            (TeamId::Nosotros, 3),
        ]);
        let trimmed = ledger.trim_team_points(TeamId::Nosotros, 3);
        assert_eq!(trimmed.len(), 2);
        assert_eq!(trimmed.totals().nosotros, 2);
        assert_eq!(trimmed.totals().ellos, 3);
    }

    #[test]
    fn trim_leaves_an_adjustment_for_the_remainder() {
        let ledger = ledger(&[(TeamId::Nosotros, 2), (TeamId::Nosotros, 4)]);
        let original_timestamp = ledger.actions()[1].timestamp;
        let trimmed = ledger.trim_team_points(TeamId::Nosotros, 1);

        assert_eq!(trimmed.len(), 2);
        assert_eq!(trimmed.totals().nosotros, 5);
        let adjusted = &trimmed.actions()[1];
        assert_eq!(adjusted.amount, 3);
        assert_eq!(adjusted.bid_type, BidType::ManualAdjustment);
        assert_eq!(adjusted.timestamp, original_timestamp);
    }

    #[test]
    fn trim_across_several_actions() {
        let ledger = ledger(&[
            (TeamId::Ellos, 4),
            (TeamId::Ellos, 2),
            (TeamId::Nosotros, 1),
            (TeamId::Ellos, 3),
        ]);
        let trimmed = ledger.trim_team_points(TeamId::Ellos, 6);
        assert_eq!(trimmed.totals().ellos, 3);
        assert_eq!(trimmed.totals().nosotros, 1);
        assert_eq!(trimmed.len(), 2);
        assert_eq!(trimmed.actions()[0].bid_type, BidType::ManualAdjustment);
    }
}
