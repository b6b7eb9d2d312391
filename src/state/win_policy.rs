//! Clamping and win detection rules shared by forward scoring, replay, and
//! target-score changes.

use serde::{Deserialize, Serialize};

use crate::state::ledger::{TeamId, TeamScores};

/// Score a team must reach to win. Only 15 and 30 are playable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "u32", into = "u32")]
pub enum TargetScore {
    /// Short match.
    Fifteen,
    /// Regular match.
    #[default]
    Thirty,
}

impl TargetScore {
    /// Numeric value of the target.
    pub fn points(self) -> u32 {
        match self {
            TargetScore::Fifteen => 15,
            TargetScore::Thirty => 30,
        }
    }

    /// Map any requested value onto the playable set: 30 stays 30, anything else is 15.
    pub fn coerce(value: u32) -> Self {
        if value == 30 {
            TargetScore::Thirty
        } else {
            TargetScore::Fifteen
        }
    }
}

impl From<u32> for TargetScore {
    fn from(value: u32) -> Self {
        TargetScore::coerce(value)
    }
}

impl From<TargetScore> for u32 {
    fn from(value: TargetScore) -> Self {
        value.points()
    }
}

/// Lifecycle of a match. A winner only exists once the match is finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MatchStatus {
    /// Points can still be scored.
    #[default]
    Live,
    /// Some team reached the target.
    Finished {
        /// Team credited with the win.
        winner: TeamId,
    },
}

impl MatchStatus {
    /// Whether the match has a winner.
    pub fn is_finished(self) -> bool {
        matches!(self, MatchStatus::Finished { .. })
    }

    /// Winning team, if any.
    pub fn winner(self) -> Option<TeamId> {
        match self {
            MatchStatus::Finished { winner } => Some(winner),
            MatchStatus::Live => None,
        }
    }
}

/// Credit `amount` on top of `current`, clamping at the target.
///
/// Returns the new score and whether it reaches the target.
pub fn apply_points(current: u32, amount: u32, target: TargetScore) -> (u32, bool) {
    let new_score = current.saturating_add(amount).min(target.points());
    (new_score, new_score >= target.points())
}

/// Status implied by a replay that may or may not have produced a winner.
pub fn status_for(winner: Option<TeamId>) -> MatchStatus {
    match winner {
        Some(winner) => MatchStatus::Finished { winner },
        None => MatchStatus::Live,
    }
}

/// Rescale `source` scores onto `target` and decide the resulting status.
///
/// When both teams reach the new target the higher source score wins; equal
/// source scores go to [`TeamId::Nosotros`].
pub fn rescale(source: TeamScores, target: TargetScore) -> (TeamScores, MatchStatus) {
    let goal = target.points();
    let clamped = TeamScores {
        nosotros: source.nosotros.min(goal),
        ellos: source.ellos.min(goal),
    };

    let winner = match (clamped.nosotros >= goal, clamped.ellos >= goal) {
        (true, false) => Some(TeamId::Nosotros),
        (false, true) => Some(TeamId::Ellos),
        (true, true) if source.ellos > source.nosotros => Some(TeamId::Ellos),
        (true, true) => Some(TeamId::Nosotros),
        (false, false) => None,
    };

    (clamped, status_for(winner))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn apply_points_clamps_at_target() {
        assert_eq!(apply_points(13, 4, TargetScore::Fifteen), (15, true));
        assert_eq!(apply_points(10, 4, TargetScore::Thirty), (14, false));
        assert_eq!(apply_points(28, 2, TargetScore::Thirty), (30, true));
    }

    #[test]
    fn coerce_prefers_fifteen_unless_exactly_thirty() {
        assert_eq!(TargetScore::coerce(30), TargetScore::Thirty);
        assert_eq!(TargetScore::coerce(15), TargetScore::Fifteen);
        assert_eq!(TargetScore::coerce(29), TargetScore::Fifteen);
        assert_eq!(TargetScore::coerce(40), TargetScore::Fifteen);
    }

    #[test]
    fn rescale_clamps_and_picks_single_winner() {
        let (scores, status) = rescale(
            TeamScores {
                nosotros: 10,
                ellos: 20,
            },
            TargetScore::Fifteen,
        );
        assert_eq!(
            scores,
            TeamScores {
                nosotros: 10,
                ellos: 15
            }
        );
        assert_eq!(
            status,
            MatchStatus::Finished {
                winner: TeamId::Ellos
            }
        );
    }

    #[test]
    fn rescale_with_both_over_target_favours_higher_source() {
        let (_, status) = rescale(
            TeamScores {
                nosotros: 18,
                ellos: 22,
            },
            TargetScore::Fifteen,
        );
        assert_eq!(status.winner(), Some(TeamId::Ellos));

        let (_, status) = rescale(
            TeamScores {
                nosotros: 20,
                ellos: 20,
            },
            TargetScore::Fifteen,
        );
        assert_eq!(status.winner(), Some(TeamId::Nosotros));
    }

    #[test]
    fn rescale_below_target_is_live() {
        let (_, status) = rescale(
            TeamScores {
                nosotros: 10,
                ellos: 20,
            },
            TargetScore::Thirty,
        );
        assert_eq!(status, MatchStatus::Live);
        assert!(!status.is_finished());
    }

    #[test]
    fn target_score_serializes_as_number() {
        assert_eq!(serde_json::to_string(&TargetScore::Fifteen).unwrap(), "15");
        let parsed: TargetScore = serde_json::from_str("22").unwrap();
        assert_eq!(parsed, TargetScore::Fifteen);
    }
}
