//! Bid catalogue and the falta-envido points suggestion.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::state::win_policy::TargetScore;

/// Closed set of scoring events a team can be credited with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum BidType {
    /// Base envido call.
    Envido,
    /// Raised envido.
    RealEnvido,
    /// Maximum envido; its value depends on the current scores.
    FaltaEnvido,
    /// Base truco challenge.
    Truco,
    /// Raised truco challenge.
    Retruco,
    /// Maximum truco challenge.
    ValeCuatro,
    /// Single point added by tapping the scoreboard.
    ManualTap,
    /// Arbitrary positive correction entered by hand.
    ManualAdjustment,
}

impl BidType {
    /// Fixed amount credited by this bid, if it has one.
    pub fn default_points(self) -> Option<u32> {
        match self {
            BidType::Envido | BidType::Truco => Some(2),
            BidType::RealEnvido | BidType::Retruco => Some(3),
            BidType::ValeCuatro => Some(4),
            BidType::ManualTap => Some(1),
            BidType::FaltaEnvido | BidType::ManualAdjustment => None,
        }
    }
}

/// A team is "en buenas" once its score is strictly above half the target.
pub fn is_en_buenas(score: u32, target: TargetScore) -> bool {
    score * 2 > target.points()
}

/// Points a falta envido is worth for `winner_score` against `opponent_score`.
///
/// When the opponent is already en buenas the winner gets what the opponent
/// lacks to finish the match; otherwise the winner gets what it lacks itself.
pub fn falta_envido_points(target: TargetScore, winner_score: u32, opponent_score: u32) -> u32 {
    let goal = target.points();
    if is_en_buenas(opponent_score, target) {
        goal.saturating_sub(opponent_score)
    } else {
        goal.saturating_sub(winner_score)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn named_bids_have_fixed_values() {
        assert_eq!(BidType::Envido.default_points(), Some(2));
        assert_eq!(BidType::RealEnvido.default_points(), Some(3));
        assert_eq!(BidType::Retruco.default_points(), Some(3));
        assert_eq!(BidType::ValeCuatro.default_points(), Some(4));
        assert_eq!(BidType::FaltaEnvido.default_points(), None);
        assert_eq!(BidType::ManualAdjustment.default_points(), None);
    }

    #[test]
    fn falta_envido_against_opponent_en_buenas() {
        assert_eq!(falta_envido_points(TargetScore::Thirty, 10, 20), 10);
    }

    #[test]
    fn falta_envido_against_opponent_en_malas() {
        assert_eq!(falta_envido_points(TargetScore::Thirty, 10, 5), 20);
    }

    #[test]
    fn half_target_is_still_en_malas() {
        assert!(!is_en_buenas(15, TargetScore::Thirty));
        assert!(is_en_buenas(16, TargetScore::Thirty));
        assert!(is_en_buenas(8, TargetScore::Fifteen));
        assert_eq!(falta_envido_points(TargetScore::Fifteen, 3, 7), 12);
    }

    #[test]
    fn bid_types_serialize_in_snake_case() {
        let encoded = serde_json::to_string(&BidType::ValeCuatro).unwrap();
        assert_eq!(encoded, "\"vale_cuatro\"");
    }
}
