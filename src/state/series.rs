//! Best-of-N aggregation over finished matches.

use std::collections::HashSet;

use uuid::Uuid;

use crate::state::{
    ledger::{TeamId, TeamScores},
    session::{MatchState, SeriesInfo},
};

/// Score of a series.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeriesProgress {
    /// Series identifier.
    pub series_id: Uuid,
    /// Wins needed to take the series.
    pub target_wins: u32,
    /// Match wins per side.
    pub wins: TeamScores,
    /// Finished matches counted.
    pub matches_played: u32,
    /// Side that reached `target_wins`, if any.
    pub winner: Option<TeamId>,
}

impl SeriesProgress {
    /// Whether a side already won the series.
    pub fn is_finished(&self) -> bool {
        self.winner.is_some()
    }
}

/// Read-only view over the matches of one series.
pub struct SeriesCoordinator;

impl SeriesCoordinator {
    /// Count wins of every finished match that belongs to `series`.
    ///
    /// Matches from other series, unfinished matches and repeated ids are
    /// ignored, so the archived records and the current match can be chained
    /// without deduplicating first.
    pub fn progress<'a>(
        series: &SeriesInfo,
        matches: impl IntoIterator<Item = &'a MatchState>,
    ) -> SeriesProgress {
        let mut seen = HashSet::new();
        let mut wins = TeamScores::default();
        let mut matches_played = 0;

        for state in matches {
            let in_series = state.series.is_some_and(|info| info.id == series.id);
            let Some(winner) = state.status().winner() else {
                continue;
            };
            if !in_series || !seen.insert(state.id) {
                continue;
            }
            wins.set(winner, wins.get(winner) + 1);
            matches_played += 1;
        }

        let winner = TeamId::ALL
            .into_iter()
            .find(|team| wins.get(*team) >= series.target_wins);

        SeriesProgress {
            series_id: series.id,
            target_wins: series.target_wins,
            wins,
            matches_played,
            winner,
        }
    }
}
