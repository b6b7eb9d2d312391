use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::state::{
    ledger::{TeamId, TeamScores},
    series::SeriesProgress,
};

/// Wins per side of a series.
#[derive(Debug, Serialize, ToSchema)]
pub struct SeriesProgressResponse {
    pub series_id: Uuid,
    pub target_wins: u32,
    pub nosotros_wins: u32,
    pub ellos_wins: u32,
    pub matches_played: u32,
    pub is_finished: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub winner: Option<TeamId>,
}

impl From<SeriesProgress> for SeriesProgressResponse {
    fn from(progress: SeriesProgress) -> Self {
        let TeamScores { nosotros, ellos } = progress.wins;
        Self {
            series_id: progress.series_id,
            target_wins: progress.target_wins,
            nosotros_wins: nosotros,
            ellos_wins: ellos,
            matches_played: progress.matches_played,
            is_finished: progress.is_finished(),
            winner: progress.winner,
        }
    }
}
