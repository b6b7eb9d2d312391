use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dao::models::MatchRecordEntity,
    dto::format_system_time,
    state::{ledger::TeamId, session::MatchMode},
};

const DEFAULT_PAGE_SIZE: usize = 20;

fn default_limit() -> usize {
    DEFAULT_PAGE_SIZE
}

/// Paging of the history listing.
#[derive(Debug, Deserialize, IntoParams, Validate)]
#[into_params(parameter_in = Query)]
pub struct HistoryQuery {
    /// Records to skip.
    #[serde(default)]
    pub offset: usize,
    /// Page size.
    #[serde(default = "default_limit")]
    #[validate(range(min = 1, max = 100))]
    pub limit: usize,
}

/// Finalized match as listed in the history.
#[derive(Debug, Serialize, ToSchema)]
pub struct MatchRecordSummary {
    pub id: Uuid,
    /// User-edited date, else the creation time.
    pub date: String,
    pub mode: MatchMode,
    pub target_score: u32,
    pub winner: Option<TeamId>,
    pub nosotros_name: String,
    pub nosotros_score: u32,
    pub ellos_name: String,
    pub ellos_score: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub series_id: Option<Uuid>,
}

impl From<MatchRecordEntity> for MatchRecordSummary {
    fn from(record: MatchRecordEntity) -> Self {
        let date = format_system_time(record.effective_date());
        let game = record.game;
        Self {
            id: game.id,
            date,
            mode: game.mode,
            target_score: game.target_score,
            winner: game.winner,
            nosotros_name: game.nosotros.name,
            nosotros_score: game.nosotros.score,
            ellos_name: game.ellos.name,
            ellos_score: game.ellos.score,
            location: game.location,
            series_id: game.series.map(|series| series.id),
        }
    }
}

/// One page of history.
#[derive(Debug, Serialize, ToSchema)]
pub struct HistoryPage {
    pub offset: usize,
    pub limit: usize,
    pub records: Vec<MatchRecordSummary>,
}
