use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

/// One row of a published leaderboard document.
///
/// Field names are the document's wire format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct RankingEntry {
    pub rank: i64,
    pub id: i64,
    pub name: String,
    pub name_zh: String,
    pub yob: Option<i32>,
    pub association: String,
    pub association_zh: String,
    /// Rounded to 2 decimals.
    pub rating: f64,
    /// Decayed uncertainty, not rounded.
    pub error: f64,
    /// `rating - error`, rounded to 2 decimals.
    pub adjusted_rating: f64,
}

#[derive(Debug, Deserialize, IntoParams, Validate)]
pub struct RankingQuery {
    #[serde(default = "default_limit")]
    #[validate(range(min = 1, max = 1000))]
    pub limit: u32,
}

fn default_limit() -> u32 {
    100
}
