use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

/// Persisted row of a weekly top-100 snapshot. Append-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct HistoricalRank {
    pub eval_date: NaiveDate,
    pub rank: i64,
    pub competitor_id: i64,
    pub rating: f64,
    pub error: f64,
}
