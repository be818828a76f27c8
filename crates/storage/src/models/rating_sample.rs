use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

/// One point of a competitor's rating history.
///
/// `day` counts days since [`crate::services::ranking::epoch`]; `rating` and
/// `error` are in Elo units as produced by the rating engine.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct RatingSample {
    pub competitor_id: i64,
    pub day: i64,
    pub rating: f64,
    pub error: f64,
}
