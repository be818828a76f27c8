use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

/// Competitor profile as first fetched from the feed. Never updated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Competitor {
    pub competitor_id: i64,
    pub name: String,
    /// "M" or "W" in the feed; anything else matches no population.
    pub gender: String,
    pub birth_year: Option<i32>,
    /// Association name taken from the profile text.
    pub association: String,
    /// Short association code embedded in the display name, e.g. "CHN".
    pub association_code: String,
}
