use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use crate::models::Population;

/// Competitor joined with its localized display fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct CompetitorProfile {
    pub competitor_id: i64,
    pub name: String,
    pub name_localized: Option<String>,
    pub gender: String,
    pub birth_year: Option<i32>,
    pub association: String,
    pub association_code: String,
    pub association_localized: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RatingPoint {
    pub day: i64,
    pub date: NaiveDate,
    pub rating: f64,
    pub error: f64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CompetitorDetailResponse {
    pub competitor: CompetitorProfile,
    /// `None` when the competitor's gender maps to no rated population.
    pub population: Option<Population>,
    pub ratings: Vec<RatingPoint>,
}

/// Out-of-band translations, keyed by competitor id and by association name.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Translations {
    #[serde(default)]
    pub competitors: std::collections::BTreeMap<i64, String>,
    #[serde(default)]
    pub associations: std::collections::BTreeMap<String, String>,
}
