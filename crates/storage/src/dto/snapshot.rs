use chrono::NaiveDate;
use serde::Serialize;
use sqlx::FromRow;
use utoipa::ToSchema;

#[derive(Debug, Clone, PartialEq, Serialize, FromRow, ToSchema)]
pub struct SnapshotEntry {
    pub rank: i64,
    pub id: i64,
    pub name: String,
    pub name_zh: String,
    pub yob: Option<i32>,
    pub association: String,
    pub association_zh: String,
    pub rating: f64,
    pub error: f64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SnapshotResponse {
    pub eval_date: NaiveDate,
    pub entries: Vec<SnapshotEntry>,
}

/// Leaders of one weekly snapshot.
#[derive(Debug, Serialize, ToSchema)]
pub struct HistoryEntry {
    pub eval_date: NaiveDate,
    pub leaders: Vec<SnapshotEntry>,
}
