use chrono::NaiveDate;
use sqlx::SqlitePool;
use storage::{
    dto::snapshot::{HistoryEntry, SnapshotResponse},
    error::Result,
    models::Population,
    repository::snapshot::SnapshotRepository,
};

/// Ranks shown per snapshot in the history overview.
pub const HISTORY_LEADERS: i64 = 5;

pub async fn history(pool: &SqlitePool, population: Population) -> Result<Vec<HistoryEntry>> {
    SnapshotRepository::new(pool)
        .leaders(population, HISTORY_LEADERS)
        .await
}

pub async fn snapshot(
    pool: &SqlitePool,
    population: Population,
    eval_date: NaiveDate,
) -> Result<SnapshotResponse> {
    SnapshotRepository::new(pool)
        .entries(population, eval_date)
        .await
}
