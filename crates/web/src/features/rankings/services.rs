use std::collections::HashMap;

use chrono::NaiveDate;
use sqlx::SqlitePool;
use storage::{
    dto::ranking::RankingEntry,
    error::Result,
    models::Population,
    repository::{competitor::CompetitorRepository, rating::RatingRepository},
    services::ranking::{day_index, rank},
};

/// Leaderboard from the stored rating samples as of `today`, top `limit` only.
pub async fn live_ranking(
    pool: &SqlitePool,
    population: Population,
    today: NaiveDate,
    uncertainty_growth: f64,
    limit: u32,
) -> Result<Vec<RankingEntry>> {
    let samples = RatingRepository::new(pool).list(population).await?;
    let profiles: HashMap<i64, _> = CompetitorRepository::new(pool)
        .list_profiles()
        .await?
        .into_iter()
        .map(|p| (p.competitor_id, p))
        .collect();

    let mut entries = rank(&samples, &profiles, day_index(today), uncertainty_growth);
    entries.truncate(limit as usize);
    Ok(entries)
}
