use sqlx::SqlitePool;
use storage::{
    dto::competitor::{CompetitorDetailResponse, RatingPoint},
    error::Result,
    models::Population,
    repository::{competitor::CompetitorRepository, rating::RatingRepository},
    services::ranking::{date_for_day, round_dp2},
};

/// Profile plus rating history from the population matching the competitor's gender.
pub async fn competitor_detail(
    pool: &SqlitePool,
    competitor_id: i64,
) -> Result<CompetitorDetailResponse> {
    let competitor = CompetitorRepository::new(pool)
        .find_profile(competitor_id)
        .await?;
    let population = Population::from_gender(&competitor.gender);

    let ratings = match population {
        Some(population) => RatingRepository::new(pool)
            .history(population, competitor_id)
            .await?
            .into_iter()
            .map(|s| RatingPoint {
                day: s.day,
                date: date_for_day(s.day),
                rating: round_dp2(s.rating),
                error: round_dp2(s.error),
            })
            .collect(),
        None => Vec::new(),
    };

    Ok(CompetitorDetailResponse {
        competitor,
        population,
        ratings,
    })
}
