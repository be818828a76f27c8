use sqlx::{QueryBuilder, Sqlite, SqlitePool};

use super::INSERT_CHUNK;
use crate::error::Result;
use crate::models::{Population, RatingSample};

pub struct RatingRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> RatingRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Replaces the population's whole sample set in one transaction.
    pub async fn replace(&self, population: Population, samples: &[RatingSample]) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM rating_samples WHERE population = ?")
            .bind(population.as_str())
            .execute(&mut *tx)
            .await?;

        for chunk in samples.chunks(INSERT_CHUNK) {
            let mut query = QueryBuilder::<Sqlite>::new(
                "INSERT INTO rating_samples (population, competitor_id, day, rating, error) ",
            );
            query.push_values(chunk, |mut row, sample| {
                row.push_bind(population.as_str())
                    .push_bind(sample.competitor_id)
                    .push_bind(sample.day)
                    .push_bind(sample.rating)
                    .push_bind(sample.error);
            });
            query.build().execute(&mut *tx).await?;
        }

        tx.commit().await?;
        Ok(())
    }

    pub async fn list(&self, population: Population) -> Result<Vec<RatingSample>> {
        let samples = sqlx::query_as::<_, RatingSample>(
            r#"
            SELECT competitor_id, day, rating, error
            FROM rating_samples
            WHERE population = ?
            ORDER BY competitor_id, day
            "#,
        )
        .bind(population.as_str())
        .fetch_all(self.pool)
        .await?;

        Ok(samples)
    }

    /// One competitor's rating series, oldest first.
    pub async fn history(
        &self,
        population: Population,
        competitor_id: i64,
    ) -> Result<Vec<RatingSample>> {
        let samples = sqlx::query_as::<_, RatingSample>(
            r#"
            SELECT competitor_id, day, rating, error
            FROM rating_samples
            WHERE population = ? AND competitor_id = ?
            ORDER BY day
            "#,
        )
        .bind(population.as_str())
        .bind(competitor_id)
        .fetch_all(self.pool)
        .await?;

        Ok(samples)
    }
}
