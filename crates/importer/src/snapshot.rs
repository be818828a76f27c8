//! Weekly historical snapshots.
//!
//! A boundary is a Sunday. Snapshots are produced from the third day of the
//! following week on, so late results of the weekend are in. Each missing
//! boundary gets a full rating recomputation over the matches up to that date.

use chrono::{Datelike, Duration, NaiveDate};
use sqlx::SqlitePool;
use tracing::{debug, info};

use storage::models::{HistoricalRank, Population, RatingSample};
use storage::repository::matches::MatchRepository;
use storage::repository::snapshot::SnapshotRepository;
use storage::services::ranking::{day_index, standings};

use crate::Result;
use crate::config::PipelineConfig;
use crate::rating::{EngineConfig, RatingEngine, compute_ratings};

pub const SNAPSHOT_SIZE: usize = 100;
/// Monday is 0.
const FIRST_SNAPSHOT_WEEKDAY: u32 = 2;

/// Most recent Sunday strictly before `today`.
pub fn last_sunday(today: NaiveDate) -> NaiveDate {
    today - Duration::days(i64::from(today.weekday().num_days_from_monday()) + 1)
}

/// `date` itself if it is a Sunday, otherwise the following Sunday.
pub fn next_sunday(date: NaiveDate) -> NaiveDate {
    date + Duration::days(6 - i64::from(date.weekday().num_days_from_monday()))
}

/// Boundaries still missing, oldest first.
///
/// Without a previous snapshot the series starts at `history_start`, or
/// consists of the last Sunday alone when no start is configured.
pub fn weekly_boundaries(
    last_snapshot: Option<NaiveDate>,
    today: NaiveDate,
    history_start: Option<NaiveDate>,
) -> Vec<NaiveDate> {
    if today.weekday().num_days_from_monday() < FIRST_SNAPSHOT_WEEKDAY {
        return Vec::new();
    }

    let end = last_sunday(today);
    let mut next = match (last_snapshot, history_start) {
        (Some(last), _) => next_sunday(last + Duration::days(1)),
        (None, Some(start)) => next_sunday(start),
        (None, None) => end,
    };

    let mut boundaries = Vec::new();
    while next <= end {
        boundaries.push(next);
        next += Duration::weeks(1);
    }
    boundaries
}

/// Top entries of the leaderboard as of `eval_date`.
pub fn snapshot_rows(
    samples: &[RatingSample],
    eval_date: NaiveDate,
    uncertainty_growth: f64,
) -> Vec<HistoricalRank> {
    standings(samples, day_index(eval_date), uncertainty_growth)
        .into_iter()
        .take(SNAPSHOT_SIZE)
        .map(|s| HistoricalRank {
            eval_date,
            rank: s.rank,
            competitor_id: s.competitor_id,
            rating: s.rating,
            error: s.decayed_error,
        })
        .collect()
}

pub struct SnapshotDriver<'a> {
    pool: &'a SqlitePool,
    config: &'a PipelineConfig,
}

impl<'a> SnapshotDriver<'a> {
    pub fn new(pool: &'a SqlitePool, config: &'a PipelineConfig) -> Self {
        Self { pool, config }
    }

    /// Appends every missing snapshot of `population`. Returns the dates written.
    pub async fn backfill<E: RatingEngine>(
        &self,
        population: Population,
        last_snapshot: Option<NaiveDate>,
        today: NaiveDate,
    ) -> Result<Vec<NaiveDate>> {
        let boundaries = weekly_boundaries(last_snapshot, today, self.config.history_start);
        let Some(&latest) = boundaries.last() else {
            debug!("No {} snapshot due", population);
            return Ok(boundaries);
        };
        info!(
            "Backfilling {} {} snapshots up to {}",
            boundaries.len(),
            population,
            latest
        );

        // Sorted by end date, so every boundary sees a prefix.
        let matches = MatchRepository::new(self.pool)
            .list_until(Some(latest))
            .await?;
        let engine_config = EngineConfig {
            w2: self.config.uncertainty_growth(population),
        };
        let repo = SnapshotRepository::new(self.pool);

        for &boundary in &boundaries {
            let visible = matches.partition_point(|m| m.end_date <= boundary);
            let samples = compute_ratings::<E>(&matches[..visible], population, engine_config)?;
            let rows = snapshot_rows(&samples, boundary, engine_config.w2);

            repo.append(population, boundary, &rows).await?;
            info!(
                "Stored {} snapshot {} with {} entries",
                population,
                boundary,
                rows.len()
            );
        }

        Ok(boundaries)
    }
}
