use std::collections::HashMap;
use std::marker::PhantomData;

use chrono::{Local, NaiveDate, NaiveDateTime};
use tracing::{error, info};

use storage::Database;
use storage::models::Population;
use storage::repository::checkpoint::CheckpointRepository;
use storage::repository::competitor::CompetitorRepository;
use storage::repository::matches::MatchRepository;
use storage::repository::rating::RatingRepository;
use storage::repository::snapshot::SnapshotRepository;
use storage::services::ranking::{day_index, rank};

use crate::Result;
use crate::config::PipelineConfig;
use crate::publish::LeaderboardPublisher;
use crate::rating::{EngineConfig, RatingEngine, compute_ratings};
use crate::snapshot::SnapshotDriver;
use crate::sync::IngestionSync;
use crate::traits::FeedSource;

/// One scheduled update: ingest, rate, publish, backfill snapshots.
///
/// Phases that durably commit are followed by a checkpoint write, so a failed
/// run keeps whatever earlier phases committed and nothing more.
pub struct Pipeline<F: FeedSource, E: RatingEngine> {
    db: Database,
    feed: F,
    config: PipelineConfig,
    publisher: LeaderboardPublisher,
    engine: PhantomData<fn() -> E>,
}

impl<F: FeedSource, E: RatingEngine> Pipeline<F, E> {
    pub fn new(db: Database, feed: F, config: PipelineConfig) -> Self {
        let publisher = LeaderboardPublisher::new(config.output_dir.clone());
        Self {
            db,
            feed,
            config,
            publisher,
            engine: PhantomData,
        }
    }

    /// Runs a full update as of now. Any failure is logged and reported as `false`.
    pub async fn run(&self) -> bool {
        self.run_at(Local::now().naive_local()).await
    }

    pub async fn run_at(&self, now: NaiveDateTime) -> bool {
        match self.execute(now).await {
            Ok(()) => {
                info!("Run completed");
                true
            }
            Err(e) => {
                error!(kind = %e.kind(), "Run failed: {}", e);
                false
            }
        }
    }

    async fn execute(&self, now: NaiveDateTime) -> Result<()> {
        let pool = self.db.pool();
        let checkpoints = CheckpointRepository::new(pool);
        let mut checkpoint = checkpoints.load().await?;

        let sync = IngestionSync::new(
            pool,
            &self.feed,
            self.config.match_page_size,
            self.config.politeness_max_delay,
        );
        let report = sync.run(&mut checkpoint, now).await?;
        if report.has_new_data() {
            info!(
                "Ingested {} events, {} matches, {} competitors",
                report.events, report.matches, report.competitors
            );
        } else {
            info!("Feed has no new events");
        }

        // Also catches up after a run that committed data but failed before rating.
        if checkpoint.rating_time < checkpoint.data_time {
            self.recompute_ratings().await?;
            checkpoint.rating_time = Some(now);
            checkpoints.save(&checkpoint).await?;
        }

        let today = now.date();
        if self.publish_rankings(today).await? {
            checkpoint.ranking_time = Some(now);
            checkpoints.save(&checkpoint).await?;
        }

        let driver = SnapshotDriver::new(pool, &self.config);
        let snapshots = SnapshotRepository::new(pool);
        for population in Population::ALL {
            let last = snapshots.last_eval_date(population).await?;
            driver.backfill::<E>(population, last, today).await?;
        }

        Ok(())
    }

    /// Replaces both populations' rating histories from the full match table.
    async fn recompute_ratings(&self) -> Result<()> {
        let pool = self.db.pool();
        let matches = MatchRepository::new(pool).list_until(None).await?;
        let ratings = RatingRepository::new(pool);

        for population in Population::ALL {
            let config = EngineConfig {
                w2: self.config.uncertainty_growth(population),
            };
            let samples = compute_ratings::<E>(&matches, population, config)?;
            ratings.replace(population, &samples).await?;
            info!("Stored {} {} rating samples", samples.len(), population);
        }

        Ok(())
    }

    /// Whether any leaderboard document changed.
    async fn publish_rankings(&self, today: NaiveDate) -> Result<bool> {
        let pool = self.db.pool();
        let profiles: HashMap<i64, _> = CompetitorRepository::new(pool)
            .list_profiles()
            .await?
            .into_iter()
            .map(|p| (p.competitor_id, p))
            .collect();
        let ratings = RatingRepository::new(pool);

        let mut changed = false;
        for population in Population::ALL {
            let samples = ratings.list(population).await?;
            let entries = rank(
                &samples,
                &profiles,
                day_index(today),
                self.config.uncertainty_growth(population),
            );
            changed |= self.publisher.publish(population, &entries).await?;
        }

        Ok(changed)
    }
}
