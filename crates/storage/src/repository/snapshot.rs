use chrono::NaiveDate;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};

use super::INSERT_CHUNK;
use crate::dto::snapshot::{HistoryEntry, SnapshotEntry, SnapshotResponse};
use crate::error::{Result, StorageError};
use crate::models::{HistoricalRank, Population};

const ENTRY_COLUMNS: &str = r#"
    hr.rank, hr.competitor_id AS id,
    COALESCE(c.name, '') AS name,
    COALESCE(ln.name, c.name, '') AS name_zh,
    c.birth_year AS yob,
    COALESCE(c.association_code, '') AS association,
    COALESCE(al.name, '') AS association_zh,
    hr.rating, hr.error
"#;

const ENTRY_FROM: &str = r#"
    FROM historical_ranks hr
    LEFT JOIN competitors c ON c.competitor_id = hr.competitor_id
    LEFT JOIN competitor_localized_names ln ON ln.competitor_id = hr.competitor_id
    LEFT JOIN association_localized_names al ON al.association = c.association
"#;

#[derive(sqlx::FromRow)]
struct LeaderRow {
    eval_date: NaiveDate,
    #[sqlx(flatten)]
    entry: SnapshotEntry,
}

pub struct SnapshotRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> SnapshotRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Most recent evaluated boundary, including snapshots that came out empty.
    pub async fn last_eval_date(&self, population: Population) -> Result<Option<NaiveDate>> {
        let last = sqlx::query_scalar::<_, Option<String>>(
            "SELECT MAX(eval_date) FROM historical_snapshots WHERE population = ?",
        )
        .bind(population.as_str())
        .fetch_one(self.pool)
        .await?;

        last.map(|raw| {
            NaiveDate::parse_from_str(&raw, "%Y-%m-%d").map_err(|e| {
                StorageError::ConstraintViolation(format!("invalid eval_date '{}': {}", raw, e))
            })
        })
        .transpose()
    }

    /// Appends one snapshot. Fails with a constraint violation if a snapshot
    /// for the same population and date already exists.
    pub async fn append(
        &self,
        population: Population,
        eval_date: NaiveDate,
        rows: &[HistoricalRank],
    ) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO historical_snapshots (population, eval_date, entries) VALUES (?, ?, ?)",
        )
        .bind(population.as_str())
        .bind(eval_date)
        .bind(rows.len() as i64)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            let err = StorageError::from(e);
            if err.is_unique_violation() {
                StorageError::ConstraintViolation(format!(
                    "snapshot for {} on {} already exists",
                    population, eval_date
                ))
            } else {
                err
            }
        })?;

        for chunk in rows.chunks(INSERT_CHUNK) {
            let mut query = QueryBuilder::<Sqlite>::new(
                "INSERT INTO historical_ranks (population, eval_date, rank, competitor_id, rating, error) ",
            );
            query.push_values(chunk, |mut row, rank| {
                row.push_bind(population.as_str())
                    .push_bind(eval_date)
                    .push_bind(rank.rank)
                    .push_bind(rank.competitor_id)
                    .push_bind(rank.rating)
                    .push_bind(rank.error);
            });
            query.build().execute(&mut *tx).await?;
        }

        tx.commit().await?;
        Ok(())
    }

    pub async fn list(
        &self,
        population: Population,
        eval_date: NaiveDate,
    ) -> Result<Vec<HistoricalRank>> {
        let rows = sqlx::query_as::<_, HistoricalRank>(
            r#"
            SELECT eval_date, rank, competitor_id, rating, error
            FROM historical_ranks
            WHERE population = ? AND eval_date = ?
            ORDER BY rank
            "#,
        )
        .bind(population.as_str())
        .bind(eval_date)
        .fetch_all(self.pool)
        .await?;

        Ok(rows)
    }

    /// Snapshot with display attributes, `NotFound` when the date was never evaluated.
    pub async fn entries(
        &self,
        population: Population,
        eval_date: NaiveDate,
    ) -> Result<SnapshotResponse> {
        let exists = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM historical_snapshots WHERE population = ? AND eval_date = ?",
        )
        .bind(population.as_str())
        .bind(eval_date)
        .fetch_one(self.pool)
        .await?;

        if exists == 0 {
            return Err(StorageError::NotFound);
        }

        let query = format!(
            "SELECT {ENTRY_COLUMNS} {ENTRY_FROM} \
             WHERE hr.population = ? AND hr.eval_date = ? ORDER BY hr.rank"
        );
        let entries = sqlx::query_as::<_, SnapshotEntry>(&query)
            .bind(population.as_str())
            .bind(eval_date)
            .fetch_all(self.pool)
            .await?;

        Ok(SnapshotResponse { eval_date, entries })
    }

    /// The top `max_rank` of every snapshot, newest snapshot first.
    pub async fn leaders(&self, population: Population, max_rank: i64) -> Result<Vec<HistoryEntry>> {
        let query = format!(
            "SELECT hr.eval_date, {ENTRY_COLUMNS} {ENTRY_FROM} \
             WHERE hr.population = ? AND hr.rank <= ? ORDER BY hr.eval_date DESC, hr.rank"
        );
        let rows = sqlx::query_as::<_, LeaderRow>(&query)
            .bind(population.as_str())
            .bind(max_rank)
            .fetch_all(self.pool)
            .await?;

        let mut history: Vec<HistoryEntry> = Vec::new();
        for row in rows {
            match history.last_mut() {
                Some(current) if current.eval_date == row.eval_date => {
                    current.leaders.push(row.entry)
                }
                _ => history.push(HistoryEntry {
                    eval_date: row.eval_date,
                    leaders: vec![row.entry],
                }),
            }
        }

        Ok(history)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Database;

    fn sunday(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, day).unwrap()
    }

    fn row(eval_date: NaiveDate, rank: i64, competitor_id: i64, rating: f64) -> HistoricalRank {
        HistoricalRank {
            eval_date,
            rank,
            competitor_id,
            rating,
            error: 50.0,
        }
    }

    #[tokio::test]
    async fn test_empty_snapshot_still_marks_date_evaluated() {
        let db = Database::in_memory().await.unwrap();
        let repo = SnapshotRepository::new(db.pool());

        assert_eq!(repo.last_eval_date(Population::Women).await.unwrap(), None);
        repo.append(Population::Women, sunday(1), &[]).await.unwrap();

        assert_eq!(
            repo.last_eval_date(Population::Women).await.unwrap(),
            Some(sunday(1))
        );
        assert_eq!(repo.last_eval_date(Population::Men).await.unwrap(), None);
        assert!(repo.entries(Population::Women, sunday(1)).await.unwrap().entries.is_empty());
    }

    #[tokio::test]
    async fn test_snapshots_are_never_overwritten() {
        let db = Database::in_memory().await.unwrap();
        let repo = SnapshotRepository::new(db.pool());

        repo.append(Population::Men, sunday(8), &[row(sunday(8), 1, 10, 300.0)])
            .await
            .unwrap();
        let second = repo
            .append(Population::Men, sunday(8), &[row(sunday(8), 1, 11, 999.0)])
            .await;

        assert!(matches!(second, Err(StorageError::ConstraintViolation(_))));
        let stored = repo.list(Population::Men, sunday(8)).await.unwrap();
        assert_eq!(stored, vec![row(sunday(8), 1, 10, 300.0)]);
    }

    #[tokio::test]
    async fn test_leaders_grouped_newest_first() {
        let db = Database::in_memory().await.unwrap();
        let repo = SnapshotRepository::new(db.pool());

        repo.append(
            Population::Men,
            sunday(1),
            &[row(sunday(1), 1, 10, 300.0), row(sunday(1), 2, 11, 200.0)],
        )
        .await
        .unwrap();
        repo.append(
            Population::Men,
            sunday(8),
            &[
                row(sunday(8), 1, 11, 310.0),
                row(sunday(8), 2, 10, 305.0),
                row(sunday(8), 3, 12, 100.0),
            ],
        )
        .await
        .unwrap();

        let history = repo.leaders(Population::Men, 2).await.unwrap();

        assert_eq!(history.len(), 2);
        assert_eq!(history[0].eval_date, sunday(8));
        let ids: Vec<i64> = history[0].leaders.iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![11, 10]);
        assert_eq!(history[1].leaders.len(), 2);
        // No profile stored: display fields fall back to empty strings.
        assert_eq!(history[1].leaders[0].name, "");
    }

    #[tokio::test]
    async fn test_entries_not_found_for_unknown_date() {
        let db = Database::in_memory().await.unwrap();
        let repo = SnapshotRepository::new(db.pool());

        assert!(matches!(
            repo.entries(Population::Men, sunday(15)).await,
            Err(StorageError::NotFound)
        ));
    }
}
