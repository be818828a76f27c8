use chrono::NaiveDate;
use sqlx::{FromRow, QueryBuilder, Sqlite, SqlitePool, Transaction};

use super::INSERT_CHUNK;
use crate::error::{Result, StorageError};
use crate::models::{Match, Outcome};

#[derive(FromRow)]
struct MatchRow {
    match_id: i64,
    event_id: i64,
    end_date: NaiveDate,
    player_a: Option<i64>,
    player_b: Option<i64>,
    player_x: Option<i64>,
    player_y: Option<i64>,
    result: String,
    score_a: i64,
    score_x: i64,
    outcome: String,
    gender_a: Option<String>,
    gender_b: Option<String>,
    gender_x: Option<String>,
    gender_y: Option<String>,
}

impl TryFrom<MatchRow> for Match {
    type Error = StorageError;

    fn try_from(row: MatchRow) -> Result<Self> {
        let outcome = Outcome::from_code(&row.outcome).ok_or_else(|| {
            StorageError::ConstraintViolation(format!(
                "match {} has unknown outcome '{}'",
                row.match_id, row.outcome
            ))
        })?;

        Ok(Match {
            match_id: row.match_id,
            event_id: row.event_id,
            end_date: row.end_date,
            player_a: row.player_a,
            player_b: row.player_b,
            player_x: row.player_x,
            player_y: row.player_y,
            result: row.result,
            score_a: row.score_a,
            score_x: row.score_x,
            outcome,
            gender_a: row.gender_a,
            gender_b: row.gender_b,
            gender_x: row.gender_x,
            gender_y: row.gender_y,
        })
    }
}

pub struct MatchRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> MatchRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Stored matches ending on or before `cutoff` (all of them when `None`),
    /// in chronological order.
    ///
    /// Slot genders come from the competitor table when the competitor is
    /// known by now, so matches stored while a profile was missing pick up
    /// the gender once it resolves.
    pub async fn list_until(&self, cutoff: Option<NaiveDate>) -> Result<Vec<Match>> {
        let mut query = QueryBuilder::<Sqlite>::new(
            r#"
            SELECT m.match_id, m.event_id, m.end_date, m.player_a, m.player_b, m.player_x,
                   m.player_y, m.result, m.score_a, m.score_x, m.outcome,
                   COALESCE(ca.gender, m.gender_a) AS gender_a,
                   COALESCE(cb.gender, m.gender_b) AS gender_b,
                   COALESCE(cx.gender, m.gender_x) AS gender_x,
                   COALESCE(cy.gender, m.gender_y) AS gender_y
            FROM matches m
            LEFT JOIN competitors ca ON ca.competitor_id = m.player_a
            LEFT JOIN competitors cb ON cb.competitor_id = m.player_b
            LEFT JOIN competitors cx ON cx.competitor_id = m.player_x
            LEFT JOIN competitors cy ON cy.competitor_id = m.player_y
            WHERE 1=1
            "#,
        );

        if let Some(cutoff) = cutoff {
            query.push(" AND m.end_date <= ");
            query.push_bind(cutoff);
        }
        query.push(" ORDER BY m.end_date, m.match_id");

        let rows: Vec<MatchRow> = query.build_query_as().fetch_all(self.pool).await?;

        rows.into_iter().map(Match::try_from).collect()
    }

    /// Competitor ids referenced by stored matches that have no profile yet.
    pub async fn unresolved_competitor_ids(&self) -> Result<Vec<i64>> {
        let ids = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT id FROM (
                SELECT player_a AS id FROM matches
                UNION SELECT player_b FROM matches
                UNION SELECT player_x FROM matches
                UNION SELECT player_y FROM matches
            )
            WHERE id IS NOT NULL
              AND id NOT IN (SELECT competitor_id FROM competitors)
            ORDER BY id
            "#,
        )
        .fetch_all(self.pool)
        .await?;

        Ok(ids)
    }

    pub async fn count(&self) -> Result<i64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM matches")
            .fetch_one(self.pool)
            .await?;
        Ok(count)
    }

    /// Matches are immutable once stored; a repeated id is ignored.
    pub async fn insert_all(
        &self,
        matches: &[Match],
        tx: &mut Transaction<'_, Sqlite>,
    ) -> Result<()> {
        for chunk in matches.chunks(INSERT_CHUNK) {
            let mut query = QueryBuilder::<Sqlite>::new(
                r#"
                INSERT INTO matches (match_id, event_id, end_date, player_a, player_b, player_x,
                    player_y, result, score_a, score_x, outcome, gender_a, gender_b, gender_x, gender_y)
                "#,
            );
            query.push_values(chunk, |mut row, m| {
                row.push_bind(m.match_id)
                    .push_bind(m.event_id)
                    .push_bind(m.end_date)
                    .push_bind(m.player_a)
                    .push_bind(m.player_b)
                    .push_bind(m.player_x)
                    .push_bind(m.player_y)
                    .push_bind(m.result.clone())
                    .push_bind(m.score_a)
                    .push_bind(m.score_x)
                    .push_bind(m.outcome.as_code())
                    .push_bind(m.gender_a.clone())
                    .push_bind(m.gender_b.clone())
                    .push_bind(m.gender_x.clone())
                    .push_bind(m.gender_y.clone());
            });
            query.push(" ON CONFLICT (match_id) DO NOTHING");
            query.build().execute(&mut **tx).await?;
        }

        Ok(())
    }
}
