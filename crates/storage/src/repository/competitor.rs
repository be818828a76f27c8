use std::collections::HashSet;

use sqlx::{QueryBuilder, Sqlite, SqlitePool, Transaction};

use super::INSERT_CHUNK;
use crate::dto::competitor::{CompetitorProfile, Translations};
use crate::error::{Result, StorageError};
use crate::models::Competitor;

const PROFILE_SELECT: &str = r#"
    SELECT c.competitor_id, c.name, ln.name AS name_localized, c.gender, c.birth_year,
           c.association, c.association_code, al.name AS association_localized
    FROM competitors c
    LEFT JOIN competitor_localized_names ln ON ln.competitor_id = c.competitor_id
    LEFT JOIN association_localized_names al ON al.association = c.association
"#;

pub struct CompetitorRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> CompetitorRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn known_ids(&self) -> Result<HashSet<i64>> {
        let ids = sqlx::query_scalar::<_, i64>("SELECT competitor_id FROM competitors")
            .fetch_all(self.pool)
            .await?;

        Ok(ids.into_iter().collect())
    }

    pub async fn list(&self) -> Result<Vec<Competitor>> {
        let competitors = sqlx::query_as::<_, Competitor>(
            r#"
            SELECT competitor_id, name, gender, birth_year, association, association_code
            FROM competitors
            ORDER BY competitor_id
            "#,
        )
        .fetch_all(self.pool)
        .await?;

        Ok(competitors)
    }

    /// Competitors with localized display fields joined in.
    pub async fn list_profiles(&self) -> Result<Vec<CompetitorProfile>> {
        let query = format!("{PROFILE_SELECT} ORDER BY c.competitor_id");
        let profiles = sqlx::query_as::<_, CompetitorProfile>(&query)
            .fetch_all(self.pool)
            .await?;

        Ok(profiles)
    }

    pub async fn find_profile(&self, competitor_id: i64) -> Result<CompetitorProfile> {
        let query = format!("{PROFILE_SELECT} WHERE c.competitor_id = ?");
        let profile = sqlx::query_as::<_, CompetitorProfile>(&query)
            .bind(competitor_id)
            .fetch_optional(self.pool)
            .await?
            .ok_or(StorageError::NotFound)?;

        Ok(profile)
    }

    /// First profile wins: competitors already stored are left untouched.
    pub async fn insert_all(
        &self,
        competitors: &[Competitor],
        tx: &mut Transaction<'_, Sqlite>,
    ) -> Result<()> {
        for chunk in competitors.chunks(INSERT_CHUNK) {
            let mut query = QueryBuilder::<Sqlite>::new(
                r#"
                INSERT INTO competitors (competitor_id, name, gender, birth_year, association,
                    association_code)
                "#,
            );
            query.push_values(chunk, |mut row, c| {
                row.push_bind(c.competitor_id)
                    .push_bind(c.name.clone())
                    .push_bind(c.gender.clone())
                    .push_bind(c.birth_year)
                    .push_bind(c.association.clone())
                    .push_bind(c.association_code.clone());
            });
            query.push(" ON CONFLICT (competitor_id) DO NOTHING");
            query.build().execute(&mut **tx).await?;
        }

        Ok(())
    }

    /// Upserts localized names. Returns the number of rows written.
    pub async fn upsert_translations(&self, translations: &Translations) -> Result<u64> {
        let mut tx = self.pool.begin().await?;
        let mut written = 0u64;

        for (competitor_id, name) in &translations.competitors {
            written += sqlx::query(
                r#"
                INSERT INTO competitor_localized_names (competitor_id, name)
                VALUES (?, ?)
                ON CONFLICT (competitor_id) DO UPDATE SET name = EXCLUDED.name
                "#,
            )
            .bind(competitor_id)
            .bind(name)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        }

        for (association, name) in &translations.associations {
            written += sqlx::query(
                r#"
                INSERT INTO association_localized_names (association, name)
                VALUES (?, ?)
                ON CONFLICT (association) DO UPDATE SET name = EXCLUDED.name
                "#,
            )
            .bind(association)
            .bind(name)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        }

        tx.commit().await?;
        Ok(written)
    }
}
