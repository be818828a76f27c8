use sqlx::{Sqlite, SqlitePool, Transaction};

use crate::error::Result;
use crate::models::Checkpoint;

pub struct CheckpointRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> CheckpointRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Current checkpoint, or an empty one before the first run.
    pub async fn load(&self) -> Result<Checkpoint> {
        let checkpoint = sqlx::query_as::<_, Checkpoint>(
            r#"
            SELECT last_event, data_time, rating_time, ranking_time
            FROM checkpoint
            WHERE id = 1
            "#,
        )
        .fetch_optional(self.pool)
        .await?;

        Ok(checkpoint.unwrap_or_default())
    }

    /// Writes the whole record in a single statement.
    pub async fn save(&self, checkpoint: &Checkpoint) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        self.save_in(checkpoint, &mut tx).await?;
        tx.commit().await?;
        Ok(())
    }

    pub async fn save_in(
        &self,
        checkpoint: &Checkpoint,
        tx: &mut Transaction<'_, Sqlite>,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO checkpoint (id, last_event, data_time, rating_time, ranking_time)
            VALUES (1, ?, ?, ?, ?)
            ON CONFLICT (id)
            DO UPDATE SET
                last_event = EXCLUDED.last_event,
                data_time = EXCLUDED.data_time,
                rating_time = EXCLUDED.rating_time,
                ranking_time = EXCLUDED.ranking_time
            "#,
        )
        .bind(checkpoint.last_event)
        .bind(checkpoint.data_time)
        .bind(checkpoint.rating_time)
        .bind(checkpoint.ranking_time)
        .execute(&mut **tx)
        .await?;

        Ok(())
    }
}
