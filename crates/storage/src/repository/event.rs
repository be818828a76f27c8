use sqlx::{QueryBuilder, Sqlite, SqlitePool, Transaction};

use super::INSERT_CHUNK;
use crate::error::Result;
use crate::models::Event;

pub struct EventRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> EventRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// All events, newest first.
    pub async fn list(&self) -> Result<Vec<Event>> {
        let events = sqlx::query_as::<_, Event>(
            "SELECT event_id, end_date FROM events ORDER BY event_id DESC",
        )
        .fetch_all(self.pool)
        .await?;

        Ok(events)
    }

    /// Events are immutable; an already stored id keeps its original row.
    pub async fn insert_all(
        &self,
        events: &[Event],
        tx: &mut Transaction<'_, Sqlite>,
    ) -> Result<()> {
        for chunk in events.chunks(INSERT_CHUNK) {
            let mut query = QueryBuilder::<Sqlite>::new("INSERT INTO events (event_id, end_date) ");
            query.push_values(chunk, |mut row, event| {
                row.push_bind(event.event_id).push_bind(event.end_date);
            });
            query.push(" ON CONFLICT (event_id) DO NOTHING");
            query.build().execute(&mut **tx).await?;
        }

        Ok(())
    }
}
