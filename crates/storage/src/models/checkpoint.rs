use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Ingestion progress marker, stored as a single row.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Checkpoint {
    /// Newest event whose matches and competitors are committed.
    pub last_event: Option<i64>,
    pub data_time: Option<NaiveDateTime>,
    pub rating_time: Option<NaiveDateTime>,
    pub ranking_time: Option<NaiveDateTime>,
}

impl Checkpoint {
    /// Whether an event listed by the feed is already covered by this checkpoint.
    pub fn covers(&self, event_id: i64) -> bool {
        self.last_event.is_some_and(|last| event_id <= last)
    }
}
