use crate::Result;
use crate::feed::{EventListing, MatchRecord, ProfileRecord};

/// Read side of the results feed.
///
/// Requests are issued one at a time; implementations need not support
/// concurrent calls.
#[async_trait::async_trait]
pub trait FeedSource: Send + Sync {
    /// Newest events first.
    async fn list_events(&self) -> Result<Vec<EventListing>>;

    async fn fetch_match_page(
        &self,
        event_id: i64,
        offset: u32,
        limit: u32,
    ) -> Result<Vec<MatchRecord>>;

    /// Profile rows for one competitor. Empty when the feed has no profile.
    async fn fetch_profiles(&self, competitor_id: i64) -> Result<Vec<ProfileRecord>>;
}
