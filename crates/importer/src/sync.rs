//! Incremental ingestion from the results feed.
//!
//! The feed lists events newest first. Everything newer than the checkpoint is
//! fetched (matches page by page, then profiles of competitors not seen
//! before) and only then written, together with the advanced checkpoint, in a
//! single transaction. A failure anywhere before the commit leaves the store
//! exactly as it was.

use std::collections::HashSet;
use std::time::Duration;

use chrono::NaiveDateTime;
use sqlx::SqlitePool;
use tracing::{debug, info, warn};

use storage::models::{Checkpoint, Competitor, Event, Match, Outcome};
use storage::repository::checkpoint::CheckpointRepository;
use storage::repository::competitor::CompetitorRepository;
use storage::repository::event::EventRepository;
use storage::repository::matches::MatchRepository;

use crate::enrichment::enrich;
use crate::feed::{EventListing, MatchRecord, ProfileFormat, ProfileRecord};
use crate::traits::FeedSource;
use crate::{ImporterError, Result};

/// What one ingestion committed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub events: usize,
    pub matches: usize,
    pub competitors: usize,
}

impl SyncReport {
    pub fn has_new_data(&self) -> bool {
        self.events > 0
    }
}

/// Strict prefix of `listings` newer than the checkpoint.
pub fn select_new_events(listings: Vec<EventListing>, checkpoint: &Checkpoint) -> Vec<EventListing> {
    listings
        .into_iter()
        .take_while(|e| !checkpoint.covers(e.event_id))
        .collect()
}

/// Number of pages needed for `match_count` matches.
pub fn page_count(match_count: u32, page_size: u32) -> u32 {
    if match_count == 0 || page_size == 0 {
        0
    } else {
        (match_count - 1) / page_size + 1
    }
}

/// Builds a stored match from a feed record. The score must read `A - X`.
pub fn derive_match(record: &MatchRecord, event: &EventListing) -> Result<Match> {
    let (score_a, score_x) = parse_score(&record.result)?;

    Ok(Match {
        match_id: record.match_id,
        event_id: event.event_id,
        end_date: event.end_date,
        player_a: record.player_a,
        player_b: record.player_b,
        player_x: record.player_x,
        player_y: record.player_y,
        result: record.result.clone(),
        score_a,
        score_x,
        outcome: Outcome::from_scores(score_a, score_x),
        gender_a: None,
        gender_b: None,
        gender_x: None,
        gender_y: None,
    })
}

fn parse_score(result: &str) -> Result<(i64, i64)> {
    let invalid = || ImporterError::DataIntegrityError(format!("unparseable score '{}'", result));

    let (a, x) = result.split_once('-').ok_or_else(invalid)?;
    let a = a.trim().parse::<i64>().map_err(|_| invalid())?;
    let x = x.trim().parse::<i64>().map_err(|_| invalid())?;
    Ok((a, x))
}

/// Competitor from the first profile row returned for an id.
pub fn competitor_from_profile(record: &ProfileRecord, format: ProfileFormat) -> Result<Competitor> {
    let display = format.parse_display_name(&record.name)?;
    let fields = format.parse_profile(&record.profile)?;

    Ok(Competitor {
        competitor_id: record.competitor_id,
        name: display.name,
        gender: record.gender.trim().to_string(),
        birth_year: fields.birth_year,
        association: fields.association,
        association_code: display.association_code,
    })
}

/// Pause after a page request, spread over `[0, max)` by the request's identity.
/// Deterministic: a rerun paces its requests exactly like the run before it.
fn politeness_delay(max: Duration, event_id: i64, offset: u32) -> Duration {
    let max_ms = max.as_millis() as u64;
    if max_ms == 0 {
        return Duration::ZERO;
    }
    let spread = (event_id as u64)
        .wrapping_mul(2_654_435_761)
        .wrapping_add(u64::from(offset));
    Duration::from_millis(spread % max_ms)
}

pub struct IngestionSync<'a, F: FeedSource> {
    pool: &'a SqlitePool,
    feed: &'a F,
    page_size: u32,
    politeness_max_delay: Duration,
}

impl<'a, F: FeedSource> IngestionSync<'a, F> {
    pub fn new(
        pool: &'a SqlitePool,
        feed: &'a F,
        page_size: u32,
        politeness_max_delay: Duration,
    ) -> Self {
        Self {
            pool,
            feed,
            page_size,
            politeness_max_delay,
        }
    }

    /// Ingests everything newer than `checkpoint` and advances it on commit.
    pub async fn run(&self, checkpoint: &mut Checkpoint, now: NaiveDateTime) -> Result<SyncReport> {
        let events = self.sync_new_events(checkpoint).await?;
        if events.is_empty() {
            info!("No new events since {:?}", checkpoint.last_event);
            return Ok(SyncReport::default());
        }
        info!("Found {} new events", events.len());

        let matches = self.fetch_matches(&events).await?;
        info!("Fetched {} matches", matches.len());

        let competitor_repo = CompetitorRepository::new(self.pool);
        let known_ids = competitor_repo.known_ids().await?;
        let pending = MatchRepository::new(self.pool)
            .unresolved_competitor_ids()
            .await?;
        if !pending.is_empty() {
            debug!("Retrying {} unresolved competitors", pending.len());
        }
        let new_competitors = self
            .sync_new_competitors(&known_ids, &matches, &pending)
            .await?;
        info!("Fetched {} new competitor profiles", new_competitors.len());

        let mut competitors = competitor_repo.list().await?;
        competitors.extend(new_competitors.iter().cloned());
        let enriched = enrich(matches, &competitors);

        let mut advanced = checkpoint.clone();
        let newest = events.iter().map(|e| e.event_id).max();
        advanced.last_event = advanced.last_event.max(newest);
        advanced.data_time = Some(now);

        let events: Vec<Event> = events
            .iter()
            .map(|e| Event {
                event_id: e.event_id,
                end_date: e.end_date,
            })
            .collect();
        self.commit(&events, &new_competitors, &enriched, &advanced)
            .await?;
        *checkpoint = advanced;

        Ok(SyncReport {
            events: events.len(),
            matches: enriched.len(),
            competitors: new_competitors.len(),
        })
    }

    pub async fn sync_new_events(&self, checkpoint: &Checkpoint) -> Result<Vec<EventListing>> {
        let listings = self.feed.list_events().await?;
        debug!("Feed lists {} events", listings.len());
        Ok(select_new_events(listings, checkpoint))
    }

    /// Matches of every event, pages requested one at a time.
    pub async fn fetch_matches(&self, events: &[EventListing]) -> Result<Vec<Match>> {
        let mut matches = Vec::new();

        for event in events {
            let pages = page_count(event.match_count, self.page_size);
            for page in 0..pages {
                let offset = page * self.page_size;
                let records = self
                    .feed
                    .fetch_match_page(event.event_id, offset, self.page_size)
                    .await?;
                debug!(
                    "Event {} page {}/{}: {} matches",
                    event.event_id,
                    page + 1,
                    pages,
                    records.len()
                );

                for record in &records {
                    matches.push(derive_match(record, event)?);
                }

                tokio::time::sleep(politeness_delay(
                    self.politeness_max_delay,
                    event.event_id,
                    offset,
                ))
                .await;
            }
        }

        Ok(matches)
    }

    /// Profiles of competitors referenced by `matches` or listed in `pending`
    /// and not yet stored. Ids the feed has no profile for are skipped and
    /// stay unresolved until a later run finds them.
    pub async fn sync_new_competitors(
        &self,
        known_ids: &HashSet<i64>,
        matches: &[Match],
        pending: &[i64],
    ) -> Result<Vec<Competitor>> {
        let mut unseen: Vec<i64> = matches
            .iter()
            .flat_map(Match::competitor_ids)
            .chain(pending.iter().copied())
            .filter(|id| !known_ids.contains(id))
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        unseen.sort_unstable();

        let mut competitors = Vec::with_capacity(unseen.len());
        for competitor_id in unseen {
            let profiles = self.feed.fetch_profiles(competitor_id).await?;
            match profiles.first() {
                Some(record) => {
                    debug!("Fetched profile of {}", competitor_id);
                    competitors.push(competitor_from_profile(record, ProfileFormat::CURRENT)?);
                }
                None => warn!("No profile for competitor {}", competitor_id),
            }
        }

        Ok(competitors)
    }

    async fn commit(
        &self,
        events: &[Event],
        competitors: &[Competitor],
        matches: &[Match],
        checkpoint: &Checkpoint,
    ) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        EventRepository::new(self.pool)
            .insert_all(events, &mut tx)
            .await?;
        CompetitorRepository::new(self.pool)
            .insert_all(competitors, &mut tx)
            .await?;
        MatchRepository::new(self.pool)
            .insert_all(matches, &mut tx)
            .await?;
        CheckpointRepository::new(self.pool)
            .save_in(checkpoint, &mut tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use storage::Database;

    #[derive(Default)]
    struct FakeFeed {
        events: Vec<EventListing>,
        matches: HashMap<i64, Vec<MatchRecord>>,
        profiles: HashMap<i64, ProfileRecord>,
        page_requests: Mutex<Vec<(i64, u32, u32)>>,
        profile_requests: Mutex<Vec<i64>>,
    }

    #[async_trait::async_trait]
    impl FeedSource for FakeFeed {
        async fn list_events(&self) -> Result<Vec<EventListing>> {
            Ok(self.events.clone())
        }

        async fn fetch_match_page(
            &self,
            event_id: i64,
            offset: u32,
            limit: u32,
        ) -> Result<Vec<MatchRecord>> {
            self.page_requests
                .lock()
                .unwrap()
                .push((event_id, offset, limit));
            let all = self.matches.get(&event_id).cloned().unwrap_or_default();
            Ok(all
                .into_iter()
                .skip(offset as usize)
                .take(limit as usize)
                .collect())
        }

        async fn fetch_profiles(&self, competitor_id: i64) -> Result<Vec<ProfileRecord>> {
            self.profile_requests.lock().unwrap().push(competitor_id);
            Ok(self.profiles.get(&competitor_id).cloned().into_iter().collect())
        }
    }

    fn listing(event_id: i64, match_count: u32) -> EventListing {
        EventListing {
            event_id,
            end_date: NaiveDate::from_ymd_opt(2025, 3, 9).unwrap(),
            match_count,
        }
    }

    fn record(match_id: i64, a: i64, x: i64, result: &str) -> MatchRecord {
        MatchRecord {
            match_id,
            event_id: None,
            player_a: Some(a),
            player_b: None,
            player_x: Some(x),
            player_y: None,
            result: result.to_string(),
        }
    }

    fn profile(competitor_id: i64, gender: &str) -> ProfileRecord {
        ProfileRecord {
            competitor_id,
            name: format!("PLAYER {} (GER)", competitor_id),
            gender: gender.to_string(),
            profile: "Profile<br/>Association: Germany<br/>Hand: Right<br/>Born: 1999".to_string(),
        }
    }

    #[test]
    fn test_select_new_events_stops_at_checkpoint() {
        let checkpoint = Checkpoint {
            last_event: Some(103),
            ..Default::default()
        };
        let listings = vec![listing(105, 1), listing(104, 1), listing(103, 1), listing(110, 1)];

        let ids: Vec<i64> = select_new_events(listings, &checkpoint)
            .iter()
            .map(|e| e.event_id)
            .collect();
        assert_eq!(ids, vec![105, 104]);
    }

    #[test]
    fn test_select_new_events_without_checkpoint_takes_all() {
        let listings = vec![listing(2, 1), listing(1, 1)];
        assert_eq!(select_new_events(listings, &Checkpoint::default()).len(), 2);
    }

    #[test]
    fn test_politeness_delay_stays_below_max() {
        let max = Duration::from_millis(1000);
        for (event_id, offset) in [(1, 0), (73_412, 2000), (i64::MAX, u32::MAX)] {
            assert!(politeness_delay(max, event_id, offset) < max);
        }
        assert_eq!(politeness_delay(Duration::ZERO, 5, 0), Duration::ZERO);
    }

    #[test]
    fn test_page_count() {
        assert_eq!(page_count(0, 1000), 0);
        assert_eq!(page_count(1, 1000), 1);
        assert_eq!(page_count(1000, 1000), 1);
        assert_eq!(page_count(1001, 1000), 2);
    }

    #[test]
    fn test_derive_match_outcomes() {
        let event = listing(7, 3);
        let outcomes: Vec<Outcome> = ["11 - 9", "9 - 11", "11 - 11"]
            .iter()
            .map(|r| derive_match(&record(1, 1, 2, r), &event).unwrap().outcome)
            .collect();
        assert_eq!(outcomes, vec![Outcome::Win, Outcome::Loss, Outcome::Draw]);

        let m = derive_match(&record(1, 1, 2, "3 - 0"), &event).unwrap();
        assert_eq!(m.event_id, 7);
        assert_eq!((m.score_a, m.score_x), (3, 0));
        assert_eq!(m.player_b, None);
        assert!(!m.is_doubles());
    }

    #[test]
    fn test_derive_match_rejects_unparseable_score() {
        let err = derive_match(&record(1, 1, 2, "W/O"), &listing(7, 1)).unwrap_err();
        assert!(matches!(err, ImporterError::DataIntegrityError(_)));
    }

    #[tokio::test]
    async fn test_run_pages_and_commits() {
        let db = Database::in_memory().await.unwrap();
        let feed = FakeFeed {
            events: vec![listing(11, 3), listing(10, 0)],
            matches: HashMap::from([(
                11,
                vec![
                    record(1, 1, 2, "3 - 1"),
                    record(2, 2, 3, "0 - 3"),
                    record(3, 1, 3, "2 - 2"),
                ],
            )]),
            profiles: HashMap::from([(1, profile(1, "M")), (2, profile(2, "M")), (3, profile(3, "W"))]),
            ..Default::default()
        };
        let sync = IngestionSync::new(db.pool(), &feed, 2, Duration::ZERO);
        let mut checkpoint = Checkpoint::default();
        let now = NaiveDate::from_ymd_opt(2025, 3, 12)
            .unwrap()
            .and_hms_opt(6, 0, 0)
            .unwrap();

        let report = sync.run(&mut checkpoint, now).await.unwrap();

        assert!(report.has_new_data());
        assert_eq!(
            report,
            SyncReport {
                events: 2,
                matches: 3,
                competitors: 3
            }
        );
        assert_eq!(
            *feed.page_requests.lock().unwrap(),
            vec![(11, 0, 2), (11, 2, 2)]
        );
        assert_eq!(checkpoint.last_event, Some(11));
        assert_eq!(checkpoint.data_time, Some(now));

        let stored = CheckpointRepository::new(db.pool()).load().await.unwrap();
        assert_eq!(stored, checkpoint);

        let matches = MatchRepository::new(db.pool()).list_until(None).await.unwrap();
        assert_eq!(matches.len(), 3);
        assert_eq!(matches[0].gender_a.as_deref(), Some("M"));
        assert_eq!(matches[1].gender_x.as_deref(), Some("W"));
        assert_eq!(EventRepository::new(db.pool()).list().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_only_unseen_competitors_are_fetched() {
        let db = Database::in_memory().await.unwrap();
        let feed = FakeFeed {
            profiles: HashMap::from([(2, profile(2, "W"))]),
            ..Default::default()
        };
        let sync = IngestionSync::new(db.pool(), &feed, 1000, Duration::ZERO);
        let event = listing(1, 2);
        let matches = vec![
            derive_match(&record(1, 1, 2, "1 - 0"), &event).unwrap(),
            derive_match(&record(2, 2, 4, "1 - 0"), &event).unwrap(),
        ];

        let competitors = sync
            .sync_new_competitors(&HashSet::from([1]), &matches, &[4, 5])
            .await
            .unwrap();

        // 4 and 5 have no profile and are skipped.
        assert_eq!(*feed.profile_requests.lock().unwrap(), vec![2, 4, 5]);
        assert_eq!(competitors.len(), 1);
        assert_eq!(competitors[0].name, "PLAYER 2");
        assert_eq!(competitors[0].association_code, "GER");
        assert_eq!(competitors[0].association, "Germany");
        assert_eq!(competitors[0].birth_year, Some(1999));
    }

    #[tokio::test]
    async fn test_nothing_new_writes_nothing() {
        let db = Database::in_memory().await.unwrap();
        let feed = FakeFeed {
            events: vec![listing(5, 10)],
            ..Default::default()
        };
        let sync = IngestionSync::new(db.pool(), &feed, 1000, Duration::ZERO);
        let mut checkpoint = Checkpoint {
            last_event: Some(5),
            ..Default::default()
        };
        let before = checkpoint.clone();

        let report = sync.run(&mut checkpoint, NaiveDateTime::default()).await.unwrap();

        assert!(!report.has_new_data());
        assert_eq!(checkpoint, before);
        assert!(feed.page_requests.lock().unwrap().is_empty());
        assert_eq!(MatchRepository::new(db.pool()).count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_failed_fetch_commits_nothing() {
        let db = Database::in_memory().await.unwrap();
        let feed = FakeFeed {
            events: vec![listing(8, 1)],
            matches: HashMap::from([(8, vec![record(1, 1, 2, "garbage")])]),
            ..Default::default()
        };
        let sync = IngestionSync::new(db.pool(), &feed, 1000, Duration::ZERO);
        let mut checkpoint = Checkpoint::default();

        assert!(sync.run(&mut checkpoint, NaiveDateTime::default()).await.is_err());

        assert_eq!(checkpoint, Checkpoint::default());
        assert!(EventRepository::new(db.pool()).list().await.unwrap().is_empty());
        assert_eq!(
            CheckpointRepository::new(db.pool()).load().await.unwrap(),
            Checkpoint::default()
        );
    }
}
