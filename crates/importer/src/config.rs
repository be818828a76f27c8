use chrono::NaiveDate;
use std::path::PathBuf;
use std::time::Duration;

use storage::models::Population;
use storage::services::ranking::{MEN_UNCERTAINTY_GROWTH, WOMEN_UNCERTAINTY_GROWTH};

pub const DEFAULT_FEED_BASE_URL: &str = "https://results.ittf.link/index.php";
pub const DEFAULT_MATCH_PAGE_SIZE: u32 = 1000;
pub const DEFAULT_EVENT_LIST_LIMIT: u32 = 200;
pub const DEFAULT_MEN_W2: f64 = MEN_UNCERTAINTY_GROWTH;
pub const DEFAULT_WOMEN_W2: f64 = WOMEN_UNCERTAINTY_GROWTH;

/// Where and how to reach the results feed.
#[derive(Debug, Clone)]
pub struct FeedConfig {
    pub base_url: String,
    pub username: String,
    pub password: String,
    /// How many of the newest events one listing request returns.
    pub event_list_limit: u32,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_FEED_BASE_URL.to_string(),
            username: String::new(),
            password: String::new(),
            event_list_limit: DEFAULT_EVENT_LIST_LIMIT,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub match_page_size: u32,
    /// Upper bound of the pause after each match page request.
    pub politeness_max_delay: Duration,
    /// Uncertainty growth per day of inactivity, Elo².
    pub men_w2: f64,
    pub women_w2: f64,
    /// Directory receiving the published leaderboard documents.
    pub output_dir: PathBuf,
    /// First weekly boundary to backfill when no snapshot exists yet.
    pub history_start: Option<NaiveDate>,
}

impl PipelineConfig {
    pub fn uncertainty_growth(&self, population: Population) -> f64 {
        match population {
            Population::Men => self.men_w2,
            Population::Women => self.women_w2,
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            match_page_size: DEFAULT_MATCH_PAGE_SIZE,
            politeness_max_delay: Duration::from_millis(1000),
            men_w2: DEFAULT_MEN_W2,
            women_w2: DEFAULT_WOMEN_W2,
            output_dir: PathBuf::from("."),
            history_start: None,
        }
    }
}
