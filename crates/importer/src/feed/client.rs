use std::time::Duration;

use tracing::{debug, info};

use super::models::{EventListing, EventRow, MatchRecord, ProfileRecord, first_group};
use crate::config::FeedConfig;
use crate::error::Result;
use crate::traits::FeedSource;
use crate::ImporterError;

const EVENTS_LIST_ID: u32 = 27;
const MATCHES_LIST_ID: u32 = 68;
const MATCHES_ITEM_ID: u32 = 441;
const PROFILES_LIST_ID: u32 = 60;
const PROFILES_ITEM_ID: u32 = 391;

/// Client for the Fabrik-based results site.
///
/// Holds a cookie-backed session; call [`ResultsFeedClient::login`] once before
/// issuing listing requests.
pub struct ResultsFeedClient {
    base_url: String,
    event_list_limit: u32,
    client: reqwest::Client,
}

impl ResultsFeedClient {
    pub fn new(config: &FeedConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent("Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7)")
            .cookie_store(true)
            .timeout(Duration::from_secs(60))
            .build()?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            event_list_limit: config.event_list_limit,
            client,
        })
    }

    /// Joomla login: the form carries a one-off CSRF token as a hidden input
    /// whose *name* is the token.
    pub async fn login(&self, username: &str, password: &str) -> Result<()> {
        let page = self
            .client
            .get(&self.base_url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        let (token_name, token_value) = find_login_token(&page).ok_or_else(|| {
            ImporterError::FeedFormatError("login form token not found".to_string())
        })?;

        let form = [
            ("username", username),
            ("password", password),
            ("option", "com_users"),
            ("task", "user.login"),
            (token_name.as_str(), token_value.as_str()),
        ];

        self.client
            .post(&self.base_url)
            .form(&form)
            .send()
            .await?
            .error_for_status()?;

        info!("Feed session established");
        Ok(())
    }

    async fn get_rows<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<Vec<T>> {
        debug!("GET {}", url);
        let groups = self
            .client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .json::<Vec<Vec<T>>>()
            .await?;

        first_group(groups)
    }
}

#[async_trait::async_trait]
impl FeedSource for ResultsFeedClient {
    async fn list_events(&self) -> Result<Vec<EventListing>> {
        let url = format!(
            "{base}/events/list/{list}?resetfilters=0&clearordering=0&clearfilters=0&limit{list}={limit}&format=json",
            base = self.base_url,
            list = EVENTS_LIST_ID,
            limit = self.event_list_limit,
        );

        self.get_rows::<EventRow>(&url)
            .await?
            .into_iter()
            .map(EventListing::try_from)
            .collect()
    }

    async fn fetch_match_page(
        &self,
        event_id: i64,
        offset: u32,
        limit: u32,
    ) -> Result<Vec<MatchRecord>> {
        let url = format!(
            "{base}?listid={list}&Itemid={item}&resetfilters=1&abc={event_id}&limit{list}={limit}\
             &limitstart{list}={offset}&vw_matches___tournament_id_raw[value][]={event_id}&format=json",
            base = self.base_url,
            list = MATCHES_LIST_ID,
            item = MATCHES_ITEM_ID,
        );

        self.get_rows(&url).await
    }

    async fn fetch_profiles(&self, competitor_id: i64) -> Result<Vec<ProfileRecord>> {
        let url = format!(
            "{base}?option=com_fabrik&view=list&listid={list}&Itemid={item}&resetfilters=1\
             &vw_profiles___player_id_raw[value][]={competitor_id}&format=json",
            base = self.base_url,
            list = PROFILES_LIST_ID,
            item = PROFILES_ITEM_ID,
        );

        self.get_rows(&url).await
    }
}

/// Finds the hidden `<input>` whose name is a 32-character hex token.
pub fn find_login_token(html: &str) -> Option<(String, String)> {
    let mut rest = html;
    while let Some(start) = rest.find("<input") {
        let tag_body = &rest[start..];
        let end = tag_body.find('>').unwrap_or(tag_body.len());
        let tag = &tag_body[..end];
        rest = &tag_body[end..];

        if attribute(tag, "type").as_deref() != Some("hidden") {
            continue;
        }
        let Some(name) = attribute(tag, "name") else {
            continue;
        };
        if name.len() == 32 && name.chars().all(|c| matches!(c, '0'..='9' | 'a'..='f')) {
            let value = attribute(tag, "value").unwrap_or_default();
            return Some((name, value));
        }
    }
    None
}

fn attribute(tag: &str, name: &str) -> Option<String> {
    let needle = format!("{}=", name);
    let mut search = tag;
    loop {
        let pos = search.find(&needle)?;
        let preceded_by_space = search[..pos]
            .chars()
            .next_back()
            .is_some_and(char::is_whitespace);
        let after = &search[pos + needle.len()..];
        if !preceded_by_space {
            search = after;
            continue;
        }

        let quote = after.chars().next()?;
        if quote == '"' || quote == '\'' {
            let value = &after[1..];
            let close = value.find(quote)?;
            return Some(value[..close].to_string());
        }
        let close = after
            .find(|c: char| c.is_whitespace() || c == '/' || c == '>')
            .unwrap_or(after.len());
        return Some(after[..close].to_string());
    }
}
