//! Pull-based record sequences over paged resources

use super::types::{decode_page, PageRule, ResourcePage};
use crate::config::ConnectorConfig;
use crate::error::{Error, Result};
use crate::http::PageFetcher;
use crate::timefmt;
use crate::types::{JsonValue, Target, API_PATH, PER_PAGE, USER_EVENT_PATH};
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::debug;
use url::Url;

/// A lazy sequence of records for one resource endpoint.
///
/// Each pull past the current page's buffered records fetches the next page
/// through the [`PageFetcher`] seam. An empty decoded page, a short page
/// (offset rule), or the benign-empty sentinel terminates the sequence.
/// Not restartable: each instantiation starts at its configured first URL.
pub struct RecordSequence {
    fetcher: Arc<dyn PageFetcher>,
    resource_key: &'static str,
    rule: PageRule,
    next_url: Option<String>,
    buffer: VecDeque<JsonValue>,
    pages_fetched: u32,
}

impl RecordSequence {
    /// Create a sequence starting at `first_url`
    pub fn new(
        fetcher: Arc<dyn PageFetcher>,
        target: Target,
        rule: PageRule,
        first_url: String,
    ) -> Self {
        Self {
            fetcher,
            resource_key: target.json_name(),
            rule,
            next_url: Some(first_url),
            buffer: VecDeque::new(),
            pages_fetched: 0,
        }
    }

    /// The organization list: offset-paged from the tenant base URL
    pub fn organizations(fetcher: Arc<dyn PageFetcher>, config: &ConnectorConfig) -> Result<Self> {
        let mut url = Url::parse(&format!(
            "{}{}/{}",
            config.base_url(),
            API_PATH,
            Target::Organizations.json_name()
        ))?;
        url.query_pairs_mut()
            .append_pair("per_page", &PER_PAGE.to_string())
            .append_pair("page", "1");

        Ok(Self::new(
            fetcher,
            Target::Organizations,
            PageRule::Offset { per_page: PER_PAGE },
            url.into(),
        ))
    }

    /// One organization's users: offset-paged, derived from the
    /// organization's own `url` field
    pub fn organization_users(fetcher: Arc<dyn PageFetcher>, organization_url: &str) -> Self {
        let first_url = format!(
            "{}/users.json?per_page={PER_PAGE}&page=1",
            organization_url.trim_end_matches(".json")
        );
        Self::new(
            fetcher,
            Target::Users,
            PageRule::Offset { per_page: PER_PAGE },
            first_url,
        )
    }

    /// One user's event feed: follows the embedded next-page URL, bounded by
    /// the configured time window
    pub fn user_events(
        fetcher: Arc<dyn PageFetcher>,
        config: &ConnectorConfig,
        user_id: &str,
    ) -> Result<Self> {
        let profile_source = config
            .profile_source
            .as_deref()
            .ok_or_else(|| Error::missing_field("profile_source"))?;

        let mut url = Url::parse(&format!("{}{}", config.base_url(), USER_EVENT_PATH))?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("identifier", &format!("{profile_source}:user_id:{user_id}"));

            if let Some(source) = &config.user_event_source {
                query.append_pair("source", source);
            }
            if let Some(event_type) = &config.user_event_type {
                query.append_pair("type", event_type);
            }
            if let Some(start_time) = &config.start_time {
                // An unparsable start falls back to the epoch instant
                let instant = timefmt::to_iso_instant(start_time)
                    .unwrap_or_else(|_| timefmt::epoch_second_to_iso(0));
                query.append_pair("start_time", &instant);
            }
            if let Some(end_time) = &config.end_time {
                query.append_pair("end_time", &timefmt::to_iso_instant(end_time)?);
            }
        }

        Ok(Self::new(
            fetcher,
            Target::UserEvents,
            PageRule::NextUrl { key: "next_page" },
            url.into(),
        ))
    }

    /// Pull the next record, fetching further pages on demand.
    /// Returns `Ok(None)` once the resource is exhausted.
    pub async fn next_record(&mut self) -> Result<Option<JsonValue>> {
        loop {
            if let Some(record) = self.buffer.pop_front() {
                return Ok(Some(record));
            }

            let Some(url) = self.next_url.take() else {
                return Ok(None);
            };

            let Some(body) = self.fetcher.fetch_page(&url).await? else {
                // Benign-empty: no more records, not a failure
                return Ok(None);
            };

            let page = decode_page(&body, self.resource_key, &self.rule)?;
            self.pages_fetched += 1;
            debug!(
                "page {} of '{}': {} records",
                self.pages_fetched,
                self.resource_key,
                page.records.len()
            );

            if page.records.is_empty() {
                return Ok(None);
            }

            self.next_url = self.advance(&url, &page)?;
            self.buffer.extend(page.records);
        }
    }

    /// Drain the remaining records into a Vec
    pub async fn collect_all(&mut self) -> Result<Vec<JsonValue>> {
        let mut records = Vec::new();
        while let Some(record) = self.next_record().await? {
            records.push(record);
        }
        Ok(records)
    }

    /// Pages fetched so far
    pub fn pages_fetched(&self) -> u32 {
        self.pages_fetched
    }

    fn advance(&self, current_url: &str, page: &ResourcePage) -> Result<Option<String>> {
        match &self.rule {
            PageRule::Offset { per_page } => {
                if page.records.len() < *per_page as usize {
                    Ok(None)
                } else {
                    Ok(Some(bump_page_param(current_url)?))
                }
            }
            PageRule::NextUrl { .. } => Ok(page.next_url.clone()),
        }
    }
}

impl std::fmt::Debug for RecordSequence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordSequence")
            .field("resource_key", &self.resource_key)
            .field("rule", &self.rule)
            .field("next_url", &self.next_url)
            .field("buffered", &self.buffer.len())
            .finish_non_exhaustive()
    }
}

/// Rewrite the URL with its `page` query parameter incremented (pages are
/// 1-based; a URL without the parameter reads as page 1).
fn bump_page_param(url: &str) -> Result<String> {
    let parsed = Url::parse(url)?;
    let current_page: u32 = parsed
        .query_pairs()
        .find(|(key, _)| key == "page")
        .and_then(|(_, value)| value.parse().ok())
        .unwrap_or(1);

    let mut next = parsed.clone();
    next.query_pairs_mut().clear();
    for (key, value) in parsed.query_pairs() {
        if key != "page" {
            next.query_pairs_mut().append_pair(&key, &value);
        }
    }
    next.query_pairs_mut()
        .append_pair("page", &(current_page + 1).to_string());

    Ok(next.into())
}
