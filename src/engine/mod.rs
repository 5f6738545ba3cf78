//! Fetch pipeline orchestration
//!
//! Composes the three record sequences into the organizations → users →
//! events fan-out, applies deduplication and end-time filtering, tracks the
//! maximum observed event time, and computes the next run's cursor.
//!
//! Ordering: the organization list is fully materialized before any user
//! fetch; record order across organizations and users is not guaranteed
//! (bounded concurrent fan-out); events within one user's sequence keep the
//! API's own page order.

mod types;

pub use types::{CancelToken, DedupSet, RecordSink, SyncReport, SyncStats, VecSink};

use crate::config::ConnectorConfig;
use crate::cursor::plan_next_window;
use crate::error::{Error, Result};
use crate::http::{ApiClient, PageFetcher};
use crate::pagination::RecordSequence;
use crate::timefmt;
use crate::types::JsonValue;
use futures::stream::{self, StreamExt, TryStreamExt};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use tracing::info;

/// Shared state for one pipeline run
struct RunContext<'a> {
    sink: &'a dyn RecordSink,
    cancel: &'a CancelToken,
    dedup: DedupSet,
    last_time: AtomicI64,
    end_time: Option<i64>,
    stats: SyncStats,
}

/// Orchestrates one extraction run
pub struct FetchPipeline {
    fetcher: Arc<dyn PageFetcher>,
    config: ConnectorConfig,
}

impl FetchPipeline {
    /// Build a pipeline and its API client from configuration
    pub fn new(config: ConnectorConfig) -> Result<Self> {
        let client = Arc::new(ApiClient::new(config.clone())?);
        Ok(Self {
            fetcher: client,
            config,
        })
    }

    /// Build a pipeline over an arbitrary page source
    pub fn with_fetcher(fetcher: Arc<dyn PageFetcher>, config: ConnectorConfig) -> Self {
        Self { fetcher, config }
    }

    /// Emit the fixed example record without any network activity, so the
    /// host's schema-guessing step can run cheaply.
    pub fn preview(&self, sink: &dyn RecordSink) -> SyncReport {
        sink.add_record(preview_record());
        SyncReport {
            cursor: None,
            organizations: 0,
            users: 0,
            records: 1,
        }
    }

    /// Run the full fetch: all organizations, their users (deduplicated),
    /// and each user's events, handing every retained event to `sink`.
    ///
    /// Any failure aborts the whole run with no cursor commitment; the
    /// cursor is only computed after the entire fetch completes.
    pub async fn run(&self, sink: &dyn RecordSink, cancel: &CancelToken) -> Result<SyncReport> {
        let config = &self.config;
        let window = config.time_window()?;

        // Downstream fan-out needs the complete set
        let mut organization_seq = RecordSequence::organizations(self.fetcher.clone(), config)?;
        let organizations = organization_seq.collect_all().await?;
        info!("Fetched {} organizations", organizations.len());

        let ctx = RunContext {
            sink,
            cancel,
            dedup: DedupSet::new(),
            last_time: AtomicI64::new(0),
            end_time: window.end_time,
            stats: SyncStats::default(),
        };
        ctx.stats.add_organizations(organizations.len() as u64);

        stream::iter(organizations)
            .map(Ok)
            .try_for_each_concurrent(config.concurrency, |organization| {
                let ctx = &ctx;
                async move { self.sync_organization(ctx, &organization).await }
            })
            .await?;

        let cursor = plan_next_window(
            config.incremental,
            window,
            ctx.last_time.load(Ordering::Acquire),
            timefmt::now_epoch_second(),
        );

        Ok(SyncReport {
            cursor,
            organizations: ctx.stats.organizations(),
            users: ctx.stats.users(),
            records: ctx.stats.records(),
        })
    }

    async fn sync_organization(&self, ctx: &RunContext<'_>, organization: &JsonValue) -> Result<()> {
        if ctx.cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        let organization_url = organization
            .get("url")
            .and_then(JsonValue::as_str)
            .ok_or_else(|| Error::decode("organization record missing 'url'"))?;

        let mut user_seq =
            RecordSequence::organization_users(self.fetcher.clone(), organization_url);
        let mut retained = Vec::new();
        while let Some(user) = user_seq.next_record().await? {
            if ctx.cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }
            let user_id =
                id_text(&user).ok_or_else(|| Error::decode("user record missing 'id'"))?;

            // Atomic check-and-insert: exactly one branch sees an ID as new
            if self.config.dedup && !ctx.dedup.insert(&user_id) {
                continue;
            }
            retained.push(user_id);
        }

        stream::iter(retained)
            .map(Ok)
            .try_for_each_concurrent(self.config.concurrency, |user_id| async move {
                self.sync_user_events(ctx, &user_id).await
            })
            .await
    }

    /// Fetch one user's events sequentially, filter by the configured end
    /// time, and forward the rest.
    async fn sync_user_events(&self, ctx: &RunContext<'_>, user_id: &str) -> Result<()> {
        ctx.stats.add_user();

        let mut event_seq = RecordSequence::user_events(self.fetcher.clone(), &self.config, user_id)?;
        while let Some(event) = event_seq.next_record().await? {
            if ctx.cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }

            let created_at = match event.get("created_at").and_then(JsonValue::as_str) {
                Some(text) => Some(timefmt::iso_to_epoch_second(text)?),
                None => None,
            };

            if let Some(end_time) = ctx.end_time {
                let Some(created_at) = created_at else {
                    return Err(Error::decode("event record missing 'created_at'"));
                };
                // Excluded events do not advance the max-time accumulator
                if created_at > end_time {
                    continue;
                }
            }

            if self.config.incremental {
                let Some(created_at) = created_at else {
                    return Err(Error::decode("event record missing 'created_at'"));
                };
                // The creation time of the latest record decides the next
                // run's start_time when no end_time is configured
                ctx.last_time.fetch_max(created_at, Ordering::AcqRel);
            }

            ctx.stats.add_record();
            ctx.sink.add_record(event);
        }

        Ok(())
    }
}

impl std::fmt::Debug for FetchPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchPipeline")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// The fixed example event emitted in preview mode
pub fn preview_record() -> JsonValue {
    serde_json::json!({
        "id": "5c7f31aef8df240001e60bbf",
        "type": "remove_from_cart",
        "source": "shopify",
        "description": "",
        "authenticated": true,
        "created_at": "2019-03-06T02:34:22Z",
        "received_at": "2019-03-06T02:34:22Z",
        "properties": {
            "model": 221,
            "size": 6
        },
        "user_id": "12312354234"
    })
}

/// Textual form of a record's `id` field (the API serves both string and
/// numeric IDs)
fn id_text(record: &JsonValue) -> Option<String> {
    match record.get("id") {
        Some(JsonValue::String(id)) => Some(id.clone()),
        Some(JsonValue::Number(id)) => Some(id.to_string()),
        _ => None,
    }
}
