//! Connector configuration
//!
//! Runtime configuration for a sync run: target host, credentials, time
//! window, retry budget, and fan-out bounds. Configuration is accepted as
//! JSON or YAML and validated structurally by [`crate::validate`].

use crate::auth::AuthMethod;
use crate::cursor::TimeWindow;
use crate::error::Result;
use crate::timefmt;
use serde::{Deserialize, Serialize};
use tracing::warn;

fn default_true() -> bool {
    true
}

fn default_retry_limit() -> u32 {
    2
}

fn default_retry_initial_wait_sec() -> u64 {
    4
}

fn default_max_retry_wait_sec() -> u64 {
    60
}

fn default_concurrency() -> usize {
    8
}

/// Configuration for one connector run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectorConfig {
    /// Base URL of the tenant, e.g. `https://acme.zendesk.com`
    pub login_url: String,

    /// Credential scheme and secrets
    pub auth: AuthMethod,

    /// Inclusive lower bound on event creation time (ISO-8601)
    #[serde(default)]
    pub start_time: Option<String>,

    /// Inclusive upper bound on event creation time (ISO-8601)
    #[serde(default)]
    pub end_time: Option<String>,

    /// Track state and emit a cursor for the next run
    #[serde(default = "default_true")]
    pub incremental: bool,

    /// Suppress users already seen via another organization
    #[serde(default = "default_true")]
    pub dedup: bool,

    /// Profile source used in the event feed identifier
    #[serde(default)]
    pub profile_source: Option<String>,

    /// Restrict the event feed to one source
    #[serde(default)]
    pub user_event_source: Option<String>,

    /// Restrict the event feed to one event type
    #[serde(default)]
    pub user_event_type: Option<String>,

    /// Number of retries for one logical request
    #[serde(default = "default_retry_limit")]
    pub retry_limit: u32,

    /// Initial retry backoff, doubled per attempt
    #[serde(default = "default_retry_initial_wait_sec")]
    pub retry_initial_wait_sec: u64,

    /// Cap on the computed backoff
    #[serde(default = "default_max_retry_wait_sec")]
    pub max_retry_wait_sec: u64,

    /// Bound on concurrent organization/user fan-out
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Marketplace attribution: integration name (all three or none)
    #[serde(default)]
    pub marketplace_integration_name: Option<String>,

    /// Marketplace attribution: app id
    #[serde(default)]
    pub marketplace_app_id: Option<String>,

    /// Marketplace attribution: organization id
    #[serde(default)]
    pub marketplace_org_id: Option<String>,
}

impl ConnectorConfig {
    /// Load configuration from a YAML document
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Load configuration from a JSON value
    pub fn from_json(value: serde_json::Value) -> Result<Self> {
        Ok(serde_json::from_value(value)?)
    }

    /// Base URL without a trailing slash
    pub fn base_url(&self) -> &str {
        self.login_url.trim_end_matches('/')
    }

    /// Configured time bounds parsed to epoch seconds.
    ///
    /// An unparsable `start_time` reads as absent, so the run fetches from
    /// the beginning of the feed instead of aborting; `end_time` must
    /// parse.
    pub fn time_window(&self) -> Result<TimeWindow> {
        let start_time = self.start_time.as_deref().and_then(|value| {
            match timefmt::iso_to_epoch_second(value) {
                Ok(epoch) => Some(epoch),
                Err(_) => {
                    warn!("Cannot parse start_time '{value}', fetching from the beginning");
                    None
                }
            }
        });
        let end_time = match &self.end_time {
            Some(value) => Some(timefmt::iso_to_epoch_second(value)?),
            None => None,
        };
        Ok(TimeWindow {
            start_time,
            end_time,
        })
    }

    /// Whether any marketplace attribution field is set
    pub fn has_any_marketplace_field(&self) -> bool {
        self.marketplace_integration_name.is_some()
            || self.marketplace_app_id.is_some()
            || self.marketplace_org_id.is_some()
    }

    /// Whether the full marketplace attribution triple is set
    pub fn has_full_marketplace_triple(&self) -> bool {
        self.marketplace_integration_name.is_some()
            && self.marketplace_app_id.is_some()
            && self.marketplace_org_id.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn minimal_json() -> serde_json::Value {
        serde_json::json!({
            "login_url": "https://acme.zendesk.com/",
            "auth": {"method": "oauth", "access_token": "tok"},
            "profile_source": "shopify"
        })
    }

    #[test]
    fn test_defaults() {
        let config = ConnectorConfig::from_json(minimal_json()).unwrap();
        assert!(config.incremental);
        assert!(config.dedup);
        assert_eq!(config.retry_limit, 2);
        assert_eq!(config.retry_initial_wait_sec, 4);
        assert_eq!(config.max_retry_wait_sec, 60);
        assert_eq!(config.concurrency, 8);
        assert!(config.start_time.is_none());
    }

    #[test]
    fn test_base_url_strips_trailing_slash() {
        let config = ConnectorConfig::from_json(minimal_json()).unwrap();
        assert_eq!(config.base_url(), "https://acme.zendesk.com");
    }

    #[test]
    fn test_from_yaml() {
        let config = ConnectorConfig::from_yaml_str(
            r"
login_url: https://acme.zendesk.com
auth:
  method: token
  username: jane@example.com
  token: abc
profile_source: shopify
dedup: false
",
        )
        .unwrap();
        assert!(!config.dedup);
        assert_eq!(config.auth.name(), "token");
    }

    #[test]
    fn test_time_window_parsing() {
        let mut json = minimal_json();
        json["start_time"] = "2019-03-06T00:00:00Z".into();
        json["end_time"] = "2019-03-07T00:00:00Z".into();
        let config = ConnectorConfig::from_json(json).unwrap();
        let window = config.time_window().unwrap();
        assert_eq!(window.start_time, Some(1_551_830_400));
        assert_eq!(window.end_time, Some(1_551_916_800));
    }

    #[test]
    fn test_time_window_tolerates_bad_start() {
        let mut json = minimal_json();
        json["start_time"] = "yesterday-ish".into();
        let config = ConnectorConfig::from_json(json).unwrap();
        // The feed URL builder supplies the epoch fallback instead
        let window = config.time_window().unwrap();
        assert_eq!(window.start_time, None);
    }

    #[test]
    fn test_time_window_rejects_bad_end() {
        let mut json = minimal_json();
        json["end_time"] = "soon".into();
        let config = ConnectorConfig::from_json(json).unwrap();
        assert!(config.time_window().is_err());
    }

    #[test]
    fn test_marketplace_triple_detection() {
        let mut json = minimal_json();
        let config = ConnectorConfig::from_json(json.clone()).unwrap();
        assert!(!config.has_any_marketplace_field());
        assert!(!config.has_full_marketplace_triple());

        json["marketplace_app_id"] = "42".into();
        let config = ConnectorConfig::from_json(json).unwrap();
        assert!(config.has_any_marketplace_field());
        assert!(!config.has_full_marketplace_triple());
    }
}
