//! Common types used throughout the connector
//!
//! Shared type aliases, the fetchable resource targets, and API constants
//! used across multiple modules.

use serde::{Deserialize, Serialize};

// ============================================================================
// Type Aliases
// ============================================================================

/// JSON value type (re-exported from serde_json)
pub type JsonValue = serde_json::Value;

/// JSON object type
pub type JsonObject = serde_json::Map<String, JsonValue>;

// ============================================================================
// Targets
// ============================================================================

/// One fetchable resource type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Target {
    /// Organization list
    Organizations,
    /// Users belonging to an organization
    Users,
    /// Timestamped events of a single user
    UserEvents,
}

impl Target {
    /// Key under which the resource's records live in a response body
    pub fn json_name(self) -> &'static str {
        match self {
            Target::Organizations => "organizations",
            Target::Users => "users",
            Target::UserEvents => "events",
        }
    }
}

// ============================================================================
// API Constants
// ============================================================================

/// Base path of the core REST API
pub const API_PATH: &str = "/api/v2";

/// Path of the per-user event feed
pub const USER_EVENT_PATH: &str = "/api/sunshine/events";

/// Records per page requested for offset-paged resources
pub const PER_PAGE: u32 = 100;

/// Marker prefix in a 422 error description that signals "no records from
/// this start_time" rather than a real failure.
pub const TOO_RECENT_START_TIME: &str = "Too recent start_time";

// ============================================================================
// Header Names
// ============================================================================

/// Response header carrying the allowed requests per 60-second window
pub const RATE_LIMIT_HEADER: &str = "x-rate-limit";

/// Marketplace attribution headers, sent only when all three are configured
pub const MARKETPLACE_NAME_HEADER: &str = "X-Zendesk-Marketplace-Name";
pub const MARKETPLACE_APP_ID_HEADER: &str = "X-Zendesk-Marketplace-App-Id";
pub const MARKETPLACE_ORG_ID_HEADER: &str = "X-Zendesk-Marketplace-Organization-Id";
