//! Retry classification for API failures
//!
//! A pure decision function: given a status code, the extracted error body,
//! and any server-advised delay, decide whether the request should be
//! retried, aborted, or treated as a normal empty result.

use crate::types::TOO_RECENT_START_TIME;
use serde_json::Value;
use tracing::warn;

/// Outcome of classifying one API failure
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryDecision {
    /// Transient: retry the request
    Retry,
    /// Permanent: abort the run with this operator-facing message
    Fatal(String),
    /// Looks like an error but means "no more data"; treat as end of stream
    BenignEmpty,
}

/// Classify an API failure into retry / fatal / benign-empty.
///
/// `status` is the HTTP status code, or `-1` when no response was received
/// at all. `message` is the `{error, description}` summary extracted from
/// the error body. `retry_after` is the server-advised delay in seconds,
/// present only for 429/500/503.
pub fn classify(status: i32, message: &str, retry_after: Option<u64>) -> RetryDecision {
    // No response at all: always worth another attempt
    if status == -1 {
        return RetryDecision::Retry;
    }

    // The API answers 404 for legitimately empty sub-resources
    if status == 404 {
        return RetryDecision::Retry;
    }

    if status == 409 {
        warn!("'{status}' temporally failure.");
        return RetryDecision::Retry;
    }

    if status == 422 {
        let Ok(body) = serde_json::from_str::<Value>(message) else {
            return RetryDecision::Fatal(format!(
                "Status: '{status}', error message '{message}'"
            ));
        };
        if let Some(description) = body.get("description").and_then(Value::as_str) {
            if description.starts_with(TOO_RECENT_START_TIME) {
                // No records from this start_time; same as an empty 200
                return RetryDecision::BenignEmpty;
            }
        }
        return RetryDecision::Fatal(format!("Status: '{status}', error message '{body}'"));
    }

    if status == 429 || status == 500 || status == 503 {
        if let Some(seconds) = retry_after {
            warn!("Reached API limitation, wait for '{seconds}' seconds");
        } else if status != 429 {
            warn!("'{status}' temporally failure.");
        }
        return RetryDecision::Retry;
    }

    // Remaining 4xx are caller misconfiguration, e.g. 401/403
    if status / 100 == 4 {
        return RetryDecision::Fatal(format!("Status '{status}', message '{message}'"));
    }

    warn!("Server returns unknown status code '{status}' message '{message}'");
    RetryDecision::Retry
}
