//! Rate limiting derived from the server's rate header
//!
//! Uses the governor crate for token bucket rate limiting. Unlike a
//! statically configured limiter, the quota here is only known once the
//! first response arrives: the `x-rate-limit` header advertises the allowed
//! requests per 60-second window. The limiter is therefore initialized
//! lazily, exactly once per run, first-writer-wins; every worker shares the
//! same instance so the aggregate request rate stays under the ceiling.

use crate::error::{Error, Result};
use crate::types::RATE_LIMIT_HEADER;
use governor::clock::DefaultClock;
use governor::middleware::NoOpMiddleware;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter as Governor};
use once_cell::sync::OnceCell;
use reqwest::header::HeaderMap;
use std::num::NonZeroU32;
use std::sync::Arc;
use tracing::info;

type DirectLimiter = Governor<NotKeyed, InMemoryState, DefaultClock, NoOpMiddleware>;

struct LimiterState {
    limiter: DirectLimiter,
    permits_per_minute: u32,
}

/// Process-wide request pacer, shared by all concurrent workers.
///
/// Immutable after first initialization; the rate is never re-derived
/// within a run.
#[derive(Clone, Default)]
pub struct SharedRateLimiter {
    cell: Arc<OnceCell<LimiterState>>,
}

impl SharedRateLimiter {
    /// Create an uninitialized limiter
    pub fn new() -> Self {
        Self::default()
    }

    /// Derive the quota from the first response's headers. Later calls are
    /// no-ops; only the first writer constructs the limiter.
    ///
    /// The API contract is assumed stable: a missing or unparsable
    /// `x-rate-limit` header is a fatal environment error.
    pub fn initialize_from(&self, headers: &HeaderMap) -> Result<()> {
        self.cell.get_or_try_init(|| {
            let raw = headers
                .get(RATE_LIMIT_HEADER)
                .and_then(|value| value.to_str().ok())
                .ok_or_else(|| Error::RateLimitHeader {
                    message: format!("response carries no '{RATE_LIMIT_HEADER}' header"),
                })?;

            let permits_per_minute: u32 =
                raw.trim().parse().map_err(|_| Error::RateLimitHeader {
                    message: format!("'{RATE_LIMIT_HEADER}' value '{raw}' is not an integer"),
                })?;

            let permits = NonZeroU32::new(permits_per_minute).ok_or_else(|| {
                Error::RateLimitHeader {
                    message: format!("'{RATE_LIMIT_HEADER}' value must be positive"),
                }
            })?;

            info!(
                "Permits per second {}",
                f64::from(permits_per_minute) / 60.0
            );

            Ok::<LimiterState, Error>(LimiterState {
                limiter: Governor::direct(Quota::per_minute(permits)),
                permits_per_minute,
            })
        })?;

        Ok(())
    }

    /// Wait until a permit is available, consuming it. A no-op before the
    /// limiter has been initialized (the first request is never throttled).
    pub async fn acquire(&self) {
        if let Some(state) = self.cell.get() {
            state.limiter.until_ready().await;
        }
    }

    /// Whether the quota has been derived yet
    pub fn is_initialized(&self) -> bool {
        self.cell.get().is_some()
    }

    /// Derived request rate in permits per second, if initialized
    pub fn permits_per_second(&self) -> Option<f64> {
        self.cell
            .get()
            .map(|state| f64::from(state.permits_per_minute) / 60.0)
    }
}

impl std::fmt::Debug for SharedRateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedRateLimiter")
            .field("permits_per_minute", &self.cell.get().map(|s| s.permits_per_minute))
            .finish()
    }
}
