//! HTTP transport, retry classification, and rate limiting
//!
//! One authenticated GET at a time, paced by a process-wide rate limiter
//! derived from the server's own rate header, with transient failures
//! absorbed by a bounded retry loop.

mod client;
mod rate_limit;
mod retry;

pub use client::{ApiClient, PageFetcher};
pub use rate_limit::SharedRateLimiter;
pub use retry::{classify, RetryDecision};

#[cfg(test)]
mod tests;
