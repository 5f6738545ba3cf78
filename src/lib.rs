// Allow common clippy pedantic lints that aren't critical for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_lossless)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::unused_self)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::match_same_arms)]

//! # User Events Connector
//!
//! Extracts user event records from a rate-limited tenant API: every
//! organization, every user belonging to those organizations, and each
//! user's event feed, with retrying, request pacing, deduplication, and an
//! incremental cursor for the next run.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use userevents_connector::{
//!     validate_config, CancelToken, ConnectorConfig, FetchPipeline, VecSink,
//! };
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ConnectorConfig::from_yaml_str(&std::fs::read_to_string("config.yaml")?)?;
//!     validate_config(&config)?;
//!
//!     let pipeline = FetchPipeline::new(config)?;
//!     let sink = VecSink::new();
//!     let report = pipeline.run(&sink, &CancelToken::new()).await?;
//!
//!     println!("{} records, next cursor {:?}", report.records, report.cursor);
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       FetchPipeline                         │
//! │  organizations → users (dedup) → events → sink + cursor     │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//! ┌──────────────┬─────────────┴──────────────┬────────────────┐
//! │  Pagination  │            HTTP            │     Cursor     │
//! ├──────────────┼────────────────────────────┼────────────────┤
//! │ Offset pages │ Retry + backoff            │ Max event time │
//! │ Next-URL     │ Rate pacing from response  │ Window shift   │
//! │ Benign empty │ Error classification       │                │
//! └──────────────┴────────────────────────────┴────────────────┘
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]
#![allow(missing_docs)]

// ============================================================================
// Module declarations
// ============================================================================

/// Error types for the connector
pub mod error;

/// Common types and constants
pub mod types;

/// ISO-8601 / epoch-second conversions
pub mod timefmt;

/// Runtime configuration
pub mod config;

/// Credential schemes and request headers
pub mod auth;

/// HTTP client with retry and rate pacing
pub mod http;

/// Paged record sequences
pub mod pagination;

/// Fetch pipeline
pub mod engine;

/// Incremental cursor planning
pub mod cursor;

/// Configuration and credential validation
pub mod validate;

// ============================================================================
// Re-exports
// ============================================================================

pub use error::{Error, Result};

pub use auth::AuthMethod;
pub use config::ConnectorConfig;
pub use cursor::{CursorResult, TimeWindow};
pub use engine::{CancelToken, FetchPipeline, RecordSink, SyncReport, VecSink};
pub use http::ApiClient;
pub use validate::{check_credentials, validate_config};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
