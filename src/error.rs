//! Error types for the connector
//!
//! This module defines the error hierarchy for the entire crate.
//! All public APIs return `Result<T, Error>` where Error is defined here.

use thiserror::Error;

/// The main error type for the connector
#[derive(Error, Debug)]
pub enum Error {
    // ============================================================================
    // Configuration Errors
    // ============================================================================
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Missing required config field: {field}")]
    MissingConfigField { field: String },

    #[error("Invalid config value for '{field}': {message}")]
    InvalidConfigValue { field: String, message: String },

    #[error("Failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    // ============================================================================
    // HTTP / API Errors
    // ============================================================================
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// A completed HTTP exchange with a non-200 status, or a transport-level
    /// failure (status -1). `message` carries the `{error, description}`
    /// summary extracted from the server's error body.
    #[error("API error (status {status}): {message}")]
    Api {
        status: i32,
        message: String,
        retry_after: Option<u64>,
    },

    /// Retry budget exhausted. Wraps the last underlying API error and is
    /// reported to the operator as a configuration-level failure.
    #[error("Giving up after {retries} retries: {message}")]
    GiveUp { retries: u32, message: String },

    #[error("Rate limit header missing or unparsable: {message}")]
    RateLimitHeader { message: String },

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    // ============================================================================
    // Data Errors
    // ============================================================================
    #[error("Failed to decode response: {message}")]
    Decode { message: String },

    #[error("Invalid timestamp '{value}'")]
    InvalidTimestamp { value: String },

    // ============================================================================
    // Run Control
    // ============================================================================
    #[error("Sync cancelled")]
    Cancelled,

    // ============================================================================
    // Generic Errors
    // ============================================================================
    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl Error {
    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a missing field error
    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::MissingConfigField {
            field: field.into(),
        }
    }

    /// Create an invalid config value error
    pub fn invalid_value(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidConfigValue {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create an API error without a retry-after hint
    pub fn api(status: i32, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
            retry_after: None,
        }
    }

    /// Create a decode error
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }

    /// Status code carried by this error, if it is an API error.
    pub fn api_status(&self) -> Option<i32> {
        match self {
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether this error is fatal for the whole run (never retried).
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Config { .. }
                | Self::MissingConfigField { .. }
                | Self::InvalidConfigValue { .. }
                | Self::GiveUp { .. }
                | Self::RateLimitHeader { .. }
                | Self::Cancelled
        )
    }
}

/// Result type alias for the connector
pub type Result<T> = std::result::Result<T, Error>;
