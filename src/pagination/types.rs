//! Page decoding and advance rules

use crate::error::{Error, Result};
use crate::types::JsonValue;

/// How the next page of a resource is located
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageRule {
    /// Increment the `page` query parameter until a page comes back with
    /// fewer than `per_page` records
    Offset {
        /// Page size baked into the URL
        per_page: u32,
    },

    /// Follow the absolute URL under this response key until it is
    /// null or absent
    NextUrl {
        /// Response field holding the next-page URL
        key: &'static str,
    },
}

/// One HTTP response decoded into records plus pagination metadata.
/// Transient; consumed immediately by the sequence and discarded.
#[derive(Debug)]
pub struct ResourcePage {
    /// Records found under the resource key (empty when the key is absent)
    pub records: Vec<JsonValue>,
    /// Embedded next-page URL, for [`PageRule::NextUrl`] resources
    pub next_url: Option<String>,
}

/// Decode a response body into a [`ResourcePage`].
///
/// A missing resource key or a non-array value under it reads as an empty
/// page, which terminates the sequence.
pub fn decode_page(body: &str, resource_key: &str, rule: &PageRule) -> Result<ResourcePage> {
    let parsed: JsonValue = serde_json::from_str(body)
        .map_err(|e| Error::decode(format!("invalid page body for '{resource_key}': {e}")))?;

    let records = match parsed.get(resource_key) {
        Some(JsonValue::Array(items)) => items.clone(),
        _ => Vec::new(),
    };

    let next_url = match rule {
        PageRule::Offset { .. } => None,
        PageRule::NextUrl { key } => parsed
            .get(*key)
            .and_then(JsonValue::as_str)
            .filter(|url| !url.is_empty())
            .map(ToString::to_string),
    };

    Ok(ResourcePage { records, next_url })
}
