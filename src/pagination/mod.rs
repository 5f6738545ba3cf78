//! Lazy multi-page record sequences
//!
//! Turns a multi-page API resource into a single pull-based sequence of
//! decoded JSON records, fetching new pages on demand as the consumer
//! advances. Pagination advances either by bumping an offset parameter or
//! by following a next-page URL embedded in the response.

mod sequencer;
mod types;

pub use sequencer::RecordSequence;
pub use types::{decode_page, PageRule, ResourcePage};
