//! Pipeline collaborators: record sink, cancellation, dedup, statistics

use crate::cursor::CursorResult;
use crate::types::JsonValue;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

// ============================================================================
// Record Sink
// ============================================================================

/// Downstream consumer of extracted records. Ownership of each record
/// passes to the sink.
pub trait RecordSink: Send + Sync {
    /// Receive one record
    fn add_record(&self, record: JsonValue);
}

/// Sink buffering records in memory, for tests and small runs
#[derive(Debug, Default)]
pub struct VecSink {
    records: Mutex<Vec<JsonValue>>,
}

impl VecSink {
    /// Create an empty sink
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the records received so far
    pub fn records(&self) -> Vec<JsonValue> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of records received so far
    pub fn len(&self) -> usize {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether no records have been received
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl RecordSink for VecSink {
    fn add_record(&self, record: JsonValue) {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(record);
    }
}

// ============================================================================
// Cancellation
// ============================================================================

/// Cooperative cancellation handle shared across pipeline tasks.
///
/// Once triggered, the pipeline stops issuing new page requests and
/// surfaces [`crate::error::Error::Cancelled`]; records already handed to
/// the sink remain valid.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    /// Create an untriggered token
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation has been requested
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

// ============================================================================
// Dedup
// ============================================================================

/// Set of user IDs already forwarded during this run. Grows only; the
/// membership test and insert are one atomic step so two branches racing
/// on the same ID cannot both treat it as new.
#[derive(Debug, Default)]
pub struct DedupSet {
    seen: Mutex<HashSet<String>>,
}

impl DedupSet {
    /// Create an empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an ID, returning true when it was not seen before
    pub fn insert(&self, id: &str) -> bool {
        self.seen
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id.to_string())
    }

    /// Number of distinct IDs seen
    pub fn len(&self) -> usize {
        self.seen
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether no IDs have been seen
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ============================================================================
// Statistics and Report
// ============================================================================

/// Counters updated concurrently during a run
#[derive(Debug, Default)]
pub struct SyncStats {
    organizations: AtomicU64,
    users: AtomicU64,
    records: AtomicU64,
}

impl SyncStats {
    pub fn add_organizations(&self, count: u64) {
        self.organizations.fetch_add(count, Ordering::Relaxed);
    }

    pub fn add_user(&self) {
        self.users.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_record(&self) {
        self.records.fetch_add(1, Ordering::Relaxed);
    }

    pub fn organizations(&self) -> u64 {
        self.organizations.load(Ordering::Relaxed)
    }

    pub fn users(&self) -> u64 {
        self.users.load(Ordering::Relaxed)
    }

    pub fn records(&self) -> u64 {
        self.records.load(Ordering::Relaxed)
    }
}

/// Outcome of one completed run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport {
    /// Next run's window, present only in incremental mode
    pub cursor: Option<CursorResult>,
    /// Organizations fetched
    pub organizations: u64,
    /// Users whose events were fetched
    pub users: u64,
    /// Records handed to the sink
    pub records: u64,
}
