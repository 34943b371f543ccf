/// Shared data types for the grid data service.
///
/// Everything here is request-scoped: built while answering one HTTP request
/// and dropped once the response body has been serialized.

use chrono::NaiveDateTime;
use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::{Map, Value};
use thiserror::Error;

/// Format used when rendering timestamps in JSON responses.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// One raw upstream record: field name to untyped JSON value.
pub type RawRecord = Map<String, Value>;

// ---------------------------------------------------------------------------
// Upstream pages
// ---------------------------------------------------------------------------

/// One upstream response page.
#[derive(Debug, Clone, PartialEq)]
pub struct RawPage {
    /// Records in the order the upstream returned them (most recent first).
    pub records: Vec<RawRecord>,
    /// Row count for the whole query, not just this page.
    pub total_row_count: u64,
}

// ---------------------------------------------------------------------------
// Normalized output
// ---------------------------------------------------------------------------

/// One output record: a timestamp plus a single numeric column named by the
/// caller.
///
/// The remaining scalar fields of the upstream record (`respondent`,
/// `fueltype`, `value-units`, ...) ride along in `attributes` so that clients
/// can group rows; the raw `value` key is never among them.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedRow {
    /// `None` when the period identifier could not be parsed.
    pub timestamp: Option<NaiveDateTime>,
    pub value_column: String,
    pub value: f64,
    pub attributes: Map<String, Value>,
}

impl Serialize for NormalizedRow {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        for (key, value) in &self.attributes {
            if key != "timestamp" && key != &self.value_column {
                map.serialize_entry(key, value)?;
            }
        }
        let timestamp = self
            .timestamp
            .map(|ts| ts.format(TIMESTAMP_FORMAT).to_string());
        map.serialize_entry("timestamp", &timestamp)?;
        map.serialize_entry(&self.value_column, &self.value)?;
        map.end()
    }
}

/// How a paginated fetch ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    /// Every page was retrieved and the reported total was reached.
    Complete { pages: u64, rejected_rows: u64 },
    /// Some page failed; the result was discarded.
    Failed,
}

/// Concatenation of every fetched page, page 0 first.
///
/// Either the full result set or nothing: a failed fetch never carries rows.
#[derive(Debug, Clone, PartialEq)]
pub struct MergedResult {
    pub rows: Vec<NormalizedRow>,
    pub outcome: FetchOutcome,
}

impl MergedResult {
    pub fn complete(rows: Vec<NormalizedRow>, pages: u64, rejected_rows: u64) -> Self {
        Self {
            rows,
            outcome: FetchOutcome::Complete { pages, rejected_rows },
        }
    }

    pub fn failed() -> Self {
        Self {
            rows: Vec::new(),
            outcome: FetchOutcome::Failed,
        }
    }

    pub fn is_failed(&self) -> bool {
        self.outcome == FetchOutcome::Failed
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Failure of a single upstream call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// Timeout, DNS, connection reset or any other transport failure.
    #[error("network error: {0}")]
    Network(String),
    #[error("upstream returned HTTP {0}")]
    Http(u16),
    /// Body was not JSON or lacked the `response` wrapper.
    #[error("malformed upstream response: {0}")]
    MalformedResponse(String),
}

/// Per-record normalization failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NormalizeError {
    #[error("value {0} is not a number")]
    BadValue(String),
    #[error("period {0} is not a recognised timestamp")]
    BadTimestamp(String),
}

/// Failure of the balancing-authority listing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ListError {
    #[error("failed to fetch balancing authorities: {0}")]
    Fetch(#[from] FetchError),
    #[error("no balancing authorities found in upstream data")]
    EmptyResult,
}

/// Rejected time-series query.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    #[error("url segment must not be empty")]
    EmptyUrlSegment,
    #[error("value column name must not be empty")]
    EmptyValueColumn,
    #[error("at least one facet is required")]
    NoFacets,
    #[error("facet '{0}' has no values")]
    EmptyFacet(String),
    #[error("start date {start} is after end date {end}")]
    InvertedRange { start: String, end: String },
}
