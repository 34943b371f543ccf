//! Shared helpers for integration tests: an in-memory upstream that serves a
//! synthetic daily series, most recent first, and records every call.

#![allow(dead_code)]

use chrono::{Duration, NaiveDate};
use gridmix_service::ingest::eia::{PageRequest, Upstream};
use gridmix_service::model::{FetchError, RawPage, RawRecord};
use serde_json::{json, Value};
use std::collections::HashSet;
use std::sync::Mutex;

/// Newest period the fake series reports.
pub fn newest_day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 3, 15).unwrap()
}

pub fn record(value: Value) -> RawRecord {
    match value {
        Value::Object(map) => map,
        _ => panic!("record must be a JSON object"),
    }
}

/// Serves `total` rows of a daily series; row `i` is `i` days before
/// `newest_day()` and carries the value `i`.
pub struct SeriesUpstream {
    pub total: u64,
    pub failing_offsets: HashSet<u64>,
    pub respondents: Vec<&'static str>,
    calls: Mutex<Vec<u64>>,
}

impl SeriesUpstream {
    pub fn new(total: u64) -> Self {
        Self {
            total,
            failing_offsets: HashSet::new(),
            respondents: Vec::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing_at(mut self, offset: u64) -> Self {
        self.failing_offsets.insert(offset);
        self
    }

    pub fn with_respondents(mut self, respondents: &[&'static str]) -> Self {
        self.respondents = respondents.to_vec();
        self
    }

    /// Offsets requested so far, in call order.
    pub fn calls(&self) -> Vec<u64> {
        self.calls.lock().unwrap().clone()
    }
}

impl Upstream for SeriesUpstream {
    fn fetch_page(&self, request: &PageRequest<'_>) -> Result<RawPage, FetchError> {
        self.calls.lock().unwrap().push(request.offset);

        if self.failing_offsets.contains(&request.offset) {
            return Err(FetchError::Network("operation timed out".to_string()));
        }

        let end = (request.offset + request.length).min(self.total);
        let records = (request.offset..end)
            .map(|i| {
                let day = newest_day() - Duration::days(i as i64);
                record(json!({
                    "period": day.format("%Y-%m-%d").to_string(),
                    "respondent": "CISO",
                    "fueltype": "NG",
                    "value": i.to_string(),
                    "value-units": "megawatthours",
                }))
            })
            .collect();

        Ok(RawPage {
            records,
            total_row_count: self.total,
        })
    }

    fn fetch_region_records(&self) -> Result<Vec<RawRecord>, FetchError> {
        if self.respondents.is_empty() && !self.failing_offsets.is_empty() {
            return Err(FetchError::Http(500));
        }
        Ok(self
            .respondents
            .iter()
            .map(|code| record(json!({ "period": "2025-03-15T08", "respondent": code, "value": 1 })))
            .collect())
    }
}
