/// Test fixtures: representative JSON payloads from the EIA v2 API.
///
/// Truncated to the fields the parsers look at, but shaped like the real
/// envelope returned by:
///   https://api.eia.gov/v2/electricity/rto/<segment>/data/
///
/// EIA v2 response shape:
///   response.total            — row count for the whole query (often a STRING)
///   response.data[]
///     .period                 — "YYYY-MM-DD" for daily, "YYYY-MM-DDTHH" for hourly
///     .respondent             — balancing authority code
///     .value                  — measurement, a string or a number
///
/// Note: `value` arrives as a JSON string for most daily endpoints. Parsers
/// must coerce it.

/// Daily fuel-type page for CISO: three rows, most recent first, total of 3.
#[cfg(test)]
pub(crate) fn fixture_fuel_type_page_json() -> &'static str {
    r#"{
      "response": {
        "total": "3",
        "dateFormat": "YYYY-MM-DD",
        "frequency": "daily",
        "data": [
          {
            "period": "2025-03-15",
            "respondent": "CISO",
            "respondent-name": "California Independent System Operator",
            "fueltype": "SUN",
            "type-name": "Solar",
            "timezone": "Pacific",
            "timezone-description": "Pacific",
            "value": "1200.5",
            "value-units": "megawatthours"
          },
          {
            "period": "2025-03-14",
            "respondent": "CISO",
            "respondent-name": "California Independent System Operator",
            "fueltype": "SUN",
            "type-name": "Solar",
            "timezone": "Pacific",
            "timezone-description": "Pacific",
            "value": "1100.3",
            "value-units": "megawatthours"
          },
          {
            "period": "2025-03-13",
            "respondent": "CISO",
            "respondent-name": "California Independent System Operator",
            "fueltype": "WND",
            "type-name": "Wind",
            "timezone": "Pacific",
            "timezone-description": "Pacific",
            "value": 987,
            "value-units": "megawatthours"
          }
        ],
        "description": "Daily net generation by balancing authority and energy source."
      },
      "request": { "command": "/v2/electricity/rto/daily-fuel-type-data/data/" },
      "apiVersion": "2.1.8"
    }"#
}

/// A page whose total is reported as a JSON number and whose rows mix a
/// valid value, a non-numeric value and a null value.
#[cfg(test)]
pub(crate) fn fixture_mixed_values_page_json() -> &'static str {
    r#"{
      "response": {
        "total": 3,
        "data": [
          { "period": "2025-03-15", "respondent": "PJM", "type": "D", "value": "1234.5" },
          { "period": "2025-03-14", "respondent": "PJM", "type": "D", "value": "not-a-number" },
          { "period": "2025-03-13", "respondent": "PJM", "type": "D", "value": null }
        ]
      }
    }"#
}

/// Error body returned with HTTP 200 when the API key is rejected.
#[cfg(test)]
pub(crate) fn fixture_missing_response_wrapper_json() -> &'static str {
    r#"{
      "error": "API_KEY_INVALID",
      "code": 403
    }"#
}

/// Wrapper present but `data` is missing.
#[cfg(test)]
pub(crate) fn fixture_missing_data_json() -> &'static str {
    r#"{ "response": { "total": "0" } }"#
}

/// A query that matched nothing.
#[cfg(test)]
pub(crate) fn fixture_empty_page_json() -> &'static str {
    r#"{ "response": { "total": "0", "data": [] } }"#
}

/// Hourly region-data sample with a duplicated respondent and one record
/// missing the field.
#[cfg(test)]
pub(crate) fn fixture_region_data_json() -> &'static str {
    r#"{
      "response": {
        "total": "5",
        "frequency": "hourly",
        "data": [
          { "period": "2025-03-15T08", "respondent": "CISO", "type": "D", "value": 21450 },
          { "period": "2025-03-15T08", "respondent": "PJM", "type": "D", "value": 88012 },
          { "period": "2025-03-15T07", "respondent": "CISO", "type": "NG", "value": 20011 },
          { "period": "2025-03-15T07", "respondent": "ERCO", "type": "D", "value": 45120 },
          { "period": "2025-03-15T07", "type": "TI", "value": -312 }
        ]
      }
    }"#
}

/// Region-data response whose records carry no respondent at all.
#[cfg(test)]
pub(crate) fn fixture_region_data_without_respondents_json() -> &'static str {
    r#"{
      "response": {
        "total": "1",
        "data": [
          { "period": "2025-03-15T08", "type": "D", "value": 21450 }
        ]
      }
    }"#
}

// ---------------------------------------------------------------------------
// Scripted upstream
// ---------------------------------------------------------------------------

#[cfg(test)]
pub(crate) use scripted::*;

#[cfg(test)]
mod scripted {
    use chrono::{Duration, NaiveDate, NaiveDateTime};
    use serde_json::{json, Value};
    use std::collections::HashMap;
    use std::sync::Mutex;

    use crate::ingest::eia::{PageRequest, Upstream};
    use crate::model::{FetchError, RawPage, RawRecord};
    use crate::query::Facets;

    /// What the fake saw for one `fetch_page` call.
    #[derive(Debug, Clone)]
    pub(crate) struct RecordedRequest {
        pub url_segment: String,
        pub facets: Facets,
        pub start_date: NaiveDate,
        pub end_date: NaiveDate,
        pub offset: u64,
        pub length: u64,
    }

    /// In-memory upstream answering from pages keyed by offset.
    pub(crate) struct ScriptedUpstream {
        pages: HashMap<u64, Result<RawPage, FetchError>>,
        region: Result<Vec<RawRecord>, FetchError>,
        requests: Mutex<Vec<RecordedRequest>>,
    }

    /// Hourly period `index` hours before 2025-03-15T23.
    pub(crate) fn hourly_period(index: u64) -> String {
        let newest: NaiveDateTime = NaiveDate::from_ymd_opt(2025, 3, 15)
            .and_then(|d| d.and_hms_opt(23, 0, 0))
            .unwrap();
        (newest - Duration::hours(index as i64))
            .format("%Y-%m-%dT%H")
            .to_string()
    }

    pub(crate) fn as_record(value: Value) -> RawRecord {
        match value {
            Value::Object(map) => map,
            _ => panic!("record fixture must be an object"),
        }
    }

    /// One page of a synthetic series, most recent first across pages.
    pub(crate) fn series_page(offset: u64, len: u64, total: u64) -> RawPage {
        let records = (offset..offset + len)
            .map(|i| {
                as_record(json!({
                    "period": hourly_period(i),
                    "respondent": "CISO",
                    "value": format!("{}", i),
                }))
            })
            .collect();
        RawPage {
            records,
            total_row_count: total,
        }
    }

    impl ScriptedUpstream {
        pub(crate) fn new() -> Self {
            Self {
                pages: HashMap::new(),
                region: Err(FetchError::Network("no scripted region data".to_string())),
                requests: Mutex::new(Vec::new()),
            }
        }

        /// A well-behaved upstream serving `total` rows in full pages.
        pub(crate) fn with_series(total: u64, page_size: u64) -> Self {
            let mut upstream = Self::new();
            let mut offset = 0;
            loop {
                let len = page_size.min(total - offset);
                upstream = upstream.with_page(offset, Ok(series_page(offset, len, total)));
                offset += len;
                if offset >= total {
                    break;
                }
            }
            upstream
        }

        pub(crate) fn with_page(mut self, offset: u64, page: Result<RawPage, FetchError>) -> Self {
            self.pages.insert(offset, page);
            self
        }

        pub(crate) fn with_region(mut self, region: Result<Vec<RawRecord>, FetchError>) -> Self {
            self.region = region;
            self
        }

        pub(crate) fn requests(&self) -> Vec<RecordedRequest> {
            self.requests.lock().unwrap().clone()
        }

        pub(crate) fn offsets(&self) -> Vec<u64> {
            self.requests().iter().map(|r| r.offset).collect()
        }
    }

    impl Upstream for ScriptedUpstream {
        fn fetch_page(&self, request: &PageRequest<'_>) -> Result<RawPage, FetchError> {
            self.requests.lock().unwrap().push(RecordedRequest {
                url_segment: request.url_segment.to_string(),
                facets: request.facets.clone(),
                start_date: request.start_date,
                end_date: request.end_date,
                offset: request.offset,
                length: request.length,
            });
            self.pages.get(&request.offset).cloned().unwrap_or_else(|| {
                Err(FetchError::Network(format!(
                    "no scripted page at offset {}",
                    request.offset
                )))
            })
        }

        fn fetch_region_records(&self) -> Result<Vec<RawRecord>, FetchError> {
            self.region.clone()
        }
    }
}
