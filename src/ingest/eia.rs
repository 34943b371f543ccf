/// EIA v2 electricity API client.
///
/// Handles request construction and response envelope parsing for the
/// real-time grid ("rto") endpoints:
///   https://api.eia.gov/v2/electricity/rto/
///
/// Time-series filters travel as a JSON object in the `X-Params` header; the
/// API key travels as the `api_key` query parameter. See `fixtures.rs` for
/// annotated examples of the response structure.

use chrono::NaiveDate;
use log::{error, info};
use serde::Serialize;
use serde_json::{Map, Value};
use std::time::Duration;

use crate::config::ServiceConfig;
use crate::model::{FetchError, RawPage, RawRecord};
use crate::query::Facets;

/// Timezone facet sent with every time-series request.
pub const DEFAULT_TIMEZONE: &str = "Pacific";

/// Endpoint scanned for balancing-authority codes.
pub const REGION_DATA_SEGMENT: &str = "region-data";

/// Rows requested from the region-data endpoint (the per-call cap).
pub const REGION_SAMPLE_LENGTH: u64 = 5000;

// ---------------------------------------------------------------------------
// Upstream seam
// ---------------------------------------------------------------------------

/// One page request against a time-series endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest<'a> {
    pub url_segment: &'a str,
    pub facets: &'a Facets,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub offset: u64,
    pub length: u64,
}

/// Anything that can answer upstream calls. `EiaClient` talks HTTP; tests
/// substitute scripted fakes.
pub trait Upstream: Send + Sync {
    /// Fetches one page of a daily time series.
    fn fetch_page(&self, request: &PageRequest<'_>) -> Result<RawPage, FetchError>;

    /// Fetches one bulk, non-paginated sample of hourly region data.
    fn fetch_region_records(&self) -> Result<Vec<RawRecord>, FetchError>;
}

// ---------------------------------------------------------------------------
// Request construction
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct SortSpec {
    column: &'static str,
    direction: &'static str,
}

/// Body of the `X-Params` header.
#[derive(Debug, Serialize)]
struct XParams {
    frequency: &'static str,
    data: [&'static str; 1],
    facets: Facets,
    start: String,
    end: String,
    sort: [SortSpec; 1],
    offset: u64,
    length: u64,
}

/// Merges caller facets over the default `timezone` facet. Caller facets win
/// on every key, so `timezone` only changes when the caller names it.
pub fn merge_facets(facets: &Facets) -> Facets {
    let mut merged = Facets::new();
    merged.insert("timezone".to_string(), vec![DEFAULT_TIMEZONE.to_string()]);
    for (name, values) in facets {
        merged.insert(name.clone(), values.clone());
    }
    merged
}

/// Builds the JSON value of the `X-Params` header for a page request:
/// daily frequency, newest period first.
pub fn build_x_params(request: &PageRequest<'_>) -> Result<String, FetchError> {
    let params = XParams {
        frequency: "daily",
        data: ["value"],
        facets: merge_facets(request.facets),
        start: request.start_date.format("%Y-%m-%d").to_string(),
        end: request.end_date.format("%Y-%m-%d").to_string(),
        sort: [SortSpec {
            column: "period",
            direction: "desc",
        }],
        offset: request.offset,
        length: request.length,
    };
    serde_json::to_string(&params)
        .map_err(|e| FetchError::MalformedResponse(format!("failed to encode X-Params: {}", e)))
}

/// Builds the data URL for an rto endpoint, without the API key.
///
/// # Example
/// ```
/// use gridmix_service::ingest::eia::build_data_url;
///
/// let url = build_data_url("https://api.eia.gov/v2", "daily-fuel-type-data");
/// assert_eq!(url, "https://api.eia.gov/v2/electricity/rto/daily-fuel-type-data/data/");
/// ```
pub fn build_data_url(base_url: &str, url_segment: &str) -> String {
    format!(
        "{}/electricity/rto/{}/data/",
        base_url.trim_end_matches('/'),
        url_segment.trim_matches('/')
    )
}

// ---------------------------------------------------------------------------
// Response parsing
// ---------------------------------------------------------------------------

/// Extracts the `response` object from a raw body.
fn response_envelope(body: &str) -> Result<Map<String, Value>, FetchError> {
    let value: Value = serde_json::from_str(body)
        .map_err(|e| FetchError::MalformedResponse(format!("invalid JSON: {}", e)))?;

    match value.get("response") {
        Some(Value::Object(envelope)) => Ok(envelope.clone()),
        Some(_) => Err(FetchError::MalformedResponse(
            "'response' is not an object".to_string(),
        )),
        None => Err(FetchError::MalformedResponse(
            "missing 'response' wrapper".to_string(),
        )),
    }
}

/// Pulls `data[]` out of the envelope; every entry must be an object.
fn envelope_records(envelope: &mut Map<String, Value>) -> Result<Vec<RawRecord>, FetchError> {
    let data = match envelope.remove("data") {
        Some(Value::Array(data)) => data,
        _ => {
            return Err(FetchError::MalformedResponse(
                "missing 'response.data' array".to_string(),
            ));
        }
    };

    data.into_iter()
        .enumerate()
        .map(|(index, entry)| match entry {
            Value::Object(record) => Ok(record),
            other => Err(FetchError::MalformedResponse(format!(
                "record {} is not an object: {}",
                index, other
            ))),
        })
        .collect()
}

/// Reads `response.total`, which the API reports as a string or a number.
fn envelope_total(envelope: &Map<String, Value>) -> Result<u64, FetchError> {
    let total = match envelope.get("total") {
        Some(Value::Number(n)) => n.as_u64(),
        Some(Value::String(s)) => s.trim().parse::<u64>().ok(),
        _ => {
            return Err(FetchError::MalformedResponse(
                "missing 'response.total'".to_string(),
            ));
        }
    };
    total.ok_or_else(|| {
        FetchError::MalformedResponse(format!(
            "'response.total' is not a row count: {:?}",
            envelope.get("total")
        ))
    })
}

/// Parses a time-series response body into a `RawPage`.
///
/// # Errors
/// `FetchError::MalformedResponse` when the body is not JSON, lacks the
/// `response` wrapper, or has no usable `data` / `total`.
pub fn parse_page_response(body: &str) -> Result<RawPage, FetchError> {
    let mut envelope = response_envelope(body)?;
    let total_row_count = envelope_total(&envelope)?;
    let records = envelope_records(&mut envelope)?;
    Ok(RawPage {
        records,
        total_row_count,
    })
}

/// Parses a region-data response body into its records. `total` is not
/// required here since the call is never paginated.
pub fn parse_region_response(body: &str) -> Result<Vec<RawRecord>, FetchError> {
    let mut envelope = response_envelope(body)?;
    envelope_records(&mut envelope)
}

// ---------------------------------------------------------------------------
// HTTP client
// ---------------------------------------------------------------------------

/// Blocking EIA client with a bounded per-call timeout.
pub struct EiaClient {
    http: reqwest::blocking::Client,
    api_key: String,
    base_url: String,
}

impl EiaClient {
    pub fn new(api_key: &str, base_url: &str, timeout: Duration) -> Result<Self, FetchError> {
        let http = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FetchError::Network(e.without_url().to_string()))?;

        Ok(Self {
            http,
            api_key: api_key.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &ServiceConfig) -> Result<Self, FetchError> {
        Self::new(
            &config.api_key,
            &config.api_base_url,
            Duration::from_secs(config.request_timeout_secs),
        )
    }

    /// Sends a prepared request and returns the body of a 2xx response.
    ///
    /// Transport errors are stripped of their URL, which carries the key.
    fn send(&self, request: reqwest::blocking::RequestBuilder) -> Result<String, FetchError> {
        let response = request
            .query(&[("api_key", self.api_key.as_str())])
            .header("Accept", "application/json")
            .send()
            .map_err(|e| FetchError::Network(e.without_url().to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Http(status.as_u16()));
        }

        response
            .text()
            .map_err(|e| FetchError::Network(e.without_url().to_string()))
    }
}

impl Upstream for EiaClient {
    fn fetch_page(&self, request: &PageRequest<'_>) -> Result<RawPage, FetchError> {
        let url = build_data_url(&self.base_url, request.url_segment);
        let x_params = build_x_params(request)?;

        info!(
            "Fetching {} (offset {}, length {})",
            url, request.offset, request.length
        );

        let body = self.send(self.http.get(&url).header("X-Params", x_params))?;
        let page = parse_page_response(&body).inspect_err(|e| {
            error!("Invalid API response format from {}: {}", url, e);
        })?;

        info!(
            "Fetched {} rows ({} total) from {}",
            page.records.len(),
            page.total_row_count,
            request.url_segment
        );
        Ok(page)
    }

    fn fetch_region_records(&self) -> Result<Vec<RawRecord>, FetchError> {
        let url = build_data_url(&self.base_url, REGION_DATA_SEGMENT);
        info!("Requesting balancing authority sample from {}", url);

        let length = REGION_SAMPLE_LENGTH.to_string();
        let request = self
            .http
            .get(&url)
            .query(&[("frequency", "hourly"), ("length", length.as_str())]);

        let body = self.send(request)?;
        parse_region_response(&body).inspect_err(|e| {
            error!("Invalid API response format from {}: {}", url, e);
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
