/// Page normalizer: raw upstream records to uniform `NormalizedRow`s.
///
/// Each record's `period` becomes a timezone-naive timestamp and its `value`
/// becomes an `f64` stored under the caller's column name. Failures are
/// per-record and never abort the page:
///   - unparseable period -> row kept with `timestamp: None`
///   - uncoercible value  -> row dropped and reported in `rejected`

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use log::warn;
use serde_json::{Map, Value};

use crate::model::{NormalizeError, NormalizedRow, RawRecord};

const PERIOD_FIELD: &str = "period";
const VALUE_FIELD: &str = "value";

/// Output of normalizing one page.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NormalizedPage {
    pub rows: Vec<NormalizedRow>,
    /// Index of each dropped record within the page, with the reason.
    pub rejected: Vec<(usize, NormalizeError)>,
    /// Rows kept with a missing timestamp.
    pub unparsed_periods: usize,
}

// ---------------------------------------------------------------------------
// Period parsing
// ---------------------------------------------------------------------------

/// Parses `"YYYY?MM?DDTHH"` (optionally followed by a `±HH` offset, which is
/// dropped) using `date_format` for the date half.
fn parse_date_hour(period: &str, date_format: &str) -> Option<NaiveDateTime> {
    let (date, hour) = period.split_once('T')?;
    let date = NaiveDate::parse_from_str(date, date_format).ok()?;
    if !hour.is_ascii() {
        return None;
    }

    let hour_digits = match hour.len() {
        2 => hour,
        5 if matches!(hour.as_bytes()[2], b'+' | b'-') => &hour[..2],
        _ => return None,
    };
    if !hour_digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let hour: u32 = hour_digits.parse().ok()?;
    date.and_hms_opt(hour, 0, 0)
}

/// Parses an upstream period identifier into a naive timestamp.
///
/// ISO-8601 forms are tried first, then the compact `YYYY/MM/DDTHH` form:
///   - RFC 3339 with offset (offset dropped, local wall time kept)
///   - `YYYY-MM-DDTHH:MM:SS[.f]`, `YYYY-MM-DDTHH:MM`, `YYYY-MM-DD HH:MM:SS`
///   - `YYYY-MM-DD` (midnight)
///   - `YYYY-MM-DDTHH` and `YYYY-MM-DDTHH-ZZ` (hourly EIA periods)
///   - `YYYY/MM/DDTHH`
pub fn parse_period(period: &str) -> Option<NaiveDateTime> {
    let period = period.trim();
    if period.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(period) {
        return Some(dt.naive_local());
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(period, format) {
            return Some(dt);
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(period, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0);
    }

    parse_date_hour(period, "%Y-%m-%d").or_else(|| parse_date_hour(period, "%Y/%m/%d"))
}

// ---------------------------------------------------------------------------
// Value coercion
// ---------------------------------------------------------------------------

/// Coerces a raw JSON value to `f64`. Numbers pass through, numeric strings
/// are parsed; everything else (null, bool, arrays, non-numeric text) is
/// `NormalizeError::BadValue`.
pub fn coerce_value(raw: Option<&Value>) -> Result<f64, NormalizeError> {
    let parsed = match raw {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };

    match parsed {
        Some(v) if v.is_finite() => Ok(v),
        _ => Err(NormalizeError::BadValue(
            raw.map(Value::to_string).unwrap_or_else(|| "<missing>".to_string()),
        )),
    }
}

// ---------------------------------------------------------------------------
// Normalization
// ---------------------------------------------------------------------------

/// Normalizes a single record.
///
/// The timestamp half never fails the record; only the value can.
pub fn normalize_record(
    record: &RawRecord,
    value_column_name: &str,
) -> Result<(NormalizedRow, Option<NormalizeError>), NormalizeError> {
    let value = coerce_value(record.get(VALUE_FIELD))?;

    let period = record.get(PERIOD_FIELD).and_then(Value::as_str);
    let timestamp = period.and_then(parse_period);
    let timestamp_error = match timestamp {
        Some(_) => None,
        None => Some(NormalizeError::BadTimestamp(
            period.unwrap_or("<missing>").to_string(),
        )),
    };

    let attributes: Map<String, Value> = record
        .iter()
        .filter(|(key, value)| key.as_str() != VALUE_FIELD && !value.is_object() && !value.is_array())
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();

    let row = NormalizedRow {
        timestamp,
        value_column: value_column_name.to_string(),
        value,
        attributes,
    };
    Ok((row, timestamp_error))
}

/// Normalizes one page of records, preserving their order.
pub fn normalize(records: &[RawRecord], value_column_name: &str) -> NormalizedPage {
    let mut page = NormalizedPage::default();

    for (index, record) in records.iter().enumerate() {
        match normalize_record(record, value_column_name) {
            Ok((row, timestamp_error)) => {
                if let Some(e) = timestamp_error {
                    warn!("Record {}: {} (timestamp left empty)", index, e);
                    page.unparsed_periods += 1;
                }
                page.rows.push(row);
            }
            Err(e) => {
                warn!("Record {}: {} (row dropped)", index, e);
                page.rejected.push((index, e));
            }
        }
    }

    page
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
