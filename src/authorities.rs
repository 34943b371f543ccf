/// Balancing-authority listing.
///
/// One non-paginated call against hourly region data; every record's
/// `respondent` is collected into a set. Fetched fresh for every request.

use log::{error, info, warn};
use std::collections::BTreeSet;

use crate::ingest::eia::Upstream;
use crate::model::{ListError, RawRecord};

/// Collects the distinct, non-blank `respondent` codes, sorted ascending.
pub fn extract_authorities(records: &[RawRecord]) -> Vec<String> {
    records
        .iter()
        .filter_map(|record| record.get("respondent").and_then(|v| v.as_str()))
        .map(str::trim)
        .filter(|code| !code.is_empty())
        .map(str::to_string)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Lists the balancing authorities present in the upstream region data.
///
/// # Errors
/// - `ListError::Fetch` — the upstream call failed (network, HTTP status,
///   malformed body).
/// - `ListError::EmptyResult` — the call succeeded but no record named a
///   respondent.
pub fn list_authorities(upstream: &dyn Upstream) -> Result<Vec<String>, ListError> {
    let records = upstream.fetch_region_records().inspect_err(|e| {
        error!("Failed to fetch data from EIA API: {}", e);
    })?;

    let authorities = extract_authorities(&records);
    if authorities.is_empty() {
        warn!("No balancing authorities found in {} records.", records.len());
        return Err(ListError::EmptyResult);
    }

    info!("Found {} balancing authorities.", authorities.len());
    Ok(authorities)
}
