/// Service facade: the three named time-series queries.
///
/// Each wraps the paginated fetcher with a fixed endpoint, facet set and
/// value column name.

use crate::ingest::eia::Upstream;
use crate::model::{MergedResult, QueryError};
use crate::query::{Clock, QueryWindow, TimeSeriesQuery};
use crate::timeseries::fetch_all;

pub const GRID_MIX_SEGMENT: &str = "daily-fuel-type-data";
pub const GRID_MIX_COLUMN: &str = "Generation (MWh)";

pub const NET_DEMAND_SEGMENT: &str = "daily-region-data";
pub const NET_DEMAND_COLUMN: &str = "Demand (MWh)";
/// Demand, net generation and total interchange.
pub const NET_DEMAND_TYPES: [&str; 3] = ["D", "NG", "TI"];

pub const INTERCHANGE_SEGMENT: &str = "daily-interchange-data";
pub const INTERCHANGE_COLUMN: &str = "Interchange (MWh)";

/// Query for daily generation by fuel type.
pub fn grid_mix_query(
    clock: &dyn Clock,
    authorities: &[String],
    window: &QueryWindow,
) -> Result<TimeSeriesQuery, QueryError> {
    TimeSeriesQuery::builder(GRID_MIX_SEGMENT, GRID_MIX_COLUMN)
        .facet("respondent", authorities.iter().cloned())
        .window(window)
        .build(clock)
}

/// Query for daily demand, net generation and total interchange.
pub fn net_demand_and_generation_query(
    clock: &dyn Clock,
    authorities: &[String],
    window: &QueryWindow,
) -> Result<TimeSeriesQuery, QueryError> {
    TimeSeriesQuery::builder(NET_DEMAND_SEGMENT, NET_DEMAND_COLUMN)
        .facet("respondent", authorities.iter().cloned())
        .facet("type", NET_DEMAND_TYPES)
        .window(window)
        .build(clock)
}

/// Query for daily interchange (imports and exports) into the authorities.
pub fn interchange_query(
    clock: &dyn Clock,
    authorities: &[String],
    window: &QueryWindow,
) -> Result<TimeSeriesQuery, QueryError> {
    TimeSeriesQuery::builder(INTERCHANGE_SEGMENT, INTERCHANGE_COLUMN)
        .facet("toba", authorities.iter().cloned())
        .window(window)
        .build(clock)
}

/// Electricity generation by fuel type for the given balancing authorities.
pub fn grid_mix_timeseries(
    upstream: &dyn Upstream,
    clock: &dyn Clock,
    authorities: &[String],
    window: &QueryWindow,
) -> Result<MergedResult, QueryError> {
    let query = grid_mix_query(clock, authorities, window)?;
    Ok(fetch_all(upstream, &query))
}

/// Demand and net generation for the given balancing authorities.
pub fn net_demand_and_generation_timeseries(
    upstream: &dyn Upstream,
    clock: &dyn Clock,
    authorities: &[String],
    window: &QueryWindow,
) -> Result<MergedResult, QueryError> {
    let query = net_demand_and_generation_query(clock, authorities, window)?;
    Ok(fetch_all(upstream, &query))
}

/// Interchange into the given balancing authorities.
pub fn interchange_timeseries(
    upstream: &dyn Upstream,
    clock: &dyn Clock,
    authorities: &[String],
    window: &QueryWindow,
) -> Result<MergedResult, QueryError> {
    let query = interchange_query(clock, authorities, window)?;
    Ok(fetch_all(upstream, &query))
}
