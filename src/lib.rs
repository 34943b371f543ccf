/// gridmix_service: EIA electricity grid data proxy.
///
/// # Module structure
///
/// ```text
/// gridmix_service
/// ├── model       — shared data types (NormalizedRow, MergedResult, FetchError, …)
/// ├── query       — TimeSeriesQuery builder, QueryWindow, injectable Clock
/// ├── config      — service configuration loader (env + gridmix.toml)
/// ├── ingest
/// │   ├── eia       — EIA v2 API: request construction + envelope parsing
/// │   ├── normalize — raw records to timestamped, renamed numeric rows
/// │   └── fixtures (test only) — representative API payloads, scripted upstream
/// ├── timeseries  — paginated fetch-and-merge (fail-closed)
/// ├── authorities — balancing-authority listing
/// ├── service     — grid mix / net demand / interchange queries
/// └── endpoint    — HTTP API on tiny_http
/// ```

/// Public modules
pub mod authorities;
pub mod config;
pub mod endpoint;
pub mod ingest;
pub mod model;
pub mod query;
pub mod service;
pub mod timeseries;
