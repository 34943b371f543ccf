/// HTTP endpoint for grid data
///
/// Exposes the service facade and the balancing-authority lister over a small
/// JSON REST surface. Every route is also reachable under an `/api` prefix.
///
/// Endpoints:
/// - GET /                                  - Welcome message
/// - GET /health                            - Service health check
/// - GET /balancing-authorities             - Sorted authority codes
/// - GET /grid-mix?balancing_authority=     - Daily generation by fuel type
/// - GET /net-demand-generation?balancing_authority= - Demand / net generation
/// - GET /interchange?balancing_authority=  - Daily interchange
///
/// The time-series routes accept optional `start_date` / `end_date`
/// (`YYYY-MM-DD`). Errors are rendered as `{"detail": <message>}`.

use chrono::NaiveDate;
use log::{error, info};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use thiserror::Error;
use threadpool::ThreadPool;

use crate::authorities::list_authorities;
use crate::config::ServiceConfig;
use crate::ingest::eia::Upstream;
use crate::model::{MergedResult, QueryError};
use crate::query::{Clock, QueryWindow};
use crate::service;

const AVAILABLE_ENDPOINTS: [&str; 6] = [
    "/",
    "/health",
    "/balancing-authorities",
    "/grid-mix?balancing_authority={id}",
    "/net-demand-generation?balancing_authority={id}",
    "/interchange?balancing_authority={id}",
];

// ---------------------------------------------------------------------------
// State and responses
// ---------------------------------------------------------------------------

/// Read-only state shared by every request handler.
#[derive(Clone)]
pub struct AppState {
    pub upstream: Arc<dyn Upstream>,
    pub clock: Arc<dyn Clock>,
}

/// A routed response before it is written to the socket.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    /// `Value::Null` means an empty body.
    pub body: Value,
}

impl ApiResponse {
    fn ok(body: Value) -> Self {
        Self { status: 200, body }
    }
}

/// Request failures, each mapped to one HTTP status.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    MethodNotAllowed(String),
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::Validation(_) => 422,
            ApiError::NotFound(_) => 404,
            ApiError::MethodNotAllowed(_) => 405,
            ApiError::Internal(_) => 500,
        }
    }

    fn into_response(self) -> ApiResponse {
        ApiResponse {
            status: self.status_code(),
            body: json!({ "detail": self.to_string() }),
        }
    }
}

impl From<QueryError> for ApiError {
    fn from(err: QueryError) -> Self {
        ApiError::Validation(err.to_string())
    }
}

// ---------------------------------------------------------------------------
// Request parsing
// ---------------------------------------------------------------------------

/// Splits a request URL into a normalized path and decoded query parameters.
/// The first occurrence of a repeated parameter wins.
fn split_url(url: &str) -> (String, HashMap<String, String>) {
    let (raw_path, raw_query) = url.split_once('?').unwrap_or((url, ""));

    let mut path = match raw_path.strip_prefix("/api") {
        Some("") => "/",
        Some(rest) if rest.starts_with('/') => rest,
        _ => raw_path,
    }
    .to_string();
    while path.len() > 1 && path.ends_with('/') {
        path.pop();
    }

    let mut params = HashMap::new();
    for pair in raw_query.split('&').filter(|p| !p.is_empty()) {
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        let key = decode_component(key);
        let value = decode_component(value);
        params.entry(key).or_insert(value);
    }

    (path, params)
}

fn decode_component(raw: &str) -> String {
    let spaced = raw.replace('+', " ");
    urlencoding::decode(&spaced)
        .map(|s| s.into_owned())
        .unwrap_or(spaced)
}

/// Reads the required `balancing_authority` parameter. Several authorities
/// may be given comma-separated.
fn required_authorities(params: &HashMap<String, String>) -> Result<Vec<String>, ApiError> {
    let authorities: Vec<String> = params
        .get("balancing_authority")
        .map(|raw| {
            raw.split(',')
                .map(|code| code.trim().to_string())
                .filter(|code| !code.is_empty())
                .collect()
        })
        .unwrap_or_default();

    if authorities.is_empty() {
        return Err(ApiError::Validation(
            "Missing required query parameter: balancing_authority".to_string(),
        ));
    }
    Ok(authorities)
}

fn optional_date(params: &HashMap<String, String>, name: &str) -> Result<Option<NaiveDate>, ApiError> {
    match params.get(name).map(|raw| raw.trim()).filter(|raw| !raw.is_empty()) {
        None => Ok(None),
        Some(raw) => NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .map(Some)
            .map_err(|_| ApiError::Validation(format!("{} must be a YYYY-MM-DD date, got {:?}", name, raw))),
    }
}

fn query_window(params: &HashMap<String, String>) -> Result<QueryWindow, ApiError> {
    Ok(QueryWindow {
        start_date: optional_date(params, "start_date")?,
        end_date: optional_date(params, "end_date")?,
        page_index: 0,
    })
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

fn handle_root() -> ApiResponse {
    ApiResponse::ok(json!({ "message": "Welcome to the EIA Electricity Data API" }))
}

fn handle_health() -> ApiResponse {
    ApiResponse::ok(json!({ "status": "Grid data service is running!" }))
}

fn handle_balancing_authorities(state: &AppState) -> Result<ApiResponse, ApiError> {
    let authorities =
        list_authorities(state.upstream.as_ref()).map_err(|e| ApiError::Internal(e.to_string()))?;
    Ok(ApiResponse::ok(json!({ "balancing_authorities": authorities })))
}

type TimeseriesFn =
    fn(&dyn Upstream, &dyn Clock, &[String], &QueryWindow) -> Result<MergedResult, QueryError>;

/// Shared flow of the three time-series routes. A failed fetch is a 404; a
/// completed fetch is a 200 even when it matched no rows.
fn handle_timeseries(
    state: &AppState,
    params: &HashMap<String, String>,
    fetch: TimeseriesFn,
    label: &str,
) -> Result<ApiResponse, ApiError> {
    let authorities = required_authorities(params)?;
    let window = query_window(params)?;

    let result = fetch(state.upstream.as_ref(), state.clock.as_ref(), &authorities, &window)?;
    if result.is_failed() {
        return Err(ApiError::NotFound(format!(
            "No {} data found for balancing authority {}",
            label,
            authorities.join(",")
        )));
    }

    let rows = serde_json::to_value(&result.rows)
        .map_err(|e| ApiError::Internal(format!("failed to serialize rows: {}", e)))?;
    Ok(ApiResponse::ok(rows))
}

/// Routes one request. Pure with respect to the socket, so it can be
/// exercised without a server.
pub fn route(state: &AppState, method: &str, url: &str) -> ApiResponse {
    let (path, params) = split_url(url);

    if method.eq_ignore_ascii_case("OPTIONS") {
        return ApiResponse { status: 204, body: Value::Null };
    }

    let known = matches!(
        path.as_str(),
        "/" | "/health"
            | "/balancing-authorities"
            | "/grid-mix"
            | "/net-demand-generation"
            | "/interchange"
    );
    if known && !method.eq_ignore_ascii_case("GET") {
        return ApiError::MethodNotAllowed(format!("Method {} not allowed on {}", method, path))
            .into_response();
    }

    let result = match path.as_str() {
        "/" => Ok(handle_root()),
        "/health" => Ok(handle_health()),
        "/balancing-authorities" => handle_balancing_authorities(state),
        "/grid-mix" => handle_timeseries(state, &params, service::grid_mix_timeseries, "generation"),
        "/net-demand-generation" => handle_timeseries(
            state,
            &params,
            service::net_demand_and_generation_timeseries,
            "demand",
        ),
        "/interchange" => {
            handle_timeseries(state, &params, service::interchange_timeseries, "interchange")
        }
        _ => {
            return ApiResponse {
                status: 404,
                body: json!({
                    "detail": "Not found",
                    "available_endpoints": AVAILABLE_ENDPOINTS,
                }),
            };
        }
    };

    result.unwrap_or_else(ApiError::into_response)
}

/// Routes a request, turning a panic anywhere below into a 500 whose detail
/// is the panic message.
pub fn route_guarded(state: &AppState, method: &str, url: &str) -> ApiResponse {
    panic::catch_unwind(AssertUnwindSafe(|| route(state, method, url))).unwrap_or_else(|payload| {
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "Internal server error".to_string());
        ApiError::Internal(message).into_response()
    })
}

// ---------------------------------------------------------------------------
// HTTP Server
// ---------------------------------------------------------------------------

/// Create HTTP response with JSON body
fn create_response(response: &ApiResponse) -> tiny_http::Response<std::io::Cursor<Vec<u8>>> {
    let bytes = match &response.body {
        Value::Null => Vec::new(),
        body => serde_json::to_vec(body)
            .unwrap_or_else(|_| br#"{"detail":"failed to encode response"}"#.to_vec()),
    };

    let mut http_response = tiny_http::Response::from_data(bytes)
        .with_status_code(tiny_http::StatusCode::from(response.status));

    let headers: [(&[u8], &[u8]); 4] = [
        (b"Content-Type", b"application/json"),
        (b"Access-Control-Allow-Origin", b"*"),
        (b"Access-Control-Allow-Methods", b"GET, OPTIONS"),
        (b"Access-Control-Allow-Headers", b"Content-Type"),
    ];
    for (name, value) in headers {
        if let Ok(header) = tiny_http::Header::from_bytes(name, value) {
            http_response = http_response.with_header(header);
        }
    }
    http_response
}

fn handle_request(state: &AppState, request: tiny_http::Request) {
    let method = request.method().as_str().to_string();
    let url = request.url().to_string();

    let response = route_guarded(state, &method, &url);
    info!("{} {} -> {}", method, url, response.status);

    if let Err(e) = request.respond(create_response(&response)) {
        error!("Failed to send response: {}", e);
    }
}

/// Start HTTP endpoint server on the configured address. Blocks for the
/// life of the process; each request is handled on one pool thread.
pub fn start_endpoint_server(config: &ServiceConfig, state: AppState) -> Result<(), String> {
    let address = config.bind_address();
    let server = tiny_http::Server::http(&address)
        .map_err(|e| format!("Failed to start HTTP server on {}: {}", address, e))?;

    info!("HTTP endpoint listening on http://{}", address);
    for endpoint in AVAILABLE_ENDPOINTS {
        info!("   GET {}", endpoint);
    }

    let pool = ThreadPool::new(config.workers);
    for request in server.incoming_requests() {
        let state = state.clone();
        pool.execute(move || handle_request(&state, request));
    }

    pool.join();
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
