//! Grid Data Service - Main
//!
//! A thin HTTP service that proxies the EIA electricity grid API:
//! 1. Loads configuration and fails fast if the API key is missing
//! 2. Builds the upstream client with a bounded per-call timeout
//! 3. Serves balancing authorities and daily grid time series as JSON
//!
//! Usage:
//!   cargo run --release                          # Serve on the configured port
//!   cargo run --release -- --port 8080           # Override the port
//!   cargo run --release -- --config gridmix.toml # Use a specific config file
//!
//! Environment:
//!   EIA_API_KEY - EIA open data API key (required; may live in .env)
//!   RUST_LOG    - log filter (default: info)

use gridmix_service::config::ServiceConfig;
use gridmix_service::endpoint::{self, AppState};
use gridmix_service::ingest::eia::EiaClient;
use gridmix_service::query::SystemClock;
use log::{error, info};
use std::env;
use std::path::PathBuf;
use std::sync::Arc;

fn usage_and_exit(program: &str) -> ! {
    eprintln!("Usage: {} [--port PORT] [--config PATH]", program);
    std::process::exit(1);
}

fn main() {
    // .env may carry RUST_LOG as well as the API key
    dotenv::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // Parse command-line arguments
    let args: Vec<String> = env::args().collect();
    let mut port_override: Option<u16> = None;
    let mut config_path: Option<PathBuf> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--port" => {
                match args.get(i + 1).and_then(|p| p.parse().ok()) {
                    Some(port) => port_override = Some(port),
                    None => {
                        eprintln!("Error: --port requires a port number");
                        usage_and_exit(&args[0]);
                    }
                }
                i += 2;
            }
            "--config" => {
                match args.get(i + 1) {
                    Some(path) => config_path = Some(PathBuf::from(path)),
                    None => {
                        eprintln!("Error: --config requires a file path");
                        usage_and_exit(&args[0]);
                    }
                }
                i += 2;
            }
            _ => {
                eprintln!("Unknown argument: {}", args[i]);
                usage_and_exit(&args[0]);
            }
        }
    }

    let mut config = match ServiceConfig::load(config_path.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            error!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };
    if let Some(port) = port_override {
        config.port = port;
    }

    info!("Grid Data Service");
    info!("   Upstream: {}", config.api_base_url);
    info!("   Request timeout: {}s", config.request_timeout_secs);
    info!("   Workers: {}", config.workers);

    let client = match EiaClient::from_config(&config) {
        Ok(client) => client,
        Err(e) => {
            error!("Failed to build EIA client: {}", e);
            std::process::exit(1);
        }
    };

    let state = AppState {
        upstream: Arc::new(client),
        clock: Arc::new(SystemClock),
    };

    if let Err(e) = endpoint::start_endpoint_server(&config, state) {
        error!("Endpoint server error: {}", e);
        std::process::exit(1);
    }
}
