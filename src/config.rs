/// Service configuration loader.
///
/// Settings come from, lowest precedence first: built-in defaults, an
/// optional TOML file (`gridmix.toml`), then environment variables (`main`
/// applies `.env` first). The EIA API key is the only required setting;
/// without it the service refuses to start.

use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const DEFAULT_CONFIG_FILE: &str = "gridmix.toml";
pub const DEFAULT_API_BASE_URL: &str = "https://api.eia.gov/v2";
pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_WORKERS: usize = 4;

/// Fully resolved service settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    pub api_key: String,
    pub api_base_url: String,
    pub host: String,
    pub port: u16,
    /// Bound on every upstream call.
    pub request_timeout_secs: u64,
    /// Request-handling threads.
    pub workers: usize,
}

/// Optional settings read from the TOML file. Every key may be omitted.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    api_key: Option<String>,
    api_base_url: Option<String>,
    host: Option<String>,
    port: Option<u16>,
    request_timeout_secs: Option<u64>,
    workers: Option<usize>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("EIA_API_KEY is not set. Please update your .env file.")]
    MissingApiKey,
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse configuration: {0}")]
    Parse(String),
    #[error("invalid value for {name}: {value:?}")]
    InvalidValue { name: String, value: String },
}

/// Parses an environment override, rejecting values that don't parse
/// rather than falling back to the default.
fn parse_override<T: std::str::FromStr>(
    lookup: &dyn Fn(&str) -> Option<String>,
    name: &str,
) -> Result<Option<T>, ConfigError> {
    match lookup(name) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue {
                name: name.to_string(),
                value: raw,
            }),
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

impl ServiceConfig {
    /// Resolves settings from an optional TOML document and an environment
    /// lookup.
    pub fn from_sources(
        file_contents: Option<&str>,
        lookup: &dyn Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let file: FileConfig = match file_contents {
            Some(contents) => {
                toml::from_str(contents).map_err(|e| ConfigError::Parse(e.to_string()))?
            }
            None => FileConfig::default(),
        };

        let api_key = non_blank(lookup("EIA_API_KEY"))
            .or_else(|| non_blank(file.api_key))
            .ok_or(ConfigError::MissingApiKey)?;

        let api_base_url = non_blank(lookup("EIA_API_BASE_URL"))
            .or_else(|| non_blank(file.api_base_url))
            .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string());

        let host = non_blank(lookup("GRIDMIX_HOST"))
            .or_else(|| non_blank(file.host))
            .unwrap_or_else(|| DEFAULT_HOST.to_string());

        let port = parse_override(lookup, "GRIDMIX_PORT")?
            .or(file.port)
            .unwrap_or(DEFAULT_PORT);

        let request_timeout_secs = parse_override(lookup, "GRIDMIX_TIMEOUT_SECS")?
            .or(file.request_timeout_secs)
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        let workers: usize = parse_override(lookup, "GRIDMIX_WORKERS")?
            .or(file.workers)
            .unwrap_or(DEFAULT_WORKERS);

        if request_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                name: "request_timeout_secs".to_string(),
                value: "0".to_string(),
            });
        }
        if workers == 0 {
            return Err(ConfigError::InvalidValue {
                name: "workers".to_string(),
                value: "0".to_string(),
            });
        }

        Ok(Self {
            api_key,
            api_base_url,
            host,
            port,
            request_timeout_secs,
            workers,
        })
    }

    /// Loads the configuration file and the process environment. `.env` is
    /// expected to have been applied to the environment already.
    ///
    /// The file is `explicit_path` if given, else `$GRIDMIX_CONFIG`, else
    /// `gridmix.toml` in the working directory when it exists. A file that
    /// was named explicitly (either way) must be readable.
    pub fn load(explicit_path: Option<&Path>) -> Result<Self, ConfigError> {

        let named = explicit_path
            .map(Path::to_path_buf)
            .or_else(|| env::var_os("GRIDMIX_CONFIG").map(PathBuf::from));

        let contents = match named {
            Some(path) => Some(
                fs::read_to_string(&path).map_err(|source| ConfigError::Read { path, source })?,
            ),
            None => {
                let path = PathBuf::from(DEFAULT_CONFIG_FILE);
                if path.exists() {
                    Some(
                        fs::read_to_string(&path)
                            .map_err(|source| ConfigError::Read { path, source })?,
                    )
                } else {
                    None
                }
            }
        };

        Self::from_sources(contents.as_deref(), &|name| env::var(name).ok())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
