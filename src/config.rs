//! Pipeline configuration
//!
//! The pipeline is configured from a YAML file. Every field has a default
//! that reproduces a plain Stack Overflow run, so an empty config file (or
//! none at all) is valid.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use url::Url;

// ============================================================================
// Top-Level Pipeline Config
// ============================================================================

/// Complete pipeline configuration loaded from YAML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Base URL of the Stack Exchange API
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Site parameter sent with every request
    #[serde(default = "default_site")]
    pub site: String,

    /// Endpoints to fetch, in order
    #[serde(default = "default_endpoints")]
    pub endpoints: Vec<EndpointConfig>,

    /// HTTP client settings
    #[serde(default)]
    pub http: HttpConfig,

    /// Partitioned Parquet output settings
    #[serde(default)]
    pub output: OutputConfig,

    /// Warehouse (DuckDB) settings
    #[serde(default)]
    pub warehouse: WarehouseConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            site: default_site(),
            endpoints: default_endpoints(),
            http: HttpConfig::default(),
            output: OutputConfig::default(),
            warehouse: WarehouseConfig::default(),
        }
    }
}

fn default_base_url() -> String {
    "https://api.stackexchange.com/2.3".to_string()
}

fn default_site() -> String {
    "stackoverflow".to_string()
}

fn default_endpoints() -> Vec<EndpointConfig> {
    vec![
        EndpointConfig::new("tags", "popular"),
        EndpointConfig::new("answers", "activity"),
        EndpointConfig::new("questions", "activity"),
    ]
}

// ============================================================================
// Endpoints
// ============================================================================

/// A single API endpoint to fetch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointConfig {
    /// Endpoint path segment, also the table name (e.g. "tags")
    pub name: String,

    /// Sort key (e.g. "popular", "activity")
    pub sort: String,

    /// Sort order
    #[serde(default = "default_order")]
    pub order: String,

    /// Page size per request (API maximum is 100)
    #[serde(default = "default_pagesize")]
    pub pagesize: u32,

    /// Pages to fetch while the API reports more data
    #[serde(default = "default_max_pages")]
    pub max_pages: u32,
}

impl EndpointConfig {
    /// Create an endpoint config with defaults for order and paging
    pub fn new(name: impl Into<String>, sort: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sort: sort.into(),
            order: default_order(),
            pagesize: default_pagesize(),
            max_pages: default_max_pages(),
        }
    }
}

fn default_order() -> String {
    "desc".to_string()
}

fn default_pagesize() -> u32 {
    100
}

fn default_max_pages() -> u32 {
    1
}

// ============================================================================
// HTTP
// ============================================================================

/// HTTP client settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Maximum retries per request
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Requests per second allowed by the rate limiter
    #[serde(default = "default_requests_per_second")]
    pub requests_per_second: u32,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
            requests_per_second: default_requests_per_second(),
        }
    }
}

impl HttpConfig {
    /// Request timeout as a `Duration`
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_retries() -> u32 {
    3
}

fn default_requests_per_second() -> u32 {
    // The Stack Exchange API throttles around 30 req/s per IP
    10
}

// ============================================================================
// Output
// ============================================================================

/// Partitioned Parquet output settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Destination URL: local path, s3://bucket/prefix, gs://, az://
    #[serde(default = "default_destination")]
    pub destination: String,

    /// Record field used for Hive partitioning
    #[serde(default = "default_partition_field")]
    pub partition_field: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            destination: default_destination(),
            partition_field: default_partition_field(),
        }
    }
}

fn default_destination() -> String {
    "./data".to_string()
}

fn default_partition_field() -> String {
    "creation_date".to_string()
}

// ============================================================================
// Warehouse
// ============================================================================

/// Warehouse (DuckDB) settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WarehouseConfig {
    /// Database file path; ":memory:" for an in-memory database
    #[serde(default = "default_database")]
    pub database: String,
}

impl Default for WarehouseConfig {
    fn default() -> Self {
        Self {
            database: default_database(),
        }
    }
}

fn default_database() -> String {
    "stackfeed.duckdb".to_string()
}

// ============================================================================
// Loading and validation
// ============================================================================

impl PipelineConfig {
    /// Load configuration from a YAML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            Error::config(format!(
                "Failed to read config file {}: {e}",
                path.as_ref().display()
            ))
        })?;
        Self::from_str(&content)
    }

    /// Parse configuration from a YAML string
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        Url::parse(&self.base_url)
            .map_err(|e| Error::invalid_config("base_url", e.to_string()))?;

        if self.endpoints.is_empty() {
            return Err(Error::invalid_config(
                "endpoints",
                "at least one endpoint is required",
            ));
        }

        for endpoint in &self.endpoints {
            if endpoint.name.is_empty() {
                return Err(Error::invalid_config("endpoints.name", "must not be empty"));
            }
            if endpoint.pagesize == 0 || endpoint.pagesize > 100 {
                return Err(Error::invalid_config(
                    "endpoints.pagesize",
                    format!(
                        "'{}' has pagesize {}, must be 1..=100",
                        endpoint.name, endpoint.pagesize
                    ),
                ));
            }
            if endpoint.max_pages == 0 {
                return Err(Error::invalid_config(
                    "endpoints.max_pages",
                    format!("'{}' has max_pages 0, must be at least 1", endpoint.name),
                ));
            }
        }

        if self.http.requests_per_second == 0 {
            return Err(Error::invalid_config(
                "http.requests_per_second",
                "must be at least 1",
            ));
        }

        Ok(())
    }
}
