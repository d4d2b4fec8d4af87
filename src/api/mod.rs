//! Stack Exchange API fetcher
//!
//! One client per pipeline run. Each endpoint is fetched with its configured
//! `order`/`sort`/`site` parameters; paging follows the API's `has_more`
//! flag up to the endpoint's `max_pages`, and the `backoff` field is honored
//! between pages.

use crate::config::{EndpointConfig, PipelineConfig};
use crate::error::{Error, Result};
use crate::http::{HttpClient, HttpClientConfig, RateLimiterConfig, RequestConfig};
use crate::models::{self, ApiResponse};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info};

/// Client for the Stack Exchange web API
pub struct StackClient {
    http: HttpClient,
    site: String,
}

impl StackClient {
    /// Create a client from the pipeline configuration
    pub fn new(config: &PipelineConfig) -> Result<Self> {
        let http_config = HttpClientConfig::builder()
            .base_url(&config.base_url)
            .timeout(config.http.timeout())
            .max_retries(config.http.max_retries)
            .rate_limit(RateLimiterConfig::new(
                config.http.requests_per_second,
                config.http.requests_per_second,
            ))
            .build();

        Ok(Self {
            http: HttpClient::with_config(http_config)?,
            site: config.site.clone(),
        })
    }

    /// Create a client against an explicit base URL (used by tests)
    pub fn with_base_url(base_url: impl Into<String>, site: impl Into<String>) -> Result<Self> {
        let http_config = HttpClientConfig::builder()
            .base_url(base_url)
            .no_rate_limit()
            .build();

        Ok(Self {
            http: HttpClient::with_config(http_config)?,
            site: site.into(),
        })
    }

    /// Fetch all configured pages of an endpoint and return its items.
    ///
    /// Fails if the API reports an error or a page has no `items` field.
    pub async fn fetch(&self, endpoint: &EndpointConfig) -> Result<Vec<Value>> {
        let mut all_items = Vec::new();

        for page in 1..=endpoint.max_pages {
            let response = self.fetch_page(endpoint, page).await?;

            if let Some(error_id) = response.error_id {
                return Err(Error::Api {
                    endpoint: endpoint.name.clone(),
                    error_id,
                    message: response.error_message.unwrap_or_default(),
                });
            }

            let items = response
                .items
                .ok_or_else(|| Error::missing_items(&endpoint.name))?;

            debug!(
                endpoint = %endpoint.name,
                page,
                count = items.len(),
                quota_remaining = ?response.quota_remaining,
                "fetched page"
            );
            all_items.extend(items);

            if !response.has_more {
                break;
            }

            // The API asks clients to pause before the next request to the
            // same method when it returns a backoff value.
            if let Some(seconds) = response.backoff {
                info!(
                    endpoint = %endpoint.name,
                    seconds, "API requested backoff"
                );
                tokio::time::sleep(Duration::from_secs(seconds)).await;
            }
        }

        info!(
            endpoint = %endpoint.name,
            count = all_items.len(),
            "fetch complete"
        );
        models::normalize(&endpoint.name, all_items)
    }

    /// Fetch a single page of an endpoint
    async fn fetch_page(&self, endpoint: &EndpointConfig, page: u32) -> Result<ApiResponse> {
        let request = RequestConfig::new()
            .query("order", &endpoint.order)
            .query("sort", &endpoint.sort)
            .query("site", &self.site)
            .query("page", page.to_string())
            .query("pagesize", endpoint.pagesize.to_string());

        let response = self.http.get_with_config(&endpoint.name, request).await?;
        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }
}

impl std::fmt::Debug for StackClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StackClient")
            .field("site", &self.site)
            .finish_non_exhaustive()
    }
}
