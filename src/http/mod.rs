//! HTTP client with retry and rate limiting
//!
//! The Stack Exchange API throttles aggressively, so every request goes
//! through a token-bucket rate limiter and failed requests are retried
//! with backoff.

mod client;
mod rate_limit;

pub use client::{Backoff, HttpClient, HttpClientConfig, RequestConfig};
pub use rate_limit::{RateLimiter, RateLimiterConfig};
