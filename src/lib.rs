// Allow common clippy pedantic lints that aren't critical for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_lossless)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::unused_self)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::needless_pass_by_value)]

//! # stackfeed
//!
//! Ingestion pipeline for Stack Exchange API data.
//!
//! Fetches tags, answers, and questions from the Stack Exchange API,
//! loads them into a local DuckDB warehouse, writes date-partitioned
//! Parquet files to local or cloud object storage, and runs a fixed set
//! of descriptive reports.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use stackfeed::config::PipelineConfig;
//! use stackfeed::pipeline::Pipeline;
//!
//! #[tokio::main]
//! async fn main() -> stackfeed::Result<()> {
//!     let config = PipelineConfig::load("stackfeed.yaml")?;
//!     let pipeline = Pipeline::new(config)?;
//!     let run = pipeline.run().await?;
//!     println!("loaded {} endpoints", run.loaded());
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]
#![allow(missing_docs)]

/// Error types
pub mod error;

/// Pipeline configuration
pub mod config;

/// Stack Exchange API record types
pub mod models;

/// HTTP client with retry and rate limiting
pub mod http;

/// Stack Exchange API client
pub mod api;

/// JSON records to Arrow tables
pub mod tabular;

/// Partitioned Parquet output to object storage
pub mod output;

/// DuckDB warehouse
pub mod warehouse;

/// Descriptive reporting queries
pub mod reports;

/// End-to-end pipeline
pub mod pipeline;

/// Command-line interface
pub mod cli;

pub use error::{Error, Result};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
