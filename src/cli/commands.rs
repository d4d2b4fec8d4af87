//! CLI commands and argument parsing

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Stack Exchange ingestion pipeline CLI
#[derive(Parser, Debug)]
#[command(name = "stackfeed")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Pipeline configuration file (YAML)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Output destination override (local path or cloud URL)
    /// Supports: /path, s3://bucket/path, gs://bucket/path, az://container/path
    #[arg(short, long, global = true)]
    pub output: Option<String>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the full pipeline: fetch, load, write, report
    Run,

    /// Fetch a single endpoint and print its records as JSON lines
    Fetch {
        /// Endpoint name from the configuration (tags, answers, questions)
        endpoint: String,
    },

    /// Run the reports against an existing warehouse
    Report,

    /// Validate the configuration file
    Validate,
}
