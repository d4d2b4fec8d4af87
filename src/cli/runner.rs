//! CLI runner - executes commands

use crate::api::StackClient;
use crate::cli::commands::{Cli, Commands};
use crate::config::PipelineConfig;
use crate::error::{Error, Result};
use crate::pipeline::{EndpointStatus, Pipeline};
use crate::reports;
use crate::warehouse::Warehouse;

/// CLI runner
pub struct Runner {
    cli: Cli,
}

impl Runner {
    /// Create a new runner
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Run the CLI command
    pub async fn run(&self) -> Result<()> {
        match &self.cli.command {
            Commands::Run => self.run_pipeline().await,
            Commands::Fetch { endpoint } => self.fetch(endpoint).await,
            Commands::Report => self.report(),
            Commands::Validate => self.validate(),
        }
    }

    /// Load configuration, falling back to the built-in defaults when no
    /// file is given, and apply CLI overrides.
    fn load_config(&self) -> Result<PipelineConfig> {
        let mut config = match &self.cli.config {
            Some(path) => PipelineConfig::load(path)?,
            None => PipelineConfig::default(),
        };

        if let Some(output) = &self.cli.output {
            config.output.destination.clone_from(output);
        }

        config.validate()?;
        Ok(config)
    }

    /// Run the full pipeline
    async fn run_pipeline(&self) -> Result<()> {
        let config = self.load_config()?;
        let pipeline = Pipeline::new(config)?;
        let run = pipeline.run().await?;

        for outcome in &run.endpoints {
            match &outcome.status {
                EndpointStatus::Loaded {
                    records,
                    partitions,
                    table_created,
                } => {
                    println!(
                        "{}: {} records, {} partitions{}",
                        outcome.endpoint,
                        records,
                        partitions,
                        if *table_created {
                            ""
                        } else {
                            " (table already existed, left as-is)"
                        }
                    );
                }
                EndpointStatus::Empty => {
                    println!("{}: no records", outcome.endpoint);
                }
                EndpointStatus::Failed { error } => {
                    println!("{}: FAILED ({error})", outcome.endpoint);
                }
            }
        }

        println!();
        for result in &run.reports {
            println!("{}", reports::render(result));
        }

        if run.loaded() == 0 && run.failed() > 0 {
            return Err(Error::output("all endpoints failed"));
        }
        Ok(())
    }

    /// Fetch one endpoint and print its records as JSON lines
    async fn fetch(&self, endpoint: &str) -> Result<()> {
        let config = self.load_config()?;
        let endpoint_config = config
            .endpoints
            .iter()
            .find(|e| e.name == endpoint)
            .ok_or_else(|| Error::config(format!("Unknown endpoint: {endpoint}")))?;

        let client = StackClient::new(&config)?;
        let records = client.fetch(endpoint_config).await?;

        for record in &records {
            println!("{}", serde_json::to_string(record).unwrap_or_default());
        }
        Ok(())
    }

    /// Run the reports against the configured warehouse
    fn report(&self) -> Result<()> {
        let config = self.load_config()?;
        let warehouse = Warehouse::open(&config.warehouse.database)?;
        let results = reports::run_all(&warehouse)?;

        if results.is_empty() {
            println!("no tables loaded, nothing to report");
            return Ok(());
        }
        for result in &results {
            println!("{}", reports::render(result));
        }
        Ok(())
    }

    /// Validate the configuration file
    fn validate(&self) -> Result<()> {
        let config = self.load_config()?;
        println!(
            "Configuration is valid: {} endpoints, site '{}', destination '{}'",
            config.endpoints.len(),
            config.site,
            config.output.destination
        );
        Ok(())
    }
}
