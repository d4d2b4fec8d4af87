//! End-to-end ingestion pipeline
//!
//! Orchestrates the run: fetch each configured endpoint, load the records
//! into the warehouse, write the partitioned Parquet output, then execute
//! the report queries. Endpoints that fail to fetch are logged and skipped,
//! never aborting the rest of the run.

use crate::api::StackClient;
use crate::config::PipelineConfig;
use crate::error::Result;
use crate::output::Destination;
use crate::reports::{self, ReportResult};
use crate::tabular::records_to_batch;
use crate::warehouse::Warehouse;
use tracing::{info, warn};

/// What happened to one endpoint during a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EndpointStatus {
    /// Fetched, loaded into the warehouse, and written to the destination
    Loaded {
        /// Records fetched from the API
        records: usize,
        /// Partition directories written
        partitions: usize,
        /// Whether the warehouse table was created (false when it already
        /// existed and was left untouched)
        table_created: bool,
    },
    /// Fetched successfully but returned no records
    Empty,
    /// Fetch failed; nothing downstream happened for this endpoint
    Failed {
        /// The fetch error
        error: String,
    },
}

/// Per-endpoint outcome
#[derive(Debug, Clone)]
pub struct EndpointOutcome {
    /// Endpoint name (tags, answers, questions)
    pub endpoint: String,
    /// What happened
    pub status: EndpointStatus,
}

/// Full result of a pipeline run
#[derive(Debug)]
pub struct PipelineRun {
    /// One outcome per configured endpoint, in configuration order
    pub endpoints: Vec<EndpointOutcome>,
    /// Executed reports, in definition order
    pub reports: Vec<ReportResult>,
}

impl PipelineRun {
    /// Number of endpoints that were fetched and loaded
    pub fn loaded(&self) -> usize {
        self.endpoints
            .iter()
            .filter(|o| matches!(o.status, EndpointStatus::Loaded { .. }))
            .count()
    }

    /// Number of endpoints that failed to fetch
    pub fn failed(&self) -> usize {
        self.endpoints
            .iter()
            .filter(|o| matches!(o.status, EndpointStatus::Failed { .. }))
            .count()
    }
}

/// The ingestion pipeline
pub struct Pipeline {
    config: PipelineConfig,
    client: StackClient,
    destination: Destination,
    warehouse: Warehouse,
}

impl Pipeline {
    /// Build a pipeline from configuration
    pub fn new(config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        let client = StackClient::new(&config)?;
        let destination = Destination::parse(&config.output.destination)?;
        let warehouse = Warehouse::open(&config.warehouse.database)?;
        Ok(Self {
            config,
            client,
            destination,
            warehouse,
        })
    }

    /// Build a pipeline from pre-constructed parts
    pub fn from_parts(
        config: PipelineConfig,
        client: StackClient,
        destination: Destination,
        warehouse: Warehouse,
    ) -> Self {
        Self {
            config,
            client,
            destination,
            warehouse,
        }
    }

    /// Access the warehouse, for querying after a run
    pub fn warehouse(&self) -> &Warehouse {
        &self.warehouse
    }

    /// Run the full pipeline: fetch, load, write, report
    pub async fn run(&self) -> Result<PipelineRun> {
        let mut endpoints = Vec::with_capacity(self.config.endpoints.len());

        for endpoint in &self.config.endpoints {
            let status = self.run_endpoint(endpoint).await;
            endpoints.push(EndpointOutcome {
                endpoint: endpoint.name.clone(),
                status,
            });
        }

        let reports = reports::run_all(&self.warehouse)?;

        Ok(PipelineRun { endpoints, reports })
    }

    /// Fetch one endpoint and push it through the warehouse and the
    /// destination. Fetch errors are absorbed into the outcome.
    async fn run_endpoint(&self, endpoint: &crate::config::EndpointConfig) -> EndpointStatus {
        let records = match self.client.fetch(endpoint).await {
            Ok(records) => records,
            Err(e) => {
                warn!(endpoint = %endpoint.name, error = %e, "fetch failed, skipping endpoint");
                return EndpointStatus::Failed {
                    error: e.to_string(),
                };
            }
        };

        if records.is_empty() {
            info!(endpoint = %endpoint.name, "no records returned, nothing to load");
            return EndpointStatus::Empty;
        }

        match self.load_and_write(&endpoint.name, &records).await {
            Ok((table_created, partitions)) => EndpointStatus::Loaded {
                records: records.len(),
                partitions,
                table_created,
            },
            Err(e) => {
                warn!(endpoint = %endpoint.name, error = %e, "load failed, skipping endpoint");
                EndpointStatus::Failed {
                    error: e.to_string(),
                }
            }
        }
    }

    async fn load_and_write(
        &self,
        name: &str,
        records: &[serde_json::Value],
    ) -> Result<(bool, usize)> {
        let batch = records_to_batch(records, None)?;
        let table_created = self.warehouse.load_table(name, &batch)?;

        let write = self
            .destination
            .write_partitioned(name, records, &self.config.output.partition_field)
            .await?;

        info!(
            endpoint = name,
            records = records.len(),
            partitions = write.partitions,
            table_created,
            "endpoint complete"
        );

        Ok((table_created, write.partitions))
    }
}
