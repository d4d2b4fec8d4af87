//! Object storage destinations and Hive-partitioned layout

use super::writer::{batch_to_parquet_bytes, ParquetWriterConfig};
use crate::error::{Error, Result};
use crate::tabular::{infer_schema, records_to_batch};
use bytes::Bytes;
use futures::TryStreamExt;
use object_store::aws::AmazonS3Builder;
use object_store::azure::MicrosoftAzureBuilder;
use object_store::gcp::GoogleCloudStorageBuilder;
use object_store::local::LocalFileSystem;
use object_store::path::Path as ObjectPath;
use object_store::ObjectStore;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info};

/// Hive's partition directory for records without a partition value
pub const DEFAULT_PARTITION: &str = "__HIVE_DEFAULT_PARTITION__";

/// Derive the partition key for one record.
///
/// Epoch-second values become a UTC date; values already in string form are
/// used verbatim; missing or unusable values fall back to the Hive default
/// partition.
pub fn partition_key(record: &Value, partition_field: &str) -> String {
    match record.get(partition_field) {
        Some(Value::Number(n)) => n
            .as_i64()
            .and_then(|secs| chrono::DateTime::from_timestamp(secs, 0))
            .map_or_else(
                || DEFAULT_PARTITION.to_string(),
                |dt| dt.format("%Y-%m-%d").to_string(),
            ),
        Some(Value::String(s)) if !s.is_empty() => s.clone(),
        _ => DEFAULT_PARTITION.to_string(),
    }
}

/// Build the object path for one partition's data file
///
/// Layout: `{endpoint}_delta/{field}={value}/part-00000.parquet`
pub fn partition_path(endpoint: &str, partition_field: &str, partition_value: &str) -> String {
    format!("{endpoint}_delta/{partition_field}={partition_value}/part-00000.parquet")
}

/// Result of a partitioned write
#[derive(Debug, Clone)]
pub struct PartitionedWrite {
    /// Records written
    pub records: usize,
    /// Partition directories written
    pub partitions: usize,
    /// Full paths of the written files
    pub paths: Vec<String>,
}

/// A parsed output destination backed by an object store
#[derive(Clone)]
pub struct Destination {
    store: Arc<dyn ObjectStore>,
    prefix: String,
    scheme: String,
}

impl Destination {
    /// Parse a destination URL and create the matching object store.
    ///
    /// Supported formats:
    /// - `s3://bucket/path` - AWS S3 (credentials from environment)
    /// - `gs://bucket/path` - Google Cloud Storage
    /// - `az://container/path` - Azure Blob Storage
    /// - anything else - local filesystem path, created if missing
    pub fn parse(url: &str) -> Result<Self> {
        if let Some(rest) = url.strip_prefix("s3://") {
            let (bucket, prefix) = split_bucket(rest);
            let store = AmazonS3Builder::from_env()
                .with_bucket_name(bucket)
                .build()
                .map_err(|e| Error::config(format!("Failed to create S3 client: {e}")))?;
            Ok(Self {
                store: Arc::new(store),
                prefix,
                scheme: "s3".to_string(),
            })
        } else if let Some(rest) = url.strip_prefix("gs://") {
            let (bucket, prefix) = split_bucket(rest);
            let store = GoogleCloudStorageBuilder::from_env()
                .with_bucket_name(bucket)
                .build()
                .map_err(|e| Error::config(format!("Failed to create GCS client: {e}")))?;
            Ok(Self {
                store: Arc::new(store),
                prefix,
                scheme: "gs".to_string(),
            })
        } else if let Some(rest) = url.strip_prefix("az://") {
            let (container, prefix) = split_bucket(rest);
            let store = MicrosoftAzureBuilder::from_env()
                .with_container_name(container)
                .build()
                .map_err(|e| Error::config(format!("Failed to create Azure client: {e}")))?;
            Ok(Self {
                store: Arc::new(store),
                prefix,
                scheme: "az".to_string(),
            })
        } else {
            let path = url.strip_prefix("file://").unwrap_or(url);
            std::fs::create_dir_all(path)
                .map_err(|e| Error::config(format!("Failed to create directory {path}: {e}")))?;
            let store = LocalFileSystem::new_with_prefix(path)
                .map_err(|e| Error::config(format!("Failed to create local store: {e}")))?;
            Ok(Self {
                store: Arc::new(store),
                prefix: String::new(),
                scheme: "file".to_string(),
            })
        }
    }

    /// Check if this is a cloud destination (not local)
    pub fn is_cloud(&self) -> bool {
        self.scheme != "file"
    }

    /// Get the scheme (s3, gs, az, file)
    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    /// Write one endpoint's records as Hive-partitioned Parquet, in
    /// overwrite mode.
    ///
    /// The schema is inferred once over all records so every partition file
    /// carries identical columns, then the endpoint prefix is cleared and
    /// each partition group written as a single file.
    pub async fn write_partitioned(
        &self,
        endpoint: &str,
        records: &[Value],
        partition_field: &str,
    ) -> Result<PartitionedWrite> {
        let schema = infer_schema(records);

        let mut groups: BTreeMap<String, Vec<Value>> = BTreeMap::new();
        for record in records {
            groups
                .entry(partition_key(record, partition_field))
                .or_default()
                .push(record.clone());
        }

        // Overwrite mode: clear everything under the endpoint prefix first
        self.delete_prefix(&format!("{endpoint}_delta")).await?;

        let parquet_config = ParquetWriterConfig::default();
        let mut paths = Vec::with_capacity(groups.len());

        for (partition_value, group) in &groups {
            let batch = records_to_batch(group, Some(&schema))?;
            let data = batch_to_parquet_bytes(&batch, &parquet_config)?;
            let path = partition_path(endpoint, partition_field, partition_value);
            let written = self.put(&path, data).await?;
            debug!(partition = %partition_value, rows = group.len(), "wrote partition");
            paths.push(written);
        }

        info!(
            endpoint,
            records = records.len(),
            partitions = groups.len(),
            "partitioned write complete"
        );

        Ok(PartitionedWrite {
            records: records.len(),
            partitions: groups.len(),
            paths,
        })
    }

    /// Write bytes to a path in the destination, returning the full path
    pub async fn put(&self, path: &str, data: Bytes) -> Result<String> {
        let full = self.object_path(path);
        self.store.put(&full, data.into()).await?;
        Ok(format!("{}://{full}", self.scheme))
    }

    /// Delete every object under a prefix
    pub async fn delete_prefix(&self, prefix: &str) -> Result<()> {
        let full = self.object_path(prefix);
        let locations: Vec<ObjectPath> = self
            .store
            .list(Some(&full))
            .map_ok(|meta| meta.location)
            .try_collect()
            .await?;

        for location in &locations {
            self.store.delete(location).await?;
        }

        if !locations.is_empty() {
            debug!(prefix = %full, deleted = locations.len(), "cleared prefix");
        }
        Ok(())
    }

    /// List object paths under a prefix (relative to the destination)
    pub async fn list(&self, prefix: &str) -> Result<Vec<String>> {
        let full = self.object_path(prefix);
        let locations: Vec<String> = self
            .store
            .list(Some(&full))
            .map_ok(|meta| meta.location.to_string())
            .try_collect()
            .await?;
        Ok(locations)
    }

    fn object_path(&self, path: &str) -> ObjectPath {
        if self.prefix.is_empty() {
            ObjectPath::from(path)
        } else {
            ObjectPath::from(format!("{}/{path}", self.prefix.trim_end_matches('/')))
        }
    }
}

impl std::fmt::Debug for Destination {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Destination")
            .field("scheme", &self.scheme)
            .field("prefix", &self.prefix)
            .finish_non_exhaustive()
    }
}

/// Split "bucket/rest/of/prefix" into bucket and prefix
fn split_bucket(rest: &str) -> (&str, String) {
    match rest.find('/') {
        Some(idx) => (&rest[..idx], rest[idx + 1..].to_string()),
        None => (rest, String::new()),
    }
}
