//! Partitioned Parquet output
//!
//! Each endpoint is written under `{endpoint}_delta/` at the destination,
//! Hive-partitioned on the record's creation date. Writes are overwrite-mode:
//! the endpoint prefix is cleared first, so a re-run with the same input
//! produces the same files.

mod store;
mod writer;

pub use store::{partition_key, partition_path, Destination, PartitionedWrite, DEFAULT_PARTITION};
pub use writer::{batch_to_parquet_bytes, write_batch_to_file, ParquetWriterConfig};

#[cfg(test)]
mod tests;
