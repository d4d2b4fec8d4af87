//! Tests for partitioned Parquet output

use super::*;
use crate::tabular::records_to_batch;
use pretty_assertions::assert_eq;
use serde_json::json;
use test_case::test_case;

// 2023-11-14T22:13:20Z
const EPOCH: i64 = 1_700_000_000;

#[test_case(json!({"creation_date": EPOCH}), "2023-11-14"; "epoch seconds")]
#[test_case(json!({"creation_date": "2024-01-01"}), "2024-01-01"; "string passthrough")]
#[test_case(json!({"creation_date": null}), DEFAULT_PARTITION; "null value")]
#[test_case(json!({"name": "rust"}), DEFAULT_PARTITION; "missing field")]
fn test_partition_key(record: serde_json::Value, expected: &str) {
    assert_eq!(partition_key(&record, "creation_date"), expected);
}

#[test]
fn test_partition_path_layout() {
    assert_eq!(
        partition_path("answers", "creation_date", "2023-11-14"),
        "answers_delta/creation_date=2023-11-14/part-00000.parquet"
    );
}

#[test]
fn test_parse_local_destination() {
    let dir = tempfile::tempdir().unwrap();
    let dest = Destination::parse(dir.path().to_str().unwrap()).unwrap();
    assert_eq!(dest.scheme(), "file");
    assert!(!dest.is_cloud());
}

#[test]
fn test_parquet_bytes_roundtrip_header() {
    let batch = records_to_batch(&[json!({"a": 1})], None).unwrap();
    let bytes = batch_to_parquet_bytes(&batch, &ParquetWriterConfig::default()).unwrap();
    // Parquet files start and end with the PAR1 magic
    assert_eq!(&bytes[..4], b"PAR1");
    assert_eq!(&bytes[bytes.len() - 4..], b"PAR1");
}

#[tokio::test]
async fn test_write_partitioned_groups_by_date() {
    let dir = tempfile::tempdir().unwrap();
    let dest = Destination::parse(dir.path().to_str().unwrap()).unwrap();

    let records = vec![
        json!({"answer_id": 1, "creation_date": EPOCH}),
        json!({"answer_id": 2, "creation_date": EPOCH}),
        json!({"answer_id": 3, "creation_date": EPOCH + 86_400}),
        json!({"answer_id": 4}),
    ];

    let result = dest
        .write_partitioned("answers", &records, "creation_date")
        .await
        .unwrap();

    assert_eq!(result.records, 4);
    assert_eq!(result.partitions, 3);

    let mut files = dest.list("answers_delta").await.unwrap();
    files.sort();
    assert_eq!(
        files,
        vec![
            format!("answers_delta/creation_date={DEFAULT_PARTITION}/part-00000.parquet"),
            "answers_delta/creation_date=2023-11-14/part-00000.parquet".to_string(),
            "answers_delta/creation_date=2023-11-15/part-00000.parquet".to_string(),
        ]
    );
}

#[tokio::test]
async fn test_write_partitioned_overwrite_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let dest = Destination::parse(dir.path().to_str().unwrap()).unwrap();

    let first = vec![
        json!({"answer_id": 1, "creation_date": EPOCH}),
        json!({"answer_id": 2, "creation_date": EPOCH + 86_400}),
    ];
    dest.write_partitioned("answers", &first, "creation_date")
        .await
        .unwrap();

    // Second run with fewer partitions must not leave stale files behind
    let second = vec![json!({"answer_id": 1, "creation_date": EPOCH})];
    dest.write_partitioned("answers", &second, "creation_date")
        .await
        .unwrap();

    let files = dest.list("answers_delta").await.unwrap();
    assert_eq!(
        files,
        vec!["answers_delta/creation_date=2023-11-14/part-00000.parquet".to_string()]
    );

    // And writing the same input twice yields the same listing
    dest.write_partitioned("answers", &second, "creation_date")
        .await
        .unwrap();
    assert_eq!(dest.list("answers_delta").await.unwrap(), files);
}

#[tokio::test]
async fn test_write_partitioned_does_not_touch_other_endpoints() {
    let dir = tempfile::tempdir().unwrap();
    let dest = Destination::parse(dir.path().to_str().unwrap()).unwrap();

    let tags = vec![json!({"name": "rust", "count": 1})];
    dest.write_partitioned("tags", &tags, "creation_date")
        .await
        .unwrap();

    let answers = vec![json!({"answer_id": 1, "creation_date": EPOCH})];
    dest.write_partitioned("answers", &answers, "creation_date")
        .await
        .unwrap();

    assert_eq!(dest.list("tags_delta").await.unwrap().len(), 1);
}
