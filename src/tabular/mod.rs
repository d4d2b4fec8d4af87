//! JSON records to Arrow conversion
//!
//! The API returns untyped JSON objects, so the table schema is inferred by
//! unioning field types over every record. All fields are nullable; mixed
//! Int64/Float64 widens to Float64 and any other conflict falls back to Utf8.

use crate::error::{Error, Result};
use arrow::array::{
    ArrayRef, BooleanArray, Float64Array, Int64Array, ListArray, NullArray, StringArray,
    StructArray,
};
use arrow::buffer::OffsetBuffer;
use arrow::datatypes::{DataType, Field, Fields, Schema};
use arrow::record_batch::RecordBatch;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Infer an Arrow schema from a set of JSON records.
///
/// Field order is alphabetical so the same input always produces the same
/// schema regardless of record order.
pub fn infer_schema(records: &[Value]) -> Schema {
    let mut field_types: BTreeMap<String, DataType> = BTreeMap::new();

    for record in records {
        if let Value::Object(obj) = record {
            for (key, value) in obj {
                let inferred = infer_type(value);
                field_types
                    .entry(key.clone())
                    .and_modify(|existing| *existing = unify_types(existing, &inferred))
                    .or_insert(inferred);
            }
        }
    }

    let fields: Vec<Field> = field_types
        .into_iter()
        .map(|(name, dtype)| Field::new(name, resolve_null(dtype), true))
        .collect();

    Schema::new(fields)
}

/// Parquet cannot store a pure null column, so a field that never held a
/// value is stored as a nullable string.
fn resolve_null(dtype: DataType) -> DataType {
    match dtype {
        DataType::Null => DataType::Utf8,
        DataType::List(field) => DataType::List(Arc::new(Field::new(
            "item",
            resolve_null(field.data_type().clone()),
            true,
        ))),
        DataType::Struct(fields) => {
            let resolved: Vec<Field> = fields
                .iter()
                .map(|f| Field::new(f.name(), resolve_null(f.data_type().clone()), true))
                .collect();
            DataType::Struct(Fields::from(resolved))
        }
        other => other,
    }
}

/// Convert JSON records to an Arrow RecordBatch.
///
/// Uses the provided schema, or infers one from the records.
pub fn records_to_batch(records: &[Value], schema: Option<&Schema>) -> Result<RecordBatch> {
    let inferred;
    let schema = match schema {
        Some(s) => s,
        None => {
            inferred = infer_schema(records);
            &inferred
        }
    };

    if records.is_empty() {
        return Ok(RecordBatch::new_empty(Arc::new(schema.clone())));
    }

    let mut columns: Vec<ArrayRef> = Vec::with_capacity(schema.fields().len());
    for field in schema.fields() {
        let cells: Vec<Option<&Value>> = records
            .iter()
            .map(|record| record.as_object().and_then(|obj| obj.get(field.name())))
            .collect();
        columns.push(build_column(&cells, field.data_type())?);
    }

    RecordBatch::try_new(Arc::new(schema.clone()), columns).map_err(|e| Error::Output {
        message: format!("Failed to create RecordBatch: {e}"),
    })
}

/// Infer the Arrow type of a single JSON value
fn infer_type(value: &Value) -> DataType {
    match value {
        Value::Null => DataType::Null,
        Value::Bool(_) => DataType::Boolean,
        Value::Number(n) => {
            if n.is_i64() {
                DataType::Int64
            } else {
                DataType::Float64
            }
        }
        Value::String(_) => DataType::Utf8,
        Value::Array(arr) => {
            let element = arr
                .iter()
                .find(|v| !v.is_null())
                .map_or(DataType::Null, infer_type);
            DataType::List(Arc::new(Field::new("item", element, true)))
        }
        Value::Object(obj) => {
            let fields: Vec<Field> = obj
                .iter()
                .map(|(k, v)| Field::new(k, infer_type(v), true))
                .collect();
            DataType::Struct(Fields::from(fields))
        }
    }
}

/// Unify two inferred types into one both can load into
fn unify_types(a: &DataType, b: &DataType) -> DataType {
    match (a, b) {
        (a, b) if a == b => a.clone(),

        (DataType::Null, other) | (other, DataType::Null) => other.clone(),

        (DataType::Int64, DataType::Float64) | (DataType::Float64, DataType::Int64) => {
            DataType::Float64
        }

        (DataType::List(fa), DataType::List(fb)) => {
            let item = unify_types(fa.data_type(), fb.data_type());
            DataType::List(Arc::new(Field::new("item", item, true)))
        }

        (DataType::Struct(fa), DataType::Struct(fb)) => {
            let mut merged: BTreeMap<String, DataType> = fa
                .iter()
                .map(|f| (f.name().clone(), f.data_type().clone()))
                .collect();
            for f in fb {
                merged
                    .entry(f.name().clone())
                    .and_modify(|existing| *existing = unify_types(existing, f.data_type()))
                    .or_insert_with(|| f.data_type().clone());
            }
            let fields: Vec<Field> = merged
                .into_iter()
                .map(|(name, dtype)| Field::new(name, dtype, true))
                .collect();
            DataType::Struct(Fields::from(fields))
        }

        // Anything else degrades to a string representation
        _ => DataType::Utf8,
    }
}

/// Build one Arrow column from per-record JSON cells
fn build_column(cells: &[Option<&Value>], data_type: &DataType) -> Result<ArrayRef> {
    match data_type {
        DataType::Null => Ok(Arc::new(NullArray::new(cells.len()))),

        DataType::Boolean => {
            let arr: BooleanArray = cells.iter().map(|v| v.and_then(Value::as_bool)).collect();
            Ok(Arc::new(arr))
        }

        DataType::Int64 => {
            let arr: Int64Array = cells.iter().map(|v| v.and_then(Value::as_i64)).collect();
            Ok(Arc::new(arr))
        }

        DataType::Float64 => {
            #[allow(clippy::cast_precision_loss)]
            let arr: Float64Array = cells
                .iter()
                .map(|v| v.and_then(|v| v.as_f64().or_else(|| v.as_i64().map(|i| i as f64))))
                .collect();
            Ok(Arc::new(arr))
        }

        DataType::Utf8 => {
            let arr: StringArray = cells
                .iter()
                .map(|v| match v {
                    Some(Value::String(s)) => Some(s.clone()),
                    Some(Value::Null) | None => None,
                    Some(other) => Some(other.to_string()),
                })
                .collect();
            Ok(Arc::new(arr))
        }

        DataType::List(field) => build_list_column(cells, field),

        DataType::Struct(fields) => build_struct_column(cells, fields),

        other => Err(Error::Output {
            message: format!("Unsupported column type: {other}"),
        }),
    }
}

/// Build a list column from JSON arrays
fn build_list_column(cells: &[Option<&Value>], field: &Arc<Field>) -> Result<ArrayRef> {
    let mut items: Vec<Option<&Value>> = Vec::new();
    let mut offsets: Vec<i32> = vec![0];

    for cell in cells {
        if let Some(Value::Array(arr)) = cell {
            items.extend(arr.iter().map(Some));
        }
        let offset = i32::try_from(items.len()).map_err(|_| Error::Output {
            message: "Array too large for i32 offset".to_string(),
        })?;
        offsets.push(offset);
    }

    let values = build_column(&items, field.data_type())?;
    let list = ListArray::new(Arc::clone(field), OffsetBuffer::new(offsets.into()), values, None);
    Ok(Arc::new(list))
}

/// Build a struct column from nested JSON objects
fn build_struct_column(cells: &[Option<&Value>], fields: &Fields) -> Result<ArrayRef> {
    let mut children: Vec<ArrayRef> = Vec::with_capacity(fields.len());

    for field in fields {
        let nested: Vec<Option<&Value>> = cells
            .iter()
            .map(|cell| {
                cell.and_then(|v| v.as_object())
                    .and_then(|obj| obj.get(field.name()))
            })
            .collect();
        children.push(build_column(&nested, field.data_type())?);
    }

    let nulls = arrow::buffer::NullBuffer::from(
        cells
            .iter()
            .map(|cell| matches!(cell, Some(Value::Object(_))))
            .collect::<Vec<bool>>(),
    );

    Ok(Arc::new(StructArray::new(fields.clone(), children, Some(nulls))))
}
