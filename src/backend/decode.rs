//! Blocking decoders for Avro container files and Parquet and ORC data files.
//!
//! Callers run these on the blocking pool.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use apache_avro::types::Value as AvroValue;
use arrow_array::{RecordBatch, RecordBatchReader};
use orc_rust::arrow_reader::ArrowReaderBuilder;
use base64::Engine;
use parquet::file::reader::{FileReader, SerializedFileReader};
use serde_json::{Map, Value};

use super::BackendError;

/// Bytes that are not UTF-8 are rendered as `base64:<data>`.
fn bytes_to_json(bytes: Vec<u8>) -> Value {
    match String::from_utf8(bytes) {
        Ok(text) => Value::String(text),
        Err(err) => Value::String(format!(
            "base64:{}",
            base64::engine::general_purpose::STANDARD.encode(err.into_bytes())
        )),
    }
}

/// Convert a decoded Avro value into JSON, unwrapping unions.
fn avro_to_json(value: AvroValue) -> Value {
    match value {
        AvroValue::Bytes(bytes) | AvroValue::Fixed(_, bytes) => bytes_to_json(bytes),
        AvroValue::Union(_, inner) => avro_to_json(*inner),
        AvroValue::Array(items) => Value::Array(items.into_iter().map(avro_to_json).collect()),
        AvroValue::Map(entries) => Value::Object(
            entries
                .into_iter()
                .map(|(k, v)| (k, avro_to_json(v)))
                .collect::<Map<_, _>>(),
        ),
        AvroValue::Record(fields) => Value::Object(
            fields
                .into_iter()
                .map(|(k, v)| (k, avro_to_json(v)))
                .collect::<Map<_, _>>(),
        ),
        other => Value::try_from(other).unwrap_or(Value::Null),
    }
}

fn avro_error(path: &Path, err: apache_avro::Error) -> BackendError {
    BackendError::Reported(format!(
        "Failed to decode Avro file {}: {}",
        path.display(),
        err
    ))
}

/// Read up to `limit` records of an Avro container file.
///
/// Returns the record field names (taken from the first record) and the
/// records as JSON.
pub(super) fn read_avro_records(
    path: &Path,
    limit: Option<usize>,
) -> Result<(Vec<String>, Vec<Value>), BackendError> {
    let file = File::open(path)?;
    let reader = apache_avro::Reader::new(BufReader::new(file)).map_err(|e| avro_error(path, e))?;

    let mut fields = Vec::new();
    let mut records = Vec::new();
    for value in reader.take(limit.unwrap_or(usize::MAX)) {
        let value = value.map_err(|e| avro_error(path, e))?;
        if records.is_empty() {
            if let AvroValue::Record(ref entries) = value {
                fields = entries.iter().map(|(name, _)| name.clone()).collect();
            }
        }
        records.push(avro_to_json(value));
    }

    Ok((fields, records))
}

/// Read up to `limit` rows of a Parquet file.
pub(super) fn read_parquet_rows(
    path: &Path,
    limit: usize,
) -> Result<(Vec<String>, Vec<Map<String, Value>>), BackendError> {
    let parquet_error = |e: parquet::errors::ParquetError| {
        BackendError::Reported(format!(
            "Failed to read Parquet file {}: {}",
            path.display(),
            e
        ))
    };

    let file = File::open(path)?;
    let reader = SerializedFileReader::new(file).map_err(parquet_error)?;

    let fields: Vec<String> = reader
        .metadata()
        .file_metadata()
        .schema_descr()
        .root_schema()
        .get_fields()
        .iter()
        .map(|f| f.name().to_string())
        .collect();

    let mut rows = Vec::new();
    for row in reader.get_row_iter(None).map_err(parquet_error)?.take(limit) {
        let row = row.map_err(parquet_error)?;
        match row.to_json_value() {
            Value::Object(map) => rows.push(map),
            other => {
                let mut map = Map::new();
                map.insert("value".to_string(), other);
                rows.push(map);
            }
        }
    }

    Ok((fields, rows))
}

/// Read at most `limit` rows of an ORC file through its Arrow reader.
pub(super) fn read_orc_rows(
    path: &Path,
    limit: usize,
) -> Result<(Vec<String>, Vec<Map<String, Value>>), BackendError> {
    let orc_error = |e: &dyn std::fmt::Display| {
        BackendError::Reported(format!("Failed to read ORC file {}: {}", path.display(), e))
    };

    let file = File::open(path)?;
    let reader = ArrowReaderBuilder::try_new(file)
        .map_err(|e| orc_error(&e))?
        .with_batch_size(limit.max(1))
        .build();

    let fields: Vec<String> = reader
        .schema()
        .fields()
        .iter()
        .map(|f| f.name().to_string())
        .collect();

    let mut rows = Vec::new();
    for batch in reader {
        let batch = batch.map_err(|e| orc_error(&e))?;
        let remaining = limit.saturating_sub(rows.len());
        if remaining == 0 {
            break;
        }
        if batch.num_rows() == 0 {
            continue;
        }
        let batch = batch.slice(0, batch.num_rows().min(remaining));
        rows.extend(batch_to_json_rows(&batch).map_err(|e| orc_error(&e))?);
    }

    Ok((fields, rows))
}

fn batch_to_json_rows(
    batch: &RecordBatch,
) -> Result<Vec<Map<String, Value>>, arrow_schema::ArrowError> {
    let mut writer = arrow_json::ArrayWriter::new(Vec::new());
    writer.write(batch)?;
    writer.finish()?;

    serde_json::from_slice(&writer.into_inner())
        .map_err(|e| arrow_schema::ArrowError::JsonError(e.to_string()))
}
