//! Extraction of typed summaries from decoded table files.
//!
//! Table metadata arrives as JSON; manifest lists and manifests arrive as
//! Avro records converted to JSON. Both spellings of keys (`current-snapshot-id`
//! and `current_snapshot_id`) are accepted, and Avro union/array wrappers such
//! as `{"long": 5}` or `{"array": [...]}` are unwrapped.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use super::{ColumnFile, DataFile, MetadataInfo, SnapshotSummary, TableSchema};
use crate::fields::SchemaField;

const UNION_BRANCHES: [&str; 7] = ["long", "int", "float", "double", "string", "bytes", "boolean"];

/// Unwrap a single-branch Avro union such as `{"long": 5}`.
fn unwrap_union(value: &Value) -> &Value {
    if let Value::Object(map) = value {
        if map.len() == 1 {
            if let Some((key, inner)) = map.iter().next() {
                if UNION_BRANCHES.contains(&key.as_str()) {
                    return inner;
                }
            }
        }
    }
    value
}

/// Unwrap an Avro array wrapper `{"array": [...]}`.
fn unwrap_array(value: &Value) -> &Value {
    match value {
        Value::Object(map) => map.get("array").unwrap_or(value),
        _ => value,
    }
}

/// First of `keys` present with a non-null value.
fn get<'a>(obj: &'a Value, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|k| obj.get(*k))
        .map(unwrap_union)
        .find(|v| !v.is_null())
}

fn get_i64(obj: &Value, keys: &[&str]) -> Option<i64> {
    get(obj, keys).and_then(Value::as_i64)
}

fn get_string(obj: &Value, keys: &[&str]) -> Option<String> {
    get(obj, keys).and_then(Value::as_str).map(str::to_string)
}

/// Render a schema type: primitive names as-is, nested types as compact JSON.
fn type_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Fields of a schema object. Entries without a valid 32-bit id are skipped.
pub fn schema_fields(schema: &Value) -> Vec<SchemaField> {
    let Some(fields) = schema.get("fields").and_then(Value::as_array) else {
        return Vec::new();
    };

    fields
        .iter()
        .filter_map(|f| {
            let id = f.get("id").and_then(Value::as_i64)?;
            let id = i32::try_from(id).ok()?;
            Some(SchemaField {
                id,
                name: f.get("name").and_then(Value::as_str).unwrap_or_default().to_string(),
                field_type: f.get("type").map(type_string).unwrap_or_default(),
                required: f.get("required").and_then(Value::as_bool).unwrap_or(false),
                doc: f.get("doc").and_then(Value::as_str).map(str::to_string),
            })
        })
        .collect()
}

/// Pick the element of `list_keys` whose `id_keys` equals the default id, or
/// the first element.
fn select_by_default_id<'a>(
    metadata: &'a Value,
    list_keys: &[&str],
    id_keys: &[&str],
    default_keys: &[&str],
) -> Option<&'a Value> {
    let list = get(metadata, list_keys)?.as_array()?;
    let default_id = get_i64(metadata, default_keys);
    default_id
        .and_then(|wanted| list.iter().find(|item| get_i64(item, id_keys) == Some(wanted)))
        .or_else(|| list.first())
}

/// The schema used to resolve field ids for this metadata version.
///
/// Prefers the single `schema` object of format v1, then the entry of
/// `schemas` matching `current-schema-id`, then the first entry.
pub fn current_schema(metadata: &Value) -> Option<TableSchema> {
    let schema = get(metadata, &["schema"]).or_else(|| {
        select_by_default_id(
            metadata,
            &["schemas"],
            &["schema-id", "schema_id"],
            &["current-schema-id", "current_schema_id"],
        )
    })?;

    Some(TableSchema {
        schema_id: get_i64(schema, &["schema-id", "schema_id"]),
        fields: schema_fields(schema),
    })
}

/// Summarize a table-metadata document.
pub fn metadata_info(metadata: &Value) -> MetadataInfo {
    if !metadata.is_object() {
        return MetadataInfo::default();
    }

    let properties: BTreeMap<String, String> = metadata
        .get("properties")
        .and_then(Value::as_object)
        .map(|props| {
            props
                .iter()
                .map(|(k, v)| {
                    let v = match v {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    };
                    (k.clone(), v)
                })
                .collect()
        })
        .unwrap_or_default();

    MetadataInfo {
        table_uuid: get_string(metadata, &["table-uuid", "table_uuid"]),
        location: get_string(metadata, &["location"]),
        format_version: get_i64(metadata, &["format-version", "format_version"]),
        current_snapshot_id: get_i64(metadata, &["current-snapshot-id", "current_snapshot_id"]),
        snapshots_count: metadata
            .get("snapshots")
            .and_then(Value::as_array)
            .map(Vec::len)
            .unwrap_or(0),
        properties,
        schema: current_schema(metadata),
        partition_spec: select_by_default_id(
            metadata,
            &["partition-specs", "partition_specs"],
            &["spec-id", "spec_id"],
            &["default-spec-id", "default_spec_id"],
        )
        .cloned(),
        sort_order: select_by_default_id(
            metadata,
            &["sort-orders", "sort_orders"],
            &["order-id", "order_id"],
            &["default-sort-order-id", "default_sort_order_id"],
        )
        .cloned(),
    }
}

/// Current snapshot id and the manifest list it points at.
pub fn current_snapshot(metadata: &Value) -> (Option<i64>, Option<String>) {
    let current = get_i64(metadata, &["current-snapshot-id", "current_snapshot_id"]);
    let manifest_list = current.and_then(|wanted| {
        metadata
            .get("snapshots")
            .and_then(Value::as_array)?
            .iter()
            .find(|s| get_i64(s, &["snapshot-id", "snapshot_id"]) == Some(wanted))
            .and_then(|s| get_string(s, &["manifest-list", "manifest_list"]))
    });
    (current, manifest_list)
}

/// Manifest paths referenced by manifest-list records, in record order.
pub fn manifest_paths(records: &[Value]) -> Vec<String> {
    records
        .iter()
        .filter_map(|r| get_string(r, &["manifest_path"]))
        .filter(|p| !p.is_empty())
        .collect()
}

/// Counters of the first manifest-list record.
pub fn snapshot_summary(records: &[Value]) -> SnapshotSummary {
    let Some(first) = records.iter().find(|r| r.is_object()) else {
        return SnapshotSummary::default();
    };

    SnapshotSummary {
        manifest_path: get_string(first, &["manifest_path"]),
        manifest_length: get_i64(first, &["manifest_length"]),
        partition_spec_id: get_i64(first, &["partition_spec_id"]),
        content: get_i64(first, &["content"]),
        sequence_number: get_i64(first, &["sequence_number"]),
        min_sequence_number: get_i64(first, &["min_sequence_number"]),
        added_snapshot_id: get_i64(first, &["added_snapshot_id"]),
        added_data_files_count: get_i64(first, &["added_data_files_count", "added_files_count"]),
        existing_data_files_count: get_i64(
            first,
            &["existing_data_files_count", "existing_files_count"],
        ),
        deleted_data_files_count: get_i64(
            first,
            &["deleted_data_files_count", "deleted_files_count"],
        ),
        added_rows_count: get_i64(first, &["added_rows_count"]),
        existing_rows_count: get_i64(first, &["existing_rows_count"]),
        deleted_rows_count: get_i64(first, &["deleted_rows_count"]),
    }
}

fn column_file(value: &Value) -> ColumnFile {
    let field_ids: Vec<i32> = value
        .get("column_file_ids")
        .map(unwrap_array)
        .and_then(Value::as_array)
        .map(|ids| {
            ids.iter()
                .filter_map(|id| unwrap_union(id).as_i64())
                .filter_map(|id| i32::try_from(id).ok())
                .collect()
        })
        .unwrap_or_default();

    ColumnFile {
        path: get_string(value, &["column_file_path"]),
        length: get_i64(value, &["column_file_length"]),
        record_count: get_i64(value, &["column_file_record_count"]),
        snapshot_id: get_i64(value, &["column_file_snapshot_id"]),
        field_ids,
    }
}

fn data_file(value: &Value) -> DataFile {
    let partition = value
        .get("partition")
        .and_then(Value::as_object)
        .map(|p| {
            p.iter()
                .map(|(k, v)| (k.clone(), unwrap_union(v).clone()))
                .collect::<Map<_, _>>()
        })
        .unwrap_or_default();

    let column_files: Vec<ColumnFile> = value
        .get("column_files")
        .map(unwrap_array)
        .and_then(Value::as_array)
        .map(|files| files.iter().filter(|f| f.is_object()).map(column_file).collect())
        .unwrap_or_default();

    DataFile {
        path: get_string(value, &["file_path"]),
        format: get_string(value, &["file_format"]),
        record_count: get_i64(value, &["record_count"]),
        size_bytes: get_i64(value, &["file_size_in_bytes"]),
        partition,
        column_files,
    }
}

/// Number of manifest entries and the data files they describe.
pub fn manifest_data_files(records: &[Value]) -> (usize, Vec<DataFile>) {
    let entries: Vec<&Value> = records.iter().filter(|r| r.is_object()).collect();
    let data_files: Vec<DataFile> = entries
        .iter()
        .filter_map(|entry| entry.get("data_file"))
        .filter(|df| df.is_object())
        .map(data_file)
        .collect();
    (entries.len(), data_files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_metadata() -> Value {
        json!({
            "format-version": 2,
            "table-uuid": "9c12d441-03fe-4693-9a96-a0705ddf69c1",
            "location": "/warehouse/db/orders",
            "current-schema-id": 1,
            "schemas": [
                {"type": "struct", "schema-id": 0, "fields": [
                    {"id": 1, "name": "old", "required": true, "type": "long"}
                ]},
                {"type": "struct", "schema-id": 1, "fields": [
                    {"id": 1, "name": "id", "required": true, "type": "long"},
                    {"id": 5, "name": "amount", "required": false, "type": "double"},
                    {"id": 6, "name": "tags", "required": false,
                     "type": {"type": "list", "element-id": 7, "element": "string", "element-required": false}}
                ]}
            ],
            "default-spec-id": 0,
            "partition-specs": [{"spec-id": 0, "fields": []}],
            "properties": {"owner": "etl", "write.format.default": "parquet"},
            "current-snapshot-id": 3051729675574597004i64,
            "snapshots": [
                {"snapshot-id": 1, "manifest-list": "file:/warehouse/db/orders/metadata/snap-1.avro"},
                {"snapshot-id": 3051729675574597004i64,
                 "manifest-list": "file:/warehouse/db/orders/metadata/snap-3051729675574597004-1-a.avro"}
            ]
        })
    }

    #[test]
    fn test_metadata_info_uses_current_schema() {
        let info = metadata_info(&sample_metadata());
        assert_eq!(info.format_version, Some(2));
        assert_eq!(info.snapshots_count, 2);
        assert_eq!(info.properties.get("owner").map(String::as_str), Some("etl"));

        let schema = info.schema.unwrap();
        assert_eq!(schema.schema_id, Some(1));
        assert_eq!(schema.fields.len(), 3);
        assert_eq!(schema.fields[1].name, "amount");
        assert_eq!(schema.fields[1].field_type, "double");
        assert!(schema.fields[2].field_type.starts_with('{'));
        assert!(info.partition_spec.is_some());
    }

    #[test]
    fn test_metadata_info_non_object() {
        assert_eq!(metadata_info(&json!([1, 2])), MetadataInfo::default());
    }

    #[test]
    fn test_current_snapshot_manifest_list() {
        let (id, list) = current_snapshot(&sample_metadata());
        assert_eq!(id, Some(3051729675574597004));
        assert_eq!(
            list.as_deref(),
            Some("file:/warehouse/db/orders/metadata/snap-3051729675574597004-1-a.avro")
        );
    }

    #[test]
    fn test_current_snapshot_missing() {
        let (id, list) = current_snapshot(&json!({"current-snapshot-id": -1, "snapshots": []}));
        assert_eq!(id, Some(-1));
        assert!(list.is_none());
    }

    #[test]
    fn test_schema_fields_skip_invalid_ids() {
        let fields = schema_fields(&json!({"fields": [
            {"id": 1, "name": "a", "type": "int"},
            {"name": "no_id", "type": "int"},
            {"id": 4294967296i64, "name": "too_big", "type": "int"}
        ]}));
        assert_eq!(fields.len(), 1);
        assert_eq!(fields[0].name, "a");
    }

    #[test]
    fn test_manifest_list_records() {
        let records = vec![
            json!({"manifest_path": "file:/t/metadata/a-m0.avro", "added_snapshot_id": 7,
                   "added_data_files_count": 2, "existing_data_files_count": 0,
                   "deleted_data_files_count": 0, "added_rows_count": {"long": 10}}),
            json!({"manifest_path": "file:/t/metadata/a-m1.avro"}),
        ];
        assert_eq!(
            manifest_paths(&records),
            vec!["file:/t/metadata/a-m0.avro", "file:/t/metadata/a-m1.avro"]
        );

        let summary = snapshot_summary(&records);
        assert_eq!(summary.added_snapshot_id, Some(7));
        assert_eq!(summary.added_data_files_count, Some(2));
        assert_eq!(summary.added_rows_count, Some(10));
        assert_eq!(summary.deleted_rows_count, None);
    }

    #[test]
    fn test_manifest_data_files_with_column_files() {
        let records = vec![json!({
            "status": 1,
            "data_file": {
                "file_path": "file:/t/data/00000-0.parquet",
                "file_format": "PARQUET",
                "partition": {"day": {"int": 19000}},
                "record_count": 100,
                "file_size_in_bytes": 2048,
                "column_files": {"array": [{
                    "column_file_path": "file:/t/data/cf-0.parquet",
                    "column_file_length": 512,
                    "column_file_record_count": 100,
                    "column_file_snapshot_id": {"long": 9},
                    "column_file_ids": {"array": [5, {"int": 2147483646}]}
                }]}
            }
        })];

        let (entries, files) = manifest_data_files(&records);
        assert_eq!(entries, 1);
        assert_eq!(files.len(), 1);
        let df = &files[0];
        assert_eq!(df.format.as_deref(), Some("PARQUET"));
        assert_eq!(df.partition.get("day"), Some(&json!(19000)));
        assert_eq!(df.column_files.len(), 1);
        assert_eq!(df.column_files[0].field_ids, vec![5, 2147483646]);
        assert_eq!(df.column_files[0].snapshot_id, Some(9));
    }

    #[test]
    fn test_manifest_without_data_files() {
        let (entries, files) = manifest_data_files(&[json!({"status": 0})]);
        assert_eq!(entries, 1);
        assert!(files.is_empty());
    }
}
