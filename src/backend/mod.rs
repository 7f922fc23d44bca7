//! Backend abstraction over table files.
//!
//! The browser core never touches files itself. Everything it shows comes
//! through a [`MetadataBackend`]: directory listings, table-metadata JSON,
//! manifest lists, manifests and sampled data-file rows. [`LocalBackend`]
//! serves them from the local filesystem.

mod decode;
pub mod extract;
pub mod local;
pub mod path_safety;

#[cfg(test)]
pub(crate) mod memory;

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::fields::SchemaField;

pub use local::LocalBackend;

/// Maximum number of rows a preview may sample.
pub const MAX_PREVIEW_ROWS: usize = 100;

/// Backend failures.
///
/// Cloneable so one in-flight fetch can hand the same failure to every
/// waiter.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    /// IO or transport failure
    #[error("{0}")]
    Transport(String),

    /// The backend processed the request and reported a failure
    #[error("{0}")]
    Reported(String),

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),
}

impl From<std::io::Error> for BackendError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => BackendError::NotFound(err.to_string()),
            _ => BackendError::Transport(err.to_string()),
        }
    }
}

/// A plain file found in a metadata directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    pub name: String,
    pub path: String,
    pub size: u64,
}

/// A `snap-*.avro` manifest list plus the manifest paths it references.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotEntry {
    #[serde(flatten)]
    pub file: FileEntry,
    pub manifest_paths: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryListing {
    pub metadata_dir: String,
    /// `*.metadata.json` files, in listing order
    pub metadata_files: Vec<FileEntry>,
    pub snapshots: Vec<SnapshotEntry>,
    /// Other `.avro` files (manifests)
    pub manifests: Vec<FileEntry>,
    /// `.parquet` files such as partition statistics
    pub data_files: Vec<FileEntry>,
    pub other_files: Vec<FileEntry>,
    /// Name of the newest metadata version, when one can be determined
    pub latest_version: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileKind {
    Json,
    Avro,
}

/// A decoded file together with its text renderings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadedFile {
    pub raw_text: String,
    pub formatted: String,
    pub parsed: serde_json::Value,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TableSchema {
    pub schema_id: Option<i64>,
    pub fields: Vec<SchemaField>,
}

/// Summary of one table-metadata version.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetadataInfo {
    pub table_uuid: Option<String>,
    pub location: Option<String>,
    pub format_version: Option<i64>,
    pub current_snapshot_id: Option<i64>,
    pub snapshots_count: usize,
    pub properties: BTreeMap<String, String>,
    pub schema: Option<TableSchema>,
    pub partition_spec: Option<serde_json::Value>,
    pub sort_order: Option<serde_json::Value>,
}

/// The current snapshot's manifest list and the manifests it references.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentManifests {
    pub current_snapshot_id: Option<i64>,
    pub manifest_list: Option<String>,
    pub manifest_paths: Vec<String>,
    /// Set when the manifest list exists but could not be decoded
    pub manifest_list_error: Option<String>,
}

/// Counters from the first entry of a manifest list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotSummary {
    pub manifest_path: Option<String>,
    pub manifest_length: Option<i64>,
    pub partition_spec_id: Option<i64>,
    pub content: Option<i64>,
    pub sequence_number: Option<i64>,
    pub min_sequence_number: Option<i64>,
    pub added_snapshot_id: Option<i64>,
    pub added_data_files_count: Option<i64>,
    pub existing_data_files_count: Option<i64>,
    pub deleted_data_files_count: Option<i64>,
    pub added_rows_count: Option<i64>,
    pub existing_rows_count: Option<i64>,
    pub deleted_rows_count: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotFile {
    pub summary: SnapshotSummary,
    pub manifest_paths: Vec<String>,
    pub formatted: String,
}

/// Auxiliary file holding a subset of a data file's columns.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnFile {
    pub path: Option<String>,
    pub length: Option<i64>,
    pub record_count: Option<i64>,
    pub snapshot_id: Option<i64>,
    pub field_ids: Vec<i32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DataFile {
    pub path: Option<String>,
    pub format: Option<String>,
    pub record_count: Option<i64>,
    pub size_bytes: Option<i64>,
    pub partition: serde_json::Map<String, serde_json::Value>,
    pub column_files: Vec<ColumnFile>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestFile {
    pub entries_count: usize,
    pub data_files: Vec<DataFile>,
    pub formatted: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataFileFormat {
    Parquet,
    Orc,
    Avro,
}

impl DataFileFormat {
    /// Parse a format name as written in manifests (`PARQUET`, `parquet`, ...).
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "parquet" => Some(Self::Parquet),
            "orc" => Some(Self::Orc),
            "avro" => Some(Self::Avro),
            _ => None,
        }
    }

    /// Use the hint when present, otherwise infer from the file extension.
    pub fn resolve(path: &str, hint: Option<&str>) -> Result<Self, BackendError> {
        match hint.map(str::trim).filter(|h| !h.is_empty()) {
            Some(hint) => {
                Self::parse(hint).ok_or_else(|| BackendError::UnsupportedFormat(hint.to_string()))
            }
            None => {
                let lower = path.to_ascii_lowercase();
                [".parquet", ".orc", ".avro"]
                    .iter()
                    .find(|ext| lower.ends_with(*ext))
                    .and_then(|ext| Self::parse(&ext[1..]))
                    .ok_or_else(|| {
                        BackendError::UnsupportedFormat(format!(
                            "cannot infer format of {}, pass a format explicitly",
                            path
                        ))
                    })
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Parquet => "parquet",
            Self::Orc => "orc",
            Self::Avro => "avro",
        }
    }
}

/// Sampled rows of a data or column file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreviewData {
    pub path: String,
    pub format: DataFileFormat,
    pub limit: usize,
    pub fields: Vec<String>,
    pub rows: Vec<serde_json::Map<String, serde_json::Value>>,
}

/// Source of everything the browser displays.
///
/// # Object Safety
/// Used as `Arc<dyn MetadataBackend>` and shared with in-flight tree
/// expansions.
#[async_trait]
pub trait MetadataBackend: Send + Sync + 'static {
    /// List a table's metadata directory.
    async fn list_directory(&self, metadata_dir: &str) -> Result<DirectoryListing, BackendError>;

    /// Load a JSON or Avro file with its formatted rendering.
    async fn load_file(&self, path: &str, kind: FileKind) -> Result<LoadedFile, BackendError>;

    /// Summarize a table-metadata file.
    async fn load_metadata_info(&self, path: &str) -> Result<MetadataInfo, BackendError>;

    /// Resolve the current snapshot of a table-metadata file to its manifests.
    async fn load_current_manifests(
        &self,
        metadata_path: &str,
    ) -> Result<CurrentManifests, BackendError>;

    /// Load a manifest list.
    async fn load_snapshot_file(
        &self,
        manifest_list_path: &str,
    ) -> Result<SnapshotFile, BackendError>;

    /// Load a manifest and its data-file entries.
    async fn load_manifest_file(&self, manifest_path: &str) -> Result<ManifestFile, BackendError>;

    /// Sample at most `limit` rows from a data or column file.
    async fn preview_data_file(
        &self,
        path: &str,
        format: DataFileFormat,
        limit: usize,
    ) -> Result<PreviewData, BackendError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_from_hint() {
        assert_eq!(
            DataFileFormat::resolve("/t/data/x.bin", Some("PARQUET")).unwrap(),
            DataFileFormat::Parquet
        );
        assert!(matches!(
            DataFileFormat::resolve("/t/data/x.parquet", Some("csv")),
            Err(BackendError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(
            DataFileFormat::resolve("/t/data/00000-0.ORC", None).unwrap(),
            DataFileFormat::Orc
        );
        assert_eq!(
            DataFileFormat::resolve("/t/data/cf-1.parquet", Some("")).unwrap(),
            DataFileFormat::Parquet
        );
        assert!(DataFileFormat::resolve("/t/data/unknown", None).is_err());
    }

    #[test]
    fn test_io_error_mapping() {
        let err: BackendError = std::io::Error::new(std::io::ErrorKind::NotFound, "gone").into();
        assert!(matches!(err, BackendError::NotFound(_)));
        let err: BackendError =
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied").into();
        assert!(matches!(err, BackendError::Transport(_)));
    }
}
