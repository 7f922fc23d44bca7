//! Snapshot of what the browser currently displays.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::backend::{
    ColumnFile, DataFile, DataFileFormat, ManifestFile, MetadataInfo, PreviewData, SnapshotFile,
    SnapshotSummary,
};
use crate::fields::{FieldResolver, ResolvedField};
use crate::paths::file_name;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ViewMode {
    #[default]
    Empty,
    MetadataOverview,
    SnapshotOverview,
    ManifestOverview,
    Preview,
}

impl ViewMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ViewMode::Empty => "empty",
            ViewMode::MetadataOverview => "metadata-overview",
            ViewMode::SnapshotOverview => "snapshot-overview",
            ViewMode::ManifestOverview => "manifest-overview",
            ViewMode::Preview => "preview",
        }
    }
}

/// Sampled rows shown in preview mode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreviewTable {
    pub path: String,
    pub format: DataFileFormat,
    pub limit: usize,
    pub fields: Vec<String>,
    pub rows: Vec<Map<String, Value>>,
}

impl From<PreviewData> for PreviewTable {
    fn from(data: PreviewData) -> Self {
        Self {
            path: data.path,
            format: data.format,
            limit: data.limit,
            fields: data.fields,
            rows: data.rows,
        }
    }
}

/// A column file with its field ids already resolved to schema fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedColumnFile {
    pub path: Option<String>,
    pub length: Option<i64>,
    pub record_count: Option<i64>,
    pub snapshot_id: Option<i64>,
    pub fields: Vec<ResolvedField>,
}

impl ResolvedColumnFile {
    fn resolve(file: ColumnFile, resolver: &FieldResolver) -> Self {
        Self {
            fields: file
                .field_ids
                .iter()
                .map(|id| resolver.resolve_or_placeholder(*id))
                .collect(),
            path: file.path,
            length: file.length,
            record_count: file.record_count,
            snapshot_id: file.snapshot_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedDataFile {
    pub path: Option<String>,
    pub format: Option<String>,
    pub record_count: Option<i64>,
    pub size_bytes: Option<i64>,
    pub partition: Map<String, Value>,
    pub column_files: Vec<ResolvedColumnFile>,
}

impl ResolvedDataFile {
    fn resolve(file: DataFile, resolver: &FieldResolver) -> Self {
        Self {
            path: file.path,
            format: file.format,
            record_count: file.record_count,
            size_bytes: file.size_bytes,
            partition: file.partition,
            column_files: file
                .column_files
                .into_iter()
                .map(|cf| ResolvedColumnFile::resolve(cf, resolver))
                .collect(),
        }
    }
}

/// Typed overview payload, kept whole so a restored state loses nothing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Overview {
    Metadata {
        path: String,
        info: MetadataInfo,
    },
    Snapshot {
        path: String,
        summary: SnapshotSummary,
        manifest_paths: Vec<String>,
    },
    Manifest {
        path: String,
        entries_count: usize,
        data_files: Vec<ResolvedDataFile>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewState {
    pub mode: ViewMode,
    pub title: String,
    /// Formatted file content
    pub primary_content: String,
    pub table: Option<PreviewTable>,
    pub overview: Option<Overview>,
    pub overview_visible: bool,
    pub content_visible: bool,
    pub empty_visible: bool,
}

impl Default for ViewState {
    fn default() -> Self {
        Self::empty()
    }
}

impl ViewState {
    pub fn empty() -> Self {
        Self {
            mode: ViewMode::Empty,
            title: String::new(),
            primary_content: String::new(),
            table: None,
            overview: None,
            overview_visible: false,
            content_visible: false,
            empty_visible: true,
        }
    }

    fn overview(mode: ViewMode, path: &str, primary_content: String, overview: Overview) -> Self {
        Self {
            mode,
            title: file_name(path).to_string(),
            primary_content,
            table: None,
            overview: Some(overview),
            overview_visible: true,
            content_visible: true,
            empty_visible: false,
        }
    }

    pub fn metadata_overview(path: &str, formatted: String, info: MetadataInfo) -> Self {
        Self::overview(
            ViewMode::MetadataOverview,
            path,
            formatted,
            Overview::Metadata {
                path: path.to_string(),
                info,
            },
        )
    }

    pub fn snapshot_overview(path: &str, file: SnapshotFile) -> Self {
        Self::overview(
            ViewMode::SnapshotOverview,
            path,
            file.formatted,
            Overview::Snapshot {
                path: path.to_string(),
                summary: file.summary,
                manifest_paths: file.manifest_paths,
            },
        )
    }

    /// Column field ids are resolved against `resolver` as the view is built.
    pub fn manifest_overview(path: &str, file: ManifestFile, resolver: &FieldResolver) -> Self {
        let data_files = file
            .data_files
            .into_iter()
            .map(|df| ResolvedDataFile::resolve(df, resolver))
            .collect();
        Self::overview(
            ViewMode::ManifestOverview,
            path,
            file.formatted,
            Overview::Manifest {
                path: path.to_string(),
                entries_count: file.entries_count,
                data_files,
            },
        )
    }

    pub fn preview(data: PreviewData) -> Self {
        let title = format!("Preview: {}", file_name(&data.path));
        let table = PreviewTable::from(data);
        let primary_content = serde_json::to_string_pretty(&table.rows).unwrap_or_default();
        Self {
            mode: ViewMode::Preview,
            title,
            primary_content,
            table: Some(table),
            overview: None,
            overview_visible: false,
            content_visible: true,
            empty_visible: false,
        }
    }
}
