//! [`MetadataBackend`] over the local filesystem.
//!
//! All file access happens on the blocking pool so the browser's event loop
//! never stalls on a large manifest.

use std::fs;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::{Map, Value};

use super::decode::{read_avro_records, read_orc_rows, read_parquet_rows};
use super::extract;
use super::path_safety::normalize_local_path;
use super::{
    BackendError, CurrentManifests, DataFileFormat, DirectoryListing, FileEntry, FileKind,
    LoadedFile, ManifestFile, MetadataBackend, MetadataInfo, PreviewData, SnapshotEntry,
    SnapshotFile, MAX_PREVIEW_ROWS,
};

/// Serves table files from disk.
#[derive(Debug, Clone, Default)]
pub struct LocalBackend {
    allowed_root: Option<PathBuf>,
}

impl LocalBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict every request to paths under `root`.
    pub fn with_allowed_root(root: impl Into<PathBuf>) -> Self {
        Self {
            allowed_root: Some(root.into()),
        }
    }

    pub fn allowed_root(&self) -> Option<&Path> {
        self.allowed_root.as_deref()
    }

    fn resolve(&self, raw: &str) -> Result<PathBuf, BackendError> {
        normalize_local_path(raw, self.allowed_root.as_deref())
    }
}

/// Run a blocking closure on the blocking pool.
async fn blocking<T, F>(f: F) -> Result<T, BackendError>
where
    F: FnOnce() -> Result<T, BackendError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| BackendError::Transport(format!("blocking task failed: {}", e)))?
}

fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

/// Numeric version prefix of a metadata file name: `00003-<uuid>.metadata.json`
/// or `v3.metadata.json`.
fn metadata_version(name: &str) -> Option<u64> {
    let prefix = name.split(['-', '.']).next()?;
    let digits = prefix.strip_prefix('v').unwrap_or(prefix);
    digits.parse().ok()
}

/// Name of the newest metadata file.
///
/// Names without a parsable version rank below every versioned name; among
/// equals the later entry in listing order wins.
fn latest_version(metadata_files: &[FileEntry]) -> Option<String> {
    metadata_files
        .iter()
        .max_by_key(|f| metadata_version(&f.name))
        .map(|f| f.name.clone())
}

fn scan_directory(dir: &Path) -> Result<DirectoryListing, BackendError> {
    if !dir.exists() {
        return Err(BackendError::NotFound(format!(
            "Directory does not exist: {}",
            dir.display()
        )));
    }
    if !dir.is_dir() {
        return Err(BackendError::InvalidPath(format!(
            "Path is not a directory: {}",
            dir.display()
        )));
    }

    let mut entries: Vec<(String, PathBuf, u64)> = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let meta = entry.metadata()?;
        if meta.is_dir() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.ends_with(".crc") {
            continue;
        }
        entries.push((name, entry.path(), meta.len()));
    }
    entries.sort_by(|a, b| a.0.cmp(&b.0));

    let mut listing = DirectoryListing {
        metadata_dir: dir.display().to_string(),
        ..Default::default()
    };

    for (name, path, size) in entries {
        let file = FileEntry {
            name: name.clone(),
            path: path.display().to_string(),
            size,
        };

        if name.ends_with(".metadata.json") {
            listing.metadata_files.push(file);
        } else if name.starts_with("snap-") && name.ends_with(".avro") {
            let manifest_paths = match read_avro_records(&path, None) {
                Ok((_, records)) => extract::manifest_paths(&records),
                Err(e) => {
                    tracing::warn!("Could not read manifest list {}: {}", name, e);
                    Vec::new()
                }
            };
            listing.snapshots.push(SnapshotEntry {
                file,
                manifest_paths,
            });
        } else if name.ends_with(".avro") {
            listing.manifests.push(file);
        } else if name.ends_with(".parquet") {
            listing.data_files.push(file);
        } else {
            listing.other_files.push(file);
        }
    }

    listing.latest_version = latest_version(&listing.metadata_files);
    Ok(listing)
}

/// Parse a JSON file; an empty file reads as `{}`.
fn read_json(path: &Path) -> Result<(String, Value), BackendError> {
    let raw = fs::read_to_string(path)?;
    if raw.trim().is_empty() {
        return Ok((raw, Value::Object(Map::new())));
    }
    let parsed = serde_json::from_str(&raw).map_err(|e| {
        BackendError::Reported(format!("Failed to parse JSON {}: {}", path.display(), e))
    })?;
    Ok((raw, parsed))
}

fn read_avro_list(path: &Path) -> Result<Vec<Value>, BackendError> {
    read_avro_records(path, None).map(|(_, records)| records)
}

fn current_manifests(
    backend: &LocalBackend,
    metadata_path: &Path,
) -> Result<CurrentManifests, BackendError> {
    let (_, metadata) = read_json(metadata_path)?;
    let (current_snapshot_id, manifest_list) = extract::current_snapshot(&metadata);

    let mut result = CurrentManifests {
        current_snapshot_id,
        manifest_list: manifest_list.clone(),
        ..Default::default()
    };

    if let Some(list) = manifest_list {
        match backend.resolve(&list).and_then(|p| read_avro_list(&p)) {
            Ok(records) => result.manifest_paths = extract::manifest_paths(&records),
            Err(e) => {
                tracing::warn!("Failed to read manifest list {}: {}", list, e);
                result.manifest_list_error = Some(e.to_string());
            }
        }
    }

    Ok(result)
}

fn preview(path: &Path, format: DataFileFormat, limit: usize) -> Result<PreviewData, BackendError> {
    let (fields, rows) = match format {
        DataFileFormat::Parquet => read_parquet_rows(path, limit)?,
        DataFileFormat::Avro => {
            let (fields, records) = read_avro_records(path, Some(limit))?;
            let rows = records
                .into_iter()
                .map(|record| match record {
                    Value::Object(map) => map,
                    other => {
                        let mut map = Map::new();
                        map.insert("value".to_string(), other);
                        map
                    }
                })
                .collect();
            (fields, rows)
        }
        DataFileFormat::Orc => read_orc_rows(path, limit)?,
    };

    Ok(PreviewData {
        path: path.display().to_string(),
        format,
        limit,
        fields,
        rows,
    })
}

#[async_trait]
impl MetadataBackend for LocalBackend {
    async fn list_directory(&self, metadata_dir: &str) -> Result<DirectoryListing, BackendError> {
        let dir = self.resolve(metadata_dir)?;
        tracing::debug!("Scanning {}", dir.display());
        blocking(move || scan_directory(&dir)).await
    }

    async fn load_file(&self, path: &str, kind: FileKind) -> Result<LoadedFile, BackendError> {
        let path = self.resolve(path)?;
        blocking(move || match kind {
            FileKind::Json => {
                let (raw_text, parsed) = read_json(&path)?;
                Ok(LoadedFile {
                    raw_text,
                    formatted: pretty(&parsed),
                    parsed,
                })
            }
            FileKind::Avro => {
                let parsed = Value::Array(read_avro_list(&path)?);
                Ok(LoadedFile {
                    raw_text: parsed.to_string(),
                    formatted: pretty(&parsed),
                    parsed,
                })
            }
        })
        .await
    }

    async fn load_metadata_info(&self, path: &str) -> Result<MetadataInfo, BackendError> {
        let path = self.resolve(path)?;
        blocking(move || {
            let (_, metadata) = read_json(&path)?;
            Ok(extract::metadata_info(&metadata))
        })
        .await
    }

    async fn load_current_manifests(
        &self,
        metadata_path: &str,
    ) -> Result<CurrentManifests, BackendError> {
        let path = self.resolve(metadata_path)?;
        let backend = self.clone();
        blocking(move || current_manifests(&backend, &path)).await
    }

    async fn load_snapshot_file(
        &self,
        manifest_list_path: &str,
    ) -> Result<SnapshotFile, BackendError> {
        let path = self.resolve(manifest_list_path)?;
        blocking(move || {
            let records = read_avro_list(&path)?;
            Ok(SnapshotFile {
                summary: extract::snapshot_summary(&records),
                manifest_paths: extract::manifest_paths(&records),
                formatted: pretty(&Value::Array(records)),
            })
        })
        .await
    }

    async fn load_manifest_file(&self, manifest_path: &str) -> Result<ManifestFile, BackendError> {
        let path = self.resolve(manifest_path)?;
        blocking(move || {
            let records = read_avro_list(&path)?;
            let (entries_count, data_files) = extract::manifest_data_files(&records);
            Ok(ManifestFile {
                entries_count,
                data_files,
                formatted: pretty(&Value::Array(records)),
            })
        })
        .await
    }

    async fn preview_data_file(
        &self,
        path: &str,
        format: DataFileFormat,
        limit: usize,
    ) -> Result<PreviewData, BackendError> {
        let path = self.resolve(path)?;
        let limit = limit.clamp(1, MAX_PREVIEW_ROWS);
        tracing::debug!("Previewing {} ({}, limit {})", path.display(), format.as_str(), limit);
        blocking(move || preview(&path, format, limit)).await
    }
}
