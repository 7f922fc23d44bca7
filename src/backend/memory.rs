//! In-memory [`MetadataBackend`] for tests.
//!
//! Every fetch is counted per method so tests can assert on caching.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;

use super::{
    BackendError, CurrentManifests, DataFileFormat, DirectoryListing, FileKind, LoadedFile,
    ManifestFile, MetadataBackend, MetadataInfo, PreviewData, SnapshotFile,
};

#[derive(Default)]
pub struct MemoryBackend {
    pub listings: HashMap<String, DirectoryListing>,
    pub files: HashMap<String, LoadedFile>,
    pub metadata: HashMap<String, MetadataInfo>,
    pub current: HashMap<String, CurrentManifests>,
    pub snapshots: HashMap<String, SnapshotFile>,
    pub manifests: HashMap<String, ManifestFile>,
    pub previews: HashMap<String, PreviewData>,
    calls: Mutex<HashMap<&'static str, usize>>,
    failing: AtomicBool,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of calls made to `method`.
    pub fn calls(&self, method: &str) -> usize {
        self.calls.lock().get(method).copied().unwrap_or(0)
    }

    /// Make every subsequent call fail with a transport error.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    async fn record(&self, method: &'static str) -> Result<(), BackendError> {
        *self.calls.lock().entry(method).or_insert(0) += 1;
        // Let concurrent callers interleave.
        tokio::task::yield_now().await;
        if self.failing.load(Ordering::SeqCst) {
            return Err(BackendError::Transport("connection refused".to_string()));
        }
        Ok(())
    }
}

fn lookup<T: Clone>(map: &HashMap<String, T>, key: &str) -> Result<T, BackendError> {
    map.get(key)
        .cloned()
        .ok_or_else(|| BackendError::NotFound(key.to_string()))
}

#[async_trait]
impl MetadataBackend for MemoryBackend {
    async fn list_directory(&self, metadata_dir: &str) -> Result<DirectoryListing, BackendError> {
        self.record("list_directory").await?;
        lookup(&self.listings, metadata_dir)
    }

    async fn load_file(&self, path: &str, _kind: FileKind) -> Result<LoadedFile, BackendError> {
        self.record("load_file").await?;
        lookup(&self.files, path)
    }

    async fn load_metadata_info(&self, path: &str) -> Result<MetadataInfo, BackendError> {
        self.record("load_metadata_info").await?;
        lookup(&self.metadata, path)
    }

    async fn load_current_manifests(
        &self,
        metadata_path: &str,
    ) -> Result<CurrentManifests, BackendError> {
        self.record("load_current_manifests").await?;
        lookup(&self.current, metadata_path)
    }

    async fn load_snapshot_file(
        &self,
        manifest_list_path: &str,
    ) -> Result<SnapshotFile, BackendError> {
        self.record("load_snapshot_file").await?;
        lookup(&self.snapshots, manifest_list_path)
    }

    async fn load_manifest_file(&self, manifest_path: &str) -> Result<ManifestFile, BackendError> {
        self.record("load_manifest_file").await?;
        lookup(&self.manifests, manifest_path)
    }

    async fn preview_data_file(
        &self,
        path: &str,
        _format: DataFileFormat,
        limit: usize,
    ) -> Result<PreviewData, BackendError> {
        self.record("preview_data_file").await?;
        let mut preview = lookup(&self.previews, path)?;
        preview.rows.truncate(limit);
        preview.limit = limit;
        Ok(preview)
    }
}
