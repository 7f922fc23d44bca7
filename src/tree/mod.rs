//! Lazily expanded hierarchy over one table's metadata directory.
//!
//! Nodes live in an arena addressed by [`NodeId`]. Children are fetched on
//! first expansion and cached for the life of the model; concurrent
//! expansions of the same node share one in-flight fetch, and a failed fetch
//! leaves the node retryable.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::backend::{BackendError, DirectoryListing, MetadataBackend};
use crate::error::{IceviewError, Result};
use crate::paths::{file_name, strip_file_scheme};

pub const NO_MANIFEST_LIST_NOTE: &str = "No manifest-list found for the current snapshot";
pub const NO_MANIFESTS_NOTE: &str = "No manifests found in the manifest list";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub usize);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NodeKind {
    /// A `*.metadata.json` table-metadata version
    Metadata,
    /// A manifest list
    Snapshot,
    Manifest,
    DataFile,
}

impl NodeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Metadata => "metadata",
            NodeKind::Snapshot => "snapshot",
            NodeKind::Manifest => "manifest",
            NodeKind::DataFile => "data-file",
        }
    }

    pub fn is_expandable(&self) -> bool {
        matches!(self, NodeKind::Metadata | NodeKind::Snapshot)
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeNode {
    pub id: NodeId,
    pub parent: Option<NodeId>,
    /// Path without a `file:` scheme
    pub path: String,
    pub kind: NodeKind,
    pub display_name: String,
    /// Presentation flag for the newest metadata version
    pub is_latest: bool,
    pub size: Option<u64>,
}

/// Children of an expanded node, plus a note when there are none to show.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Expansion {
    pub children: Vec<NodeId>,
    pub note: Option<String>,
}

/// Observable child state of a node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum NodeLoadState {
    NotLoaded,
    Loading,
    Loaded { expansion: Expansion },
    Failed { message: String },
}

#[derive(Debug, Clone)]
struct ChildSpec {
    path: String,
    kind: NodeKind,
    manifest_hint: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default)]
struct Fetched {
    children: Vec<ChildSpec>,
    note: Option<String>,
}

type FetchFuture = Shared<BoxFuture<'static, std::result::Result<Fetched, BackendError>>>;

enum ChildSlot {
    NotLoaded,
    Loading { generation: u64, fetch: FetchFuture },
    Loaded(Expansion),
    Failed(String),
}

impl ChildSlot {
    fn observe(&self) -> NodeLoadState {
        match self {
            ChildSlot::NotLoaded => NodeLoadState::NotLoaded,
            ChildSlot::Loading { .. } => NodeLoadState::Loading,
            ChildSlot::Loaded(expansion) => NodeLoadState::Loaded {
                expansion: expansion.clone(),
            },
            ChildSlot::Failed(message) => NodeLoadState::Failed {
                message: message.clone(),
            },
        }
    }
}

#[derive(Default)]
struct Arena {
    nodes: Vec<TreeNode>,
    slots: Vec<ChildSlot>,
    /// Manifest paths already known for snapshot nodes
    hints: HashMap<NodeId, Vec<String>>,
    next_generation: u64,
}

impl Arena {
    fn insert(
        &mut self,
        parent: Option<NodeId>,
        path: &str,
        kind: NodeKind,
        is_latest: bool,
        size: Option<u64>,
    ) -> NodeId {
        let id = NodeId(self.nodes.len());
        let path = strip_file_scheme(path).to_string();
        self.nodes.push(TreeNode {
            id,
            parent,
            display_name: file_name(&path).to_string(),
            path,
            kind,
            is_latest,
            size,
        });
        self.slots.push(ChildSlot::NotLoaded);
        id
    }
}

/// What expanding a node requires from the backend.
enum FetchPlan {
    CurrentSnapshot { metadata_path: String },
    Manifests { manifest_list: String, hint: Option<Vec<String>> },
}

impl FetchPlan {
    fn run(self, backend: Arc<dyn MetadataBackend>) -> BoxFuture<'static, std::result::Result<Fetched, BackendError>> {
        async move {
            match self {
                FetchPlan::CurrentSnapshot { metadata_path } => {
                    let current = backend.load_current_manifests(&metadata_path).await?;
                    let Some(manifest_list) = current.manifest_list else {
                        return Ok(Fetched {
                            children: Vec::new(),
                            note: Some(NO_MANIFEST_LIST_NOTE.to_string()),
                        });
                    };
                    let manifest_hint =
                        Some(current.manifest_paths).filter(|paths| !paths.is_empty());
                    Ok(Fetched {
                        children: vec![ChildSpec {
                            path: manifest_list,
                            kind: NodeKind::Snapshot,
                            manifest_hint,
                        }],
                        note: current
                            .manifest_list_error
                            .map(|e| format!("Manifest list could not be read: {}", e)),
                    })
                }
                FetchPlan::Manifests { manifest_list, hint } => {
                    let paths = match hint {
                        Some(paths) => paths,
                        None => backend.load_snapshot_file(&manifest_list).await?.manifest_paths,
                    };
                    let note = paths.is_empty().then(|| NO_MANIFESTS_NOTE.to_string());
                    Ok(Fetched {
                        children: paths
                            .into_iter()
                            .map(|path| ChildSpec {
                                path,
                                kind: NodeKind::Manifest,
                                manifest_hint: None,
                            })
                            .collect(),
                        note,
                    })
                }
            }
        }
        .boxed()
    }
}

pub struct MetadataTreeModel {
    backend: Arc<dyn MetadataBackend>,
    metadata_dir: String,
    arena: Mutex<Arena>,
    roots: Vec<NodeId>,
    data_files: Vec<NodeId>,
    /// Manifest paths found while scanning `snap-*.avro` files, by file name
    listing_hints: HashMap<String, Vec<String>>,
}

impl MetadataTreeModel {
    /// Build the root level from a directory listing.
    pub fn from_listing(backend: Arc<dyn MetadataBackend>, listing: &DirectoryListing) -> Self {
        let mut arena = Arena::default();

        let roots = listing
            .metadata_files
            .iter()
            .map(|file| {
                let is_latest = listing.latest_version.as_deref() == Some(file.name.as_str());
                arena.insert(None, &file.path, NodeKind::Metadata, is_latest, Some(file.size))
            })
            .collect();

        let data_files = listing
            .data_files
            .iter()
            .map(|file| arena.insert(None, &file.path, NodeKind::DataFile, false, Some(file.size)))
            .collect();

        let listing_hints = listing
            .snapshots
            .iter()
            .filter(|s| !s.manifest_paths.is_empty())
            .map(|s| (s.file.name.clone(), s.manifest_paths.clone()))
            .collect();

        Self {
            backend,
            metadata_dir: listing.metadata_dir.clone(),
            arena: Mutex::new(arena),
            roots,
            data_files,
            listing_hints,
        }
    }

    pub fn metadata_dir(&self) -> &str {
        &self.metadata_dir
    }

    /// Metadata-version nodes in listing order.
    pub fn list_roots(&self) -> Vec<TreeNode> {
        self.nodes_of(&self.roots)
    }

    /// Data files found directly in the metadata directory.
    pub fn list_data_files(&self) -> Vec<TreeNode> {
        self.nodes_of(&self.data_files)
    }

    /// The node flagged as the newest metadata version.
    pub fn latest_root(&self) -> Option<TreeNode> {
        self.list_roots().into_iter().find(|n| n.is_latest)
    }

    fn nodes_of(&self, ids: &[NodeId]) -> Vec<TreeNode> {
        let arena = self.arena.lock();
        ids.iter()
            .filter_map(|id| arena.nodes.get(id.0).cloned())
            .collect()
    }

    pub fn node(&self, id: NodeId) -> Option<TreeNode> {
        self.arena.lock().nodes.get(id.0).cloned()
    }

    pub fn node_state(&self, id: NodeId) -> Option<NodeLoadState> {
        self.arena.lock().slots.get(id.0).map(ChildSlot::observe)
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.arena.lock().nodes.len()
    }

    /// The metadata version a node descends from.
    pub fn owning_root(&self, id: NodeId) -> Option<NodeId> {
        let arena = self.arena.lock();
        let mut current = arena.nodes.get(id.0)?;
        while let Some(parent) = current.parent {
            current = arena.nodes.get(parent.0)?;
        }
        (current.kind == NodeKind::Metadata).then_some(current.id)
    }

    /// Fetch (once) and return the children of a metadata or snapshot node.
    pub async fn expand_children(&self, id: NodeId) -> Result<Expansion> {
        let (fetch, generation, context) = {
            let mut guard = self.arena.lock();
            let arena = &mut *guard;
            let node = arena.nodes.get(id.0).ok_or(IceviewError::UnknownNode(id))?;
            if !node.kind.is_expandable() {
                return Err(IceviewError::NotExpandable(node.kind));
            }
            let (kind, path) = (node.kind, node.path.clone());

            match &arena.slots[id.0] {
                ChildSlot::Loaded(expansion) => {
                    tracing::debug!("Children of {} served from cache", id);
                    return Ok(expansion.clone());
                }
                ChildSlot::Loading { generation, fetch } => {
                    tracing::debug!("Joining in-flight expansion of {}", id);
                    (fetch.clone(), *generation, Self::plan_context(kind))
                }
                ChildSlot::NotLoaded | ChildSlot::Failed(_) => {
                    let plan = match kind {
                        NodeKind::Metadata => FetchPlan::CurrentSnapshot {
                            metadata_path: path,
                        },
                        _ => FetchPlan::Manifests {
                            hint: arena.hints.get(&id).cloned(),
                            manifest_list: path,
                        },
                    };
                    let fetch = plan.run(Arc::clone(&self.backend)).shared();
                    arena.next_generation += 1;
                    let generation = arena.next_generation;
                    arena.slots[id.0] = ChildSlot::Loading {
                        generation,
                        fetch: fetch.clone(),
                    };
                    tracing::debug!("Expanding {} node {}", kind, id);
                    (fetch, generation, Self::plan_context(kind))
                }
            }
        };

        let result = fetch.await;

        let mut guard = self.arena.lock();
        let arena = &mut *guard;
        let owns_slot = matches!(
            &arena.slots[id.0],
            ChildSlot::Loading { generation: g, .. } if *g == generation
        );

        match result {
            Ok(fetched) => {
                if let ChildSlot::Loaded(expansion) = &arena.slots[id.0] {
                    return Ok(expansion.clone());
                }
                let expansion = self.materialize(arena, id, fetched);
                if owns_slot {
                    arena.slots[id.0] = ChildSlot::Loaded(expansion.clone());
                }
                Ok(expansion)
            }
            Err(err) => {
                tracing::warn!("Expansion of {} failed: {}", id, err);
                if owns_slot {
                    arena.slots[id.0] = ChildSlot::Failed(err.to_string());
                }
                Err(IceviewError::backend(context, err))
            }
        }
    }

    fn plan_context(kind: NodeKind) -> &'static str {
        match kind {
            NodeKind::Metadata => "Failed to load current snapshot",
            _ => "Failed to load manifest list",
        }
    }

    fn materialize(&self, arena: &mut Arena, parent: NodeId, fetched: Fetched) -> Expansion {
        let children = fetched
            .children
            .into_iter()
            .map(|spec| {
                let child = arena.insert(Some(parent), &spec.path, spec.kind, false, None);
                let hint = spec.manifest_hint.or_else(|| {
                    self.listing_hints
                        .get(file_name(&spec.path))
                        .cloned()
                });
                if let (NodeKind::Snapshot, Some(hint)) = (spec.kind, hint) {
                    arena.hints.insert(child, hint);
                }
                child
            })
            .collect();

        Expansion {
            children,
            note: fetched.note,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::memory::MemoryBackend;
    use crate::backend::{CurrentManifests, FileEntry, SnapshotFile};

    const DIR: &str = "/warehouse/db/orders/metadata";

    fn entry(name: &str) -> FileEntry {
        FileEntry {
            name: name.to_string(),
            path: format!("{}/{}", DIR, name),
            size: 10,
        }
    }

    fn listing() -> DirectoryListing {
        DirectoryListing {
            metadata_dir: DIR.to_string(),
            metadata_files: vec![entry("00000-a.metadata.json"), entry("00001-b.metadata.json")],
            data_files: vec![entry("partition-stats-1.parquet")],
            latest_version: Some("00001-b.metadata.json".to_string()),
            ..Default::default()
        }
    }

    fn backend() -> MemoryBackend {
        let mut backend = MemoryBackend::new();
        backend.current.insert(
            format!("{}/00001-b.metadata.json", DIR),
            CurrentManifests {
                current_snapshot_id: Some(7),
                manifest_list: Some(format!("file:{}/snap-7-1-x.avro", DIR)),
                manifest_paths: Vec::new(),
                manifest_list_error: None,
            },
        );
        backend.current.insert(
            format!("{}/00000-a.metadata.json", DIR),
            CurrentManifests::default(),
        );
        backend.snapshots.insert(
            format!("{}/snap-7-1-x.avro", DIR),
            SnapshotFile {
                summary: Default::default(),
                manifest_paths: vec![
                    format!("file:{}/x-m0.avro", DIR),
                    format!("file:{}/x-m1.avro", DIR),
                ],
                formatted: "[]".to_string(),
            },
        );
        backend
    }

    fn model(backend: Arc<MemoryBackend>) -> MetadataTreeModel {
        MetadataTreeModel::from_listing(backend, &listing())
    }

    #[test]
    fn test_node_kind_display() {
        assert_eq!(NodeKind::DataFile.to_string(), "data-file");
        assert_eq!(serde_json::to_value(NodeKind::DataFile).unwrap(), "data-file");
        assert_eq!(NodeId(3).to_string(), "#3");
    }

    #[test]
    fn test_roots_and_latest_flag() {
        let tree = model(Arc::new(backend()));
        let roots = tree.list_roots();
        assert_eq!(roots.len(), 2);
        assert!(!roots[0].is_latest);
        assert!(roots[1].is_latest);
        assert_eq!(tree.latest_root().map(|n| n.id), Some(roots[1].id));

        let data = tree.list_data_files();
        assert_eq!(data.len(), 1);
        assert_eq!(data[0].kind, NodeKind::DataFile);
        assert_eq!(tree.owning_root(data[0].id), None);
    }

    #[test]
    fn test_empty_listing_has_no_roots() {
        let tree = MetadataTreeModel::from_listing(
            Arc::new(MemoryBackend::new()),
            &DirectoryListing::default(),
        );
        assert!(tree.list_roots().is_empty());
        assert_eq!(tree.len(), 0);
    }

    #[tokio::test]
    async fn test_expand_metadata_then_snapshot() {
        let backend = Arc::new(backend());
        let tree = model(backend.clone());
        let root = tree.list_roots()[1].id;

        let expansion = tree.expand_children(root).await.unwrap();
        assert_eq!(expansion.children.len(), 1);
        assert!(expansion.note.is_none());
        let snapshot = tree.node(expansion.children[0]).unwrap();
        assert_eq!(snapshot.kind, NodeKind::Snapshot);
        assert_eq!(snapshot.path, format!("{}/snap-7-1-x.avro", DIR));
        assert_eq!(snapshot.display_name, "snap-7-1-x.avro");

        let manifests = tree.expand_children(snapshot.id).await.unwrap();
        assert_eq!(manifests.children.len(), 2);
        let names: Vec<String> = manifests
            .children
            .iter()
            .map(|id| tree.node(*id).unwrap().display_name)
            .collect();
        assert_eq!(names, vec!["x-m0.avro", "x-m1.avro"]);
        assert_eq!(backend.calls("load_snapshot_file"), 1);
        assert_eq!(tree.owning_root(manifests.children[1]), Some(root));
    }

    #[tokio::test]
    async fn test_missing_manifest_list_is_a_note() {
        let tree = model(Arc::new(backend()));
        let root = tree.list_roots()[0].id;
        let expansion = tree.expand_children(root).await.unwrap();
        assert!(expansion.children.is_empty());
        assert_eq!(expansion.note.as_deref(), Some(NO_MANIFEST_LIST_NOTE));
    }

    #[tokio::test]
    async fn test_hint_skips_manifest_list_fetch() {
        let mut backend = backend();
        backend
            .current
            .get_mut(&format!("{}/00001-b.metadata.json", DIR))
            .unwrap()
            .manifest_paths = vec![format!("{}/hinted-m0.avro", DIR)];
        let backend = Arc::new(backend);
        let tree = model(backend.clone());

        let root = tree.list_roots()[1].id;
        let snapshot = tree.expand_children(root).await.unwrap().children[0];
        let manifests = tree.expand_children(snapshot).await.unwrap();
        assert_eq!(manifests.children.len(), 1);
        assert_eq!(backend.calls("load_snapshot_file"), 0);
    }

    #[tokio::test]
    async fn test_second_expand_is_cached() {
        let backend = Arc::new(backend());
        let tree = model(backend.clone());
        let root = tree.list_roots()[1].id;

        let first = tree.expand_children(root).await.unwrap();
        let second = tree.expand_children(root).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(backend.calls("load_current_manifests"), 1);
        assert!(matches!(tree.node_state(root), Some(NodeLoadState::Loaded { .. })));
    }

    #[tokio::test]
    async fn test_concurrent_expands_share_one_fetch() {
        let backend = Arc::new(backend());
        let tree = model(backend.clone());
        let root = tree.list_roots()[1].id;

        let (a, b) = tokio::join!(tree.expand_children(root), tree.expand_children(root));
        assert_eq!(a.unwrap(), b.unwrap());
        assert_eq!(backend.calls("load_current_manifests"), 1);
        // one snapshot child, not two
        assert_eq!(tree.len(), 4);
    }

    #[tokio::test]
    async fn test_failed_expand_is_retryable() {
        let backend = Arc::new(backend());
        let tree = model(backend.clone());
        let root = tree.list_roots()[1].id;

        backend.set_failing(true);
        let err = tree.expand_children(root).await.unwrap_err();
        assert!(err.to_string().starts_with("Failed to load current snapshot"));
        assert!(matches!(tree.node_state(root), Some(NodeLoadState::Failed { .. })));

        backend.set_failing(false);
        let expansion = tree.expand_children(root).await.unwrap();
        assert_eq!(expansion.children.len(), 1);
        assert_eq!(backend.calls("load_current_manifests"), 2);
    }

    #[tokio::test]
    async fn test_leaf_nodes_are_not_expandable() {
        let tree = model(Arc::new(backend()));
        let data = tree.list_data_files()[0].id;
        let err = tree.expand_children(data).await.unwrap_err();
        assert!(matches!(err, IceviewError::NotExpandable(NodeKind::DataFile)));

        let err = tree.expand_children(NodeId(99)).await.unwrap_err();
        assert!(matches!(err, IceviewError::UnknownNode(NodeId(99))));
    }
}
