//! Display-mode state machine driving the browser.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::backend::{BackendError, DataFileFormat, FileKind, MetadataBackend, MAX_PREVIEW_ROWS};
use crate::error::{IceviewError, Result};
use crate::fields::FieldResolver;
use crate::paths::{strip_file_scheme, to_metadata_dir};
use crate::runtime::{BrowserRuntime, RuntimeEvent};
use crate::tree::{Expansion, MetadataTreeModel, NodeId, NodeKind, TreeNode};

use super::history::NavigationHistory;
use super::state::{ViewMode, ViewState};

/// Everything scoped to one loaded table directory.
pub struct Session {
    pub metadata_dir: String,
    pub resolver: FieldResolver,
    pub tree: MetadataTreeModel,
    pub history: NavigationHistory,
}

/// User actions the controller accepts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    LoadDirectory { table_root: String },
    SelectMetadata { node: NodeId },
    ExpandNode { node: NodeId },
    SelectSnapshot { node: NodeId },
    SelectManifest { node: NodeId },
    PreviewDataFile { path: String, format: Option<String> },
    Back,
}

pub struct ViewModeController {
    backend: Arc<dyn MetadataBackend>,
    runtime: Arc<dyn BrowserRuntime>,
    session: Option<Session>,
    view: ViewState,
    last_error: Option<String>,
    preview_limit: usize,
}

impl ViewModeController {
    pub fn new(backend: Arc<dyn MetadataBackend>, runtime: Arc<dyn BrowserRuntime>) -> Self {
        Self {
            backend,
            runtime,
            session: None,
            view: ViewState::empty(),
            last_error: None,
            preview_limit: MAX_PREVIEW_ROWS,
        }
    }

    /// Rows sampled per preview, clamped to `1..=MAX_PREVIEW_ROWS`.
    pub fn with_preview_limit(mut self, limit: usize) -> Self {
        self.preview_limit = limit.clamp(1, MAX_PREVIEW_ROWS);
        self
    }

    pub fn mode(&self) -> ViewMode {
        self.view.mode
    }

    pub fn view(&self) -> &ViewState {
        &self.view
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn tree(&self) -> Option<&MetadataTreeModel> {
        self.session.as_ref().map(|s| &s.tree)
    }

    pub fn resolver(&self) -> Option<&FieldResolver> {
        self.session.as_ref().map(|s| &s.resolver)
    }

    pub fn can_go_back(&self) -> bool {
        self.session.as_ref().is_some_and(|s| !s.history.is_empty())
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn preview_limit(&self) -> usize {
        self.preview_limit
    }

    /// Run an action, turning any failure into a visible error message.
    ///
    /// Returns whether the action succeeded.
    pub async fn dispatch(&mut self, action: Action) -> bool {
        tracing::debug!("Dispatching {:?}", action);
        let result = match action {
            Action::LoadDirectory { table_root } => self.load_directory(&table_root).await,
            Action::SelectMetadata { node } => self.select_metadata(node).await,
            Action::ExpandNode { node } => self.expand_node(node).await.map(|_| ()),
            Action::SelectSnapshot { node } => self.select_snapshot(node).await,
            Action::SelectManifest { node } => self.select_manifest(node).await,
            Action::PreviewDataFile { path, format } => {
                self.preview_data_file(&path, format.as_deref()).await
            }
            Action::Back => {
                self.back();
                Ok(())
            }
        };

        match result {
            Ok(()) => {
                self.last_error = None;
                true
            }
            Err(err) => {
                let message = err.to_string();
                tracing::warn!("{}", message);
                self.last_error = Some(message.clone());
                self.emit(RuntimeEvent::Error { message });
                false
            }
        }
    }

    /// Scan a table directory and start a fresh session.
    pub async fn load_directory(&mut self, table_root: &str) -> Result<()> {
        let metadata_dir = to_metadata_dir(strip_file_scheme(table_root));
        if metadata_dir.is_empty() {
            return Err(IceviewError::backend(
                "Failed to load directory",
                BackendError::InvalidPath("table path must not be empty".to_string()),
            ));
        }

        let listing = self
            .backend
            .list_directory(&metadata_dir)
            .await
            .map_err(|e| IceviewError::backend("Failed to load directory", e))?;

        let tree = MetadataTreeModel::from_listing(Arc::clone(&self.backend), &listing);
        tracing::info!(
            "Loaded {} with {} metadata versions",
            metadata_dir,
            listing.metadata_files.len()
        );

        self.emit(RuntimeEvent::DirectoryLoaded {
            metadata_dir: metadata_dir.clone(),
            roots: tree.list_roots(),
            data_files: tree.list_data_files(),
            latest_version: listing.latest_version.clone(),
        });

        self.session = Some(Session {
            metadata_dir,
            resolver: FieldResolver::new(),
            tree,
            history: NavigationHistory::new(),
        });
        self.set_view(ViewState::empty());
        self.emit(RuntimeEvent::BackAvailability { can_go_back: false });
        Ok(())
    }

    /// Show a metadata version and rebuild the field index from its schema.
    pub async fn select_metadata(&mut self, id: NodeId) -> Result<()> {
        let node = self.node_of_kind(id, NodeKind::Metadata)?;

        let file = self
            .backend
            .load_file(&node.path, FileKind::Json)
            .await
            .map_err(|e| IceviewError::backend("Failed to load metadata file", e))?;
        let info = self
            .backend
            .load_metadata_info(&node.path)
            .await
            .map_err(|e| IceviewError::backend("Failed to load metadata info", e))?;

        let session = self.session.as_mut().ok_or(IceviewError::NoSession)?;
        let fields = info.schema.as_ref().map(|s| s.fields.clone()).unwrap_or_default();
        session.resolver.rebuild_index(Some(&node.path), fields);

        self.set_view(ViewState::metadata_overview(&node.path, file.formatted, info));
        Ok(())
    }

    /// Fetch (once) the children of a node. The display mode is unchanged.
    pub async fn expand_node(&self, id: NodeId) -> Result<Expansion> {
        let tree = self.tree().ok_or(IceviewError::NoSession)?;
        let expansion = tree.expand_children(id).await?;

        let children: Vec<TreeNode> = expansion
            .children
            .iter()
            .filter_map(|child| tree.node(*child))
            .collect();
        self.emit(RuntimeEvent::TreeExpanded {
            node: id,
            children,
            note: expansion.note.clone(),
        });
        Ok(expansion)
    }

    pub async fn select_snapshot(&mut self, id: NodeId) -> Result<()> {
        let node = self.node_of_kind(id, NodeKind::Snapshot)?;
        let file = self
            .backend
            .load_snapshot_file(&node.path)
            .await
            .map_err(|e| IceviewError::backend("Failed to load snapshot file", e))?;

        self.set_view(ViewState::snapshot_overview(&node.path, file));
        Ok(())
    }

    /// Show a manifest with its column field ids resolved against the schema
    /// of the metadata version it belongs to.
    pub async fn select_manifest(&mut self, id: NodeId) -> Result<()> {
        let node = self.node_of_kind(id, NodeKind::Manifest)?;
        let session = self.session.as_ref().ok_or(IceviewError::NoSession)?;

        // The resolver may hold another version's schema
        let owner = session
            .tree
            .owning_root(id)
            .and_then(|root| session.tree.node(root))
            .filter(|root| session.resolver.source() != Some(root.path.as_str()));
        let owner_info = match &owner {
            Some(root) => Some(
                self.backend
                    .load_metadata_info(&root.path)
                    .await
                    .map_err(|e| IceviewError::backend("Failed to load metadata info", e))?,
            ),
            None => None,
        };

        let manifest = self
            .backend
            .load_manifest_file(&node.path)
            .await
            .map_err(|e| IceviewError::backend("Failed to load manifest file", e))?;

        let session = self.session.as_mut().ok_or(IceviewError::NoSession)?;
        if let (Some(root), Some(info)) = (owner, owner_info) {
            tracing::debug!("Switching field index to {}", root.path);
            let fields = info.schema.map(|s| s.fields).unwrap_or_default();
            session.resolver.rebuild_index(Some(&root.path), fields);
        }

        let view = ViewState::manifest_overview(&node.path, manifest, &session.resolver);
        self.set_view(view);
        Ok(())
    }

    /// Sample rows of a data or column file. The current view is pushed onto
    /// the history once the rows have arrived.
    pub async fn preview_data_file(&mut self, path: &str, format: Option<&str>) -> Result<()> {
        if self.session.is_none() {
            return Err(IceviewError::NoSession);
        }

        let path = strip_file_scheme(path.trim());
        let format = DataFileFormat::resolve(path, format)
            .map_err(|e| IceviewError::backend("Failed to preview data file", e))?;
        let data = self
            .backend
            .preview_data_file(path, format, self.preview_limit)
            .await
            .map_err(|e| IceviewError::backend("Failed to preview data file", e))?;

        let session = self.session.as_mut().ok_or(IceviewError::NoSession)?;
        let previous = std::mem::replace(&mut self.view, ViewState::preview(data));
        session.history.push(previous);
        self.announce_view();
        Ok(())
    }

    /// Restore the most recently pushed view. No-op when there is none.
    pub fn back(&mut self) -> bool {
        let Some(previous) = self.session.as_mut().and_then(|s| s.history.pop()) else {
            tracing::debug!("Back with empty history ignored");
            return false;
        };
        self.set_view(previous);
        true
    }

    fn node_of_kind(&self, id: NodeId, expected: NodeKind) -> Result<TreeNode> {
        let tree = self.tree().ok_or(IceviewError::NoSession)?;
        let node = tree.node(id).ok_or(IceviewError::UnknownNode(id))?;
        if node.kind != expected {
            return Err(IceviewError::WrongNodeKind {
                node: id,
                expected,
                actual: node.kind,
            });
        }
        Ok(node)
    }

    fn set_view(&mut self, view: ViewState) {
        tracing::debug!("View {:?} -> {:?}", self.view.mode, view.mode);
        self.view = view;
        self.announce_view();
    }

    fn announce_view(&self) {
        self.emit(RuntimeEvent::ViewChanged {
            view: Box::new(self.view.clone()),
            can_go_back: self.can_go_back(),
        });
    }

    fn emit(&self, event: RuntimeEvent) {
        if let Err(e) = self.runtime.emit(event) {
            tracing::warn!("Failed to emit runtime event: {}", e);
        }
    }
}
