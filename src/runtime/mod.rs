//! Runtime abstraction between the browser core and whatever renders it.
//!
//! The controller only ever emits events. The CLI runtime forwards them to
//! the output handler and tests record them.

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

use crate::tree::{NodeId, TreeNode};
use crate::view::ViewState;

/// Runtime-specific errors
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("Event receiver closed")]
    ReceiverClosed,
}

/// Events the browser core emits to the rendering side
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RuntimeEvent {
    /// A table directory was scanned and a fresh session started
    DirectoryLoaded {
        metadata_dir: String,
        roots: Vec<TreeNode>,
        data_files: Vec<TreeNode>,
        latest_version: Option<String>,
    },

    /// Children of a node are available
    TreeExpanded {
        node: NodeId,
        children: Vec<TreeNode>,
        note: Option<String>,
    },

    /// The displayed view was replaced
    ViewChanged {
        view: Box<ViewState>,
        can_go_back: bool,
    },

    /// Back affordance changed without a view change
    BackAvailability { can_go_back: bool },

    /// An action failed; the view is unchanged
    Error { message: String },
}

/// Rendering adapter for the browser core
///
/// # Object Safety
/// This trait is object-safe and intended to be used as `Arc<dyn BrowserRuntime>`.
#[async_trait]
pub trait BrowserRuntime: Send + Sync + 'static {
    /// Emit an event to the frontend/output
    ///
    /// # Errors
    /// Returns `RuntimeError::ReceiverClosed` if the event cannot be delivered.
    fn emit(&self, event: RuntimeEvent) -> Result<(), RuntimeError>;

    /// Check if running in interactive mode (has a TTY)
    fn is_interactive(&self) -> bool;

    /// Graceful shutdown - flush events, close channels, etc.
    async fn shutdown(&self) -> Result<(), RuntimeError>;
}

#[cfg(feature = "cli")]
pub mod cli;
#[cfg(test)]
pub(crate) mod recording;

#[cfg(feature = "cli")]
pub use cli::CliRuntime;
