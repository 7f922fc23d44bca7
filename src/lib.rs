//! Core of an Iceberg table metadata browser.
//!
//! A table directory is scanned into a lazily expanded tree
//! (metadata version, snapshot, manifest), field ids are resolved against
//! the selected version's schema, and a display-mode state machine keeps
//! track of what is shown and how to get back to it after a preview.

pub mod backend;
pub mod error;
pub mod fields;
pub mod paths;
pub mod runtime;
pub mod settings;
pub mod tree;
pub mod view;

#[cfg(feature = "cli")]
pub mod cli;

pub use backend::{LocalBackend, MetadataBackend};
pub use error::{IceviewError, Result};
pub use fields::FieldResolver;
pub use runtime::{BrowserRuntime, RuntimeEvent};
pub use settings::{IceviewSettings, SettingsManager};
pub use tree::{MetadataTreeModel, NodeId, NodeKind};
pub use view::{Action, NavigationHistory, ViewMode, ViewModeController, ViewState};
