//! What the browser shows and how it moves between views.
//!
//! [`ViewModeController`] owns the per-directory [`Session`] and the current
//! [`ViewState`]. Drilling into a data-file preview pushes the current view
//! onto the session's [`NavigationHistory`]; `back` pops it.

mod controller;
mod history;
mod state;


pub use controller::{Action, Session, ViewModeController};
pub use history::NavigationHistory;
pub use state::{
    Overview, PreviewTable, ResolvedColumnFile, ResolvedDataFile, ViewMode, ViewState,
};
