//! CLI module for browsing table metadata from a terminal.
//!
//! # Architecture
//!
//! The controller never prints. It emits `RuntimeEvent`s through the
//! `BrowserRuntime` abstraction; the CLI runtime sends them through a
//! channel that the output handler drains after every command.
//!
//! ```text
//! +--------------------+     +-------------+     +---------------+
//! | ViewModeController | --> | CliRuntime  | --> | output.rs     |
//! | (shared logic)     |     | (emit())    |     | (print/JSON)  |
//! +--------------------+     +-------------+     +---------------+
//! ```
//!
//! # REPL Mode
//!
//! When no command is provided via `-e` or `-f`, the CLI enters
//! interactive REPL mode. See `repl.rs` for details.

mod args;
mod bootstrap;
mod output;
mod repl;
mod runner;

pub use args::Args;
pub use bootstrap::{initialize, CliContext};
pub use output::{drain_events, format_tree, format_view};
pub use repl::{run_repl, PreviewTarget, ReplCommand};
pub use runner::{execute_batch, execute_command, execute_once, open_table};
