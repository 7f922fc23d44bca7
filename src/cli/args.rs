//! CLI argument parsing using clap.
//!
//! Defines the command-line interface for iceview.

use clap::Parser;
use std::path::PathBuf;

/// iceview - Browse Iceberg table metadata from the terminal
#[derive(Parser, Debug, Clone)]
#[command(name = "iceview")]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Table root or metadata directory to open
    /// (default: settings, then ICEVIEW_DEFAULT_TABLE_DIR / DEFAULT_METADATA_DIR)
    pub table: Option<String>,

    /// Execute a single command and exit
    #[arg(short = 'e', long, conflicts_with = "file")]
    pub execute: Option<String>,

    /// Execute commands from a file (one per line) and exit
    #[arg(short = 'f', long, conflicts_with = "execute")]
    pub file: Option<PathBuf>,

    /// Refuse to read files outside this directory (overrides settings)
    #[arg(long, env = "ICEVIEW_ALLOWED_ROOT")]
    pub allowed_root: Option<PathBuf>,

    /// Rows sampled per data-file preview, 1-100 (overrides settings)
    #[arg(short = 'n', long)]
    pub limit: Option<usize>,

    /// Do not select the newest metadata version after opening a table
    #[arg(long)]
    pub no_open_latest: bool,

    /// Output events as JSON lines (for scripting/parsing)
    #[arg(long)]
    pub json: bool,

    /// Only print views, not tree updates
    #[arg(long, short = 'q')]
    pub quiet: bool,

    /// Show verbose output (debug information)
    #[arg(short = 'v', long)]
    pub verbose: bool,
}
