//! Settings schema definitions for iceview configuration.
//!
//! All settings structs use `#[serde(default)]` to allow partial configuration files.
//! Missing fields are filled with sensible defaults.

use serde::{Deserialize, Serialize};

use crate::backend::MAX_PREVIEW_ROWS;

/// Root settings structure for iceview.
///
/// Loaded from `~/.iceview/settings.toml` with environment variable interpolation support.
/// Version field enables future migrations.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IceviewSettings {
    /// Schema version for migrations
    pub version: u32,

    /// Browsing behavior
    pub browser: BrowserSettings,

    /// File access
    pub backend: BackendSettings,

    /// Advanced/debug settings
    pub advanced: AdvancedSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserSettings {
    /// Table opened when none is given on the command line (supports $ENV_VAR syntax)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_table_dir: Option<String>,

    /// Select the newest metadata version right after a directory load
    pub open_latest_on_load: bool,

    /// Rows sampled per data-file preview (1-100)
    pub preview_limit: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct BackendSettings {
    /// Refuse paths outside this directory (supports $ENV_VAR syntax)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allowed_root: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AdvancedSettings {
    /// Log level: "error" | "warn" | "info" | "debug" | "trace"
    pub log_level: String,
}

impl Default for IceviewSettings {
    fn default() -> Self {
        Self {
            version: 1,
            browser: BrowserSettings::default(),
            backend: BackendSettings::default(),
            advanced: AdvancedSettings::default(),
        }
    }
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            default_table_dir: None,
            open_latest_on_load: true,
            preview_limit: MAX_PREVIEW_ROWS,
        }
    }
}

impl Default for AdvancedSettings {
    fn default() -> Self {
        Self {
            log_level: "warn".to_string(),
        }
    }
}
