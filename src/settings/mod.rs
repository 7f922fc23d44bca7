//! TOML-based settings for iceview.
//!
//! Settings are loaded from `~/.iceview/settings.toml` with environment variable
//! interpolation support. The default table directory may also come from the
//! environment through the `get_with_env_fallback` helper.
//!
//! # Usage
//!
//! ```rust,ignore
//! use iceview_lib::settings::{SettingsManager, get_with_env_fallback};
//!
//! let manager = SettingsManager::new().await?;
//! let settings = manager.get().await;
//!
//! let table = get_with_env_fallback(
//!     &settings.browser.default_table_dir,
//!     &["ICEVIEW_DEFAULT_TABLE_DIR", "DEFAULT_METADATA_DIR"],
//! );
//! ```

pub mod loader;
pub mod schema;

pub use loader::{get_with_env_fallback, SettingsManager, DEFAULT_TABLE_DIR_ENV};
pub use schema::IceviewSettings;
