//! Loading of `~/.iceview/settings.toml`.
//!
//! Path-valued settings may name an environment variable (`$VAR` or
//! `${VAR}`). A missing file yields the defaults; the CLI writes the
//! commented template on first run.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tokio::sync::RwLock;

use super::schema::IceviewSettings;

const TEMPLATE: &str = include_str!("template.toml");

/// Environment variables consulted for the default table directory, in order.
pub const DEFAULT_TABLE_DIR_ENV: [&str; 2] = ["ICEVIEW_DEFAULT_TABLE_DIR", "DEFAULT_METADATA_DIR"];

pub fn settings_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".iceview")
        .join("settings.toml")
}

/// Settings read once at startup, with environment references resolved.
pub struct SettingsManager {
    settings: RwLock<IceviewSettings>,
    path: PathBuf,
}

impl SettingsManager {
    pub async fn new() -> Result<Self> {
        Self::with_path(settings_path()).await
    }

    /// Settings backed by a specific file.
    pub async fn with_path(path: PathBuf) -> Result<Self> {
        let settings = load(&path).await?;
        Ok(Self {
            settings: RwLock::new(settings),
            path,
        })
    }

    pub async fn get(&self) -> IceviewSettings {
        self.settings.read().await.clone()
    }

    /// Look up a setting by dotted key, e.g. `browser.preview_limit`.
    pub async fn get_value(&self, key: &str) -> Result<serde_json::Value> {
        let json = serde_json::to_value(&*self.settings.read().await)?;
        key.split('.')
            .try_fold(&json, |node, part| node.get(part))
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("Setting '{}' not found", key))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write the commented template when no settings file exists yet.
    ///
    /// Returns `true` if a new file was created.
    pub async fn ensure_settings_file(&self) -> Result<bool> {
        if self.path.exists() {
            return Ok(false);
        }
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&self.path, TEMPLATE)
            .await
            .with_context(|| format!("Failed to write {}", self.path.display()))?;
        tracing::info!("Generated settings template at {}", self.path.display());
        Ok(true)
    }
}

async fn load(path: &Path) -> Result<IceviewSettings> {
    if !path.exists() {
        tracing::debug!("No settings at {}, using defaults", path.display());
        return Ok(IceviewSettings::default());
    }

    let contents = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let mut settings: IceviewSettings = toml::from_str(&contents)
        .with_context(|| format!("Invalid settings in {}", path.display()))?;

    for value in [
        &mut settings.browser.default_table_dir,
        &mut settings.backend.allowed_root,
    ]
    .into_iter()
    .flatten()
    {
        if let Some(resolved) = env_reference(value) {
            *value = resolved;
        }
    }

    tracing::info!("Loaded settings from {}", path.display());
    Ok(settings)
}

/// Value of the variable named by `$VAR` or `${VAR}`, if it is set.
fn env_reference(value: &str) -> Option<String> {
    let name = value.trim().strip_prefix('$')?;
    let name = name
        .strip_prefix('{')
        .and_then(|n| n.strip_suffix('}'))
        .unwrap_or(name);
    std::env::var(name).ok()
}

/// The setting when non-empty, otherwise the first non-empty variable of
/// `env_vars`.
pub fn get_with_env_fallback(setting: &Option<String>, env_vars: &[&str]) -> Option<String> {
    setting
        .iter()
        .cloned()
        .chain(env_vars.iter().filter_map(|var| std::env::var(var).ok()))
        .find(|v| !v.is_empty())
}
