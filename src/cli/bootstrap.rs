//! CLI bootstrap - wire settings, backend, runtime and controller together.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::mpsc;

use crate::backend::{LocalBackend, MetadataBackend};
use crate::runtime::{BrowserRuntime, CliRuntime, RuntimeEvent};
use crate::settings::{get_with_env_fallback, IceviewSettings, SettingsManager, DEFAULT_TABLE_DIR_ENV};
use crate::view::ViewModeController;

use super::args::Args;

/// Context for CLI execution containing all initialized services.
pub struct CliContext {
    /// Runtime abstraction for event emission
    pub runtime: Arc<dyn BrowserRuntime>,

    /// Event receiver for output handling
    pub event_rx: mpsc::UnboundedReceiver<RuntimeEvent>,

    /// Browser state machine
    pub controller: ViewModeController,

    /// Settings manager
    pub settings_manager: Arc<SettingsManager>,

    /// Settings snapshot taken at startup
    pub settings: IceviewSettings,

    /// Command-line arguments
    pub args: Args,
}

impl CliContext {
    /// Build the context from already loaded settings.
    pub fn new(args: &Args, settings_manager: Arc<SettingsManager>, settings: IceviewSettings) -> Self {
        let allowed_root = args
            .allowed_root
            .clone()
            .or_else(|| settings.backend.allowed_root.as_ref().map(PathBuf::from));
        let backend: Arc<dyn MetadataBackend> = match allowed_root {
            Some(root) => Arc::new(LocalBackend::with_allowed_root(root)),
            None => Arc::new(LocalBackend::new()),
        };

        // Create event channel
        let (event_tx, event_rx) = mpsc::unbounded_channel::<RuntimeEvent>();

        // Create CLI runtime
        let runtime: Arc<dyn BrowserRuntime> =
            Arc::new(CliRuntime::new(event_tx, args.json));

        let preview_limit = args.limit.unwrap_or(settings.browser.preview_limit);
        let controller = ViewModeController::new(backend, runtime.clone())
            .with_preview_limit(preview_limit);

        Self {
            runtime,
            event_rx,
            controller,
            settings_manager,
            settings,
            args: args.clone(),
        }
    }

    /// Whether a directory load should be followed by selecting the newest
    /// metadata version.
    pub fn open_latest_on_load(&self) -> bool {
        self.settings.browser.open_latest_on_load && !self.args.no_open_latest
    }

    /// Table to open at startup: argument, settings, then environment.
    pub fn initial_table(&self) -> Option<String> {
        self.args.table.clone().or_else(|| {
            get_with_env_fallback(&self.settings.browser.default_table_dir, &DEFAULT_TABLE_DIR_ENV)
        })
    }

    /// Graceful shutdown.
    pub async fn shutdown(self) -> Result<()> {
        if let Err(e) = self.runtime.shutdown().await {
            tracing::warn!("Runtime shutdown error: {}", e);
        }
        Ok(())
    }
}

/// Initialize the CLI context with all services.
pub async fn initialize(args: &Args) -> Result<CliContext> {
    // Load .env file if present
    if let Err(e) = dotenvy::dotenv() {
        // Only warn on errors other than file not found
        if !matches!(e, dotenvy::Error::Io(_)) {
            tracing::warn!("Failed to load .env file: {}", e);
        }
    }

    // Load settings
    let settings_manager = Arc::new(
        SettingsManager::new()
            .await
            .context("Failed to initialize settings manager")?,
    );

    // Ensure settings file exists (creates template on first run)
    if let Err(e) = settings_manager.ensure_settings_file().await {
        tracing::warn!("Failed to create settings template: {}", e);
    }

    let settings = settings_manager.get().await;

    // Initialize logging based on verbosity
    let log_level = if args.verbose {
        "debug"
    } else {
        settings.advanced.log_level.as_str()
    };
    let directive: tracing_subscriber::filter::Directive = format!("iceview_lib={}", log_level)
        .parse()
        .with_context(|| format!("Invalid log level '{}'", log_level))?;
    let _ = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(directive))
        .try_init();

    if args.verbose {
        eprintln!(
            "[cli] Settings loaded from {}",
            settings_manager.path().display()
        );
        eprintln!("[cli] Preview limit: {}", settings.browser.preview_limit);
    }

    Ok(CliContext::new(args, settings_manager, settings))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use tempfile::TempDir;

    async fn context(args: &[&str], settings: IceviewSettings) -> (TempDir, CliContext) {
        let dir = TempDir::new().unwrap();
        let manager = SettingsManager::with_path(dir.path().join("settings.toml"))
            .await
            .unwrap();
        let args = Args::parse_from(args);
        let ctx = CliContext::new(&args, Arc::new(manager), settings);
        (dir, ctx)
    }

    #[tokio::test]
    async fn test_limit_argument_overrides_settings() {
        let mut settings = IceviewSettings::default();
        settings.browser.preview_limit = 50;

        let (_dir, ctx) = context(&["iceview"], settings.clone()).await;
        assert_eq!(ctx.controller.preview_limit(), 50);

        let (_dir, ctx) = context(&["iceview", "-n", "5"], settings).await;
        assert_eq!(ctx.controller.preview_limit(), 5);
    }

    #[tokio::test]
    async fn test_open_latest_flag() {
        let (_dir, ctx) = context(&["iceview"], IceviewSettings::default()).await;
        assert!(ctx.open_latest_on_load());

        let (_dir, ctx) = context(&["iceview", "--no-open-latest"], IceviewSettings::default()).await;
        assert!(!ctx.open_latest_on_load());
    }

    #[tokio::test]
    async fn test_initial_table_prefers_argument() {
        let mut settings = IceviewSettings::default();
        settings.browser.default_table_dir = Some("/warehouse/from-settings".to_string());

        let (_dir, ctx) = context(&["iceview", "/warehouse/from-arg"], settings.clone()).await;
        assert_eq!(ctx.initial_table().as_deref(), Some("/warehouse/from-arg"));

        let (_dir, ctx) = context(&["iceview"], settings).await;
        assert_eq!(ctx.initial_table().as_deref(), Some("/warehouse/from-settings"));
    }
}
