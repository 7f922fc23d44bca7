//! CLI execution runner.
//!
//! Turns parsed commands into controller actions and prints whatever the
//! controller emitted.

use std::path::Path;

use anyhow::{bail, Context, Result};

use crate::tree::NodeKind;
use crate::view::{Action, Overview, ViewState};

use super::bootstrap::CliContext;
use super::output::{drain_events, format_field, format_tree};
use super::repl::{PreviewTarget, ReplCommand, HELP};

/// Load a table and, unless disabled, select its newest metadata version.
///
/// Returns whether every dispatched action succeeded.
pub async fn open_table(ctx: &mut CliContext, table_root: &str) -> Result<bool> {
    let mut ok = ctx
        .controller
        .dispatch(Action::LoadDirectory {
            table_root: table_root.to_string(),
        })
        .await;

    if ok && ctx.open_latest_on_load() {
        if let Some(latest) = ctx.controller.tree().and_then(|tree| tree.latest_root()) {
            ok = ctx
                .controller
                .dispatch(Action::SelectMetadata { node: latest.id })
                .await;
        }
    }

    flush(ctx)?;
    Ok(ok)
}

/// Execute one parsed command.
///
/// Action failures are reported through the event stream and yield
/// `Ok(false)`. Usage errors are returned as `Err`.
pub async fn execute_command(ctx: &mut CliContext, command: ReplCommand) -> Result<bool> {
    let action = match command {
        ReplCommand::Quit | ReplCommand::Empty => return Ok(true),
        ReplCommand::Help => {
            println!("{}", HELP);
            return Ok(true);
        }
        ReplCommand::Unknown(input) => bail!("Unknown command: {} (type help)", input),
        ReplCommand::Open(path) => return open_table(ctx, &path).await,
        ReplCommand::List => {
            let Some(tree) = ctx.controller.tree() else {
                bail!("No table directory loaded");
            };
            print!("{}", format_tree(tree));
            return Ok(true);
        }
        ReplCommand::Field(id) => {
            let Some(resolver) = ctx.controller.resolver() else {
                bail!("No table directory loaded");
            };
            let field = resolver.resolve_or_placeholder(id);
            if ctx.args.json {
                println!("{}", serde_json::to_string(&field)?);
            } else {
                println!("{}", format_field(&field));
            }
            return Ok(true);
        }
        ReplCommand::Show => {
            let view = ctx.controller.view();
            if view.empty_visible {
                println!("(nothing selected)");
            } else {
                println!("{}", view.primary_content);
            }
            return Ok(true);
        }
        ReplCommand::Config(key) => {
            let value = ctx.settings_manager.get_value(&key).await?;
            println!("{}", serde_json::to_string_pretty(&value)?);
            return Ok(true);
        }
        ReplCommand::Expand(node) => Action::ExpandNode { node },
        ReplCommand::Select(node) => {
            match ctx.controller.tree().and_then(|tree| tree.node(node)) {
                Some(found) => match found.kind {
                    NodeKind::Metadata => Action::SelectMetadata { node },
                    NodeKind::Snapshot => Action::SelectSnapshot { node },
                    NodeKind::Manifest => Action::SelectManifest { node },
                    NodeKind::DataFile => Action::PreviewDataFile {
                        path: found.path,
                        format: None,
                    },
                },
                // Let the controller report the missing session or node
                None => Action::SelectMetadata { node },
            }
        }
        ReplCommand::Preview { target, format } => {
            let (path, hint) = resolve_preview_target(ctx.controller.view(), &target)?;
            Action::PreviewDataFile {
                path,
                format: format.or(hint),
            }
        }
        ReplCommand::Back => {
            if !ctx.controller.can_go_back() && !ctx.args.quiet {
                eprintln!("(nothing to go back to)");
            }
            Action::Back
        }
    };

    let ok = ctx.controller.dispatch(action).await;
    flush(ctx)?;
    Ok(ok)
}

/// Parse and execute a single command line.
pub async fn execute_once(ctx: &mut CliContext, input: &str) -> Result<bool> {
    execute_command(ctx, ReplCommand::parse(input)).await
}

/// Execute commands from a file, one per line.
///
/// Lines starting with `#` are treated as comments. Execution stops on the
/// first failing command.
pub async fn execute_batch(ctx: &mut CliContext, file_path: &Path) -> Result<()> {
    let content = tokio::fs::read_to_string(file_path)
        .await
        .with_context(|| format!("Failed to read command file: {}", file_path.display()))?;

    let commands: Vec<&str> = content
        .lines()
        .map(|line| line.trim())
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .collect();

    if commands.is_empty() {
        bail!("No commands found in file: {}", file_path.display());
    }

    let total = commands.len();
    for (i, line) in commands.iter().enumerate() {
        if ctx.args.verbose {
            eprintln!("[batch] [{}/{}] {}", i + 1, total, line);
        }
        if matches!(ReplCommand::parse(line), ReplCommand::Quit) {
            break;
        }
        if !execute_once(ctx, line).await? {
            bail!("Command failed: {}", line);
        }
    }

    Ok(())
}

/// Map a preview target to a path and a format hint.
///
/// Index targets refer to the data files listed by the manifest view.
pub fn resolve_preview_target(
    view: &ViewState,
    target: &PreviewTarget,
) -> Result<(String, Option<String>)> {
    let index_target = match target {
        PreviewTarget::Path(path) => return Ok((path.clone(), None)),
        PreviewTarget::DataFile(n) => (*n, None),
        PreviewTarget::ColumnFile(n, m) => (*n, Some(*m)),
    };

    let Some(Overview::Manifest { data_files, .. }) = &view.overview else {
        bail!("Select a manifest before previewing by index");
    };
    let (n, column) = index_target;
    let Some(data_file) = data_files.get(n) else {
        bail!("No data file {} in this manifest ({} listed)", n, data_files.len());
    };

    match column {
        None => {
            let Some(path) = &data_file.path else {
                bail!("Data file {} has no path", n);
            };
            Ok((path.clone(), data_file.format.clone()))
        }
        Some(m) => {
            let Some(column_file) = data_file.column_files.get(m) else {
                bail!("Data file {} has no column file {}", n, m);
            };
            let Some(path) = &column_file.path else {
                bail!("Column file {}.{} has no path", n, m);
            };
            Ok((path.clone(), None))
        }
    }
}

fn flush(ctx: &mut CliContext) -> Result<()> {
    drain_events(&mut ctx.event_rx, ctx.args.json, ctx.args.quiet)
}
