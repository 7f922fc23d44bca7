//! CLI output handling.
//!
//! Drains events the controller emitted through the runtime channel and
//! renders them as text or JSON lines.

use std::fmt::{Display, Write as _};
use std::io::{self, Write};

use anyhow::Result;
use tokio::sync::mpsc;

use crate::fields::ResolvedField;
use crate::runtime::RuntimeEvent;
use crate::tree::{MetadataTreeModel, NodeId, NodeLoadState, TreeNode};
use crate::view::{Overview, ViewState};

const CELL_WIDTH: usize = 32;

/// Render every event currently queued on the channel.
///
/// # Arguments
///
/// * `event_rx` - Channel receiver for runtime events
/// * `json_mode` - If true, output events as JSON lines
/// * `quiet_mode` - If true, only output views and errors
pub fn drain_events(
    event_rx: &mut mpsc::UnboundedReceiver<RuntimeEvent>,
    json_mode: bool,
    quiet_mode: bool,
) -> Result<()> {
    while let Ok(event) = event_rx.try_recv() {
        render_event(&event, json_mode, quiet_mode)?;
    }
    Ok(())
}

fn render_event(event: &RuntimeEvent, json_mode: bool, quiet_mode: bool) -> Result<()> {
    if json_mode {
        // JSON mode: output each event as a JSON line
        println!("{}", serde_json::to_string(event)?);
        io::stdout().flush()?;
        return Ok(());
    }

    match event {
        RuntimeEvent::DirectoryLoaded {
            metadata_dir,
            roots,
            data_files,
            ..
        } => {
            if !quiet_mode {
                println!("Loaded {}", metadata_dir);
                if roots.is_empty() {
                    println!("  (no metadata files)");
                }
                for node in roots.iter().chain(data_files) {
                    println!("  {}", format_node(node));
                }
            }
        }
        RuntimeEvent::TreeExpanded { children, note, .. } => {
            if !quiet_mode {
                for node in children {
                    println!("  {}", format_node(node));
                }
                if let Some(note) = note {
                    println!("  ({})", note);
                }
            }
        }
        RuntimeEvent::ViewChanged { view, .. } => {
            println!("{}", format_view(view));
        }
        RuntimeEvent::BackAvailability { .. } => {}
        RuntimeEvent::Error { message } => {
            eprintln!("Error: {}", message);
        }
    }

    io::stdout().flush()?;
    Ok(())
}

/// One-line rendering of a tree node: `[id] kind name`.
pub fn format_node(node: &TreeNode) -> String {
    let mut line = format!("[{}] {} {}", node.id.0, node.kind, node.display_name);
    if node.is_latest {
        line.push_str(" (latest)");
    }
    line
}

/// Indented rendering of every loaded level of the tree.
pub fn format_tree(tree: &MetadataTreeModel) -> String {
    fn walk(tree: &MetadataTreeModel, id: NodeId, depth: usize, out: &mut String) {
        let Some(node) = tree.node(id) else {
            return;
        };
        let _ = writeln!(out, "{}{}", "  ".repeat(depth), format_node(&node));
        match tree.node_state(id) {
            Some(NodeLoadState::Loaded { expansion }) => {
                for child in expansion.children {
                    walk(tree, child, depth + 1, out);
                }
                if let Some(note) = expansion.note {
                    let _ = writeln!(out, "{}({})", "  ".repeat(depth + 1), note);
                }
            }
            Some(NodeLoadState::Failed { message }) => {
                let _ = writeln!(out, "{}(failed: {})", "  ".repeat(depth + 1), message);
            }
            _ => {}
        }
    }

    let mut out = String::new();
    for root in tree.list_roots() {
        walk(tree, root.id, 0, &mut out);
    }
    for node in tree.list_data_files() {
        let _ = writeln!(out, "{}", format_node(&node));
    }
    if out.is_empty() {
        out.push_str("(no metadata files)\n");
    }
    out
}

fn opt<T: Display>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string())
}

pub fn format_field(field: &ResolvedField) -> String {
    format!("{}:{}({})", field.id, field.name, field.field_type)
}

/// Text rendering of a view.
pub fn format_view(view: &ViewState) -> String {
    let mut out = String::new();
    if view.empty_visible {
        out.push_str("(nothing selected)");
        return out;
    }

    let _ = writeln!(out, "== {} [{}] ==", view.title, view.mode.as_str());

    match &view.overview {
        Some(Overview::Metadata { info, .. }) => {
            let _ = writeln!(out, "table uuid:       {}", opt(info.table_uuid.as_deref()));
            let _ = writeln!(out, "location:         {}", opt(info.location.as_deref()));
            let _ = writeln!(out, "format version:   {}", opt(info.format_version));
            let _ = writeln!(out, "current snapshot: {}", opt(info.current_snapshot_id));
            let _ = writeln!(out, "snapshots:        {}", info.snapshots_count);
            if let Some(schema) = &info.schema {
                let _ = writeln!(out, "schema {}:", opt(schema.schema_id));
                for field in &schema.fields {
                    let _ = writeln!(
                        out,
                        "  {:>4}  {:<24} {}{}",
                        field.id,
                        field.name,
                        field.field_type,
                        if field.required { "  required" } else { "" }
                    );
                }
            }
            if !info.properties.is_empty() {
                out.push_str("properties:\n");
                for (key, value) in &info.properties {
                    let _ = writeln!(out, "  {} = {}", key, value);
                }
            }
        }
        Some(Overview::Snapshot {
            summary,
            manifest_paths,
            ..
        }) => {
            let _ = writeln!(out, "added snapshot:   {}", opt(summary.added_snapshot_id));
            let _ = writeln!(out, "sequence number:  {}", opt(summary.sequence_number));
            let _ = writeln!(
                out,
                "data files:       +{} ~{} -{}",
                opt(summary.added_data_files_count),
                opt(summary.existing_data_files_count),
                opt(summary.deleted_data_files_count)
            );
            let _ = writeln!(
                out,
                "rows:             +{} ~{} -{}",
                opt(summary.added_rows_count),
                opt(summary.existing_rows_count),
                opt(summary.deleted_rows_count)
            );
            let _ = writeln!(out, "manifests ({}):", manifest_paths.len());
            for path in manifest_paths {
                let _ = writeln!(out, "  {}", path);
            }
        }
        Some(Overview::Manifest {
            entries_count,
            data_files,
            ..
        }) => {
            let _ = writeln!(
                out,
                "entries: {}, data files: {}",
                entries_count,
                data_files.len()
            );
            if data_files.is_empty() {
                out.push_str("(no data files in this manifest)\n");
            }
            for (n, file) in data_files.iter().enumerate() {
                let _ = writeln!(
                    out,
                    "[{}] {} ({}, {} records, {} bytes)",
                    n,
                    opt(file.path.as_deref()),
                    opt(file.format.as_deref()),
                    opt(file.record_count),
                    opt(file.size_bytes)
                );
                if !file.partition.is_empty() {
                    let _ = writeln!(
                        out,
                        "    partition: {}",
                        serde_json::Value::Object(file.partition.clone())
                    );
                }
                for (m, column_file) in file.column_files.iter().enumerate() {
                    let fields: Vec<String> = column_file.fields.iter().map(format_field).collect();
                    let _ = writeln!(
                        out,
                        "    [{}.{}] {} {}",
                        n,
                        m,
                        opt(column_file.path.as_deref()),
                        fields.join(", ")
                    );
                }
            }
        }
        None => {}
    }

    if let Some(table) = &view.table {
        let _ = writeln!(out, "{}", table.fields.join(" | "));
        for row in &table.rows {
            let cells: Vec<String> = table
                .fields
                .iter()
                .map(|field| match row.get(field) {
                    Some(serde_json::Value::String(s)) => truncate(s, CELL_WIDTH),
                    Some(value) => truncate(&value.to_string(), CELL_WIDTH),
                    None => String::new(),
                })
                .collect();
            let _ = writeln!(out, "{}", cells.join(" | "));
        }
        let _ = writeln!(out, "({} rows, limit {})", table.rows.len(), table.limit);
    }

    out.trim_end().to_string()
}

/// Truncate a string to a maximum length.
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
