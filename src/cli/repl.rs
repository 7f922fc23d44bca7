//! Lightweight REPL (Read-Eval-Print-Loop) for iceview.
//!
//! Provides an interactive mode when no command is provided via `-e` or `-f`.

use std::io::{self, BufRead, Write};

use anyhow::Result;

use crate::tree::NodeId;

use super::bootstrap::CliContext;
use super::runner::execute_command;

pub const HELP: &str = "\
Commands:
  open <path>            load a table root or metadata directory
  ls                     show the metadata tree
  expand <id>            load the children of a metadata or snapshot node
  select <id>            show a node (data-file nodes are previewed)
  preview <n>[.<m>] [fmt] preview data file n (or its column file m) of the manifest view
  preview <path> [fmt]   preview a data or column file by path
  back                   return to the view before the last preview
  field <id>             resolve a field id against the loaded schema
  show                   print the formatted file behind the current view
  config <key>           print a setting, e.g. browser.preview_limit
  help                   show this help
  /quit                  exit";

/// What a preview command points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreviewTarget {
    Path(String),
    /// Data file by index in the manifest view
    DataFile(usize),
    /// Column file `m` of data file `n`
    ColumnFile(usize, usize),
}

impl PreviewTarget {
    fn parse(input: &str) -> Option<Self> {
        if input.contains('/') {
            return Some(PreviewTarget::Path(input.to_string()));
        }
        match input.split_once('.') {
            Some((n, m)) => Some(PreviewTarget::ColumnFile(n.parse().ok()?, m.parse().ok()?)),
            None => input.parse().ok().map(PreviewTarget::DataFile),
        }
    }
}

/// REPL command variants.
#[derive(Debug, Clone, PartialEq)]
pub enum ReplCommand {
    /// Exit the REPL
    Quit,
    Help,
    Open(String),
    List,
    Expand(NodeId),
    Select(NodeId),
    Preview {
        target: PreviewTarget,
        format: Option<String>,
    },
    Back,
    Field(i32),
    Show,
    Config(String),
    /// Unknown command (will show help)
    Unknown(String),
    /// Empty input (skip)
    Empty,
}

fn parse_node(input: &str) -> Option<NodeId> {
    input.strip_prefix('#').unwrap_or(input).parse().ok().map(NodeId)
}

impl ReplCommand {
    /// Parse user input into a REPL command.
    pub fn parse(input: &str) -> Self {
        let trimmed = input.trim();

        if trimmed.is_empty() {
            return ReplCommand::Empty;
        }

        let (head, rest) = match trimmed.split_once(char::is_whitespace) {
            Some((head, rest)) => (head, rest.trim()),
            None => (trimmed, ""),
        };

        let command = match head.to_lowercase().as_str() {
            "/quit" | "/exit" | "/q" | "quit" | "exit" => Some(ReplCommand::Quit),
            "help" | "/help" | "?" => Some(ReplCommand::Help),
            "open" | "load" if !rest.is_empty() => Some(ReplCommand::Open(rest.to_string())),
            "ls" | "tree" => Some(ReplCommand::List),
            "expand" => parse_node(rest).map(ReplCommand::Expand),
            "select" => parse_node(rest).map(ReplCommand::Select),
            "preview" => {
                let mut parts = rest.split_whitespace();
                let target = parts.next().and_then(PreviewTarget::parse);
                let format = parts.next().map(str::to_string);
                target.map(|target| ReplCommand::Preview { target, format })
            }
            "back" => Some(ReplCommand::Back),
            "field" => rest.parse().ok().map(ReplCommand::Field),
            "show" => Some(ReplCommand::Show),
            "config" if !rest.is_empty() => Some(ReplCommand::Config(rest.to_string())),
            _ => None,
        };

        command.unwrap_or_else(|| ReplCommand::Unknown(trimmed.to_string()))
    }
}

/// Run an interactive REPL session.
///
/// Returns when the user exits or on EOF (Ctrl+D).
pub async fn run_repl(ctx: &mut CliContext) -> Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let interactive = ctx.runtime.is_interactive();

    if interactive {
        eprintln!("iceview interactive mode");
        eprintln!("Type help for commands, /quit to exit\n");
    }

    loop {
        if interactive {
            print!("iceview> ");
            stdout.flush()?;
        }

        // Read line
        let mut input = String::new();
        if stdin.lock().read_line(&mut input)? == 0 {
            // EOF (Ctrl+D)
            if interactive {
                eprintln!("\nGoodbye!");
            }
            break;
        }

        match ReplCommand::parse(&input) {
            ReplCommand::Empty => {
                continue;
            }
            ReplCommand::Quit => {
                if interactive {
                    eprintln!("Goodbye!");
                }
                break;
            }
            command => {
                // Action failures were already reported through the event stream
                if let Err(e) = execute_command(ctx, command).await {
                    eprintln!("Error: {}", e);
                }
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    // ────────────────────────────────────────────────────────────────────────────────
    // Tests for ReplCommand::parse
    // ────────────────────────────────────────────────────────────────────────────────

    mod parse_tests {
        use super::*;

        #[test]
        fn parses_quit_command() {
            assert_eq!(ReplCommand::parse("/quit"), ReplCommand::Quit);
            assert_eq!(ReplCommand::parse("/exit"), ReplCommand::Quit);
            assert_eq!(ReplCommand::parse("/q"), ReplCommand::Quit);
            assert_eq!(ReplCommand::parse("/QUIT"), ReplCommand::Quit);
        }

        #[test]
        fn parses_open_with_path() {
            assert_eq!(
                ReplCommand::parse("open /warehouse/db/orders"),
                ReplCommand::Open("/warehouse/db/orders".to_string())
            );
            assert_eq!(
                ReplCommand::parse("open"),
                ReplCommand::Unknown("open".to_string())
            );
        }

        #[test]
        fn parses_node_commands() {
            assert_eq!(ReplCommand::parse("expand 3"), ReplCommand::Expand(NodeId(3)));
            assert_eq!(ReplCommand::parse("select #12"), ReplCommand::Select(NodeId(12)));
            assert_eq!(
                ReplCommand::parse("select x"),
                ReplCommand::Unknown("select x".to_string())
            );
        }

        #[test]
        fn parses_preview_targets() {
            assert_eq!(
                ReplCommand::parse("preview 0"),
                ReplCommand::Preview {
                    target: PreviewTarget::DataFile(0),
                    format: None
                }
            );
            assert_eq!(
                ReplCommand::parse("preview 1.2"),
                ReplCommand::Preview {
                    target: PreviewTarget::ColumnFile(1, 2),
                    format: None
                }
            );
            assert_eq!(
                ReplCommand::parse("preview file:/t/data/0.bin parquet"),
                ReplCommand::Preview {
                    target: PreviewTarget::Path("file:/t/data/0.bin".to_string()),
                    format: Some("parquet".to_string())
                }
            );
            assert_eq!(
                ReplCommand::parse("preview"),
                ReplCommand::Unknown("preview".to_string())
            );
        }

        #[test]
        fn parses_field_ids() {
            assert_eq!(ReplCommand::parse("field 5"), ReplCommand::Field(5));
            assert_eq!(
                ReplCommand::parse("field 2147483647"),
                ReplCommand::Field(2147483647)
            );
            assert_eq!(
                ReplCommand::parse("field 2147483648"),
                ReplCommand::Unknown("field 2147483648".to_string())
            );
        }

        #[test]
        fn parses_simple_commands() {
            assert_eq!(ReplCommand::parse("ls"), ReplCommand::List);
            assert_eq!(ReplCommand::parse("BACK"), ReplCommand::Back);
            assert_eq!(ReplCommand::parse("show"), ReplCommand::Show);
            assert_eq!(ReplCommand::parse("help"), ReplCommand::Help);
            assert_eq!(
                ReplCommand::parse("config browser.preview_limit"),
                ReplCommand::Config("browser.preview_limit".to_string())
            );
        }

        #[test]
        fn parses_empty_input() {
            assert_eq!(ReplCommand::parse(""), ReplCommand::Empty);
            assert_eq!(ReplCommand::parse("   "), ReplCommand::Empty);
            assert_eq!(ReplCommand::parse("\t\n"), ReplCommand::Empty);
        }

        #[test]
        fn handles_newline_in_input() {
            // This simulates input from stdin with trailing newline
            assert_eq!(ReplCommand::parse("back\n"), ReplCommand::Back);
            assert_eq!(ReplCommand::parse("/quit\n"), ReplCommand::Quit);
        }
    }
}
