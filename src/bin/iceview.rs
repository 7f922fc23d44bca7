//! iceview - terminal browser for Iceberg table metadata
//!
//! # Usage
//!
//! ```bash
//! # Open a table and browse interactively
//! ./target/debug/iceview /warehouse/db/orders
//!
//! # Run a single command against the newest metadata version
//! ./target/debug/iceview /warehouse/db/orders -e "field 3"
//!
//! # Scripted session with JSON events
//! ./target/debug/iceview /warehouse/db/orders -f commands.txt --json | jq .
//! ```

use anyhow::Result;
use clap::Parser;

use iceview_lib::cli::{execute_batch, execute_once, initialize, open_table, run_repl, Args};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut ctx = initialize(&args).await?;

    let opened = match ctx.initial_table() {
        Some(table) => open_table(&mut ctx, &table).await,
        None => Ok(true),
    };

    let result = match opened {
        Err(e) => Err(e),
        // A scripted run against a table that failed to load cannot succeed
        Ok(false) if args.execute.is_some() || args.file.is_some() => {
            Err(anyhow::anyhow!("Failed to open table"))
        }
        Ok(_) => {
            if let Some(ref command) = args.execute {
                match execute_once(&mut ctx, command).await {
                    Ok(true) => Ok(()),
                    Ok(false) => Err(anyhow::anyhow!("Command failed: {}", command)),
                    Err(e) => Err(e),
                }
            } else if let Some(ref file) = args.file {
                execute_batch(&mut ctx, file).await
            } else {
                run_repl(&mut ctx).await
            }
        }
    };

    // Graceful shutdown
    ctx.shutdown().await?;

    result
}
