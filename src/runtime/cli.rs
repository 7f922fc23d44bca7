use super::{BrowserRuntime, RuntimeError, RuntimeEvent};
use async_trait::async_trait;
use std::io::IsTerminal;
use tokio::sync::mpsc;

/// Forwards events to the CLI output handler.
pub struct CliRuntime {
    event_tx: mpsc::UnboundedSender<RuntimeEvent>,
    json_mode: bool,
}

impl CliRuntime {
    pub fn new(event_tx: mpsc::UnboundedSender<RuntimeEvent>, json_mode: bool) -> Self {
        Self {
            event_tx,
            json_mode,
        }
    }
}

#[async_trait]
impl BrowserRuntime for CliRuntime {
    fn emit(&self, event: RuntimeEvent) -> Result<(), RuntimeError> {
        // Send to channel for CLI event handler to process
        self.event_tx
            .send(event)
            .map_err(|_| RuntimeError::ReceiverClosed)?;
        Ok(())
    }

    fn is_interactive(&self) -> bool {
        !self.json_mode && std::io::stdin().is_terminal()
    }

    async fn shutdown(&self) -> Result<(), RuntimeError> {
        // No cleanup needed - channel drop handles it
        Ok(())
    }
}
