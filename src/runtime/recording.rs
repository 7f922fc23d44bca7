//! Runtime that keeps every emitted event, for tests.

use async_trait::async_trait;
use parking_lot::Mutex;

use super::{BrowserRuntime, RuntimeError, RuntimeEvent};

#[derive(Default)]
pub struct RecordingRuntime {
    events: Mutex<Vec<RuntimeEvent>>,
}

impl RecordingRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<RuntimeEvent> {
        self.events.lock().clone()
    }

    pub fn last(&self) -> Option<RuntimeEvent> {
        self.events.lock().last().cloned()
    }

    pub fn errors(&self) -> Vec<String> {
        self.events
            .lock()
            .iter()
            .filter_map(|e| match e {
                RuntimeEvent::Error { message } => Some(message.clone()),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl BrowserRuntime for RecordingRuntime {
    fn emit(&self, event: RuntimeEvent) -> Result<(), RuntimeError> {
        self.events.lock().push(event);
        Ok(())
    }

    fn is_interactive(&self) -> bool {
        false
    }

    async fn shutdown(&self) -> Result<(), RuntimeError> {
        Ok(())
    }
}
