use super::state::ViewState;

/// Views to return to after a preview, most recent last.
#[derive(Debug, Clone, Default)]
pub struct NavigationHistory {
    stack: Vec<ViewState>,
}

impl NavigationHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, state: ViewState) {
        self.stack.push(state);
        tracing::debug!("History depth {}", self.stack.len());
    }

    /// The most recently pushed view, or `None` when there is nothing to go
    /// back to.
    pub fn pop(&mut self) -> Option<ViewState> {
        self.stack.pop()
    }

    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.stack.len()
    }
}
