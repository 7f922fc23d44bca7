use serde::Serialize;
use thiserror::Error;

use crate::backend::BackendError;
use crate::tree::{NodeId, NodeKind};

#[derive(Debug, Error)]
pub enum IceviewError {
    #[error("{context}: {source}")]
    Backend {
        context: String,
        #[source]
        source: BackendError,
    },

    #[error("No table directory loaded")]
    NoSession,

    #[error("Unknown tree node: {0}")]
    UnknownNode(NodeId),

    #[error("{0} nodes cannot be expanded")]
    NotExpandable(NodeKind),

    #[error("Node {node} is a {actual} node, expected {expected}")]
    WrongNodeKind {
        node: NodeId,
        expected: NodeKind,
        actual: NodeKind,
    },
}

impl IceviewError {
    /// Wrap a backend failure with the user-facing action that triggered it.
    pub fn backend(context: impl Into<String>, source: BackendError) -> Self {
        Self::Backend {
            context: context.into(),
            source,
        }
    }
}

// Errors travel inside JSON runtime events
impl Serialize for IceviewError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

pub type Result<T> = std::result::Result<T, IceviewError>;
