//! Dispatch error types.

use crate::node::{NodeId, NodeKind};

/// Errors from dispatch tree operations and leaf handlers.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// Attaching the child would make a node its own ancestor.
    #[error("including node {child} under {parent} would create a cycle")]
    WouldCycle {
        /// The node that was asked to adopt the child.
        parent: NodeId,
        /// The node that was being attached.
        child: NodeId,
    },

    /// Command nodes and event nodes live in separate trees.
    #[error("cannot include a {child} node under a {parent} node")]
    KindMismatch {
        /// Kind of the adopting node.
        parent: NodeKind,
        /// Kind of the node being attached.
        child: NodeKind,
    },

    /// A leaf handler reported a failure.
    #[error("handler failed: {0}")]
    Handler(String),

    /// The outbound message client failed.
    #[error("messenger error: {0}")]
    Messenger(String),
}

/// Result type for dispatch operations.
pub type DispatchResult<T> = Result<T, DispatchError>;
