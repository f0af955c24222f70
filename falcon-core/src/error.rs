//! Error types.
//!
//! None of these errors are returned to the code that wrote a signal. The
//! runtime reports [`ReactiveError`]s through its error handler, and the view
//! layer logs [`DomError`]s and drops the offending node.

use thiserror::Error;

use crate::dom::NodeId;
use crate::reactive::ComputationId;

/// A failure observed while running the reactive graph.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReactiveError {
    /// A computation body panicked.
    #[error("computation {id:?} panicked: {message}")]
    ComputationPanicked { id: ComputationId, message: String },

    /// A computation body returned an error.
    #[error("computation {id:?} failed: {message}")]
    ComputationFailed { id: ComputationId, message: String },

    /// A cleanup callback panicked. The remaining callbacks still ran.
    #[error("cleanup of computation {id:?} panicked: {message}")]
    CleanupPanicked { id: ComputationId, message: String },

    /// A computation kept re-triggering itself from its own body.
    #[error("computation {id:?} re-triggered itself {limit} times in a row; giving up")]
    RerunLimit { id: ComputationId, limit: usize },
}

impl ReactiveError {
    /// The computation the error belongs to.
    pub fn computation(&self) -> ComputationId {
        match self {
            Self::ComputationPanicked { id, .. }
            | Self::ComputationFailed { id, .. }
            | Self::CleanupPanicked { id, .. }
            | Self::RerunLimit { id, .. } => *id,
        }
    }
}

/// A structural DOM operation that cannot be performed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomError {
    /// The node would end up inside itself, or the parent cannot hold children.
    #[error("cannot insert node {child:?} into {parent:?}: {reason}")]
    HierarchyRequest {
        parent: NodeId,
        child: NodeId,
        reason: &'static str,
    },

    /// The reference or removed node is not a child of the parent.
    #[error("node {child:?} is not a child of {parent:?}")]
    NotAChild { parent: NodeId, child: NodeId },
}

/// Result type for DOM operations.
pub type DomResult<T> = Result<T, DomError>;
