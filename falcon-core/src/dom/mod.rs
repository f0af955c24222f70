//! Live DOM
//!
//! An in-memory document tree. The view layer never owns this tree: it
//! builds nodes, hands them to a container supplied by the caller and later
//! mutates them in place (text updates, attribute updates, keyed moves).
//!
//! Only the operations the renderer needs are provided: structural edits,
//! attributes, text, comment markers, fragments, event listeners and an
//! HTML serialization for inspection.

mod event;
mod node;

pub use event::Event;
pub use node::{Node, NodeId, NodeKind};
