//! Identifiers for the reactive graph.
//!
//! Signals and computations never point at each other directly. Both sides
//! of every edge are stored in the runtime registry keyed by these ids, so a
//! teardown can always unlink the two halves of a subscription together.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Unique identifier for a signal.
///
/// Identity is the storage cell, never the value: two signals holding equal
/// values still have different ids.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SignalId(u64);

impl SignalId {
    /// Generate a new unique signal ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl Default for SignalId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for SignalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signal#{}", self.0)
    }
}

/// Unique identifier for a computation (effect, memo body or scope).
///
/// Each computation gets a unique ID when created. The ID is the only way
/// the runtime addresses the "current observer" while a body is running.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComputationId(u64);

impl ComputationId {
    /// Generate a new unique computation ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl Default for ComputationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ComputationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Computation#{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn computation_ids_are_unique() {
        let id1 = ComputationId::new();
        let id2 = ComputationId::new();
        let id3 = ComputationId::new();

        assert_ne!(id1, id2);
        assert_ne!(id2, id3);
        assert_ne!(id1, id3);
    }

    #[test]
    fn signal_ids_are_monotonic() {
        let first = SignalId::new();
        let second = SignalId::new();
        assert!(second.raw() > first.raw());
    }

    #[test]
    fn debug_output_names_the_kind() {
        let id = SignalId::new();
        assert_eq!(format!("{:?}", id), format!("Signal#{}", id.raw()));
    }
}
