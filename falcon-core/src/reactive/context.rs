//! Reactive Context
//!
//! The reactive context tracks which computation is currently running and
//! which owner new computations should be attached to. This enables
//! automatic dependency tracking: when a signal is read, the runtime asks
//! the context for the current observer and subscribes it.
//!
//! # Implementation
//!
//! Every [`Runtime`](super::Runtime) owns exactly one context, a stack of
//! [`Frame`]s. Running a computation pushes a frame naming it as both the
//! observer and the owner; [`Runtime::untrack`](super::Runtime::untrack) and
//! [`Scope::run_in`](super::Scope::run_in) push frames without an observer.
//! Frames are popped by a guard, so the stack is restored even when the body
//! panics.
//!
//! Keeping the stack inside the runtime object (instead of a process-wide
//! global) means two runtimes never see each other's observers.

use std::cell::RefCell;

use super::ComputationId;

/// An entry in the reactive context stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame {
    /// The computation that subscribes to signals read in this frame.
    pub observer: Option<ComputationId>,
    /// The owner that computations created in this frame are attached to.
    pub owner: Option<ComputationId>,
}

impl Frame {
    /// A frame for running a computation: it observes and owns.
    pub fn computation(id: ComputationId) -> Self {
        Self {
            observer: Some(id),
            owner: Some(id),
        }
    }

    /// A frame that keeps the given owner but tracks nothing.
    pub fn untracked(owner: Option<ComputationId>) -> Self {
        Self {
            observer: None,
            owner,
        }
    }
}

/// The stack of running computations for one runtime.
#[derive(Debug, Default)]
pub struct ReactiveContext {
    stack: RefCell<Vec<Frame>>,
}

impl ReactiveContext {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Enter a new frame.
    ///
    /// The frame is exited automatically when the returned guard is dropped.
    pub fn enter(&self, frame: Frame) -> ContextGuard<'_> {
        self.stack.borrow_mut().push(frame);
        ContextGuard {
            context: self,
            frame,
        }
    }

    /// Check if a computation is currently observing reads.
    pub fn is_tracking(&self) -> bool {
        self.current_observer().is_some()
    }

    /// Get the computation that reads should subscribe, if any.
    pub fn current_observer(&self) -> Option<ComputationId> {
        self.stack.borrow().last().and_then(|frame| frame.observer)
    }

    /// Get the owner that new computations attach to, if any.
    pub fn current_owner(&self) -> Option<ComputationId> {
        self.stack.borrow().last().and_then(|frame| frame.owner)
    }

    /// Number of frames currently on the stack.
    pub fn depth(&self) -> usize {
        self.stack.borrow().len()
    }
}

/// Guard that pops the frame when dropped.
///
/// This ensures the stack is properly maintained even if the computation
/// panics.
pub struct ContextGuard<'a> {
    context: &'a ReactiveContext,
    frame: Frame,
}

impl Drop for ContextGuard<'_> {
    fn drop(&mut self) {
        let popped = self.context.stack.borrow_mut().pop();

        // Verify we're popping the right frame.
        if let Some(frame) = popped {
            debug_assert_eq!(
                frame, self.frame,
                "ReactiveContext mismatch: expected {:?}, got {:?}",
                self.frame, frame
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_tracks_observer() {
        let context = ReactiveContext::new();
        let id = ComputationId::new();

        assert!(!context.is_tracking());
        assert!(context.current_observer().is_none());

        {
            let _guard = context.enter(Frame::computation(id));

            assert!(context.is_tracking());
            assert_eq!(context.current_observer(), Some(id));
            assert_eq!(context.current_owner(), Some(id));
        }

        // Frame should be cleaned up after drop
        assert!(!context.is_tracking());
        assert_eq!(context.depth(), 0);
    }

    #[test]
    fn untracked_frame_keeps_owner() {
        let context = ReactiveContext::new();
        let id = ComputationId::new();

        let _outer = context.enter(Frame::computation(id));
        {
            let _inner = context.enter(Frame::untracked(Some(id)));
            assert!(context.current_observer().is_none());
            assert_eq!(context.current_owner(), Some(id));
        }
        assert_eq!(context.current_observer(), Some(id));
    }

    #[test]
    fn nested_frames() {
        let context = ReactiveContext::new();
        let id1 = ComputationId::new();
        let id2 = ComputationId::new();

        {
            let _ctx1 = context.enter(Frame::computation(id1));
            assert_eq!(context.current_observer(), Some(id1));

            {
                let _ctx2 = context.enter(Frame::computation(id2));
                assert_eq!(context.current_observer(), Some(id2));
                assert_eq!(context.depth(), 2);
            }

            // After inner frame drops, outer should be current
            assert_eq!(context.current_observer(), Some(id1));
        }

        assert!(context.current_observer().is_none());
    }

    #[test]
    fn guard_pops_during_unwind() {
        let context = ReactiveContext::new();
        let id = ComputationId::new();

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _guard = context.enter(Frame::computation(id));
            panic!("body failed");
        }));

        assert!(result.is_err());
        assert_eq!(context.depth(), 0);
    }
}
