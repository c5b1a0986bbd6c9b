//! Tracking Context
//!
//! The tracking context records which computation is currently running.
//! This enables automatic dependency tracking: when a signal is read,
//! the current computation is registered as one of its observers.
//!
//! # Implementation
//!
//! Each runtime owns one `Tracking` cell. Entering a context swaps the new
//! computation in and returns a guard holding the one it replaced; dropping
//! the guard puts that one back. Guards therefore nest like a stack, and the
//! context is restored even if the computation panics.
//!
//! The cell is a plain `Cell` inside a `!Send` runtime, so it is confined to
//! the thread that owns the runtime. It is ambient per runtime, not global.

use std::cell::Cell;

use crate::graph::ComputationId;

/// The "currently running computation" pointer of one runtime.
#[derive(Debug, Default)]
pub(crate) struct Tracking {
    current: Cell<Option<ComputationId>>,
}

impl Tracking {
    /// The computation currently tracking reads, if any.
    pub(crate) fn current(&self) -> Option<ComputationId> {
        self.current.get()
    }

    /// Make `computation` the tracking context until the guard is dropped.
    ///
    /// Passing `None` suspends tracking (see `untrack`).
    pub(crate) fn enter(&self, computation: Option<ComputationId>) -> TrackingGuard<'_> {
        let previous = self.current.replace(computation);
        TrackingGuard {
            tracking: self,
            previous,
        }
    }
}

/// Guard that restores the previous tracking context when dropped.
pub(crate) struct TrackingGuard<'a> {
    tracking: &'a Tracking,
    previous: Option<ComputationId>,
}

impl Drop for TrackingGuard<'_> {
    fn drop(&mut self) {
        self.tracking.current.set(self.previous);
    }
}
