//! Update Scheduler
//!
//! The scheduler holds the queue of computations waiting to re-run and the
//! bookkeeping that decides when a flush is requested.
//!
//! # Algorithm
//!
//! 1. A signal write schedules each of its observers. Scheduling appends to
//!    an insertion-ordered, deduplicated queue.
//! 2. The first schedule (or write) outside a batch requests a flush from the
//!    host's microtask queue. Further requests are ignored until that flush
//!    has finished.
//! 3. A flush takes a snapshot of the queue and re-runs each entry in order,
//!    removing it from the queue just before it runs.
//!
//! Entries run in the order they were first scheduled, not in dependency
//! order. A computation that reads two upstream values may therefore observe
//! one of them stale within a single pass.
//!
//! Work scheduled while a flush is running lands in the live queue but is not
//! part of the snapshot, and no new flush is requested for it. It waits until
//! a later write requests the next flush.

use indexmap::IndexSet;

use super::node::ComputationId;

/// Where the scheduler is in its flush cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FlushState {
    /// No flush is pending.
    #[default]
    Idle,

    /// A flush has been handed to the microtask queue but has not started.
    Requested,

    /// A flush is executing.
    Running,
}

impl FlushState {
    /// Whether a flush is pending or in progress.
    pub fn is_flushing(self) -> bool {
        self != FlushState::Idle
    }
}

/// Queue and flush bookkeeping for one runtime.
#[derive(Debug, Default)]
pub(crate) struct UpdateScheduler {
    queue: IndexSet<ComputationId>,
    state: FlushState,
    batch_depth: usize,
    flush_count: u64,
}

impl UpdateScheduler {
    /// Create an idle scheduler with an empty queue.
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Append a computation to the queue.
    ///
    /// Returns `false` if it was already queued.
    pub(crate) fn enqueue(&mut self, computation: ComputationId) -> bool {
        self.queue.insert(computation)
    }

    /// Remove a computation from the queue, keeping the order of the rest.
    ///
    /// Returns `false` if it was not queued.
    pub(crate) fn remove(&mut self, computation: ComputationId) -> bool {
        self.queue.shift_remove(&computation)
    }

    /// Whether a flush should be requested right now.
    pub(crate) fn wants_flush(&self) -> bool {
        self.batch_depth == 0 && self.state == FlushState::Idle
    }

    /// Record that a flush has been handed to the microtask queue.
    pub(crate) fn mark_requested(&mut self) {
        self.state = FlushState::Requested;
    }

    /// Begin a flush: snapshot the work to run.
    ///
    /// Entries stay queued until the flush takes them with [`remove`], so
    /// anything not reached (a body panicked) is still pending afterwards.
    /// Returns `None` if a flush is already running.
    ///
    /// [`remove`]: UpdateScheduler::remove
    pub(crate) fn begin_flush(&mut self) -> Option<Vec<ComputationId>> {
        if self.state == FlushState::Running {
            return None;
        }
        self.state = FlushState::Running;
        Some(self.queue.iter().copied().collect())
    }

    /// Finish a flush, returning to idle.
    pub(crate) fn end_flush(&mut self) {
        self.state = FlushState::Idle;
        self.flush_count += 1;
    }

    /// Enter a batch.
    pub(crate) fn enter_batch(&mut self) {
        self.batch_depth += 1;
    }

    /// Leave a batch. Returns `true` when the outermost batch was left.
    pub(crate) fn exit_batch(&mut self) -> bool {
        self.batch_depth = self.batch_depth.saturating_sub(1);
        self.batch_depth == 0
    }

    /// Whether a batch is open.
    pub(crate) fn is_batching(&self) -> bool {
        self.batch_depth > 0
    }

    /// Number of queued computations.
    pub(crate) fn len(&self) -> usize {
        self.queue.len()
    }

    /// Whether the queue is empty.
    pub(crate) fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Current flush state.
    pub(crate) fn state(&self) -> FlushState {
        self.state
    }

    /// Number of flush passes completed so far.
    pub(crate) fn flush_count(&self) -> u64 {
        self.flush_count
    }
}
