//! Reactive Runtime
//!
//! The runtime is the central coordinator that connects signals, effects,
//! memos and roots. It owns the dependency graph, the scheduler queue, the
//! tracking context and the current root, and talks to the host through the
//! injected microtask queue and error sink.
//!
//! # How It Works
//!
//! 1. When a computation runs, the runtime makes it the tracking context.
//!    Every signal read during the run links the signal and the computation.
//!
//! 2. When a signal's value changes, the runtime:
//!    a. Schedules every current observer, in subscription order
//!    b. Requests a flush from the host, unless a batch is open or a flush
//!       is already pending or running
//!
//! 3. When the flush runs, each scheduled computation drops its old edges,
//!    runs the cleanups of its previous run, and runs its body again.
//!
//! # Thread Safety
//!
//! None, by construction. A runtime and every handle into it are `!Send`, so
//! the queue, the tracking context and the batch counter can only ever be
//! touched from the thread that created them. Hosts that need the engine on
//! several threads must give each thread its own runtime or pin this one to
//! a single event loop.
//!
//! No graph borrow is held while user code runs. Bodies, cleanups and
//! comparators may read, write, create and dispose freely.

use std::cell::RefCell;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::rc::{Rc, Weak};

use crate::error::{panic_message, ReactiveError};
use crate::graph::{
    Body, Cleanup, ComputationId, ComputationNode, FlushState, Graph, SignalId, UpdateScheduler,
};
use crate::host::{self, ErrorSink, Microtasks};

use super::context::Tracking;
use super::root::Scope;

/// State shared by every handle into one reactive graph.
pub(crate) struct RuntimeInner {
    pub(super) graph: RefCell<Graph>,
    pub(super) scheduler: RefCell<UpdateScheduler>,
    pub(super) tracking: Tracking,
    /// The innermost root currently open, if any.
    pub(super) scope: RefCell<Option<Rc<Scope>>>,
    microtasks: Box<dyn Microtasks>,
    error_sink: ErrorSink,
}

/// Handle to one independent reactive graph.
///
/// Cloning is cheap and yields another handle to the same graph. Signals,
/// effects and memos created through different runtimes never interact.
///
/// # Example
///
/// ```rust,ignore
/// let microtasks = ManualMicrotasks::new();
/// let rt = Runtime::new(microtasks.clone());
///
/// let (count, set_count) = rt.create_signal(1);
/// rt.create_effect(move || println!("count = {}", count.get()));
///
/// set_count.set(2);
/// microtasks.run_until_idle(); // prints "count = 2"
/// ```
#[derive(Clone)]
pub struct Runtime {
    pub(super) inner: Rc<RuntimeInner>,
}

/// Builder for a [`Runtime`].
///
/// The microtask queue is required; the error sink defaults to logging
/// through `tracing`.
pub struct RuntimeBuilder {
    microtasks: Box<dyn Microtasks>,
    error_sink: ErrorSink,
}

impl RuntimeBuilder {
    /// Route errors caught during teardown to `sink` instead of the log.
    pub fn error_sink<F>(mut self, sink: F) -> Self
    where
        F: Fn(&ReactiveError) + 'static,
    {
        self.error_sink = Rc::new(sink);
        self
    }

    /// Create the runtime.
    pub fn build(self) -> Runtime {
        Runtime {
            inner: Rc::new(RuntimeInner {
                graph: RefCell::new(Graph::new()),
                scheduler: RefCell::new(UpdateScheduler::new()),
                tracking: Tracking::default(),
                scope: RefCell::new(None),
                microtasks: self.microtasks,
                error_sink: self.error_sink,
            }),
        }
    }
}

impl fmt::Debug for RuntimeBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuntimeBuilder").finish_non_exhaustive()
    }
}

/// A handle that does not keep the runtime alive.
///
/// Signals, disposers and the pending flush hold one of these, so the graph
/// can be dropped once the application lets go of its `Runtime`.
#[derive(Clone)]
pub(crate) struct WeakRuntime(Weak<RuntimeInner>);

impl WeakRuntime {
    pub(crate) fn upgrade(&self) -> Option<Runtime> {
        self.0.upgrade().map(|inner| Runtime { inner })
    }
}

impl fmt::Debug for WeakRuntime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("WeakRuntime")
            .field(&(self.0.strong_count() > 0))
            .finish()
    }
}

/// Leaves a flush when dropped, so the state resets even if a body panics.
struct FlushGuard<'a> {
    scheduler: &'a RefCell<UpdateScheduler>,
}

impl Drop for FlushGuard<'_> {
    fn drop(&mut self) {
        self.scheduler.borrow_mut().end_flush();
    }
}

/// Leaves a batch when dropped and releases the queue at the outermost level.
struct BatchGuard<'a> {
    runtime: &'a Runtime,
}

impl Drop for BatchGuard<'_> {
    fn drop(&mut self) {
        let release = {
            let mut scheduler = self.runtime.inner.scheduler.borrow_mut();
            scheduler.exit_batch() && !scheduler.is_empty()
        };
        if release {
            self.runtime.request_flush();
        }
    }
}

impl Runtime {
    /// Create a runtime that defers flushes through `microtasks`.
    pub fn new(microtasks: impl Microtasks + 'static) -> Self {
        Self::builder(microtasks).build()
    }

    /// Start configuring a runtime.
    pub fn builder(microtasks: impl Microtasks + 'static) -> RuntimeBuilder {
        RuntimeBuilder {
            microtasks: Box::new(microtasks),
            error_sink: Rc::new(host::log_error),
        }
    }

    pub(crate) fn downgrade(&self) -> WeakRuntime {
        WeakRuntime(Rc::downgrade(&self.inner))
    }

    // ------------------------------------------------------------------------
    // Dependency tracking
    // ------------------------------------------------------------------------

    /// Link `signal` to the computation currently tracking, if any.
    pub(crate) fn track(&self, signal: SignalId) {
        if let Some(computation) = self.inner.tracking.current() {
            // A disposed computation resolves to nothing and gains no edge.
            self.inner.graph.borrow_mut().link(signal, computation);
        }
    }

    /// Schedule every observer of `signal` after its value changed.
    pub(crate) fn notify(&self, signal: SignalId) {
        let observers = self.inner.graph.borrow().observers(signal);
        for computation in observers {
            self.schedule(computation);
        }
        self.request_flush();
    }

    /// Release the graph node of a signal whose last handle was dropped.
    pub(crate) fn release_signal(&self, signal: SignalId) {
        match self.inner.graph.try_borrow_mut() {
            Ok(mut graph) => {
                graph.remove_signal(signal);
            }
            Err(_) => {
                tracing::warn!(?signal, "graph busy while releasing signal; node leaked");
            }
        }
    }

    // ------------------------------------------------------------------------
    // Scheduling
    // ------------------------------------------------------------------------

    /// Queue `computation` to re-run on the next flush.
    ///
    /// Disposed or already queued computations are ignored.
    pub(crate) fn schedule(&self, computation: ComputationId) {
        let queued = {
            let mut graph = self.inner.graph.borrow_mut();
            match graph.computation_mut(computation) {
                Some(node) if !node.scheduled => {
                    node.scheduled = true;
                    true
                }
                _ => false,
            }
        };
        if !queued {
            return;
        }

        self.inner.scheduler.borrow_mut().enqueue(computation);
        tracing::trace!(?computation, "computation scheduled");
        self.request_flush();
    }

    /// Hand a flush to the host, unless batching or already flushing.
    fn request_flush(&self) {
        {
            let mut scheduler = self.inner.scheduler.borrow_mut();
            if !scheduler.wants_flush() {
                return;
            }
            scheduler.mark_requested();
        }

        let runtime = self.downgrade();
        self.inner.microtasks.queue_microtask(Box::new(move || {
            if let Some(runtime) = runtime.upgrade() {
                runtime.flush();
            }
        }));
    }

    /// Run one flush pass now.
    ///
    /// Re-runs every computation queued when the pass starts, in the order
    /// they were first scheduled. Computations scheduled during the pass stay
    /// queued for a later one. Calling this while a flush is already running
    /// does nothing.
    ///
    /// Normally the host's microtask queue calls this. Panics from a
    /// computation body propagate; entries not reached stay queued.
    pub fn flush(&self) {
        let snapshot = self.inner.scheduler.borrow_mut().begin_flush();
        let Some(snapshot) = snapshot else {
            return;
        };
        let _flushing = FlushGuard {
            scheduler: &self.inner.scheduler,
        };
        tracing::trace!(queued = snapshot.len(), "flush started");

        for computation in snapshot {
            if !self.inner.scheduler.borrow_mut().remove(computation) {
                // Disposed since the snapshot was taken.
                continue;
            }
            let live = {
                let mut graph = self.inner.graph.borrow_mut();
                match graph.computation_mut(computation) {
                    Some(node) => {
                        node.scheduled = false;
                        true
                    }
                    None => false,
                }
            };
            if live {
                self.run(computation);
            }
        }

        tracing::trace!("flush finished");
    }

    // ------------------------------------------------------------------------
    // Computation lifecycle
    // ------------------------------------------------------------------------

    /// Register a computation around `body`, adopt it into the current root
    /// and run it once.
    pub(crate) fn spawn_computation(&self, body: Body) -> ComputationId {
        let scope = self.inner.scope.borrow().clone();
        let node = ComputationNode::new(body, scope.as_ref().map(Rc::downgrade));
        let computation = self.inner.graph.borrow_mut().add_computation(node);
        if let Some(scope) = scope {
            scope.adopt(computation);
        }
        tracing::trace!(?computation, "computation created");

        self.run(computation);
        computation
    }

    /// Run a computation: drop its edges, run its previous cleanups, then
    /// run its body as the tracking context.
    ///
    /// If the body is already running further up the stack, the computation
    /// is queued again instead.
    ///
    /// Panics from the body propagate to the caller.
    pub(crate) fn run(&self, computation: ComputationId) {
        let body_cell = {
            let mut graph = self.inner.graph.borrow_mut();
            match graph.computation_mut(computation) {
                Some(node) => Rc::clone(&node.body),
                None => return,
            }
        };
        let Ok(mut body) = body_cell.try_borrow_mut() else {
            // Keep the update: it runs on a later flush once the body returns.
            tracing::warn!(?computation, "computation is already running; nested run deferred");
            self.schedule(computation);
            return;
        };

        let cleanups = {
            let mut graph = self.inner.graph.borrow_mut();
            graph.detach(computation);
            graph
                .computation_mut(computation)
                .map(|node| std::mem::take(&mut node.cleanups))
                .unwrap_or_default()
        };
        self.run_cleanups(cleanups);

        // A cleanup may have disposed its own computation.
        if self.is_disposed(computation) {
            return;
        }

        let _tracking = self.inner.tracking.enter(Some(computation));
        (&mut *body)();
    }

    /// Dispose a computation. Idempotent.
    ///
    /// The computation leaves the queue, its root and every signal it
    /// observed, then its cleanups run. It can never run again.
    pub(crate) fn dispose_computation(&self, computation: ComputationId) {
        let node = self.inner.graph.borrow_mut().remove_computation(computation);
        let Some(node) = node else {
            return;
        };
        self.inner.scheduler.borrow_mut().remove(computation);

        let ComputationNode {
            body,
            cleanups,
            owner,
            ..
        } = node;
        if let Some(scope) = owner.as_ref().and_then(Weak::upgrade) {
            scope.forget(computation);
        }
        tracing::trace!(?computation, "computation disposed");

        self.run_cleanups(cleanups);
        drop(body);
    }

    /// Run cleanups in registration order, isolating each one's panic.
    fn run_cleanups(&self, cleanups: Vec<Cleanup>) {
        if cleanups.is_empty() {
            return;
        }
        let _untracked = self.inner.tracking.enter(None);
        for cleanup in cleanups {
            if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(cleanup)) {
                self.report(ReactiveError::CleanupPanicked {
                    message: panic_message(payload.as_ref()),
                });
            }
        }
    }

    /// Send an error caught during teardown to the error sink.
    pub(crate) fn report(&self, error: ReactiveError) {
        (self.inner.error_sink)(&error);
    }

    // ------------------------------------------------------------------------
    // Public operations
    // ------------------------------------------------------------------------

    /// Register `cleanup` to run before the current computation's next run,
    /// or when it is disposed.
    ///
    /// # Errors
    ///
    /// [`ReactiveError::NoOwner`] if no computation is running (including
    /// inside [`untrack`](Runtime::untrack)), and
    /// [`ReactiveError::OwnerDisposed`] if the running computation has
    /// already been disposed.
    pub fn on_cleanup<F>(&self, cleanup: F) -> Result<(), ReactiveError>
    where
        F: FnOnce() + 'static,
    {
        let Some(computation) = self.inner.tracking.current() else {
            tracing::warn!("on_cleanup called outside of a running computation");
            return Err(ReactiveError::NoOwner);
        };

        let registered = {
            let mut graph = self.inner.graph.borrow_mut();
            match graph.computation_mut(computation) {
                Some(node) => {
                    node.cleanups.push(Box::new(cleanup));
                    true
                }
                None => false,
            }
        };
        if !registered {
            tracing::warn!(?computation, "on_cleanup called from a disposed computation");
            return Err(ReactiveError::OwnerDisposed);
        }
        Ok(())
    }

    /// Run `f` without tracking: reads inside create no dependencies.
    pub fn untrack<T>(&self, f: impl FnOnce() -> T) -> T {
        let _untracked = self.inner.tracking.enter(None);
        f()
    }

    /// Run `f` with flush requests suppressed.
    ///
    /// Writes inside still schedule their observers; the flush is requested
    /// once, when the outermost batch returns (or unwinds).
    pub fn batch<R>(&self, f: impl FnOnce() -> R) -> R {
        self.inner.scheduler.borrow_mut().enter_batch();
        let _batch = BatchGuard { runtime: self };
        f()
    }

    // ------------------------------------------------------------------------
    // Introspection
    // ------------------------------------------------------------------------

    /// Number of computations waiting for a flush.
    pub fn pending(&self) -> usize {
        self.inner.scheduler.borrow().len()
    }

    /// Where the scheduler is in its flush cycle.
    pub fn flush_state(&self) -> FlushState {
        self.inner.scheduler.borrow().state()
    }

    /// Whether a flush is pending or running.
    pub fn is_flushing(&self) -> bool {
        self.flush_state().is_flushing()
    }

    /// Number of flush passes completed.
    pub fn flush_count(&self) -> u64 {
        self.inner.scheduler.borrow().flush_count()
    }

    /// Whether a batch is open.
    pub fn is_batching(&self) -> bool {
        self.inner.scheduler.borrow().is_batching()
    }

    /// The computation currently tracking reads, if any.
    pub fn current_computation(&self) -> Option<ComputationId> {
        self.inner.tracking.current()
    }

    /// Whether `computation` has been disposed.
    pub fn is_disposed(&self, computation: ComputationId) -> bool {
        !self.inner.graph.borrow().contains_computation(computation)
    }

    /// Signals read by `computation` during its latest run.
    pub fn dependencies(&self, computation: ComputationId) -> Vec<SignalId> {
        self.inner.graph.borrow().dependencies(computation)
    }

    /// Computations that read `signal` during their latest run, in
    /// subscription order.
    pub fn observers(&self, signal: SignalId) -> Vec<ComputationId> {
        self.inner.graph.borrow().observers(signal).into_vec()
    }

    /// Number of live computations.
    pub fn computation_count(&self) -> usize {
        self.inner.graph.borrow().computation_count()
    }

    /// Number of live signals.
    pub fn signal_count(&self) -> usize {
        self.inner.graph.borrow().signal_count()
    }
}

impl fmt::Debug for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("signals", &self.signal_count())
            .field("computations", &self.computation_count())
            .field("pending", &self.pending())
            .field("flush_state", &self.flush_state())
            .finish()
    }
}
