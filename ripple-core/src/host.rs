//! Host Integration
//!
//! The engine never talks to an event loop directly. A runtime is handed a
//! [`Microtasks`] implementation that decides when a requested flush actually
//! runs, and an error sink that receives failures caught during teardown.
//!
//! A microtask must run after the current synchronous turn has finished and
//! before the host moves on to unrelated I/O or timers.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;

use crate::error::ReactiveError;

/// A unit of deferred work.
pub type Microtask = Box<dyn FnOnce()>;

/// Receiver for errors caught while tearing computations down.
pub type ErrorSink = Rc<dyn Fn(&ReactiveError)>;

/// A primitive that defers a callback to the end of the current turn.
pub trait Microtasks {
    /// Schedule `task` to run after the current synchronous turn.
    fn queue_microtask(&self, task: Microtask);
}

/// The default error sink: log through `tracing`.
pub fn log_error(error: &ReactiveError) {
    tracing::error!(error = %error, "reactive teardown failed");
}

/// A microtask queue drained explicitly by its owner.
///
/// Cloning yields another handle to the same queue, so a test can keep one
/// handle while the runtime holds the other.
///
/// ```rust,ignore
/// let microtasks = ManualMicrotasks::new();
/// let rt = Runtime::new(microtasks.clone());
///
/// set_count.set(2);
/// microtasks.run_until_idle();
/// ```
#[derive(Clone, Default)]
pub struct ManualMicrotasks {
    tasks: Rc<RefCell<VecDeque<Microtask>>>,
}

impl ManualMicrotasks {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Run queued tasks, including any they queue themselves, until the
    /// queue is empty. Returns the number of tasks run.
    pub fn run_until_idle(&self) -> usize {
        let mut ran = 0;
        loop {
            // The borrow ends before the task runs; tasks may queue more work.
            let next = self.tasks.borrow_mut().pop_front();
            let Some(task) = next else {
                return ran;
            };
            task();
            ran += 1;
        }
    }

    /// Number of tasks waiting to run.
    pub fn len(&self) -> usize {
        self.tasks.borrow().len()
    }

    /// Whether no tasks are waiting.
    pub fn is_empty(&self) -> bool {
        self.tasks.borrow().is_empty()
    }
}

impl Microtasks for ManualMicrotasks {
    fn queue_microtask(&self, task: Microtask) {
        self.tasks.borrow_mut().push_back(task);
    }
}

impl fmt::Debug for ManualMicrotasks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManualMicrotasks")
            .field("pending", &self.len())
            .finish()
    }
}

/// Microtasks backed by a Tokio `LocalSet`.
///
/// Each task becomes a `spawn_local` task, so it runs once the currently
/// executing task yields. Queueing a microtask outside a `LocalSet` panics,
/// as `spawn_local` does.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioMicrotasks;

impl Microtasks for TokioMicrotasks {
    fn queue_microtask(&self, task: Microtask) {
        tokio::task::spawn_local(async move { task() });
    }
}
