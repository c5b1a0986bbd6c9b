//! Roots
//!
//! A root is a disposal boundary. Every effect or memo created while a root
//! is open registers with it, and disposing the root disposes all of them at
//! once. Roots nest: opening a root inside another records the outer one as
//! its parent, but disposing the outer root leaves the inner root's
//! computations alone.

use std::cell::RefCell;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;

use indexmap::IndexSet;

use crate::error::{panic_message, ReactiveError};
use crate::graph::ComputationId;

use super::runtime::{Runtime, WeakRuntime};

/// The set of computations owned by one root.
#[derive(Debug)]
pub(crate) struct Scope {
    parent: Option<Rc<Scope>>,
    owned: RefCell<IndexSet<ComputationId>>,
}

impl Scope {
    pub(crate) fn new(parent: Option<Rc<Scope>>) -> Self {
        Self {
            parent,
            owned: RefCell::default(),
        }
    }

    pub(crate) fn adopt(&self, computation: ComputationId) {
        self.owned.borrow_mut().insert(computation);
    }

    /// Drop a computation that was disposed on its own.
    pub(crate) fn forget(&self, computation: ComputationId) {
        self.owned.borrow_mut().shift_remove(&computation);
    }

    /// Empty the set, returning what it held in registration order.
    pub(crate) fn take_all(&self) -> IndexSet<ComputationId> {
        std::mem::take(&mut *self.owned.borrow_mut())
    }

    /// Number of roots enclosing this one.
    pub(crate) fn depth(&self) -> usize {
        let mut depth = 0;
        let mut parent = self.parent.as_deref();
        while let Some(scope) = parent {
            depth += 1;
            parent = scope.parent.as_deref();
        }
        depth
    }

    pub(crate) fn len(&self) -> usize {
        self.owned.borrow().len()
    }
}

/// Restores the previously open root when dropped.
struct ScopeGuard<'a> {
    slot: &'a RefCell<Option<Rc<Scope>>>,
    previous: Option<Rc<Scope>>,
}

impl Drop for ScopeGuard<'_> {
    fn drop(&mut self) {
        *self.slot.borrow_mut() = self.previous.take();
    }
}

/// Handle that disposes everything a root owns.
///
/// Like [`Disposer`](super::Disposer), dropping the handle does not dispose
/// anything.
#[derive(Clone)]
pub struct RootDisposer {
    runtime: WeakRuntime,
    scope: Rc<Scope>,
}

impl RootDisposer {
    /// Dispose every computation the root still owns. Idempotent.
    ///
    /// A panic while disposing one computation is reported to the error sink
    /// as [`ReactiveError::DisposerPanicked`] and the rest are still disposed.
    pub fn dispose(&self) {
        let owned = self.scope.take_all();
        let Some(runtime) = self.runtime.upgrade() else {
            return;
        };
        if owned.is_empty() {
            return;
        }
        tracing::debug!(
            computations = owned.len(),
            depth = self.scope.depth(),
            "disposing root"
        );

        for computation in owned {
            let result = panic::catch_unwind(AssertUnwindSafe(|| {
                runtime.dispose_computation(computation);
            }));
            if let Err(payload) = result {
                runtime.report(ReactiveError::DisposerPanicked {
                    message: panic_message(payload.as_ref()),
                });
            }
        }
    }

    /// Number of computations the root still owns.
    pub fn len(&self) -> usize {
        self.scope.len()
    }

    /// Whether the root owns nothing.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for RootDisposer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RootDisposer")
            .field("owned", &self.len())
            .field("depth", &self.scope.depth())
            .finish()
    }
}

impl Runtime {
    /// Open a root for the duration of `f`.
    ///
    /// Effects and memos created inside `f` belong to the root and are
    /// disposed by the [`RootDisposer`] passed to it. The previous root is
    /// restored when `f` returns or panics.
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// let dispose = rt.create_root(|dispose| {
    ///     rt.create_effect(move || println!("{}", count.get()));
    ///     dispose
    /// });
    ///
    /// dispose.dispose(); // the effect never runs again
    /// ```
    pub fn create_root<T>(&self, f: impl FnOnce(RootDisposer) -> T) -> T {
        let parent = self.inner.scope.borrow().clone();
        let scope = Rc::new(Scope::new(parent));
        let previous = self.inner.scope.replace(Some(Rc::clone(&scope)));
        let _scope = ScopeGuard {
            slot: &self.inner.scope,
            previous,
        };

        f(RootDisposer {
            runtime: self.downgrade(),
            scope,
        })
    }
}
