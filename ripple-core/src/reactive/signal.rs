//! Signal Implementation
//!
//! A Signal is the fundamental reactive primitive. It holds a value and
//! knows which computations read it.
//!
//! # How Signals Work
//!
//! 1. When a signal is read while a computation is running, the signal and
//!    the computation are linked in the runtime's graph.
//!
//! 2. When a write changes the value (by the signal's equality), every
//!    linked computation is scheduled and a flush is requested.
//!
//! 3. A write that compares equal to the current value does nothing at all:
//!    nothing is scheduled and no flush is requested.
//!
//! # Ownership
//!
//! A signal is split into a [`ReadSignal`] and a [`WriteSignal`]. Both are
//! cheap handles to the same shared state. The value lives in the handles;
//! the runtime's graph only stores the edges. When the last handle is
//! dropped the graph node is released and the signal disappears from every
//! computation's dependency set.
//!
//! Handles keep only a weak reference to their runtime. Once the runtime is
//! gone a signal behaves like a plain cell.

use std::cell::RefCell;
use std::fmt::{self, Debug};
use std::rc::Rc;

use crate::graph::SignalId;

use super::runtime::{Runtime, WeakRuntime};

/// Equality used to decide whether a write changes a signal.
type Equals<T> = Rc<dyn Fn(&T, &T) -> bool>;

/// Options for creating a signal or memo.
pub struct SignalOptions<T> {
    equals: Equals<T>,
}

impl<T: 'static> SignalOptions<T> {
    /// Treat two values as equal when `equals` returns `true`.
    pub fn equals<F>(equals: F) -> Self
    where
        F: Fn(&T, &T) -> bool + 'static,
    {
        Self {
            equals: Rc::new(equals),
        }
    }

    /// Never treat values as equal: every write notifies.
    pub fn always_notify() -> Self {
        Self::equals(|_, _| false)
    }
}

impl<T: PartialEq + 'static> Default for SignalOptions<T> {
    fn default() -> Self {
        Self::equals(|current, next| current == next)
    }
}

impl<T> Clone for SignalOptions<T> {
    fn clone(&self) -> Self {
        Self {
            equals: Rc::clone(&self.equals),
        }
    }
}

impl<T> Debug for SignalOptions<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignalOptions").finish_non_exhaustive()
    }
}

/// State shared by the two halves of a signal.
struct SignalState<T> {
    id: SignalId,
    value: RefCell<T>,
    equals: Equals<T>,
    runtime: WeakRuntime,
}

impl<T> SignalState<T> {
    fn track(&self) {
        if let Some(runtime) = self.runtime.upgrade() {
            runtime.track(self.id);
        }
    }

    fn write(&self, next: T) -> bool {
        let equal = {
            let current = self.value.borrow();
            (self.equals)(&*current, &next)
        };
        if equal {
            return false;
        }

        drop(self.value.replace(next));

        if let Some(runtime) = self.runtime.upgrade() {
            runtime.notify(self.id);
        }
        true
    }
}

impl<T> Drop for SignalState<T> {
    fn drop(&mut self) {
        if let Some(runtime) = self.runtime.upgrade() {
            runtime.release_signal(self.id);
        }
    }
}

/// The read half of a signal.
///
/// # Example
///
/// ```rust,ignore
/// let (count, set_count) = rt.create_signal(0);
///
/// rt.create_effect(move || println!("count: {}", count.get()));
/// set_count.update(|n| n + 1);
/// ```
pub struct ReadSignal<T> {
    state: Rc<SignalState<T>>,
}

impl<T> ReadSignal<T> {
    /// Get the signal's graph handle.
    pub fn id(&self) -> SignalId {
        self.state.id
    }

    /// Get a clone of the current value.
    ///
    /// If called while a computation is running, this also makes the
    /// computation depend on the signal.
    pub fn get(&self) -> T
    where
        T: Clone,
    {
        self.state.track();
        self.state.value.borrow().clone()
    }

    /// Borrow the current value, tracking like [`get`](ReadSignal::get).
    ///
    /// Writing the same signal from inside `f` panics.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.state.track();
        f(&*self.state.value.borrow())
    }

    /// Get the current value without tracking dependencies.
    pub fn get_untracked(&self) -> T
    where
        T: Clone,
    {
        self.state.value.borrow().clone()
    }

    /// Borrow the current value without tracking dependencies.
    pub fn with_untracked<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&*self.state.value.borrow())
    }
}

impl<T> Clone for ReadSignal<T> {
    fn clone(&self) -> Self {
        Self {
            state: Rc::clone(&self.state),
        }
    }
}

impl<T: Debug> Debug for ReadSignal<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReadSignal")
            .field("id", &self.state.id)
            .field("value", &*self.state.value.borrow())
            .finish()
    }
}

/// The write half of a signal.
pub struct WriteSignal<T> {
    state: Rc<SignalState<T>>,
}

impl<T> WriteSignal<T> {
    /// Get the signal's graph handle.
    pub fn id(&self) -> SignalId {
        self.state.id
    }

    /// Set a new value.
    ///
    /// If the value differs from the current one, every observer is
    /// scheduled and, outside a batch, a flush is requested. Returns whether
    /// the value changed.
    pub fn set(&self, value: T) -> bool {
        self.state.write(value)
    }

    /// Compute the new value from the current one, then [`set`] it.
    ///
    /// [`set`]: WriteSignal::set
    pub fn update(&self, f: impl FnOnce(&T) -> T) -> bool {
        let next = f(&*self.state.value.borrow());
        self.state.write(next)
    }
}

impl<T> Clone for WriteSignal<T> {
    fn clone(&self) -> Self {
        Self {
            state: Rc::clone(&self.state),
        }
    }
}

impl<T> Debug for WriteSignal<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WriteSignal")
            .field("id", &self.state.id)
            .finish()
    }
}

impl Runtime {
    /// Create a signal compared with `PartialEq`.
    ///
    /// Floats follow IEEE comparison: `NaN != NaN`, so writing `NaN` over
    /// `NaN` notifies every time. Pass a bitwise comparison through
    /// [`create_signal_with`](Runtime::create_signal_with) to treat repeated
    /// `NaN` writes as equal:
    ///
    /// ```rust,ignore
    /// let (ratio, set_ratio) = rt.create_signal_with(
    ///     f64::NAN,
    ///     SignalOptions::equals(|a: &f64, b: &f64| a.to_bits() == b.to_bits()),
    /// );
    /// ```
    pub fn create_signal<T>(&self, initial: T) -> (ReadSignal<T>, WriteSignal<T>)
    where
        T: PartialEq + 'static,
    {
        self.create_signal_with(initial, SignalOptions::default())
    }

    /// Create a signal with explicit options.
    pub fn create_signal_with<T>(
        &self,
        initial: T,
        options: SignalOptions<T>,
    ) -> (ReadSignal<T>, WriteSignal<T>)
    where
        T: 'static,
    {
        let id = self.inner.graph.borrow_mut().add_signal();
        let state = Rc::new(SignalState {
            id,
            value: RefCell::new(initial),
            equals: options.equals,
            runtime: self.downgrade(),
        });
        (
            ReadSignal {
                state: Rc::clone(&state),
            },
            WriteSignal { state },
        )
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
