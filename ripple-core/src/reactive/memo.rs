//! Memo Implementation
//!
//! A Memo is a derived value kept in sync by a computation the memo owns.
//!
//! # How Memos Work
//!
//! 1. On creation, the memo runs its function once and seeds an inner signal
//!    with the result. A memo therefore always holds a value.
//!
//! 2. The function's reads are tracked like any effect's. When one of them
//!    changes, the memo's computation is scheduled with everything else.
//!
//! 3. When it re-runs, the new result is written to the inner signal. The
//!    signal's equality decides whether the memo's own readers are notified.
//!
//! # Ordering
//!
//! The memo's computation has no priority over its siblings in the queue.
//! An effect that reads both a source and a memo of that source can run
//! before the memo within a flush and see the memo's previous value. Readers
//! scheduled by the memo's write during a flush wait for the next flush.

use std::cell::RefCell;
use std::fmt::{self, Debug};
use std::rc::Rc;

use crate::graph::ComputationId;

use super::effect::Disposer;
use super::runtime::Runtime;
use super::signal::{ReadSignal, SignalOptions, WriteSignal};

/// A derived, cached value.
pub struct Memo<T> {
    signal: ReadSignal<T>,
    disposer: Disposer,
}

impl<T> Memo<T> {
    /// Get a clone of the cached value, tracking like a signal read.
    pub fn get(&self) -> T
    where
        T: Clone,
    {
        self.signal.get()
    }

    /// Borrow the cached value, tracking like a signal read.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.signal.with(f)
    }

    /// Get a clone of the cached value without tracking.
    pub fn get_untracked(&self) -> T
    where
        T: Clone,
    {
        self.signal.get_untracked()
    }

    /// Borrow the cached value without tracking.
    pub fn with_untracked<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.signal.with_untracked(f)
    }

    /// The read half of the inner signal.
    pub fn signal(&self) -> &ReadSignal<T> {
        &self.signal
    }

    /// Get the owning computation's graph handle.
    pub fn id(&self) -> ComputationId {
        self.disposer.id()
    }

    /// The owning computation's disposer.
    pub fn disposer(&self) -> &Disposer {
        &self.disposer
    }

    /// Stop recomputing. The last value stays readable.
    pub fn dispose(&self) {
        self.disposer.dispose();
    }
}

impl<T> Clone for Memo<T> {
    fn clone(&self) -> Self {
        Self {
            signal: self.signal.clone(),
            disposer: self.disposer.clone(),
        }
    }
}

impl<T: Debug> Debug for Memo<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Memo")
            .field("signal", &self.signal)
            .field("disposer", &self.disposer)
            .finish()
    }
}

impl Runtime {
    /// Create a memo compared with `PartialEq`.
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// let (cards, set_cards) = rt.create_signal(vec![3, 5]);
    /// let total = rt.create_memo(move || cards.with(|c| c.iter().sum::<u32>()));
    ///
    /// assert_eq!(total.get(), 8);
    /// ```
    pub fn create_memo<T, F>(&self, f: F) -> Memo<T>
    where
        T: PartialEq + 'static,
        F: FnMut() -> T + 'static,
    {
        self.create_memo_with(f, SignalOptions::default())
    }

    /// Create a memo whose inner signal uses `options`.
    pub fn create_memo_with<T, F>(&self, mut f: F, options: SignalOptions<T>) -> Memo<T>
    where
        T: 'static,
        F: FnMut() -> T + 'static,
    {
        let slot: Rc<RefCell<Option<(ReadSignal<T>, WriteSignal<T>)>>> = Rc::default();

        let runtime = self.downgrade();
        let inner_slot = Rc::clone(&slot);
        let disposer = self.create_effect(move || {
            let value = f();
            let writer = inner_slot.borrow().as_ref().map(|(_, write)| write.clone());
            match writer {
                Some(writer) => {
                    writer.set(value);
                }
                None => {
                    if let Some(runtime) = runtime.upgrade() {
                        let signal = runtime.create_signal_with(value, options.clone());
                        *inner_slot.borrow_mut() = Some(signal);
                    }
                }
            }
        });

        let signal = slot
            .borrow()
            .as_ref()
            .map(|(read, _)| read.clone())
            .expect("memo body seeds its signal on the first run");
        Memo { signal, disposer }
    }
}
