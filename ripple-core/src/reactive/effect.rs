//! Effect Implementation
//!
//! An Effect is a side-effecting computation that runs whenever its
//! dependencies change.
//!
//! # How Effects Work
//!
//! 1. When created, the effect runs its function immediately to establish
//!    initial dependencies.
//!
//! 2. When any dependency changes, the effect is scheduled and re-runs on the
//!    next flush.
//!
//! 3. Before re-running, the effect drops its old dependencies and runs the
//!    cleanups registered by the previous run, then tracks new dependencies
//!    from scratch. A branch that stops reading a signal stops depending on it.
//!
//! # Use Cases
//!
//! Effects synchronize reactive state with the outside world: re-rendering a
//! board when its cards move, persisting a stack after an edit, logging.
//!
//! # Cleanup
//!
//! A running effect can register callbacks with `Runtime::on_cleanup`. They
//! run, in registration order, before the effect's next run and when it is
//! disposed. A panicking cleanup is reported to the error sink and the
//! remaining cleanups still run.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::graph::{Body, ComputationId};

use super::runtime::{Runtime, WeakRuntime};

/// Handle that disposes an effect.
///
/// Disposal is idempotent and terminal: a disposed effect never runs again.
/// Dropping the handle does not dispose the effect.
#[derive(Clone)]
pub struct Disposer {
    runtime: WeakRuntime,
    id: ComputationId,
}

impl Disposer {
    /// Get the computation's graph handle.
    pub fn id(&self) -> ComputationId {
        self.id
    }

    /// Dispose the effect.
    pub fn dispose(&self) {
        if let Some(runtime) = self.runtime.upgrade() {
            runtime.dispose_computation(self.id);
        }
    }

    /// Check if the effect has been disposed.
    pub fn is_disposed(&self) -> bool {
        self.runtime
            .upgrade()
            .map_or(true, |runtime| runtime.is_disposed(self.id))
    }
}

impl fmt::Debug for Disposer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Disposer")
            .field("id", &self.id)
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

impl Runtime {
    /// Create an effect and run it once.
    ///
    /// If a root is open the effect registers with it. Panics from the first
    /// run propagate out of this call.
    ///
    /// # Leaks
    ///
    /// The runtime owns the effect's closure. A closure that captures a
    /// clone of the `Runtime` (to call [`on_cleanup`](Runtime::on_cleanup)
    /// or [`untrack`](Runtime::untrack), say) keeps the whole runtime alive
    /// until the effect is disposed, even after every other handle is
    /// dropped. Dispose such effects, directly or through a root, when you
    /// are done with them.
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// let (count, set_count) = rt.create_signal(0);
    ///
    /// let effect = rt.create_effect(move || {
    ///     println!("Count is: {}", count.get());
    /// });
    ///
    /// set_count.set(5);  // Prints "Count is: 5" on the next flush
    /// effect.dispose();
    /// ```
    pub fn create_effect<F>(&self, f: F) -> Disposer
    where
        F: FnMut() + 'static,
    {
        let body: Body = Rc::new(RefCell::new(f));
        let id = self.spawn_computation(body);
        Disposer {
            runtime: self.downgrade(),
            id,
        }
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;
    use crate::host::ManualMicrotasks;

    fn runtime() -> (Runtime, ManualMicrotasks) {
        let microtasks = ManualMicrotasks::new();
        (Runtime::new(microtasks.clone()), microtasks)
    }

    fn counter() -> (Rc<Cell<usize>>, impl Fn()) {
        let count = Rc::new(Cell::new(0));
        let handle = count.clone();
        (count, move || handle.set(handle.get() + 1))
    }

    #[test]
    fn effect_runs_on_creation() {
        let (rt, _) = runtime();
        let (runs, bump) = counter();

        let _effect = rt.create_effect(move || bump());

        // Effect should have run once on creation
        assert_eq!(runs.get(), 1);
    }

    #[test]
    fn effect_reruns_after_flush() {
        let (rt, microtasks) = runtime();
        let (count, set_count) = rt.create_signal(0);
        let seen = Rc::new(Cell::new(-1));

        let observed = seen.clone();
        rt.create_effect(move || observed.set(count.get()));
        assert_eq!(seen.get(), 0);

        set_count.set(42);
        // Not yet: the flush waits for the microtask.
        assert_eq!(seen.get(), 0);

        microtasks.run_until_idle();
        assert_eq!(seen.get(), 42);
    }

    #[test]
    fn effect_does_not_run_after_disposal() {
        let (rt, microtasks) = runtime();
        let (count, set_count) = rt.create_signal(0);
        let (runs, bump) = counter();

        let effect = rt.create_effect(move || {
            count.get();
            bump();
        });
        assert_eq!(runs.get(), 1);

        effect.dispose();
        assert!(effect.is_disposed());

        set_count.set(1);
        set_count.set(2);
        microtasks.run_until_idle();

        assert_eq!(runs.get(), 1);
    }

    #[test]
    fn dispose_is_idempotent() {
        let (rt, _) = runtime();
        let (cleanups, bump) = counter();

        let inner_rt = rt.clone();
        let bump = Rc::new(bump);
        let effect = rt.create_effect(move || {
            let bump = bump.clone();
            inner_rt
                .on_cleanup(move || bump())
                .expect("inside a computation");
        });

        effect.dispose();
        effect.clone().dispose();

        assert_eq!(cleanups.get(), 1);
        assert_eq!(rt.computation_count(), 0);
    }

    #[test]
    fn dispose_removes_effect_from_queue() {
        let (rt, microtasks) = runtime();
        let (count, set_count) = rt.create_signal(0);
        let (runs, bump) = counter();

        let effect = rt.create_effect(move || {
            count.get();
            bump();
        });

        set_count.set(1);
        assert_eq!(rt.pending(), 1);

        effect.dispose();
        assert_eq!(rt.pending(), 0);

        microtasks.run_until_idle();
        assert_eq!(runs.get(), 1);
    }

    #[test]
    fn cleanups_run_before_each_rerun_in_order() {
        let (rt, microtasks) = runtime();
        let (count, set_count) = rt.create_signal(0);
        let log = Rc::new(RefCell::new(Vec::new()));

        let inner_rt = rt.clone();
        let inner_log = log.clone();
        rt.create_effect(move || {
            let value = count.get();
            inner_log.borrow_mut().push(format!("run {value}"));
            for name in ["first", "second"] {
                let log = inner_log.clone();
                inner_rt
                    .on_cleanup(move || log.borrow_mut().push(format!("{name} cleanup {value}")))
                    .expect("inside a computation");
            }
        });

        set_count.set(1);
        microtasks.run_until_idle();

        assert_eq!(
            *log.borrow(),
            vec![
                "run 0",
                "first cleanup 0",
                "second cleanup 0",
                "run 1",
            ]
        );
    }

    #[test]
    fn panicking_cleanup_does_not_block_siblings() {
        let errors = Rc::new(RefCell::new(Vec::new()));
        let sink = errors.clone();
        let microtasks = ManualMicrotasks::new();
        let rt = Runtime::builder(microtasks.clone())
            .error_sink(move |error| sink.borrow_mut().push(error.to_string()))
            .build();
        let (count, set_count) = rt.create_signal(0);
        let (cleanups, bump) = counter();
        let bump = Rc::new(bump);

        let inner_rt = rt.clone();
        rt.create_effect(move || {
            count.get();
            inner_rt
                .on_cleanup(|| panic!("stale listener"))
                .expect("inside a computation");
            let bump = bump.clone();
            inner_rt
                .on_cleanup(move || bump())
                .expect("inside a computation");
        });

        set_count.set(1);
        microtasks.run_until_idle();

        assert_eq!(cleanups.get(), 1);
        assert_eq!(
            *errors.borrow(),
            vec!["cleanup callback panicked: stale listener".to_string()]
        );
    }

    #[test]
    fn conditional_dependencies_switch() {
        let (rt, microtasks) = runtime();
        let (cond, set_cond) = rt.create_signal(true);
        let (a, set_a) = rt.create_signal(1);
        let (b, set_b) = rt.create_signal(10);
        let (runs, bump) = counter();

        let (cond_id, a_id, b_id) = (cond.id(), a.id(), b.id());
        let effect = rt.create_effect(move || {
            bump();
            if cond.get() {
                a.get();
            } else {
                b.get();
            }
        });
        assert_eq!(rt.dependencies(effect.id()), vec![cond_id, a_id]);

        // Writing the inactive branch does not schedule the effect.
        set_b.set(11);
        assert_eq!(rt.pending(), 0);

        set_cond.set(false);
        microtasks.run_until_idle();
        assert_eq!(rt.dependencies(effect.id()), vec![cond_id, b_id]);
        assert!(rt.observers(a_id).is_empty());
        assert_eq!(runs.get(), 2);

        set_a.set(2);
        assert_eq!(rt.pending(), 0);
        set_b.set(12);
        microtasks.run_until_idle();
        assert_eq!(runs.get(), 3);
    }

    #[test]
    fn body_may_dispose_itself() {
        let (rt, microtasks) = runtime();
        let (count, set_count) = rt.create_signal(0);
        let (runs, bump) = counter();
        let slot: Rc<RefCell<Option<Disposer>>> = Rc::default();

        let inner_slot = slot.clone();
        let effect = rt.create_effect(move || {
            bump();
            if count.get() > 0 {
                if let Some(disposer) = inner_slot.borrow().as_ref() {
                    disposer.dispose();
                }
            }
        });
        *slot.borrow_mut() = Some(effect.clone());

        set_count.set(1);
        microtasks.run_until_idle();
        set_count.set(2);
        microtasks.run_until_idle();

        assert_eq!(runs.get(), 2);
        assert!(effect.is_disposed());
    }

    #[test]
    fn effect_writing_its_own_dependency_does_not_loop_within_a_flush() {
        let (rt, microtasks) = runtime();
        let (count, set_count) = rt.create_signal(0);
        let (runs, bump) = counter();

        rt.create_effect(move || {
            bump();
            let value = count.get();
            if value < 3 {
                set_count.set(value + 1);
            }
        });

        // The creation run wrote once and queued itself; each flush advances
        // by exactly one step.
        assert_eq!(runs.get(), 1);
        assert_eq!(rt.pending(), 1);

        rt.flush();
        assert_eq!(runs.get(), 2);
        assert_eq!(rt.pending(), 1);
    }

    #[test]
    fn disposer_reports_disposed_once_runtime_is_gone() {
        let (rt, _) = runtime();
        let effect = rt.create_effect(|| {});
        assert!(!effect.is_disposed());

        drop(rt);
        assert!(effect.is_disposed());
    }
}
