//! Reactive Primitives
//!
//! This module implements the user-facing reactive system: signals, effects,
//! memos and roots, all hanging off one [`Runtime`].
//!
//! # Concepts
//!
//! ## Signals
//!
//! A Signal is a container for mutable state. When a signal's value is read
//! while a computation is running, the computation starts depending on the
//! signal. When the value changes, every dependent computation is scheduled.
//!
//! ## Effects
//!
//! An Effect is a side-effecting computation that runs once on creation and
//! again on the flush after any of its dependencies changes. Its
//! dependencies are rebuilt on every run.
//!
//! ## Memos
//!
//! A Memo is a derived value: an effect that writes its result to a signal
//! others can read.
//!
//! ## Roots
//!
//! A Root owns the effects and memos created inside it, so a whole subtree of
//! reactive work can be disposed at once.
//!
//! # Implementation Notes
//!
//! Changes are not propagated synchronously. A write schedules observers and
//! asks the host for a microtask; the flush that runs in that microtask
//! re-runs the queue. Several writes in the same tick therefore cost one
//! flush, and [`Runtime::batch`] extends that to synchronous hosts.

mod context;
mod effect;
mod memo;
mod root;
mod runtime;
mod signal;

pub use effect::Disposer;
pub use memo::Memo;
pub use root::RootDisposer;
pub use runtime::{Runtime, RuntimeBuilder};
pub use signal::{ReadSignal, SignalOptions, WriteSignal};

pub(crate) use root::Scope;
