//! Ripple Core
//!
//! This crate provides a fine-grained reactive computation engine. It
//! implements:
//!
//! - Reactive primitives (signals, effects, memos, roots)
//! - Automatic dependency tracking with dependencies rebuilt on every run
//! - A microtask-batched update scheduler
//! - Pluggable hosts for the microtask queue and error reporting
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - `reactive`: The runtime and the user-facing primitives
//! - `graph`: The dependency arena and the update scheduler
//! - `host`: Microtask queues and the default error sink
//! - `error`: Error types
//!
//! # Example
//!
//! ```rust
//! use ripple_core::{ManualMicrotasks, Runtime};
//!
//! let microtasks = ManualMicrotasks::new();
//! let rt = Runtime::new(microtasks.clone());
//!
//! // Create a signal
//! let (count, set_count) = rt.create_signal(0);
//!
//! // Create a derived value
//! let doubled = {
//!     let count = count.clone();
//!     rt.create_memo(move || count.get() * 2)
//! };
//!
//! // Create an effect
//! let reader = doubled.clone();
//! rt.create_effect(move || {
//!     println!("Doubled: {}", reader.get());
//! });
//!
//! // Update the signal, then let the host drain its microtasks
//! set_count.set(5);
//! microtasks.run_until_idle();
//! assert_eq!(doubled.get(), 10);
//! ```

pub mod error;
pub mod graph;
pub mod host;
pub mod reactive;

pub use error::ReactiveError;
pub use graph::{ComputationId, FlushState, SignalId};
pub use host::{ManualMicrotasks, Microtask, Microtasks, TokioMicrotasks};
pub use reactive::{
    Disposer, Memo, ReadSignal, RootDisposer, Runtime, RuntimeBuilder, SignalOptions, WriteSignal,
};
