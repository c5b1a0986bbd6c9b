//! Dependency Graph
//!
//! This module implements the dependency graph that tracks relationships
//! between signals and the computations that read them, together with the
//! queue that re-runs computations after their inputs change.
//!
//! # Overview
//!
//! - Nodes are either signals (sources) or computations (effects and the
//!   drivers behind memos).
//! - An edge means "this computation read this signal during its latest run".
//!   Edges are rebuilt from scratch on every run, so conditional reads switch
//!   dependencies without any declared dependency list.
//!
//! # Design Decisions
//!
//! 1. Nodes live in generational arenas (`slotmap`) and are addressed by
//!    copyable keys. An edge is a pair of index-set entries, never an owning
//!    pointer, so the graph itself cannot form reference cycles.
//!
//! 2. Both directions are stored: observers on the signal, dependencies on
//!    the computation. Tearing a computation down touches only its own edges.
//!
//! 3. The scheduler runs work in first-scheduled order. It does not sort
//!    topologically.

mod arena;
mod node;
mod scheduler;

pub(crate) use arena::Graph;
pub(crate) use node::{Body, Cleanup, ComputationNode};
pub use node::{ComputationId, SignalId};
pub(crate) use scheduler::UpdateScheduler;
pub use scheduler::FlushState;
