//! Graph Nodes
//!
//! This module defines the node types that live in the dependency graph.
//!
//! Nodes carry graph data only. A signal's value lives in its typed handle
//! (see `reactive::signal`); the arena just needs to know who observes it.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use indexmap::IndexSet;
use slotmap::new_key_type;

use crate::reactive::Scope;

new_key_type! {
    /// Stable handle of a signal node in the dependency graph.
    pub struct SignalId;

    /// Stable handle of a computation node in the dependency graph.
    ///
    /// Handles are generational: once a computation is disposed its handle
    /// never resolves again, even if the slot is reused.
    pub struct ComputationId;
}

/// A computation body. Shared so it can be invoked without holding a borrow
/// of the graph.
pub(crate) type Body = Rc<RefCell<dyn FnMut()>>;

/// A callback registered with `on_cleanup`.
pub(crate) type Cleanup = Box<dyn FnOnce()>;

/// A source node (signal).
#[derive(Debug, Default)]
pub(crate) struct SignalNode {
    /// Computations that read this signal during their latest run,
    /// in the order they first subscribed.
    pub(crate) observers: IndexSet<ComputationId>,
}

/// A computation node (effect or the driver of a memo).
pub(crate) struct ComputationNode {
    /// The function re-run whenever a dependency changes.
    pub(crate) body: Body,

    /// Signals read during the latest run.
    pub(crate) deps: IndexSet<SignalId>,

    /// Callbacks registered during the latest run, in registration order.
    pub(crate) cleanups: Vec<Cleanup>,

    /// Whether the computation currently sits in the scheduler queue.
    pub(crate) scheduled: bool,

    /// The root this computation registered with at creation.
    pub(crate) owner: Option<Weak<Scope>>,
}

impl ComputationNode {
    /// Create a fresh node around the given body.
    pub(crate) fn new(body: Body, owner: Option<Weak<Scope>>) -> Self {
        Self {
            body,
            deps: IndexSet::new(),
            cleanups: Vec::new(),
            scheduled: false,
            owner,
        }
    }
}

impl std::fmt::Debug for ComputationNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComputationNode")
            .field("deps", &self.deps)
            .field("cleanup_count", &self.cleanups.len())
            .field("scheduled", &self.scheduled)
            .field("owned", &self.owner.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn computation_node_starts_idle() {
        let body: Body = Rc::new(RefCell::new(|| {}));
        let node = ComputationNode::new(body, None);

        assert!(node.deps.is_empty());
        assert!(node.cleanups.is_empty());
        assert!(!node.scheduled);
        assert!(node.owner.is_none());
    }

    #[test]
    fn signal_node_starts_unobserved() {
        let node = SignalNode::default();
        assert!(node.observers.is_empty());
    }
}
