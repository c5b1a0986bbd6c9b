//! Graph Arena
//!
//! Owns every signal and computation node of one runtime and maintains the
//! edges between them.
//!
//! An edge is recorded twice: the signal lists the computation among its
//! observers, and the computation lists the signal among its dependencies.
//! Every mutation here keeps both sides in step, so outside a single run's
//! teardown/rebuild `c ∈ s.observers` holds exactly when `s ∈ c.deps`.
//!
//! Nodes removed from the arena are returned to the caller rather than
//! dropped in place. Dropping a computation can drop captured signal handles,
//! whose own `Drop` needs to borrow the graph again.

use slotmap::SlotMap;
use smallvec::SmallVec;

use super::node::{ComputationId, ComputationNode, SignalId, SignalNode};

/// Snapshot of a signal's observers, taken before notifying them.
pub(crate) type Observers = SmallVec<[ComputationId; 4]>;

/// The dependency graph of a runtime.
#[derive(Debug, Default)]
pub(crate) struct Graph {
    signals: SlotMap<SignalId, SignalNode>,
    computations: SlotMap<ComputationId, ComputationNode>,
}

impl Graph {
    /// Create an empty graph.
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Add a signal node.
    pub(crate) fn add_signal(&mut self) -> SignalId {
        self.signals.insert(SignalNode::default())
    }

    /// Remove a signal node, detaching it from every observer.
    pub(crate) fn remove_signal(&mut self, signal: SignalId) -> Option<SignalNode> {
        let node = self.signals.remove(signal)?;
        for observer in &node.observers {
            if let Some(computation) = self.computations.get_mut(*observer) {
                computation.deps.swap_remove(&signal);
            }
        }
        Some(node)
    }

    /// Add a computation node.
    pub(crate) fn add_computation(&mut self, node: ComputationNode) -> ComputationId {
        self.computations.insert(node)
    }

    /// Remove a computation node, detaching it from every dependency.
    ///
    /// The node is handed back so the caller can run its cleanups and drop
    /// its body once the graph is no longer borrowed.
    pub(crate) fn remove_computation(
        &mut self,
        computation: ComputationId,
    ) -> Option<ComputationNode> {
        let node = self.computations.remove(computation)?;
        for dep in &node.deps {
            if let Some(signal) = self.signals.get_mut(*dep) {
                signal.observers.shift_remove(&computation);
            }
        }
        Some(node)
    }

    /// Record that `computation` read `signal`.
    ///
    /// Returns `false` if either node is gone.
    pub(crate) fn link(&mut self, signal: SignalId, computation: ComputationId) -> bool {
        let (Some(source), Some(observer)) = (
            self.signals.get_mut(signal),
            self.computations.get_mut(computation),
        ) else {
            return false;
        };
        source.observers.insert(computation);
        observer.deps.insert(signal);
        true
    }

    /// Drop every edge of `computation`, leaving its dependency set empty.
    pub(crate) fn detach(&mut self, computation: ComputationId) {
        let Some(node) = self.computations.get_mut(computation) else {
            return;
        };
        for dep in node.deps.drain(..) {
            if let Some(signal) = self.signals.get_mut(dep) {
                // Order-preserving: observers are notified in subscription order.
                signal.observers.shift_remove(&computation);
            }
        }
    }

    /// Snapshot the current observers of `signal`.
    pub(crate) fn observers(&self, signal: SignalId) -> Observers {
        self.signals
            .get(signal)
            .map(|node| node.observers.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Snapshot the current dependencies of `computation`.
    pub(crate) fn dependencies(&self, computation: ComputationId) -> Vec<SignalId> {
        self.computations
            .get(computation)
            .map(|node| node.deps.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Check whether `computation` is still alive (not disposed).
    pub(crate) fn contains_computation(&self, computation: ComputationId) -> bool {
        self.computations.contains_key(computation)
    }

    /// Check whether `signal` is still alive.
    #[cfg(test)]
    pub(crate) fn contains_signal(&self, signal: SignalId) -> bool {
        self.signals.contains_key(signal)
    }

    /// Get a mutable reference to a computation node.
    pub(crate) fn computation_mut(
        &mut self,
        computation: ComputationId,
    ) -> Option<&mut ComputationNode> {
        self.computations.get_mut(computation)
    }

    /// Number of live computations.
    pub(crate) fn computation_count(&self) -> usize {
        self.computations.len()
    }

    /// Number of live signals.
    pub(crate) fn signal_count(&self) -> usize {
        self.signals.len()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::graph::node::Body;

    fn computation() -> ComputationNode {
        let body: Body = Rc::new(RefCell::new(|| {}));
        ComputationNode::new(body, None)
    }

    #[test]
    fn link_records_both_sides() {
        let mut graph = Graph::new();
        let signal = graph.add_signal();
        let effect = graph.add_computation(computation());

        assert!(graph.link(signal, effect));

        assert_eq!(graph.observers(signal).as_slice(), &[effect]);
        assert_eq!(graph.dependencies(effect), vec![signal]);
    }

    #[test]
    fn link_is_deduplicated() {
        let mut graph = Graph::new();
        let signal = graph.add_signal();
        let effect = graph.add_computation(computation());

        graph.link(signal, effect);
        graph.link(signal, effect);

        assert_eq!(graph.observers(signal).len(), 1);
        assert_eq!(graph.dependencies(effect).len(), 1);
    }

    #[test]
    fn detach_clears_both_sides() {
        let mut graph = Graph::new();
        let a = graph.add_signal();
        let b = graph.add_signal();
        let effect = graph.add_computation(computation());

        graph.link(a, effect);
        graph.link(b, effect);
        graph.detach(effect);

        assert!(graph.dependencies(effect).is_empty());
        assert!(graph.observers(a).is_empty());
        assert!(graph.observers(b).is_empty());
        assert!(graph.contains_computation(effect));
    }

    #[test]
    fn detach_preserves_observer_order() {
        let mut graph = Graph::new();
        let signal = graph.add_signal();
        let first = graph.add_computation(computation());
        let second = graph.add_computation(computation());
        let third = graph.add_computation(computation());

        graph.link(signal, first);
        graph.link(signal, second);
        graph.link(signal, third);
        graph.detach(first);

        assert_eq!(graph.observers(signal).as_slice(), &[second, third]);
    }

    #[test]
    fn removed_computation_handle_is_dead() {
        let mut graph = Graph::new();
        let signal = graph.add_signal();
        let effect = graph.add_computation(computation());
        graph.link(signal, effect);

        assert!(graph.remove_computation(effect).is_some());

        assert!(!graph.contains_computation(effect));
        assert!(graph.observers(signal).is_empty());
        assert!(!graph.link(signal, effect));
        assert!(graph.remove_computation(effect).is_none());

        // A reused slot never resolves through the stale handle.
        let replacement = graph.add_computation(computation());
        assert_ne!(replacement, effect);
        assert!(!graph.contains_computation(effect));
    }

    #[test]
    fn removed_signal_leaves_observer_deps() {
        let mut graph = Graph::new();
        let signal = graph.add_signal();
        let other = graph.add_signal();
        let effect = graph.add_computation(computation());
        graph.link(signal, effect);
        graph.link(other, effect);

        graph.remove_signal(signal);

        assert!(!graph.contains_signal(signal));
        assert_eq!(graph.dependencies(effect), vec![other]);
        assert_eq!(graph.signal_count(), 1);
        assert_eq!(graph.computation_count(), 1);
    }
}
