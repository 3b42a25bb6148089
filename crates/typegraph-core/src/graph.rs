//! Generic dependency/merge graph ordering.
//!
//! Each node carries an ordered list of *merge edges* (structural parents
//! whose attributes are combined into the node; first listed wins on
//! conflicts) and a list of plain *dependency edges* (must be ordered first
//! but contribute no attributes). [`DepGraph::order`] emits a topological
//! order over the union of both edge sets, so that by the time a caller
//! visits a node, every one of its merge parents has already been visited and
//! fully merged.
//!
//! The per-category merge functions live with the resolver phases; this
//! module only owns the ordering and cycle detection.

use alloc::collections::BTreeMap;
use alloc::vec::Vec;

/// A node's edges.
#[derive(Clone, Debug, Default)]
struct DepNode<K> {
    /// Structural parents, in declaration order.
    merge: Vec<K>,
    /// Order-only dependencies.
    deps: Vec<K>,
}

/// The graph contains a cycle; `members` lists every node on it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CycleError<K> {
    /// The nodes forming the cycle, in traversal order.
    pub members: Vec<K>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Visit {
    InProgress,
    Done,
}

/// A dependency/merge graph over keys of type `K`.
#[derive(Clone, Debug)]
pub struct DepGraph<K> {
    nodes: BTreeMap<K, DepNode<K>>,
}

impl<K: Ord + Clone> Default for DepGraph<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Ord + Clone> DepGraph<K> {
    /// Create an empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self {
            nodes: BTreeMap::new(),
        }
    }

    /// Add a node with its merge and dependency edges.
    ///
    /// Edges pointing at keys that are never added as nodes are ignored
    /// during ordering (e.g. builtin ancestors filtered out of the node set).
    pub fn add_node(&mut self, key: K, merge: Vec<K>, deps: Vec<K>) {
        self.nodes.insert(key, DepNode { merge, deps });
    }

    /// Number of nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Check for emptiness.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// The ordered merge parents of a node.
    #[must_use]
    pub fn merge_parents(&self, key: &K) -> &[K] {
        self.nodes.get(key).map_or(&[], |node| node.merge.as_slice())
    }

    fn edges_of(&self, key: &K) -> Vec<K> {
        self.nodes.get(key).map_or_else(Vec::new, |node| {
            node.merge.iter().chain(node.deps.iter()).cloned().collect()
        })
    }

    /// Compute a deterministic topological order over all nodes.
    ///
    /// Iterative depth-first traversal over the keys in sorted order;
    /// dependencies are emitted before their dependents.
    ///
    /// # Errors
    ///
    /// Returns [`CycleError`] naming every node on the first cycle found
    /// across the combined merge/dependency edge set.
    pub fn order(&self) -> Result<Vec<K>, CycleError<K>> {
        let mut state: BTreeMap<K, Visit> = BTreeMap::new();
        let mut order = Vec::with_capacity(self.nodes.len());

        for root in self.nodes.keys() {
            if state.contains_key(root) {
                continue;
            }

            // Each stack entry is (key, outgoing edges, next edge index).
            let mut stack: Vec<(K, Vec<K>, usize)> =
                alloc::vec![(root.clone(), self.edges_of(root), 0)];
            state.insert(root.clone(), Visit::InProgress);

            while let Some((key, edges, idx)) = stack.last() {
                if *idx >= edges.len() {
                    let key = key.clone();
                    stack.pop();
                    state.insert(key.clone(), Visit::Done);
                    order.push(key);
                    continue;
                }

                let next = edges[*idx].clone();
                if let Some((_, _, idx)) = stack.last_mut() {
                    *idx += 1;
                }

                match state.get(&next) {
                    Some(Visit::Done) => {}
                    Some(Visit::InProgress) => {
                        // The path from the first occurrence of `next` on the
                        // stack back to the top is the cycle.
                        let pos = stack
                            .iter()
                            .position(|(k, _, _)| *k == next)
                            .unwrap_or(0);
                        let members = stack[pos..].iter().map(|(k, _, _)| k.clone()).collect();
                        return Err(CycleError { members });
                    }
                    None => {
                        if self.nodes.contains_key(&next) {
                            state.insert(next.clone(), Visit::InProgress);
                            let edges = self.edges_of(&next);
                            stack.push((next, edges, 0));
                        } else {
                            // Edge to a key outside the node set: nothing to
                            // order, treat as already resolved.
                            state.insert(next, Visit::Done);
                        }
                    }
                }
            }
        }

        Ok(order)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    fn position(order: &[&str], key: &str) -> usize {
        order.iter().position(|k| *k == key).unwrap()
    }

    #[test]
    fn test_linear_chain() {
        let mut g = DepGraph::new();
        g.add_node("c", vec!["b"], vec![]);
        g.add_node("b", vec!["a"], vec![]);
        g.add_node("a", vec![], vec![]);

        let order = g.order().unwrap();
        assert_eq!(order, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_parents_before_children() {
        let mut g = DepGraph::new();
        g.add_node("child", vec!["p1", "p2"], vec![]);
        g.add_node("p1", vec![], vec![]);
        g.add_node("p2", vec![], vec![]);

        let order = g.order().unwrap();
        let order: Vec<&str> = order.into_iter().collect();
        assert!(position(&order, "p1") < position(&order, "child"));
        assert!(position(&order, "p2") < position(&order, "child"));
    }

    #[test]
    fn test_deps_count_for_ordering() {
        let mut g = DepGraph::new();
        g.add_node("b", vec![], vec!["a"]);
        g.add_node("a", vec![], vec![]);

        let order = g.order().unwrap();
        assert_eq!(order, vec!["a", "b"]);
    }

    #[test]
    fn test_unknown_edges_ignored() {
        let mut g = DepGraph::new();
        g.add_node("a", vec!["not-a-node"], vec!["also-missing"]);

        let order = g.order().unwrap();
        assert_eq!(order, vec!["a"]);
    }

    #[test]
    fn test_two_cycle() {
        let mut g = DepGraph::new();
        g.add_node("a", vec!["b"], vec![]);
        g.add_node("b", vec!["a"], vec![]);

        let err = g.order().unwrap_err();
        let mut members = err.members;
        members.sort_unstable();
        assert_eq!(members, vec!["a", "b"]);
    }

    #[test]
    fn test_self_cycle() {
        let mut g = DepGraph::new();
        g.add_node("a", vec!["a"], vec![]);

        let err = g.order().unwrap_err();
        assert_eq!(err.members, vec!["a"]);
    }

    #[test]
    fn test_mixed_edge_cycle() {
        // A cycle across one merge edge and one dependency edge still fails.
        let mut g = DepGraph::new();
        g.add_node("a", vec!["b"], vec![]);
        g.add_node("b", vec![], vec!["a"]);

        let err = g.order().unwrap_err();
        assert_eq!(err.members.len(), 2);
    }

    #[test]
    fn test_deterministic_order() {
        let build = || {
            let mut g = DepGraph::new();
            g.add_node("d", vec!["b", "c"], vec![]);
            g.add_node("c", vec!["a"], vec![]);
            g.add_node("b", vec!["a"], vec![]);
            g.add_node("a", vec![], vec![]);
            g
        };
        assert_eq!(build().order().unwrap(), build().order().unwrap());
    }

    #[test]
    fn test_merge_parents_accessor() {
        let mut g = DepGraph::new();
        g.add_node("child", vec!["p1", "p2"], vec!["dep"]);
        assert_eq!(g.merge_parents(&"child"), &["p1", "p2"]);
        assert!(g.merge_parents(&"missing").is_empty());
    }
}
