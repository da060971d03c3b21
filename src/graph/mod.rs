//! Dependency graph resolution
//!
//! Orders units of work so that every dependency runs before its dependents,
//! and reports dependency cycles instead of failing on them.
//!
//! # Algorithm
//!
//! Depth-first traversal from each node in insertion order. A node is emitted
//! only after all of its dependencies (post-order). Cycle detection keeps the
//! current traversal path separately from the set of finished nodes; reaching
//! a node that is still on the path records the path from that node back to
//! itself. Traversal uses an explicit stack, so graph depth is bounded by
//! memory rather than by the call stack.
//!
//! When cycles exist, [`DependencyGraph::topological_order`] still returns
//! every node exactly once. Check [`DependencyGraph::detect_cycles`] before
//! trusting that order.

mod cycle;

pub use cycle::Cycle;

use std::collections::{HashMap, HashSet, VecDeque};

/// Node -> dependency mapping, preserving the order nodes were added
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    order: Vec<String>,
    edges: HashMap<String, Vec<String>>,
}

/// Build order plus any cycles found while computing it
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolution {
    pub order: Vec<String>,
    pub cycles: Vec<Cycle>,
}

impl Resolution {
    /// Whether the order is a true topological order
    pub fn is_acyclic(&self) -> bool {
        self.cycles.is_empty()
    }
}

impl DependencyGraph {
    /// Create an empty graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a graph from `(node, dependencies)` pairs
    pub fn from_edges<I, N, D, S>(edges: I) -> Self
    where
        I: IntoIterator<Item = (N, D)>,
        N: Into<String>,
        D: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut graph = Self::new();
        for (node, deps) in edges {
            graph.add_node(node, deps);
        }
        graph
    }

    /// Set the dependencies of `node`, replacing any previous set
    pub fn add_node<N, D, S>(&mut self, node: N, dependencies: D)
    where
        N: Into<String>,
        D: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let node = node.into();
        let mut deps: Vec<String> = Vec::new();
        for dep in dependencies {
            let dep = dep.into();
            if !deps.contains(&dep) {
                deps.push(dep);
            }
        }

        if !self.edges.contains_key(&node) {
            self.order.push(node.clone());
        }
        self.edges.insert(node, deps);
    }

    /// Add a single `node depends on dependency` edge
    pub fn add_edge(&mut self, node: impl Into<String>, dependency: impl Into<String>) {
        let node = node.into();
        let dependency = dependency.into();
        if !self.edges.contains_key(&node) {
            self.order.push(node.clone());
        }
        let deps = self.edges.entry(node).or_default();
        if !deps.contains(&dependency) {
            deps.push(dependency);
        }
    }

    /// Explicitly declared nodes, in insertion order
    pub fn nodes(&self) -> &[String] {
        &self.order
    }

    /// Number of explicitly declared nodes
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Whether the graph has no declared nodes
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Whether `node` was declared or referenced as a dependency
    pub fn contains(&self, node: &str) -> bool {
        self.edges.contains_key(node) || self.edges.values().any(|deps| deps.iter().any(|d| d == node))
    }

    /// Direct dependencies of `node`; undeclared nodes are leaves
    pub fn dependencies(&self, node: &str) -> &[String] {
        self.edges.get(node).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Nodes that list `node` as a direct dependency, in insertion order
    pub fn dependents(&self, node: &str) -> Vec<&str> {
        self.order
            .iter()
            .filter(|n| self.dependencies(n).iter().any(|d| d == node))
            .map(String::as_str)
            .collect()
    }

    /// Every node that depends on `node` directly or indirectly
    pub fn transitive_dependents(&self, node: &str) -> Vec<&str> {
        let mut seen: HashSet<&str> = HashSet::new();
        let mut result = Vec::new();
        let mut queue: VecDeque<&str> = VecDeque::from([node]);

        while let Some(current) = queue.pop_front() {
            for dependent in self.dependents(current) {
                if dependent != node && seen.insert(dependent) {
                    result.push(dependent);
                    queue.push_back(dependent);
                }
            }
        }

        result
    }

    /// Post-order DFS build order; best effort when cycles exist
    pub fn topological_order(&self) -> Vec<String> {
        let mut visited: HashSet<&str> = HashSet::new();
        let mut order = Vec::new();

        for root in &self.order {
            if !visited.insert(root.as_str()) {
                continue;
            }

            let mut stack: Vec<(&str, usize)> = vec![(root.as_str(), 0)];
            while let Some(frame) = stack.last_mut() {
                let node = frame.0;
                let deps = self.dependencies(node);

                if frame.1 < deps.len() {
                    let dep = deps[frame.1].as_str();
                    frame.1 += 1;
                    if visited.insert(dep) {
                        stack.push((dep, 0));
                    }
                } else {
                    order.push(node.to_string());
                    stack.pop();
                }
            }
        }

        order
    }

    /// Every distinct cycle reachable during traversal
    pub fn detect_cycles(&self) -> Vec<Cycle> {
        let mut visited: HashSet<&str> = HashSet::new();
        let mut on_path: HashSet<&str> = HashSet::new();
        let mut seen_cycles: HashSet<Vec<String>> = HashSet::new();
        let mut cycles = Vec::new();

        for root in &self.order {
            if !visited.insert(root.as_str()) {
                continue;
            }

            // The stack doubles as the current traversal path
            let mut stack: Vec<(&str, usize)> = vec![(root.as_str(), 0)];
            on_path.insert(root.as_str());

            while let Some(frame) = stack.last_mut() {
                let node = frame.0;
                let deps = self.dependencies(node);

                if frame.1 < deps.len() {
                    let dep = deps[frame.1].as_str();
                    frame.1 += 1;

                    if on_path.contains(dep) {
                        if let Some(start) = stack.iter().position(|(n, _)| *n == dep) {
                            let mut path: Vec<String> =
                                stack[start..].iter().map(|(n, _)| n.to_string()).collect();
                            path.push(dep.to_string());
                            let cycle = Cycle::new(path);
                            if seen_cycles.insert(cycle.canonical()) {
                                cycles.push(cycle);
                            }
                        }
                    } else if visited.insert(dep) {
                        on_path.insert(dep);
                        stack.push((dep, 0));
                    }
                } else {
                    on_path.remove(node);
                    stack.pop();
                }
            }
        }

        cycles
    }

    /// Order and cycles in one call
    pub fn resolve(&self) -> Resolution {
        Resolution {
            order: self.topological_order(),
            cycles: self.detect_cycles(),
        }
    }

    /// Whether the graph has no cycles
    pub fn is_acyclic(&self) -> bool {
        self.detect_cycles().is_empty()
    }

    /// Group nodes into batches that can run concurrently.
    ///
    /// Every node lands in a later batch than all of its dependencies. Edges
    /// that close a cycle are ignored, so cyclic graphs still produce batches.
    pub fn build_waves(&self) -> Vec<Vec<String>> {
        let order = self.topological_order();
        let mut level: HashMap<&str, usize> = HashMap::new();
        let mut waves: Vec<Vec<String>> = Vec::new();

        for node in &order {
            // Dependencies not yet levelled are back edges inside a cycle
            let wave = self
                .dependencies(node)
                .iter()
                .filter_map(|d| level.get(d.as_str()))
                .map(|l| l + 1)
                .max()
                .unwrap_or(0);

            level.insert(node.as_str(), wave);
            if waves.len() <= wave {
                waves.resize_with(wave + 1, Vec::new);
            }
            waves[wave].push(node.clone());
        }

        waves
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn position(order: &[String], node: &str) -> usize {
        order.iter().position(|n| n == node).unwrap()
    }

    fn assert_respects_edges(graph: &DependencyGraph, order: &[String]) {
        for node in graph.nodes() {
            for dep in graph.dependencies(node) {
                assert!(
                    position(order, dep) < position(order, node),
                    "{} must come before {} in {:?}",
                    dep,
                    node,
                    order
                );
            }
        }
    }

    #[test]
    fn linear_chain() {
        let graph = DependencyGraph::from_edges([("app", vec!["lib"]), ("lib", vec!["core"])]);
        assert_eq!(graph.topological_order(), vec!["core", "lib", "app"]);
        assert!(graph.is_acyclic());
    }

    #[test]
    fn diamond_respects_every_edge() {
        let graph = DependencyGraph::from_edges([
            ("app", vec!["ui", "api"]),
            ("ui", vec!["shared"]),
            ("api", vec!["shared", "db"]),
            ("shared", vec![]),
            ("db", vec![]),
        ]);

        let order = graph.topological_order();
        assert_eq!(order.len(), 5);
        assert_respects_edges(&graph, &order);
        assert!(graph.detect_cycles().is_empty());
    }

    #[test]
    fn tie_break_follows_insertion_order() {
        let graph = DependencyGraph::from_edges([
            ("zeta", Vec::<&str>::new()),
            ("alpha", Vec::new()),
            ("mid", Vec::new()),
        ]);
        assert_eq!(graph.topological_order(), vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn undeclared_dependency_is_a_leaf() {
        let graph = DependencyGraph::from_edges([("app", vec!["external"])]);
        assert_eq!(graph.topological_order(), vec!["external", "app"]);
        assert!(graph.dependencies("external").is_empty());
        assert!(graph.contains("external"));
        assert!(!graph.contains("nothing"));
    }

    #[test]
    fn three_node_cycle_is_reported() {
        let graph =
            DependencyGraph::from_edges([("A", vec!["B"]), ("B", vec!["C"]), ("C", vec!["A"])]);

        let cycles = graph.detect_cycles();
        assert_eq!(cycles.len(), 1);
        let members = cycles[0].nodes();
        for node in ["A", "B", "C"] {
            assert!(members.iter().any(|n| n == node));
        }
        assert_eq!(cycles[0].path(), ["A", "B", "C", "A"]);

        let mut order = graph.topological_order();
        order.sort();
        assert_eq!(order, vec!["A", "B", "C"]);
    }

    #[test]
    fn detection_continues_after_first_cycle() {
        let graph = DependencyGraph::from_edges([
            ("a", vec!["b"]),
            ("b", vec!["a"]),
            ("c", vec!["d"]),
            ("d", vec!["c"]),
            ("e", vec![]),
        ]);

        let resolution = graph.resolve();
        assert_eq!(resolution.cycles.len(), 2);
        assert!(!resolution.is_acyclic());
        assert_eq!(resolution.order.len(), 5);
    }

    #[test]
    fn self_loop_is_a_cycle() {
        let graph = DependencyGraph::from_edges([("a", vec!["a"])]);
        let cycles = graph.detect_cycles();
        assert_eq!(cycles.len(), 1);
        assert_eq!(cycles[0].path(), ["a", "a"]);
        assert_eq!(graph.topological_order(), vec!["a"]);
    }

    #[test]
    fn deep_chain_does_not_overflow() {
        let mut graph = DependencyGraph::new();
        for i in 0..50_000 {
            graph.add_edge(format!("n{}", i), format!("n{}", i + 1));
        }
        let order = graph.topological_order();
        assert_eq!(order.len(), 50_001);
        assert_eq!(order[0], "n50000");
        assert!(graph.is_acyclic());
    }

    #[test]
    fn dependents_and_transitive_dependents() {
        let graph = DependencyGraph::from_edges([
            ("app", vec!["lib"]),
            ("tool", vec!["lib"]),
            ("lib", vec!["core"]),
        ]);

        assert_eq!(graph.dependents("lib"), vec!["app", "tool"]);
        let mut all = graph.transitive_dependents("core");
        all.sort();
        assert_eq!(all, vec!["app", "lib", "tool"]);
    }

    #[test]
    fn transitive_dependents_terminates_on_cycles() {
        let graph = DependencyGraph::from_edges([("a", vec!["b"]), ("b", vec!["a"])]);
        assert_eq!(graph.transitive_dependents("a"), vec!["b"]);
    }

    #[test]
    fn waves_group_independent_nodes() {
        let graph = DependencyGraph::from_edges([
            ("app", vec!["ui", "api"]),
            ("ui", vec!["shared"]),
            ("api", vec!["shared"]),
            ("shared", vec![]),
        ]);

        let waves = graph.build_waves();
        assert_eq!(waves.len(), 3);
        assert_eq!(waves[0], vec!["shared"]);
        let mut middle = waves[1].clone();
        middle.sort();
        assert_eq!(middle, vec!["api", "ui"]);
        assert_eq!(waves[2], vec!["app"]);
    }

    #[test]
    fn waves_tolerate_cycles() {
        let graph =
            DependencyGraph::from_edges([("A", vec!["B"]), ("B", vec!["C"]), ("C", vec!["A"])]);
        let total: usize = graph.build_waves().iter().map(Vec::len).sum();
        assert_eq!(total, 3);
    }

    #[test]
    fn add_node_replaces_dependencies() {
        let mut graph = DependencyGraph::new();
        graph.add_node("a", ["b", "b", "c"]);
        assert_eq!(graph.dependencies("a"), ["b", "c"]);
        graph.add_node("a", ["d"]);
        assert_eq!(graph.dependencies("a"), ["d"]);
        assert_eq!(graph.len(), 1);
    }
}
