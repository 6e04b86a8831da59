//! Stage registry and dependency-ordered resolution.
//!
//! Stages are registered in a fixed order. Resolution produces a total order
//! in which every stage follows all of its declared dependencies; among
//! stages that are free to run at the same point, the one registered first
//! goes first. The result is identical on every call for the same
//! registrations.

use super::stage::Stage;
use crate::errors::{PipelineError, Result};
use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap, HashSet, VecDeque};
use std::sync::Arc;

#[derive(Default)]
pub struct StageRegistry {
    stages: Vec<Arc<dyn Stage>>,
    index: HashMap<String, usize>,
}

impl StageRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a stage. Names must be unique.
    pub fn register<S: Stage + 'static>(&mut self, stage: S) -> Result<()> {
        self.register_shared(Arc::new(stage))
    }

    pub fn register_shared(&mut self, stage: Arc<dyn Stage>) -> Result<()> {
        let name = stage.name().to_string();
        if self.index.contains_key(&name) {
            return Err(PipelineError::DuplicateStage(name));
        }
        log::debug!(
            "Registered stage '{}' (after: [{}])",
            name,
            stage.dependencies().join(", ")
        );
        self.index.insert(name, self.stages.len());
        self.stages.push(stage);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Stage>> {
        self.index.get(name).map(|&i| &self.stages[i])
    }

    /// Stage names in registration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.stages.iter().map(|s| s.name())
    }

    /// Resolve the execution order.
    ///
    /// Fails with `UnknownDependency` for a dependency that was never
    /// registered, and with `CyclicDependency` naming one cycle when no valid
    /// order exists.
    pub fn resolve_order(&self) -> Result<Vec<Arc<dyn Stage>>> {
        let graph = self.build_graph()?;
        let order = kahn_order(&graph);

        if order.len() < self.stages.len() {
            let stages = find_cycle(&graph)
                .into_iter()
                .map(|node| self.stages[graph[node]].name().to_string())
                .collect();
            return Err(PipelineError::CyclicDependency { stages });
        }

        Ok(order
            .into_iter()
            .map(|node| Arc::clone(&self.stages[graph[node]]))
            .collect())
    }

    /// Group the resolved order into levels of mutually independent stages.
    ///
    /// Every stage in a level depends only on stages in earlier levels.
    /// Within a level, stages keep their resolved order.
    pub fn execution_levels(&self) -> Result<Vec<Vec<String>>> {
        let order = self.resolve_order()?;
        let mut level_of: HashMap<&str, usize> = HashMap::with_capacity(order.len());
        let mut levels: Vec<Vec<String>> = Vec::new();

        for stage in &order {
            let level = stage
                .dependencies()
                .iter()
                .filter_map(|dep| level_of.get(dep.as_str()))
                .map(|l| l + 1)
                .max()
                .unwrap_or(0);
            level_of.insert(stage.name(), level);
            if levels.len() <= level {
                levels.resize_with(level + 1, Vec::new);
            }
            levels[level].push(stage.name().to_string());
        }

        Ok(levels)
    }

    /// Dependency graph with one node per stage (weight = registration
    /// index) and an edge from each dependency to its dependent.
    fn build_graph(&self) -> Result<DiGraph<usize, ()>> {
        let mut graph = DiGraph::with_capacity(self.stages.len(), self.stages.len());
        let nodes: Vec<NodeIndex> = (0..self.stages.len()).map(|i| graph.add_node(i)).collect();

        for (i, stage) in self.stages.iter().enumerate() {
            let mut seen = HashSet::new();
            for dep in stage.dependencies() {
                let Some(&j) = self.index.get(dep) else {
                    return Err(PipelineError::UnknownDependency {
                        stage: stage.name().to_string(),
                        dependency: dep.clone(),
                    });
                };
                if seen.insert(j) {
                    graph.add_edge(nodes[j], nodes[i], ());
                }
            }
        }

        Ok(graph)
    }
}

/// Kahn's algorithm with ready stages taken lowest registration index first.
/// Returns fewer nodes than the graph holds when a cycle blocks progress.
fn kahn_order(graph: &DiGraph<usize, ()>) -> Vec<NodeIndex> {
    let mut in_degree: Vec<usize> = graph
        .node_indices()
        .map(|n| graph.neighbors_directed(n, Direction::Incoming).count())
        .collect();

    let mut ready: BinaryHeap<Reverse<usize>> = graph
        .node_indices()
        .filter(|n| in_degree[n.index()] == 0)
        .map(|n| Reverse(graph[n]))
        .collect();

    let mut order = Vec::with_capacity(graph.node_count());
    while let Some(Reverse(i)) = ready.pop() {
        let node = NodeIndex::new(i);
        order.push(node);
        for next in graph.neighbors_directed(node, Direction::Outgoing) {
            in_degree[next.index()] -= 1;
            if in_degree[next.index()] == 0 {
                ready.push(Reverse(graph[next]));
            }
        }
    }
    order
}

/// One dependency cycle as a closed path, e.g. `[a, b, a]`.
///
/// Picks the strongly connected component containing the earliest registered
/// stage on any cycle, starts from that stage, and follows the shortest path
/// back to it, preferring earlier registered stages at each step.
fn find_cycle(graph: &DiGraph<usize, ()>) -> Vec<NodeIndex> {
    let start = tarjan_scc(graph)
        .into_iter()
        .filter(|scc| scc.len() > 1 || graph.find_edge(scc[0], scc[0]).is_some())
        .filter_map(|scc| scc.into_iter().min_by_key(|n| graph[*n]))
        .min_by_key(|n| graph[*n]);

    let Some(start) = start else {
        return Vec::new();
    };
    if graph.find_edge(start, start).is_some() {
        return vec![start, start];
    }

    // Breadth-first search from `start` until an edge leads back to it.
    let mut parent: HashMap<NodeIndex, NodeIndex> = HashMap::new();
    let mut queue = VecDeque::from([start]);
    while let Some(node) = queue.pop_front() {
        let mut successors: Vec<NodeIndex> = graph.neighbors(node).collect();
        successors.sort_by_key(|n| graph[*n]);
        for next in successors {
            if next == start {
                let mut path = vec![node];
                let mut cursor = node;
                while let Some(&prev) = parent.get(&cursor) {
                    path.push(prev);
                    cursor = prev;
                }
                path.reverse();
                path.push(start);
                return path;
            }
            if !parent.contains_key(&next) {
                parent.insert(next, node);
                queue.push_back(next);
            }
        }
    }
    vec![start]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::Dataset;
    use crate::pipeline::FnStage;

    fn stage(name: &str, after: &[&str]) -> FnStage<fn(Dataset) -> anyhow::Result<Dataset>> {
        FnStage::new(name, Ok as fn(Dataset) -> anyhow::Result<Dataset>)
            .after(after.iter().copied())
    }

    fn names(order: &[Arc<dyn Stage>]) -> Vec<&str> {
        order.iter().map(|s| s.name()).collect()
    }

    #[test]
    fn test_dependents_follow_their_dependency() {
        let mut registry = StageRegistry::new();
        registry.register(stage("B", &["A"])).unwrap();
        registry.register(stage("C", &["A"])).unwrap();
        registry.register(stage("A", &[])).unwrap();

        let order = registry.resolve_order().unwrap();
        assert_eq!(names(&order), vec!["A", "B", "C"]);
    }

    #[test]
    fn test_ties_break_by_registration_order() {
        let mut registry = StageRegistry::new();
        for name in ["tree_canopy", "vacant", "crime_rate", "permits"] {
            registry.register(stage(name, &[])).unwrap();
        }
        let order = registry.resolve_order().unwrap();
        assert_eq!(
            names(&order),
            vec!["tree_canopy", "vacant", "crime_rate", "permits"]
        );
    }

    #[test]
    fn test_duplicate_registration_fails() {
        let mut registry = StageRegistry::new();
        registry.register(stage("vacant", &[])).unwrap();
        let err = registry.register(stage("vacant", &[])).unwrap_err();
        assert!(matches!(err, PipelineError::DuplicateStage(name) if name == "vacant"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_unknown_dependency_fails() {
        let mut registry = StageRegistry::new();
        registry.register(stage("priority", &["vacant"])).unwrap();
        let err = registry.resolve_order().err().unwrap();
        assert!(matches!(
            err,
            PipelineError::UnknownDependency { ref stage, ref dependency }
                if stage == "priority" && dependency == "vacant"
        ));
    }

    #[test]
    fn test_cycle_is_named_deterministically() {
        let mut registry = StageRegistry::new();
        registry.register(stage("root", &[])).unwrap();
        registry.register(stage("a", &["c", "root"])).unwrap();
        registry.register(stage("b", &["a"])).unwrap();
        registry.register(stage("c", &["b"])).unwrap();
        registry.register(stage("downstream", &["c"])).unwrap();

        for _ in 0..3 {
            match registry.resolve_order() {
                Err(PipelineError::CyclicDependency { stages }) => {
                    assert_eq!(stages, vec!["a", "b", "c", "a"]);
                }
                other => panic!("expected cycle, got {:?}", other.map(|o| o.len())),
            }
        }
    }

    #[test]
    fn test_self_dependency_is_a_cycle() {
        let mut registry = StageRegistry::new();
        registry.register(stage("loop", &["loop"])).unwrap();
        let err = registry.resolve_order().err().unwrap();
        assert!(matches!(
            err,
            PipelineError::CyclicDependency { ref stages } if stages == &["loop", "loop"]
        ));
    }

    #[test]
    fn test_execution_levels_group_independent_stages() {
        let mut registry = StageRegistry::new();
        registry.register(stage("opa", &[])).unwrap();
        registry.register(stage("vacant", &["opa"])).unwrap();
        registry.register(stage("canopy", &["opa"])).unwrap();
        registry.register(stage("priority", &["vacant", "canopy"])).unwrap();
        registry.register(stage("l_and_i", &[])).unwrap();

        let levels = registry.execution_levels().unwrap();
        assert_eq!(
            levels,
            vec![
                vec!["opa".to_string(), "l_and_i".to_string()],
                vec!["vacant".to_string(), "canopy".to_string()],
                vec!["priority".to_string()],
            ]
        );
    }
}
