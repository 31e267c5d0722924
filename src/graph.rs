//! Dependency Graph
//!
//! Directed graph of opaque payloads keyed by string id. An edge `a -> b`
//! means `a` must complete before `b`; it is stored as a dependency on `b`.
//! Dependencies may name ids that are not in the graph (out-of-scope work);
//! levelling treats those as already satisfied.

use crate::error::GraphError;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::warn;

/// A graph node: payload, dependency ids, and the level once resolved
#[derive(Debug, Clone)]
pub struct GraphNode<T> {
    pub id: String,
    pub payload: T,
    pub dependencies: Vec<String>,
    pub level: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct DependencyGraph<T> {
    nodes: BTreeMap<String, GraphNode<T>>,
}

impl<T> Default for DependencyGraph<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> DependencyGraph<T> {
    pub fn new() -> Self {
        Self {
            nodes: BTreeMap::new(),
        }
    }

    /// Add a node with no dependencies. Fails if the id is already present.
    pub fn add_node(&mut self, id: impl Into<String>, payload: T) -> Result<(), GraphError> {
        self.add_node_with_dependencies(id, payload, Vec::new())
    }

    /// Add a node with an initial dependency list. Dependencies are not
    /// required to exist in the graph.
    pub fn add_node_with_dependencies(
        &mut self,
        id: impl Into<String>,
        payload: T,
        dependencies: Vec<String>,
    ) -> Result<(), GraphError> {
        let id = id.into();
        if self.nodes.contains_key(&id) {
            return Err(GraphError::DuplicateNode(id));
        }
        let mut deduped = Vec::with_capacity(dependencies.len());
        for dep in dependencies {
            if !deduped.contains(&dep) {
                deduped.push(dep);
            }
        }
        self.nodes.insert(
            id.clone(),
            GraphNode {
                id,
                payload,
                dependencies: deduped,
                level: None,
            },
        );
        Ok(())
    }

    /// Add an edge: `from` must complete before `to`. Both endpoints must exist.
    pub fn add_edge(&mut self, from: &str, to: &str) -> Result<(), GraphError> {
        if !self.nodes.contains_key(from) {
            return Err(GraphError::NodeNotFound(from.to_string()));
        }
        let node = self
            .nodes
            .get_mut(to)
            .ok_or_else(|| GraphError::NodeNotFound(to.to_string()))?;
        if !node.dependencies.iter().any(|d| d == from) {
            node.dependencies.push(from.to_string());
            node.level = None;
        }
        Ok(())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<&GraphNode<T>> {
        self.nodes.get(id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Nodes in id order
    pub fn nodes(&self) -> impl Iterator<Item = &GraphNode<T>> {
        self.nodes.values()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.nodes.keys().map(String::as_str)
    }

    pub fn level_of(&self, id: &str) -> Option<usize> {
        self.nodes.get(id).and_then(|n| n.level)
    }

    /// Dependencies of `id` that exist in the graph
    pub fn resolvable_dependencies<'a>(&'a self, id: &str) -> Vec<&'a str> {
        self.nodes
            .get(id)
            .map(|node| {
                node.dependencies
                    .iter()
                    .filter(|d| self.nodes.contains_key(d.as_str()))
                    .map(String::as_str)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// True iff a directed cycle exists, including a self-edge.
    pub fn has_cycle(&self) -> bool {
        self.find_cycle().is_some()
    }

    /// Depth-first search with a recursion-stack marker. Returns the cycle as
    /// a path that starts and ends on the same id.
    pub fn find_cycle(&self) -> Option<Vec<String>> {
        #[derive(Clone, Copy, PartialEq, Eq)]
        enum Mark {
            Unvisited,
            OnStack,
            Done,
        }

        let mut marks: HashMap<&str, Mark> = self
            .nodes
            .keys()
            .map(|id| (id.as_str(), Mark::Unvisited))
            .collect();

        for root in self.nodes.keys() {
            if marks[root.as_str()] != Mark::Unvisited {
                continue;
            }
            // Explicit stack of (node, next dependency index) keeps deep graphs off the call stack.
            let mut stack: Vec<(&str, usize)> = vec![(root.as_str(), 0)];
            marks.insert(root.as_str(), Mark::OnStack);

            while let Some((current, next_index)) = stack.last().copied() {
                let deps = &self.nodes[current].dependencies;
                if next_index >= deps.len() {
                    marks.insert(current, Mark::Done);
                    stack.pop();
                    continue;
                }
                if let Some(top) = stack.last_mut() {
                    top.1 += 1;
                }
                let dep = deps[next_index].as_str();
                match marks.get(dep).copied() {
                    None | Some(Mark::Done) => {}
                    Some(Mark::OnStack) => {
                        let start = stack
                            .iter()
                            .position(|(id, _)| *id == dep)
                            .unwrap_or(0);
                        let mut path: Vec<String> =
                            stack[start..].iter().map(|(id, _)| id.to_string()).collect();
                        path.push(dep.to_string());
                        return Some(path);
                    }
                    Some(Mark::Unvisited) => {
                        marks.insert(dep, Mark::OnStack);
                        stack.push((dep, 0));
                    }
                }
            }
        }
        None
    }

    /// Fails with `CycleDetected` when the graph is not acyclic.
    pub fn validate(&self) -> Result<(), GraphError> {
        match self.find_cycle() {
            Some(path) => Err(GraphError::CycleDetected { path }),
            None => Ok(()),
        }
    }

    /// Topological order (dependencies first). Ties break on id order.
    pub fn topological_sort(&self) -> Result<Vec<String>, GraphError> {
        self.validate()?;

        let mut in_degree: BTreeMap<&str, usize> = BTreeMap::new();
        let mut dependents: HashMap<&str, Vec<&str>> = HashMap::new();
        for (id, node) in &self.nodes {
            let deps = self.resolvable_dependencies(id);
            in_degree.insert(id.as_str(), deps.len());
            for dep in deps {
                dependents.entry(dep).or_default().push(node.id.as_str());
            }
        }

        let mut ready: BTreeSet<&str> = in_degree
            .iter()
            .filter(|(_, degree)| **degree == 0)
            .map(|(id, _)| *id)
            .collect();
        let mut order = Vec::with_capacity(self.nodes.len());
        while let Some(id) = ready.pop_first() {
            order.push(id.to_string());
            if let Some(children) = dependents.get(id) {
                for child in children {
                    if let Some(degree) = in_degree.get_mut(child) {
                        *degree -= 1;
                        if *degree == 0 {
                            ready.insert(*child);
                        }
                    }
                }
            }
        }

        if order.len() != self.nodes.len() {
            return Err(GraphError::CycleDetected { path: Vec::new() });
        }
        Ok(order)
    }

    /// Iterative fixed point: a node's level is 0 without resolvable
    /// dependencies, else one more than the highest dependency level.
    ///
    /// Runs at most `len + 1` passes; anything still unresolved (only possible
    /// on a cyclic graph) is assigned level 0. Returns the number of levels.
    pub fn compute_levels(&mut self) -> usize {
        for node in self.nodes.values_mut() {
            node.level = None;
        }

        let max_passes = self.nodes.len() + 1;
        for _ in 0..max_passes {
            let mut resolved: Vec<(String, usize)> = Vec::new();
            for (id, node) in &self.nodes {
                if node.level.is_some() {
                    continue;
                }
                let mut highest: Option<usize> = None;
                let mut ready = true;
                for dep in &node.dependencies {
                    let Some(dep_node) = self.nodes.get(dep) else {
                        continue;
                    };
                    match dep_node.level {
                        Some(level) => highest = Some(highest.map_or(level, |h| h.max(level))),
                        None => {
                            ready = false;
                            break;
                        }
                    }
                }
                if ready {
                    resolved.push((id.clone(), highest.map_or(0, |h| h + 1)));
                }
            }
            if resolved.is_empty() {
                break;
            }
            for (id, level) in resolved {
                if let Some(node) = self.nodes.get_mut(&id) {
                    node.level = Some(level);
                }
            }
        }

        for node in self.nodes.values_mut() {
            if node.level.is_none() {
                warn!(node_id = %node.id, "Level did not converge; assigning level 0");
                node.level = Some(0);
            }
        }

        self.nodes
            .values()
            .filter_map(|n| n.level)
            .max()
            .map_or(0, |max| max + 1)
    }

    /// Node ids grouped by level, ascending. Levels are computed if needed.
    pub fn levels(&mut self) -> Vec<Vec<String>> {
        if self.nodes.values().any(|n| n.level.is_none()) {
            self.compute_levels();
        }
        let mut grouped: BTreeMap<usize, Vec<String>> = BTreeMap::new();
        for node in self.nodes.values() {
            grouped
                .entry(node.level.unwrap_or(0))
                .or_default()
                .push(node.id.clone());
        }
        grouped.into_values().collect()
    }

    /// Consume the graph, yielding its nodes in id order.
    pub fn into_nodes(self) -> impl Iterator<Item = GraphNode<T>> {
        self.nodes.into_values()
    }
}
