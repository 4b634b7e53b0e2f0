//! Topology
//!
//! Ordering and ancestry queries over the graph structure.
//!
//! # Algorithm
//!
//! Ordering uses Kahn's algorithm:
//!
//! 1. Count the in-degree of every node
//! 2. Seed a queue with the nodes of in-degree zero, in insertion order
//! 3. Pop a node, emit it, decrement the in-degree of its dependents and
//!    enqueue those reaching zero
//!
//! Generations run the same algorithm one layer at a time: a generation is
//! the set of nodes whose dependencies all live in earlier generations. If
//! nodes remain once no in-degree reaches zero, the graph has a cycle.

use std::collections::{HashMap, VecDeque};

use indexmap::IndexSet;

use super::{Graph, Kind, NodeId};
use crate::error::{GraphError, Result};

impl Graph {
    fn in_degrees(&self) -> HashMap<NodeId, usize> {
        self.index
            .values()
            .map(|&id| (id, self.nodes[id].dependencies().len()))
            .collect()
    }

    /// Node handles ordered so that dependencies come before dependents.
    pub(crate) fn topological_ids(&self) -> Result<Vec<NodeId>> {
        let mut in_degree = self.in_degrees();
        let mut queue: VecDeque<NodeId> = self
            .index
            .values()
            .copied()
            .filter(|id| in_degree[id] == 0)
            .collect();
        let mut result = Vec::with_capacity(self.len());

        while let Some(node_id) = queue.pop_front() {
            result.push(node_id);
            for &dependent_id in self.nodes[node_id].dependents() {
                if let Some(degree) = in_degree.get_mut(&dependent_id) {
                    *degree = degree.saturating_sub(1);
                    if *degree == 0 {
                        queue.push_back(dependent_id);
                    }
                }
            }
        }

        if result.len() != self.len() {
            return Err(GraphError::CycleDetected);
        }
        Ok(result)
    }

    fn generation_ids(&self) -> Result<Vec<Vec<NodeId>>> {
        let mut in_degree = self.in_degrees();
        let mut current: Vec<NodeId> = self
            .index
            .values()
            .copied()
            .filter(|id| in_degree[id] == 0)
            .collect();
        let mut generations = Vec::new();
        let mut seen = 0;

        while !current.is_empty() {
            seen += current.len();
            let mut next = Vec::new();
            for &node_id in &current {
                for &dependent_id in self.nodes[node_id].dependents() {
                    if let Some(degree) = in_degree.get_mut(&dependent_id) {
                        *degree -= 1;
                        if *degree == 0 {
                            next.push(dependent_id);
                        }
                    }
                }
            }
            generations.push(std::mem::replace(&mut current, next));
        }

        if seen != self.len() {
            return Err(GraphError::CycleDetected);
        }
        Ok(generations)
    }

    /// Node names from dependencies to targets.
    pub fn topological_order(&self) -> Result<Vec<&str>> {
        Ok(self
            .topological_ids()?
            .into_iter()
            .map(|id| self.name_of(id))
            .collect())
    }

    /// Topological layers: every node's dependencies live in earlier layers.
    pub fn topological_generations(&self) -> Result<Vec<Vec<&str>>> {
        Ok(self
            .generation_ids()?
            .into_iter()
            .map(|layer| layer.into_iter().map(|id| self.name_of(id)).collect())
            .collect())
    }

    /// Stamp every node with the index of its topological layer.
    pub fn update_generation_indexes(&mut self) -> Result<()> {
        let generations = self.generation_ids()?;
        for (index, layer) in generations.into_iter().enumerate() {
            for id in layer {
                self.nodes[id].set_generation_index(index as i64);
            }
        }
        Ok(())
    }

    /// Nodes without dependencies.
    pub fn sources(&self, exclude_recipes: bool) -> Vec<&str> {
        self.index
            .iter()
            .filter(|&(_, &id)| {
                let node = &self.nodes[id];
                node.dependencies().is_empty() && !(exclude_recipes && node.is_recipe())
            })
            .map(|(name, _)| name.as_str())
            .collect()
    }

    /// Nodes nothing depends on.
    pub fn sinks(&self, exclude_recipes: bool) -> Vec<&str> {
        self.index
            .iter()
            .filter(|&(_, &id)| {
                let node = &self.nodes[id];
                node.dependents().is_empty() && !(exclude_recipes && node.is_recipe())
            })
            .map(|(name, _)| name.as_str())
            .collect()
    }

    /// Every conditional node.
    pub fn conditionals(&self) -> Vec<&str> {
        self.index
            .iter()
            .filter(|&(_, &id)| self.nodes[id].kind().kind() == Kind::Conditional)
            .map(|(name, _)| name.as_str())
            .collect()
    }

    /// Every node `target` depends on, directly or not, whatever is cached.
    /// The target itself is excluded.
    pub fn all_ancestors(&self, target: &str) -> Result<IndexSet<&str>> {
        let start = self.id(target)?;
        let mut seen: IndexSet<NodeId> = IndexSet::new();
        let mut queue: VecDeque<NodeId> =
            self.nodes[start].dependencies().iter().copied().collect();

        while let Some(id) = queue.pop_front() {
            if seen.insert(id) {
                queue.extend(self.nodes[id].dependencies().iter().copied());
            }
        }
        seen.shift_remove(&start);
        Ok(seen.into_iter().map(|id| self.name_of(id)).collect())
    }

    /// The nodes that still need evaluating to reach `target`, target
    /// included.
    ///
    /// Traversal stops at nodes that already have a value. For a conditional
    /// whose deciding condition is already true, only that condition and its
    /// paired possibility are followed.
    pub fn path_to_target(&self, target: &str) -> Result<IndexSet<&str>> {
        let start = self.id(target)?;
        let mut path = IndexSet::new();
        self.collect_path(start, &mut path);
        Ok(path.into_iter().map(|id| self.name_of(id)).collect())
    }

    fn collect_path(&self, id: NodeId, path: &mut IndexSet<NodeId>) {
        if !path.insert(id) {
            return;
        }
        let node = &self.nodes[id];
        if node.has_value() {
            return;
        }
        if let Some(branches) = node.kind().branches() {
            let decided = branches
                .conditions
                .iter()
                .position(|c| self.index.get(c).map_or(false, |&c| self.nodes[c].is_true()));
            if let Some(index) = decided {
                for member in [&branches.conditions[index], &branches.possibilities[index]] {
                    if let Some(&member_id) = self.index.get(member) {
                        self.collect_path(member_id, path);
                    }
                }
                return;
            }
        }
        for dep in node.dependencies() {
            self.collect_path(*dep, path);
        }
    }
}
