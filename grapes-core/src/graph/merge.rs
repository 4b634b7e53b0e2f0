//! Graph Composition
//!
//! Compatibility check and union of two independently built graphs.
//!
//! # Merge Rule
//!
//! Nodes present on one side only are copied as they are. For a node present
//! on both sides the left graph wins, and the right graph only fills gaps:
//!
//! - A structural body (recipe and arguments, or conditions and
//!   possibilities) missing on the left is taken from the right
//! - A value missing on the left is taken from the right together with its
//!   frozen flag
//! - A missing reachability or generation index is taken from the right
//! - The recipe flag is set if either side sets it
//!
//! Edges are the union of both sides, left edges first.

use std::collections::HashSet;

use tracing::debug;

use super::{Graph, Node, NodeKind};
use crate::error::{GraphError, Result};

impl Graph {
    /// Whether `name` here can be merged with `other_name` in `other`.
    pub fn is_other_node_compatible(&self, name: &str, other: &Graph, other_name: &str) -> bool {
        let (Ok(left), Ok(right)) = (self.node(name), other.node(other_name)) else {
            return false;
        };
        if left.kind().kind() != right.kind().kind() {
            return false;
        }
        if left.same_attributes(right) && self.same_dependencies(left, other, right) {
            return true;
        }
        if let (Some(a), Some(b)) = (left.value(), right.value()) {
            let same_code = match (a.as_recipe(), b.as_recipe()) {
                (Some(a), Some(b)) => a.same_code(b),
                _ => false,
            };
            if a != b && !same_code {
                return false;
            }
        }
        left.dependencies().is_empty()
            || right.dependencies().is_empty()
            || self.same_dependencies(left, other, right)
    }

    /// Whether every node the two graphs share is compatible.
    pub fn is_compatible(&self, other: &Graph) -> bool {
        self.node_names()
            .filter(|name| other.contains(name))
            .all(|name| self.is_other_node_compatible(name, other, name))
    }

    /// Union of two compatible graphs. See the module docs for which side
    /// provides the attributes of shared nodes.
    pub fn merge(&self, other: &Graph) -> Result<Graph> {
        if !self.is_compatible(other) {
            return Err(GraphError::IncompatibleGraphs);
        }
        let mut merged = self.clone();

        for (name, &id) in &other.index {
            let right = &other.nodes[id];
            match merged.index.get(name) {
                Some(&left_id) => fill_gaps(&mut merged.nodes[left_id], right),
                None => {
                    let mut node = right.clone();
                    node.clear_edges();
                    let new_id = merged.nodes.insert(node);
                    merged.index.insert(name.clone(), new_id);
                }
            }
        }
        for (name, &id) in &other.index {
            let to = merged.id(name)?;
            for &dep in other.nodes[id].dependencies() {
                let from = merged.id(other.name_of(dep))?;
                merged.link(from, to);
            }
        }

        debug!(
            left = self.len(),
            right = other.len(),
            merged = merged.len(),
            "merged graphs"
        );
        Ok(merged)
    }

    fn same_dependencies(&self, left: &Node, other: &Graph, right: &Node) -> bool {
        let ours: HashSet<&str> = left
            .dependencies()
            .iter()
            .map(|&d| self.name_of(d))
            .collect();
        let theirs: HashSet<&str> = right
            .dependencies()
            .iter()
            .map(|&d| other.name_of(d))
            .collect();
        ours == theirs
    }
}

fn fill_gaps(left: &mut Node, right: &Node) {
    if matches!(left.kind(), NodeKind::Standard(None)) {
        left.set_kind(right.kind().clone());
    }
    if !left.has_value() {
        if let Some(value) = right.value() {
            left.set_value(value.clone());
            left.set_frozen(left.is_frozen() || right.is_frozen());
        }
    }
    if !left.has_reachability() {
        if let Some(reachability) = right.reachability() {
            left.set_reachability(reachability);
        }
    }
    if left.generation_index() < 0 {
        left.set_generation_index(right.generation_index());
    }
    left.set_recipe(left.is_recipe() || right.is_recipe());
}
