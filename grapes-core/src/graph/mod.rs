//! Dependency Graph
//!
//! This module implements the graph store: the node table and the directed
//! edges between nodes. Every other component (builders, evaluator,
//! reachability analysis, topology, fusion, merging) works through it.
//!
//! # Overview
//!
//! The graph is a directed graph where:
//!
//! - Nodes are values, recipes (callables producing values), standard steps
//!   or conditionals, each identified by a unique name
//! - Edges go from a dependency to the node consuming it
//!
//! Edges carry no attributes; what a dependency is used for (recipe,
//! positional argument, keyword argument, condition, possibility) is recorded
//! on the consuming node.
//!
//! # Design Decisions
//!
//! 1. Nodes live in a `SlotMap` arena and refer to each other through
//!    versioned [`NodeId`] handles, so structural edits cannot leave a stale
//!    handle pointing at a different node.
//!
//! 2. Names map to handles through a separate `IndexMap`. Its insertion order
//!    is the deterministic iteration order of the graph.
//!
//! 3. Both forward (dependencies) and reverse (dependents) edges are stored
//!    so traversal is cheap in both directions.
//!
//! 4. Acyclicity is not checked on construction. Evaluation assumes it and
//!    recurses without a depth bound; topology queries report cycles.

mod builder;
mod cache;
mod merge;
mod node;
mod simplify;
mod topology;

pub use node::{Branches, Kind, Node, NodeId, NodeKind, Reachability, Step};

use std::collections::HashSet;

use indexmap::IndexMap;
use slotmap::{SecondaryMap, SlotMap};
use smallvec::SmallVec;

use crate::error::{GraphError, Result};
use crate::value::Value;

/// A graph of named nodes.
#[derive(Debug, Clone, Default)]
pub struct Graph {
    pub(crate) nodes: SlotMap<NodeId, Node>,
    /// Name to handle, in insertion order.
    pub(crate) index: IndexMap<String, NodeId>,
}

impl Graph {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// Whether the graph has no nodes.
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Whether a node with this name exists.
    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Node names in insertion order.
    pub fn node_names(&self) -> impl Iterator<Item = &str> {
        self.index.keys().map(String::as_str)
    }

    /// Create the node if it does not exist yet. Existing nodes are untouched.
    pub fn add_node_if_absent(&mut self, name: &str) -> NodeId {
        if let Some(&id) = self.index.get(name) {
            return id;
        }
        let id = self.nodes.insert(Node::new(name));
        self.index.insert(name.to_owned(), id);
        id
    }

    /// Resolve a name to its handle.
    pub fn id(&self, name: &str) -> Result<NodeId> {
        self.index
            .get(name)
            .copied()
            .ok_or_else(|| GraphError::UnknownNode(name.to_owned()))
    }

    /// Look up a node by name, failing with `UnknownNode`.
    pub fn node(&self, name: &str) -> Result<&Node> {
        let id = self.id(name)?;
        Ok(&self.nodes[id])
    }

    /// Mutable access to a node's runtime state (value, flags, reachability).
    pub fn node_mut(&mut self, name: &str) -> Result<&mut Node> {
        let id = self.id(name)?;
        Ok(&mut self.nodes[id])
    }

    /// Look up a node by handle. Handles taken from this graph's edges are
    /// always live.
    pub fn node_by_id(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub(crate) fn name_of(&self, id: NodeId) -> &str {
        self.nodes[id].name()
    }

    // ------------------------------------------------------------------------
    // Edges
    // ------------------------------------------------------------------------

    /// Add an edge: `dependent` consumes `dependency`.
    pub fn add_edge(&mut self, dependency: &str, dependent: &str) -> Result<()> {
        let from = self.id(dependency)?;
        let to = self.id(dependent)?;
        self.link(from, to);
        Ok(())
    }

    /// Remove an edge if present.
    pub fn remove_edge(&mut self, dependency: &str, dependent: &str) -> Result<()> {
        let from = self.id(dependency)?;
        let to = self.id(dependent)?;
        self.unlink(from, to);
        Ok(())
    }

    /// Remove every edge pointing into `name`.
    pub fn remove_incoming_edges(&mut self, name: &str) -> Result<()> {
        let id = self.id(name)?;
        for dep in self.dependency_ids(id) {
            self.unlink(dep, id);
        }
        Ok(())
    }

    pub(crate) fn link(&mut self, from: NodeId, to: NodeId) {
        if let Some(node) = self.nodes.get_mut(from) {
            node.add_dependent(to);
        }
        if let Some(node) = self.nodes.get_mut(to) {
            node.add_dependency(from);
        }
    }

    pub(crate) fn unlink(&mut self, from: NodeId, to: NodeId) {
        if let Some(node) = self.nodes.get_mut(from) {
            node.remove_dependent(to);
        }
        if let Some(node) = self.nodes.get_mut(to) {
            node.remove_dependency(from);
        }
    }

    pub(crate) fn dependency_ids(&self, id: NodeId) -> SmallVec<[NodeId; 8]> {
        self.nodes[id].dependencies().iter().copied().collect()
    }

    pub(crate) fn dependent_ids(&self, id: NodeId) -> SmallVec<[NodeId; 8]> {
        self.nodes[id].dependents().iter().copied().collect()
    }

    /// Direct dependencies of a node, in declaration order.
    pub fn predecessors(&self, name: &str) -> Result<Vec<&str>> {
        let node = self.node(name)?;
        Ok(node.dependencies().iter().map(|&id| self.name_of(id)).collect())
    }

    /// Direct consumers of a node.
    pub fn successors(&self, name: &str) -> Result<Vec<&str>> {
        let node = self.node(name)?;
        Ok(node.dependents().iter().map(|&id| self.name_of(id)).collect())
    }

    /// Delete a node and every edge touching it.
    pub(crate) fn delete(&mut self, name: &str) -> Result<()> {
        let id = self
            .index
            .shift_remove(name)
            .ok_or_else(|| GraphError::UnknownNode(name.to_owned()))?;
        if let Some(node) = self.nodes.remove(id) {
            for &dep in node.dependencies() {
                if let Some(n) = self.nodes.get_mut(dep) {
                    n.remove_dependent(id);
                }
            }
            for &dependent in node.dependents() {
                if let Some(n) = self.nodes.get_mut(dependent) {
                    n.remove_dependency(id);
                }
            }
        }
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Attributes
    // ------------------------------------------------------------------------

    /// Whether the node is a standard node or a conditional.
    pub fn kind(&self, name: &str) -> Result<Kind> {
        Ok(self.node(name)?.kind().kind())
    }

    /// Replace the kind-specific body of a node. Bodies come from the
    /// builders, which validate them and add the matching edges.
    pub(crate) fn set_kind(&mut self, name: &str, kind: NodeKind) -> Result<()> {
        self.node_mut(name)?.set_kind(kind);
        Ok(())
    }

    pub(crate) fn step_of(&self, name: &str) -> Result<&Step> {
        self.node(name)?
            .kind()
            .step()
            .ok_or_else(|| GraphError::missing(name, "recipe"))
    }

    pub(crate) fn branches_of(&self, name: &str) -> Result<&Branches> {
        self.node(name)?
            .kind()
            .branches()
            .ok_or_else(|| GraphError::missing(name, "conditions"))
    }

    /// Name of the node holding this node's recipe.
    pub fn recipe_of(&self, name: &str) -> Result<&str> {
        Ok(&self.step_of(name)?.recipe)
    }

    /// Positional dependencies of a step.
    pub fn args_of(&self, name: &str) -> Result<&[String]> {
        let node = self.node(name)?;
        node.kind()
            .step()
            .map(|step| step.args.as_slice())
            .ok_or_else(|| GraphError::missing(name, "args"))
    }

    /// Keyword dependencies of a step, parameter to node name.
    pub fn kwargs_of(&self, name: &str) -> Result<&IndexMap<String, String>> {
        let node = self.node(name)?;
        node.kind()
            .step()
            .map(|step| &step.kwargs)
            .ok_or_else(|| GraphError::missing(name, "kwargs"))
    }

    /// Conditions of a conditional, in the order they are tried.
    pub fn conditions_of(&self, name: &str) -> Result<&[String]> {
        Ok(&self.branches_of(name)?.conditions)
    }

    /// Possibilities of a conditional, default last when present.
    pub fn possibilities_of(&self, name: &str) -> Result<&[String]> {
        let node = self.node(name)?;
        node.kind()
            .branches()
            .map(|b| b.possibilities.as_slice())
            .ok_or_else(|| GraphError::missing(name, "possibilities"))
    }

    /// Whether the node is flagged as holding a callable.
    pub fn is_recipe(&self, name: &str) -> Result<bool> {
        Ok(self.node(name)?.is_recipe())
    }

    pub fn set_is_recipe(&mut self, name: &str, is_recipe: bool) -> Result<()> {
        self.node_mut(name)?.set_recipe(is_recipe);
        Ok(())
    }

    /// Whether bulk clears skip this node.
    pub fn is_frozen(&self, name: &str) -> Result<bool> {
        Ok(self.node(name)?.is_frozen())
    }

    pub fn set_is_frozen(&mut self, name: &str, frozen: bool) -> Result<()> {
        self.node_mut(name)?.set_frozen(frozen);
        Ok(())
    }

    /// Topological layer of the node, -1 until computed.
    pub fn generation_index(&self, name: &str) -> Result<i64> {
        Ok(self.node(name)?.generation_index())
    }

    pub fn set_generation_index(&mut self, name: &str, index: i64) -> Result<()> {
        self.node_mut(name)?.set_generation_index(index);
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Values and reachability
    // ------------------------------------------------------------------------

    /// Whether the node currently holds a value.
    pub fn has_value(&self, name: &str) -> Result<bool> {
        Ok(self.node(name)?.has_value())
    }

    /// The node's value, failing with `MissingValue` when it has none.
    pub fn get_value(&self, name: &str) -> Result<&Value> {
        self.node(name)?
            .value()
            .ok_or_else(|| GraphError::MissingValue(name.to_owned()))
    }

    /// Store a value on the node.
    pub fn set_value(&mut self, name: &str, value: impl Into<Value>) -> Result<()> {
        self.node_mut(name)?.set_value(value.into());
        Ok(())
    }

    /// Drop the node's value. Frozen nodes are not exempt here.
    pub fn unset_value(&mut self, name: &str) -> Result<()> {
        self.node_mut(name)?.unset_value();
        Ok(())
    }

    /// Whether the node has a value that counts as true.
    pub fn is_true(&self, name: &str) -> Result<bool> {
        Ok(self.node(name)?.is_true())
    }

    pub fn has_reachability(&self, name: &str) -> Result<bool> {
        Ok(self.node(name)?.has_reachability())
    }

    /// The cached reachability, failing when none was computed.
    pub fn get_reachability(&self, name: &str) -> Result<Reachability> {
        self.node(name)?
            .reachability()
            .ok_or_else(|| GraphError::MissingReachability(name.to_owned()))
    }

    pub fn set_reachability(&mut self, name: &str, reachability: Reachability) -> Result<()> {
        self.node_mut(name)?.set_reachability(reachability);
        Ok(())
    }

    /// Set a reachability given by name, validating it first.
    pub fn set_reachability_str(&mut self, name: &str, reachability: &str) -> Result<()> {
        let reachability = reachability.parse()?;
        self.set_reachability(name, reachability)
    }

    /// Forget the cached reachability.
    pub fn unset_reachability(&mut self, name: &str) -> Result<()> {
        self.node_mut(name)?.unset_reachability();
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Subgraphs
    // ------------------------------------------------------------------------

    /// Deep copy keeping only the named nodes and the edges among them.
    /// Unknown names are ignored.
    pub fn subgraph<'a>(&self, names: impl IntoIterator<Item = &'a str>) -> Graph {
        let keep: HashSet<&str> = names.into_iter().collect();
        self.filtered(|name| keep.contains(name))
    }

    fn filtered(&self, keep: impl Fn(&str) -> bool) -> Graph {
        let mut out = Graph::new();
        let mut remap: SecondaryMap<NodeId, NodeId> = SecondaryMap::new();

        for (name, &id) in &self.index {
            if !keep(name) {
                continue;
            }
            let mut node = self.nodes[id].clone();
            node.clear_edges();
            let new_id = out.nodes.insert(node);
            out.index.insert(name.clone(), new_id);
            remap.insert(id, new_id);
        }
        for (old, &new) in &remap {
            for dep in self.nodes[old].dependencies() {
                if let Some(&new_dep) = remap.get(*dep) {
                    out.link(new_dep, new);
                }
            }
        }
        out
    }
}

/// Structural equality: same names, same attributes, same dependencies.
impl PartialEq for Graph {
    fn eq(&self, other: &Self) -> bool {
        if self.len() != other.len() {
            return false;
        }
        self.index.iter().all(|(name, &id)| {
            let Some(&other_id) = other.index.get(name) else {
                return false;
            };
            let (a, b) = (&self.nodes[id], &other.nodes[other_id]);
            if !a.same_attributes(b) || a.dependencies().len() != b.dependencies().len() {
                return false;
            }
            let theirs: HashSet<&str> = b
                .dependencies()
                .iter()
                .map(|&d| other.name_of(d))
                .collect();
            a.dependencies()
                .iter()
                .all(|&d| theirs.contains(self.name_of(d)))
        })
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
